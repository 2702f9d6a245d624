use crate::error::{AppError, Result};

pub const WORKBOOK_PATH: &str = "gestao_menottech.xlsx";

pub const ORDERS_SHEET: &str = "Pedido_Vendas";
pub const TARGETS_SHEET: &str = "Financeiro_Comercial";
pub const CUSTOMERS_SHEET: &str = "Clientes";
pub const PARTNERS_SHEET: &str = "Tecnicos_Parceiros";

/// Forecaster needs at least this many distinct months before it fits a trend.
pub const MIN_FORECAST_MONTHS: usize = 3;

/// Text date layouts accepted in the order date column, tried in order.
/// Native spreadsheet date cells never go through these.
pub const TEXT_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];
pub const TEXT_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

// ---------------------------------------------------------------------------
// Column configuration table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Presence {
    /// Load fails when the column is missing.
    Required,
    /// May be absent; no substitute value.
    Optional,
    /// May be absent; absent columns and empty cells read as this amount.
    DefaultsTo(f64),
}

/// One recognized column. `names` are normalized header names; the first one is
/// canonical and is the name written back when the column is derived.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub names: &'static [&'static str],
    pub presence: Presence,
}

impl ColumnSpec {
    pub fn canonical(&self) -> &'static str {
        self.names[0]
    }

    /// Substitute amount for a missing column or empty cell.
    pub fn default_amount(&self) -> f64 {
        match self.presence {
            Presence::DefaultsTo(v) => v,
            Presence::Required | Presence::Optional => 0.0,
        }
    }

    /// Position of the first header matching any accepted name.
    pub fn locate(&self, headers: &[String]) -> Option<usize> {
        self.names
            .iter()
            .find_map(|name| headers.iter().position(|h| h == name))
    }
}

/// Order table columns after header normalization.
pub mod order_columns {
    use super::{ColumnSpec, Presence};

    pub const DATE: ColumnSpec = ColumnSpec {
        names: &["data", "data_pedido", "data_venda"],
        presence: Presence::Required,
    };
    pub const REVENUE: ColumnSpec = ColumnSpec {
        names: &["valor_de_venda", "valor_venda", "valor_total"],
        presence: Presence::Required,
    };
    /// Used as-is when present, derived from revenue and costs otherwise.
    pub const PROFIT: ColumnSpec = ColumnSpec {
        names: &["lucro_bruto", "lucro"],
        presence: Presence::Optional,
    };
    pub const PRODUCT_COST: ColumnSpec = ColumnSpec {
        names: &["custo_do_produto", "custo_produto"],
        presence: Presence::DefaultsTo(0.0),
    };
    pub const INSTALL_COST: ColumnSpec = ColumnSpec {
        names: &["custo_instalacao", "custo_de_instalacao"],
        presence: Presence::DefaultsTo(0.0),
    };
    pub const TECHNICIAN: ColumnSpec = ColumnSpec {
        names: &["tecnico", "tecnico_parceiro"],
        presence: Presence::Optional,
    };
    pub const SUPPLIER: ColumnSpec = ColumnSpec {
        names: &["fornecedor"],
        presence: Presence::Optional,
    };

    /// Derived month bucket column appended to every prepared table.
    pub const MONTH: &str = "mes";

    /// Optional cost columns that feed the derived profit.
    pub const COSTS: &[ColumnSpec] = &[PRODUCT_COST, INSTALL_COST];
}

/// Financial targets table columns after header normalization.
pub mod target_columns {
    use super::{ColumnSpec, Presence};

    pub const MONTH: ColumnSpec = ColumnSpec {
        names: &["mes_ano", "mes"],
        presence: Presence::Required,
    };
    pub const GOAL: ColumnSpec = ColumnSpec {
        names: &["meta_do_mes", "meta"],
        presence: Presence::Required,
    };
}

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SheetNames {
    pub orders: String,
    pub targets: String,
    /// Optional tables; a missing sheet is logged and skipped.
    pub customers: String,
    pub partners: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            orders: ORDERS_SHEET.to_string(),
            targets: TARGETS_SHEET.to_string(),
            customers: CUSTOMERS_SHEET.to_string(),
            partners: PARTNERS_SHEET.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub workbook_path: String,
    pub sheets: SheetNames,
    pub log_level: String,
    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            workbook_path: std::env::var("WORKBOOK_PATH")
                .unwrap_or_else(|_| WORKBOOK_PATH.to_string()),
            sheets: SheetNames {
                orders: std::env::var("ORDERS_SHEET").unwrap_or_else(|_| ORDERS_SHEET.to_string()),
                targets: std::env::var("TARGETS_SHEET")
                    .unwrap_or_else(|_| TARGETS_SHEET.to_string()),
                customers: std::env::var("CUSTOMERS_SHEET")
                    .unwrap_or_else(|_| CUSTOMERS_SHEET.to_string()),
                partners: std::env::var("PARTNERS_SHEET")
                    .unwrap_or_else(|_| PARTNERS_SHEET.to_string()),
            },
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_accepts_aliases_in_priority_order() {
        let headers = vec!["valor_venda".to_string(), "valor_de_venda".to_string()];
        assert_eq!(order_columns::REVENUE.locate(&headers), Some(1));

        let headers = vec!["cliente".to_string(), "valor_venda".to_string()];
        assert_eq!(order_columns::REVENUE.locate(&headers), Some(1));
        assert_eq!(order_columns::DATE.locate(&headers), None);
    }

    #[test]
    fn column_presence_table() {
        assert_eq!(order_columns::DATE.presence, Presence::Required);
        assert_eq!(order_columns::REVENUE.presence, Presence::Required);
        assert_eq!(order_columns::PROFIT.presence, Presence::Optional);
        assert!(order_columns::COSTS
            .iter()
            .all(|c| c.presence == Presence::DefaultsTo(0.0)));
    }
}
