use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, warn};

use crate::config::{order_columns, target_columns, ColumnSpec, TEXT_DATETIME_FORMATS, TEXT_DATE_FORMATS};
use crate::error::{AppError, Result};
use crate::types::{CellValue, FinancialTarget, MonthBucket, Order, OrderTable, RawTable};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PrepareStats {
    pub rows_read: usize,
    /// Rows excluded because the date did not parse.
    pub dropped_bad_date: usize,
    /// Non-empty amount cells that could not be read and counted as zero.
    pub unreadable_amounts: usize,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Turn the normalized orders sheet into prepared orders.
///
/// - Rows whose date does not parse are dropped, never defaulted.
/// - Every surviving row gets a `mes` cell (`MM/YYYY`), overwriting an existing
///   `mes` column if the sheet has one.
/// - Gross profit is read from the profit column when the sheet has one and
///   derived as `revenue - (product_cost + install_cost)` only when it does not.
///   Absent cost columns and empty cost cells count as zero.
pub fn prepare_orders(table: &RawTable) -> Result<(OrderTable, PrepareStats)> {
    let date_idx = require(table, &order_columns::DATE)?;
    let revenue_idx = require(table, &order_columns::REVENUE)?;
    let profit_idx = order_columns::PROFIT.locate(&table.headers);
    let cost_cols: Vec<(Option<usize>, &ColumnSpec)> = order_columns::COSTS
        .iter()
        .map(|spec| (spec.locate(&table.headers), spec))
        .collect();
    let technician_idx = order_columns::TECHNICIAN.locate(&table.headers);
    let supplier_idx = order_columns::SUPPLIER.locate(&table.headers);

    let mut columns = table.headers.clone();
    let month_idx = match columns.iter().position(|c| c == order_columns::MONTH) {
        Some(i) => i,
        None => {
            columns.push(order_columns::MONTH.to_string());
            columns.len() - 1
        }
    };
    let profit_derived = profit_idx.is_none();
    if profit_derived {
        columns.push(order_columns::PROFIT.canonical().to_string());
    }

    let mut stats = PrepareStats {
        rows_read: table.rows.len(),
        ..PrepareStats::default()
    };
    let mut orders = Vec::with_capacity(table.rows.len());

    for row in &table.rows {
        let Some(date) = parse_order_date(&row[date_idx]) else {
            stats.dropped_bad_date += 1;
            continue;
        };
        let month = MonthBucket::from_date(&date);

        let mut amount = |cell: &CellValue, default: f64| match parse_amount(cell) {
            Some(v) => v,
            None => {
                if !cell.is_empty() {
                    stats.unreadable_amounts += 1;
                }
                default
            }
        };

        let revenue = amount(&row[revenue_idx], 0.0);
        let mut costs = [0.0f64; 2];
        for (slot, (idx, spec)) in costs.iter_mut().zip(&cost_cols) {
            *slot = match idx {
                Some(i) => amount(&row[*i], spec.default_amount()),
                None => spec.default_amount(),
            };
        }
        let [product_cost, install_cost] = costs;
        let gross_profit = match profit_idx {
            Some(i) => amount(&row[i], 0.0),
            None => revenue - (product_cost + install_cost),
        };

        let mut cells = row.clone();
        cells.resize(columns.len(), CellValue::Empty);
        cells[date_idx] = CellValue::DateTime(date);
        cells[month_idx] = CellValue::Text(month.to_string());
        if profit_derived {
            if let Some(last) = cells.last_mut() {
                *last = CellValue::Number(gross_profit);
            }
        }

        orders.push(Order {
            date,
            month,
            revenue,
            product_cost,
            install_cost,
            gross_profit,
            technician: technician_idx.and_then(|i| row[i].label()),
            supplier: supplier_idx.and_then(|i| row[i].label()),
            cells,
        });
    }

    if stats.dropped_bad_date > 0 {
        warn!(
            "Sheet '{}': dropped {} of {} rows with unparseable dates",
            table.name, stats.dropped_bad_date, stats.rows_read
        );
    }
    if stats.unreadable_amounts > 0 {
        warn!(
            "Sheet '{}': {} unreadable amount cells counted as zero",
            table.name, stats.unreadable_amounts
        );
    }
    debug!(
        "Prepared {} orders (profit {})",
        orders.len(),
        if profit_derived { "derived" } else { "from sheet" }
    );

    Ok((
        OrderTable {
            columns,
            orders,
            profit_derived,
        },
        stats,
    ))
}

fn require(table: &RawTable, spec: &ColumnSpec) -> Result<usize> {
    spec.locate(&table.headers).ok_or_else(|| AppError::MissingColumn {
        sheet: table.name.clone(),
        column: spec.canonical().to_string(),
    })
}

/// Native date cells, or text in one of the accepted layouts.
pub fn parse_order_date(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::DateTime(dt) => Some(*dt),
        CellValue::Text(s) => {
            let s = s.trim();
            TEXT_DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .or_else(|| {
                    TEXT_DATE_FORMATS
                        .iter()
                        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                        .map(|d| d.and_time(NaiveTime::MIN))
                })
        }
        _ => None,
    }
}

/// Numeric cells as-is. Text accepts an optional `R$` prefix and either
/// `1234.5` or `1.234,5` notation.
pub fn parse_amount(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(s) => parse_amount_text(s),
        _ => None,
    }
}

fn parse_amount_text(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let s = s.strip_prefix("R$").unwrap_or(s).trim();
    if s.is_empty() {
        return None;
    }
    let cleaned = match (s.rfind(','), s.rfind('.')) {
        // 1.234,56
        (Some(c), Some(d)) if c > d => s.replace('.', "").replace(',', "."),
        // 1,234.56
        (Some(_), Some(_)) => s.replace(',', ""),
        // 1234,56
        (Some(_), None) => s.replace(',', "."),
        _ => s.to_string(),
    };
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Financial targets
// ---------------------------------------------------------------------------

/// At most one target per month, looked up by exact month bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetBook {
    by_month: BTreeMap<MonthBucket, FinancialTarget>,
}

impl TargetBook {
    pub fn get(&self, month: &MonthBucket) -> Option<&FinancialTarget> {
        self.by_month.get(month)
    }

    pub fn len(&self) -> usize {
        self.by_month.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_month.is_empty()
    }
}

impl FromIterator<FinancialTarget> for TargetBook {
    /// First target for a month wins.
    fn from_iter<I: IntoIterator<Item = FinancialTarget>>(iter: I) -> Self {
        let mut by_month = BTreeMap::new();
        for target in iter {
            by_month.entry(target.month).or_insert(target);
        }
        Self { by_month }
    }
}

/// Build the target book from the normalized targets sheet.
///
/// The month cell is either `MM/YYYY` text or a date. Rows with an unreadable
/// month, an unreadable goal, or a goal that is not positive are skipped;
/// a later duplicate for the same month is ignored.
pub fn load_targets(table: &RawTable) -> Result<TargetBook> {
    let month_idx = require(table, &target_columns::MONTH)?;
    let goal_idx = require(table, &target_columns::GOAL)?;

    let mut targets = Vec::with_capacity(table.rows.len());
    let mut skipped = 0usize;
    for row in &table.rows {
        let month = match &row[month_idx] {
            CellValue::Text(s) => s.parse::<MonthBucket>().ok(),
            CellValue::DateTime(dt) => Some(MonthBucket::from_date(dt)),
            _ => None,
        };
        let goal = parse_amount(&row[goal_idx]).filter(|g| *g > 0.0);
        match (month, goal) {
            (Some(month), Some(goal_amount)) => targets.push(FinancialTarget { month, goal_amount }),
            _ => skipped += 1,
        }
    }

    let read = targets.len();
    let book: TargetBook = targets.into_iter().collect();
    if skipped > 0 {
        warn!("Sheet '{}': skipped {skipped} unreadable target rows", table.name);
    }
    if book.is_empty() {
        warn!("Sheet '{}': no usable targets, every month reads as not set", table.name);
    } else if book.len() < read {
        warn!(
            "Sheet '{}': {} duplicate month targets ignored (first one kept)",
            table.name,
            read - book.len()
        );
    }
    Ok(book)
}
