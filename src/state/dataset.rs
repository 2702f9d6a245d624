use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::ingest::{
    load_targets, load_workbook, normalize_table, prepare_orders, PrepareStats, TargetBook, Workbook,
};
use crate::report::{
    aggregate, available_months, export_orders, filter_month, forecast_next, goal_progress,
    monthly_series, select_month, technician_breakdown,
};
use crate::types::{Figure, Missing, MonthBucket, MonthlyAggregate, OrderTable, RawTable, ReportBundle};

/// Per-request selection. Built fresh for every request from the query string;
/// nothing about the selection is stored on the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportContext {
    pub month: MonthBucket,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub rows: usize,
    pub columns: Vec<String>,
}

impl From<RawTable> for TableSummary {
    fn from(table: RawTable) -> Self {
        let table = normalize_table(table);
        Self {
            rows: table.rows.len(),
            columns: table.headers,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub source: String,
    pub loaded_at: DateTime<Utc>,
    pub orders: usize,
    pub rows_read: usize,
    pub dropped_bad_date: usize,
    pub unreadable_amounts: usize,
    pub profit_derived: bool,
    pub months: Vec<MonthBucket>,
    pub first_order: Option<NaiveDateTime>,
    pub last_order: Option<NaiveDateTime>,
    /// Distinct technician and supplier names seen on valid orders.
    pub technicians: usize,
    pub suppliers: usize,
    pub targets: usize,
    pub customers: Option<TableSummary>,
    pub partners: Option<TableSummary>,
}

/// The prepared workbook for one session. Built once, then shared read-only.
#[derive(Debug)]
pub struct Dataset {
    source: String,
    loaded_at: DateTime<Utc>,
    orders: OrderTable,
    targets: TargetBook,
    months: Vec<MonthBucket>,
    stats: PrepareStats,
    customers: Option<TableSummary>,
    partners: Option<TableSummary>,
}

impl Dataset {
    /// Read, normalize and prepare the configured workbook.
    pub fn load(cfg: &Config) -> Result<Self> {
        let workbook = load_workbook(&cfg.workbook_path, &cfg.sheets)?;
        Self::from_workbook(cfg.workbook_path.clone(), workbook)
    }

    pub fn from_workbook(source: String, workbook: Workbook) -> Result<Self> {
        let (orders, stats) = prepare_orders(&normalize_table(workbook.orders))?;
        let targets = load_targets(&normalize_table(workbook.targets))?;
        let months = available_months(&orders.orders);
        let customers = workbook.customers.map(TableSummary::from);
        let partners = workbook.partners.map(TableSummary::from);

        info!(
            event = "DATASET_LOADED",
            source = %source,
            orders = orders.orders.len(),
            dropped_bad_date = stats.dropped_bad_date,
            months = months.len(),
            targets = targets.len(),
            "Dataset loaded from {} | orders: {} | dropped (bad date): {} | months: {} | targets: {} | customers: {} | partners: {}",
            source,
            orders.orders.len(),
            stats.dropped_bad_date,
            months.len(),
            targets.len(),
            customers.as_ref().map_or("n/a".to_string(), |t| t.rows.to_string()),
            partners.as_ref().map_or("n/a".to_string(), |t| t.rows.to_string()),
        );

        Ok(Self {
            source,
            loaded_at: Utc::now(),
            orders,
            targets,
            months,
            stats,
            customers,
            partners,
        })
    }

    pub fn months(&self) -> &[MonthBucket] {
        &self.months
    }

    /// Resolve a requested month against the data. Fails with `NoData` when
    /// there are no valid orders at all.
    pub fn context(&self, requested: Option<MonthBucket>) -> Result<ReportContext> {
        select_month(&self.months, requested).map(|month| ReportContext { month })
    }

    /// Full pipeline for one month: filter, reduce, goal, forecast, ranking.
    pub fn report(&self, ctx: &ReportContext) -> ReportBundle {
        let subset = filter_month(&self.orders.orders, ctx.month);
        let month = aggregate(ctx.month, &subset);
        let goal = goal_progress(
            month.total_revenue,
            month.average_ticket,
            self.targets.get(&ctx.month),
        );
        let forecast_next_month = self.forecast();

        ReportBundle {
            month: ctx.month,
            total_revenue: month.total_revenue,
            total_profit: month.total_profit,
            order_count: month.order_count,
            average_ticket: month.average_ticket,
            goal_amount: goal.goal_amount,
            goal_attainment_pct: goal.attainment_pct,
            goal_progress: goal.progress,
            shortfall: goal.shortfall,
            projected_orders_to_goal: goal.projected_orders,
            forecast_next_month,
            technician_profit: technician_breakdown(&subset),
        }
    }

    /// Monthly comparison over the whole order set, oldest first.
    pub fn monthly(&self) -> Vec<MonthlyAggregate> {
        monthly_series(&self.orders.orders)
    }

    /// Next-month revenue from the trend of all monthly totals.
    pub fn forecast(&self) -> Figure<f64> {
        let totals: Vec<f64> = self.monthly().iter().map(|m| m.total_revenue).collect();
        match forecast_next(&totals) {
            Some(fit) => {
                debug!(
                    months = totals.len(),
                    slope = fit.slope,
                    intercept = fit.intercept,
                    "Revenue trend fitted, next month {:.2}",
                    fit.next
                );
                Figure::Value(fit.next)
            }
            None => Figure::Missing(Missing::Unavailable),
        }
    }

    /// The selected month's orders as xlsx bytes.
    pub fn export(&self, ctx: &ReportContext) -> Result<Vec<u8>> {
        let subset = filter_month(&self.orders.orders, ctx.month);
        export_orders(&self.orders.columns, &subset)
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            source: self.source.clone(),
            loaded_at: self.loaded_at,
            orders: self.orders.orders.len(),
            rows_read: self.stats.rows_read,
            dropped_bad_date: self.stats.dropped_bad_date,
            unreadable_amounts: self.stats.unreadable_amounts,
            profit_derived: self.orders.profit_derived,
            months: self.months.clone(),
            first_order: self.orders.orders.iter().map(|o| o.date).min(),
            last_order: self.orders.orders.iter().map(|o| o.date).max(),
            technicians: distinct(self.orders.orders.iter().map(|o| o.technician.as_deref())),
            suppliers: distinct(self.orders.orders.iter().map(|o| o.supplier.as_deref())),
            targets: self.targets.len(),
            customers: self.customers.clone(),
            partners: self.partners.clone(),
        }
    }
}

fn distinct<'a>(names: impl Iterator<Item = Option<&'a str>>) -> usize {
    names.flatten().collect::<BTreeSet<_>>().len()
}
