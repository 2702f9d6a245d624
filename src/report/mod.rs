pub mod export;
pub mod forecast;
pub mod metrics;
pub mod selector;

pub use export::export_orders;
pub use forecast::forecast_next;
pub use metrics::{aggregate, goal_progress, monthly_series, technician_breakdown};
pub use selector::{available_months, filter_month, select_month};
