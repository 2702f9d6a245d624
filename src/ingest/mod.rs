pub mod normalize;
pub mod prepare;
pub mod workbook;

pub use normalize::normalize_table;
pub use prepare::{load_targets, prepare_orders, PrepareStats, TargetBook};
pub use workbook::{load_workbook, Workbook};
