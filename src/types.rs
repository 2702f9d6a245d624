use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Month bucket
// ---------------------------------------------------------------------------

/// Calendar month key, rendered as zero-padded `MM/YYYY`.
/// Field order gives calendar ordering: year first, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthBucket {
    year: i32,
    month: u32,
}

impl MonthBucket {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        ((1..=12).contains(&month) && (0..=9999).contains(&year)).then_some(Self { year, month })
    }

    pub fn from_date<D: Datelike>(date: &D) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// File-name friendly form, `MM-YYYY`.
    pub fn slug(&self) -> String {
        format!("{:02}-{:04}", self.month, self.year)
    }
}

impl std::fmt::Display for MonthBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}/{:04}", self.month, self.year)
    }
}

impl std::str::FromStr for MonthBucket {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::InvalidMonth(s.to_string());
        let (mm, yyyy) = s.trim().split_once('/').ok_or_else(invalid)?;
        if mm.len() != 2 || yyyy.len() != 4 {
            return Err(invalid());
        }
        if !mm.bytes().chain(yyyy.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let month = mm.parse::<u32>().map_err(|_| invalid())?;
        let year = yyyy.parse::<i32>().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl TryFrom<String> for MonthBucket {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthBucket> for String {
    fn from(value: MonthBucket) -> Self {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// Table cells
// ---------------------------------------------------------------------------

/// A single spreadsheet cell, detached from the reader library.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Non-empty label for identifier columns. Whole numbers print without
    /// a fractional part so numeric ids read as `12`, not `12.0`.
    pub fn label(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::DateTime(dt) => Some(dt.to_string()),
        }
    }
}

/// A sheet as read from the workbook: header row plus data rows.
/// Rows are padded or truncated to the header width by the reader.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

// ---------------------------------------------------------------------------
// Orders and targets
// ---------------------------------------------------------------------------

/// An order that survived preparation: its date parsed and month derived.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub date: NaiveDateTime,
    pub month: MonthBucket,
    pub revenue: f64,
    pub product_cost: f64,
    pub install_cost: f64,
    pub gross_profit: f64,
    pub technician: Option<String>,
    pub supplier: Option<String>,
    /// Cells aligned with `OrderTable::columns`; this is what gets exported.
    pub cells: Vec<CellValue>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderTable {
    pub columns: Vec<String>,
    pub orders: Vec<Order>,
    /// True when gross profit was computed rather than read from the sheet.
    pub profit_derived: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FinancialTarget {
    pub month: MonthBucket,
    pub goal_amount: f64,
}

// ---------------------------------------------------------------------------
// Computed figures
// ---------------------------------------------------------------------------

/// Why a figure has no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Missing {
    /// No financial target exists for the month.
    #[serde(rename = "not set")]
    NotSet,
    /// The computation would divide by zero.
    #[serde(rename = "undefined")]
    Undefined,
    /// Not enough data to compute.
    #[serde(rename = "unavailable")]
    Unavailable,
}

impl std::fmt::Display for Missing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Missing::NotSet => "not set",
            Missing::Undefined => "undefined",
            Missing::Unavailable => "unavailable",
        };
        write!(f, "{s}")
    }
}

/// A computed value or an explicit marker explaining its absence.
/// Serializes as the bare value or the marker string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Figure<T> {
    Value(T),
    Missing(Missing),
}

impl<T: Copy> Figure<T> {
    pub fn value(&self) -> Option<T> {
        match self {
            Figure::Value(v) => Some(*v),
            Figure::Missing(_) => None,
        }
    }
}

/// Reduction of one set of orders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyAggregate {
    pub month: MonthBucket,
    pub total_revenue: f64,
    pub total_profit: f64,
    pub order_count: usize,
    pub average_ticket: Figure<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicianProfit {
    pub technician: String,
    pub gross_profit: f64,
    pub order_count: usize,
}

/// Everything the presenter needs for one selected month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportBundle {
    pub month: MonthBucket,
    pub total_revenue: f64,
    pub total_profit: f64,
    pub order_count: usize,
    pub average_ticket: Figure<f64>,
    pub goal_amount: Figure<f64>,
    pub goal_attainment_pct: Figure<f64>,
    /// Attainment as a 0..=1 fraction, capped at 1.
    pub goal_progress: Figure<f64>,
    pub shortfall: f64,
    pub projected_orders_to_goal: Figure<u64>,
    pub forecast_next_month: Figure<f64>,
    /// Sorted by profit, highest first.
    pub technician_profit: Vec<TechnicianProfit>,
}
