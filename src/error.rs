use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

use crate::types::MonthBucket;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Source workbook not found: {0}")]
    SourceMissing(String),

    #[error("Workbook read error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Sheet '{0}' not found in workbook")]
    MissingSheet(String),

    #[error("Sheet '{sheet}' is missing required column '{column}'")]
    MissingColumn { sheet: String, column: String },

    #[error("Export error: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    #[error("No order data available")]
    NoData,

    #[error("Invalid month '{0}', expected MM/YYYY")]
    InvalidMonth(String),

    #[error("No orders for month {0}")]
    UnknownMonth(MonthBucket),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NoData | AppError::UnknownMonth(_) => StatusCode::NOT_FOUND,
            AppError::InvalidMonth(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
