use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::health::HealthState;
use crate::api::latency::{LatencyStats, Percentiles, Pipeline};
use crate::error::{AppError, Result};
use crate::state::{Dataset, DatasetSummary};
use crate::types::{MonthBucket, MonthlyAggregate, ReportBundle};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Clone)]
pub struct ApiState {
    pub dataset: Arc<Dataset>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

impl ApiState {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset: Arc::new(dataset),
            health: Arc::new(HealthState::new()),
            latency: Arc::new(LatencyStats::new()),
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/summary", get(get_summary))
        .route("/months", get(get_months))
        .route("/report", get(get_report))
        .route("/report/monthly", get(get_monthly))
        .route("/export", get(get_export))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    /// `MM/YYYY`; the earliest month when absent or blank.
    pub month: Option<String>,
}

impl MonthQuery {
    fn requested(&self) -> Result<Option<MonthBucket>> {
        self.month
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<MonthBucket>)
            .transpose()
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub source: String,
    pub loaded_at: DateTime<Utc>,
    pub orders: usize,
    pub months: usize,
    pub reports_served: u64,
    pub exports_served: u64,
    pub failed_requests: u64,
    pub last_report_at_ns: u64,
}

#[derive(Serialize)]
pub struct LatencyResponse {
    pub report: Percentiles,
    pub export: Percentiles,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let summary = state.dataset.summary();
    Json(HealthResponse {
        status: "ok",
        source: summary.source,
        loaded_at: summary.loaded_at,
        orders: summary.orders,
        months: summary.months.len(),
        reports_served: state.health.reports_served(),
        exports_served: state.health.exports_served(),
        failed_requests: state.health.failed_requests(),
        last_report_at_ns: state.health.last_report_at_ns(),
    })
}

async fn get_summary(State(state): State<ApiState>) -> Json<DatasetSummary> {
    Json(state.dataset.summary())
}

async fn get_months(State(state): State<ApiState>) -> Json<Vec<MonthBucket>> {
    Json(state.dataset.months().to_vec())
}

async fn get_report(
    State(state): State<ApiState>,
    Query(params): Query<MonthQuery>,
) -> Result<Json<ReportBundle>> {
    let started = Instant::now();
    let ctx = params
        .requested()
        .and_then(|requested| state.dataset.context(requested))
        .inspect_err(|_| state.health.record_failure())?;

    let bundle = state.dataset.report(&ctx);
    let elapsed = started.elapsed();
    state.latency.record(Pipeline::Report, elapsed);
    state.health.record_report(now_ns());

    debug!(
        month = %ctx.month,
        orders = bundle.order_count,
        latency_us = elapsed.as_micros() as u64,
        "Report built for {}",
        ctx.month,
    );
    Ok(Json(bundle))
}

async fn get_monthly(State(state): State<ApiState>) -> Json<Vec<MonthlyAggregate>> {
    Json(state.dataset.monthly())
}

async fn get_export(
    State(state): State<ApiState>,
    Query(params): Query<MonthQuery>,
) -> Result<impl IntoResponse> {
    let started = Instant::now();
    let (ctx, bytes) = params
        .requested()
        .and_then(|requested| state.dataset.context(requested))
        .and_then(|ctx| state.dataset.export(&ctx).map(|bytes| (ctx, bytes)))
        .inspect_err(|_| state.health.record_failure())?;

    state.latency.record(Pipeline::Export, started.elapsed());
    state.health.record_export();
    let file_name = format!("pedidos_{}.xlsx", ctx.month.slug());
    info!(month = %ctx.month, bytes = bytes.len(), "Export {file_name}");

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    ))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    Json(LatencyResponse {
        report: state.latency.snapshot(Pipeline::Report),
        export: state.latency.snapshot(Pipeline::Export),
    })
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::dataset::tests::{sample_dataset, sample_workbook};
    use crate::types::{CellValue, Figure, Missing};
    use axum::http::StatusCode;

    fn state() -> ApiState {
        ApiState::new(sample_dataset())
    }

    fn month(s: &str) -> Query<MonthQuery> {
        Query(MonthQuery {
            month: Some(s.to_string()),
        })
    }

    #[tokio::test]
    async fn report_for_requested_month() {
        let st = state();
        let Json(bundle) = get_report(State(st.clone()), month("01/2026")).await.unwrap();
        assert_eq!(bundle.total_revenue, 1500.0);
        assert_eq!(bundle.goal_attainment_pct, Figure::Value(75.0));
        assert_eq!(st.health.reports_served(), 1);
        assert_eq!(st.latency.snapshot(Pipeline::Report).samples, 1);
    }

    #[tokio::test]
    async fn report_defaults_to_first_month() {
        let Json(bundle) = get_report(State(state()), Query(MonthQuery::default()))
            .await
            .unwrap();
        assert_eq!(bundle.month.to_string(), "01/2026");

        let Json(bundle) = get_report(State(state()), month("  ")).await.unwrap();
        assert_eq!(bundle.month.to_string(), "01/2026");
    }

    #[tokio::test]
    async fn bad_month_is_rejected() {
        let st = state();
        let err = get_report(State(st.clone()), month("1/2026")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = get_report(State(st.clone()), month("07/2030")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(st.health.failed_requests(), 2);
        assert_eq!(st.health.reports_served(), 0);
    }

    #[tokio::test]
    async fn empty_dataset_reports_no_data() {
        let mut wb = sample_workbook();
        wb.orders.rows = vec![vec![
            CellValue::Text("never".into()),
            CellValue::Number(1.0),
            CellValue::Empty,
            CellValue::Empty,
            CellValue::Empty,
        ]];
        let st = ApiState::new(Dataset::from_workbook("memory".into(), wb).unwrap());

        let Json(months) = get_months(State(st.clone())).await;
        assert!(months.is_empty());

        let err = get_report(State(st.clone()), Query(MonthQuery::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoData));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn export_sets_download_headers() {
        let st = state();
        let response = get_export(State(st.clone()), month("02/2026"))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"pedidos_02-2026.xlsx\""
        );
        assert_eq!(response.headers()[header::CONTENT_TYPE], XLSX_MIME);
        assert_eq!(st.health.exports_served(), 1);
        assert_eq!(st.latency.snapshot(Pipeline::Export).samples, 1);
    }

    #[tokio::test]
    async fn monthly_series_and_forecast_markers() {
        let Json(series) = get_monthly(State(state())).await;
        assert_eq!(series.len(), 3);

        let Json(bundle) = get_report(State(state()), month("02/2026")).await.unwrap();
        assert_eq!(bundle.goal_amount, Figure::Missing(Missing::NotSet));
        assert!(bundle.forecast_next_month.value().is_some());
    }

    #[tokio::test]
    async fn health_and_latency_reflect_traffic() {
        let st = state();
        let _ = get_report(State(st.clone()), month("03/2026")).await.unwrap();

        let Json(health) = get_health(State(st.clone())).await;
        assert_eq!(health.orders, 4);
        assert_eq!(health.months, 3);
        assert_eq!(health.reports_served, 1);
        assert!(health.last_report_at_ns > 0);

        let Json(latency) = get_stats_latency(State(st)).await;
        assert_eq!(latency.report.samples, 1);
        assert!(latency.report.p99_us.is_some());
        assert_eq!(latency.export, Percentiles::default());
    }
}
