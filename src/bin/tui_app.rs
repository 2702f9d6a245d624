use serde::Deserialize;

// ---------------------------------------------------------------------------
// API response types (mirror routes.rs shapes)
// ---------------------------------------------------------------------------

/// A number, or the marker the server sends in its place
/// ("not set", "undefined", "unavailable").
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Figure {
    Value(f64),
    Missing(String),
}

impl Figure {
    pub fn value(&self) -> Option<f64> {
        match self {
            Figure::Value(v) => Some(*v),
            Figure::Missing(_) => None,
        }
    }

    /// Format the value with `fmt`, or show the marker as-is.
    pub fn show(&self, fmt: impl Fn(f64) -> String) -> String {
        match self {
            Figure::Value(v) => fmt(*v),
            Figure::Missing(m) => m.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct TableSummary {
    pub rows: usize,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct SummaryResponse {
    pub source: String,
    pub loaded_at: String,
    pub orders: usize,
    pub rows_read: usize,
    pub dropped_bad_date: usize,
    pub unreadable_amounts: usize,
    pub profit_derived: bool,
    pub months: Vec<String>,
    pub first_order: Option<String>,
    pub last_order: Option<String>,
    pub technicians: usize,
    pub suppliers: usize,
    pub targets: usize,
    pub customers: Option<TableSummary>,
    pub partners: Option<TableSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TechnicianResponse {
    pub technician: String,
    pub gross_profit: f64,
    pub order_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct ReportResponse {
    pub month: String,
    pub total_revenue: f64,
    pub total_profit: f64,
    pub order_count: usize,
    pub average_ticket: Figure,
    pub goal_amount: Figure,
    pub goal_attainment_pct: Figure,
    pub goal_progress: Figure,
    pub shortfall: f64,
    pub projected_orders_to_goal: Figure,
    pub forecast_next_month: Figure,
    pub technician_profit: Vec<TechnicianResponse>,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct MonthlyResponse {
    pub month: String,
    pub total_revenue: f64,
    pub total_profit: f64,
    pub order_count: usize,
    pub average_ticket: Figure,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct PercentilesResponse {
    pub p50_us: Option<u64>,
    pub p95_us: Option<u64>,
    pub p99_us: Option<u64>,
    pub samples: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct LatencyResponse {
    pub report: PercentilesResponse,
    pub export: PercentilesResponse,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: String,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub summary: SummaryResponse,
    pub months: Vec<String>,
    /// Index into `months`; the session's selected month.
    pub selected: usize,
    pub report: Option<ReportResponse>,
    pub monthly: Vec<MonthlyResponse>,
    pub latency: LatencyResponse,
    /// One-line message for the footer (export result, report error).
    pub notice: Option<String>,
    pub last_refresh: std::time::Instant,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            summary: SummaryResponse::default(),
            months: Vec::new(),
            selected: 0,
            report: None,
            monthly: Vec::new(),
            latency: LatencyResponse::default(),
            notice: None,
            last_refresh: std::time::Instant::now(),
            base_url,
        }
    }

    pub fn selected_month(&self) -> Option<&str> {
        self.months.get(self.selected).map(String::as_str)
    }

    /// Move the selection one month forward; stops at the last month.
    pub fn select_next(&mut self) -> bool {
        if self.selected + 1 < self.months.len() {
            self.selected += 1;
            true
        } else {
            false
        }
    }

    /// Move the selection one month back; stops at the first month.
    pub fn select_prev(&mut self) -> bool {
        if self.selected > 0 && !self.months.is_empty() {
            self.selected -= 1;
            true
        } else {
            false
        }
    }

    /// Replace the month list, keeping the same month selected when it is
    /// still present. Falls back to the earliest month.
    pub fn set_months(&mut self, months: Vec<String>) {
        let current = self.selected_month().map(str::to_string);
        self.selected = current
            .and_then(|m| months.iter().position(|x| *x == m))
            .unwrap_or(0);
        self.months = months;
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let summary_url = format!("{}/summary", self.base_url);
        let months_url = format!("{}/months", self.base_url);
        let monthly_url = format!("{}/report/monthly", self.base_url);
        let latency_url = format!("{}/stats/latency", self.base_url);

        let (summary_res, months_res, monthly_res, latency_res) = tokio::join!(
            client.get(&summary_url).send(),
            client.get(&months_url).send(),
            client.get(&monthly_url).send(),
            client.get(&latency_url).send(),
        );

        let (summary_resp, months_resp, monthly_resp) = match (summary_res, months_res, monthly_res) {
            (Ok(s), Ok(m), Ok(ml)) => (s, m, ml),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };

        let (summary, months, monthly) = tokio::join!(
            summary_resp.json::<SummaryResponse>(),
            months_resp.json::<Vec<String>>(),
            monthly_resp.json::<Vec<MonthlyResponse>>(),
        );

        match (summary, months, monthly) {
            (Ok(s), Ok(m), Ok(ml)) => {
                self.summary = s;
                self.set_months(m);
                self.monthly = ml;
                self.status = ConnectionStatus::Connected;
                self.last_refresh = std::time::Instant::now();

                if let Ok(l) = latency_res {
                    if let Ok(latency) = l.json::<LatencyResponse>().await {
                        self.latency = latency;
                    }
                }
                self.refresh_report(client).await;
            }
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
            }
        }
    }

    /// Fetch the report bundle for the selected month only.
    pub async fn refresh_report(&mut self, client: &reqwest::Client) {
        let Some(month) = self.selected_month().map(str::to_string) else {
            self.report = None;
            self.notice = Some("no valid orders in the workbook".to_string());
            return;
        };

        let url = format!("{}/report", self.base_url);
        match client.get(&url).query(&[("month", &month)]).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<ReportResponse>().await {
                Ok(report) => self.show_report(report),
                Err(e) => self.status = ConnectionStatus::Error(format!("parse error: {e}")),
            },
            Ok(resp) => {
                let status = resp.status();
                let message = resp
                    .json::<ErrorResponse>()
                    .await
                    .map(|e| e.error)
                    .unwrap_or_else(|_| status.to_string());
                self.show_report_error(&month, &message);
            }
            Err(e) => self.status = ConnectionStatus::Error(format!("{e}")),
        }
    }

    /// A successful report replaces any earlier failure notice.
    pub fn show_report(&mut self, report: ReportResponse) {
        self.report = Some(report);
        self.notice = None;
    }

    pub fn show_report_error(&mut self, month: &str, message: &str) {
        self.report = None;
        self.notice = Some(format!("report {month}: {message}"));
    }

    /// Download the selected month's orders into the current directory.
    pub async fn export(&mut self, client: &reqwest::Client) {
        let Some(month) = self.selected_month().map(str::to_string) else {
            self.notice = Some("nothing to export".to_string());
            return;
        };

        let url = format!("{}/export", self.base_url);
        let bytes = match client.get(&url).query(&[("month", &month)]).send().await {
            Ok(resp) if resp.status().is_success() => resp.bytes().await,
            Ok(resp) => {
                self.notice = Some(format!("export {month} failed: {}", resp.status()));
                return;
            }
            Err(e) => {
                self.notice = Some(format!("export {month} failed: {e}"));
                return;
            }
        };

        let file_name = export_file_name(&month);
        self.notice = Some(match bytes {
            Ok(b) => match tokio::fs::write(&file_name, &b).await {
                Ok(()) => format!("saved {file_name} ({} bytes)", b.len()),
                Err(e) => format!("could not write {file_name}: {e}"),
            },
            Err(e) => format!("export {month} failed: {e}"),
        });
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// `R$ 1,234.56`, negative values as `-R$ 12.00`.
pub fn format_money(v: f64) -> String {
    let cents = (v.abs() * 100.0).round() as u64;
    let digits = (cents / 100).to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if v < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}R$ {grouped}.{:02}", cents % 100)
}

pub fn format_pct(v: f64) -> String {
    format!("{v:.1}%")
}

/// "01/2026" -> "pedidos_01-2026.xlsx"
pub fn export_file_name(month: &str) -> String {
    format!("pedidos_{}.xlsx", month.replace('/', "-"))
}

/// Short bar label for a month bucket: "01/2026" -> "01/26".
pub fn short_month(month: &str) -> String {
    match month.split_once('/') {
        Some((m, y)) if y.len() == 4 && y.is_ascii() => format!("{m}/{}", &y[2..]),
        _ => month.to_string(),
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

#[allow(dead_code)]
fn main() {
    // Entry point lives in src/bin/tui.rs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_groups_thousands() {
        assert_eq!(format_money(1500.0), "R$ 1,500.00");
        assert_eq!(format_money(1_234_567.891), "R$ 1,234,567.89");
        assert_eq!(format_money(0.0), "R$ 0.00");
        assert_eq!(format_money(999.999), "R$ 1,000.00");
        assert_eq!(format_money(-50.5), "-R$ 50.50");
    }

    const FEBRUARY: &str = r#"{
        "month": "02/2026", "total_revenue": 1700.0, "total_profit": 1500.0,
        "order_count": 1, "average_ticket": 1700.0, "goal_amount": "not set",
        "goal_attainment_pct": "not set", "goal_progress": "not set",
        "shortfall": 0.0, "projected_orders_to_goal": "undefined",
        "forecast_next_month": 2100.0,
        "technician_profit": [{"technician": "Ana", "gross_profit": 1500.0, "order_count": 1}]
    }"#;

    #[test]
    fn report_success_clears_earlier_failure() {
        let mut app = AppState::new("http://localhost:3000".into());
        app.set_months(vec!["01/2026".into(), "02/2026".into()]);

        app.show_report_error("01/2026", "No orders for month 01/2026");
        assert!(app.report.is_none());
        assert_eq!(app.notice.as_deref(), Some("report 01/2026: No orders for month 01/2026"));

        app.select_next();
        app.show_report(serde_json::from_str(FEBRUARY).unwrap());
        assert_eq!(app.notice, None);
        assert_eq!(app.report.as_ref().map(|r| r.month.as_str()), Some("02/2026"));
    }

    #[test]
    fn figures_parse_numbers_and_markers() {
        let report: ReportResponse = serde_json::from_str(FEBRUARY).unwrap();
        assert_eq!(report.goal_attainment_pct, Figure::Missing("not set".into()));
        assert_eq!(report.projected_orders_to_goal.show(|v| v.to_string()), "undefined");
        assert_eq!(report.forecast_next_month.value(), Some(2100.0));
        assert_eq!(report.average_ticket.show(format_money), "R$ 1,700.00");
    }

    #[test]
    fn month_selection_is_clamped() {
        let mut app = AppState::new("http://localhost:3000".into());
        assert!(!app.select_next());
        assert!(!app.select_prev());
        assert_eq!(app.selected_month(), None);

        app.set_months(vec!["01/2026".into(), "02/2026".into()]);
        assert_eq!(app.selected_month(), Some("01/2026"));
        assert!(app.select_next());
        assert!(!app.select_next());
        assert_eq!(app.selected_month(), Some("02/2026"));

        // Reload keeps the same month selected even when its index moves.
        app.set_months(vec!["12/2025".into(), "01/2026".into(), "02/2026".into()]);
        assert_eq!(app.selected_month(), Some("02/2026"));

        app.set_months(vec!["03/2026".into()]);
        assert_eq!(app.selected_month(), Some("03/2026"));
    }

    #[test]
    fn labels_and_file_names() {
        assert_eq!(export_file_name("01/2026"), "pedidos_01-2026.xlsx");
        assert_eq!(short_month("11/2025"), "11/25");
        assert_eq!(short_month("01/€x"), "01/€x");
        assert_eq!(short_month("2026"), "2026");
        assert_eq!(format_pct(75.0), "75.0%");
        assert_eq!(truncate("Instalação Centro", 8), "Instala…");
        assert_eq!(truncate("Ana", 8), "Ana");
    }
}
