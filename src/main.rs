mod api;
mod config;
mod error;
mod ingest;
mod report;
mod state;
mod types;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::state::Dataset;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Workbook load: read once, shared read-only afterwards ---
    let dataset = Dataset::load(&cfg)?;

    let summary = dataset.summary();
    match (summary.months.first(), summary.months.last()) {
        (Some(first), Some(last)) => info!(
            "Months available: {} .. {} ({} total)",
            first,
            last,
            summary.months.len()
        ),
        _ => info!("No valid orders found; reports will answer 404 until the workbook has data"),
    }

    // --- HTTP API server ---
    let api_state = ApiState::new(dataset);
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
