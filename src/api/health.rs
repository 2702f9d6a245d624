//! Shared counters for the /health endpoint.
//! Updated by the report and export handlers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Request counters. Handlers update, the API reads.
#[derive(Default)]
pub struct HealthState {
    pub reports_served: AtomicU64,
    pub exports_served: AtomicU64,
    /// Requests answered with an error status.
    pub failed_requests: AtomicU64,
    /// Nanosecond timestamp of the last successful report (0 = none).
    pub last_report_at_ns: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_report(&self, at_ns: u64) {
        self.reports_served.fetch_add(1, Ordering::Relaxed);
        self.last_report_at_ns.store(at_ns, Ordering::Relaxed);
    }

    pub fn record_export(&self) {
        self.exports_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reports_served(&self) -> u64 {
        self.reports_served.load(Ordering::Relaxed)
    }

    pub fn exports_served(&self) -> u64 {
        self.exports_served.load(Ordering::Relaxed)
    }

    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Relaxed)
    }

    pub fn last_report_at_ns(&self) -> u64 {
        self.last_report_at_ns.load(Ordering::Relaxed)
    }
}
