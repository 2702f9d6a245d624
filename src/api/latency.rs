//! Request latency histograms, one per pipeline.
//! The report histogram covers month resolution through the finished bundle;
//! the export histogram also includes writing the xlsx bytes.

use std::sync::Mutex;
use std::time::Duration;

use hdrhistogram::Histogram;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    Report,
    Export,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Percentiles {
    pub p50_us: Option<u64>,
    pub p95_us: Option<u64>,
    pub p99_us: Option<u64>,
    pub samples: u64,
}

/// Microsecond histograms, 1us to 100s at 3 significant figures.
pub struct LatencyStats {
    report: Mutex<Histogram<u64>>,
    export: Mutex<Histogram<u64>>,
}

impl LatencyStats {
    pub fn new() -> Self {
        Self {
            report: Mutex::new(histogram()),
            export: Mutex::new(histogram()),
        }
    }

    fn slot(&self, pipeline: Pipeline) -> &Mutex<Histogram<u64>> {
        match pipeline {
            Pipeline::Report => &self.report,
            Pipeline::Export => &self.export,
        }
    }

    /// Sub-microsecond runs count as 1us.
    pub fn record(&self, pipeline: Pipeline, d: Duration) {
        let us = u64::try_from(d.as_micros()).unwrap_or(u64::MAX).max(1);
        if let Ok(mut h) = self.slot(pipeline).lock() {
            h.saturating_record(us);
        }
    }

    pub fn snapshot(&self, pipeline: Pipeline) -> Percentiles {
        let Ok(h) = self.slot(pipeline).lock() else {
            return Percentiles::default();
        };
        if h.len() == 0 {
            return Percentiles::default();
        }
        Percentiles {
            p50_us: Some(h.value_at_quantile(0.5)),
            p95_us: Some(h.value_at_quantile(0.95)),
            p99_us: Some(h.value_at_quantile(0.99)),
            samples: h.len(),
        }
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}

fn histogram() -> Histogram<u64> {
    Histogram::new_with_bounds(1, 100_000_000, 3).expect("valid histogram bounds")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pipeline_has_no_percentiles() {
        let stats = LatencyStats::new();
        assert_eq!(stats.snapshot(Pipeline::Report), Percentiles::default());
    }

    #[test]
    fn pipelines_are_tracked_separately() {
        let stats = LatencyStats::new();
        for us in 1..=100 {
            stats.record(Pipeline::Report, Duration::from_micros(us));
        }
        stats.record(Pipeline::Report, Duration::ZERO);
        stats.record(Pipeline::Export, Duration::from_millis(40));

        let report = stats.snapshot(Pipeline::Report);
        assert_eq!(report.samples, 101);
        let (p50, p95, p99) = (report.p50_us.unwrap(), report.p95_us.unwrap(), report.p99_us.unwrap());
        assert!(p50 <= p95 && p95 <= p99);
        assert!((45..=55).contains(&p50), "p50={p50}");

        let export = stats.snapshot(Pipeline::Export);
        assert_eq!(export.samples, 1);
        assert!(export.p50_us.unwrap() >= 39_000);
    }
}
