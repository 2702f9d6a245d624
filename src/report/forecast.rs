use serde::Serialize;

use crate::config::MIN_FORECAST_MONTHS;

/// Least-squares line through `(i, values[i])` and its value one step past the end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub next: f64,
}

/// Fit a degree-1 trend to monthly totals indexed `0..n` and extrapolate to
/// index `n`. Returns `None` with fewer than [`MIN_FORECAST_MONTHS`] points;
/// that is "not enough data", not an error.
pub fn forecast_next(values: &[f64]) -> Option<LinearFit> {
    if values.len() < MIN_FORECAST_MONTHS {
        return None;
    }

    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / n;

    let (sxx, sxy) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sxx, sxy), (i, y)| {
            let dx = i as f64 - x_mean;
            (sxx + dx * dx, sxy + dx * (y - y_mean))
        });

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let next = slope * n + intercept;

    (slope.is_finite() && next.is_finite()).then_some(LinearFit {
        slope,
        intercept,
        next,
    })
}
