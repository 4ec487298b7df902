pub mod risk;

use crate::config::{FORECAST_MIN_SAMPLES, FORECAST_WINDOW, SMOOTH_WINDOW};
use crate::types::{Forecast, ForecastPoint, Sample};

/// Degenerate time-variance guard: below this the slope is treated as zero.
const VARIANCE_EPSILON: f64 = 1e-9;

/// Speed-to-tempo mapping: [300, 800] km/s clamps onto [60, 176] BPM.
pub fn speed_to_bpm(speed: f64) -> f64 {
    let v = speed.clamp(300.0, 800.0);
    60.0 + (v - 300.0) * (116.0 / 500.0)
}

/// Median of a slice; 0 for an empty one.
fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    let mid = n / 2;
    if n % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Trailing median filter: element `i` becomes the median of the window
/// `[i-w, i]`. Knocks down single-sample spikes before line fitting.
/// Series no longer than the window pass through unchanged.
fn smooth(series: &[f64], w: usize) -> Vec<f64> {
    if series.len() <= w {
        return series.to_vec();
    }
    (0..series.len())
        .map(|i| median(&series[i.saturating_sub(w)..=i]))
        .collect()
}

/// An ordinary least-squares line `value = slope * t + intercept`.
#[derive(Debug, Clone, Copy)]
struct TrendLine {
    slope: f64,
    intercept: f64,
}

impl TrendLine {
    fn value_at(&self, t: f64) -> f64 {
        self.intercept + self.slope * t
    }
}

/// Fit a line to (xs, ys). The fit is computed about the mean to keep the
/// sums well-conditioned with epoch-millisecond abscissae. A degenerate time
/// variance (all timestamps equal, or a single point) yields slope 0 with
/// the last value as intercept.
fn fit_line(xs: &[f64], ys: &[f64]) -> TrendLine {
    let n = xs.len();
    let last = ys.last().copied().unwrap_or(0.0);
    if n < 2 {
        return TrendLine { slope: 0.0, intercept: last };
    }

    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for i in 0..n {
        let dx = xs[i] - mean_x;
        sxx += dx * dx;
        sxy += dx * (ys[i] - mean_y);
    }

    if sxx.abs() < VARIANCE_EPSILON {
        return TrendLine { slope: 0.0, intercept: last };
    }
    let slope = sxy / sxx;
    TrendLine {
        slope,
        intercept: mean_y - slope * mean_x,
    }
}

/// Project Bz and speed at +0/+30/+60 minutes from `now_ms` out of the
/// trailing sample window. Fewer than `FORECAST_MIN_SAMPLES` samples is a
/// valid, silently-handled state reported as `Unavailable`.
pub fn forecast_from_history(samples: &[Sample], now_ms: i64) -> Forecast {
    let skip = samples.len().saturating_sub(FORECAST_WINDOW);
    let window = &samples[skip..];
    if window.len() < FORECAST_MIN_SAMPLES {
        return Forecast::Unavailable;
    }

    let xs: Vec<f64> = window.iter().map(|s| s.t_ms as f64).collect();
    let bz_series = smooth(&window.iter().map(|s| s.bz).collect::<Vec<_>>(), SMOOTH_WINDOW);
    let speed_series =
        smooth(&window.iter().map(|s| s.speed).collect::<Vec<_>>(), SMOOTH_WINDOW);

    let bz_line = fit_line(&xs, &bz_series);
    let speed_line = fit_line(&xs, &speed_series);

    let at = |offset_ms: i64| {
        let t = (now_ms + offset_ms) as f64;
        let speed = speed_line.value_at(t);
        ForecastPoint {
            bz: bz_line.value_at(t),
            speed,
            bpm: speed_to_bpm(speed),
        }
    };

    Forecast::Available {
        t0: at(0),
        t30: at(30 * 60_000),
        t60: at(60 * 60_000),
    }
}
