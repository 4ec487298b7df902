use crate::error::{AppError, Result};

pub const PLASMA_URL: &str =
    "https://services.swpc.noaa.gov/products/solar-wind/plasma-2-hour.json";
pub const MAG_URL: &str = "https://services.swpc.noaa.gov/products/solar-wind/mag-2-hour.json";
pub const KP_URL: &str = "https://services.swpc.noaa.gov/json/rtsw/rtsw_kp_1m.json";
pub const DONKI_BASE_URL: &str = "https://api.nasa.gov";

/// Wind/field poll cadence (seconds).
pub const WIND_POLL_SECS: u64 = 30;

/// Kp poll cadence (seconds).
pub const KP_POLL_SECS: u64 = 5 * 60;

/// DONKI notification poll cadence (seconds).
pub const NOTICE_POLL_SECS: u64 = 15 * 60;

/// Maximum retained samples; oldest evicted first once exceeded.
pub const HISTORY_CAP: usize = 200;

/// Maximum samples accepted by the one-time startup backfill.
pub const SEED_LIMIT: usize = 40;

/// Trailing window the forecast engine fits against.
pub const FORECAST_WINDOW: usize = 40;

/// Below this many samples the forecast is reported unavailable
/// rather than extrapolated from too little data.
pub const FORECAST_MIN_SAMPLES: usize = 6;

/// Trailing median-filter window applied before line fitting.
pub const SMOOTH_WINDOW: usize = 2;

/// DONKI lookback window (days).
pub const NOTICE_WINDOW_DAYS: i64 = 3;

/// Maximum notices retained per poll.
pub const NOTICE_KEEP: usize = 6;

/// Kp pseudo-series length when synthesizing the proxy fallback.
pub const KP_PROXY_POINTS: usize = 24;

/// Kp pseudo-series spacing (minutes).
pub const KP_PROXY_STEP_MIN: i64 = 30;

/// Live Kp series points retained for charting consumers.
pub const KP_SERIES_KEEP: usize = 48;

/// Channel capacity for risk-transition events.
pub const CHANNEL_CAPACITY: usize = 64;

/// Fallback reading used whenever the wind/field fetch fails.
pub mod default_reading {
    pub const SPEED: f64 = 360.0;
    pub const DENSITY: f64 = 4.0;
    pub const BT: f64 = 4.0;
    pub const BZ: f64 = 1.0;
}

/// Risk label boundaries on the 0-100 score.
pub mod risk_thresholds {
    pub const HIGH_MIN: u8 = 70;
    pub const ELEVATED_MIN: u8 = 40;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub plasma_url: String,
    pub mag_url: String,
    pub kp_url: String,
    pub donki_base_url: String,
    /// DONKI api_key query parameter (NASA_API_KEY, defaults to DEMO_KEY).
    pub nasa_api_key: String,
    pub log_level: String,
    pub api_port: u16,
    /// Observer latitude in degrees (OBSERVER_LAT), used for the
    /// aurora-visibility readout. Unset means "not personalized".
    pub observer_lat: Option<f64>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            plasma_url: std::env::var("PLASMA_URL").unwrap_or_else(|_| PLASMA_URL.to_string()),
            mag_url: std::env::var("MAG_URL").unwrap_or_else(|_| MAG_URL.to_string()),
            kp_url: std::env::var("KP_URL").unwrap_or_else(|_| KP_URL.to_string()),
            donki_base_url: std::env::var("DONKI_BASE_URL")
                .unwrap_or_else(|_| DONKI_BASE_URL.to_string()),
            nasa_api_key: std::env::var("NASA_API_KEY").unwrap_or_else(|_| "DEMO_KEY".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            observer_lat: std::env::var("OBSERVER_LAT")
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|lat| lat.is_finite() && lat.abs() <= 90.0),
        })
    }
}
