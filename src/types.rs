use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

// ---------------------------------------------------------------------------
// Samples & readings
// ---------------------------------------------------------------------------

/// One observation of the solar wind, as appended to the history.
/// Immutable once created; `t_ms` is wall-clock time of insertion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub t_ms: i64,
    pub speed: f64,
    pub bz: f64,
}

/// Whether a reading came off the wire or is the documented fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    Live,
    Defaulted,
}

impl std::fmt::Display for FeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedSource::Live => write!(f, "live"),
            FeedSource::Defaulted => write!(f, "defaulted"),
        }
    }
}

/// Most recent scalar snapshot of the wind/field pair. Replaced wholesale on
/// every poll; Kp lives in its own snapshot and is joined by the reducer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestReading {
    pub speed: f64,
    pub density: f64,
    pub bt: f64,
    pub bz: f64,
    /// ISO timestamp from the feed, or synthesized wall-clock time.
    pub updated_at: String,
    pub source: FeedSource,
}

/// Last raw plasma/mag records, kept for the raw-data readout.
#[derive(Debug, Clone, Serialize)]
pub struct RawRecords {
    pub plasma: serde_json::Value,
    pub mag: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Kp
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KpSource {
    Live,
    /// Deterministic proxy computed from the latest wind speed and Bz.
    Proxy,
}

impl std::fmt::Display for KpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KpSource::Live => write!(f, "live"),
            KpSource::Proxy => write!(f, "proxy"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KpPoint {
    pub t_ms: i64,
    pub kp: f64,
}

/// Current Kp plus the trailing series handed to charting consumers.
/// The series is never empty: the proxy path synthesizes a flat one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpSnapshot {
    pub kp: f64,
    pub source: KpSource,
    pub series: Vec<KpPoint>,
}

// ---------------------------------------------------------------------------
// Notices (DONKI)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub message_type: String,
    pub issued_at: String,
    /// First line of the message body, truncated for display.
    pub summary: String,
}

/// Outcome of a notification poll. `Unavailable` (the request failed) is
/// distinct from `Available` with zero matching notices.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum NoticesOutcome {
    Available {
        notices: Vec<Notice>,
        /// True when any retained notice body carries a storm-class
        /// indicator (G1-G5, M-class, X-class, CME).
        elevated_watch: bool,
    },
    Unavailable,
}

impl NoticesOutcome {
    pub fn elevated_watch(&self) -> bool {
        match self {
            NoticesOutcome::Available { elevated_watch, .. } => *elevated_watch,
            NoticesOutcome::Unavailable => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Forecast & risk
// ---------------------------------------------------------------------------

/// A projection at one offset from now.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub bz: f64,
    pub speed: f64,
    pub bpm: f64,
}

/// Insufficient history is a legitimate state, not an error; consumers
/// render a neutral placeholder rather than stale or zeroed numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Forecast {
    Unavailable,
    Available {
        t0: ForecastPoint,
        t30: ForecastPoint,
        t60: ForecastPoint,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLabel {
    Low,
    Elevated,
    High,
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskLabel::Low => "low",
            RiskLabel::Elevated => "elevated",
            RiskLabel::High => "high",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub label: RiskLabel,
}

// ---------------------------------------------------------------------------
// Time helpers
// ---------------------------------------------------------------------------

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
