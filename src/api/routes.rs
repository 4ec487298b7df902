use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::alert::RiskTransition;
use crate::api::{health::HealthState, latency::FetchLatency};
use crate::config::{FORECAST_WINDOW, HISTORY_CAP};
use crate::forecast::{forecast_from_history, risk};
use crate::hud::{self, ViewState};
use crate::sandbox::{self, DragReport};
use crate::state::StateStore;
use crate::types::{
    now_ms, Forecast, ForecastPoint, KpSnapshot, NoticesOutcome, RawRecords, RiskAssessment,
    Sample,
};

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<StateStore>,
    pub health: Arc<HealthState>,
    pub latency: Arc<FetchLatency>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/current", get(get_current))
        .route("/history", get(get_history))
        .route("/forecast", get(get_forecast))
        .route("/kp", get(get_kp))
        .route("/notices", get(get_notices))
        .route("/raw", get(get_raw))
        .route("/sandbox", get(get_sandbox))
        .route("/alerts/last", get(get_last_alert))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CurrentQuery {
    /// Minutes back to scrub the live pair; 0 or absent means live.
    pub replay_min: Option<i64>,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub n: Option<usize>,
}

#[derive(Deserialize, Default)]
pub struct SandboxQuery {
    pub altitude_km: Option<f64>,
    pub mass_kg: Option<f64>,
    pub area_m2: Option<f64>,
    pub drag_coeff: Option<f64>,
}

impl SandboxQuery {
    /// Defaults describe a small LEO satellite.
    fn resolve(&self) -> (f64, f64, f64, f64) {
        (
            self.altitude_km.filter(|v| v.is_finite()).unwrap_or(420.0),
            self.mass_kg.filter(|v| v.is_finite()).unwrap_or(260.0),
            self.area_m2.filter(|v| v.is_finite()).unwrap_or(1.1),
            self.drag_coeff.filter(|v| v.is_finite()).unwrap_or(2.2),
        )
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ForecastResponse {
    Available {
        t0: ForecastPoint,
        t30: ForecastPoint,
        t60: ForecastPoint,
        risk_0: RiskAssessment,
        risk_30: RiskAssessment,
        risk_60: RiskAssessment,
    },
    Unavailable,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub last_poll_at_ms: u64,
    pub polls_total: u64,
    pub polls_defaulted: u64,
    pub kp_proxy_active: bool,
    pub history_len: usize,
}

#[derive(Serialize)]
pub struct LatencyResponse {
    pub p50_ms: Option<u64>,
    pub p95_ms: Option<u64>,
    pub p99_ms: Option<u64>,
    pub samples: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// The display-ready view. With `replay_min` the reduction is rerun over the
/// stored inputs at the requested offset; otherwise the published view is
/// returned as-is.
async fn get_current(
    State(state): State<ApiState>,
    Query(params): Query<CurrentQuery>,
) -> Json<ViewState> {
    let replay_min = params.replay_min.unwrap_or(0).max(0);
    if replay_min == 0 {
        return Json(state.store.view().as_ref().clone());
    }
    let latest = state.store.latest();
    // Replay needs the full retained history, not just the fit window.
    let history = state.store.history_window(HISTORY_CAP);
    let kp = state.store.kp();
    let notices = state.store.notices();
    let reduced = hud::reduce(&hud::ReducerInput {
        latest: &latest,
        history: &history,
        kp: kp.as_ref(),
        notices: &notices,
        observer_lat: state.store.observer_lat(),
        replay_offset_min: replay_min,
        now_ms: now_ms(),
    });
    Json(reduced.view)
}

async fn get_history(
    State(state): State<ApiState>,
    Query(params): Query<HistoryQuery>,
) -> Json<Vec<Sample>> {
    let n = params.n.unwrap_or(FORECAST_WINDOW);
    Json(state.store.history_window(n))
}

async fn get_forecast(State(state): State<ApiState>) -> Json<ForecastResponse> {
    let history = state.store.history_window(FORECAST_WINDOW);
    let kp = state.store.kp().map(|s| s.kp);
    let response = match forecast_from_history(&history, now_ms()) {
        Forecast::Available { t0, t30, t60 } => ForecastResponse::Available {
            t0,
            t30,
            t60,
            risk_0: risk::assess(t0.speed, t0.bz, kp),
            risk_30: risk::assess(t30.speed, t30.bz, kp),
            risk_60: risk::assess(t60.speed, t60.bz, kp),
        },
        Forecast::Unavailable => ForecastResponse::Unavailable,
    };
    Json(response)
}

async fn get_kp(State(state): State<ApiState>) -> Json<Option<KpSnapshot>> {
    Json(state.store.kp())
}

async fn get_notices(State(state): State<ApiState>) -> Json<NoticesOutcome> {
    Json(state.store.notices())
}

async fn get_raw(State(state): State<ApiState>) -> Json<Option<RawRecords>> {
    Json(state.store.raw())
}

/// Satellite drag sandbox against the current space-weather drivers.
async fn get_sandbox(
    State(state): State<ApiState>,
    Query(params): Query<SandboxQuery>,
) -> Json<DragReport> {
    let (altitude_km, mass_kg, area_m2, drag_coeff) = params.resolve();
    let latest = state.store.latest();
    let kp = state.store.kp().map(|s| s.kp).unwrap_or(0.0);
    Json(sandbox::evaluate(
        altitude_km,
        mass_kg,
        area_m2,
        drag_coeff,
        latest.speed,
        latest.bz,
        kp,
        latest.density,
    ))
}

async fn get_last_alert(State(state): State<ApiState>) -> Json<Option<RiskTransition>> {
    Json(state.store.last_transition())
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        last_poll_at_ms: state.health.last_poll_at_ms(),
        polls_total: state.health.polls_total(),
        polls_defaulted: state.health.polls_defaulted(),
        kp_proxy_active: state.health.kp_proxy_active(),
        history_len: state.store.history_len(),
    })
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let (p50_ms, p95_ms, p99_ms) = state.latency.percentiles();
    Json(LatencyResponse {
        p50_ms,
        p95_ms,
        p99_ms,
        samples: state.latency.len(),
    })
}
