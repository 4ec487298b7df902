mod alert;
mod api;
mod config;
mod error;
mod feed;
mod forecast;
mod history;
mod hud;
mod poll;
mod sandbox;
mod state;
mod types;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::alert::{RiskNotifier, RiskTransition};
use crate::api::health::HealthState;
use crate::api::latency::FetchLatency;
use crate::api::routes::{router, ApiState};
use crate::config::{Config, CHANNEL_CAPACITY};
use crate::error::Result;
use crate::feed::swpc;
use crate::poll::{refresh_view, KpPoller, NoticePoller, WindFieldPoller};
use crate::state::StateStore;

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
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .build()?;

    // --- In-memory state ---
    let store = StateStore::new(cfg.observer_lat);
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(FetchLatency::new());

    // --- History seed: trailing feed rows so the forecast is useful at
    // startup instead of 20 minutes in ---
    match swpc::fetch_seed_samples(&client, &cfg).await {
        Ok(samples) => {
            let seeded = store.seed_history(samples);
            info!("Seed complete: {seeded} samples");
        }
        Err(e) => warn!("Seed fetch failed, starting with empty history: {e}"),
    }
    refresh_view(&store);

    // --- Alert channel ---
    let (alert_tx, alert_rx) = mpsc::channel::<RiskTransition>(CHANNEL_CAPACITY);
    let alert_store = Arc::clone(&store);
    tokio::spawn(async move {
        alert_consumer(alert_rx, alert_store).await;
    });

    // --- Spawn pollers ---

    // Wind/field poller (every 30s, first tick immediate)
    let wind_poller = WindFieldPoller::new(
        cfg.clone(),
        Arc::clone(&store),
        client.clone(),
        Arc::clone(&health),
        Arc::clone(&latency),
        RiskNotifier::new(alert_tx),
    );
    tokio::spawn(async move { wind_poller.run().await });

    // Kp poller (every 5 min)
    let kp_poller = KpPoller::new(
        cfg.clone(),
        Arc::clone(&store),
        client.clone(),
        Arc::clone(&health),
    );
    tokio::spawn(async move { kp_poller.run().await });

    // Notice poller (every 15 min)
    let notice_poller = NoticePoller::new(cfg.clone(), Arc::clone(&store), client.clone());
    tokio::spawn(async move { notice_poller.run().await });

    // --- HTTP API server ---
    let api_state = ApiState {
        store: Arc::clone(&store),
        health,
        latency,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Consumes risk transitions: logs each one and records the latest for the
/// /alerts/last endpoint.
async fn alert_consumer(mut rx: mpsc::Receiver<RiskTransition>, store: Arc<StateStore>) {
    while let Some(transition) = rx.recv().await {
        let from = transition
            .from
            .map(|l| l.to_string())
            .unwrap_or_else(|| "none".to_string());
        info!(
            event = "RISK_TRANSITION",
            from = %from,
            to = %transition.to,
            score = transition.score,
            "RISK {} → {} (score {})",
            from, transition.to, transition.score,
        );
        store.set_last_transition(transition);
    }
}
