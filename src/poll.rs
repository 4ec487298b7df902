use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::interval;
use tracing::info;

use crate::alert::RiskNotifier;
use crate::api::{health::HealthState, latency::FetchLatency};
use crate::config::{Config, FORECAST_WINDOW, KP_POLL_SECS, NOTICE_POLL_SECS, WIND_POLL_SECS};
use crate::feed::{donki, kp, swpc};
use crate::hud::{self, Reduced};
use crate::state::StateStore;
use crate::types::{now_ms, FeedSource, KpSource, RiskAssessment, Sample};

/// Re-reduce the stored inputs and publish the resulting view wholesale.
/// Returns the +30 min risk read for the alerting path.
pub fn refresh_view(store: &StateStore) -> Option<RiskAssessment> {
    let latest = store.latest();
    let history = store.history_window(FORECAST_WINDOW);
    let kp = store.kp();
    let notices = store.notices();
    let Reduced { view, risk_30 } = hud::reduce(&hud::ReducerInput {
        latest: &latest,
        history: &history,
        kp: kp.as_ref(),
        notices: &notices,
        observer_lat: store.observer_lat(),
        replay_offset_min: 0,
        now_ms: now_ms(),
    });
    store.publish_view(view);
    risk_30
}

// ---------------------------------------------------------------------------
// Wind/field poller (30s cadence)
// ---------------------------------------------------------------------------

pub struct WindFieldPoller {
    cfg: Config,
    store: Arc<StateStore>,
    client: reqwest::Client,
    health: Arc<HealthState>,
    latency: Arc<FetchLatency>,
    notifier: RiskNotifier,
}

impl WindFieldPoller {
    pub fn new(
        cfg: Config,
        store: Arc<StateStore>,
        client: reqwest::Client,
        health: Arc<HealthState>,
        latency: Arc<FetchLatency>,
        notifier: RiskNotifier,
    ) -> Self {
        Self { cfg, store, client, health, latency, notifier }
    }

    pub async fn run(mut self) {
        let mut ticker = interval(Duration::from_secs(WIND_POLL_SECS));
        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }

    async fn poll_once(&mut self) {
        let started = Instant::now();
        let outcome = swpc::fetch_wind_and_field(&self.client, &self.cfg).await;
        self.latency.record(started.elapsed());

        let now = now_ms();
        let defaulted = outcome.reading.source == FeedSource::Defaulted;

        // History timestamps are wall-clock arrival time, whatever the feed
        // says: the forecast regresses against observation spacing, and the
        // defaulted reading has no feed timestamp at all.
        self.store.append_sample(Sample {
            t_ms: now,
            speed: outcome.reading.speed,
            bz: outcome.reading.bz,
        });
        if let Some(raw) = outcome.raw {
            self.store.set_raw(raw);
        }
        self.store.set_latest(outcome.reading.clone());
        self.health.record_poll(now, defaulted);

        let risk_30 = refresh_view(&self.store);
        self.notifier.observe(risk_30.as_ref(), now);

        info!(
            speed = outcome.reading.speed,
            bz = outcome.reading.bz,
            source = %outcome.reading.source,
            history_len = self.store.history_len(),
            "wind/field poll complete",
        );
    }
}

// ---------------------------------------------------------------------------
// Kp poller (5 min cadence)
// ---------------------------------------------------------------------------

pub struct KpPoller {
    cfg: Config,
    store: Arc<StateStore>,
    client: reqwest::Client,
    health: Arc<HealthState>,
}

impl KpPoller {
    pub fn new(
        cfg: Config,
        store: Arc<StateStore>,
        client: reqwest::Client,
        health: Arc<HealthState>,
    ) -> Self {
        Self { cfg, store, client, health }
    }

    pub async fn run(self) {
        let mut ticker = interval(Duration::from_secs(KP_POLL_SECS));
        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }

    async fn poll_once(&self) {
        let latest = self.store.latest();
        let snapshot =
            kp::fetch_kp(&self.client, &self.cfg, latest.speed, latest.bz, now_ms()).await;
        let proxy = snapshot.source == KpSource::Proxy;
        info!(kp = snapshot.kp, source = %snapshot.source, "Kp poll complete");
        self.store.set_kp(snapshot);
        self.health.set_kp_proxy_active(proxy);
        refresh_view(&self.store);
    }
}

// ---------------------------------------------------------------------------
// Notice poller (15 min cadence)
// ---------------------------------------------------------------------------

pub struct NoticePoller {
    cfg: Config,
    store: Arc<StateStore>,
    client: reqwest::Client,
}

impl NoticePoller {
    pub fn new(cfg: Config, store: Arc<StateStore>, client: reqwest::Client) -> Self {
        Self { cfg, store, client }
    }

    pub async fn run(self) {
        let mut ticker = interval(Duration::from_secs(NOTICE_POLL_SECS));
        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }

    async fn poll_once(&self) {
        let outcome =
            donki::fetch_notifications(&self.client, &self.cfg, donki::default_window_days()).await;
        info!(elevated_watch = outcome.elevated_watch(), "notice poll complete");
        self.store.set_notices(outcome);
        refresh_view(&self.store);
    }
}
