//! Shared health state for the /health endpoint.
//! Updated by the pollers, read by the API.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    /// Millisecond timestamp of the last wind/field poll (0 = none yet).
    pub last_poll_at_ms: AtomicU64,
    /// Total wind/field polls since startup.
    pub polls_total: AtomicU64,
    /// Polls that fell back to the defaulted reading.
    pub polls_defaulted: AtomicU64,
    /// True while Kp is the local proxy rather than the live feed.
    pub kp_proxy_active: AtomicBool,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_poll(&self, at_ms: i64, defaulted: bool) {
        self.last_poll_at_ms.store(at_ms.max(0) as u64, Ordering::Relaxed);
        self.polls_total.fetch_add(1, Ordering::Relaxed);
        if defaulted {
            self.polls_defaulted.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn set_kp_proxy_active(&self, v: bool) {
        self.kp_proxy_active.store(v, Ordering::Relaxed);
    }

    pub fn last_poll_at_ms(&self) -> u64 {
        self.last_poll_at_ms.load(Ordering::Relaxed)
    }

    pub fn polls_total(&self) -> u64 {
        self.polls_total.load(Ordering::Relaxed)
    }

    pub fn polls_defaulted(&self) -> u64 {
        self.polls_defaulted.load(Ordering::Relaxed)
    }

    pub fn kp_proxy_active(&self) -> bool {
        self.kp_proxy_active.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_poll_tracks_defaulted_separately() {
        let health = HealthState::new();
        health.record_poll(1_000, false);
        health.record_poll(2_000, true);
        health.record_poll(3_000, false);
        assert_eq!(health.polls_total(), 3);
        assert_eq!(health.polls_defaulted(), 1);
        assert_eq!(health.last_poll_at_ms(), 3_000);
    }
}
