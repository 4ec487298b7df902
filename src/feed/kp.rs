use serde_json::Value;
use tracing::warn;

use crate::config::{Config, KP_PROXY_POINTS, KP_PROXY_STEP_MIN, KP_SERIES_KEEP};
use crate::error::Result;
use crate::feed::{normalize_records, num_field, parse_iso_ms, str_field};
use crate::types::{KpPoint, KpSnapshot, KpSource};

const KP_ALIASES: &[&str] = &["kp_index", "value"];
const TIME_ALIASES: &[&str] = &["time_tag", "timestamp", "time"];

/// Fetch the real-time Kp feed. When the feed is unreachable, malformed, or
/// yields no usable points, fall back to the deterministic proxy computed
/// from the latest known wind speed and Bz — downstream charting never needs
/// a null-series code path.
pub async fn fetch_kp(
    client: &reqwest::Client,
    cfg: &Config,
    latest_speed: f64,
    latest_bz: f64,
    now: i64,
) -> KpSnapshot {
    match try_fetch_kp(client, cfg).await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => {
            warn!("Kp feed had no usable points, synthesizing proxy");
            proxy_snapshot(latest_speed, latest_bz, now)
        }
        Err(e) => {
            warn!("Kp fetch failed, synthesizing proxy: {e}");
            proxy_snapshot(latest_speed, latest_bz, now)
        }
    }
}

async fn try_fetch_kp(client: &reqwest::Client, cfg: &Config) -> Result<Option<KpSnapshot>> {
    let body: Value = client
        .get(&cfg.kp_url)
        .header("cache-control", "no-cache")
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let mut points: Vec<KpPoint> = normalize_records(&body)?
        .iter()
        .filter_map(|rec| {
            let t_ms = str_field(rec, TIME_ALIASES).and_then(parse_iso_ms)?;
            let kp = num_field(rec, KP_ALIASES, f64::NAN);
            kp.is_finite().then_some(KpPoint { t_ms, kp })
        })
        .collect();

    if points.is_empty() {
        return Ok(None);
    }
    points.sort_by_key(|p| p.t_ms);
    let skip = points.len().saturating_sub(KP_SERIES_KEEP);
    let series: Vec<KpPoint> = points.into_iter().skip(skip).collect();
    let kp = series.last().map(|p| p.kp).unwrap_or(0.0);

    Ok(Some(KpSnapshot {
        kp,
        source: KpSource::Live,
        series,
    }))
}

/// Deterministic Kp proxy: `clamp((speed-300)/60 + max(0,-bz)*0.6, 0, 9)`,
/// rounded to one decimal.
pub fn kp_proxy(speed: f64, bz: f64) -> f64 {
    let raw = (speed - 300.0) / 60.0 + (-bz).max(0.0) * 0.6;
    (raw.clamp(0.0, 9.0) * 10.0).round() / 10.0
}

/// Flat pseudo-series of `KP_PROXY_POINTS` points spaced
/// `KP_PROXY_STEP_MIN` minutes apart, ending now.
pub fn proxy_snapshot(speed: f64, bz: f64, now: i64) -> KpSnapshot {
    let kp = kp_proxy(speed, bz);
    let step = KP_PROXY_STEP_MIN * 60_000;
    let series = (0..KP_PROXY_POINTS)
        .map(|i| KpPoint {
            t_ms: now - (KP_PROXY_POINTS as i64 - 1 - i as i64) * step,
            kp,
        })
        .collect();
    KpSnapshot {
        kp,
        source: KpSource::Proxy,
        series,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_matches_documented_formula() {
        // (360-300)/60 = 1.0, bz term zero.
        assert_eq!(kp_proxy(360.0, 0.0), 1.0);
        // Southward Bz adds 0.6/nT: (420-300)/60 + 5*0.6 = 5.0.
        assert_eq!(kp_proxy(420.0, -5.0), 5.0);
        // Northward Bz contributes nothing.
        assert_eq!(kp_proxy(420.0, 5.0), 2.0);
        // Clamped to [0, 9].
        assert_eq!(kp_proxy(10_000.0, -50.0), 9.0);
        assert_eq!(kp_proxy(0.0, 10.0), 0.0);
    }

    #[test]
    fn proxy_series_is_flat_and_ends_now() {
        let now = 1_700_000_000_000;
        let snap = proxy_snapshot(360.0, 0.0, now);
        assert_eq!(snap.source, KpSource::Proxy);
        assert_eq!(snap.series.len(), KP_PROXY_POINTS);
        assert_eq!(snap.series.last().unwrap().t_ms, now);
        assert_eq!(
            snap.series[1].t_ms - snap.series[0].t_ms,
            KP_PROXY_STEP_MIN * 60_000
        );
        assert!(snap.series.iter().all(|p| p.kp == snap.kp));
    }

    #[tokio::test]
    async fn unreachable_kp_feed_yields_proxy() {
        let cfg = Config {
            plasma_url: String::new(),
            mag_url: String::new(),
            kp_url: "http://127.0.0.1:9/kp.json".to_string(),
            donki_base_url: String::new(),
            nasa_api_key: "DEMO_KEY".to_string(),
            log_level: "info".to_string(),
            api_port: 0,
            observer_lat: None,
        };
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(2))
            .build()
            .unwrap();
        let snap = fetch_kp(&client, &cfg, 360.0, 0.0, 1_700_000_000_000).await;
        assert_eq!(snap.source, KpSource::Proxy);
        assert_eq!(snap.kp, 1.0);
    }
}
