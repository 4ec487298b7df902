use serde_json::Value;
use tracing::warn;

use crate::config::{default_reading, Config, SEED_LIMIT};
use crate::error::Result;
use crate::feed::{format_iso, last_record, normalize_records, num_field, parse_iso_ms, str_field};
use crate::types::{now_ms, FeedSource, LatestReading, RawRecords, Sample};

const SPEED_ALIASES: &[&str] = &["speed", "Speed", "Vx"];
const DENSITY_ALIASES: &[&str] = &["density", "Density", "Np"];
const BT_ALIASES: &[&str] = &["bt", "Bt"];
const BZ_ALIASES: &[&str] = &["bz", "Bz"];
const TIME_ALIASES: &[&str] = &["time_tag", "timestamp", "time"];

/// Missing-field fallbacks inside an otherwise-recognized row.
const MISSING_SPEED: f64 = 0.0;
const MISSING_DENSITY: f64 = 0.0;
const MISSING_BT: f64 = 4.0;
const MISSING_BZ: f64 = 0.0;

/// Result of one wind/field poll. The raw records back the raw-data readout
/// and are absent on the defaulted path.
#[derive(Debug, Clone)]
pub struct WindFieldOutcome {
    pub reading: LatestReading,
    pub raw: Option<RawRecords>,
}

/// The documented fallback reading, stamped with current wall-clock time.
pub fn defaulted_reading(t_ms: i64) -> LatestReading {
    LatestReading {
        speed: default_reading::SPEED,
        density: default_reading::DENSITY,
        bt: default_reading::BT,
        bz: default_reading::BZ,
        updated_at: format_iso(t_ms),
        source: FeedSource::Defaulted,
    }
}

/// Fetch the plasma and magnetic-field feeds concurrently and jointly await
/// them. Never raises: any transport, HTTP, or parse failure on either side
/// fails the pair closed to the fixed default reading.
pub async fn fetch_wind_and_field(client: &reqwest::Client, cfg: &Config) -> WindFieldOutcome {
    let (plasma, mag) = tokio::join!(
        fetch_json(client, &cfg.plasma_url),
        fetch_json(client, &cfg.mag_url),
    );

    match read_pair(plasma, mag) {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("wind/field fetch failed, using defaults: {e}");
            WindFieldOutcome {
                reading: defaulted_reading(now_ms()),
                raw: None,
            }
        }
    }
}

fn read_pair(plasma: Result<Value>, mag: Result<Value>) -> Result<WindFieldOutcome> {
    let plasma = plasma?;
    let mag = mag?;
    let p = last_record(&plasma)?;
    let m = last_record(&mag)?;

    let updated_at = str_field(&p, TIME_ALIASES)
        .or_else(|| str_field(&m, TIME_ALIASES))
        .map(str::to_string)
        .unwrap_or_else(|| format_iso(now_ms()));

    let reading = LatestReading {
        speed: num_field(&p, SPEED_ALIASES, MISSING_SPEED),
        density: num_field(&p, DENSITY_ALIASES, MISSING_DENSITY),
        bt: num_field(&m, BT_ALIASES, MISSING_BT),
        bz: num_field(&m, BZ_ALIASES, MISSING_BZ),
        updated_at,
        source: FeedSource::Live,
    };

    Ok(WindFieldOutcome {
        reading,
        raw: Some(RawRecords {
            plasma: Value::Object(p),
            mag: Value::Object(m),
        }),
    })
}

/// One-time startup backfill: pull both feeds once and join the trailing
/// plasma rows with the mag row of nearest timestamp. Positional joins break
/// when the feeds carry different row counts, so alignment is by time.
pub async fn fetch_seed_samples(client: &reqwest::Client, cfg: &Config) -> Result<Vec<Sample>> {
    let (plasma, mag) = tokio::join!(
        fetch_json(client, &cfg.plasma_url),
        fetch_json(client, &cfg.mag_url),
    );
    let plasma = normalize_records(&plasma?)?;
    let mag = normalize_records(&mag?)?;

    // (t_ms, bz) rows sorted by time for the nearest-timestamp lookup.
    let mut bz_rows: Vec<(i64, f64)> = mag
        .iter()
        .filter_map(|rec| {
            let t = str_field(rec, TIME_ALIASES).and_then(parse_iso_ms)?;
            Some((t, num_field(rec, BZ_ALIASES, MISSING_BZ)))
        })
        .collect();
    bz_rows.sort_by_key(|&(t, _)| t);

    let fallback_now = now_ms();
    let skip = plasma.len().saturating_sub(SEED_LIMIT);
    let samples: Vec<Sample> = plasma
        .iter()
        .skip(skip)
        .enumerate()
        .map(|(i, rec)| {
            let t_ms = str_field(rec, TIME_ALIASES)
                .and_then(parse_iso_ms)
                // Rows without a parseable timestamp still advance the
                // history deterministically, one per 30s poll slot.
                .unwrap_or(fallback_now - (SEED_LIMIT as i64 - i as i64) * 30_000);
            Sample {
                t_ms,
                speed: num_field(rec, SPEED_ALIASES, MISSING_SPEED),
                bz: nearest_bz(&bz_rows, t_ms),
            }
        })
        .filter(|s| s.speed.is_finite() && s.bz.is_finite())
        .collect();

    Ok(samples)
}

fn nearest_bz(rows: &[(i64, f64)], t_ms: i64) -> f64 {
    match rows.binary_search_by_key(&t_ms, |&(t, _)| t) {
        Ok(i) => rows[i].1,
        Err(i) => {
            let before = i.checked_sub(1).map(|j| rows[j]);
            let after = rows.get(i).copied();
            match (before, after) {
                (Some((tb, vb)), Some((ta, va))) => {
                    if (t_ms - tb) <= (ta - t_ms) { vb } else { va }
                }
                (Some((_, v)), None) | (None, Some((_, v))) => v,
                (None, None) => MISSING_BZ,
            }
        }
    }
}

async fn fetch_json(client: &reqwest::Client, url: &str) -> Result<Value> {
    let resp = client
        .get(url)
        .header("cache-control", "no-cache")
        .send()
        .await?
        .error_for_status()?;
    Ok(resp.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use serde_json::json;

    fn plasma_table() -> Value {
        json!([
            ["time_tag", "density", "speed", "temperature"],
            ["2025-08-30 11:58:00.000", "4.1", "358.9", "60000"],
            ["2025-08-30 11:59:00.000", "4.3", "360.2", "61000"],
            ["2025-08-30 12:00:00.000", "4.6", "362.4", "62000"],
        ])
    }

    fn mag_table() -> Value {
        json!([
            ["time_tag", "bx_gsm", "by_gsm", "bz", "bt"],
            ["2025-08-30 11:58:30.000", "1.0", "0.2", "-2.8", "5.0"],
            ["2025-08-30 12:00:00.000", "1.1", "0.3", "-3.1", "5.2"],
        ])
    }

    #[test]
    fn live_pair_picks_last_rows() {
        let outcome = read_pair(Ok(plasma_table()), Ok(mag_table())).expect("live pair");
        let r = &outcome.reading;
        assert_eq!(r.source, FeedSource::Live);
        assert!((r.speed - 362.4).abs() < 1e-9);
        assert!((r.density - 4.6).abs() < 1e-9);
        assert!((r.bz - -3.1).abs() < 1e-9);
        assert!((r.bt - 5.2).abs() < 1e-9);
        assert_eq!(r.updated_at, "2025-08-30 12:00:00.000");
        assert!(outcome.raw.is_some());
    }

    #[test]
    fn one_failed_side_fails_the_pair() {
        let err = read_pair(
            Ok(plasma_table()),
            Err(AppError::Schema("down".to_string())),
        );
        assert!(err.is_err());
    }

    #[test]
    fn defaulted_reading_matches_documented_constants() {
        let r = defaulted_reading(1_700_000_000_000);
        assert_eq!(r.speed, 360.0);
        assert_eq!(r.density, 4.0);
        assert_eq!(r.bt, 4.0);
        assert_eq!(r.bz, 1.0);
        assert_eq!(r.source, FeedSource::Defaulted);
    }

    #[tokio::test]
    async fn unreachable_feed_returns_default_never_errors() {
        let cfg = Config {
            plasma_url: "http://127.0.0.1:9/plasma.json".to_string(),
            mag_url: "http://127.0.0.1:9/mag.json".to_string(),
            kp_url: String::new(),
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
        let before = now_ms();
        let outcome = fetch_wind_and_field(&client, &cfg).await;
        assert_eq!(outcome.reading.source, FeedSource::Defaulted);
        assert_eq!(outcome.reading.speed, 360.0);
        assert_eq!(outcome.reading.bz, 1.0);
        assert!(outcome.raw.is_none());
        // Stamped with current wall-clock time.
        assert!(parse_iso_ms(&outcome.reading.updated_at).unwrap() >= before - 1_000);
    }

    #[test]
    fn nearest_bz_prefers_closest_side() {
        let rows = vec![(1_000, -1.0), (4_000, -4.0)];
        assert_eq!(nearest_bz(&rows, 1_200), -1.0);
        assert_eq!(nearest_bz(&rows, 3_900), -4.0);
        assert_eq!(nearest_bz(&rows, 9_000), -4.0);
        assert_eq!(nearest_bz(&[], 9_000), 0.0);
    }
}
