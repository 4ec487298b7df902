use serde::Serialize;

use crate::forecast::{forecast_from_history, risk, speed_to_bpm};
use crate::types::{
    Forecast, FeedSource, KpSnapshot, LatestReading, NoticesOutcome, RiskAssessment, Sample,
};

/// Neutral placeholder for readouts with nothing to show. Consumers must
/// never see a stale or zeroed number instead.
pub const PLACEHOLDER: &str = "—";

/// The flat, display-ready record every display surface consumes.
/// Built only by `reduce`; replaced wholesale in the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewState {
    pub speed_text: String,
    pub density_text: String,
    pub bz_text: String,
    pub kp_text: String,
    pub bpm: u32,
    pub beat_index: i64,
    pub updated_text: String,
    pub defaulted: bool,
    pub impact_text: String,
    pub forecast_bz_text: String,
    pub forecast_bpm_text: String,
    pub risk_now_text: String,
    pub risk_30_text: String,
    pub risk_60_text: String,
    pub aurora_here: String,
    pub aurora_meter_pct: u8,
    pub aurora_note: String,
    pub elevated_watch: bool,
    pub replay_label: String,
}

/// Everything the reducer reads. Wall-clock time is an explicit input so
/// the reduction stays a pure function of its arguments.
pub struct ReducerInput<'a> {
    pub latest: &'a LatestReading,
    pub history: &'a [Sample],
    pub kp: Option<&'a KpSnapshot>,
    pub notices: &'a NoticesOutcome,
    pub observer_lat: Option<f64>,
    pub replay_offset_min: i64,
    pub now_ms: i64,
}

/// Reduction output: the view state plus the +30 min risk read used for
/// edge-triggered alerting (absent while the forecast is unavailable).
#[derive(Debug, Clone, PartialEq)]
pub struct Reduced {
    pub view: ViewState,
    pub risk_30: Option<RiskAssessment>,
}

/// Assemble the view state. Pure and idempotent: identical inputs produce
/// identical output; no I/O is performed here.
pub fn reduce(input: &ReducerInput<'_>) -> Reduced {
    let kp = input.kp.map(|s| s.kp);

    // Replay scrubbing substitutes the nearest historical speed/Bz pair;
    // density and Bt stay current (the history does not record them).
    let (speed, bz, replay_label) = if input.replay_offset_min > 0 {
        let target = input.now_ms - input.replay_offset_min * 60_000;
        let nearest = input
            .history
            .iter()
            .min_by_key(|s| (s.t_ms - target).abs());
        match nearest {
            Some(s) => (s.speed, s.bz, format!("{} min ago", input.replay_offset_min)),
            None => (input.latest.speed, input.latest.bz, "live".to_string()),
        }
    } else {
        (input.latest.speed, input.latest.bz, "live".to_string())
    };

    let bpm = speed_to_bpm(speed);
    let beat_index = (input.now_ms as f64 / (60_000.0 / bpm)).floor() as i64;
    let risk_now = risk::assess(speed, bz, kp);

    // Recomputed on demand every refresh; forecasts hold no identity.
    let forecast = forecast_from_history(input.history, input.now_ms);
    let (forecast_bz_text, forecast_bpm_text, risk_30_text, risk_60_text, risk_30) =
        match forecast {
            Forecast::Unavailable => (
                PLACEHOLDER.to_string(),
                PLACEHOLDER.to_string(),
                PLACEHOLDER.to_string(),
                PLACEHOLDER.to_string(),
                None,
            ),
            Forecast::Available { t0, t30, t60 } => {
                let direction = t60.bz - t0.bz;
                let arrow = if direction < 0.0 {
                    "↓"
                } else if direction > 0.0 {
                    "↑"
                } else {
                    "→"
                };
                let r30 = risk::assess(t30.speed, t30.bz, kp);
                let r60 = risk::assess(t60.speed, t60.bz, kp);
                (
                    format!("{arrow} {:.1} → {:.1} nT", t0.bz, t60.bz),
                    format!("{:.0} → {:.0}", t0.bpm, t60.bpm),
                    format!("{} ({})", r30.label, r30.score),
                    format!("{} ({})", r60.label, r60.score),
                    Some(r30),
                )
            }
        };

    let (aurora_meter_pct, aurora_note) = aurora_meter(bz, kp);

    let view = ViewState {
        speed_text: format!("{speed:.0}"),
        density_text: format!("{:.1}", input.latest.density),
        bz_text: format!("{bz:.1}"),
        kp_text: kp.map_or_else(|| PLACEHOLDER.to_string(), |k| format!("{k:.1}")),
        bpm: bpm.round() as u32,
        beat_index,
        updated_text: input.latest.updated_at.clone(),
        defaulted: input.latest.source == FeedSource::Defaulted,
        impact_text: impact_snapshot(speed, bz, kp),
        forecast_bz_text,
        forecast_bpm_text,
        risk_now_text: format!("{} ({})", risk_now.label, risk_now.score),
        risk_30_text,
        risk_60_text,
        aurora_here: aurora_visibility(input.observer_lat).to_string(),
        aurora_meter_pct,
        aurora_note,
        elevated_watch: input.notices.elevated_watch(),
        replay_label,
    };

    Reduced { view, risk_30 }
}

/// One-line impact readout from the current drivers.
pub fn impact_snapshot(speed: f64, bz: f64, kp: Option<f64>) -> String {
    let k = kp.unwrap_or(0.0);
    let mut parts = Vec::new();
    if k >= 5.0 {
        parts.push("geomagnetic storm (G1+) conditions");
    }
    if speed >= 600.0 {
        parts.push("satellite drag ↑ (LEO)");
    }
    if bz <= -5.0 {
        parts.push("GPS scintillation risk ↑ (high lat)");
    }
    if k >= 6.0 {
        parts.push("HF radio disruption possible");
    }
    if parts.is_empty() {
        "nominal — low impacts expected right now".to_string()
    } else {
        parts.join(" • ")
    }
}

/// Aurora activity meter: 60% southward-Bz drive, 40% Kp drive, as a
/// percentage plus the qualitative note.
fn aurora_meter(bz: f64, kp: Option<f64>) -> (u8, String) {
    let b = (-bz).max(0.0);
    let k = (kp.unwrap_or(0.0) / 9.0).clamp(0.0, 1.0);
    let val = (0.6 * b / 10.0 + 0.4 * k).clamp(0.0, 1.0);
    let note = if b > 2.0 || kp.unwrap_or(0.0) >= 5.0 {
        "conditions favor aurora at higher lats"
    } else {
        "quiet to mild"
    };
    ((val * 100.0).round() as u8, note.to_string())
}

fn aurora_visibility(observer_lat: Option<f64>) -> &'static str {
    match observer_lat {
        Some(lat) if lat.abs() >= 60.0 => "likely",
        Some(lat) if lat.abs() >= 50.0 => "possible",
        Some(_) => "unlikely",
        None => "allow location to personalize",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RiskLabel;

    fn live_reading(speed: f64, bz: f64) -> LatestReading {
        LatestReading {
            speed,
            density: 4.4,
            bt: 5.0,
            bz,
            updated_at: "2025-08-30T12:00:00Z".to_string(),
            source: FeedSource::Live,
        }
    }

    fn constant_history(n: usize, speed: f64, bz: f64, now: i64) -> Vec<Sample> {
        (0..n)
            .map(|i| Sample {
                t_ms: now - (n as i64 - 1 - i as i64) * 30_000,
                speed,
                bz,
            })
            .collect()
    }

    fn input<'a>(
        latest: &'a LatestReading,
        history: &'a [Sample],
        kp: Option<&'a KpSnapshot>,
        notices: &'a NoticesOutcome,
        now: i64,
    ) -> ReducerInput<'a> {
        ReducerInput {
            latest,
            history,
            kp,
            notices,
            observer_lat: Some(61.5),
            replay_offset_min: 0,
            now_ms: now,
        }
    }

    #[test]
    fn reduce_is_idempotent() {
        let now = 1_700_000_000_000;
        let latest = live_reading(420.0, -3.2);
        let history = constant_history(40, 420.0, -3.2, now);
        let notices = NoticesOutcome::Available {
            notices: Vec::new(),
            elevated_watch: true,
        };
        let inp = input(&latest, &history, None, &notices, now);
        let first = reduce(&inp);
        let second = reduce(&inp);
        assert_eq!(first, second);
        assert!(first.view.elevated_watch);
    }

    #[test]
    fn insufficient_history_renders_placeholders_not_zeros() {
        let now = 1_700_000_000_000;
        let latest = live_reading(420.0, -3.2);
        let history = constant_history(3, 420.0, -3.2, now);
        let notices = NoticesOutcome::Unavailable;
        let reduced = reduce(&input(&latest, &history, None, &notices, now));
        assert_eq!(reduced.view.risk_30_text, PLACEHOLDER);
        assert_eq!(reduced.view.risk_60_text, PLACEHOLDER);
        assert_eq!(reduced.view.forecast_bz_text, PLACEHOLDER);
        assert!(reduced.risk_30.is_none());
        // Live readouts still render.
        assert_eq!(reduced.view.speed_text, "420");
        assert_eq!(reduced.view.bz_text, "-3.2");
    }

    #[test]
    fn full_history_produces_projected_risk() {
        let now = 1_700_000_000_000;
        let latest = live_reading(400.0, -3.0);
        let history = constant_history(40, 400.0, -3.0, now);
        let notices = NoticesOutcome::Unavailable;
        let reduced = reduce(&input(&latest, &history, None, &notices, now));
        let r30 = reduced.risk_30.expect("forecast available");
        assert_eq!(r30.score, 9);
        assert_eq!(r30.label, RiskLabel::Low);
        assert_eq!(reduced.view.risk_30_text, "low (9)");
        assert_eq!(reduced.view.aurora_here, "likely");
    }

    #[test]
    fn missing_kp_renders_placeholder() {
        let now = 1_700_000_000_000;
        let latest = live_reading(360.0, 1.0);
        let history = constant_history(10, 360.0, 1.0, now);
        let notices = NoticesOutcome::Unavailable;
        let reduced = reduce(&input(&latest, &history, None, &notices, now));
        assert_eq!(reduced.view.kp_text, PLACEHOLDER);
    }

    #[test]
    fn replay_offset_substitutes_historical_pair() {
        let now = 1_700_000_000_000;
        let latest = live_reading(500.0, -6.0);
        let mut history = constant_history(40, 500.0, -6.0, now);
        // A distinct sample 30 minutes back.
        history[0] = Sample {
            t_ms: now - 30 * 60_000,
            speed: 340.0,
            bz: 2.0,
        };
        let notices = NoticesOutcome::Unavailable;
        let mut inp = input(&latest, &history, None, &notices, now);
        inp.replay_offset_min = 30;
        let reduced = reduce(&inp);
        assert_eq!(reduced.view.replay_label, "30 min ago");
        assert_eq!(reduced.view.speed_text, "340");
        assert_eq!(reduced.view.bz_text, "2.0");

        inp.replay_offset_min = 0;
        assert_eq!(reduce(&inp).view.replay_label, "live");
    }

    #[test]
    fn impact_lines_accumulate_with_drivers() {
        assert_eq!(
            impact_snapshot(360.0, 1.0, Some(2.0)),
            "nominal — low impacts expected right now"
        );
        let stormy = impact_snapshot(650.0, -7.0, Some(6.5));
        assert!(stormy.contains("geomagnetic storm (G1+) conditions"));
        assert!(stormy.contains("satellite drag"));
        assert!(stormy.contains("GPS scintillation"));
        assert!(stormy.contains("HF radio disruption"));
    }

    #[test]
    fn aurora_meter_scales_with_bz_and_kp() {
        let (quiet, quiet_note) = aurora_meter(1.0, Some(1.0));
        let (active, active_note) = aurora_meter(-8.0, Some(6.0));
        assert!(active > quiet);
        assert_eq!(quiet_note, "quiet to mild");
        assert_eq!(active_note, "conditions favor aurora at higher lats");
        // Saturates at 100.
        let (maxed, _) = aurora_meter(-50.0, Some(9.0));
        assert_eq!(maxed, 100);
    }

    #[test]
    fn visibility_thresholds() {
        assert_eq!(aurora_visibility(Some(65.0)), "likely");
        assert_eq!(aurora_visibility(Some(-65.0)), "likely");
        assert_eq!(aurora_visibility(Some(55.0)), "possible");
        assert_eq!(aurora_visibility(Some(40.0)), "unlikely");
        assert_eq!(aurora_visibility(None), "allow location to personalize");
    }
}
