use crate::config::risk_thresholds::{ELEVATED_MIN, HIGH_MIN};
use crate::types::{RiskAssessment, RiskLabel};

/// Storm-risk score in [0, 100]. A weighted-and-capped heuristic, not a
/// physical model: southward Bz, excess wind speed, and Kp each contribute
/// up to 30 points. The constants were calibrated by inspection.
pub fn risk_score(speed: f64, bz: f64, kp: Option<f64>) -> u8 {
    let bz_term = ((-bz).max(0.0) * 3.0).min(30.0);
    let speed_term = ((speed - 400.0).max(0.0) / 7.0).min(30.0);
    let kp_term = kp.map_or(0.0, |k| (k * 3.3).min(30.0));
    let score = (bz_term + speed_term + kp_term).clamp(0.0, 100.0);
    score.round() as u8
}

pub fn risk_label(score: u8) -> RiskLabel {
    if score >= HIGH_MIN {
        RiskLabel::High
    } else if score >= ELEVATED_MIN {
        RiskLabel::Elevated
    } else {
        RiskLabel::Low
    }
}

pub fn assess(speed: f64, bz: f64, kp: Option<f64>) -> RiskAssessment {
    let score = risk_score(speed, bz, kp);
    RiskAssessment {
        score,
        label: risk_label(score),
    }
}
