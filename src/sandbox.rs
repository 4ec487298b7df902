use serde::Serialize;

/// Altitude e-folding scale for the drag heuristics, in km.
const ALTITUDE_SCALE_KM: f64 = 700.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DragLabel {
    Low,
    Elevated,
    High,
}

/// Full sandbox evaluation for one satellite configuration.
#[derive(Debug, Clone, Serialize)]
pub struct DragReport {
    pub index: u32,
    pub label: DragLabel,
    pub decay_m_per_day: f64,
    pub note: String,
}

/// Drag index 0-100: a weighted blend of the space-weather drivers, decayed
/// exponentially with altitude. Each driver is normalized and clamped to
/// [0, 1] first.
pub fn drag_index(altitude_km: f64, speed: f64, bz: f64, kp: f64, density: f64) -> u32 {
    let s = ((speed - 350.0) / 400.0).clamp(0.0, 1.0);
    let b = ((-bz.min(0.0)) / 10.0).clamp(0.0, 1.0);
    let k = (kp / 9.0).clamp(0.0, 1.0);
    let d = (density / 20.0).clamp(0.0, 1.0);
    let blend = 0.4 * s + 0.3 * b + 0.2 * k + 0.1 * d;
    (100.0 * blend * (-altitude_km / ALTITUDE_SCALE_KM).exp()).round() as u32
}

/// Rough orbital decay in meters/day from the drag index and the satellite's
/// ballistic coefficient (mass / (Cd * area)).
pub fn decay_estimate_m_per_day(
    altitude_km: f64,
    index: u32,
    mass_kg: f64,
    area_m2: f64,
    drag_coeff: f64,
) -> f64 {
    let ballistic = mass_kg / (drag_coeff * area_m2).max(1e-6);
    let altitude_scale = (-(altitude_km - 300.0) / ALTITUDE_SCALE_KM).exp();
    let k = 0.15;
    (index as f64 * altitude_scale * (10.0 / ballistic.max(1e-6)) * k).round()
}

pub fn drag_label(index: u32) -> DragLabel {
    if index >= 60 {
        DragLabel::High
    } else if index >= 30 {
        DragLabel::Elevated
    } else {
        DragLabel::Low
    }
}

/// Short explanation of which driver dominates the current index.
pub fn driver_note(altitude_km: f64, bz: f64) -> String {
    if altitude_km >= 2000.0 {
        "negligible at this altitude".to_string()
    } else if bz <= -5.0 {
        "southward Bz adding energy".to_string()
    } else {
        "driver mostly wind speed".to_string()
    }
}

pub fn evaluate(
    altitude_km: f64,
    mass_kg: f64,
    area_m2: f64,
    drag_coeff: f64,
    speed: f64,
    bz: f64,
    kp: f64,
    density: f64,
) -> DragReport {
    let index = drag_index(altitude_km, speed, bz, kp, density);
    DragReport {
        index,
        label: drag_label(index),
        decay_m_per_day: decay_estimate_m_per_day(altitude_km, index, mass_kg, area_m2, drag_coeff),
        note: driver_note(altitude_km, bz),
    }
}
