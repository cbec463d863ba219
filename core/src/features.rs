//! Per-trip feature extraction.
//!
//! RULE: extraction is a pure function of the ordered raw event
//! sequence plus the exogenous weather draw. The caller supplies the
//! weather draw so re-extraction of a trip is fully reproducible.

use crate::{
    simulator::RawEvent,
    types::{TripId, UserId, VehicleId},
};
use chrono::Timelike;

/// Legal speed threshold, mph. Events strictly above it count as
/// speeding; an event at exactly 65.0 does not.
pub const SPEEDING_THRESHOLD_MPH: f64 = 65.0;

/// Canonical feature ordering, shared with model artifacts.
pub const FEATURE_NAMES: [&str; 8] = [
    "miles",
    "avg_speed",
    "max_speed",
    "harsh_brake_ct",
    "accel_var",
    "night_pct",
    "speeding_pct",
    "weather_risk",
];

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub trip_id: TripId,
    pub user_id: UserId,
    pub vehicle_id: VehicleId,
    pub miles: f64,
    pub avg_speed: f64,
    pub max_speed: f64,
    pub harsh_brake_ct: i64,
    pub accel_var: f64,
    pub night_pct: f64,
    pub speeding_pct: f64,
    pub weather_risk: f64,
}

impl FeatureVector {
    /// The numeric vector in FEATURE_NAMES order.
    pub fn as_array(&self) -> [f64; 8] {
        [
            self.miles,
            self.avg_speed,
            self.max_speed,
            self.harsh_brake_ct as f64,
            self.accel_var,
            self.night_pct,
            self.speeding_pct,
            self.weather_risk,
        ]
    }
}

/// Derive the feature set from one trip's ordered event sequence.
///
/// Returns None for an empty sequence — the trip is deferred, not
/// failed. `weather_base` is the exogenous contextual risk draw in
/// [0, 1]; it is scaled up with night driving and stored with the
/// other features.
pub fn extract(events: &[RawEvent], weather_base: f64) -> Option<FeatureVector> {
    if events.is_empty() {
        return None;
    }
    let n = events.len() as f64;
    let first = &events[0];

    let miles: f64 = events.iter().map(|e| e.speed * (1.0 / 60.0)).sum();
    let avg_speed = events.iter().map(|e| e.speed).sum::<f64>() / n;
    let max_speed = events.iter().map(|e| e.speed).fold(f64::MIN, f64::max);
    let harsh_brake_ct = events.iter().filter(|e| e.brake > 0.5).count() as i64;
    let accel_var = sample_variance(events.iter().map(|e| e.accel));
    let night_ct = events.iter().filter(|e| is_night_hour(e.ts.hour())).count();
    let night_pct = night_ct as f64 / n;
    let speeding_ct = events
        .iter()
        .filter(|e| e.speed > SPEEDING_THRESHOLD_MPH)
        .count();
    let speeding_pct = speeding_ct as f64 / n;
    // Night driving compounds adverse weather.
    let weather_risk = (weather_base * (0.5 + 0.5 * night_pct)).clamp(0.0, 1.0);

    Some(FeatureVector {
        trip_id: first.trip_id.clone(),
        user_id: first.user_id,
        vehicle_id: first.vehicle_id,
        miles,
        avg_speed,
        max_speed,
        harsh_brake_ct,
        accel_var,
        night_pct,
        speeding_pct,
        weather_risk,
    })
}

/// Local hour in the night window [22, 24) ∪ [0, 6).
pub fn is_night_hour(hour: u32) -> bool {
    hour >= 22 || hour < 6
}

/// Sample variance (n - 1 denominator). 0.0 with fewer than 2 points.
fn sample_variance(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let n = values.clone().count();
    if n < 2 {
        return 0.0;
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    values.map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
}
