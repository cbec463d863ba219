//! Weak labeling — synthetic incident flags for offline training.
//!
//! Not ground truth: a Bernoulli draw whose probability is an affine
//! function of the trip's risk features. Runs once per trip at
//! feature-computation time; an already-labeled trip is never re-run.

use crate::{config::LabelerConfig, features::FeatureVector, rng::StreamRng};

/// Incident probability for one trip. The coefficient maxima sum to
/// 0.82, so the result is always a valid probability.
pub fn incident_probability(config: &LabelerConfig, features: &FeatureVector) -> f64 {
    let brake_term = (features.harsh_brake_ct as f64 / config.harsh_brake_norm).min(1.0);
    config.base_rate
        + config.night_weight * features.night_pct
        + config.speeding_weight * features.speeding_pct
        + config.harsh_brake_weight * brake_term
        + config.weather_weight * features.weather_risk
}

/// Draw the 0/1 incident label from the trip's stream.
pub fn draw_label(config: &LabelerConfig, features: &FeatureVector, rng: &mut StreamRng) -> i64 {
    if rng.chance(incident_probability(config, features)) {
        1
    } else {
        0
    }
}
