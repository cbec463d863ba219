//! Gamification rewards — points for trips that cross the safe-driving
//! thresholds.
//!
//! Pure predicate over a feature vector. Double-grant prevention is
//! the processing loop's exactly-once-per-trip guarantee plus the
//! trip-id key on the rewards table, not logic here.

use crate::{
    config::RewardConfig,
    features::FeatureVector,
    types::{TripId, UserId},
};

#[derive(Debug, Clone, PartialEq)]
pub struct RewardGrant {
    pub user_id: UserId,
    pub trip_id: TripId,
    pub points: i64,
    pub reason: String,
}

/// A trip is safe iff every threshold holds.
pub fn is_safe_trip(config: &RewardConfig, features: &FeatureVector) -> bool {
    features.speeding_pct < config.max_speeding_pct
        && features.harsh_brake_ct <= config.max_harsh_brakes
        && features.night_pct < config.max_night_pct
}

/// The grant for a safe trip, None otherwise.
pub fn evaluate(config: &RewardConfig, features: &FeatureVector) -> Option<RewardGrant> {
    if !is_safe_trip(config, features) {
        return None;
    }
    Some(RewardGrant {
        user_id: features.user_id,
        trip_id: features.trip_id.clone(),
        points: config.points,
        reason: config.reason.clone(),
    })
}
