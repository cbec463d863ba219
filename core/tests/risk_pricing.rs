//! Risk score bounds on both scoring paths, and the quote
//! component-sum invariant.

use std::collections::HashMap;
use ubi_core::{
    config::{PricingConfig, RiskWeights},
    features::{FeatureVector, FEATURE_NAMES},
    pricing::{self, round2},
    risk::{ModelArtifact, RiskScorer, DEFAULT_MODEL_NAME},
};

fn features_with(
    speeding_pct: f64,
    harsh_brake_ct: i64,
    accel_var: f64,
    night_pct: f64,
    weather_risk: f64,
) -> FeatureVector {
    FeatureVector {
        trip_id: "trip-a".to_string(),
        user_id: 1,
        vehicle_id: 1,
        miles: 12.0,
        avg_speed: 35.0,
        max_speed: 55.0,
        harsh_brake_ct,
        accel_var,
        night_pct,
        speeding_pct,
        weather_risk,
    }
}

#[test]
fn rule_score_stays_in_bounds_at_extremes() {
    let scorer = RiskScorer::RuleBased(RiskWeights::default());

    let worst = features_with(1.0, 50, 100.0, 1.0, 1.0);
    let score = scorer.score(&worst);
    assert!((0.0..=100.0).contains(&score), "score {score} out of bounds");

    let clean = features_with(0.0, 0, 0.0, 0.0, 0.0);
    assert_eq!(scorer.score(&clean), 0.0);
}

#[test]
fn rule_score_caps_each_term() {
    let scorer = RiskScorer::RuleBased(RiskWeights::default());
    // Only speeding, far past its cap: contribution saturates at 30.
    let speeding_only = features_with(1.0, 0, 0.0, 0.0, 0.0);
    assert_eq!(scorer.score(&speeding_only), 30.0);

    // Only harsh braking, 50 events: saturates at 20.
    let brakes_only = features_with(0.0, 50, 0.0, 0.0, 0.0);
    assert_eq!(scorer.score(&brakes_only), 20.0);
}

#[test]
fn model_score_stays_in_bounds() {
    let mut weights: HashMap<String, f64> = HashMap::new();
    for name in FEATURE_NAMES {
        weights.insert(name.to_string(), 2.0);
    }
    let model = ModelArtifact::from_parts("test-1".to_string(), 5.0, &weights)
        .expect("complete weights");
    let scorer = RiskScorer::ModelBased(model);

    let worst = features_with(1.0, 50, 100.0, 1.0, 1.0);
    let score = scorer.score(&worst);
    assert!((0.0..=100.0).contains(&score), "score {score} out of bounds");
}

#[test]
fn model_artifact_rejects_missing_feature() {
    let mut weights: HashMap<String, f64> = HashMap::new();
    weights.insert("miles".to_string(), 1.0);
    assert!(ModelArtifact::from_parts("test-1".to_string(), 0.0, &weights).is_err());
}

#[test]
fn absent_artifact_falls_back_to_rules() {
    let scorer = RiskScorer::from_artifact_dir(
        "/nonexistent",
        DEFAULT_MODEL_NAME,
        RiskWeights::default(),
    );
    assert!(
        matches!(scorer, RiskScorer::RuleBased(_)),
        "missing artifact must select the rule-based path"
    );
}

#[test]
fn final_premium_is_component_sum() {
    let config = PricingConfig::default();
    for (risk, weather) in [(0.0, 0.0), (12.5, 0.3), (55.0, 0.6), (100.0, 1.0)] {
        let mut f = features_with(0.4, 3, 2.0, 0.5, weather);
        f.miles = 27.3;
        let q = pricing::quote(&config, 85.0, &f, risk);
        assert_eq!(
            q.final_premium,
            round2(
                q.base_component + q.usage_component + q.behavior_component + q.context_component
            ),
            "component-sum invariant violated at risk {risk}"
        );
    }
}

#[test]
fn low_risk_behavior_component_is_a_discount() {
    let config = PricingConfig::default();
    let f = features_with(0.0, 0, 0.0, 0.0, 0.0);
    let q = pricing::quote(&config, 80.0, &f, 0.0);
    assert!(
        q.behavior_component < 0.0,
        "risk 0 should earn a discount, got {}",
        q.behavior_component
    );

    let q_risky = pricing::quote(&config, 80.0, &f, 100.0);
    assert!(q_risky.behavior_component > 0.0);
}

#[test]
fn context_component_is_capped_by_base_rate() {
    let mut config = PricingConfig::default();
    config.context_rate = 500.0;
    let f = features_with(0.0, 0, 0.0, 0.0, 1.0);
    let q = pricing::quote(&config, 80.0, &f, 50.0);
    assert_eq!(q.context_component, 80.0);
}

#[test]
fn explanations_name_the_threshold_breaches() {
    let config = PricingConfig::default();

    let clean = features_with(0.0, 0, 0.0, 0.0, 0.0);
    assert_eq!(
        pricing::explanations(&config, &clean),
        vec!["overall: average".to_string()]
    );

    let risky = features_with(0.5, 5, 0.0, 0.6, 0.5);
    let expl = pricing::explanations(&config, &risky);
    assert!(expl.contains(&"speeding: high".to_string()));
    assert!(expl.contains(&"harsh braking: high".to_string()));
    assert!(expl.contains(&"night driving: high".to_string()));
    assert!(expl.contains(&"context: adverse weather".to_string()));
    assert!(!expl.contains(&"overall: average".to_string()));
}
