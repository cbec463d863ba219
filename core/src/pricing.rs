//! Premium pricing — decomposes a quote into four additive,
//! independently explainable components.

use crate::{config::PricingConfig, features::FeatureVector};

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteBreakdown {
    pub base_component: f64,
    pub usage_component: f64,
    pub behavior_component: f64,
    pub context_component: f64,
    pub final_premium: f64,
    pub risk_score: f64,
    pub explanations: Vec<String>,
}

/// Price one trip. All components are rounded to cents before the
/// final sum, so the stored invariant
/// `final_premium == round2(base + usage + behavior + context)`
/// holds exactly on the persisted values.
pub fn quote(
    config: &PricingConfig,
    base_rate: f64,
    features: &FeatureVector,
    risk_score: f64,
) -> QuoteBreakdown {
    let base_component = round2(base_rate);
    let usage_component = round2(config.per_mile_rate * features.miles);
    // Negative below the break-even risk score: safe driving is a
    // discount, not just a smaller surcharge.
    let behavior_component = round2(
        (config.behavior_offset + config.behavior_slope * risk_score / 100.0) * base_rate,
    );
    let context_component = round2((config.context_rate * features.weather_risk).min(base_rate));
    let final_premium =
        round2(base_component + usage_component + behavior_component + context_component);

    QuoteBreakdown {
        base_component,
        usage_component,
        behavior_component,
        context_component,
        final_premium,
        risk_score: round2(risk_score),
        explanations: explanations(config, features),
    }
}

/// Machine-readable reasons: the subset of risk drivers whose
/// underlying feature crossed its threshold, or "overall: average"
/// when none did.
pub fn explanations(config: &PricingConfig, features: &FeatureVector) -> Vec<String> {
    let mut out = Vec::new();
    if features.speeding_pct > config.explain_speeding_pct {
        out.push("speeding: high".to_string());
    }
    if features.harsh_brake_ct > config.explain_harsh_brake_ct {
        out.push("harsh braking: high".to_string());
    }
    if features.night_pct > config.explain_night_pct {
        out.push("night driving: high".to_string());
    }
    if features.weather_risk > config.explain_weather_risk {
        out.push("context: adverse weather".to_string());
    }
    if out.is_empty() {
        out.push("overall: average".to_string());
    }
    out
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
