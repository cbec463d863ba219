//! Risk scoring — bounded [0, 100] incident-likelihood estimate.
//!
//! Two scoring paths behind one type, selected once at startup:
//! a trained model artifact when one is present under models_dir,
//! otherwise the deterministic rule-based fallback. The rest of the
//! pipeline never branches on which path produced the score.

use crate::{
    config::RiskWeights,
    features::{FeatureVector, FEATURE_NAMES},
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Default artifact name under models_dir (load-by-name contract).
pub const DEFAULT_MODEL_NAME: &str = "incident_model.json";

pub enum RiskScorer {
    ModelBased(ModelArtifact),
    RuleBased(RiskWeights),
}

impl RiskScorer {
    /// Load the named artifact, falling back to rule-based scoring
    /// when it is absent or unreadable. Never fails.
    pub fn from_artifact_dir(models_dir: &str, name: &str, weights: RiskWeights) -> Self {
        match ModelArtifact::load(models_dir, name) {
            Ok(Some(model)) => {
                log::info!(
                    "risk: loaded model artifact '{}' version {}",
                    name,
                    model.model_version
                );
                Self::ModelBased(model)
            }
            Ok(None) => {
                log::info!("risk: no model artifact '{name}'; rule-based scoring");
                Self::RuleBased(weights)
            }
            Err(e) => {
                log::warn!("risk: cannot load model artifact '{name}': {e}; rule-based scoring");
                Self::RuleBased(weights)
            }
        }
    }

    /// Score a feature vector. Always in [0, 100].
    pub fn score(&self, features: &FeatureVector) -> f64 {
        let raw = match self {
            Self::ModelBased(model) => 100.0 * model.incident_probability(features),
            Self::RuleBased(weights) => rule_score(weights, features),
        };
        raw.clamp(0.0, 100.0)
    }
}

/// Per-term capped linear combination. Each term saturates at its own
/// cap before summing, so no single behavior dominates the score.
fn rule_score(w: &RiskWeights, f: &FeatureVector) -> f64 {
    let mut score = 0.0;
    score += (f.speeding_pct * w.speeding_slope).min(w.speeding_cap);
    score += (f.harsh_brake_ct as f64 * w.harsh_brake_slope).min(w.harsh_brake_cap);
    score += (f.accel_var * w.accel_var_slope).min(w.accel_var_cap);
    score += (f.night_pct * w.night_slope).min(w.night_cap);
    score += (f.weather_risk * w.weather_slope).min(w.weather_cap);
    score
}

/// A trained classifier artifact: logistic regression over the
/// canonical feature vector, stored as JSON by the offline trainer.
pub struct ModelArtifact {
    pub model_version: String,
    intercept: f64,
    coef: [f64; 8],
}

#[derive(Deserialize)]
struct ArtifactFile {
    model_version: String,
    intercept: f64,
    weights: HashMap<String, f64>,
}

impl ModelArtifact {
    /// Load `<dir>/<name>`. Ok(None) when the file does not exist.
    pub fn load(dir: &str, name: &str) -> anyhow::Result<Option<Self>> {
        let path = Path::new(dir).join(name);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let file: ArtifactFile = serde_json::from_str(&content)?;
        Self::from_parts(file.model_version, file.intercept, &file.weights).map(Some)
    }

    /// Build from named weights. Every canonical feature must have a
    /// coefficient; unknown names are rejected.
    pub fn from_parts(
        model_version: String,
        intercept: f64,
        weights: &HashMap<String, f64>,
    ) -> anyhow::Result<Self> {
        let mut coef = [0.0f64; 8];
        for (i, feature) in FEATURE_NAMES.iter().enumerate() {
            coef[i] = *weights
                .get(*feature)
                .ok_or_else(|| anyhow::anyhow!("artifact missing weight for '{feature}'"))?;
        }
        if let Some(unknown) = weights.keys().find(|k| !FEATURE_NAMES.contains(&k.as_str())) {
            anyhow::bail!("artifact has unknown feature '{unknown}'");
        }
        Ok(Self {
            model_version,
            intercept,
            coef,
        })
    }

    /// Positive-class probability for one trip.
    pub fn incident_probability(&self, features: &FeatureVector) -> f64 {
        let x = features.as_array();
        let z: f64 = self.intercept
            + self
                .coef
                .iter()
                .zip(x.iter())
                .map(|(w, v)| w * v)
                .sum::<f64>();
        1.0 / (1.0 + (-z).exp())
    }
}
