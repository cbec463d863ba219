//! Pipeline configuration.
//!
//! RULE: one explicit UbiConfig is constructed at process start and
//! passed by reference into each component. No component reads the
//! environment or a config file on its own.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UbiConfig {
    /// SQLite database path. ":memory:" for tests.
    pub db_path: String,
    /// Cycle metrics CSV path. None disables the sink.
    pub metrics_csv: Option<String>,
    /// Directory searched for trained model artifacts.
    pub models_dir: String,
    /// Seconds the processing loop sleeps between cycles.
    pub poll_interval_secs: u64,
    pub simulator: SimulatorConfig,
    pub risk: RiskWeights,
    pub pricing: PricingConfig,
    pub labeler: LabelerConfig,
    pub rewards: RewardConfig,
}

impl Default for UbiConfig {
    fn default() -> Self {
        Self {
            db_path: "data/ubi.db".into(),
            metrics_csv: Some("data/ops_metrics.csv".into()),
            models_dir: "models/artifacts".into(),
            poll_interval_secs: 2,
            simulator: SimulatorConfig::default(),
            risk: RiskWeights::default(),
            pricing: PricingConfig::default(),
            labeler: LabelerConfig::default(),
            rewards: RewardConfig::default(),
        }
    }
}

impl UbiConfig {
    /// Load from a JSON file. Missing sections fall back to defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Defaults with the deployment paths taken from the environment.
    /// Called once from the binary, never from library code.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(p) = std::env::var("UBI_DB_PATH") {
            config.db_path = p;
        }
        if let Ok(p) = std::env::var("UBI_METRICS_CSV") {
            config.metrics_csv = Some(p);
        }
        if let Ok(p) = std::env::var("UBI_MODELS_DIR") {
            config.models_dir = p;
        }
        config
    }

    /// Config for unit and integration tests: in-memory store, no
    /// metrics file, no model artifacts on disk.
    pub fn default_test() -> Self {
        Self {
            db_path: ":memory:".into(),
            metrics_csv: None,
            models_dir: "/nonexistent".into(),
            poll_interval_secs: 0,
            ..Self::default()
        }
    }
}

/// Trip generation parameters. Speeds are mph, durations minutes,
/// positions degrees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub trip_minutes_min: u32,
    pub trip_minutes_max: u32,
    pub target_speed_min: f64,
    pub target_speed_max: f64,
    /// Target-speed multiplier during night hours.
    pub night_speed_factor: f64,
    /// Per-minute probability of re-drawing the target speed.
    pub target_redraw_chance: f64,
    /// Exponential smoothing factor toward the target speed.
    pub speed_smoothing: f64,
    /// Bound of the per-minute random speed perturbation.
    pub accel_jitter: f64,
    /// One-step speed drop (mph/min) that flags a harsh brake.
    pub harsh_brake_drop: f64,
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
    /// Bound of the per-minute position walk, degrees.
    pub position_step: f64,
    pub geohash_precision: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            trip_minutes_min: 8,
            trip_minutes_max: 45,
            target_speed_min: 22.0,
            target_speed_max: 72.0,
            night_speed_factor: 0.6,
            target_redraw_chance: 0.1,
            speed_smoothing: 0.3,
            accel_jitter: 3.0,
            harsh_brake_drop: 8.0,
            lat_min: 37.62,
            lat_max: 37.81,
            lon_min: -122.51,
            lon_max: -122.36,
            position_step: 0.005,
            geohash_precision: 7,
        }
    }
}

/// Per-term slopes and caps of the rule-based risk score.
/// Each term is capped individually, then the total is clamped to
/// [0, 100].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    pub speeding_slope: f64,
    pub speeding_cap: f64,
    pub harsh_brake_slope: f64,
    pub harsh_brake_cap: f64,
    pub accel_var_slope: f64,
    pub accel_var_cap: f64,
    pub night_slope: f64,
    pub night_cap: f64,
    pub weather_slope: f64,
    pub weather_cap: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            speeding_slope: 80.0,
            speeding_cap: 30.0,
            harsh_brake_slope: 3.5,
            harsh_brake_cap: 20.0,
            accel_var_slope: 3.0,
            accel_var_cap: 15.0,
            night_slope: 20.0,
            night_cap: 20.0,
            weather_slope: 10.0,
            weather_cap: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Usage component: dollars per mile.
    pub per_mile_rate: f64,
    /// Behavior component: (offset + slope * risk/100) * base_rate.
    /// The offset makes the component a discount at low risk scores.
    pub behavior_offset: f64,
    pub behavior_slope: f64,
    /// Context component: dollars per unit of weather risk, capped at
    /// the base rate.
    pub context_rate: f64,
    /// Base rate used when the vehicle row is missing.
    pub neutral_base_rate: f64,
    /// Explanation thresholds.
    pub explain_speeding_pct: f64,
    pub explain_harsh_brake_ct: i64,
    pub explain_night_pct: f64,
    pub explain_weather_risk: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            per_mile_rate: 0.05,
            behavior_offset: -0.05,
            behavior_slope: 0.30,
            context_rate: 5.0,
            neutral_base_rate: 80.0,
            explain_speeding_pct: 0.2,
            explain_harsh_brake_ct: 3,
            explain_night_pct: 0.3,
            explain_weather_risk: 0.3,
        }
    }
}

/// Affine coefficients of the weak-label incident probability.
/// Max contributions sum to 0.82, so the probability stays valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelerConfig {
    pub base_rate: f64,
    pub night_weight: f64,
    pub speeding_weight: f64,
    pub harsh_brake_weight: f64,
    /// Harsh-brake count is normalized by this before weighting.
    pub harsh_brake_norm: f64,
    pub weather_weight: f64,
}

impl Default for LabelerConfig {
    fn default() -> Self {
        Self {
            base_rate: 0.04,
            night_weight: 0.25,
            speeding_weight: 0.40,
            harsh_brake_weight: 0.05,
            harsh_brake_norm: 5.0,
            weather_weight: 0.08,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub max_speeding_pct: f64,
    pub max_harsh_brakes: i64,
    pub max_night_pct: f64,
    pub points: i64,
    pub reason: String,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            max_speeding_pct: 0.1,
            max_harsh_brakes: 1,
            max_night_pct: 0.3,
            points: 5,
            reason: "safe-trip".into(),
        }
    }
}
