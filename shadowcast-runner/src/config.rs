//! Engine configuration — one TOML-serializable struct for a whole run.
//!
//! Every section has documented defaults, so an empty file (or no file) is a
//! complete configuration. `validate()` runs once when the engine is built.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use shadowcast_core::domain::{TargetId, TARGET_FEBMAR, TARGET_MARCH};
use shadowcast_core::weighting::{FusionConfig, WeightingError};

use crate::backtest::BacktestGate;
use crate::calibration::CalibrationConfig;
use crate::candidates::SpaceConfig;
use crate::dae::DaeConfig;
use crate::fusion::{HedgeWeights, MetaConfig, StabilityConfig, StackConfig, TuningProfile};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("invalid fusion config: {0}")]
    Weighting(#[from] WeightingError),
}

// ─── Sections ────────────────────────────────────────────────────────

/// Which meta strategies run over each candidate matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaStrategiesConfig {
    pub vote: Vec<MetaConfig>,
    pub best: Vec<MetaConfig>,
    pub stacked: Vec<StackConfig>,
    pub stability: Vec<StabilityConfig>,
    pub hedge: HedgeWeights,
}

impl Default for MetaStrategiesConfig {
    fn default() -> Self {
        let both = vec![MetaConfig::windowed(20), MetaConfig::decayed(10.0)];
        Self {
            vote: both.clone(),
            best: both,
            stacked: vec![
                StackConfig::default(),
                StackConfig {
                    advanced: true,
                    ..Default::default()
                },
            ],
            stability: vec![StabilityConfig::default()],
            hedge: HedgeWeights::default(),
        }
    }
}

impl MetaStrategiesConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let metas = self.vote.iter().chain(&self.best);
        for m in metas {
            if m.window_years == Some(0) {
                return Err(ConfigError::Invalid("meta window must be at least one year".into()));
            }
            if m.decay_half_life.is_some_and(|h| !(h.is_finite() && h > 0.0)) {
                return Err(ConfigError::Invalid("meta half-life must be positive".into()));
            }
        }
        for s in &self.stacked {
            if !(s.lr.is_finite() && s.lr > 0.0) || !(s.l2.is_finite() && s.l2 >= 0.0) {
                return Err(ConfigError::Invalid("stacked lr must be positive, l2 non-negative".into()));
            }
        }
        for s in &self.stability {
            if s.top_k == 0 || !s.power.is_finite() {
                return Err(ConfigError::Invalid("stability top_k and power must be usable".into()));
            }
        }
        let h = &self.hedge;
        if [h.gated, h.best, h.majority].iter().any(|w| !(w.is_finite() && *w >= 0.0)) {
            return Err(ConfigError::Invalid("hedge weights must be non-negative".into()));
        }
        Ok(())
    }
}

// ─── Engine config ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Targets evaluated, in order. Targets without outcomes are skipped.
    pub targets: Vec<TargetId>,
    pub gate: BacktestGate,
    pub space: SpaceConfig,
    pub meta: MetaStrategiesConfig,
    /// Columns of the fusion matrix.
    pub fusion_configs: Vec<FusionConfig>,
    pub profiles: Vec<TuningProfile>,
    pub dae: DaeConfig,
    pub calibration: CalibrationConfig,
    /// Entries kept per target leaderboard.
    pub leaderboard_size: usize,
    /// Fan candidate search and strategy backtests out over rayon.
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            targets: vec![TargetId::new(TARGET_FEBMAR), TargetId::new(TARGET_MARCH)],
            gate: BacktestGate::default(),
            space: SpaceConfig::default(),
            meta: MetaStrategiesConfig::default(),
            fusion_configs: FusionConfig::builtin(),
            profiles: TuningProfile::builtin(),
            dae: DaeConfig::default(),
            calibration: CalibrationConfig::default(),
            leaderboard_size: 50,
            parallel: true,
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::Invalid("at least one target is required".into()));
        }
        if self.gate.min_forecasters == 0 {
            return Err(ConfigError::Invalid("gate.min_forecasters must be positive".into()));
        }
        if self.leaderboard_size == 0 {
            return Err(ConfigError::Invalid("leaderboard_size must be positive".into()));
        }
        self.space.validate()?;
        self.meta.validate()?;
        for cfg in &self.fusion_configs {
            cfg.validate()?;
        }
        for profile in &self.profiles {
            profile.validate()?;
        }
        self.dae.validate()?;
        self.calibration.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        let cfg = EngineConfig::from_toml("").unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.fusion_configs.len(), 9);
        assert_eq!(cfg.profiles.len(), 5);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = EngineConfig::from_toml(
            r#"
            targets = ["US_CONUS_FEBMAR_MEAN_ANOM"]
            parallel = false

            [gate]
            min_forecasters = 5

            [space]
            weightings = ["bayes", "logit"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.targets.len(), 1);
        assert_eq!(cfg.gate.min_forecasters, 5);
        assert_eq!(cfg.space.top_n, vec![3, 5, 7, 10]);
        assert!(!cfg.parallel);
        assert_eq!(cfg.dae, DaeConfig::default());
    }

    #[test]
    fn partial_strategy_tables_take_field_defaults() {
        let cfg = EngineConfig::from_toml(
            r#"
            [[meta.vote]]
            decay_half_life = 8.0

            [[meta.stacked]]
            advanced = true

            [[meta.stability]]
            top_k = 3

            [[profiles]]
            id = "wide"
            top_k = 9
            "#,
        )
        .unwrap();
        assert_eq!(cfg.meta.vote, vec![MetaConfig::decayed(8.0)]);
        assert_eq!(cfg.meta.best, MetaStrategiesConfig::default().best);
        assert_eq!(
            cfg.meta.stacked,
            vec![StackConfig {
                advanced: true,
                ..Default::default()
            }]
        );
        assert_eq!(cfg.meta.stability[0].top_k, 3);
        assert_eq!(cfg.meta.stability[0].power, StabilityConfig::default().power);
        assert_eq!(cfg.profiles.len(), 1);
        assert_eq!(cfg.profiles[0].id, "wide");
        assert_eq!(cfg.profiles[0].top_k, 9);
        assert_eq!(cfg.profiles[0].gate, TuningProfile::default().gate);

        let text = cfg.to_toml().unwrap();
        assert_eq!(EngineConfig::from_toml(&text).unwrap(), cfg);
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = EngineConfig::default();
        let text = cfg.to_toml().unwrap();
        assert_eq!(EngineConfig::from_toml(&text).unwrap(), cfg);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_toml("targets = []"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml("[space]\nweightings = [\"nope\"]"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml("leaderboard_size = \"big\""),
            Err(ConfigError::Parse(_))
        ));
        let mut cfg = EngineConfig::default();
        cfg.fusion_configs[0].prior_a = -1.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Weighting(_))));
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "leaderboard_size = 7\n").unwrap();
        assert_eq!(EngineConfig::from_file(&path).unwrap().leaderboard_size, 7);
        assert!(matches!(
            EngineConfig::from_file(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
