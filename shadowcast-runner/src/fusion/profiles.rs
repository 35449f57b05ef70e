//! Tuning profiles for the confidence-gated fusion.
//!
//! A profile fixes how columns are ranked, how the stacked model is trained,
//! when its call is trusted, and how the fallback blend is weighted. Every
//! profile is backtested; the selection rule decides between them.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

use super::stacking::StackConfig;

/// Parameters of the windowed weighted blend fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    pub min_train: usize,
    pub window_years: Option<u32>,
    pub decay_half_life: Option<f64>,
    /// Scales the `(stability − 0.5)` bonus of each column weight.
    pub stability_boost: f64,
}

impl Default for BlendConfig {
    fn default() -> Self {
        blend(8, 26, 10.0, 0.8)
    }
}

/// Missing fields take the "balanced" values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningProfile {
    pub id: String,
    /// Minimum stacked certainty to accept its call.
    pub gate: f64,
    pub top_k: usize,
    pub min_models: usize,
    pub min_used_ratio: f64,
    pub min_config_years: f64,
    pub rank_window_years: Option<u32>,
    pub rank_decay_half_life: Option<f64>,
    /// A partial table fills the rest from `StackConfig::default()`, which
    /// is the basic model unless `advanced = true` is given.
    pub stack: StackConfig,
    pub blend: BlendConfig,
}

impl Default for TuningProfile {
    fn default() -> Self {
        Self::balanced()
    }
}

impl TuningProfile {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bad = |what: &str| Err(ConfigError::Invalid(format!("profile '{}': {what}", self.id)));
        if !(0.0..=1.0).contains(&self.gate) {
            return bad("gate must be in [0, 1]");
        }
        if self.top_k == 0 {
            return bad("top_k must be positive");
        }
        if !(0.0..=1.0).contains(&self.min_used_ratio) {
            return bad("min_used_ratio must be in [0, 1]");
        }
        if !(self.stack.lr.is_finite() && self.stack.lr > 0.0) {
            return bad("stack.lr must be positive");
        }
        if !(self.stack.l2.is_finite() && self.stack.l2 >= 0.0) {
            return bad("stack.l2 must be non-negative");
        }
        let half_lives = [
            self.rank_decay_half_life,
            self.stack.decay_half_life,
            self.blend.decay_half_life,
        ];
        if half_lives.iter().flatten().any(|h| !(h.is_finite() && *h > 0.0)) {
            return bad("half-lives must be positive");
        }
        let windows = [
            self.rank_window_years,
            self.stack.window_years,
            self.blend.window_years,
        ];
        if windows.iter().flatten().any(|w| *w == 0) {
            return bad("windows must be at least one year");
        }
        Ok(())
    }

    /// The five built-in profiles.
    pub fn builtin() -> Vec<TuningProfile> {
        vec![
            Self::balanced(),
            TuningProfile {
                rank_window_years: Some(18),
                rank_decay_half_life: Some(8.0),
                stack: stack(300, 0.26, 0.05, 10, 8.0, 20),
                blend: blend(7, 16, 6.0, 0.5),
                ..profile("aggressive", 0.60, 5, 2, 0.35, 6.0)
            },
            TuningProfile {
                rank_window_years: Some(32),
                rank_decay_half_life: Some(16.0),
                stack: stack(240, 0.18, 0.08, 14, 16.0, 35),
                blend: blend(9, 30, 14.0, 1.1),
                ..profile("steady", 0.54, 7, 4, 0.55, 10.0)
            },
            TuningProfile {
                rank_window_years: Some(12),
                rank_decay_half_life: Some(4.0),
                stack: stack(280, 0.24, 0.05, 9, 6.0, 12),
                blend: blend(7, 10, 4.0, 0.3),
                ..profile("recency", 0.58, 4, 2, 0.35, 6.0)
            },
            TuningProfile {
                rank_window_years: Some(40),
                rank_decay_half_life: Some(20.0),
                stack: stack(220, 0.16, 0.1, 16, 20.0, 40),
                blend: blend(10, 35, 18.0, 1.2),
                ..profile("conservative", 0.52, 8, 5, 0.6, 12.0)
            },
        ]
    }

    fn balanced() -> Self {
        TuningProfile {
            rank_window_years: Some(24),
            rank_decay_half_life: Some(12.0),
            stack: stack(260, 0.22, 0.06, 12, 12.0, 30),
            blend: blend(8, 26, 10.0, 0.8),
            ..profile("balanced", 0.56, 6, 3, 0.45, 8.0)
        }
    }
}

/// Gate fields only; ranking is unbounded and stack/blend are the defaults.
fn profile(
    id: &str,
    gate: f64,
    top_k: usize,
    min_models: usize,
    min_used_ratio: f64,
    min_config_years: f64,
) -> TuningProfile {
    TuningProfile {
        id: id.to_string(),
        gate,
        top_k,
        min_models,
        min_used_ratio,
        min_config_years,
        rank_window_years: None,
        rank_decay_half_life: None,
        stack: StackConfig::default(),
        blend: BlendConfig::default(),
    }
}

fn stack(steps: usize, lr: f64, l2: f64, min_train: usize, half_life: f64, window: u32) -> StackConfig {
    StackConfig {
        steps,
        lr,
        l2,
        min_train,
        decay_half_life: Some(half_life),
        window_years: Some(window),
        advanced: true,
    }
}

fn blend(min_train: usize, window: u32, half_life: f64, stability_boost: f64) -> BlendConfig {
    BlendConfig {
        min_train,
        window_years: Some(window),
        decay_half_life: Some(half_life),
        stability_boost,
    }
}

/// Weights of the hedge blend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HedgeWeights {
    pub gated: f64,
    pub best: f64,
    pub majority: f64,
}

impl Default for HedgeWeights {
    fn default() -> Self {
        Self {
            gated: 0.6,
            best: 0.25,
            majority: 0.15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_validate_and_use_advanced_stack() {
        let profiles = TuningProfile::builtin();
        assert_eq!(profiles.len(), 5);
        for p in &profiles {
            p.validate().unwrap();
            assert!(p.stack.advanced);
        }
        let ids: Vec<&str> = profiles.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["balanced", "aggressive", "steady", "recency", "conservative"]);
    }

    #[test]
    fn balanced_values() {
        let p = &TuningProfile::builtin()[0];
        assert_eq!(p.gate, 0.56);
        assert_eq!(p.stack.min_train, 12);
        assert_eq!(p.blend.window_years, Some(26));
        assert_eq!(p.rank_decay_half_life, Some(12.0));
        assert_eq!(*p, TuningProfile::default());

        let c = &TuningProfile::builtin()[4];
        assert_eq!((c.gate, c.top_k, c.min_models), (0.52, 8, 5));
        assert_eq!(c.rank_window_years, Some(40));
        assert_eq!(c.stack.steps, 220);
        assert_eq!(c.blend.stability_boost, 1.2);
    }

    #[test]
    fn partial_profile_table_fills_from_balanced() {
        let p: TuningProfile = toml::from_str(
            r#"
            id = "tight"
            gate = 0.7

            [blend]
            min_train = 5
            "#,
        )
        .unwrap();
        assert_eq!(p.id, "tight");
        assert_eq!(p.gate, 0.7);
        assert_eq!(p.top_k, 6);
        assert_eq!(p.blend.min_train, 5);
        assert_eq!(p.blend.window_years, Some(26));
        assert_eq!(p.stack, TuningProfile::default().stack);
        p.validate().unwrap();
    }

    #[test]
    fn invalid_profile_rejected() {
        let mut p = TuningProfile::builtin()[0].clone();
        p.top_k = 0;
        assert!(p.validate().is_err());
        let mut p = TuningProfile::builtin()[0].clone();
        p.blend.window_years = Some(0);
        assert!(p.validate().is_err());
    }
}
