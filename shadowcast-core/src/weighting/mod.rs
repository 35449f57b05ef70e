//! Weight training — per-forecaster scalar weights as of a cutoff year.
//!
//! A [`WeightingSpec`] pairs a [`WeightingMethod`] (which accuracy estimator
//! and which weight form) with validated [`TrainerOptions`]. The catalog of
//! named specs is the search space the candidate layer walks for each mode.

pub mod fusion;
pub mod trainer;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use fusion::{fusion_forecast, fusion_weights, FusionConfig};
pub use trainer::{accumulate_stats, train_weights, ForecasterStat, RankedForecaster, TrainedWeights};

/// Errors from constructing a weighting spec or fusion config.
#[derive(Debug, Error, PartialEq)]
pub enum WeightingError {
    #[error("beta prior must be positive and finite (got a0={a0}, b0={b0})")]
    InvalidPrior { a0: f64, b0: f64 },
    #[error("half-life must be positive and finite (got {0})")]
    InvalidHalfLife(f64),
    #[error("{field} must be at least one year")]
    ZeroYears { field: &'static str },
    #[error("exponent {name} must be finite and non-negative (got {value})")]
    InvalidExponent { name: &'static str, value: f64 },
    #[error("method '{method}' needs window_years to be set")]
    MissingWindow { method: &'static str },
}

// ─── Method ──────────────────────────────────────────────────────────

/// Accuracy estimator + weight form.
///
/// Magnitude methods produce `pHat^alpha · max(1, n)^gamma` (never negative).
/// Signed methods produce `logit(pHat) · alpha · max(1, n)^gamma`, so a
/// forecaster who is reliably wrong gets a negative weight and its vote is
/// inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingMethod {
    /// Beta-shrunk raw accuracy.
    Bayes,
    /// Laplace-smoothed accuracy `(k+1)/(n+2)`.
    SmoothAcc,
    /// Beta-shrunk exponentially decayed accuracy.
    ExpDecay,
    /// Wilson 95% lower bound on raw accuracy.
    Wilson,
    /// Logistic squash of the binomial z-score against a coin flip.
    ZScore,
    /// Skill above chance: `clamp(2 · (bayes − 0.5), 0, 1)`.
    Centered,
    /// Beta-shrunk accuracy over the trailing window only.
    WindowBayes,
    /// Signed log-odds of the Beta-shrunk raw accuracy.
    Logit,
    /// Signed log-odds of the Beta-shrunk decayed accuracy.
    LogitDecay,
    /// Signed log-odds of the Beta-shrunk windowed accuracy.
    LogitWindow,
}

impl WeightingMethod {
    pub fn is_signed(self) -> bool {
        matches!(self, Self::Logit | Self::LogitDecay | Self::LogitWindow)
    }

    pub fn needs_window(self) -> bool {
        matches!(self, Self::WindowBayes | Self::LogitWindow)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bayes => "bayes",
            Self::SmoothAcc => "smooth_acc",
            Self::ExpDecay => "exp_decay",
            Self::Wilson => "wilson",
            Self::ZScore => "zscore",
            Self::Centered => "centered",
            Self::WindowBayes => "window_bayes",
            Self::Logit => "logit",
            Self::LogitDecay => "logit_decay",
            Self::LogitWindow => "logit_window",
        }
    }
}

// ─── Options ─────────────────────────────────────────────────────────

/// Beta(a0, b0) shrinkage prior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaPrior {
    pub a0: f64,
    pub b0: f64,
}

impl Default for BetaPrior {
    fn default() -> Self {
        Self { a0: 2.0, b0: 2.0 }
    }
}

/// Training hyperparameters shared by every method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerOptions {
    /// Minimum raw observations before a forecaster gets a weight (default 3).
    pub min_obs: usize,
    pub prior: BetaPrior,
    /// Half-life for the decayed counts (default 10 years).
    pub half_life_years: f64,
    /// Trailing window for the windowed counts. `None` = whole history.
    pub window_years: Option<u32>,
    /// Hard limit on how far back any observation is accumulated.
    pub lookback_years: Option<u32>,
    /// Exponent on the accuracy estimate (magnitude) or log-odds scale (signed).
    pub alpha: f64,
    /// Exponent on the observation count.
    pub gamma: f64,
}

impl Default for TrainerOptions {
    fn default() -> Self {
        Self {
            min_obs: 3,
            prior: BetaPrior::default(),
            half_life_years: 10.0,
            window_years: None,
            lookback_years: None,
            alpha: 1.0,
            gamma: 0.0,
        }
    }
}

impl TrainerOptions {
    pub fn validate(&self) -> Result<(), WeightingError> {
        let BetaPrior { a0, b0 } = self.prior;
        if !(a0.is_finite() && b0.is_finite() && a0 > 0.0 && b0 > 0.0) {
            return Err(WeightingError::InvalidPrior { a0, b0 });
        }
        if !(self.half_life_years.is_finite() && self.half_life_years > 0.0) {
            return Err(WeightingError::InvalidHalfLife(self.half_life_years));
        }
        if self.window_years == Some(0) {
            return Err(WeightingError::ZeroYears {
                field: "window_years",
            });
        }
        if self.lookback_years == Some(0) {
            return Err(WeightingError::ZeroYears {
                field: "lookback_years",
            });
        }
        for (name, value) in [("alpha", self.alpha), ("gamma", self.gamma)] {
            if !value.is_finite() || value < 0.0 {
                return Err(WeightingError::InvalidExponent { name, value });
            }
        }
        Ok(())
    }
}

// ─── Spec ────────────────────────────────────────────────────────────

/// A named, validated weighting configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightingSpec {
    pub name: String,
    pub method: WeightingMethod,
    pub options: TrainerOptions,
}

impl WeightingSpec {
    pub fn new(
        name: impl Into<String>,
        method: WeightingMethod,
        options: TrainerOptions,
    ) -> Result<Self, WeightingError> {
        options.validate()?;
        if method.needs_window() && options.window_years.is_none() {
            return Err(WeightingError::MissingWindow {
                method: method.name(),
            });
        }
        Ok(Self {
            name: name.into(),
            method,
            options,
        })
    }

    /// Plain Beta-shrunk accuracy with default options.
    pub fn bayes() -> Self {
        preset("bayes", WeightingMethod::Bayes, TrainerOptions::default())
    }

    /// The same spec with training restricted to the last `years` years.
    pub fn with_lookback(&self, years: u32) -> Self {
        let mut spec = self.clone();
        spec.options.lookback_years = Some(years.max(1));
        spec
    }

    /// The named weighting variants, in tiebreak order.
    pub fn catalog() -> Vec<WeightingSpec> {
        use WeightingMethod::*;
        let base = TrainerOptions::default();
        let with = |f: fn(&mut TrainerOptions)| tweak(&base, f);
        vec![
            preset("bayes", Bayes, base.clone()),
            preset("bayes_sq", Bayes, with(|o| o.alpha = 2.0)),
            preset("bayes_n", Bayes, with(|o| o.gamma = 0.5)),
            preset(
                "bayes_strong_prior",
                Bayes,
                with(|o| o.prior = BetaPrior { a0: 5.0, b0: 5.0 }),
            ),
            preset("smooth_acc", SmoothAcc, base.clone()),
            preset("smooth_acc_sq", SmoothAcc, with(|o| o.alpha = 2.0)),
            preset("exp_decay_hl5", ExpDecay, with(|o| o.half_life_years = 5.0)),
            preset("exp_decay_hl10", ExpDecay, with(|o| o.half_life_years = 10.0)),
            preset("exp_decay_hl20", ExpDecay, with(|o| o.half_life_years = 20.0)),
            preset("wilson", Wilson, base.clone()),
            preset("wilson_n", Wilson, with(|o| o.gamma = 0.5)),
            preset("zscore", ZScore, base.clone()),
            preset("centered", Centered, base.clone()),
            preset("centered_sq", Centered, with(|o| o.alpha = 2.0)),
            preset("window10", WindowBayes, with(|o| o.window_years = Some(10))),
            preset("window15", WindowBayes, with(|o| o.window_years = Some(15))),
            preset("window20", WindowBayes, with(|o| o.window_years = Some(20))),
            preset("window30", WindowBayes, with(|o| o.window_years = Some(30))),
            preset("logit", Logit, base.clone()),
            preset("logit_n", Logit, with(|o| o.gamma = 0.5)),
            preset("logit_decay_hl5", LogitDecay, with(|o| o.half_life_years = 5.0)),
            preset("logit_decay_hl10", LogitDecay, with(|o| o.half_life_years = 10.0)),
            preset("logit_decay_hl20", LogitDecay, with(|o| o.half_life_years = 20.0)),
            preset("logit_window15", LogitWindow, with(|o| o.window_years = Some(15))),
            preset("logit_window25", LogitWindow, with(|o| o.window_years = Some(25))),
        ]
    }
}

fn tweak(base: &TrainerOptions, f: impl FnOnce(&mut TrainerOptions)) -> TrainerOptions {
    let mut options = base.clone();
    f(&mut options);
    options
}

fn preset(name: &str, method: WeightingMethod, options: TrainerOptions) -> WeightingSpec {
    WeightingSpec {
        name: name.to_string(),
        method,
        options,
    }
}
