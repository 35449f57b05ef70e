//! Multi-signal fusion weights — one forecaster weight from several signals.
//!
//! Each [`FusionConfig`] blends the log-odds of three accuracy estimates
//! (shrunk, decayed, windowed) with stability, evidence and trend terms. The
//! nine built-in configs are the columns of the fusion candidate matrix.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{Dataset, Forecast, ForecasterId, TargetId, Year};
use crate::predict::{majority_of, weighted_vote};
use crate::stats::{beta_shrink, logit};

use super::{accumulate_stats, ForecasterStat, WeightingError};

const MIN_FUSION_WEIGHT: f64 = 1e-9;

/// Named forecaster-level weighting bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    pub id: String,
    pub half_life_years: f64,
    pub window_years: u32,
    pub min_obs: usize,
    pub n_boost: f64,
    pub prior_a: f64,
    pub prior_b: f64,
    pub w_bayes: f64,
    pub w_decay: f64,
    pub w_window: f64,
    pub w_stability: f64,
    pub w_evidence: f64,
    pub w_trend: f64,
    /// Invert forecasters whose shrunk accuracy is below 0.5.
    pub contrarian: bool,
}

impl FusionConfig {
    pub fn validate(&self) -> Result<(), WeightingError> {
        let (a0, b0) = (self.prior_a, self.prior_b);
        if !(a0.is_finite() && b0.is_finite() && a0 > 0.0 && b0 > 0.0) {
            return Err(WeightingError::InvalidPrior { a0, b0 });
        }
        if !(self.half_life_years.is_finite() && self.half_life_years > 0.0) {
            return Err(WeightingError::InvalidHalfLife(self.half_life_years));
        }
        if self.window_years == 0 {
            return Err(WeightingError::ZeroYears {
                field: "window_years",
            });
        }
        if !self.n_boost.is_finite() || self.n_boost < 0.0 {
            return Err(WeightingError::InvalidExponent {
                name: "n_boost",
                value: self.n_boost,
            });
        }
        Ok(())
    }

    /// The nine built-in configs, in column order.
    pub fn builtin() -> Vec<FusionConfig> {
        vec![
            FusionConfig {
                w_bayes: 1.2,
                w_decay: 1.6,
                w_window: 0.9,
                w_stability: 0.7,
                w_evidence: 0.5,
                w_trend: 0.25,
                contrarian: true,
                ..base("spark", 6.0, 12, 6, 0.45, 2.0)
            },
            FusionConfig {
                w_bayes: 1.4,
                w_decay: 1.2,
                w_window: 1.0,
                w_stability: 0.8,
                w_evidence: 0.6,
                w_trend: 0.2,
                contrarian: true,
                ..base("balanced", 10.0, 18, 8, 0.55, 3.0)
            },
            FusionConfig {
                w_bayes: 1.6,
                w_decay: 0.9,
                w_window: 1.2,
                w_stability: 1.2,
                w_evidence: 0.7,
                w_trend: 0.1,
                contrarian: false,
                ..base("stable", 16.0, 26, 10, 0.6, 4.0)
            },
            FusionConfig {
                w_bayes: 0.9,
                w_decay: 1.8,
                w_window: 0.8,
                w_stability: 0.5,
                w_evidence: 0.4,
                w_trend: 0.35,
                contrarian: true,
                ..base("recency", 4.0, 9, 5, 0.4, 2.0)
            },
            FusionConfig {
                w_bayes: 1.7,
                w_decay: 0.6,
                w_window: 1.3,
                w_stability: 1.0,
                w_evidence: 0.9,
                w_trend: 0.05,
                contrarian: false,
                ..base("legacy", 22.0, 32, 12, 0.7, 5.0)
            },
            FusionConfig {
                w_bayes: 1.3,
                w_decay: 1.0,
                w_window: 0.9,
                w_stability: 1.4,
                w_evidence: 0.5,
                w_trend: 0.15,
                contrarian: false,
                ..base("stability", 12.0, 20, 8, 0.5, 3.0)
            },
            FusionConfig {
                w_bayes: 1.0,
                w_decay: 1.0,
                w_window: 1.6,
                w_stability: 0.6,
                w_evidence: 0.4,
                w_trend: 0.2,
                contrarian: true,
                ..base("window", 9.0, 10, 5, 0.45, 2.0)
            },
            FusionConfig {
                w_bayes: 0.8,
                w_decay: 1.7,
                w_window: 0.7,
                w_stability: 0.5,
                w_evidence: 0.3,
                w_trend: 0.6,
                contrarian: true,
                ..base("momentum", 5.0, 8, 4, 0.35, 2.0)
            },
            FusionConfig {
                w_bayes: 1.2,
                w_decay: 0.8,
                w_window: 0.7,
                w_stability: 1.0,
                w_evidence: 1.1,
                w_trend: 0.05,
                contrarian: false,
                ..base("evidence", 12.0, 24, 12, 0.8, 4.0)
            },
        ]
    }
}

/// Signal weights start at zero. All built-ins use a symmetric prior.
fn base(
    id: &str,
    half_life_years: f64,
    window_years: u32,
    min_obs: usize,
    n_boost: f64,
    prior: f64,
) -> FusionConfig {
    FusionConfig {
        id: id.to_string(),
        half_life_years,
        window_years,
        min_obs,
        n_boost,
        prior_a: prior,
        prior_b: prior,
        w_bayes: 0.0,
        w_decay: 0.0,
        w_window: 0.0,
        w_stability: 0.0,
        w_evidence: 0.0,
        w_trend: 0.0,
        contrarian: false,
    }
}

fn fusion_signal(stat: &ForecasterStat, evidence: f64, config: &FusionConfig) -> (f64, f64) {
    let (a0, b0) = (config.prior_a, config.prior_b);
    let acc_bayes = beta_shrink(stat.k_raw as f64, stat.n_raw as f64, a0, b0);
    let acc_decay = if stat.n_decayed > 0.0 {
        beta_shrink(stat.k_decayed, stat.n_decayed, a0, b0)
    } else {
        acc_bayes
    };
    let acc_window = if stat.n_windowed > 0 {
        beta_shrink(stat.k_windowed as f64, stat.n_windowed as f64, a0, b0)
    } else {
        acc_bayes
    };

    let signal = config.w_bayes * logit(acc_bayes)
        + config.w_decay * logit(acc_decay)
        + config.w_window * logit(acc_window)
        + config.w_stability * ((stat.stability() - 0.5) * 2.0)
        + config.w_evidence * evidence
        + config.w_trend * stat.trend();
    (signal, acc_bayes)
}

/// Normalized fusion weights for `target` as of `cutoff` (exclusive).
pub fn fusion_weights(
    data: &Dataset,
    target: &TargetId,
    cutoff: Year,
    config: &FusionConfig,
) -> BTreeMap<ForecasterId, f64> {
    let (stats, max_n) = accumulate_stats(
        data,
        target,
        cutoff,
        Some(config.half_life_years),
        Some(config.window_years),
        None,
    );
    let denom = (max_n.max(1) as f64).ln_1p();

    let mut weights: BTreeMap<ForecasterId, f64> = BTreeMap::new();
    for (id, stat) in stats {
        if stat.n_raw == 0 || stat.n_raw < config.min_obs {
            continue;
        }
        let evidence = (stat.n_raw as f64).ln_1p() / denom;
        let (signal, acc_bayes) = fusion_signal(&stat, evidence, config);
        if !signal.is_finite() {
            continue;
        }
        let mut w = signal;
        if config.contrarian && acc_bayes < 0.5 {
            w = -w;
        }
        w *= (stat.n_raw.max(1) as f64).powf(config.n_boost);
        if w.abs() < MIN_FUSION_WEIGHT {
            continue;
        }
        weights.insert(id, w);
    }

    let sum_abs: f64 = weights.values().map(|w| w.abs()).sum();
    if sum_abs <= 0.0 {
        return BTreeMap::new();
    }
    for w in weights.values_mut() {
        *w /= sum_abs;
    }
    weights
}

/// Weighted vote of `year`'s predictions under `config`, falling back to the
/// plain majority when no forecaster carries weight.
pub fn fusion_forecast(data: &Dataset, target: &TargetId, year: Year, config: &FusionConfig) -> Forecast {
    let preds = data.panel.year(year);
    if preds.is_empty() {
        return Forecast::abstain();
    }
    let weights = fusion_weights(data, target, year, config);
    weighted_vote(preds, |id| weights.get(id).copied())
        .unwrap_or_else(|| majority_of(preds.iter().map(|p| p.outcome())))
}
