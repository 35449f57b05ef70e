//! Weight trainer — turns the pre-cutoff track record into signed weights.
//!
//! Only years strictly before the cutoff, with a known outcome for the
//! target, are ever read. Everything downstream (ranking, flip detection,
//! weighted votes) works from the [`TrainedWeights`] built here, so the
//! no-lookahead rule is enforced in exactly one place.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{Dataset, ForecasterId, TargetId, Year};
use crate::stats::{beta_shrink, clamp, decay_weight, logit, ratio, sigmoid, split_point, wilson_interval, Z_95};

use super::{WeightingMethod, WeightingSpec};

/// Weights below this magnitude are treated as zero and dropped.
const MIN_ABS_WEIGHT: f64 = 1e-12;

// ─── Per-forecaster statistics ───────────────────────────────────────

/// A forecaster's track record as of one cutoff year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecasterStat {
    pub n_raw: usize,
    pub k_raw: usize,
    pub n_decayed: f64,
    pub k_decayed: f64,
    pub n_windowed: usize,
    pub k_windowed: usize,
    pub n_early: usize,
    pub k_early: usize,
    pub n_late: usize,
    pub k_late: usize,
}

impl ForecasterStat {
    /// Raw hit rate, NaN without observations.
    pub fn acc_raw(&self) -> f64 {
        ratio(self.k_raw as f64, self.n_raw as f64).unwrap_or(f64::NAN)
    }

    /// Hit rate over the early half of history (falls back to the raw rate).
    pub fn acc_early_half(&self) -> f64 {
        ratio(self.k_early as f64, self.n_early as f64).unwrap_or_else(|| self.acc_raw())
    }

    /// Hit rate over the late half of history (falls back to the raw rate).
    pub fn acc_late_half(&self) -> f64 {
        ratio(self.k_late as f64, self.n_late as f64).unwrap_or_else(|| self.acc_raw())
    }

    /// `1 − |early − late|` clamped to [0, 1]; 0.5 when undefined.
    pub fn stability(&self) -> f64 {
        let s = 1.0 - (self.acc_early_half() - self.acc_late_half()).abs();
        if s.is_finite() {
            clamp(s, 0.0, 1.0)
        } else {
            0.5
        }
    }

    /// Late-half minus early-half accuracy.
    pub fn trend(&self) -> f64 {
        let t = self.acc_late_half() - self.acc_early_half();
        if t.is_finite() {
            t
        } else {
            0.0
        }
    }

    fn record(&mut self, correct: bool, decay: f64, in_window: bool, early: bool) {
        let hit = usize::from(correct);
        self.n_raw += 1;
        self.k_raw += hit;
        self.n_decayed += decay;
        if correct {
            self.k_decayed += decay;
        }
        if in_window {
            self.n_windowed += 1;
            self.k_windowed += hit;
        }
        if early {
            self.n_early += 1;
            self.k_early += hit;
        } else {
            self.n_late += 1;
            self.k_late += hit;
        }
    }
}

/// Accumulate every forecaster's record over years `< cutoff`.
///
/// `lookback` drops years older than `cutoff − lookback` entirely; `window`
/// only limits the windowed counters. Returns the stats and the largest raw
/// observation count.
pub fn accumulate_stats(
    data: &Dataset,
    target: &TargetId,
    cutoff: Year,
    half_life: Option<f64>,
    window: Option<u32>,
    lookback: Option<u32>,
) -> (BTreeMap<ForecasterId, ForecasterStat>, usize) {
    let mut years = data.history_before(target, cutoff);
    if let Some(lb) = lookback {
        let start = cutoff - lb as Year;
        years.retain(|y| *y >= start);
    }

    let mut stats: BTreeMap<ForecasterId, ForecasterStat> = BTreeMap::new();
    let Some(split) = split_point(&years) else {
        return (stats, 0);
    };
    let window_start = window.map(|w| cutoff - w as Year);

    for &year in &years {
        let Some(actual) = data.outcome(target, year) else {
            continue;
        };
        let decay = decay_weight(f64::from(cutoff - year), half_life);
        let in_window = window_start.map_or(true, |start| year >= start);
        let early = year < split;

        for p in data.panel.year(year) {
            stats
                .entry(p.forecaster.clone())
                .or_default()
                .record(p.outcome() == actual, decay, in_window, early);
        }
    }

    let max_n = stats.values().map(|s| s.n_raw).max().unwrap_or(0);
    (stats, max_n)
}

// ─── Trained weights ─────────────────────────────────────────────────

/// A forecaster's position in the accuracy ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedForecaster {
    pub id: ForecasterId,
    /// The method's accuracy estimate (`pHat`).
    pub accuracy: f64,
    pub n: usize,
}

/// Output of one training pass: weights, stats, and the two sorted indexes
/// consumers slice instead of re-sorting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainedWeights {
    pub cutoff: Year,
    /// Signed weights, Σ|w| = 1 (empty when nobody is eligible).
    pub weights: BTreeMap<ForecasterId, f64>,
    /// Stats for every forecaster seen before the cutoff.
    pub stats: BTreeMap<ForecasterId, ForecasterStat>,
    /// Eligible forecasters by accuracy desc, n desc, id asc.
    pub ranking: Vec<RankedForecaster>,
    /// Weighted forecasters by |weight| desc, id asc.
    pub by_magnitude: Vec<ForecasterId>,
}

impl TrainedWeights {
    pub fn empty(cutoff: Year) -> Self {
        Self {
            cutoff,
            ..Default::default()
        }
    }

    pub fn weight(&self, id: &ForecasterId) -> Option<f64> {
        self.weights.get(id).copied()
    }

    pub fn stat(&self, id: &ForecasterId) -> Option<&ForecasterStat> {
        self.stats.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn total_abs(&self) -> f64 {
        self.weights.values().map(|w| w.abs()).sum()
    }
}

/// Train per-forecaster weights for `target` as of `cutoff` (exclusive).
///
/// Never fails: with no eligible history the result is empty and callers
/// fall back to an unweighted vote.
pub fn train_weights(
    data: &Dataset,
    target: &TargetId,
    cutoff: Year,
    spec: &WeightingSpec,
) -> TrainedWeights {
    let opts = &spec.options;
    let (stats, _) = accumulate_stats(
        data,
        target,
        cutoff,
        Some(opts.half_life_years),
        opts.window_years,
        opts.lookback_years,
    );

    let mut raw_weights: Vec<(ForecasterId, f64)> = Vec::new();
    let mut ranking: Vec<RankedForecaster> = Vec::new();

    for (id, stat) in &stats {
        if stat.n_raw == 0 || stat.n_raw < opts.min_obs {
            continue;
        }
        let Some(p_hat) = estimate(spec, stat) else {
            continue;
        };
        ranking.push(RankedForecaster {
            id: id.clone(),
            accuracy: p_hat,
            n: stat.n_raw,
        });

        let boost = (stat.n_raw.max(1) as f64).powf(opts.gamma);
        let w = if spec.method.is_signed() {
            logit(p_hat) * opts.alpha * boost
        } else {
            p_hat.powf(opts.alpha) * boost
        };
        if w.is_finite() && w.abs() >= MIN_ABS_WEIGHT {
            raw_weights.push((id.clone(), w));
        }
    }

    let sum_abs: f64 = raw_weights.iter().map(|(_, w)| w.abs()).sum();
    let weights: BTreeMap<ForecasterId, f64> = if sum_abs > 0.0 {
        raw_weights
            .into_iter()
            .map(|(id, w)| (id, w / sum_abs))
            .collect()
    } else {
        BTreeMap::new()
    };

    ranking.sort_by(|a, b| {
        b.accuracy
            .total_cmp(&a.accuracy)
            .then(b.n.cmp(&a.n))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut by_magnitude: Vec<(ForecasterId, f64)> =
        weights.iter().map(|(id, w)| (id.clone(), w.abs())).collect();
    by_magnitude.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    TrainedWeights {
        cutoff,
        weights,
        stats,
        ranking,
        by_magnitude: by_magnitude.into_iter().map(|(id, _)| id).collect(),
    }
}

/// The method's accuracy estimate for one forecaster, or `None` when the
/// method has nothing to say (no in-window data, non-finite value).
fn estimate(spec: &WeightingSpec, stat: &ForecasterStat) -> Option<f64> {
    let prior = spec.options.prior;
    let n = stat.n_raw as f64;
    let k = stat.k_raw as f64;
    let bayes_raw = beta_shrink(k, n, prior.a0, prior.b0);

    let p = match spec.method {
        WeightingMethod::Bayes | WeightingMethod::Logit => bayes_raw,
        WeightingMethod::SmoothAcc => (k + 1.0) / (n + 2.0),
        WeightingMethod::ExpDecay | WeightingMethod::LogitDecay => {
            beta_shrink(stat.k_decayed, stat.n_decayed, prior.a0, prior.b0)
        }
        WeightingMethod::Wilson => wilson_interval(k, n, Z_95)?.0,
        WeightingMethod::ZScore => {
            if n <= 0.0 {
                return None;
            }
            sigmoid((2.0 * k - n) / n.sqrt())
        }
        WeightingMethod::Centered => clamp(2.0 * (bayes_raw - 0.5), 0.0, 1.0),
        WeightingMethod::WindowBayes | WeightingMethod::LogitWindow => {
            if stat.n_windowed == 0 {
                return None;
            }
            beta_shrink(
                stat.k_windowed as f64,
                stat.n_windowed as f64,
                prior.a0,
                prior.b0,
            )
        }
    };
    p.is_finite().then_some(p)
}
