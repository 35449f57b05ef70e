//! Candidate predictor — one candidate's forecast for one year.
//!
//! Every non-majority mode trains on years strictly before the year being
//! predicted, slices the [`TrainedWeights`] indexes, and falls back to the
//! plain majority when it ends up with no usable votes. A year with no
//! predictions abstains for every mode.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::candidate::{Candidate, Fingerprint};
use crate::domain::{Dataset, Forecast, ForecasterId, Outcome, Prediction, TargetId, Year};
use crate::stats::{clamp, wilson_interval, Z_95};
use crate::weighting::{train_weights, TrainedWeights, WeightingSpec};

// ─── Modes ───────────────────────────────────────────────────────────

/// How a candidate turns the year's predictions into one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PredictionMode {
    /// Unweighted vote of everyone; ties go to early spring.
    MajorityAll,
    /// Weighted vote of every weighted forecaster.
    AutoWeighted,
    /// Weighted vote of the N largest-|w| forecasters present this year.
    TopnWeighted { top_n: usize },
    /// Majority of the N best-ranked forecasters present this year.
    TopnMajority { top_n: usize },
    /// The best-ranked forecaster present this year, verbatim.
    BestSingle,
    /// `BestSingle` trained on the trailing window only.
    ChampionWindow { window_years: u32 },
    /// Majority with reliably-wrong forecasters inverted.
    FlipMajority { min_obs: usize },
}

impl PredictionMode {
    pub fn label(&self) -> String {
        match self {
            Self::MajorityAll => "majority_all".to_string(),
            Self::AutoWeighted => "auto_weighted".to_string(),
            Self::TopnWeighted { top_n } => format!("topn_weighted({top_n})"),
            Self::TopnMajority { top_n } => format!("topn_majority({top_n})"),
            Self::BestSingle => "best_single".to_string(),
            Self::ChampionWindow { window_years } => format!("champion_window({window_years})"),
            Self::FlipMajority { min_obs } => format!("flip_majority({min_obs})"),
        }
    }

    /// Whether the weighting spec changes this mode's output.
    pub fn uses_weighting(&self) -> bool {
        !matches!(self, Self::MajorityAll | Self::FlipMajority { .. })
    }
}

// ─── Vote helpers ────────────────────────────────────────────────────

/// Unweighted majority; tie → early spring, certainty = winning fraction.
pub fn majority_of(outcomes: impl IntoIterator<Item = Outcome>) -> Forecast {
    let (mut early, mut late) = (0usize, 0usize);
    for outcome in outcomes {
        match outcome {
            Outcome::EarlySpring => early += 1,
            Outcome::LongWinter => late += 1,
        }
    }
    let used = early + late;
    if used == 0 {
        return Forecast::abstain();
    }
    let pred = if early >= late {
        Outcome::EarlySpring
    } else {
        Outcome::LongWinter
    };
    Forecast::new(pred, early.max(late) as f64 / used as f64, used)
}

/// Signed weighted vote over `preds`; `None` when no vote carries weight.
///
/// A negative weight inverts that forecaster's vote.
pub fn weighted_vote(
    preds: &[Prediction],
    mut weight_of: impl FnMut(&ForecasterId) -> Option<f64>,
) -> Option<Forecast> {
    let (mut score, mut total_abs, mut used) = (0.0, 0.0, 0usize);
    for p in preds {
        let Some(w) = weight_of(&p.forecaster) else {
            continue;
        };
        score += w * p.outcome().sign();
        total_abs += w.abs();
        used += 1;
    }
    if total_abs <= 0.0 {
        return None;
    }
    Some(Forecast::new(
        Outcome::from_score(score),
        (score.abs() / total_abs).min(1.0),
        used,
    ))
}

/// The year's prediction from `id`, if any (`preds` sorted by forecaster).
pub fn find_prediction<'a>(preds: &'a [Prediction], id: &ForecasterId) -> Option<&'a Prediction> {
    preds
        .binary_search_by(|p| p.forecaster.cmp(id))
        .ok()
        .map(|i| &preds[i])
}

fn majority_all(preds: &[Prediction]) -> Forecast {
    majority_of(preds.iter().map(Prediction::outcome))
}

// ─── Weight cache ────────────────────────────────────────────────────

/// Memoized training results keyed by (weighting hash, target, cutoff).
#[derive(Debug, Default)]
pub struct WeightCache {
    entries: HashMap<(Fingerprint, TargetId, Year), Arc<TrainedWeights>>,
    hits: u64,
    misses: u64,
}

impl WeightCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_train(
        &mut self,
        data: &Dataset,
        target: &TargetId,
        cutoff: Year,
        spec: &WeightingSpec,
        spec_hash: Fingerprint,
    ) -> Arc<TrainedWeights> {
        let key = (spec_hash, target.clone(), cutoff);
        if let Some(hit) = self.entries.get(&key) {
            self.hits += 1;
            return Arc::clone(hit);
        }
        self.misses += 1;
        let trained = Arc::new(train_weights(data, target, cutoff, spec));
        self.entries.insert(key, Arc::clone(&trained));
        trained
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses)
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

// ─── Prediction ──────────────────────────────────────────────────────

/// Forecast `year` with `candidate`, training only on years `< year`.
pub fn predict_for_year(
    data: &Dataset,
    candidate: &Candidate,
    year: Year,
    cache: &mut WeightCache,
) -> Forecast {
    let preds = data.panel.year(year);
    if preds.is_empty() {
        return Forecast::abstain();
    }
    let mode = *candidate.mode();
    if mode == PredictionMode::MajorityAll {
        return majority_all(preds);
    }

    let trained = cache.get_or_train(
        data,
        candidate.target(),
        year,
        &candidate.training,
        candidate.training_hash,
    );

    let forecast = match mode {
        PredictionMode::MajorityAll => None,
        PredictionMode::AutoWeighted => weighted_vote(preds, |id| trained.weight(id)),
        PredictionMode::TopnWeighted { top_n } => {
            let chosen: Vec<&ForecasterId> = trained
                .by_magnitude
                .iter()
                .filter(|id| find_prediction(preds, id).is_some())
                .take(top_n)
                .collect();
            weighted_vote(preds, |id| {
                if chosen.contains(&id) {
                    trained.weight(id)
                } else {
                    None
                }
            })
        }
        PredictionMode::TopnMajority { top_n } => {
            let outcomes: Vec<Outcome> = trained
                .ranking
                .iter()
                .filter_map(|r| find_prediction(preds, &r.id))
                .take(top_n)
                .map(Prediction::outcome)
                .collect();
            (!outcomes.is_empty()).then(|| majority_of(outcomes))
        }
        PredictionMode::BestSingle | PredictionMode::ChampionWindow { .. } => {
            trained.ranking.iter().find_map(|r| {
                find_prediction(preds, &r.id)
                    .map(|p| Forecast::new(p.outcome(), clamp(r.accuracy, 0.0, 1.0), 1))
            })
        }
        PredictionMode::FlipMajority { min_obs } => Some(majority_of(preds.iter().map(|p| {
            let reliably_wrong = trained.stat(&p.forecaster).is_some_and(|s| {
                s.n_raw >= min_obs
                    && wilson_interval(s.k_raw as f64, s.n_raw as f64, Z_95)
                        .is_some_and(|(_, hi)| hi < 0.5)
            });
            if reliably_wrong {
                p.outcome().flipped()
            } else {
                p.outcome()
            }
        }))),
    };

    forecast.unwrap_or_else(|| majority_all(preds))
}
