//! Backtest replay — the one place forecasts are scored against outcomes.
//!
//! Every strategy (base candidates, fusion columns, meta strategies, the DAE
//! trace) is scored through [`replay`]: iterate the scored years ascending,
//! ask the strategy for a forecast, skip abstentions, accumulate n and k.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use shadowcast_core::candidate::{Candidate, Fingerprint};
use shadowcast_core::domain::{Dataset, Forecast, Outcome, TargetId, Year};
use shadowcast_core::predict::{predict_for_year, WeightCache};

// ─── Configuration ───────────────────────────────────────────────────

/// Which years count as scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestGate {
    /// Minimum predictions a year needs to be scored (default 20).
    pub min_forecasters: usize,
}

impl Default for BacktestGate {
    fn default() -> Self {
        Self { min_forecasters: 20 }
    }
}

/// Ascending years with a known outcome for `target` and enough forecasters.
pub fn scored_years(data: &Dataset, target: &TargetId, gate: BacktestGate) -> Vec<Year> {
    data.panel
        .years()
        .filter(|y| data.outcomes.contains(target, *y))
        .filter(|y| data.panel.count(*y) >= gate.min_forecasters)
        .collect()
}

// ─── Result types ────────────────────────────────────────────────────

/// Aggregate accuracy of one strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// k / n, NaN when nothing was scored.
    pub accuracy: f64,
    pub n: usize,
    pub k: usize,
    pub last_scored_year: Option<Year>,
}

impl BacktestResult {
    pub fn empty() -> Self {
        Self {
            accuracy: f64::NAN,
            n: 0,
            k: 0,
            last_scored_year: None,
        }
    }

    /// At least one scored year and a finite accuracy.
    pub fn is_viable(&self) -> bool {
        self.n > 0 && self.accuracy.is_finite()
    }

    /// Strictly better on (accuracy, n). Non-viable results never win.
    pub fn beats(&self, other: &BacktestResult) -> bool {
        if !self.is_viable() {
            return false;
        }
        if !other.is_viable() {
            return true;
        }
        self.accuracy > other.accuracy || (self.accuracy == other.accuracy && self.n > other.n)
    }
}

/// One scored year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestRow {
    pub year: Year,
    pub forecast: Forecast,
    pub actual: Outcome,
    pub correct: bool,
    pub cum_n: usize,
    pub cum_k: usize,
}

/// Row-by-row record of a replay plus its aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestTrace {
    pub rows: Vec<BacktestRow>,
    pub result: BacktestResult,
}

impl BacktestTrace {
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            result: BacktestResult::empty(),
        }
    }
}

// ─── Replay ──────────────────────────────────────────────────────────

/// Score `predict` over the scored years of `target`.
pub fn replay(
    data: &Dataset,
    target: &TargetId,
    gate: BacktestGate,
    predict: impl FnMut(Year) -> Forecast,
) -> BacktestTrace {
    let years = scored_years(data, target, gate);
    replay_years(&years, |y| data.outcome(target, y), predict)
}

/// Score `predict` over an explicit list of ascending years.
pub fn replay_years(
    years: &[Year],
    actual_of: impl Fn(Year) -> Option<Outcome>,
    mut predict: impl FnMut(Year) -> Forecast,
) -> BacktestTrace {
    let mut rows = Vec::with_capacity(years.len());
    let (mut n, mut k) = (0usize, 0usize);

    for &year in years {
        let Some(actual) = actual_of(year) else {
            continue;
        };
        let forecast = predict(year);
        if forecast.is_abstain() {
            continue;
        }
        let correct = forecast.is_correct(actual);
        n += 1;
        k += usize::from(correct);
        rows.push(BacktestRow {
            year,
            forecast,
            actual,
            correct,
            cum_n: n,
            cum_k: k,
        });
    }

    let result = BacktestResult {
        accuracy: if n > 0 { k as f64 / n as f64 } else { f64::NAN },
        n,
        k,
        last_scored_year: rows.last().map(|r| r.year),
    };
    BacktestTrace { rows, result }
}

// ─── Evaluator ───────────────────────────────────────────────────────

/// Memoizing front-end to the predictor for one evaluation session.
///
/// Forecasts are cached per (candidate hash, year) and trained weights per
/// (weighting hash, target, cutoff). An evaluator is owned by exactly one
/// task; parallel searches create one each.
pub struct Evaluator<'a> {
    data: &'a Dataset,
    gate: BacktestGate,
    weights: WeightCache,
    forecasts: HashMap<(Fingerprint, Year), Forecast>,
}

impl<'a> Evaluator<'a> {
    pub fn new(data: &'a Dataset, gate: BacktestGate) -> Self {
        Self {
            data,
            gate,
            weights: WeightCache::new(),
            forecasts: HashMap::new(),
        }
    }

    pub fn data(&self) -> &'a Dataset {
        self.data
    }

    pub fn gate(&self) -> BacktestGate {
        self.gate
    }

    pub fn forecast(&mut self, candidate: &Candidate, year: Year) -> Forecast {
        if let Some(hit) = self.forecasts.get(&(candidate.hash, year)) {
            return *hit;
        }
        let f = predict_for_year(self.data, candidate, year, &mut self.weights);
        self.forecasts.insert((candidate.hash, year), f);
        f
    }

    pub fn backtest(&mut self, candidate: &Candidate) -> BacktestTrace {
        let data = self.data;
        let gate = self.gate;
        let trace = replay(data, candidate.target(), gate, |y| self.forecast(candidate, y));
        debug!(
            candidate = %candidate.label,
            accuracy = trace.result.accuracy,
            n = trace.result.n,
            "backtested candidate"
        );
        trace
    }

    /// (cached forecasts, cached weight sets)
    pub fn cache_sizes(&self) -> (usize, usize) {
        (self.forecasts.len(), self.weights.len())
    }
}
