//! Stacked logistic regression over matrix columns.
//!
//! Each training year becomes one row of features built from the selected
//! columns' calls that year, labelled 1 for early spring. The model is a plain
//! full-batch gradient-descent logistic regression with L2 on the weights and
//! optional exponential sample-age weights.

use serde::{Deserialize, Serialize};

use shadowcast_core::domain::{Forecast, Outcome, Year};
use shadowcast_core::stats::{decay_weight, sigmoid};

use super::matrix::CandidateMatrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    pub steps: usize,
    pub lr: f64,
    pub l2: f64,
    /// Minimum usable training years, checked before and after dropping
    /// years where no selected column made a call.
    pub min_train: usize,
    pub decay_half_life: Option<f64>,
    pub window_years: Option<u32>,
    /// Append the six aggregate features to the per-column pairs.
    pub advanced: bool,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            steps: 260,
            lr: 0.22,
            l2: 0.06,
            min_train: 12,
            decay_half_life: Some(12.0),
            window_years: Some(30),
            advanced: false,
        }
    }
}

/// Feature row for `year` over `columns`, and how many columns made a call.
///
/// Per column: (signal, strength). Advanced rows append mean signal, mean
/// strength, mean |strength| (all over voting columns), consensus,
/// disagreement and the fraction of columns that voted.
pub fn feature_vector(
    matrix: &CandidateMatrix,
    year: Year,
    columns: &[usize],
    advanced: bool,
) -> (Vec<f64>, usize) {
    let mut features = Vec::with_capacity(columns.len() * 2 + 6);
    let (mut used, mut sum_signal, mut sum_strength, mut sum_abs) = (0usize, 0.0, 0.0, 0.0);
    for &c in columns {
        let cell = matrix.cell(year, c);
        let (signal, strength) = (cell.signal(), cell.strength());
        if signal != 0.0 {
            used += 1;
        }
        sum_signal += signal;
        sum_strength += strength;
        sum_abs += strength.abs();
        features.push(signal);
        features.push(strength);
    }
    if advanced {
        let per_used = |x: f64| if used > 0 { x / used as f64 } else { 0.0 };
        let consensus = per_used(sum_signal.abs());
        let used_ratio = if columns.is_empty() {
            0.0
        } else {
            used as f64 / columns.len() as f64
        };
        features.extend([
            per_used(sum_signal),
            per_used(sum_strength),
            per_used(sum_abs),
            consensus,
            1.0 - consensus,
            used_ratio,
        ]);
    }
    (features, used)
}

// ─── Model ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct LogisticModel {
    pub w: Vec<f64>,
    pub b: f64,
}

impl LogisticModel {
    pub fn probability(&self, x: &[f64]) -> f64 {
        let z = self.b + self.w.iter().zip(x).map(|(w, x)| w * x).sum::<f64>();
        sigmoid(z)
    }
}

/// Full-batch gradient descent from zero weights.
///
/// Gradients are averaged over the total sample weight; L2 applies to `w`
/// only. `None` for an empty or featureless training set.
pub fn train_logistic(
    features: &[Vec<f64>],
    labels: &[f64],
    sample_weights: Option<&[f64]>,
    steps: usize,
    lr: f64,
    l2: f64,
) -> Option<LogisticModel> {
    let m = features.first().map(Vec::len).filter(|&m| m > 0)?;
    let weight_sum: f64 = match sample_weights {
        Some(ws) => ws.iter().sum(),
        None => features.len() as f64,
    };
    let inv_n = if weight_sum > 0.0 { 1.0 / weight_sum } else { 0.0 };

    let mut model = LogisticModel {
        w: vec![0.0; m],
        b: 0.0,
    };
    let mut grad_w = vec![0.0; m];
    for _ in 0..steps {
        grad_w.iter_mut().for_each(|g| *g = 0.0);
        let mut grad_b = 0.0;
        for (i, (x, y)) in features.iter().zip(labels).enumerate() {
            let wi = sample_weights.and_then(|ws| ws.get(i)).copied().unwrap_or(1.0);
            let diff = (model.probability(x) - y) * wi;
            for (g, xj) in grad_w.iter_mut().zip(x) {
                *g += diff * xj;
            }
            grad_b += diff;
        }
        for (w, g) in model.w.iter_mut().zip(&grad_w) {
            *w -= lr * (g * inv_n + l2 * *w);
        }
        model.b -= lr * grad_b * inv_n;
    }
    Some(model)
}

/// Stacked forecast for `year` from `columns`.
///
/// Abstains when fewer than `min_train` training years exist, when fewer
/// than `min_train` remain after dropping years with no column call, or when
/// no selected column calls `year`.
pub fn stacked_forecast(
    matrix: &CandidateMatrix,
    year: Year,
    columns: &[usize],
    config: &StackConfig,
) -> Forecast {
    let train = matrix.train_years(year, config.window_years);
    if train.len() < config.min_train {
        return Forecast::abstain();
    }

    let mut x = Vec::with_capacity(train.len());
    let mut y = Vec::with_capacity(train.len());
    let mut weights = Vec::with_capacity(train.len());
    for &t in &train {
        let Some(actual) = matrix.actual(t) else {
            continue;
        };
        let (features, used) = feature_vector(matrix, t, columns, config.advanced);
        if used == 0 {
            continue;
        }
        x.push(features);
        y.push(actual.label());
        weights.push(decay_weight(f64::from(year - t), config.decay_half_life));
    }
    if x.len() < config.min_train {
        return Forecast::abstain();
    }

    let sample_weights = config.decay_half_life.map(|_| weights.as_slice());
    let Some(model) = train_logistic(&x, &y, sample_weights, config.steps, config.lr, config.l2)
    else {
        return Forecast::abstain();
    };

    let (features, used) = feature_vector(matrix, year, columns, config.advanced);
    if used == 0 {
        return Forecast::abstain();
    }
    let p = model.probability(&features);
    let pred = if p >= 0.5 {
        Outcome::EarlySpring
    } else {
        Outcome::LongWinter
    };
    Forecast::new(pred, (p - 0.5).abs() * 2.0, used)
}
