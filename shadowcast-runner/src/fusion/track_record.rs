//! Track record of one matrix column over a set of training years.

use shadowcast_core::domain::Year;
use shadowcast_core::stats::{clamp, decay_weight, split_point};

use super::matrix::CandidateMatrix;

/// Possibly decay-weighted hit counts of a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackRecord {
    pub n: f64,
    pub k: f64,
    /// k / n, NaN when the column never predicted a training year.
    pub accuracy: f64,
    /// `1 − |early − late|`, 0.5 when either half is undefined.
    pub stability: f64,
}

impl TrackRecord {
    /// `(k + 2) / (n + 4)`
    pub fn shrunk(&self) -> f64 {
        (self.k + 2.0) / (self.n + 4.0)
    }
}

/// Score `column` over `train_years` (ascending, all `< current_year`).
///
/// Years where the column abstained or the outcome is unknown are skipped.
/// With a half-life, each year counts `decay_weight(current_year − year)`.
/// The early/late split is the upper median of `train_years`.
pub fn track_record(
    matrix: &CandidateMatrix,
    column: usize,
    train_years: &[Year],
    current_year: Year,
    decay_half_life: Option<f64>,
) -> TrackRecord {
    let Some(split) = split_point(train_years) else {
        return TrackRecord {
            n: 0.0,
            k: 0.0,
            accuracy: f64::NAN,
            stability: 0.5,
        };
    };

    let (mut n, mut k) = (0.0, 0.0);
    let (mut n_early, mut k_early, mut n_late, mut k_late) = (0.0, 0.0, 0.0, 0.0);
    for &year in train_years {
        let forecast = matrix.cell(year, column);
        let (Some(pred), Some(actual)) = (forecast.pred, matrix.actual(year)) else {
            continue;
        };
        let hit = if pred == actual { 1.0 } else { 0.0 };
        let w = decay_weight(f64::from(current_year - year), decay_half_life);
        n += w;
        k += w * hit;
        if year < split {
            n_early += w;
            k_early += w * hit;
        } else {
            n_late += w;
            k_late += w * hit;
        }
    }

    let accuracy = if n > 0.0 { k / n } else { f64::NAN };
    let early = if n_early > 0.0 { k_early / n_early } else { accuracy };
    let late = if n_late > 0.0 { k_late / n_late } else { accuracy };
    let stability = if early.is_finite() && late.is_finite() {
        clamp(1.0 - (early - late).abs(), 0.0, 1.0)
    } else {
        0.5
    };
    TrackRecord {
        n,
        k,
        accuracy,
        stability,
    }
}
