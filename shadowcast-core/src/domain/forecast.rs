//! Forecast — the result of one strategy for one year.

use serde::{Deserialize, Serialize};

use super::outcome::Outcome;

/// One year's call from one strategy.
///
/// `pred == None` is the abstention sentinel: the strategy had nothing to go
/// on (no predictions, no eligible history, too few training years). Callers
/// must treat it as "skip" or fall back explicitly; it is never an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub pred: Option<Outcome>,
    /// In [0, 1], or NaN when abstaining.
    pub certainty: f64,
    /// Number of votes (forecasters or base strategies) that contributed.
    pub used: usize,
}

impl Forecast {
    pub fn abstain() -> Self {
        Self {
            pred: None,
            certainty: f64::NAN,
            used: 0,
        }
    }

    pub fn new(pred: Outcome, certainty: f64, used: usize) -> Self {
        Self {
            pred: Some(pred),
            certainty,
            used,
        }
    }

    pub fn is_abstain(&self) -> bool {
        self.pred.is_none()
    }

    /// +1 / -1 / 0 (abstain).
    pub fn signal(&self) -> f64 {
        self.pred.map(Outcome::sign).unwrap_or(0.0)
    }

    /// Signed vote strength: `sign · (0.35 + 0.65 · certainty)`.
    ///
    /// A call with unknown certainty still carries the 0.35 floor.
    pub fn strength(&self) -> f64 {
        match self.pred {
            None => 0.0,
            Some(outcome) => {
                let c = if self.certainty.is_finite() {
                    self.certainty
                } else {
                    0.0
                };
                outcome.sign() * (0.35 + 0.65 * c)
            }
        }
    }

    /// True when this forecast matches `actual` (abstentions never match).
    pub fn is_correct(&self, actual: Outcome) -> bool {
        self.pred == Some(actual)
    }

    /// Field-wise equality that treats two NaN certainties as equal.
    pub fn same_as(&self, other: &Forecast) -> bool {
        let certainty_eq = (self.certainty.is_nan() && other.certainty.is_nan())
            || (self.certainty - other.certainty).abs() < 1e-12;
        self.pred == other.pred && self.used == other.used && certainty_eq
    }
}
