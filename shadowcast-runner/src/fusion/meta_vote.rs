//! Meta-weighted vote and meta-best over a candidate matrix.

use serde::{Deserialize, Serialize};

use shadowcast_core::domain::{Forecast, Outcome, Year};
use shadowcast_core::stats::logit;

use super::matrix::CandidateMatrix;
use super::track_record::{track_record, TrackRecord};

/// How column track records are scored for the meta layer. Missing fields
/// default to all history, undecayed, six years minimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaConfig {
    /// Only training years within this many years of the target year.
    pub window_years: Option<u32>,
    /// Exponential age decay of training years.
    pub decay_half_life: Option<f64>,
    /// Minimum (possibly decayed) scored years for a column to be eligible.
    pub min_config_years: f64,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            window_years: None,
            decay_half_life: None,
            min_config_years: 6.0,
        }
    }
}

impl MetaConfig {
    pub fn windowed(years: u32) -> Self {
        Self {
            window_years: Some(years),
            decay_half_life: None,
            min_config_years: 6.0,
        }
    }

    pub fn decayed(half_life: f64) -> Self {
        Self {
            window_years: None,
            decay_half_life: Some(half_life),
            min_config_years: 6.0,
        }
    }

    /// Short parameter string for labels.
    pub fn describe(&self) -> String {
        match (self.window_years, self.decay_half_life) {
            (Some(w), Some(h)) => format!("window={w},decay={h}"),
            (Some(w), None) => format!("window={w}"),
            (None, Some(h)) => format!("decay={h}"),
            (None, None) => "all".to_string(),
        }
    }

    fn records(&self, matrix: &CandidateMatrix, year: Year) -> Vec<TrackRecord> {
        let train = matrix.train_years(year, self.window_years);
        (0..matrix.width())
            .map(|c| track_record(matrix, c, &train, year, self.decay_half_life))
            .collect()
    }
}

/// Vote of every column weighted by the log-odds of its shrunk accuracy.
///
/// Columns with too little history carry no weight; a column whose shrunk
/// accuracy is below 0.5 gets a negative weight and is inverted. Abstains
/// when the total |weight| of the columns voting this year is zero.
pub fn meta_vote(matrix: &CandidateMatrix, year: Year, config: &MetaConfig) -> Forecast {
    let records = config.records(matrix, year);
    let (mut score, mut total_abs, mut used) = (0.0, 0.0, 0usize);
    for (column, record) in records.iter().enumerate() {
        if record.n < config.min_config_years {
            continue;
        }
        let cell = matrix.cell(year, column);
        if cell.is_abstain() {
            continue;
        }
        let w = logit(record.shrunk());
        if w == 0.0 {
            continue;
        }
        score += w * cell.signal();
        total_abs += w.abs();
        used += 1;
    }
    if total_abs <= 0.0 {
        return Forecast::abstain();
    }
    Forecast::new(Outcome::from_score(score), (score.abs() / total_abs).min(1.0), used)
}

/// The eligible column with the best shrunk accuracy, verbatim.
///
/// Eligible: at least `min_config_years` of history and a call this year.
/// Ties go to more history, then to the lower column index.
pub fn meta_best(matrix: &CandidateMatrix, year: Year, config: &MetaConfig) -> Forecast {
    best_column(matrix, year, config)
        .map(|c| matrix.cell(year, c))
        .unwrap_or_else(Forecast::abstain)
}

pub fn best_column(matrix: &CandidateMatrix, year: Year, config: &MetaConfig) -> Option<usize> {
    let records = config.records(matrix, year);
    let mut best: Option<(usize, f64, f64)> = None;
    for (column, record) in records.iter().enumerate() {
        if record.n < config.min_config_years || record.n <= 0.0 {
            continue;
        }
        if matrix.cell(year, column).is_abstain() {
            continue;
        }
        let p = record.shrunk();
        let better = match best {
            None => true,
            Some((_, bp, bn)) => p > bp || (p == bp && record.n > bn),
        };
        if better {
            best = Some((column, p, record.n));
        }
    }
    best.map(|(c, _, _)| c)
}
