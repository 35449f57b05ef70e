//! Stability-penalized super-ensemble.

use serde::{Deserialize, Serialize};

use shadowcast_core::domain::{Forecast, Outcome, Year};
use shadowcast_core::stats::logit;

use super::matrix::CandidateMatrix;
use super::track_record::track_record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    pub top_k: usize,
    /// Exponent on stability in the column weight.
    pub power: f64,
    pub window_years: Option<u32>,
    pub decay_half_life: Option<f64>,
    pub min_config_years: f64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            power: 2.0,
            window_years: Some(24),
            decay_half_life: None,
            min_config_years: 6.0,
        }
    }
}

/// Vote of the top-K columns ranked by (shrunk accuracy, stability), each
/// weighted `logit(p) · stability^power`. Erratic columns are discounted even
/// when their overall record is good.
pub fn stability_super(matrix: &CandidateMatrix, year: Year, config: &StabilityConfig) -> Forecast {
    let train = matrix.train_years(year, config.window_years);
    let mut ranked: Vec<(usize, f64, f64)> = (0..matrix.width())
        .filter_map(|c| {
            let r = track_record(matrix, c, &train, year, config.decay_half_life);
            (r.n >= config.min_config_years && r.n > 0.0).then(|| (c, r.shrunk(), r.stability))
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal))
            .then(a.0.cmp(&b.0))
    });

    let (mut score, mut total_abs, mut used) = (0.0, 0.0, 0usize);
    for &(c, p, stability) in ranked.iter().take(config.top_k) {
        let cell = matrix.cell(year, c);
        if cell.is_abstain() {
            continue;
        }
        let w = logit(p) * stability.powf(config.power);
        score += w * cell.signal();
        total_abs += w.abs();
        used += 1;
    }
    if total_abs <= 0.0 {
        return Forecast::abstain();
    }
    Forecast::new(Outcome::from_score(score), (score.abs() / total_abs).min(1.0), used)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::BacktestGate;
    use crate::fusion::matrix::MatrixSource;
    use shadowcast_core::domain::{Dataset, OutcomeTable, Prediction, PredictionPanel, TargetId};

    fn actual(y: Year) -> Outcome {
        if y % 2 == 0 {
            Outcome::LongWinter
        } else {
            Outcome::EarlySpring
        }
    }

    /// Column 0: perfect through 2009, poor after and wrong in 2020 (14/20).
    /// Column 1: right 7 years in every 10 (14/20). Column 2: always wrong.
    fn matrix() -> CandidateMatrix {
        let t = TargetId::from("T");
        let mut preds = Vec::new();
        let mut outcomes = OutcomeTable::new();
        for y in 2000..=2020 {
            if y < 2020 {
                outcomes.insert(t.clone(), y, actual(y));
            }
            preds.push(Prediction::new(y, "f", false));
        }
        let data = Dataset::new(PredictionPanel::from_predictions(preds), outcomes);
        CandidateMatrix::from_columns(
            &data,
            &t,
            BacktestGate { min_forecasters: 1 },
            MatrixSource::Base,
            vec!["erratic".into(), "steady".into(), "wrong".into()],
            false,
            |c, years| {
                years
                    .iter()
                    .map(|&y| {
                        let right = match c {
                            0 => y < 2010 || (2016..2020).contains(&y),
                            1 => y % 10 < 7,
                            _ => false,
                        };
                        let call = if right { actual(y) } else { actual(y).flipped() };
                        Forecast::new(call, 0.7, 1)
                    })
                    .collect()
            },
        )
    }

    #[test]
    fn top_one_picks_best_shrunk_accuracy() {
        let m = matrix();
        let cfg = StabilityConfig {
            top_k: 1,
            window_years: None,
            ..Default::default()
        };
        let f = stability_super(&m, 2020, &cfg);
        // Both columns are 14/20; stability decides.
        assert_eq!(f.used, 1);
        assert_eq!(f.pred, Some(actual(2020)));
    }

    #[test]
    fn power_discounts_unstable_columns() {
        let m = matrix();
        let years = m.train_years(2020, None);
        let erratic = track_record(&m, 0, &years, 2020, None);
        let steady = track_record(&m, 1, &years, 2020, None);
        assert!(erratic.stability < steady.stability);
    }

    #[test]
    fn abstains_without_history() {
        let m = matrix();
        assert!(stability_super(&m, 2002, &StabilityConfig::default()).is_abstain());
    }
}
