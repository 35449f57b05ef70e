//! Candidate matrix — per-year forecasts of a fixed set of base strategies.
//!
//! Rows are every panel year (so the nowcast year has cells too), columns are
//! base strategies. Every cell is computed by a no-lookahead predictor, so
//! meta strategies may read any cell of a year strictly before the one they
//! predict, plus the current year's cells as inputs.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use shadowcast_core::candidate::Candidate;
use shadowcast_core::domain::{Dataset, Forecast, Outcome, TargetId, Year};
use shadowcast_core::predict::{majority_of, predict_for_year, WeightCache};
use shadowcast_core::weighting::{fusion_forecast, FusionConfig};

use crate::backtest::{scored_years, BacktestGate};

/// Which set of base strategies a matrix holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixSource {
    /// Winners of the candidate-space search.
    Base,
    /// One column per [`FusionConfig`].
    Fusion,
}

impl MatrixSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Fusion => "fusion",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CandidateMatrix {
    source: MatrixSource,
    target: TargetId,
    names: Vec<String>,
    years: Vec<Year>,
    /// `cells[year_index][column]`
    cells: Vec<Vec<Forecast>>,
    majority: Vec<Forecast>,
    scored: Vec<Year>,
    actuals: Vec<Option<Outcome>>,
}

impl CandidateMatrix {
    /// Build from a per-column generator. `column(c, years)` returns one
    /// forecast per year in `years`.
    pub fn from_columns<F>(
        data: &Dataset,
        target: &TargetId,
        gate: BacktestGate,
        source: MatrixSource,
        names: Vec<String>,
        parallel: bool,
        column: F,
    ) -> Self
    where
        F: Fn(usize, &[Year]) -> Vec<Forecast> + Sync,
    {
        let years: Vec<Year> = data.panel.years().collect();
        let columns: Vec<Vec<Forecast>> = if parallel {
            (0..names.len())
                .into_par_iter()
                .map(|c| column(c, &years))
                .collect()
        } else {
            (0..names.len()).map(|c| column(c, &years)).collect()
        };

        let cells = (0..years.len())
            .map(|row| {
                columns
                    .iter()
                    .map(|col| col.get(row).copied().unwrap_or_else(Forecast::abstain))
                    .collect()
            })
            .collect();
        let majority = years
            .iter()
            .map(|&y| majority_of(data.panel.year(y).iter().map(|p| p.outcome())))
            .collect();
        let actuals = years.iter().map(|&y| data.outcome(target, y)).collect();

        Self {
            source,
            target: target.clone(),
            names,
            scored: scored_years(data, target, gate),
            years,
            cells,
            majority,
            actuals,
        }
    }

    /// Columns are the given candidates, predicted with one weight cache each.
    pub fn for_candidates(
        data: &Dataset,
        target: &TargetId,
        gate: BacktestGate,
        candidates: &[Candidate],
        parallel: bool,
    ) -> Self {
        let names = candidates.iter().map(Candidate::name).collect();
        Self::from_columns(data, target, gate, MatrixSource::Base, names, parallel, |c, years| {
            let mut cache = WeightCache::new();
            years
                .iter()
                .map(|&y| predict_for_year(data, &candidates[c], y, &mut cache))
                .collect()
        })
    }

    /// Columns are the fusion-config predictors.
    pub fn for_fusion(
        data: &Dataset,
        target: &TargetId,
        gate: BacktestGate,
        configs: &[FusionConfig],
        parallel: bool,
    ) -> Self {
        let names = configs.iter().map(|c| format!("fusion({})", c.id)).collect();
        Self::from_columns(data, target, gate, MatrixSource::Fusion, names, parallel, |c, years| {
            years
                .iter()
                .map(|&y| fusion_forecast(data, target, y, &configs[c]))
                .collect()
        })
    }

    pub fn source(&self) -> MatrixSource {
        self.source
    }

    pub fn target(&self) -> &TargetId {
        &self.target
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn years(&self) -> &[Year] {
        &self.years
    }

    pub fn scored_years(&self) -> &[Year] {
        &self.scored
    }

    fn row_index(&self, year: Year) -> Option<usize> {
        self.years.binary_search(&year).ok()
    }

    /// All cells of `year`; empty when the panel has no such year.
    pub fn row(&self, year: Year) -> &[Forecast] {
        match self.row_index(year) {
            Some(i) => &self.cells[i],
            None => &[],
        }
    }

    pub fn cell(&self, year: Year, column: usize) -> Forecast {
        self.row(year)
            .get(column)
            .copied()
            .unwrap_or_else(Forecast::abstain)
    }

    /// Unweighted majority of the year's raw predictions.
    pub fn majority(&self, year: Year) -> Forecast {
        self.row_index(year)
            .map(|i| self.majority[i])
            .unwrap_or_else(Forecast::abstain)
    }

    pub fn actual(&self, year: Year) -> Option<Outcome> {
        self.row_index(year).and_then(|i| self.actuals[i])
    }

    /// Scored years strictly before `year`, optionally within `window` years.
    pub fn train_years(&self, year: Year, window: Option<u32>) -> Vec<Year> {
        let start = window.map(|w| year - w as Year);
        self.scored
            .iter()
            .copied()
            .filter(|&y| y < year && start.map_or(true, |s| y >= s))
            .collect()
    }
}
