//! Data Adequacy Epoch — the first year a strategy's record can be trusted.
//!
//! Walks one backtest trace and reports the first scored year where the
//! cumulative record is long enough, its Wilson interval is narrow enough,
//! and the panel had enough voters with enough history of their own.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use shadowcast_core::domain::{Dataset, ForecasterId, TargetId, Year};
use shadowcast_core::stats::wilson_half_width;

use crate::backtest::BacktestTrace;
use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaeConfig {
    /// Cumulative scored years required.
    pub min_backtest_years: usize,
    /// Maximum 95% Wilson half-width of the cumulative accuracy.
    pub max_ci_half_width: f64,
    /// Voters, and experienced voters, required in the year itself.
    pub min_groundhogs: usize,
    /// Prior scored observations that make a voter experienced.
    pub min_obs_per_groundhog: usize,
}

impl Default for DaeConfig {
    fn default() -> Self {
        Self {
            min_backtest_years: 10,
            max_ci_half_width: 0.15,
            min_groundhogs: 10,
            min_obs_per_groundhog: 5,
        }
    }
}

impl DaeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_ci_half_width.is_finite() && self.max_ci_half_width > 0.0) {
            return Err(ConfigError::Invalid(
                "dae.max_ci_half_width must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// A backtest row with the panel context the gate needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DaeRow {
    pub year: Year,
    pub cum_n: usize,
    pub cum_k: usize,
    pub voters: usize,
    pub experienced_voters: usize,
}

/// Attach voter counts to each trace row.
///
/// A voter is experienced when it made at least `min_obs_per_groundhog`
/// predictions in earlier years that have a known outcome for `target`.
pub fn enrich_trace(
    data: &Dataset,
    target: &TargetId,
    trace: &BacktestTrace,
    config: &DaeConfig,
) -> Vec<DaeRow> {
    let mut history: HashMap<&ForecasterId, usize> = HashMap::new();
    let mut rows = Vec::with_capacity(trace.rows.len());
    let mut next = trace.rows.iter().peekable();

    for year in data.panel.years() {
        let Some(row) = next.peek() else {
            break;
        };
        let preds = data.panel.year(year);
        if row.year == year {
            let experienced = preds
                .iter()
                .filter(|p| {
                    history.get(&p.forecaster).copied().unwrap_or(0) >= config.min_obs_per_groundhog
                })
                .count();
            rows.push(DaeRow {
                year,
                cum_n: row.cum_n,
                cum_k: row.cum_k,
                voters: preds.len(),
                experienced_voters: experienced,
            });
            next.next();
        }
        if data.outcomes.contains(target, year) {
            for p in preds {
                *history.entry(&p.forecaster).or_insert(0) += 1;
            }
        }
    }
    rows
}

/// First row passing every threshold.
pub fn first_adequate_year(rows: &[DaeRow], config: &DaeConfig) -> Option<Year> {
    rows.iter()
        .find(|r| {
            r.cum_n >= config.min_backtest_years
                && wilson_half_width(r.cum_k as f64, r.cum_n as f64)
                    .is_some_and(|hw| hw <= config.max_ci_half_width)
                && r.voters >= config.min_groundhogs
                && r.experienced_voters >= config.min_groundhogs
        })
        .map(|r| r.year)
}

pub fn dae_year(
    data: &Dataset,
    target: &TargetId,
    trace: &BacktestTrace,
    config: &DaeConfig,
) -> Option<Year> {
    first_adequate_year(&enrich_trace(data, target, trace, config), config)
}
