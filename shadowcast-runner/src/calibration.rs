//! Nowcast calibration from the chosen strategy's backtest.

use serde::{Deserialize, Serialize};

use shadowcast_core::stats::{beta_shrink, clamp, wilson_interval, Z_95};

use crate::backtest::BacktestResult;
use crate::config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub prior_a: f64,
    pub prior_b: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            prior_a: 2.0,
            prior_b: 2.0,
        }
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ok = |x: f64| x.is_finite() && x > 0.0;
        if !(ok(self.prior_a) && ok(self.prior_b)) {
            return Err(ConfigError::Invalid(
                "calibration prior must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub raw_certainty: f64,
    /// `raw × clamp(2·p_shrunk − 1, 0, 1)`; NaN when raw is NaN.
    pub calibrated_certainty: f64,
    pub p_shrunk: f64,
    pub wilson_low: Option<f64>,
    pub wilson_high: Option<f64>,
}

pub fn calibrate(raw_certainty: f64, backtest: &BacktestResult, config: &CalibrationConfig) -> Calibration {
    let (k, n) = (backtest.k as f64, backtest.n as f64);
    let p_shrunk = beta_shrink(k, n, config.prior_a, config.prior_b);
    let skill = clamp(2.0 * p_shrunk - 1.0, 0.0, 1.0);
    let interval = wilson_interval(k, n, Z_95);
    Calibration {
        raw_certainty,
        calibrated_certainty: raw_certainty * skill,
        p_shrunk,
        wilson_low: interval.map(|(lo, _)| lo),
        wilson_high: interval.map(|(_, hi)| hi),
    }
}
