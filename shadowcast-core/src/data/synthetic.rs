//! Deterministic synthetic panels for demos, tests and benchmarks.
//!
//! A master seed is expanded into one sub-seed per forecaster via BLAKE3, so
//! each forecaster's history is independent of how many others are generated.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::{Dataset, Outcome, OutcomeTable, Prediction, PredictionPanel, TargetId, Year};
use crate::domain::{TARGET_FEBMAR, TARGET_MARCH};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub first_year: Year,
    /// Inclusive. The last year gets predictions but no outcome.
    pub last_year: Year,
    pub forecasters: usize,
    /// Hit rates are drawn uniformly from this range.
    pub skill_min: f64,
    pub skill_max: f64,
    /// Fraction of forecasters whose hit rate is mirrored below 0.5.
    pub contrarian_share: f64,
    /// Probability a forecaster skips a given year.
    pub dropout: f64,
    /// Probability the March-only outcome agrees with Feb–Mar.
    pub march_agreement: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            first_year: 1960,
            last_year: 2025,
            forecasters: 40,
            skill_min: 0.45,
            skill_max: 0.72,
            contrarian_share: 0.1,
            dropout: 0.1,
            march_agreement: 0.8,
        }
    }
}

fn sub_seed(master: u64, stream: &str, index: u64) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&master.to_le_bytes());
    hasher.update(stream.as_bytes());
    hasher.update(&index.to_le_bytes());
    let bytes = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&bytes.as_bytes()[..8]);
    u64::from_le_bytes(head)
}

/// Build a synthetic dataset for both default targets.
///
/// Forecasters debut at staggered years across the first half of the range,
/// so early years have fewer than the backtest gate's minimum voters.
pub fn synthetic_dataset(config: &SyntheticConfig) -> Dataset {
    let febmar = TargetId::new(TARGET_FEBMAR);
    let march = TargetId::new(TARGET_MARCH);
    let span = (config.last_year - config.first_year).max(0);

    let mut climate = StdRng::seed_from_u64(sub_seed(config.seed, "climate", 0));
    let mut outcomes = OutcomeTable::new();
    let mut truth: Vec<(Year, Outcome)> = Vec::new();
    for year in config.first_year..=config.last_year {
        let base = if climate.gen_bool(0.5) {
            Outcome::EarlySpring
        } else {
            Outcome::LongWinter
        };
        let mar = if climate.gen_bool(config.march_agreement.clamp(0.0, 1.0)) {
            base
        } else {
            base.flipped()
        };
        truth.push((year, base));
        if year < config.last_year {
            outcomes.insert(febmar.clone(), year, base);
            outcomes.insert(march.clone(), year, mar);
        }
    }

    let (lo, hi) = (
        config.skill_min.min(config.skill_max),
        config.skill_min.max(config.skill_max),
    );
    let mut predictions = Vec::new();
    for i in 0..config.forecasters {
        let mut rng = StdRng::seed_from_u64(sub_seed(config.seed, "forecaster", i as u64));
        let mut skill = if hi > lo { rng.gen_range(lo..=hi) } else { lo };
        if rng.gen_bool(config.contrarian_share.clamp(0.0, 1.0)) {
            skill = 1.0 - skill;
        }
        let skill = skill.clamp(0.0, 1.0);
        let debut = config.first_year + rng.gen_range(0..=span / 2);
        let id = format!("gh-{i:03}");

        for &(year, actual) in truth.iter().filter(|(y, _)| *y >= debut) {
            if rng.gen_bool(config.dropout.clamp(0.0, 1.0)) {
                continue;
            }
            let call = if rng.gen_bool(skill) {
                actual
            } else {
                actual.flipped()
            };
            predictions.push(Prediction::new(year, id.clone(), call == Outcome::LongWinter));
        }
    }

    Dataset::new(PredictionPanel::from_predictions(predictions), outcomes)
}
