//! Candidate space — search the weighting catalog for every mode slot.
//!
//! Each mode slot (`auto_weighted`, the top-N grid, `best_single`, the
//! champion windows) is evaluated with every weighting variant and the best
//! one is kept. `flip_majority` and `majority_all` don't depend on the
//! weighting and are added once.
//!
//! The search fans out one rayon task per weighting variant. Each task owns
//! its own [`Evaluator`] (and therefore its own weight cache) and walks every
//! mode slot, so training for one (weighting, cutoff) pair happens once per
//! task. Results are collected in catalog order and the per-slot pick walks
//! them in that order, which makes the parallel search identical to the
//! sequential one.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use shadowcast_core::candidate::{Candidate, CandidateSpec};
use shadowcast_core::domain::{Dataset, TargetId};
use shadowcast_core::predict::PredictionMode;
use shadowcast_core::weighting::WeightingSpec;

use crate::backtest::{BacktestGate, BacktestTrace, Evaluator};
use crate::config::ConfigError;

// ─── Configuration ───────────────────────────────────────────────────

/// Grid of mode parameters and the weighting variants to search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceConfig {
    pub top_n: Vec<usize>,
    pub champion_windows: Vec<u32>,
    pub flip_min_obs: usize,
    /// Restrict the search to these catalog names. `None` searches all 25.
    pub weightings: Option<Vec<String>>,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            top_n: vec![3, 5, 7, 10],
            champion_windows: vec![10, 20, 30],
            flip_min_obs: 8,
            weightings: None,
        }
    }
}

impl SpaceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_n.iter().any(|&n| n == 0) {
            return Err(ConfigError::Invalid("space.top_n entries must be positive".into()));
        }
        if self.champion_windows.iter().any(|&w| w == 0) {
            return Err(ConfigError::Invalid(
                "space.champion_windows entries must be positive".into(),
            ));
        }
        self.weighting_specs().map(|_| ())
    }

    /// Weighting-dependent mode slots in declaration order.
    pub fn mode_slots(&self) -> Vec<PredictionMode> {
        let mut slots = vec![PredictionMode::AutoWeighted];
        slots.extend(self.top_n.iter().map(|&top_n| PredictionMode::TopnWeighted { top_n }));
        slots.extend(self.top_n.iter().map(|&top_n| PredictionMode::TopnMajority { top_n }));
        slots.push(PredictionMode::BestSingle);
        slots.extend(
            self.champion_windows
                .iter()
                .map(|&window_years| PredictionMode::ChampionWindow { window_years }),
        );
        slots
    }

    /// The catalog, filtered to the configured names (catalog order kept).
    pub fn weighting_specs(&self) -> Result<Vec<WeightingSpec>, ConfigError> {
        let catalog = WeightingSpec::catalog();
        let Some(names) = &self.weightings else {
            return Ok(catalog);
        };
        if let Some(unknown) = names.iter().find(|n| !catalog.iter().any(|s| &s.name == *n)) {
            return Err(ConfigError::Invalid(format!("unknown weighting '{unknown}'")));
        }
        if names.is_empty() {
            return Err(ConfigError::Invalid("space.weightings must not be empty".into()));
        }
        Ok(catalog
            .into_iter()
            .filter(|s| names.contains(&s.name))
            .collect())
    }
}

// ─── Search ──────────────────────────────────────────────────────────

/// A slot's chosen candidate and its backtest.
#[derive(Debug, Clone)]
pub struct SlotWinner {
    pub candidate: Candidate,
    pub trace: BacktestTrace,
}

#[derive(Debug, Clone)]
pub struct CandidateSearch {
    /// One per mode slot, then `flip_majority`, then `majority_all`.
    pub winners: Vec<SlotWinner>,
    /// Candidates backtested in total.
    pub evaluated: usize,
}

/// Evaluate every slot × weighting for `target` and keep each slot's best.
pub fn search_candidates(
    data: &Dataset,
    target: &TargetId,
    gate: BacktestGate,
    space: &SpaceConfig,
    weightings: &[WeightingSpec],
    parallel: bool,
) -> CandidateSearch {
    let slots = space.mode_slots();

    let run_weighting = |weighting: &WeightingSpec| -> Vec<SlotWinner> {
        let mut eval = Evaluator::new(data, gate);
        let results: Vec<SlotWinner> = slots
            .iter()
            .map(|&mode| {
                let candidate = Candidate::new(CandidateSpec {
                    target: target.clone(),
                    mode,
                    weighting: weighting.clone(),
                });
                let trace = eval.backtest(&candidate);
                SlotWinner { candidate, trace }
            })
            .collect();
        let (forecasts, weight_sets) = eval.cache_sizes();
        debug!(
            weighting = %weighting.name,
            forecasts,
            weight_sets,
            "weighting variant searched"
        );
        results
    };

    let per_weighting: Vec<Vec<SlotWinner>> = if parallel {
        weightings.par_iter().map(run_weighting).collect()
    } else {
        weightings.iter().map(run_weighting).collect()
    };

    let mut winners: Vec<SlotWinner> = Vec::with_capacity(slots.len() + 2);
    for slot in 0..slots.len() {
        let mut best: Option<&SlotWinner> = None;
        for row in &per_weighting {
            let entry = &row[slot];
            match best {
                None => best = Some(entry),
                Some(current) if entry.trace.result.beats(&current.trace.result) => {
                    best = Some(entry)
                }
                Some(_) => {}
            }
        }
        if let Some(best) = best {
            winners.push(best.clone());
        }
    }

    let mut eval = Evaluator::new(data, gate);
    for mode in [
        PredictionMode::FlipMajority {
            min_obs: space.flip_min_obs,
        },
        PredictionMode::MajorityAll,
    ] {
        let candidate = Candidate::new(CandidateSpec {
            target: target.clone(),
            mode,
            weighting: WeightingSpec::bayes(),
        });
        let trace = eval.backtest(&candidate);
        winners.push(SlotWinner { candidate, trace });
    }

    let evaluated = slots.len() * weightings.len() + 2;
    info!(
        target_id = %target,
        evaluated,
        slots = winners.len(),
        "candidate search complete"
    );
    CandidateSearch { winners, evaluated }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadowcast_core::data::{synthetic_dataset, SyntheticConfig};
    use shadowcast_core::domain::TARGET_FEBMAR;

    fn small() -> Dataset {
        synthetic_dataset(&SyntheticConfig {
            first_year: 1990,
            last_year: 2020,
            forecasters: 30,
            ..Default::default()
        })
    }

    #[test]
    fn default_grid_has_thirteen_slots() {
        let slots = SpaceConfig::default().mode_slots();
        assert_eq!(slots.len(), 13);
        assert_eq!(slots[0], PredictionMode::AutoWeighted);
        assert_eq!(slots[12], PredictionMode::ChampionWindow { window_years: 30 });
    }

    #[test]
    fn weighting_filter_keeps_catalog_order() {
        let space = SpaceConfig {
            weightings: Some(vec!["logit".into(), "bayes".into()]),
            ..Default::default()
        };
        let names: Vec<String> = space
            .weighting_specs()
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["bayes", "logit"]);

        let bad = SpaceConfig {
            weightings: Some(vec!["nope".into()]),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn winners_cover_every_slot_plus_fixed_modes() {
        let data = small();
        let space = SpaceConfig {
            weightings: Some(vec!["bayes".into(), "logit".into(), "window10".into()]),
            ..Default::default()
        };
        let weightings = space.weighting_specs().unwrap();
        let target = TargetId::new(TARGET_FEBMAR);
        let search = search_candidates(
            &data,
            &target,
            BacktestGate::default(),
            &space,
            &weightings,
            false,
        );
        assert_eq!(search.winners.len(), 15);
        assert_eq!(search.evaluated, 13 * 3 + 2);
        assert_eq!(
            search.winners[14].candidate.mode(),
            &PredictionMode::MajorityAll
        );
        // No other weighting strictly beats the chosen one for its slot.
        for winner in &search.winners[..13] {
            let mut eval = Evaluator::new(&data, BacktestGate::default());
            for w in &weightings {
                let rival = Candidate::new(CandidateSpec {
                    target: target.clone(),
                    mode: *winner.candidate.mode(),
                    weighting: w.clone(),
                });
                let r = eval.backtest(&rival).result;
                assert!(!r.beats(&winner.trace.result), "{} beats {}", rival.label, winner.candidate.label);
            }
        }
    }
}
