//! Engine — one full evaluation run over a dataset.
//!
//! Per target: search the candidate space, build the base and fusion
//! matrices, backtest every strategy through the shared replay, and keep a
//! bounded leaderboard. The overall pick is the best leaderboard head across
//! targets under the single selection rule; it then produces the nowcast for
//! the latest panel year, its calibration and its data adequacy epoch.

use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use shadowcast_core::data::{load_dataset, DataError};
use shadowcast_core::domain::{Dataset, Outcome, TargetId, Year};
use shadowcast_core::weighting::WeightingSpec;

use crate::backtest::{scored_years, BacktestResult, BacktestRow};
use crate::calibration::{calibrate, Calibration};
use crate::candidates::{search_candidates, CandidateSearch};
use crate::config::{ConfigError, EngineConfig};
use crate::dae::dae_year;
use crate::fusion::{dynamic_super, CandidateMatrix, GateTier, MatrixSource};
use crate::leaderboard::{best_overall, LeaderboardEntry, TargetLeaderboard};
use crate::strategy::{Matrices, Strategy};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Data(#[from] DataError),
}

// ─── Reports ─────────────────────────────────────────────────────────

/// Descriptor of one leaderboard entry.
#[derive(Debug, Clone, Serialize)]
pub struct StrategySummary {
    pub label: String,
    pub kind: &'static str,
    pub target: TargetId,
    pub backtest: BacktestResult,
}

impl From<&LeaderboardEntry> for StrategySummary {
    fn from(e: &LeaderboardEntry) -> Self {
        Self {
            label: e.label.clone(),
            kind: e.kind(),
            target: e.target.clone(),
            backtest: e.backtest,
        }
    }
}

/// The chosen strategy's call for the most recent panel year.
#[derive(Debug, Clone, Serialize)]
pub struct Nowcast {
    pub year: Year,
    pub pred: Option<Outcome>,
    pub certainty: f64,
    pub used: usize,
    pub total_preds: usize,
    /// Fallback tier, for confidence-gated strategies only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<GateTier>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetSummary {
    pub target: TargetId,
    pub scored_years: usize,
    /// Strategies backtested for this target, base candidates included.
    pub evaluated: usize,
    pub leaderboard: Vec<StrategySummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub chosen: StrategySummary,
    pub strategy: Strategy,
    pub nowcast: Option<Nowcast>,
    pub calibration: Option<Calibration>,
    pub dae_year: Option<Year>,
    pub trace: Vec<BacktestRow>,
    pub targets: Vec<TargetSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verdict {
    Chosen(Box<ForecastReport>),
    /// No strategy scored a single year on any target.
    NothingUsable { evaluated: usize },
}

impl Verdict {
    pub fn report(&self) -> Option<&ForecastReport> {
        match self {
            Self::Chosen(report) => Some(report),
            Self::NothingUsable { .. } => None,
        }
    }
}

/// Everything computed for one target.
#[derive(Debug, Clone)]
pub struct TargetEvaluation {
    pub target: TargetId,
    pub scored_years: usize,
    pub search: CandidateSearch,
    pub matrices: Matrices,
    pub leaderboard: TargetLeaderboard,
    pub evaluated: usize,
}

impl TargetEvaluation {
    fn summary(&self) -> TargetSummary {
        TargetSummary {
            target: self.target.clone(),
            scored_years: self.scored_years,
            evaluated: self.evaluated,
            leaderboard: self.leaderboard.entries().iter().map(StrategySummary::from).collect(),
        }
    }
}

// ─── Engine ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    weightings: Vec<WeightingSpec>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let weightings = config.space.weighting_specs()?;
        Ok(Self { config, weightings })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Load both input files and run.
    pub fn run_files(&self, predictions: &Path, outcomes: &Path) -> Result<Verdict, EngineError> {
        let data = load_dataset(predictions, outcomes)?;
        Ok(self.run(&data))
    }

    pub fn run(&self, data: &Dataset) -> Verdict {
        let evaluations: Vec<TargetEvaluation> = self
            .config
            .targets
            .iter()
            .filter_map(|t| self.evaluate_target(data, t))
            .collect();
        let evaluated = evaluations.iter().map(|e| e.evaluated).sum();

        let Some(best) = best_overall(evaluations.iter().map(|e| &e.leaderboard)) else {
            warn!(evaluated, "no strategy scored a single year");
            return Verdict::NothingUsable { evaluated };
        };
        let Some(eval) = evaluations.iter().find(|e| e.target == best.target) else {
            return Verdict::NothingUsable { evaluated };
        };

        let trace = best.strategy.backtest(&eval.matrices);
        let nowcast = data.panel.last_year().map(|year| {
            let forecast = best.strategy.forecast(&eval.matrices, year);
            let tier = match &best.strategy {
                Strategy::DynamicSuper { source, profile } => {
                    Some(dynamic_super(eval.matrices.get(*source), year, profile).tier)
                }
                _ => None,
            };
            Nowcast {
                year,
                pred: forecast.pred,
                certainty: forecast.certainty,
                used: forecast.used,
                total_preds: data.panel.count(year),
                tier,
            }
        });
        let calibration = nowcast
            .as_ref()
            .filter(|n| n.pred.is_some())
            .map(|n| calibrate(n.certainty, &best.backtest, &self.config.calibration));
        let dae = dae_year(data, &best.target, &trace, &self.config.dae);

        info!(
            label = %best.label,
            accuracy = best.backtest.accuracy,
            n = best.backtest.n,
            dae_year = ?dae,
            "strategy selected"
        );

        Verdict::Chosen(Box::new(ForecastReport {
            chosen: StrategySummary::from(best),
            strategy: best.strategy.clone(),
            nowcast,
            calibration,
            dae_year: dae,
            trace: trace.rows,
            targets: evaluations.iter().map(TargetEvaluation::summary).collect(),
        }))
    }

    /// Run the full pipeline for one target. `None` when it has no scored
    /// years.
    pub fn evaluate_target(&self, data: &Dataset, target: &TargetId) -> Option<TargetEvaluation> {
        let cfg = &self.config;
        let scored = scored_years(data, target, cfg.gate).len();
        if scored == 0 {
            info!(target_id = %target, "target has no scored years, skipping");
            return None;
        }

        let search = search_candidates(data, target, cfg.gate, &cfg.space, &self.weightings, cfg.parallel);
        let candidates: Vec<_> = search.winners.iter().map(|w| w.candidate.clone()).collect();
        let matrices = Matrices {
            base: CandidateMatrix::for_candidates(data, target, cfg.gate, &candidates, cfg.parallel),
            fusion: CandidateMatrix::for_fusion(data, target, cfg.gate, &cfg.fusion_configs, cfg.parallel),
        };

        let strategies = self.strategies(&matrices);
        let backtest = |s: &Strategy| {
            let trace = s.backtest(&matrices);
            debug!(
                target_id = %target,
                strategy = %s.name(),
                accuracy = trace.result.accuracy,
                n = trace.result.n,
                "strategy backtested"
            );
            trace.result
        };
        let results: Vec<BacktestResult> = if cfg.parallel {
            strategies.par_iter().map(backtest).collect()
        } else {
            strategies.iter().map(backtest).collect()
        };

        let mut leaderboard = TargetLeaderboard::new(target.clone(), cfg.leaderboard_size);
        for (strategy, result) in strategies.iter().zip(results) {
            leaderboard.insert(LeaderboardEntry::new(target.clone(), strategy.clone(), result));
        }

        // Base candidates count once for the search and once as columns.
        let evaluated = search.evaluated + strategies.len() - matrices.base.width();
        info!(
            target_id = %target,
            scored,
            evaluated,
            best = leaderboard.best().map(|e| e.label.as_str()).unwrap_or("-"),
            "target evaluated"
        );

        Some(TargetEvaluation {
            target: target.clone(),
            scored_years: scored,
            search,
            matrices,
            leaderboard,
            evaluated,
        })
    }

    /// Every strategy competing for one target, in a fixed order.
    pub fn strategies(&self, matrices: &Matrices) -> Vec<Strategy> {
        let meta = &self.config.meta;
        let mut out = Vec::new();
        for source in [MatrixSource::Base, MatrixSource::Fusion] {
            let m = matrices.get(source);
            out.extend(m.names().iter().enumerate().map(|(column, name)| Strategy::Column {
                source,
                column,
                name: name.clone(),
            }));
            if m.width() == 0 {
                continue;
            }
            out.extend(meta.vote.iter().map(|c| Strategy::MetaVote {
                source,
                config: c.clone(),
            }));
            out.extend(meta.best.iter().map(|c| Strategy::MetaBest {
                source,
                config: c.clone(),
            }));
            out.extend(meta.stacked.iter().map(|c| Strategy::Stacked {
                source,
                config: c.clone(),
            }));
            out.extend(meta.stability.iter().map(|c| Strategy::StabilitySuper {
                source,
                config: c.clone(),
            }));
            for profile in &self.config.profiles {
                out.push(Strategy::DynamicSuper {
                    source,
                    profile: profile.clone(),
                });
                out.push(Strategy::Hedge {
                    source,
                    profile: profile.clone(),
                    weights: meta.hedge,
                });
            }
        }
        out
    }
}
