//! Shadowcast Runner — backtests, candidate search, meta-fusion, selection.
//!
//! This crate builds on `shadowcast-core` to provide:
//! - The shared no-lookahead replay and a memoizing evaluator
//! - Candidate space search over the weighting catalog (rayon fan-out)
//! - Candidate matrices and every meta strategy over them
//! - Per-target leaderboards and the single selection rule
//! - Data adequacy epoch and nowcast calibration
//! - The top-level engine and its TOML configuration

pub mod backtest;
pub mod calibration;
pub mod candidates;
pub mod config;
pub mod dae;
pub mod engine;
pub mod fusion;
pub mod leaderboard;
pub mod strategy;

pub use backtest::{
    replay, replay_years, scored_years, BacktestGate, BacktestResult, BacktestRow, BacktestTrace,
    Evaluator,
};
pub use calibration::{calibrate, Calibration, CalibrationConfig};
pub use candidates::{search_candidates, CandidateSearch, SlotWinner, SpaceConfig};
pub use config::{ConfigError, EngineConfig, MetaStrategiesConfig};
pub use dae::{dae_year, enrich_trace, first_adequate_year, DaeConfig, DaeRow};
pub use engine::{
    Engine, EngineError, ForecastReport, Nowcast, StrategySummary, TargetEvaluation,
    TargetSummary, Verdict,
};
pub use fusion::{CandidateMatrix, GateTier, MatrixSource, TuningProfile};
pub use leaderboard::{best_overall, InsertResult, LeaderboardEntry, TargetLeaderboard};
pub use strategy::{Matrices, Strategy};
