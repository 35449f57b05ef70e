//! Strategy descriptors — everything that can compete on a leaderboard.
//!
//! A [`Strategy`] is a serializable description plus a `forecast` dispatch
//! over the target's two candidate matrices. Base candidates and fusion
//! configs enter as matrix columns; everything else is a meta strategy over
//! one of the matrices.

use serde::{Deserialize, Serialize};

use shadowcast_core::domain::{Forecast, TargetId, Year};

use crate::backtest::{replay_years, BacktestTrace};
use crate::fusion::{
    dynamic_super, hedge, meta_best, meta_vote, stability_super, stacked_forecast,
    CandidateMatrix, HedgeWeights, MatrixSource, MetaConfig, StabilityConfig, StackConfig,
    TuningProfile,
};

/// The base and fusion matrices of one target.
#[derive(Debug, Clone)]
pub struct Matrices {
    pub base: CandidateMatrix,
    pub fusion: CandidateMatrix,
}

impl Matrices {
    pub fn get(&self, source: MatrixSource) -> &CandidateMatrix {
        match source {
            MatrixSource::Base => &self.base,
            MatrixSource::Fusion => &self.fusion,
        }
    }

    pub fn target(&self) -> &TargetId {
        self.base.target()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    /// One matrix column, verbatim.
    Column {
        source: MatrixSource,
        column: usize,
        name: String,
    },
    MetaVote {
        source: MatrixSource,
        config: MetaConfig,
    },
    MetaBest {
        source: MatrixSource,
        config: MetaConfig,
    },
    Stacked {
        source: MatrixSource,
        config: StackConfig,
    },
    StabilitySuper {
        source: MatrixSource,
        config: StabilityConfig,
    },
    DynamicSuper {
        source: MatrixSource,
        profile: TuningProfile,
    },
    Hedge {
        source: MatrixSource,
        profile: TuningProfile,
        weights: HedgeWeights,
    },
}

impl Strategy {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Column {
                source: MatrixSource::Base,
                ..
            } => "candidate",
            Self::Column {
                source: MatrixSource::Fusion,
                ..
            } => "fusion",
            Self::MetaVote { .. } => "meta_vote",
            Self::MetaBest { .. } => "meta_best",
            Self::Stacked { .. } => "stacked",
            Self::StabilitySuper { .. } => "stability_super",
            Self::DynamicSuper { .. } => "dynamic_super",
            Self::Hedge { .. } => "hedge",
        }
    }

    pub fn source(&self) -> MatrixSource {
        match self {
            Self::Column { source, .. }
            | Self::MetaVote { source, .. }
            | Self::MetaBest { source, .. }
            | Self::Stacked { source, .. }
            | Self::StabilitySuper { source, .. }
            | Self::DynamicSuper { source, .. }
            | Self::Hedge { source, .. } => *source,
        }
    }

    /// Display name without the target.
    pub fn name(&self) -> String {
        let src = self.source().as_str();
        match self {
            Self::Column { name, .. } => name.clone(),
            Self::MetaVote { config, .. } => format!("meta_vote({})[{src}]", config.describe()),
            Self::MetaBest { config, .. } => format!("meta_best({})[{src}]", config.describe()),
            Self::Stacked { config, .. } => {
                let variant = if config.advanced { "advanced" } else { "basic" };
                format!("stacked({variant})[{src}]")
            }
            Self::StabilitySuper { config, .. } => {
                format!("stability_super(k={},p={})[{src}]", config.top_k, config.power)
            }
            Self::DynamicSuper { profile, .. } => format!("dynamic_super({})[{src}]", profile.id),
            Self::Hedge { profile, .. } => format!("hedge({})[{src}]", profile.id),
        }
    }

    pub fn label(&self, target: &TargetId) -> String {
        format!("{}@{}", self.name(), target)
    }

    /// This strategy's call for `year`.
    pub fn forecast(&self, matrices: &Matrices, year: Year) -> Forecast {
        let m = matrices.get(self.source());
        match self {
            Self::Column { column, .. } => m.cell(year, *column),
            Self::MetaVote { config, .. } => meta_vote(m, year, config),
            Self::MetaBest { config, .. } => meta_best(m, year, config),
            Self::Stacked { config, .. } => {
                let all: Vec<usize> = (0..m.width()).collect();
                stacked_forecast(m, year, &all, config)
            }
            Self::StabilitySuper { config, .. } => stability_super(m, year, config),
            Self::DynamicSuper { profile, .. } => dynamic_super(m, year, profile).forecast,
            Self::Hedge {
                profile, weights, ..
            } => hedge(m, year, profile, *weights),
        }
    }

    /// Replay over the matrix's scored years.
    pub fn backtest(&self, matrices: &Matrices) -> BacktestTrace {
        let m = matrices.get(self.source());
        replay_years(m.scored_years(), |y| m.actual(y), |y| self.forecast(matrices, y))
    }
}
