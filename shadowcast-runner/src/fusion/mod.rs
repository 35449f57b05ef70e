//! Meta-fusion engine — strategies that combine other strategies.
//!
//! Everything here reads a [`CandidateMatrix`]: one column per base strategy,
//! one row per panel year. A meta strategy predicting year *t* scores columns
//! only on scored years strictly before *t* and reads the columns' calls for
//! *t* as its inputs.

pub mod gated;
pub mod matrix;
pub mod meta_vote;
pub mod profiles;
pub mod stability;
pub mod stacking;
pub mod track_record;

pub use gated::{dynamic_super, hedge, select_top_columns, weighted_blend, GateTier, GatedForecast};
pub use matrix::{CandidateMatrix, MatrixSource};
pub use meta_vote::{meta_best, meta_vote, MetaConfig};
pub use profiles::{BlendConfig, HedgeWeights, TuningProfile};
pub use stability::{stability_super, StabilityConfig};
pub use stacking::{feature_vector, stacked_forecast, train_logistic, LogisticModel, StackConfig};
pub use track_record::{track_record, TrackRecord};
