//! Domain types for Shadowcast

pub mod forecast;
pub mod ids;
pub mod outcome;
pub mod panel;

pub use forecast::Forecast;
pub use ids::{ForecasterId, TargetId, TARGET_FEBMAR, TARGET_MARCH};
pub use outcome::Outcome;
pub use panel::{Dataset, OutcomeTable, Prediction, PredictionPanel, Year};
