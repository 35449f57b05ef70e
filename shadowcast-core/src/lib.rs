//! Shadowcast Core — domain types, weight training, per-year prediction.
//!
//! This crate contains everything needed to produce one candidate's forecast
//! for one year without looking ahead:
//! - Domain types (predictions, outcomes, forecasts, ids)
//! - Statistical primitives (shrinkage, Wilson interval, decay, log-odds)
//! - Weight trainer with the named weighting catalog and fusion configs
//! - Candidate prediction modes with weight memoization
//! - Candidate fingerprints
//! - Local file ingestion and synthetic panels

pub mod candidate;
pub mod data;
pub mod domain;
pub mod predict;
pub mod stats;
pub mod weighting;

pub use candidate::{Candidate, CandidateSpec, Fingerprint};
pub use domain::{
    Dataset, Forecast, ForecasterId, Outcome, OutcomeTable, Prediction, PredictionPanel,
    TargetId, Year,
};
pub use predict::{predict_for_year, PredictionMode, WeightCache};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything the runner shares across rayon tasks is
    /// Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<Dataset>();
        require_sync::<Dataset>();
        require_send::<Forecast>();
        require_sync::<Forecast>();
        require_send::<PredictionPanel>();
        require_sync::<PredictionPanel>();
        require_send::<OutcomeTable>();
        require_sync::<OutcomeTable>();

        // Candidates and weighting
        require_send::<Candidate>();
        require_sync::<Candidate>();
        require_send::<weighting::WeightingSpec>();
        require_sync::<weighting::WeightingSpec>();
        require_send::<weighting::FusionConfig>();
        require_sync::<weighting::FusionConfig>();
        require_send::<weighting::TrainedWeights>();
        require_sync::<weighting::TrainedWeights>();

        // Caches move into worker tasks
        require_send::<WeightCache>();
    }

    /// Architecture contract: training takes an explicit exclusive cutoff.
    ///
    /// `train_weights` has no way to see the year being predicted other than
    /// as its cutoff, and `Dataset::history_before` is the only history view it
    /// uses. If the signature changes to take a year range, this breaks.
    #[test]
    fn trainer_signature_takes_exclusive_cutoff() {
        fn _check(
            data: &Dataset,
            target: &TargetId,
            cutoff: Year,
            spec: &weighting::WeightingSpec,
        ) -> weighting::TrainedWeights {
            weighting::train_weights(data, target, cutoff, spec)
        }
    }
}
