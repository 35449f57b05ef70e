//! Candidate fingerprinting — deterministic identity for prediction strategies.
//!
//! - `CandidateSpec`: target + mode + weighting spec.
//! - `Fingerprint`: BLAKE3 over the canonical JSON of a serializable value.
//! - `Candidate`: a spec with its display label and the two hashes the caches
//!   key on (the whole candidate, and the weighting it actually trains with).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::TargetId;
use crate::predict::PredictionMode;
use crate::weighting::WeightingSpec;

/// Structural hash of a serializable configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    /// Hash of `value`'s JSON encoding.
    ///
    /// Struct fields serialize in declaration order, so equal values always
    /// hash equal.
    pub fn of<T: Serialize>(value: &T) -> Self {
        let json = serde_json::to_string(value).expect("candidate configuration must serialize");
        Self(*blake3::hash(json.as_bytes()).as_bytes())
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }

    /// First 12 hex chars, for logs.
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// What a candidate is: one mode evaluated with one weighting on one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub target: TargetId,
    pub mode: PredictionMode,
    pub weighting: WeightingSpec,
}

/// A fingerprinted, labelled candidate ready for prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub spec: CandidateSpec,
    pub label: String,
    pub hash: Fingerprint,
    /// The weighting actually trained (champion windows add a lookback).
    pub training: WeightingSpec,
    pub training_hash: Fingerprint,
}

impl Candidate {
    pub fn new(spec: CandidateSpec) -> Self {
        let training = match spec.mode {
            PredictionMode::ChampionWindow { window_years } => spec.weighting.with_lookback(window_years),
            _ => spec.weighting.clone(),
        };
        let label = format!("{}@{}", Self::name_of(&spec), spec.target);
        Self {
            hash: Fingerprint::of(&spec),
            training_hash: Fingerprint::of(&training),
            label,
            training,
            spec,
        }
    }

    /// Unweighted majority over every forecaster.
    pub fn majority(target: TargetId) -> Self {
        Self::new(CandidateSpec {
            target,
            mode: PredictionMode::MajorityAll,
            weighting: WeightingSpec::bayes(),
        })
    }

    /// Label without the `@target` suffix.
    pub fn name(&self) -> String {
        Self::name_of(&self.spec)
    }

    fn name_of(spec: &CandidateSpec) -> String {
        if spec.mode.uses_weighting() {
            format!("{}[{}]", spec.mode.label(), spec.weighting.name)
        } else {
            spec.mode.label()
        }
    }

    pub fn target(&self) -> &TargetId {
        &self.spec.target
    }

    pub fn mode(&self) -> &PredictionMode {
        &self.spec.mode
    }
}
