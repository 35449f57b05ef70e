use serde::{Deserialize, Serialize};
use std::fmt;

/// Forecaster identifier (the slug of a single prognosticating animal).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForecasterId(pub String);

impl ForecasterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ForecasterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ForecasterId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Ground-truth definition identifier (e.g. `US_CONUS_FEBMAR_MEAN_ANOM`).
///
/// The engine never interprets the id; it only keys outcomes by it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TargetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Feb+Mar mean temperature anomaly over the contiguous US.
pub const TARGET_FEBMAR: &str = "US_CONUS_FEBMAR_MEAN_ANOM";
/// March-only anomaly, derived from the `mar_anom` column of the Feb+Mar rows.
pub const TARGET_MARCH: &str = "US_CONUS_MAR_ANOM";
