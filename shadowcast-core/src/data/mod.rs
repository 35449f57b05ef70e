//! Local file ingestion — predictions JSON, outcomes CSV, synthetic panels.
//!
//! These are thin adapters: they parse, drop malformed rows with a warning,
//! and hand back the immutable domain collections. Nothing here touches the
//! network.

pub mod outcomes;
pub mod predictions;
pub mod synthetic;

use std::path::{Path, PathBuf};

use crate::domain::Dataset;

pub use outcomes::{load_outcomes, parse_outcomes};
pub use predictions::{load_predictions, parse_predictions};
pub use synthetic::{synthetic_dataset, SyntheticConfig};

/// Errors from reading or parsing input files.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("outcomes file has no '{0}' column")]
    MissingColumn(&'static str),
}

pub(crate) fn read_file(path: &Path) -> Result<String, DataError> {
    std::fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load both inputs from disk.
pub fn load_dataset(predictions: &Path, outcomes: &Path) -> Result<Dataset, DataError> {
    Ok(Dataset::new(load_predictions(predictions)?, load_outcomes(outcomes)?))
}

/// Parse a year that may be written as `2001` or `2001.0`.
pub(crate) fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if let Ok(y) = raw.parse::<i32>() {
        return Some(y);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < 1e6)
        .map(|f| f as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_year_accepts_float_notation() {
        assert_eq!(parse_year("2001"), Some(2001));
        assert_eq!(parse_year(" 2001.0 "), Some(2001));
        assert_eq!(parse_year("2001.5"), None);
        assert_eq!(parse_year("abc"), None);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_outcomes(Path::new("/nonexistent/outcomes.csv")).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }
}
