//! predictions.json — `{"predictions": [{year, groundhogSlug, shadow, ...}]}`.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{parse_year, read_file, DataError};
use crate::domain::{Prediction, PredictionPanel};

#[derive(Debug, Deserialize)]
struct PredictionsFile {
    #[serde(default)]
    predictions: Vec<RawPrediction>,
}

/// One entry as written upstream; extra fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPrediction {
    #[serde(default)]
    year: Value,
    #[serde(default)]
    groundhog_slug: Option<String>,
    #[serde(default)]
    shadow: Value,
}

impl RawPrediction {
    fn into_prediction(self) -> Option<Prediction> {
        let year = match &self.year {
            Value::Number(n) => n.as_f64().and_then(|f| parse_year(&f.to_string())),
            Value::String(s) => parse_year(s),
            _ => None,
        }?;
        let slug = self.groundhog_slug.filter(|s| !s.is_empty())?;
        Some(Prediction::new(year, slug, truthy(&self.shadow)))
    }
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

pub fn load_predictions(path: &Path) -> Result<PredictionPanel, DataError> {
    parse_predictions(&read_file(path)?)
}

/// Parse the predictions JSON; entries without a year or slug are dropped.
pub fn parse_predictions(text: &str) -> Result<PredictionPanel, DataError> {
    let file: PredictionsFile = serde_json::from_str(text)?;
    let total = file.predictions.len();
    let predictions: Vec<Prediction> = file
        .predictions
        .into_iter()
        .filter_map(RawPrediction::into_prediction)
        .collect();
    let dropped = total - predictions.len();
    if dropped > 0 {
        warn!(dropped, "dropping predictions without a usable year or slug");
    }
    let panel = PredictionPanel::from_predictions(predictions);
    debug!(predictions = panel.len(), years = panel.years().count(), "parsed predictions");
    Ok(panel)
}
