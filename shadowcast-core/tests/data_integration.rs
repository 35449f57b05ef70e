//! File-loading round trips through real files on disk.

use std::io::Write;

use shadowcast_core::data::{load_dataset, load_outcomes, DataError};
use shadowcast_core::domain::{Outcome, TargetId, TARGET_FEBMAR, TARGET_MARCH};

fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn loads_dataset_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let preds = write(
        &dir,
        "predictions.json",
        r#"{"generatedAt": "2026-02-02", "predictions": [
            {"year": 2020, "groundhogSlug": "phil", "shadow": true},
            {"year": 2020, "groundhogSlug": "chuck", "shadow": false},
            {"year": 2021, "groundhogSlug": "phil", "shadow": false}
        ]}"#,
    );
    let outcomes = write(
        &dir,
        "outcomes.csv",
        "# source: NOAA nClimDiv\nyear,target,outcome,mar_anom\n\
         2020,US_CONUS_FEBMAR_MEAN_ANOM,EARLY_SPRING,-1.2\n",
    );

    let data = load_dataset(&preds, &outcomes).unwrap();
    assert_eq!(data.panel.count(2020), 2);
    assert_eq!(data.panel.last_year(), Some(2021));
    assert_eq!(
        data.outcome(&TargetId::new(TARGET_FEBMAR), 2020),
        Some(Outcome::EarlySpring)
    );
    assert_eq!(
        data.outcome(&TargetId::new(TARGET_MARCH), 2020),
        Some(Outcome::LongWinter)
    );
    assert!(data.outcome(&TargetId::new(TARGET_FEBMAR), 2021).is_none());
}

#[test]
fn malformed_predictions_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let preds = write(&dir, "predictions.json", "not json");
    let outcomes = write(&dir, "outcomes.csv", "year,target,outcome\n");
    let err = load_dataset(&preds, &outcomes).unwrap_err();
    assert!(matches!(err, DataError::Json(_)));
}

#[test]
fn io_error_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.csv");
    let err = load_outcomes(&missing).unwrap_err();
    assert!(err.to_string().contains("absent.csv"));
}
