//! End-to-end engine scenarios: determinism, parallelism, file inputs.

use std::fmt::Write as _;

use shadowcast_core::data::{synthetic_dataset, SyntheticConfig};
use shadowcast_core::domain::{Dataset, TargetId, TARGET_FEBMAR, TARGET_MARCH};
use shadowcast_runner::{
    search_candidates, BacktestGate, CandidateSearch, ConfigError, Engine, EngineConfig,
    EngineError, SpaceConfig, Verdict,
};

fn quick_config(parallel: bool) -> EngineConfig {
    EngineConfig {
        space: SpaceConfig {
            top_n: vec![3, 7],
            champion_windows: vec![10, 20],
            weightings: Some(vec![
                "bayes".into(),
                "exp_decay_hl10".into(),
                "wilson".into(),
                "logit".into(),
            ]),
            ..Default::default()
        },
        parallel,
        ..Default::default()
    }
}

fn dataset(seed: u64) -> Dataset {
    synthetic_dataset(&SyntheticConfig {
        seed,
        first_year: 1975,
        last_year: 2020,
        forecasters: 32,
        ..Default::default()
    })
}

fn report_json(verdict: &Verdict) -> serde_json::Value {
    serde_json::to_value(verdict).unwrap()
}

#[test]
fn parallel_run_matches_sequential() {
    let data = dataset(3);
    let seq = Engine::new(quick_config(false)).unwrap().run(&data);
    let par = Engine::new(quick_config(true)).unwrap().run(&data);
    assert_eq!(report_json(&seq), report_json(&par));
}

#[test]
fn parallel_search_matches_sequential() {
    let data = dataset(5);
    let cfg = quick_config(false);
    let weightings = cfg.space.weighting_specs().unwrap();
    let target = TargetId::new(TARGET_MARCH);
    let run = |parallel| -> CandidateSearch {
        search_candidates(&data, &target, cfg.gate, &cfg.space, &weightings, parallel)
    };
    let (a, b) = (run(false), run(true));
    assert_eq!(a.evaluated, b.evaluated);
    assert_eq!(a.winners.len(), b.winners.len());
    for (x, y) in a.winners.iter().zip(&b.winners) {
        assert_eq!(x.candidate.hash, y.candidate.hash);
        assert_eq!(x.trace.result, y.trace.result);
    }
}

#[test]
fn repeated_runs_pick_the_same_strategy() {
    let data = dataset(9);
    let engine = Engine::new(quick_config(true)).unwrap();
    let first = engine.run(&data);
    for _ in 0..2 {
        assert_eq!(report_json(&engine.run(&data)), report_json(&first));
    }
}

#[test]
fn leaderboards_follow_the_selection_rule() {
    let data = dataset(13);
    let verdict = Engine::new(quick_config(true)).unwrap().run(&data);
    let report = verdict.report().unwrap();
    for summary in &report.targets {
        for pair in summary.leaderboard.windows(2) {
            let (a, b) = (&pair[0].backtest, &pair[1].backtest);
            assert!(
                a.accuracy > b.accuracy
                    || (a.accuracy == b.accuracy && a.n > b.n)
                    || (a.accuracy == b.accuracy && a.n == b.n && pair[0].label < pair[1].label)
            );
        }
        assert!(summary
            .leaderboard
            .iter()
            .all(|e| e.backtest.accuracy.is_finite()));
    }
    let heads = report.targets.iter().filter_map(|t| t.leaderboard.first());
    for head in heads {
        let (a, b) = (&report.chosen.backtest, &head.backtest);
        assert!(a.accuracy > b.accuracy || (a.accuracy == b.accuracy && a.n >= b.n));
    }
}

#[test]
fn chosen_trace_is_cumulative() {
    let data = dataset(21);
    let verdict = Engine::new(quick_config(true)).unwrap().run(&data);
    let report = verdict.report().unwrap();
    let mut k = 0;
    for (i, row) in report.trace.iter().enumerate() {
        k += usize::from(row.correct);
        assert_eq!(row.cum_n, i + 1);
        assert_eq!(row.cum_k, k);
    }
    assert_eq!(k, report.chosen.backtest.k);
    if let Some(dae) = report.dae_year {
        assert!(report.trace.iter().any(|r| r.year == dae));
    }
    let nowcast = report.nowcast.as_ref().unwrap();
    assert_eq!(nowcast.year, 2020);
    if let Some(cal) = report.calibration {
        assert!(nowcast.pred.is_some());
        if cal.raw_certainty.is_finite() {
            assert!(cal.calibrated_certainty <= cal.raw_certainty + 1e-12);
        }
    }
}

#[test]
fn unknown_targets_are_skipped() {
    let data = dataset(1);
    let cfg = EngineConfig {
        targets: vec![TargetId::from("NOWHERE"), TargetId::new(TARGET_FEBMAR)],
        ..quick_config(false)
    };
    let report = Engine::new(cfg).unwrap().run(&data);
    let report = report.report().unwrap();
    assert_eq!(report.targets.len(), 1);
    assert_eq!(report.chosen.target, TargetId::new(TARGET_FEBMAR));
}

#[test]
fn strict_gate_leaves_nothing_usable() {
    let cfg = EngineConfig {
        gate: BacktestGate {
            min_forecasters: 1000,
        },
        ..quick_config(false)
    };
    let verdict = Engine::new(cfg).unwrap().run(&dataset(2));
    assert!(matches!(verdict, Verdict::NothingUsable { evaluated: 0 }));
    assert_eq!(report_json(&verdict)["status"], "nothing_usable");
}

// ─── File inputs ─────────────────────────────────────────────────────

fn write_inputs(dir: &std::path::Path, data: &Dataset) -> (std::path::PathBuf, std::path::PathBuf) {
    let mut entries = Vec::new();
    for year in data.panel.years() {
        for p in data.panel.year(year) {
            entries.push(serde_json::json!({
                "year": year,
                "groundhogSlug": p.forecaster.to_string(),
                "shadow": p.shadow_seen,
            }));
        }
    }
    let predictions = dir.join("predictions.json");
    std::fs::write(
        &predictions,
        serde_json::to_string(&serde_json::json!({ "predictions": entries })).unwrap(),
    )
    .unwrap();

    let febmar = TargetId::new(TARGET_FEBMAR);
    let mut csv = String::from("# synthetic outcomes\nyear,target,outcome\n");
    for year in data.outcomes.years(&febmar) {
        let outcome = data.outcomes.get(&febmar, year).unwrap();
        writeln!(csv, "{year},{febmar},{}", outcome.as_str()).unwrap();
    }
    let outcomes = dir.join("outcomes.csv");
    std::fs::write(&outcomes, csv).unwrap();
    (predictions, outcomes)
}

#[test]
fn run_files_matches_in_memory_run() {
    let dir = tempfile::tempdir().unwrap();
    let data = dataset(17);
    let (predictions, outcomes) = write_inputs(dir.path(), &data);

    let cfg = EngineConfig {
        targets: vec![TargetId::new(TARGET_FEBMAR)],
        ..quick_config(true)
    };
    let engine = Engine::new(cfg).unwrap();
    let from_files = engine.run_files(&predictions, &outcomes).unwrap();
    assert_eq!(report_json(&from_files), report_json(&engine.run(&data)));

    let missing = engine.run_files(&dir.path().join("nope.json"), &outcomes);
    assert!(matches!(missing, Err(EngineError::Data(_))));
}

#[test]
fn config_file_drives_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shadowcast.toml");
    std::fs::write(
        &path,
        r#"
targets = ["US_CONUS_FEBMAR_MEAN_ANOM"]
leaderboard_size = 5
parallel = false

[space]
top_n = [5]
champion_windows = [15]
weightings = ["bayes", "logit"]

[dae]
min_backtest_years = 5
"#,
    )
    .unwrap();
    let cfg = EngineConfig::from_file(&path).unwrap();
    assert_eq!(cfg.dae.min_backtest_years, 5);
    let verdict = Engine::new(cfg).unwrap().run(&dataset(4));
    let report = verdict.report().unwrap();
    assert!(report.targets[0].leaderboard.len() <= 5);

    std::fs::write(&path, "[space]\ntop_n = [0]\n").unwrap();
    assert!(matches!(
        EngineConfig::from_file(&path),
        Err(ConfigError::Invalid(_))
    ));
}
