//! Criterion benchmarks for backtest throughput.
//!
//! Run with: `cargo bench -p shadowcast-runner`
//!
//! - Base candidate replay through a fresh evaluator
//! - Candidate space search, sequential vs rayon
//! - Meta strategy replays over a prebuilt matrix

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use shadowcast_core::candidate::{Candidate, CandidateSpec};
use shadowcast_core::data::{synthetic_dataset, SyntheticConfig};
use shadowcast_core::domain::{Dataset, TargetId, TARGET_FEBMAR};
use shadowcast_core::predict::PredictionMode;
use shadowcast_core::weighting::{FusionConfig, WeightingSpec};
use shadowcast_runner::fusion::{MetaConfig, StackConfig, TuningProfile};
use shadowcast_runner::{
    search_candidates, BacktestGate, CandidateMatrix, Evaluator, Matrices, MatrixSource,
    SpaceConfig, Strategy,
};

fn dataset() -> Dataset {
    synthetic_dataset(&SyntheticConfig {
        first_year: 1960,
        last_year: 2024,
        forecasters: 50,
        ..Default::default()
    })
}

fn target() -> TargetId {
    TargetId::new(TARGET_FEBMAR)
}

fn bench_candidate_replay(c: &mut Criterion) {
    let data = dataset();
    let mut group = c.benchmark_group("candidate_replay");
    for mode in [
        PredictionMode::AutoWeighted,
        PredictionMode::TopnMajority { top_n: 5 },
        PredictionMode::ChampionWindow { window_years: 20 },
    ] {
        let candidate = Candidate::new(CandidateSpec {
            target: target(),
            mode,
            weighting: WeightingSpec::bayes(),
        });
        group.bench_with_input(BenchmarkId::from_parameter(mode.label()), &candidate, |b, cand| {
            b.iter(|| {
                let mut eval = Evaluator::new(&data, BacktestGate::default());
                black_box(eval.backtest(cand));
            });
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let data = dataset();
    let space = SpaceConfig {
        weightings: Some(vec!["bayes".into(), "exp_decay_hl10".into(), "logit".into(), "window20".into()]),
        ..Default::default()
    };
    let weightings = space.weighting_specs().unwrap();
    let mut group = c.benchmark_group("candidate_search");
    group.sample_size(10);
    for parallel in [false, true] {
        group.bench_with_input(BenchmarkId::new("parallel", parallel), &parallel, |b, &p| {
            b.iter(|| {
                black_box(search_candidates(
                    &data,
                    &target(),
                    BacktestGate::default(),
                    &space,
                    &weightings,
                    p,
                ))
            });
        });
    }
    group.finish();
}

fn bench_meta_replay(c: &mut Criterion) {
    let data = dataset();
    let gate = BacktestGate::default();
    let fusion = CandidateMatrix::for_fusion(&data, &target(), gate, &FusionConfig::builtin(), true);
    let matrices = Matrices {
        base: fusion.clone(),
        fusion,
    };
    let strategies = [
        Strategy::MetaVote {
            source: MatrixSource::Fusion,
            config: MetaConfig::decayed(10.0),
        },
        Strategy::Stacked {
            source: MatrixSource::Fusion,
            config: StackConfig {
                advanced: true,
                ..Default::default()
            },
        },
        Strategy::DynamicSuper {
            source: MatrixSource::Fusion,
            profile: TuningProfile::builtin()[0].clone(),
        },
    ];
    let mut group = c.benchmark_group("meta_replay");
    for strategy in &strategies {
        group.bench_with_input(BenchmarkId::from_parameter(strategy.kind()), strategy, |b, s| {
            b.iter(|| black_box(s.backtest(&matrices)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_candidate_replay, bench_search, bench_meta_replay);
criterion_main!(benches);
