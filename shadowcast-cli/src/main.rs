//! Shadowcast CLI — ensemble forecast evaluation over local files.
//!
//! Commands:
//! - `evaluate` — full run: candidate search, meta fusion, selection, nowcast
//! - `backtest` — replay one base candidate and print its trace
//! - `candidates` — list the winning candidate of every mode slot per target
//! - `config` — print the default engine configuration as TOML

mod logging;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Datelike;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use shadowcast_core::candidate::{Candidate, CandidateSpec};
use shadowcast_core::data::{load_dataset, synthetic_dataset, SyntheticConfig};
use shadowcast_core::domain::{Dataset, TargetId, TARGET_FEBMAR};
use shadowcast_core::predict::PredictionMode;
use shadowcast_core::weighting::WeightingSpec;
use shadowcast_runner::{
    calibrate, dae_year, search_candidates, BacktestTrace, Engine, EngineConfig, Evaluator,
    ForecastReport, Verdict,
};

#[derive(Parser)]
#[command(
    name = "shadowcast",
    about = "Shadowcast — temporal backtest and model selection for groundhog ensembles"
)]
struct Cli {
    /// More logging (debug for shadowcast crates).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Errors only.
    #[arg(short, long, default_value_t = false, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// predictions.json with `{"predictions": [...]}`.
    #[arg(long, requires = "outcomes", conflicts_with = "synthetic")]
    predictions: Option<PathBuf>,

    /// outcomes.csv with `year,target,outcome[,mar_anom]`.
    #[arg(long, requires = "predictions")]
    outcomes: Option<PathBuf>,

    /// Use a seeded synthetic panel ending in the current year.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Seed for `--synthetic`.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Engine configuration TOML. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured targets (repeatable).
    #[arg(long = "target")]
    targets: Vec<String>,

    /// Disable rayon fan-out.
    #[arg(long, default_value_t = false)]
    sequential: bool,

    /// Print JSON instead of a table.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full engine and report the chosen strategy and nowcast.
    Evaluate {
        #[command(flatten)]
        input: InputArgs,

        /// Leaderboard rows shown per target.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Replay one base candidate over the scored years.
    Backtest {
        #[command(flatten)]
        input: InputArgs,

        #[arg(long, value_enum, default_value_t = ModeArg::AutoWeighted)]
        mode: ModeArg,

        /// N for top-N modes, W for champion_window, minObs for flip_majority.
        #[arg(long, default_value_t = 5)]
        n: usize,

        /// Weighting catalog name.
        #[arg(long, default_value = "bayes")]
        weighting: String,
    },
    /// Search the candidate space and list each slot's winner.
    Candidates {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Print the default configuration.
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    MajorityAll,
    AutoWeighted,
    TopnWeighted,
    TopnMajority,
    BestSingle,
    ChampionWindow,
    FlipMajority,
}

impl ModeArg {
    fn to_mode(self, n: usize) -> Result<PredictionMode> {
        Ok(match self {
            Self::MajorityAll => PredictionMode::MajorityAll,
            Self::AutoWeighted => PredictionMode::AutoWeighted,
            Self::TopnWeighted => PredictionMode::TopnWeighted { top_n: n },
            Self::TopnMajority => PredictionMode::TopnMajority { top_n: n },
            Self::BestSingle => PredictionMode::BestSingle,
            Self::ChampionWindow => PredictionMode::ChampionWindow {
                window_years: u32::try_from(n).context("--n out of range for a window")?,
            },
            Self::FlipMajority => PredictionMode::FlipMajority { min_obs: n },
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(logging::Verbosity::from_flags(cli.verbose, cli.quiet));

    match cli.command {
        Commands::Evaluate { input, top } => run_evaluate(&input, top),
        Commands::Backtest {
            input,
            mode,
            n,
            weighting,
        } => run_backtest(&input, mode.to_mode(n)?, &weighting),
        Commands::Candidates { input } => run_candidates(&input),
        Commands::Config => {
            print!("{}", EngineConfig::default().to_toml()?);
            Ok(())
        }
    }
}

// ─── Inputs ──────────────────────────────────────────────────────────

fn load_config(input: &InputArgs) -> Result<EngineConfig> {
    let mut config = match &input.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    if !input.targets.is_empty() {
        config.targets = input.targets.iter().map(|t| TargetId::new(t.as_str())).collect();
    }
    if input.sequential {
        config.parallel = false;
    }
    config.validate()?;
    Ok(config)
}

fn load_data(input: &InputArgs) -> Result<Dataset> {
    match (&input.predictions, &input.outcomes, input.synthetic) {
        (Some(p), Some(o), false) => load_dataset(p, o)
            .with_context(|| format!("loading {} and {}", p.display(), o.display())),
        (None, None, true) => {
            let last_year = chrono::Local::now().year();
            info!(seed = input.seed, last_year, "using synthetic panel");
            Ok(synthetic_dataset(&SyntheticConfig {
                seed: input.seed,
                last_year,
                ..Default::default()
            }))
        }
        _ => bail!("pass either --predictions and --outcomes, or --synthetic"),
    }
}

// ─── Commands ────────────────────────────────────────────────────────

fn run_evaluate(input: &InputArgs, top: usize) -> Result<()> {
    let engine = Engine::new(load_config(input)?)?;
    let data = load_data(input)?;
    let verdict = engine.run(&data);

    if input.json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        return Ok(());
    }
    match &verdict {
        Verdict::Chosen(report) => print_report(report, top),
        Verdict::NothingUsable { evaluated } => {
            println!("No usable strategy ({evaluated} evaluated): no target has a scored year.");
        }
    }
    Ok(())
}

fn run_backtest(input: &InputArgs, mode: PredictionMode, weighting: &str) -> Result<()> {
    let config = load_config(input)?;
    let data = load_data(input)?;
    let Some(weighting) = WeightingSpec::catalog().into_iter().find(|s| s.name == weighting) else {
        bail!("unknown weighting '{weighting}'");
    };

    let mut eval = Evaluator::new(&data, config.gate);
    let mut traces = Vec::new();
    for target in &config.targets {
        let candidate = Candidate::new(CandidateSpec {
            target: target.clone(),
            mode,
            weighting: weighting.clone(),
        });
        let trace = eval.backtest(&candidate);
        let dae = dae_year(&data, target, &trace, &config.dae);
        traces.push((candidate, trace, dae));
    }

    if input.json {
        let out: Vec<_> = traces
            .iter()
            .map(|(c, t, dae)| {
                serde_json::json!({
                    "label": c.label,
                    "backtest": t.result,
                    "dae_year": dae,
                    "rows": t.rows,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }
    for (candidate, trace, dae) in &traces {
        print_trace(&candidate.label, trace);
        match dae {
            Some(y) => println!("Data adequacy epoch: {y}"),
            None => println!("Data adequacy epoch: never"),
        }
        println!();
    }
    Ok(())
}

fn run_candidates(input: &InputArgs) -> Result<()> {
    let config = load_config(input)?;
    let data = load_data(input)?;
    let weightings = config.space.weighting_specs()?;

    let mut out = Vec::new();
    for target in &config.targets {
        let search = search_candidates(
            &data,
            target,
            config.gate,
            &config.space,
            &weightings,
            config.parallel,
        );
        out.push((target.clone(), search));
    }

    if input.json {
        let json: Vec<_> = out
            .iter()
            .map(|(target, search)| {
                serde_json::json!({
                    "target": target,
                    "evaluated": search.evaluated,
                    "winners": search.winners.iter().map(|w| serde_json::json!({
                        "label": w.candidate.label,
                        "hash": w.candidate.hash.to_hex(),
                        "backtest": w.trace.result,
                    })).collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }
    for (target, search) in &out {
        println!("=== {target} ({} candidates evaluated) ===", search.evaluated);
        println!("{:<48} {:>9} {:>5} {:>5}", "Candidate", "Accuracy", "k", "n");
        println!("{}", "-".repeat(70));
        for w in &search.winners {
            let r = &w.trace.result;
            println!(
                "{:<48} {:>9} {:>5} {:>5}",
                w.candidate.name(),
                format_pct(r.accuracy),
                r.k,
                r.n
            );
        }
        println!();
    }
    Ok(())
}

// ─── Output ──────────────────────────────────────────────────────────

fn format_pct(x: f64) -> String {
    if x.is_finite() {
        format!("{:.1}%", x * 100.0)
    } else {
        "-".to_string()
    }
}

fn print_report(report: &ForecastReport, top: usize) {
    let chosen = &report.chosen;
    let bt = &chosen.backtest;
    println!();
    println!("=== Chosen Strategy ===");
    println!("Label:          {}", chosen.label);
    println!("Kind:           {}", chosen.kind);
    println!("Target:         {}", chosen.target);
    println!("Accuracy:       {} ({}/{})", format_pct(bt.accuracy), bt.k, bt.n);
    match bt.last_scored_year {
        Some(y) => println!("Last scored:    {y}"),
        None => println!("Last scored:    -"),
    }

    if let Some(now) = &report.nowcast {
        println!();
        println!("--- Nowcast {} ---", now.year);
        match now.pred {
            Some(pred) => println!("Call:           {}", pred.as_str()),
            None => println!("Call:           abstain"),
        }
        println!("Raw certainty:  {}", format_pct(now.certainty));
        println!("Voters used:    {} of {}", now.used, now.total_preds);
        if let Some(tier) = now.tier {
            println!("Gate tier:      {tier:?}");
        }
    }
    if let Some(cal) = &report.calibration {
        println!("Calibrated:     {}", format_pct(cal.calibrated_certainty));
        println!("Shrunk acc:     {}", format_pct(cal.p_shrunk));
        if let (Some(lo), Some(hi)) = (cal.wilson_low, cal.wilson_high) {
            println!("Wilson 95%:     [{}, {}]", format_pct(lo), format_pct(hi));
        }
    }
    match report.dae_year {
        Some(y) => println!("Adequate since: {y}"),
        None => println!("Adequate since: never"),
    }

    for target in &report.targets {
        println!();
        println!(
            "--- {} ({} scored years, {} strategies) ---",
            target.target, target.scored_years, target.evaluated
        );
        println!("{:<4} {:<56} {:>9} {:>5}", "#", "Strategy", "Accuracy", "n");
        for (i, e) in target.leaderboard.iter().take(top).enumerate() {
            println!(
                "{:<4} {:<56} {:>9} {:>5}",
                i + 1,
                e.label,
                format_pct(e.backtest.accuracy),
                e.backtest.n
            );
        }
    }
}

fn print_trace(label: &str, trace: &BacktestTrace) {
    let r = &trace.result;
    println!("=== {label} ===");
    println!("{:<6} {:<13} {:<13} {:>9} {:>8}", "Year", "Call", "Actual", "Certainty", "Cum acc");
    for row in &trace.rows {
        let call = row.forecast.pred.map(|p| p.as_str()).unwrap_or("-");
        println!(
            "{:<6} {:<13} {:<13} {:>9} {:>8}",
            row.year,
            call,
            row.actual.as_str(),
            format_pct(row.forecast.certainty),
            format_pct(row.cum_k as f64 / row.cum_n as f64),
        );
    }
    println!("Accuracy: {} ({}/{})", format_pct(r.accuracy), r.k, r.n);
    let cal = calibrate(1.0, r, &Default::default());
    println!("Shrunk accuracy: {}", format_pct(cal.p_shrunk));
}
