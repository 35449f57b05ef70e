//! Tracing subscriber setup for the `shadowcast` binary.
//!
//! Priority, highest first: `SHADOWCAST_LOG`, `RUST_LOG`, then `-v` / `-q`.
//! Default level is `warn`. Logs go to stderr so `--json` output on stdout
//! stays clean.

use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        if verbose > 0 {
            Self::Verbose
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::DEBUG,
        }
    }
}

pub fn init(verbosity: Verbosity) {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr()))
        .with_target(verbosity == Verbosity::Verbose);
    tracing_subscriber::registry()
        .with(env_filter(verbosity))
        .with(layer.without_time().compact())
        .init();
}

fn env_filter(verbosity: Verbosity) -> EnvFilter {
    if let Ok(directives) = std::env::var("SHADOWCAST_LOG") {
        if let Ok(filter) = EnvFilter::try_new(directives) {
            return filter;
        }
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = verbosity.level();
    let directive = match verbosity {
        Verbosity::Verbose => format!("{level},shadowcast_core=debug,shadowcast_runner=debug"),
        _ => level.to_string(),
    };
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}
