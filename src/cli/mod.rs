//! CLI command definitions and handlers

mod features;
mod gate;
mod init;

use crate::pipeline::MAX_WORKERS;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Exit code when the gate fails
pub const EXIT_GATED: i32 = 1;

/// Exit code for usage, input, and I/O errors
pub const EXIT_ERROR: i32 = 2;

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > MAX_WORKERS {
        Err(format!("workers cannot exceed {}", MAX_WORKERS))
    } else {
        Ok(n)
    }
}

/// Parse a threshold, accepting fractions (0.95) only
fn parse_threshold(s: &str) -> Result<f64, String> {
    let t: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if t.is_finite() && (0.0..=1.0).contains(&t) {
        Ok(t)
    } else {
        Err("threshold must be between 0 and 1".to_string())
    }
}

/// baseline-gate - gate web features on real browser traffic
#[derive(Parser, Debug)]
#[command(name = "baseline-gate")]
#[command(
    version,
    about = "Detect modern web features in CSS/JS/TS and gate them on your own browser traffic",
    long_about = "baseline-gate scans style and script sources for modern web platform \
features, resolves the minimum browser versions each one needs, and measures what share \
of your traffic can already use it.\n\n\
A feature passes when its readiness reaches the policy threshold. `scan` exits with \
status 1 when any detected feature is gated, so it can fail a CI job.",
    after_help = "\
Examples:
  baseline-gate init                                   Write a starter baseline.toml
  baseline-gate scan --traffic traffic.csv             Scan the current directory
  baseline-gate scan web --traffic t.csv -f markdown   PR comment output
  baseline-gate check --feature has --traffic t.csv    Readiness for one feature
  baseline-gate features                               List tracked features"
)]
pub struct Cli {
    /// Path to project (default: current directory)
    #[arg(global = true, default_value = ".")]
    pub path: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of parallel workers (1-64, default from config or 8)
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan sources and gate every detected feature
    #[command(after_help = "\
Exit codes:
  0  every mapped feature meets the threshold (or traffic is present and none were detected)
  1  gated: a feature is below the threshold, or traffic is missing
  2  error")]
    Scan {
        /// Traffic file (CSV browser,version,share or JSON array)
        #[arg(long, short = 't')]
        traffic: Option<PathBuf>,

        /// Compatibility dataset (browser-compat-data JSON)
        #[arg(long, short = 'd')]
        dataset: Option<PathBuf>,

        /// Pass threshold between 0 and 1
        #[arg(long, value_parser = parse_threshold)]
        threshold: Option<f64>,

        /// Output format
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json", "markdown", "md"])]
        format: String,

        /// Write the report to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Compute readiness for explicit feature ids
    Check {
        /// Feature id (repeatable)
        #[arg(long = "feature", required = true)]
        features: Vec<String>,

        /// Traffic file (CSV browser,version,share or JSON array)
        #[arg(long, short = 't')]
        traffic: Option<PathBuf>,

        /// Compatibility dataset (browser-compat-data JSON)
        #[arg(long, short = 'd')]
        dataset: Option<PathBuf>,

        /// Pass threshold between 0 and 1
        #[arg(long, value_parser = parse_threshold)]
        threshold: Option<f64>,

        /// Output format
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json", "markdown", "md"])]
        format: String,
    },

    /// List tracked features with dataset keys and fallback versions
    Features,

    /// Write a starter baseline.toml
    Init,
}

/// Run the CLI with parsed arguments, returning the process exit code
pub fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Scan {
            traffic,
            dataset,
            threshold,
            format,
            output,
        } => gate::scan(
            &cli.path,
            gate::GateOptions {
                traffic,
                dataset,
                threshold,
                workers: cli.workers,
                format,
            },
            output.as_deref(),
        ),

        Commands::Check {
            features,
            traffic,
            dataset,
            threshold,
            format,
        } => gate::check(
            &cli.path,
            &features,
            gate::GateOptions {
                traffic,
                dataset,
                threshold,
                workers: cli.workers,
                format,
            },
        ),

        Commands::Features => features::run(&cli.path).map(|_| 0),

        Commands::Init => init::run(&cli.path).map(|_| 0),
    }
}
