//! Deferral CLI - conformance runner for settle-once deferred values.
//!
//! ```text
//! main() -> load config -> init_tracing() -> select scenarios -> run each
//!                                                                   |
//!                                                                   v
//!                                                      Report -> text | JSON
//! ```
//!
//! Every scenario runs on its own task queue, so a failure (or a runaway
//! chain hitting the turn limit) never leaks into the next one.

mod report;
mod scenarios;

use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use deferral_config::{ConfigError, DeferralConfig};

use crate::report::{Report, ScenarioOutcome};
use crate::scenarios::{Scenario, catalogue};

#[derive(Debug, Parser)]
#[command(name = "deferral")]
#[command(about = "Run the built-in settlement scenarios and report PASS/FAIL per scenario")]
struct Cli {
    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Print scenario names and summaries, then exit
    #[arg(long)]
    list: bool,
}

fn init_tracing(config: &DeferralConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level().unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file(config);

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // Without a log file, drop logs rather than interleave them with the report.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file(config: &DeferralConfig) -> (Option<(PathBuf, File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates(config) {
        if let Some(parent) = candidate.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates(config: &DeferralConfig) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(file) = config.log_file() {
        candidates.push(file.to_path_buf());
    }

    // Primary: ~/.deferral/logs/deferral.log
    if let Some(config_path) = DeferralConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("deferral.log"));
    }

    // Fallback: ./.deferral/logs/deferral.log
    candidates.push(PathBuf::from(".deferral").join("logs").join("deferral.log"));

    candidates
}

/// Pick the scenarios named in `only`, in catalogue order. Empty runs all.
fn select<'a>(catalogue: &'a [Scenario], only: &[String]) -> Vec<&'a Scenario> {
    for name in only {
        if !catalogue.iter().any(|scenario| scenario.name == name.as_str()) {
            tracing::warn!("Unknown scenario in config: {}", name);
        }
    }

    catalogue
        .iter()
        .filter(|scenario| only.is_empty() || only.iter().any(|name| name == scenario.name))
        .collect()
}

fn run_scenarios(selected: &[&Scenario], turn_limit: usize, fail_fast: bool) -> Report {
    let mut report = Report::default();

    for scenario in selected {
        let outcome = match scenario.run(turn_limit) {
            Ok(()) => {
                tracing::debug!(scenario = scenario.name, "Scenario passed");
                ScenarioOutcome::pass(scenario.name)
            }
            Err(err) => {
                tracing::warn!(scenario = scenario.name, "Scenario failed: {err:#}");
                ScenarioOutcome::fail(scenario.name, format!("{err:#}"))
            }
        };
        let failed = !outcome.passed;
        report.push(outcome);

        if failed && fail_fast {
            tracing::info!("Stopping after first failure");
            break;
        }
    }

    report
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let (config, config_error): (DeferralConfig, Option<ConfigError>) =
        match DeferralConfig::load() {
            Ok(config) => (config.unwrap_or_default(), None),
            Err(err) => (DeferralConfig::default(), Some(err)),
        };

    init_tracing(&config);
    if let Some(err) = config_error {
        tracing::warn!("Using default config: {err}");
        eprintln!("warning: {err}");
    }

    let catalogue = catalogue();

    if cli.list {
        for scenario in &catalogue {
            println!("{:<32} {}", scenario.name, scenario.summary);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let selected = select(&catalogue, config.only());
    let report = run_scenarios(&selected, config.turn_limit(), config.fail_fast());

    if cli.json {
        println!("{}", report.render_json()?);
    } else {
        println!("{}", report.render_text());
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
