// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use xrealm_harness::scenarios::{self, Scenario};
use xrealm_harness::{TestOutcome, TestRunner, TestStatus};
use xrealm_logging::CliLoggingArgs;

pub mod config;

pub use clap::Parser;
pub use config::RunnerConfig;

#[derive(Parser)]
#[command(
    name = "xrealm",
    about = "Runs the cross-realm file-system handle scenarios",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub logging: CliLoggingArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the available scenarios
    List,
    /// Run scenarios and report PASS/FAIL/TIMEOUT for each
    Run(RunArgs),
    /// Print the configuration `run` would use
    ShowConfig(RunArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct RunArgs {
    /// Scenario to run (repeatable); all scenarios when omitted
    #[arg(long = "scenario", value_name = "NAME")]
    pub scenarios: Vec<String>,
    /// Per-scenario timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    /// TOML configuration file
    #[arg(long, env = "XREALM_CONFIG")]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub primary_origin: Option<String>,
    #[arg(long)]
    pub cross_origin: Option<String>,
}

pub fn list_scenarios() -> String {
    let width = scenarios::all()
        .iter()
        .map(|scenario| scenario.name.len())
        .max()
        .unwrap_or(0);
    scenarios::all()
        .iter()
        .map(|scenario| format!("{:width$}  {}\n", scenario.name, scenario.description))
        .collect()
}

pub fn selected_scenarios(config: &RunnerConfig) -> Vec<&'static Scenario> {
    if config.scenarios.is_empty() {
        return scenarios::all().iter().collect();
    }
    config
        .scenarios
        .iter()
        .filter_map(|name| scenarios::find(name))
        .collect()
}

/// Runs the configured scenarios in order and returns their outcomes.
pub async fn run_scenarios(config: &RunnerConfig) -> Vec<TestOutcome> {
    let selected = selected_scenarios(config);
    info!(count = selected.len(), timeout_ms = config.timeout_ms, "running scenarios");

    let mut runner = TestRunner::new(Duration::from_millis(config.timeout_ms));
    for scenario in selected {
        runner.run_scenario(scenario, config.scenario_context()).await;
    }
    runner.into_outcomes()
}

pub fn summary(outcomes: &[TestOutcome]) -> String {
    let count = |status| outcomes.iter().filter(|outcome| outcome.status == status).count();
    format!(
        "{} passed, {} failed, {} timed out",
        count(TestStatus::Pass),
        count(TestStatus::Fail),
        count(TestStatus::Timeout)
    )
}
