// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::process::ExitCode;
use xrealm_cli::{config, list_scenarios, run_scenarios, summary, Cli, Commands, Parser};
use xrealm_harness::TestStatus;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    cli.logging.init("xrealm")?;

    match cli.command {
        Commands::List => {
            print!("{}", list_scenarios());
            Ok(ExitCode::SUCCESS)
        }
        Commands::ShowConfig(args) => {
            let config = config::resolve(&args)?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run(args) => {
            let config = config::resolve(&args)?;
            let outcomes = run_scenarios(&config).await;
            for outcome in &outcomes {
                println!("{}", outcome);
            }
            println!("{}", summary(&outcomes));

            let passed = outcomes.iter().all(|outcome| outcome.status == TestStatus::Pass);
            Ok(if passed { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}
