// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::io::Write;
use xrealm_cli::config::{resolve_with_env, RunnerConfig};
use xrealm_cli::{selected_scenarios, Cli, Commands, Parser, RunArgs};

fn env(pairs: &[(&str, &str)]) -> config::Map<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn defaults_apply_without_layers() {
    let config = resolve_with_env(&RunArgs::default(), Some(env(&[]))).unwrap();
    assert_eq!(config, RunnerConfig::default());
    assert_eq!(selected_scenarios(&config).len(), xrealm_harness::scenarios::all().len());
}

#[test]
fn layers_apply_in_precedence_order() {
    let file = write_config(
        r#"
timeout-ms = 1000
primary-origin = "https://file.test"
scenarios = ["window-post-message"]
"#,
    );
    let args = RunArgs {
        config: Some(file.path().to_path_buf()),
        cross_origin: Some("https://flag.test".to_string()),
        ..RunArgs::default()
    };
    let config = resolve_with_env(
        &args,
        Some(env(&[
            ("XREALM_TIMEOUT_MS", "750"),
            ("XREALM_CROSS_ORIGIN", "https://env.test"),
        ])),
    )
    .unwrap();

    assert_eq!(config.timeout_ms, 750);
    assert_eq!(config.primary_origin, "https://file.test");
    assert_eq!(config.cross_origin, "https://flag.test");
    assert_eq!(config.scenarios, vec!["window-post-message"]);
}

#[test]
fn env_scenarios_are_comma_separated() {
    let config = resolve_with_env(
        &RunArgs::default(),
        Some(env(&[("XREALM_SCENARIOS", "message-port,broadcast-channel")])),
    )
    .unwrap();
    let names: Vec<&str> = selected_scenarios(&config).iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["message-port", "broadcast-channel"]);
}

#[test]
fn unknown_scenarios_are_rejected() {
    let args = RunArgs {
        scenarios: vec!["no-such-scenario".to_string()],
        ..RunArgs::default()
    };
    let err = resolve_with_env(&args, Some(env(&[]))).unwrap_err();
    assert!(err.to_string().contains("no-such-scenario"), "unexpected error: {}", err);
}

#[test]
fn zero_timeout_is_rejected() {
    let args = RunArgs {
        timeout_ms: Some(0),
        ..RunArgs::default()
    };
    assert!(resolve_with_env(&args, Some(env(&[]))).is_err());
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let args = RunArgs {
        config: Some(dir.path().join("absent.toml")),
        ..RunArgs::default()
    };
    let err = resolve_with_env(&args, Some(env(&[]))).unwrap_err();
    assert!(format!("{:#}", err).contains("reading config file"));
}

#[test]
fn run_flags_parse() {
    let cli = Cli::try_parse_from([
        "xrealm",
        "run",
        "--scenario",
        "message-port",
        "--scenario",
        "dedicated-worker",
        "--timeout-ms",
        "200",
    ])
    .unwrap();
    let Commands::Run(args) = cli.command else {
        panic!("expected the run subcommand");
    };
    assert_eq!(args.scenarios, vec!["message-port", "dedicated-worker"]);
    assert_eq!(args.timeout_ms, Some(200));
}
