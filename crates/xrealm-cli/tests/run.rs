// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use xrealm_cli::{list_scenarios, run_scenarios, summary, RunnerConfig};
use xrealm_harness::TestStatus;

#[test]
fn listing_names_every_scenario() {
    let listing = list_scenarios();
    for scenario in xrealm_harness::scenarios::all() {
        assert!(listing.contains(scenario.name), "{} missing from listing", scenario.name);
    }
}

#[tokio::test]
async fn selected_scenarios_run_in_order() {
    let config = RunnerConfig {
        scenarios: vec!["unknown-message-type".to_string(), "remote-created-file".to_string()],
        ..RunnerConfig::default()
    };
    let outcomes = run_scenarios(&config).await;

    let names: Vec<&str> = outcomes.iter().map(|outcome| outcome.name.as_str()).collect();
    assert_eq!(names, vec!["unknown-message-type", "remote-created-file"]);
    assert!(outcomes.iter().all(|outcome| outcome.status == TestStatus::Pass));
    assert_eq!(summary(&outcomes), "2 passed, 0 failed, 0 timed out");
}
