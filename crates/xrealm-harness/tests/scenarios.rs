// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::time::Duration;
use xrealm_harness::scenarios::{self, ScenarioContext};
use xrealm_harness::{TestRunner, TestStatus};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn every_scenario_passes() {
    xrealm_logging::init_for_tests();
    let mut runner = TestRunner::new(TIMEOUT);
    for scenario in scenarios::all() {
        runner.run_scenario(scenario, ScenarioContext::default()).await;
    }

    let failures: Vec<String> = runner
        .outcomes()
        .iter()
        .filter(|outcome| outcome.status != TestStatus::Pass)
        .map(|outcome| outcome.to_string())
        .collect();
    assert!(failures.is_empty(), "failing scenarios: {:#?}", failures);
    assert_eq!(runner.outcomes().len(), scenarios::all().len());
    assert!(runner.all_passed());
}

#[tokio::test]
async fn scenario_names_are_unique_and_findable() {
    let all = scenarios::all();
    for scenario in all {
        let found = scenarios::find(scenario.name).expect("scenario should be findable");
        assert_eq!(found.name, scenario.name);
        assert_eq!(all.iter().filter(|other| other.name == scenario.name).count(), 1);
    }
    assert!(scenarios::find("no-such-scenario").is_none());
}

#[tokio::test]
async fn cross_origin_scenario_rejects_identical_origins() {
    let context = ScenarioContext {
        cross_origin: ScenarioContext::default().primary_origin,
        ..ScenarioContext::default()
    };
    let scenario = scenarios::find("cross-origin-window").expect("scenario exists");
    let mut runner = TestRunner::new(TIMEOUT);

    assert_eq!(runner.run_scenario(scenario, context).await, TestStatus::Fail);
    let message = runner.outcomes()[0].message.clone().unwrap_or_default();
    assert!(message.contains("must differ"), "unexpected message: {}", message);
}
