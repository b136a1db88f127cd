// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Promise-test style runner
//!
//! Each test body runs in its own tokio task under a timeout. An `Err`
//! or a panic is a failure; running out of time is reported separately and
//! the task is aborted.

use crate::scenarios::{Scenario, ScenarioContext};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestStatus {
    Pass,
    Fail,
    Timeout,
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestStatus::Pass => write!(f, "PASS"),
            TestStatus::Fail => write!(f, "FAIL"),
            TestStatus::Timeout => write!(f, "TIMEOUT"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TestOutcome {
    pub name: String,
    pub status: TestStatus,
    pub message: Option<String>,
    pub elapsed: Duration,
}

impl std::fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status, self.name)?;
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

pub struct TestRunner {
    timeout: Duration,
    outcomes: Vec<TestOutcome>,
}

impl TestRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            outcomes: Vec::new(),
        }
    }

    /// Runs one test body to completion, failure or timeout.
    pub async fn promise_test<Fut>(&mut self, name: &str, body: Fut) -> TestStatus
    where
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let started = Instant::now();
        let mut task = tokio::spawn(body);
        let (status, message) = match tokio::time::timeout(self.timeout, &mut task).await {
            Err(_) => {
                task.abort();
                (
                    TestStatus::Timeout,
                    Some(format!("no result within {} ms", self.timeout.as_millis())),
                )
            }
            Ok(Ok(Ok(()))) => (TestStatus::Pass, None),
            Ok(Ok(Err(err))) => (TestStatus::Fail, Some(format!("{:#}", err))),
            Ok(Err(join_error)) => (
                TestStatus::Fail,
                Some(format!("test panicked: {}", join_error)),
            ),
        };

        let outcome = TestOutcome {
            name: name.to_string(),
            status,
            message,
            elapsed: started.elapsed(),
        };
        match status {
            TestStatus::Pass => {
                info!(test = name, elapsed_ms = outcome.elapsed.as_millis() as u64, "passed")
            }
            _ => {
                let message = outcome.message.as_deref().unwrap_or("");
                warn!(test = name, %status, message, "did not pass")
            }
        }
        self.outcomes.push(outcome);
        status
    }

    pub async fn run_scenario(
        &mut self,
        scenario: &Scenario,
        context: ScenarioContext,
    ) -> TestStatus {
        self.promise_test(scenario.name, scenario.run(context)).await
    }

    pub fn outcomes(&self) -> &[TestOutcome] {
        &self.outcomes
    }

    pub fn all_passed(&self) -> bool {
        self.outcomes
            .iter()
            .all(|outcome| outcome.status == TestStatus::Pass)
    }

    pub fn into_outcomes(self) -> Vec<TestOutcome> {
        self.outcomes
    }
}
