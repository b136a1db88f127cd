// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Fault injection for the origin-private file system
//!
//! Lets tests make content reads, permission queries or directory listings
//! fail on demand so the I/O error paths of handle serialization can be
//! exercised without a real disk.

use crate::FsError;
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::{Mutex, PoisonError};

/// Operations that can be made to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaultOp {
    ReadContent,
    QueryPermission,
    ListEntries,
}

impl std::fmt::Display for FaultOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaultOp::ReadContent => write!(f, "read-content"),
            FaultOp::QueryPermission => write!(f, "query-permission"),
            FaultOp::ListEntries => write!(f, "list-entries"),
        }
    }
}

/// Which op should fail and how often.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultRule {
    pub op: FaultOp,
    /// Number of leading invocations to let through before failing.
    #[serde(default)]
    pub start_after: u64,
    /// Maximum number of injected failures; unlimited when absent.
    #[serde(default)]
    pub max_faults: Option<u64>,
}

impl FaultRule {
    pub fn always(op: FaultOp) -> Self {
        Self {
            op,
            start_after: 0,
            max_faults: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct RuleCounters {
    hits: u64,
    invocations: u64,
}

#[derive(Debug, Default)]
struct FaultState {
    rules: Vec<FaultRule>,
    counters: Vec<RuleCounters>,
}

/// Runtime controller shared by every handle of one file system.
#[derive(Debug, Default)]
pub struct FaultInjector {
    state: Mutex<FaultState>,
}

impl FaultInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rules(&self, rules: Vec<FaultRule>) {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        guard.counters = vec![RuleCounters::default(); rules.len()];
        guard.rules = rules;
    }

    pub fn add_rule(&self, rule: FaultRule) {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        guard.rules.push(rule);
        guard.counters.push(RuleCounters::default());
    }

    pub fn clear(&self) {
        self.set_rules(Vec::new());
    }

    /// Returns the error to raise for this invocation of `op`, if any.
    pub fn check(&self, op: FaultOp) -> Result<(), FsError> {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let FaultState { rules, counters } = &mut *guard;
        for (rule, counters) in rules.iter().zip(counters.iter_mut()) {
            if rule.op != op {
                continue;
            }
            counters.invocations = counters.invocations.saturating_add(1);
            if counters.invocations <= rule.start_after {
                continue;
            }
            if let Some(max) = rule.max_faults {
                if counters.hits >= max {
                    continue;
                }
            }
            counters.hits = counters.hits.saturating_add(1);
            return Err(FsError::Io(io::Error::other(format!("injected fault: {}", op))));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injector_respects_start_and_max_hits() {
        let injector = FaultInjector::new();
        injector.set_rules(vec![FaultRule {
            op: FaultOp::ReadContent,
            start_after: 1,
            max_faults: Some(2),
        }]);

        // First call skipped due to start_after
        assert!(injector.check(FaultOp::ReadContent).is_ok());
        assert!(injector.check(FaultOp::ReadContent).is_err());
        assert!(injector.check(FaultOp::ReadContent).is_err());
        // Max hits reached
        assert!(injector.check(FaultOp::ReadContent).is_ok());
    }

    #[test]
    fn rules_only_match_their_op() {
        let injector = FaultInjector::new();
        injector.add_rule(FaultRule::always(FaultOp::QueryPermission));
        assert!(injector.check(FaultOp::ReadContent).is_ok());
        let err = injector.check(FaultOp::QueryPermission).unwrap_err();
        assert!(err.to_string().contains("query-permission"));

        injector.clear();
        assert!(injector.check(FaultOp::QueryPermission).is_ok());
    }

    #[test]
    fn rule_parses_from_json() {
        let rule: FaultRule =
            serde_json::from_str(r#"{ "op": "list-entries", "max_faults": 1 }"#).unwrap();
        assert_eq!(rule.op, FaultOp::ListEntries);
        assert_eq!(rule.start_after, 0);
        assert_eq!(rule.max_faults, Some(1));
    }
}
