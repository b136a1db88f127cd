// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Driver side of the xrealm conformance kit
//!
//! The scenarios in this crate are used both by the `xrealm` binary and by
//! the crate's own tests, so coverage is identical on both paths.

pub mod fixtures;
pub mod remote;
pub mod runner;
pub mod scenarios;
pub mod verify;
pub mod wait;

pub use remote::{Link, Remote};
pub use runner::{TestOutcome, TestRunner, TestStatus};
pub use scenarios::{Scenario, ScenarioContext};
