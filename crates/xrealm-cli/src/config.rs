// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Runner configuration
//!
//! Layers, lowest precedence first: built-in defaults, the TOML file
//! (`--config`, else `xrealm.toml` in the working directory), `XREALM_*`
//! environment variables, then command line flags. Every layer is turned
//! into JSON and merged before the result is deserialized once.

use crate::RunArgs;
use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as J;
use std::path::{Path, PathBuf};
use xrealm_harness::scenarios::{self, ScenarioContext};
use xrealm_host::Origin;

pub const DEFAULT_CONFIG_FILE: &str = "xrealm.toml";
pub const ENV_PREFIX: &str = "XREALM";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RunnerConfig {
    /// Per-scenario timeout in milliseconds.
    pub timeout_ms: u64,
    pub primary_origin: String,
    pub cross_origin: String,
    /// Scenarios to run; empty means all of them.
    pub scenarios: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let context = ScenarioContext::default();
        Self {
            timeout_ms: 5000,
            primary_origin: context.primary_origin.as_str().to_string(),
            cross_origin: context.cross_origin.as_str().to_string(),
            scenarios: Vec::new(),
        }
    }
}

impl RunnerConfig {
    pub fn scenario_context(&self) -> ScenarioContext {
        ScenarioContext {
            primary_origin: Origin::new(self.primary_origin.as_str()),
            cross_origin: Origin::new(self.cross_origin.as_str()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.timeout_ms > 0, "timeout-ms must be greater than zero");
        for (key, origin) in [
            ("primary-origin", &self.primary_origin),
            ("cross-origin", &self.cross_origin),
        ] {
            ensure!(!origin.trim().is_empty(), "{} must not be empty", key);
        }
        let context = self.scenario_context();
        ensure!(
            context.primary_origin != context.cross_origin,
            "primary-origin and cross-origin are both '{}'",
            context.primary_origin
        );
        for name in &self.scenarios {
            if scenarios::find(name).is_none() {
                bail!("unknown scenario '{}' (see `xrealm list`)", name);
            }
        }
        Ok(())
    }
}

/// Resolves the configuration from the process environment.
pub fn resolve(args: &RunArgs) -> Result<RunnerConfig> {
    resolve_with_env(args, None)
}

/// Like [`resolve`], reading `XREALM_*` variables from `env` when given
/// instead of the process environment.
pub fn resolve_with_env(
    args: &RunArgs,
    env: Option<config::Map<String, String>>,
) -> Result<RunnerConfig> {
    let mut merged = serde_json::to_value(RunnerConfig::default())?;
    if let Some(path) = config_file(args) {
        merge_two_json(&mut merged, file_overlay(&path)?);
    }
    merge_two_json(&mut merged, env_overlay(env)?);
    merge_two_json(&mut merged, flags_overlay(args));

    let config: RunnerConfig =
        serde_json::from_value(merged).context("invalid runner configuration")?;
    config.validate()?;
    Ok(config)
}

fn config_file(args: &RunArgs) -> Option<PathBuf> {
    if let Some(path) = &args.config {
        return Some(path.clone());
    }
    let default = Path::new(DEFAULT_CONFIG_FILE);
    default.is_file().then(|| default.to_path_buf())
}

pub fn file_overlay(path: &Path) -> Result<J> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading config file {:?}", path))?;
    let table: toml::Value = content
        .parse()
        .with_context(|| format!("parsing config file {:?}", path))?;
    Ok(serde_json::to_value(table)?)
}

/// `XREALM_TIMEOUT_MS=100` becomes `timeout-ms = 100`; `XREALM_SCENARIOS`
/// is a comma separated list.
pub fn env_overlay(env: Option<config::Map<String, String>>) -> Result<J> {
    let built = config::Config::builder()
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .convert_case(config::Case::Kebab)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("scenarios")
                .source(env),
        )
        .build()?;
    Ok(serde_json::to_value(built.try_deserialize::<serde_json::Map<String, J>>()?)?)
}

pub fn flags_overlay(args: &RunArgs) -> J {
    let mut root = serde_json::Map::new();
    if let Some(timeout_ms) = args.timeout_ms {
        root.insert("timeout-ms".into(), timeout_ms.into());
    }
    if let Some(origin) = &args.primary_origin {
        root.insert("primary-origin".into(), origin.clone().into());
    }
    if let Some(origin) = &args.cross_origin {
        root.insert("cross-origin".into(), origin.clone().into());
    }
    if !args.scenarios.is_empty() {
        root.insert("scenarios".into(), args.scenarios.clone().into());
    }
    J::Object(root)
}

/// Objects merge key by key; anything else on the right replaces the left,
/// except `null` which leaves it alone.
fn merge_two_json(base: &mut J, layer: J) {
    match (base, layer) {
        (J::Object(a), J::Object(b)) => {
            for (k, v) in b {
                merge_two_json(a.entry(k).or_insert(J::Null), v);
            }
        }
        (_, J::Null) => {}
        (a, b) => *a = b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_layers_keep_existing_values() {
        let mut base = json!({ "timeout-ms": 10, "scenarios": ["a"] });
        merge_two_json(&mut base, json!({ "timeout-ms": null, "scenarios": ["b", "c"] }));
        assert_eq!(base, json!({ "timeout-ms": 10, "scenarios": ["b", "c"] }));
    }

    #[test]
    fn flags_only_carry_what_was_given() {
        let args = RunArgs {
            timeout_ms: Some(250),
            ..RunArgs::default()
        };
        assert_eq!(flags_overlay(&args), json!({ "timeout-ms": 250 }));
        assert_eq!(flags_overlay(&RunArgs::default()), json!({}));
    }

    #[test]
    fn defaults_are_valid() {
        RunnerConfig::default().validate().unwrap();
    }

    #[test]
    fn trailing_slash_does_not_make_origins_distinct() {
        let config = RunnerConfig {
            cross_origin: format!("{}/", RunnerConfig::default().primary_origin),
            ..RunnerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("are both"), "unexpected error: {}", err);
    }
}
