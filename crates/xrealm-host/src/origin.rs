// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Origins and execution-context identity

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Trust domain that scopes storage and structured-clone eligibility
/// (e.g. `https://primary.test`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Origin(String);

impl Origin {
    pub fn new(origin: impl Into<String>) -> Self {
        let origin = origin.into();
        Self(origin.trim_end_matches('/').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Origin {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Origin {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Delivery restriction for window `post_message`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetOrigin {
    /// `"*"`: deliver regardless of the receiver's origin
    Any,
    Exact(Origin),
}

impl TargetOrigin {
    pub fn parse(value: &str) -> Self {
        if value == "*" {
            Self::Any
        } else {
            Self::Exact(Origin::new(value))
        }
    }

    pub fn matches(&self, origin: &Origin) -> bool {
        match self {
            TargetOrigin::Any => true,
            TargetOrigin::Exact(expected) => expected == origin,
        }
    }
}

impl std::fmt::Display for TargetOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetOrigin::Any => f.write_str("*"),
            TargetOrigin::Exact(origin) => write!(f, "{}", origin),
        }
    }
}

/// Opaque execution-context identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(pub u64);

impl ContextId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContextKind {
    Window,
    DedicatedWorker,
}

impl std::fmt::Display for ContextKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextKind::Window => write!(f, "window"),
            ContextKind::DedicatedWorker => write!(f, "dedicated-worker"),
        }
    }
}

/// Identity of one isolated execution context. Values cross contexts only
/// through structured clone; this type is what a clone is materialized into.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    id: ContextId,
    kind: ContextKind,
    origin: Origin,
    label: String,
}

impl ExecutionContext {
    pub(crate) fn new(kind: ContextKind, origin: Origin, label: impl Into<String>) -> Self {
        Self {
            id: ContextId::next(),
            kind,
            origin,
            label: label.into(),
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl PartialEq for ExecutionContext {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ExecutionContext {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_strips_trailing_slash() {
        assert_eq!(Origin::new("https://a.test/"), Origin::new("https://a.test"));
        assert_eq!(Origin::new("https://a.test/").to_string(), "https://a.test");
    }

    #[test]
    fn target_origin_matching() {
        let origin = Origin::new("https://a.test");
        assert!(TargetOrigin::parse("*").matches(&origin));
        assert!(TargetOrigin::parse("https://a.test").matches(&origin));
        assert!(!TargetOrigin::parse("https://b.test").matches(&origin));
    }

    #[test]
    fn contexts_get_distinct_ids() {
        let a = ExecutionContext::new(ContextKind::Window, Origin::new("https://a.test"), "a");
        let b = ExecutionContext::new(ContextKind::Window, Origin::new("https://a.test"), "b");
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }
}
