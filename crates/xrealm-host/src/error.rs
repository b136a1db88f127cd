// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for the xrealm host

use crate::Origin;
use std::io;

/// File-system error type
#[derive(thiserror::Error, Debug)]
pub enum FsError {
    #[error("NotFoundError: '{0}' does not exist")]
    NotFound(String),
    #[error("TypeMismatchError: '{name}' is not a {expected}")]
    TypeMismatch { name: String, expected: &'static str },
    #[error("TypeError: name not allowed: '{0}'")]
    InvalidName(String),
    #[error("NotAllowedError: {mode} permission for '{name}' is not granted")]
    NotAllowed { name: String, mode: &'static str },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type FsResult<T> = Result<T, FsError>;

/// Failure of the structured-clone step. Raised to the sender when
/// serialization fails and surfaced as a `messageerror` event when the
/// receiving context cannot materialize the value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DataCloneError {
    #[error("DataCloneError: {kind} handle '{name}' from {from} cannot be deserialized in {to}")]
    CrossOrigin {
        kind: &'static str,
        name: String,
        from: Origin,
        to: Origin,
    },
}

/// Transport-level error returned by `post_message` and listeners.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error(transparent)]
    DataClone(#[from] DataCloneError),
    #[error("InvalidStateError: '{0}' is already being listened to")]
    AlreadyListening(String),
    #[error("InvalidStateError: '{0}' is closed")]
    Closed(String),
}

pub type TransportResult<T> = Result<T, TransportError>;
