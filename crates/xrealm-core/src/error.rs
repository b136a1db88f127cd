// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for xrealm core

use xrealm_host::{FsError, HandleKind, TransportError};

/// Failure to turn a value into a [`Snapshot`](xrealm_proto::Snapshot).
#[derive(thiserror::Error, Debug)]
pub enum SerializeError {
    #[error("HandleKindMismatch: expected a file or directory handle, got {found}")]
    HandleKindMismatch { found: &'static str },
    #[error("HandleSerializationError: {kind} '{name}': {source}")]
    HandleSerialization {
        kind: HandleKind,
        name: String,
        #[source]
        source: FsError,
    },
}

pub type SerializeResult<T> = Result<T, SerializeError>;

/// Anything that can go wrong while a router handles one message. The
/// `Display` text is what the peer receives after `ERROR: `.
#[derive(thiserror::Error, Debug)]
pub enum RouterError {
    #[error("Unknown message type: '{0}'")]
    UnknownMessageType(String),
    #[error(transparent)]
    Serialize(#[from] SerializeError),
    #[error(transparent)]
    FileSystem(#[from] FsError),
    #[error("PortAlreadyStarted: {0} already delivers to another listener")]
    PortAlreadyStarted(String),
    #[error("TransportDeliveryFailure: {0}")]
    TransportDeliveryFailure(#[from] TransportError),
    #[error("no reply destination: event has no source and no reply target is configured")]
    NoReplyDestination,
}

pub type RouterResult<T> = Result<T, RouterError>;
