// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! In-process host for cross-realm messaging
//!
//! Models the pieces of a user agent that file-system handle messaging
//! depends on: origins, isolated realms (windows and dedicated workers), an
//! origin-private file system with permission state, structured clone, and
//! the message transports (window proxies, workers, message ports and
//! broadcast channels).

pub mod clone;
pub mod error;
pub mod fs;
pub mod host;
pub mod origin;
pub mod transport;

pub use clone::{structured_clone, StructuredClone};
pub use error::{DataCloneError, FsError, FsResult, TransportError, TransportResult};
pub use fs::{
    DirectoryHandle, FaultInjector, FaultOp, FaultRule, FileHandle, FileSystem, FileSystemHandle,
    HandleId, HandleKind, PermissionMode, PermissionState,
};
pub use host::{Host, Realm};
pub use origin::{ContextId, ContextKind, ExecutionContext, Origin, TargetOrigin};
pub use transport::{
    BroadcastChannel, Endpoint, Event, EventReceiver, MessageChannel, MessageErrorEvent,
    MessageEvent, MessagePort, MessageTarget, PostOptions, WindowProxy, Worker, WorkerParent,
};
