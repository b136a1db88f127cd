// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! xrealm core: snapshotting file-system handles and routing envelopes
//! between realms.

pub mod comparator;
pub mod error;
pub mod router;
pub mod serializer;

pub use comparator::{assert_snapshots_equal, SnapshotMismatch};
pub use error::{RouterError, RouterResult, SerializeError, SerializeResult};
pub use router::{
    attach_router, resolve_reply_destination, RouterConfig, CREATED_DIRECTORY_NAME,
    CREATED_FILE_NAME,
};
pub use serializer::{expect_handle, serialize_handle, serialize_handles, serialize_value};
