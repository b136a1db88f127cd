// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! xrealm protocol: tagged envelopes exchanged between realms
//!
//! Envelopes carry live handles and ports, so they are never decoded from
//! bytes; they travel by structured clone. The JSON rendering produced by
//! `serde` is the documented wire shape and is what logs show.

pub mod messages;
pub mod snapshot;

pub use messages::{
    CloneValue, Envelope, EnvelopeType, Message, SerializedHandle, SerializedMessageErrorEvent,
    UnrecognizedEnvelope,
};
pub use snapshot::{Snapshot, SnapshotBody};
