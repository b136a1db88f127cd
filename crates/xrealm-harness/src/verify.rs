// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Assertions shared by the scenarios

use anyhow::{ensure, Context, Result};
use xrealm_core::{assert_snapshots_equal, serialize_handle};
use xrealm_host::{FileSystemHandle, Origin};
use xrealm_proto::{SerializedHandle, SerializedMessageErrorEvent};

/// Checks a `receive-serialized-file-system-handles` batch against the
/// handles that were sent, index by index.
pub async fn verify_round_trip(
    originals: &[FileSystemHandle],
    returned: &[SerializedHandle],
) -> Result<()> {
    ensure!(
        originals.len() == returned.len(),
        "sent {} handles but {} came back",
        originals.len(),
        returned.len()
    );

    for (index, (original, returned)) in originals.iter().zip(returned).enumerate() {
        ensure!(
            !returned.handle.same_instance(original),
            "handle {} ('{}') came back as the same instance",
            index,
            original.name()
        );

        let expected = serialize_handle(original)
            .await
            .with_context(|| format!("serializing original handle {}", index))?;
        let local = serialize_handle(&returned.handle)
            .await
            .with_context(|| format!("serializing returned handle {}", index))?;
        assert_snapshots_equal(&expected, &local)
            .with_context(|| format!("returned handle {} differs from the original", index))?;
        assert_snapshots_equal(&expected, &returned.serialized)
            .with_context(|| format!("remote snapshot {} differs from the original", index))?;
    }
    Ok(())
}

/// A handle the remote created must refer to the same entry as the one the
/// driver looked up, while being a separate instance with an equal
/// snapshot.
pub async fn verify_same_entry(remote: &FileSystemHandle, local: &FileSystemHandle) -> Result<()> {
    ensure!(
        remote.kind() == local.kind(),
        "remote handle is a {} but the local one is a {}",
        remote.kind(),
        local.kind()
    );
    ensure!(
        remote.is_same_entry(local),
        "remote '{}' and local '{}' are different entries",
        remote.name(),
        local.name()
    );
    ensure!(!remote.same_instance(local), "remote handle was not cloned");

    let expected = serialize_handle(local).await.context("serializing local handle")?;
    let actual = serialize_handle(remote).await.context("serializing remote handle")?;
    assert_snapshots_equal(&expected, &actual).context("remote handle snapshot")?;
    Ok(())
}

/// `expected_origin` and `expected_has_source` depend on the transport the
/// failed message travelled over: windows report the sender's origin and a
/// source, ports and workers neither.
pub fn verify_message_error(
    event: &SerializedMessageErrorEvent,
    expected_origin: &Origin,
    expected_has_source: bool,
) -> Result<()> {
    ensure!(event.data.is_null(), "messageerror data is {} (expected null)", event.data);
    ensure!(
        event.origin == expected_origin.as_str(),
        "messageerror origin is '{}' (expected '{}')",
        event.origin,
        expected_origin
    );
    ensure!(
        event.last_event_id.is_empty(),
        "messageerror last_event_id is '{}'",
        event.last_event_id
    );
    ensure!(
        event.has_source == expected_has_source,
        "messageerror has_source is {} (expected {})",
        event.has_source,
        expected_has_source
    );
    ensure!(
        event.ports_length == 0,
        "messageerror carries {} ports",
        event.ports_length
    );
    Ok(())
}
