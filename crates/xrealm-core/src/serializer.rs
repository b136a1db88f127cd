// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Handle → [`Snapshot`] serialization
//!
//! Snapshots are read-only views: permission state is queried, file
//! content is read in full and directories are walked recursively. The
//! child order reported by the file system is not trusted; each kind is
//! sorted by name so two snapshots of the same tree compare equal.

use crate::error::{SerializeError, SerializeResult};
use futures::future::{BoxFuture, FutureExt};
use xrealm_host::{FileSystemHandle, FsError, PermissionMode};
use xrealm_proto::{CloneValue, Snapshot};

/// The handle inside `value`, or `HandleKindMismatch`.
pub fn expect_handle(value: &CloneValue) -> SerializeResult<&FileSystemHandle> {
    match value {
        CloneValue::Handle(handle) => Ok(handle),
        CloneValue::Text(_) => Err(SerializeError::HandleKindMismatch { found: "string" }),
        CloneValue::Null => Err(SerializeError::HandleKindMismatch { found: "null" }),
    }
}

pub async fn serialize_value(value: &CloneValue) -> SerializeResult<Snapshot> {
    serialize_handle(expect_handle(value)?).await
}

/// Snapshot of `handle` and, for directories, everything below it.
pub fn serialize_handle(handle: &FileSystemHandle) -> BoxFuture<'_, SerializeResult<Snapshot>> {
    async move {
        let failed = |source: FsError| SerializeError::HandleSerialization {
            kind: handle.kind(),
            name: handle.name().to_string(),
            source,
        };

        let read_permission = handle
            .query_permission(PermissionMode::Read)
            .await
            .map_err(failed)?;
        let write_permission = handle
            .query_permission(PermissionMode::ReadWrite)
            .await
            .map_err(failed)?;

        match handle {
            FileSystemHandle::File(file) => {
                let content = file.read_text().await.map_err(failed)?;
                Ok(Snapshot::file(handle.name(), read_permission, write_permission, content))
            }
            FileSystemHandle::Directory(directory) => {
                let children = directory.entries().await.map_err(failed)?;
                let mut files = Vec::new();
                let mut directories = Vec::new();
                for child in &children {
                    let snapshot = serialize_handle(child).await?;
                    if child.is_file() {
                        files.push(snapshot);
                    } else {
                        directories.push(snapshot);
                    }
                }
                files.sort_by(|a, b| a.name.cmp(&b.name));
                directories.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(Snapshot::directory(
                    handle.name(),
                    read_permission,
                    write_permission,
                    files,
                    directories,
                ))
            }
        }
    }
    .boxed()
}

/// Snapshots of a batch, preserving order and duplicates.
pub async fn serialize_handles(handles: &[FileSystemHandle]) -> SerializeResult<Vec<Snapshot>> {
    let mut snapshots = Vec::with_capacity(handles.len());
    for handle in handles {
        snapshots.push(serialize_handle(handle).await?);
    }
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xrealm_host::{FaultOp, FaultRule, FileSystem, Origin, PermissionState};

    fn fs() -> FileSystem {
        FileSystem::new(Origin::new("https://a.test"))
    }

    #[tokio::test]
    async fn file_snapshot_has_all_fields() {
        let fs = fs();
        let file = fs.root().get_file_handle("a.txt", true).await.unwrap();
        file.write("hello").await.unwrap();

        let snapshot = serialize_handle(&file.into()).await.unwrap();
        assert_eq!(
            snapshot,
            Snapshot::file(
                "a.txt",
                PermissionState::Granted,
                PermissionState::Granted,
                "hello"
            )
        );
        assert_eq!(
            serde_json::to_value(&snapshot).unwrap(),
            serde_json::json!({
                "isFile": true,
                "isDirectory": false,
                "name": "a.txt",
                "readPermission": "granted",
                "writePermission": "granted",
                "content": "hello",
            })
        );
    }

    #[tokio::test]
    async fn children_are_partitioned_and_sorted() {
        let fs = fs();
        let dir = fs.root().get_directory_handle("d", true).await.unwrap();
        for name in ["b", "c", "a"] {
            dir.get_file_handle(name, true).await.unwrap();
        }
        for name in ["z", "m"] {
            dir.get_directory_handle(name, true).await.unwrap();
        }

        let snapshot = serialize_handle(&dir.into()).await.unwrap();
        let files: Vec<_> = snapshot.files().iter().map(|s| s.name.as_str()).collect();
        let directories: Vec<_> = snapshot
            .directories()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(files, ["a", "b", "c"]);
        assert_eq!(directories, ["m", "z"]);
        assert!(snapshot.is_directory && !snapshot.is_file);
    }

    #[tokio::test]
    async fn permission_state_is_captured() {
        let fs = fs();
        let handle: FileSystemHandle = fs.root().get_file_handle("p", true).await.unwrap().into();
        fs.set_permission(&handle, PermissionMode::ReadWrite, PermissionState::Prompt)
            .unwrap();

        let snapshot = serialize_handle(&handle).await.unwrap();
        assert_eq!(snapshot.read_permission, PermissionState::Granted);
        assert_eq!(snapshot.write_permission, PermissionState::Prompt);
    }

    #[tokio::test]
    async fn non_handles_are_rejected() {
        let err = serialize_value(&CloneValue::Text("x".into())).await.unwrap_err();
        assert!(matches!(err, SerializeError::HandleKindMismatch { found: "string" }));
        assert!(err.to_string().starts_with("HandleKindMismatch"));
    }

    #[tokio::test]
    async fn io_failures_name_the_handle() {
        let fs = fs();
        let dir = fs.root().get_directory_handle("outer", true).await.unwrap();
        dir.get_file_handle("inner.txt", true).await.unwrap();
        fs.faults().add_rule(FaultRule::always(FaultOp::ReadContent));

        let err = serialize_handle(&dir.into()).await.unwrap_err();
        match &err {
            SerializeError::HandleSerialization { kind, name, .. } => {
                assert_eq!(kind.as_str(), "file");
                assert_eq!(name, "inner.txt");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("injected fault"));
    }

    #[tokio::test]
    async fn batches_keep_order_and_duplicates() {
        let fs = fs();
        let root = fs.root();
        let a: FileSystemHandle = root.get_file_handle("a", true).await.unwrap().into();
        let b: FileSystemHandle = root.get_directory_handle("b", true).await.unwrap().into();

        let snapshots = serialize_handles(&[a.clone(), b.clone(), a.clone()]).await.unwrap();
        let names: Vec<_> = snapshots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "a"]);
    }
}
