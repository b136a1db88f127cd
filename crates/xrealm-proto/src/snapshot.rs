// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use serde::{Deserialize, Serialize};
use xrealm_host::PermissionState;

/// Plain, comparable rendering of a file-system handle at one point in
/// time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub is_file: bool,
    pub is_directory: bool,
    pub name: String,
    pub read_permission: PermissionState,
    pub write_permission: PermissionState,
    #[serde(flatten)]
    pub body: SnapshotBody,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotBody {
    File {
        content: String,
    },
    /// Children split by kind, each sorted by name.
    Directory {
        files: Vec<Snapshot>,
        directories: Vec<Snapshot>,
    },
}

impl Snapshot {
    pub fn file(
        name: impl Into<String>,
        read_permission: PermissionState,
        write_permission: PermissionState,
        content: impl Into<String>,
    ) -> Self {
        Self {
            is_file: true,
            is_directory: false,
            name: name.into(),
            read_permission,
            write_permission,
            body: SnapshotBody::File {
                content: content.into(),
            },
        }
    }

    pub fn directory(
        name: impl Into<String>,
        read_permission: PermissionState,
        write_permission: PermissionState,
        files: Vec<Snapshot>,
        directories: Vec<Snapshot>,
    ) -> Self {
        Self {
            is_file: false,
            is_directory: true,
            name: name.into(),
            read_permission,
            write_permission,
            body: SnapshotBody::Directory { files, directories },
        }
    }

    pub fn content(&self) -> Option<&str> {
        match &self.body {
            SnapshotBody::File { content } => Some(content),
            SnapshotBody::Directory { .. } => None,
        }
    }

    pub fn files(&self) -> &[Snapshot] {
        match &self.body {
            SnapshotBody::Directory { files, .. } => files,
            SnapshotBody::File { .. } => &[],
        }
    }

    pub fn directories(&self) -> &[Snapshot] {
        match &self.body {
            SnapshotBody::Directory { directories, .. } => directories,
            SnapshotBody::File { .. } => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use PermissionState::Granted;

    #[test]
    fn file_snapshot_wire_shape() {
        let snapshot = Snapshot::file("a.txt", Granted, Granted, "hello");
        assert_eq!(
            serde_json::to_value(&snapshot).unwrap(),
            json!({
                "isFile": true,
                "isDirectory": false,
                "name": "a.txt",
                "readPermission": "granted",
                "writePermission": "granted",
                "content": "hello",
            })
        );
    }

    #[test]
    fn directory_snapshot_parses_from_wire() {
        let parsed: Snapshot = serde_json::from_value(json!({
            "isFile": false,
            "isDirectory": true,
            "name": "dir",
            "readPermission": "granted",
            "writePermission": "prompt",
            "files": [{
                "isFile": true,
                "isDirectory": false,
                "name": "a",
                "readPermission": "granted",
                "writePermission": "granted",
                "content": "",
            }],
            "directories": [],
        }))
        .unwrap();

        assert_eq!(parsed.files().len(), 1);
        assert_eq!(parsed.files()[0].content(), Some(""));
        assert!(parsed.directories().is_empty());
        assert_eq!(parsed.write_permission, PermissionState::Prompt);
    }
}
