// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Deep comparison of snapshots

use xrealm_proto::{Snapshot, SnapshotBody};

/// First difference found between an expected and an actual snapshot.
/// `path` lists the names from the compared root down to the node.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotMismatch {
    #[error("AssertionMismatch at '{path}': {field} expected {expected}, got {actual}")]
    Field {
        path: String,
        field: &'static str,
        expected: String,
        actual: String,
    },
    #[error("AssertionMismatch at '{path}': {collection} length expected {expected}, got {actual}")]
    Length {
        path: String,
        collection: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Succeeds when `actual` describes the same tree as `expected`.
pub fn assert_snapshots_equal(
    expected: &Snapshot,
    actual: &Snapshot,
) -> Result<(), SnapshotMismatch> {
    compare(&expected.name, expected, actual)
}

fn compare(path: &str, expected: &Snapshot, actual: &Snapshot) -> Result<(), SnapshotMismatch> {
    let field = |field: &'static str, expected: String, actual: String| {
        if expected == actual {
            Ok(())
        } else {
            Err(SnapshotMismatch::Field {
                path: path.to_string(),
                field,
                expected,
                actual,
            })
        }
    };

    field(
        "isFile",
        expected.is_file.to_string(),
        actual.is_file.to_string(),
    )?;
    field(
        "isDirectory",
        expected.is_directory.to_string(),
        actual.is_directory.to_string(),
    )?;
    field("name", format!("{:?}", expected.name), format!("{:?}", actual.name))?;
    field(
        "readPermission",
        expected.read_permission.to_string(),
        actual.read_permission.to_string(),
    )?;
    field(
        "writePermission",
        expected.write_permission.to_string(),
        actual.write_permission.to_string(),
    )?;

    match (&expected.body, &actual.body) {
        (SnapshotBody::File { content: left }, SnapshotBody::File { content: right }) => {
            field("content", format!("{:?}", left), format!("{:?}", right))
        }
        (
            SnapshotBody::Directory {
                files: left_files,
                directories: left_dirs,
            },
            SnapshotBody::Directory {
                files: right_files,
                directories: right_dirs,
            },
        ) => {
            compare_children(path, "files", left_files, right_files)?;
            compare_children(path, "directories", left_dirs, right_dirs)
        }
        (left, right) => field("kind", body_kind(left).into(), body_kind(right).into()),
    }
}

fn compare_children(
    path: &str,
    collection: &'static str,
    expected: &[Snapshot],
    actual: &[Snapshot],
) -> Result<(), SnapshotMismatch> {
    if expected.len() != actual.len() {
        return Err(SnapshotMismatch::Length {
            path: path.to_string(),
            collection,
            expected: expected.len(),
            actual: actual.len(),
        });
    }
    for (left, right) in expected.iter().zip(actual) {
        compare(&format!("{}/{}", path, left.name), left, right)?;
    }
    Ok(())
}

fn body_kind(body: &SnapshotBody) -> &'static str {
    match body {
        SnapshotBody::File { .. } => "file",
        SnapshotBody::Directory { .. } => "directory",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xrealm_host::PermissionState::{Denied, Granted, Prompt};

    fn file(name: &str, content: &str) -> Snapshot {
        Snapshot::file(name, Granted, Granted, content)
    }

    fn dir(name: &str, files: Vec<Snapshot>, directories: Vec<Snapshot>) -> Snapshot {
        Snapshot::directory(name, Granted, Granted, files, directories)
    }

    #[test]
    fn identical_trees_are_equal() {
        let tree = dir("root", vec![file("a", "1")], vec![dir("sub", vec![], vec![])]);
        assert_eq!(assert_snapshots_equal(&tree, &tree.clone()), Ok(()));
    }

    #[test]
    fn content_difference_names_field_and_values() {
        let err = assert_snapshots_equal(&file("a", "x"), &file("a", "y")).unwrap_err();
        assert_eq!(
            err,
            SnapshotMismatch::Field {
                path: "a".into(),
                field: "content",
                expected: "\"x\"".into(),
                actual: "\"y\"".into(),
            }
        );
    }

    #[test]
    fn permission_fields_are_checked_independently() {
        let expected = file("a", "");
        let mut actual = file("a", "");
        actual.write_permission = Prompt;
        let err = assert_snapshots_equal(&expected, &actual).unwrap_err();
        assert!(matches!(err, SnapshotMismatch::Field { field: "writePermission", .. }));

        actual.read_permission = Denied;
        let err = assert_snapshots_equal(&expected, &actual).unwrap_err();
        assert!(matches!(err, SnapshotMismatch::Field { field: "readPermission", .. }));
    }

    #[test]
    fn child_count_mismatch_reports_collection() {
        let expected = dir("d", vec![file("a", ""), file("b", "")], vec![]);
        let actual = dir("d", vec![file("a", "")], vec![]);
        assert_eq!(
            assert_snapshots_equal(&expected, &actual),
            Err(SnapshotMismatch::Length {
                path: "d".into(),
                collection: "files",
                expected: 2,
                actual: 1,
            })
        );
    }

    #[test]
    fn nested_mismatch_carries_path() {
        let expected = dir("d", vec![], vec![dir("sub", vec![file("f", "old")], vec![])]);
        let actual = dir("d", vec![], vec![dir("sub", vec![file("f", "new")], vec![])]);
        let err = assert_snapshots_equal(&expected, &actual).unwrap_err();
        assert!(matches!(
            &err,
            SnapshotMismatch::Field { path, field: "content", .. } if path == "d/sub/f"
        ));
        assert!(err.to_string().contains("d/sub/f"));
    }

    #[test]
    fn kind_flags_are_compared_first() {
        let err = assert_snapshots_equal(&file("x", ""), &dir("x", vec![], vec![])).unwrap_err();
        assert!(matches!(err, SnapshotMismatch::Field { field: "isFile", .. }));
    }
}
