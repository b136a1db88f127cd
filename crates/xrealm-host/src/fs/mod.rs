// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Origin-private in-memory file system
//!
//! Each origin owns one tree. Nodes are addressed by [`EntryId`]; handles
//! are thin references (entry + kind + name) into the tree, so many handle
//! instances can point at the same entry.

pub mod fault;
mod handle;

pub use fault::{FaultInjector, FaultOp, FaultRule};
pub use handle::{
    DirectoryHandle, FileHandle, FileSystemHandle, HandleId, HandleKind, PermissionMode,
    PermissionState,
};

use crate::error::{FsError, FsResult};
use crate::Origin;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Internal node identifier, stable for the lifetime of the entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntryId(u64);

#[derive(Debug)]
enum NodeKind {
    File {
        content: Vec<u8>,
    },
    Directory {
        // HashMap on purpose: enumeration order is unspecified
        children: HashMap<String, EntryId>,
    },
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    read: PermissionState,
    write: PermissionState,
}

#[derive(Debug)]
struct FsState {
    nodes: HashMap<EntryId, Node>,
    next_entry: u64,
}

struct FsInner {
    origin: Origin,
    root: EntryId,
    state: Mutex<FsState>,
    faults: FaultInjector,
}

/// Shared, cheaply cloneable reference to one origin's file system.
#[derive(Clone)]
pub struct FileSystem {
    inner: Arc<FsInner>,
}

impl std::fmt::Debug for FileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystem").field("origin", &self.inner.origin).finish()
    }
}

impl FileSystem {
    pub fn new(origin: Origin) -> Self {
        let root = EntryId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                kind: NodeKind::Directory {
                    children: HashMap::new(),
                },
                read: PermissionState::Granted,
                write: PermissionState::Granted,
            },
        );
        Self {
            inner: Arc::new(FsInner {
                origin,
                root,
                state: Mutex::new(FsState {
                    nodes,
                    next_entry: 1,
                }),
                faults: FaultInjector::new(),
            }),
        }
    }

    pub fn origin(&self) -> &Origin {
        &self.inner.origin
    }

    pub fn faults(&self) -> &FaultInjector {
        &self.inner.faults
    }

    /// Fresh handle to the root directory.
    pub fn root(&self) -> DirectoryHandle {
        DirectoryHandle::new(self.clone(), self.inner.root, String::new())
    }

    pub fn same_as(&self, other: &FileSystem) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Overrides the permission state reported for an entry.
    pub fn set_permission(
        &self,
        handle: &FileSystemHandle,
        mode: PermissionMode,
        state: PermissionState,
    ) -> FsResult<()> {
        let mut guard = self.state();
        let node = guard.node_mut(handle.entry(), handle.name())?;
        match mode {
            PermissionMode::Read => node.read = state,
            PermissionMode::ReadWrite => node.write = state,
        }
        Ok(())
    }

    fn state(&self) -> MutexGuard<'_, FsState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn permission(
        &self,
        entry: EntryId,
        name: &str,
        mode: PermissionMode,
    ) -> FsResult<PermissionState> {
        self.inner.faults.check(FaultOp::QueryPermission)?;
        let guard = self.state();
        let node = guard.node(entry, name)?;
        Ok(match mode {
            PermissionMode::Read => node.read,
            PermissionMode::ReadWrite => node.read.combine(node.write),
        })
    }

    fn read_content(&self, entry: EntryId, name: &str) -> FsResult<Vec<u8>> {
        self.inner.faults.check(FaultOp::ReadContent)?;
        let guard = self.state();
        let node = guard.node(entry, name)?;
        if node.read != PermissionState::Granted {
            return Err(FsError::NotAllowed {
                name: name.to_string(),
                mode: "read",
            });
        }
        match &node.kind {
            NodeKind::File { content } => Ok(content.clone()),
            NodeKind::Directory { .. } => Err(FsError::TypeMismatch {
                name: name.to_string(),
                expected: "file",
            }),
        }
    }

    fn write_content(&self, entry: EntryId, name: &str, bytes: &[u8]) -> FsResult<()> {
        let mut guard = self.state();
        let node = guard.node_mut(entry, name)?;
        if node.read.combine(node.write) != PermissionState::Granted {
            return Err(FsError::NotAllowed {
                name: name.to_string(),
                mode: "readwrite",
            });
        }
        match &mut node.kind {
            NodeKind::File { content } => {
                content.clear();
                content.extend_from_slice(bytes);
                Ok(())
            }
            NodeKind::Directory { .. } => Err(FsError::TypeMismatch {
                name: name.to_string(),
                expected: "file",
            }),
        }
    }

    /// Children of a directory as `(name, entry, kind)`, in map order.
    fn list(&self, entry: EntryId, name: &str) -> FsResult<Vec<(String, EntryId, HandleKind)>> {
        self.inner.faults.check(FaultOp::ListEntries)?;
        let guard = self.state();
        let children = guard.children(entry, name)?;
        children
            .iter()
            .map(|(child_name, child)| {
                let kind = guard.node(*child, child_name)?.handle_kind();
                Ok((child_name.clone(), *child, kind))
            })
            .collect()
    }

    /// Looks up (and optionally creates) a child of the given kind.
    fn child(
        &self,
        parent: EntryId,
        parent_name: &str,
        name: &str,
        kind: HandleKind,
        create: bool,
    ) -> FsResult<EntryId> {
        validate_name(name)?;
        let mut guard = self.state();
        if let Some(existing) = guard.children(parent, parent_name)?.get(name).copied() {
            let existing_kind = guard.node(existing, name)?.handle_kind();
            if existing_kind != kind {
                return Err(FsError::TypeMismatch {
                    name: name.to_string(),
                    expected: kind.as_str(),
                });
            }
            return Ok(existing);
        }
        if !create {
            return Err(FsError::NotFound(name.to_string()));
        }

        let parent_node = guard.node(parent, parent_name)?;
        if parent_node.read.combine(parent_node.write) != PermissionState::Granted {
            return Err(FsError::NotAllowed {
                name: parent_name.to_string(),
                mode: "readwrite",
            });
        }

        let id = EntryId(guard.next_entry);
        guard.next_entry += 1;
        let node_kind = match kind {
            HandleKind::File => NodeKind::File {
                content: Vec::new(),
            },
            HandleKind::Directory => NodeKind::Directory {
                children: HashMap::new(),
            },
        };
        guard.nodes.insert(
            id,
            Node {
                kind: node_kind,
                read: PermissionState::Granted,
                write: PermissionState::Granted,
            },
        );
        guard.children_mut(parent, parent_name)?.insert(name.to_string(), id);
        tracing::trace!(origin = %self.inner.origin, name, kind = kind.as_str(), "created entry");
        Ok(id)
    }
}

impl FsState {
    fn node(&self, entry: EntryId, name: &str) -> FsResult<&Node> {
        self.nodes.get(&entry).ok_or_else(|| FsError::NotFound(name.to_string()))
    }

    fn node_mut(&mut self, entry: EntryId, name: &str) -> FsResult<&mut Node> {
        self.nodes.get_mut(&entry).ok_or_else(|| FsError::NotFound(name.to_string()))
    }

    fn children(&self, entry: EntryId, name: &str) -> FsResult<&HashMap<String, EntryId>> {
        match &self.node(entry, name)?.kind {
            NodeKind::Directory { children } => Ok(children),
            NodeKind::File { .. } => Err(FsError::TypeMismatch {
                name: name.to_string(),
                expected: "directory",
            }),
        }
    }

    fn children_mut(
        &mut self,
        entry: EntryId,
        name: &str,
    ) -> FsResult<&mut HashMap<String, EntryId>> {
        match &mut self.node_mut(entry, name)?.kind {
            NodeKind::Directory { children } => Ok(children),
            NodeKind::File { .. } => Err(FsError::TypeMismatch {
                name: name.to_string(),
                expected: "directory",
            }),
        }
    }
}

impl Node {
    fn handle_kind(&self) -> HandleKind {
        match self.kind {
            NodeKind::File { .. } => HandleKind::File,
            NodeKind::Directory { .. } => HandleKind::Directory,
        }
    }
}

fn validate_name(name: &str) -> FsResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(FsError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fs() -> FileSystem {
        FileSystem::new(Origin::new("https://a.test"))
    }

    #[tokio::test]
    async fn create_and_read_back_file() {
        let fs = fs();
        let root = fs.root();
        let file = root.get_file_handle("a.txt", true).await.unwrap();
        file.write("hello").await.unwrap();
        assert_eq!(file.read_text().await.unwrap(), "hello");
        assert_eq!(file.read_bytes().await.unwrap().len(), 5);

        let again = root.get_file_handle("a.txt", false).await.unwrap();
        assert!(again.is_same_entry(&file));
        assert!(!again.same_instance(&file));
    }

    #[tokio::test]
    async fn lookup_without_create_fails() {
        let root = fs().root();
        let err = root.get_file_handle("missing", false).await.unwrap_err();
        assert!(matches!(err, FsError::NotFound(name) if name == "missing"));
    }

    #[tokio::test]
    async fn kind_mismatch_is_reported() {
        let root = fs().root();
        root.get_directory_handle("dir", true).await.unwrap();
        let err = root.get_file_handle("dir", false).await.unwrap_err();
        assert!(matches!(err, FsError::TypeMismatch { expected: "file", .. }));
    }

    #[tokio::test]
    async fn invalid_names_are_rejected() {
        let root = fs().root();
        for name in ["", ".", "..", "a/b"] {
            assert!(matches!(
                root.get_file_handle(name, true).await,
                Err(FsError::InvalidName(_))
            ));
        }
    }

    #[tokio::test]
    async fn readwrite_permission_combines_read_and_write() {
        let fs = fs();
        let file: FileSystemHandle =
            fs.root().get_file_handle("a.txt", true).await.unwrap().into();
        fs.set_permission(&file, PermissionMode::ReadWrite, PermissionState::Prompt)
            .unwrap();
        assert_eq!(
            file.query_permission(PermissionMode::Read).await.unwrap(),
            PermissionState::Granted
        );
        assert_eq!(
            file.query_permission(PermissionMode::ReadWrite).await.unwrap(),
            PermissionState::Prompt
        );

        fs.set_permission(&file, PermissionMode::Read, PermissionState::Denied)
            .unwrap();
        assert_eq!(
            file.query_permission(PermissionMode::ReadWrite).await.unwrap(),
            PermissionState::Denied
        );
    }

    #[tokio::test]
    async fn injected_faults_surface_as_io_errors() {
        let fs = fs();
        let file = fs.root().get_file_handle("a.txt", true).await.unwrap();
        fs.faults().add_rule(FaultRule::always(FaultOp::ReadContent));
        assert!(matches!(file.read_text().await, Err(FsError::Io(_))));
    }
}
