// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! File and directory handles

use super::{EntryId, FileSystem};
use crate::error::FsResult;
use crate::Origin;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::atomic::{AtomicU64, Ordering};

/// Tri-state answer of a permission query
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
}

impl PermissionState {
    /// State of a query needing both permissions: denied wins, then prompt.
    pub fn combine(self, other: PermissionState) -> PermissionState {
        use PermissionState::*;
        match (self, other) {
            (Denied, _) | (_, Denied) => Denied,
            (Prompt, _) | (_, Prompt) => Prompt,
            (Granted, Granted) => Granted,
        }
    }
}

impl std::fmt::Display for PermissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionState::Granted => write!(f, "granted"),
            PermissionState::Denied => write!(f, "denied"),
            PermissionState::Prompt => write!(f, "prompt"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionMode {
    Read,
    ReadWrite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleKind {
    File,
    Directory,
}

impl HandleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            HandleKind::File => "file",
            HandleKind::Directory => "directory",
        }
    }
}

impl std::fmt::Display for HandleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one handle *instance*. Rust clones share it (aliases);
/// structured clones get a new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandleId(pub u64);

impl HandleId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Debug)]
pub(crate) struct HandleCore {
    id: HandleId,
    fs: FileSystem,
    entry: EntryId,
    name: String,
}

impl HandleCore {
    fn new(fs: FileSystem, entry: EntryId, name: String) -> Self {
        Self {
            id: HandleId::next(),
            fs,
            entry,
            name,
        }
    }

    fn reinstantiate(&self) -> Self {
        Self::new(self.fs.clone(), self.entry, self.name.clone())
    }

    fn is_same_entry(&self, other: &HandleCore) -> bool {
        self.fs.same_as(&other.fs) && self.entry == other.entry
    }
}

#[derive(Clone, Debug)]
pub struct FileHandle(HandleCore);

#[derive(Clone, Debug)]
pub struct DirectoryHandle(HandleCore);

/// Either kind of handle, as carried in messages.
#[derive(Clone, Debug)]
pub enum FileSystemHandle {
    File(FileHandle),
    Directory(DirectoryHandle),
}

impl FileHandle {
    pub fn id(&self) -> HandleId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn file_system(&self) -> &FileSystem {
        &self.0.fs
    }

    pub(crate) fn reinstantiate(&self) -> FileHandle {
        FileHandle(self.0.reinstantiate())
    }

    pub fn same_instance(&self, other: &FileHandle) -> bool {
        self.0.id == other.0.id
    }

    pub fn is_same_entry(&self, other: &FileHandle) -> bool {
        self.0.is_same_entry(&other.0)
    }

    pub async fn read_bytes(&self) -> FsResult<Vec<u8>> {
        self.0.fs.read_content(self.0.entry, &self.0.name)
    }

    /// Full content decoded as UTF-8 (lossy).
    pub async fn read_text(&self) -> FsResult<String> {
        let bytes = self.read_bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Replaces the whole content.
    pub async fn write(&self, contents: impl AsRef<[u8]>) -> FsResult<()> {
        self.0.fs.write_content(self.0.entry, &self.0.name, contents.as_ref())
    }
}

impl DirectoryHandle {
    pub(crate) fn new(fs: FileSystem, entry: EntryId, name: String) -> Self {
        Self(HandleCore::new(fs, entry, name))
    }

    pub fn id(&self) -> HandleId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn file_system(&self) -> &FileSystem {
        &self.0.fs
    }

    pub(crate) fn reinstantiate(&self) -> DirectoryHandle {
        DirectoryHandle(self.0.reinstantiate())
    }

    pub fn same_instance(&self, other: &DirectoryHandle) -> bool {
        self.0.id == other.0.id
    }

    pub fn is_same_entry(&self, other: &DirectoryHandle) -> bool {
        self.0.is_same_entry(&other.0)
    }

    pub async fn get_file_handle(&self, name: &str, create: bool) -> FsResult<FileHandle> {
        let entry = self.0.fs.child(self.0.entry, &self.0.name, name, HandleKind::File, create)?;
        Ok(FileHandle(HandleCore::new(self.0.fs.clone(), entry, name.to_string())))
    }

    pub async fn get_directory_handle(
        &self,
        name: &str,
        create: bool,
    ) -> FsResult<DirectoryHandle> {
        let entry =
            self.0.fs.child(self.0.entry, &self.0.name, name, HandleKind::Directory, create)?;
        Ok(DirectoryHandle::new(self.0.fs.clone(), entry, name.to_string()))
    }

    /// New handles for every child, in unspecified order.
    pub async fn entries(&self) -> FsResult<Vec<FileSystemHandle>> {
        let children = self.0.fs.list(self.0.entry, &self.0.name)?;
        Ok(children
            .into_iter()
            .map(|(name, entry, kind)| {
                FileSystemHandle::from_core(kind, HandleCore::new(self.0.fs.clone(), entry, name))
            })
            .collect())
    }
}

impl FileSystemHandle {
    fn core(&self) -> &HandleCore {
        match self {
            FileSystemHandle::File(handle) => &handle.0,
            FileSystemHandle::Directory(handle) => &handle.0,
        }
    }

    fn from_core(kind: HandleKind, core: HandleCore) -> Self {
        match kind {
            HandleKind::File => FileSystemHandle::File(FileHandle(core)),
            HandleKind::Directory => FileSystemHandle::Directory(DirectoryHandle(core)),
        }
    }

    pub(crate) fn entry(&self) -> EntryId {
        self.core().entry
    }

    pub fn kind(&self) -> HandleKind {
        match self {
            FileSystemHandle::File(_) => HandleKind::File,
            FileSystemHandle::Directory(_) => HandleKind::Directory,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, FileSystemHandle::File(_))
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, FileSystemHandle::Directory(_))
    }

    pub fn id(&self) -> HandleId {
        self.core().id
    }

    pub fn name(&self) -> &str {
        &self.core().name
    }

    pub fn origin(&self) -> &Origin {
        self.core().fs.origin()
    }

    pub fn file_system(&self) -> &FileSystem {
        &self.core().fs
    }

    pub fn as_file(&self) -> Option<&FileHandle> {
        match self {
            FileSystemHandle::File(handle) => Some(handle),
            FileSystemHandle::Directory(_) => None,
        }
    }

    /// Identity comparison (the two values are the same instance).
    pub fn same_instance(&self, other: &FileSystemHandle) -> bool {
        self.id() == other.id()
    }

    /// Whether both handles refer to the same file-system entry.
    pub fn is_same_entry(&self, other: &FileSystemHandle) -> bool {
        self.kind() == other.kind() && self.core().is_same_entry(other.core())
    }

    pub async fn query_permission(&self, mode: PermissionMode) -> FsResult<PermissionState> {
        let core = self.core();
        core.fs.permission(core.entry, &core.name, mode)
    }

    /// Fresh instance referring to the same entry.
    pub(crate) fn reinstantiate(&self) -> FileSystemHandle {
        Self::from_core(self.kind(), self.core().reinstantiate())
    }
}

impl From<FileHandle> for FileSystemHandle {
    fn from(handle: FileHandle) -> Self {
        FileSystemHandle::File(handle)
    }
}

impl From<DirectoryHandle> for FileSystemHandle {
    fn from(handle: DirectoryHandle) -> Self {
        FileSystemHandle::Directory(handle)
    }
}

// Handles are opaque on the wire; the JSON form is a descriptor for logs.
fn serialize_descriptor<S: Serializer>(
    serializer: S,
    kind: HandleKind,
    core: &HandleCore,
) -> Result<S::Ok, S::Error> {
    let mut state = serializer.serialize_struct("FileSystemHandle", 3)?;
    state.serialize_field("kind", &kind)?;
    state.serialize_field("name", &core.name)?;
    state.serialize_field("origin", core.fs.origin())?;
    state.end()
}

impl Serialize for FileSystemHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_descriptor(serializer, self.kind(), self.core())
    }
}

impl Serialize for FileHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_descriptor(serializer, HandleKind::File, &self.0)
    }
}

impl Serialize for DirectoryHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_descriptor(serializer, HandleKind::Directory, &self.0)
    }
}
