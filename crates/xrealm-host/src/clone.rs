// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Structured clone
//!
//! A value crossing realms is first serialized in the sending realm into a
//! `Record`, queued, and then materialized in the receiving realm. Only the
//! materialize step knows the receiver, so origin checks happen there.

use crate::error::DataCloneError;
use crate::fs::{DirectoryHandle, FileHandle, FileSystemHandle, HandleKind};
use crate::{ExecutionContext, Origin};

pub trait StructuredClone: Sized + Send + 'static {
    type Record: Send + 'static;

    /// Runs in the sending realm.
    fn serialize(&self) -> Result<Self::Record, DataCloneError>;

    /// Runs in the receiving realm.
    fn materialize(record: Self::Record, target: &ExecutionContext) -> Result<Self, DataCloneError>;
}

/// Implements [`StructuredClone`] for plain data types that clone by value.
#[macro_export]
macro_rules! plain_structured_clone {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::StructuredClone for $ty {
                type Record = $ty;

                fn serialize(&self) -> Result<Self::Record, $crate::DataCloneError> {
                    Ok(self.clone())
                }

                fn materialize(
                    record: Self::Record,
                    _target: &$crate::ExecutionContext,
                ) -> Result<Self, $crate::DataCloneError> {
                    Ok(record)
                }
            }
        )+
    };
}

plain_structured_clone!(String, bool, u64, i64);

impl<T: StructuredClone> StructuredClone for Vec<T> {
    type Record = Vec<T::Record>;

    fn serialize(&self) -> Result<Self::Record, DataCloneError> {
        self.iter().map(StructuredClone::serialize).collect()
    }

    fn materialize(
        record: Self::Record,
        target: &ExecutionContext,
    ) -> Result<Self, DataCloneError> {
        record.into_iter().map(|item| T::materialize(item, target)).collect()
    }
}

impl<T: StructuredClone> StructuredClone for Option<T> {
    type Record = Option<T::Record>;

    fn serialize(&self) -> Result<Self::Record, DataCloneError> {
        self.as_ref().map(StructuredClone::serialize).transpose()
    }

    fn materialize(
        record: Self::Record,
        target: &ExecutionContext,
    ) -> Result<Self, DataCloneError> {
        record.map(|item| T::materialize(item, target)).transpose()
    }
}

fn check_origin(
    kind: HandleKind,
    name: &str,
    origin: &Origin,
    target: &ExecutionContext,
) -> Result<(), DataCloneError> {
    if origin != target.origin() {
        return Err(DataCloneError::CrossOrigin {
            kind: kind.as_str(),
            name: name.to_string(),
            from: origin.clone(),
            to: target.origin().clone(),
        });
    }
    Ok(())
}

impl StructuredClone for FileSystemHandle {
    type Record = FileSystemHandle;

    fn serialize(&self) -> Result<Self::Record, DataCloneError> {
        Ok(self.clone())
    }

    fn materialize(
        record: Self::Record,
        target: &ExecutionContext,
    ) -> Result<Self, DataCloneError> {
        check_origin(record.kind(), record.name(), record.origin(), target)?;
        Ok(record.reinstantiate())
    }
}

impl StructuredClone for FileHandle {
    type Record = FileHandle;

    fn serialize(&self) -> Result<Self::Record, DataCloneError> {
        Ok(self.clone())
    }

    fn materialize(
        record: Self::Record,
        target: &ExecutionContext,
    ) -> Result<Self, DataCloneError> {
        check_origin(HandleKind::File, record.name(), record.file_system().origin(), target)?;
        Ok(record.reinstantiate())
    }
}

impl StructuredClone for DirectoryHandle {
    type Record = DirectoryHandle;

    fn serialize(&self) -> Result<Self::Record, DataCloneError> {
        Ok(self.clone())
    }

    fn materialize(
        record: Self::Record,
        target: &ExecutionContext,
    ) -> Result<Self, DataCloneError> {
        check_origin(HandleKind::Directory, record.name(), record.file_system().origin(), target)?;
        Ok(record.reinstantiate())
    }
}

/// Serializes and materializes into `target` in one step.
pub fn structured_clone<T: StructuredClone>(
    value: &T,
    target: &ExecutionContext,
) -> Result<T, DataCloneError> {
    T::materialize(value.serialize()?, target)
}
