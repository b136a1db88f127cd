// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use crate::Snapshot;
use serde::{Deserialize, Serialize};
use xrealm_host::{
    plain_structured_clone, DataCloneError, DirectoryHandle, ExecutionContext, FileHandle,
    FileSystemHandle, MessageErrorEvent, MessagePort, StructuredClone,
};

/// Envelope discriminant, rendered as the wire `type` tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvelopeType {
    ReceiveMessagePort,
    CreateBroadcastChannel,
    BroadcastChannelCreated,
    ReceiveFileSystemHandles,
    ReceiveSerializedFileSystemHandles,
    CreateFile,
    CreateDirectory,
    ReceiveFile,
    ReceiveDirectory,
    SerializedMessageError,
}

impl EnvelopeType {
    pub fn as_str(self) -> &'static str {
        match self {
            EnvelopeType::ReceiveMessagePort => "receive-message-port",
            EnvelopeType::CreateBroadcastChannel => "create-broadcast-channel",
            EnvelopeType::BroadcastChannelCreated => "broadcast-channel-created",
            EnvelopeType::ReceiveFileSystemHandles => "receive-file-system-handles",
            EnvelopeType::ReceiveSerializedFileSystemHandles => {
                "receive-serialized-file-system-handles"
            }
            EnvelopeType::CreateFile => "create-file",
            EnvelopeType::CreateDirectory => "create-directory",
            EnvelopeType::ReceiveFile => "receive-file",
            EnvelopeType::ReceiveDirectory => "receive-directory",
            EnvelopeType::SerializedMessageError => "serialized-message-error",
        }
    }
}

impl std::fmt::Display for EnvelopeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value carried in a `receive-file-system-handles` batch. Anything
/// other than a handle is accepted by the transport but rejected by the
/// serializer.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum CloneValue {
    Handle(FileSystemHandle),
    Text(String),
    Null,
}

impl From<FileSystemHandle> for CloneValue {
    fn from(handle: FileSystemHandle) -> Self {
        CloneValue::Handle(handle)
    }
}

impl From<FileHandle> for CloneValue {
    fn from(handle: FileHandle) -> Self {
        CloneValue::Handle(handle.into())
    }
}

impl From<DirectoryHandle> for CloneValue {
    fn from(handle: DirectoryHandle) -> Self {
        CloneValue::Handle(handle.into())
    }
}

/// A handle paired with the snapshot the remote side took of it.
#[derive(Clone, Debug, Serialize)]
pub struct SerializedHandle {
    pub handle: FileSystemHandle,
    pub serialized: Snapshot,
}

/// The observable fields of a `messageerror` event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedMessageErrorEvent {
    /// Always `null`: the payload never materialized.
    pub data: serde_json::Value,
    pub origin: String,
    pub last_event_id: String,
    pub has_source: bool,
    pub ports_length: usize,
}

impl<M: StructuredClone> From<&MessageErrorEvent<M>> for SerializedMessageErrorEvent {
    fn from(event: &MessageErrorEvent<M>) -> Self {
        Self {
            data: serde_json::Value::Null,
            origin: event.origin.clone(),
            last_event_id: event.last_event_id.clone(),
            has_source: event.source.is_some(),
            ports_length: event.ports.len(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Envelope {
    ReceiveMessagePort {
        message_port: MessagePort<Message>,
    },
    CreateBroadcastChannel {
        broadcast_channel_name: String,
    },
    BroadcastChannelCreated,
    ReceiveFileSystemHandles {
        file_system_handles: Vec<CloneValue>,
    },
    ReceiveSerializedFileSystemHandles {
        serialized_file_system_handles: Vec<SerializedHandle>,
    },
    CreateFile,
    CreateDirectory,
    ReceiveFile {
        file_handle: FileHandle,
    },
    ReceiveDirectory {
        directory_handle: DirectoryHandle,
    },
    SerializedMessageError {
        serialized_message_error_event: SerializedMessageErrorEvent,
    },
}

impl Envelope {
    pub fn kind(&self) -> EnvelopeType {
        match self {
            Envelope::ReceiveMessagePort { .. } => EnvelopeType::ReceiveMessagePort,
            Envelope::CreateBroadcastChannel { .. } => EnvelopeType::CreateBroadcastChannel,
            Envelope::BroadcastChannelCreated => EnvelopeType::BroadcastChannelCreated,
            Envelope::ReceiveFileSystemHandles { .. } => EnvelopeType::ReceiveFileSystemHandles,
            Envelope::ReceiveSerializedFileSystemHandles { .. } => {
                EnvelopeType::ReceiveSerializedFileSystemHandles
            }
            Envelope::CreateFile => EnvelopeType::CreateFile,
            Envelope::CreateDirectory => EnvelopeType::CreateDirectory,
            Envelope::ReceiveFile { .. } => EnvelopeType::ReceiveFile,
            Envelope::ReceiveDirectory { .. } => EnvelopeType::ReceiveDirectory,
            Envelope::SerializedMessageError { .. } => EnvelopeType::SerializedMessageError,
        }
    }
}

/// An envelope whose `type` tag is not one of [`EnvelopeType`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UnrecognizedEnvelope {
    #[serde(rename = "type")]
    pub type_tag: String,
}

impl UnrecognizedEnvelope {
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
        }
    }
}

/// Anything that travels between realms in this protocol.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Message {
    Envelope(Envelope),
    Unrecognized(UnrecognizedEnvelope),
    /// Bare strings; used for `ERROR: ...` replies.
    Text(String),
}

const ERROR_PREFIX: &str = "ERROR: ";

impl Message {
    pub fn error(description: impl std::fmt::Display) -> Self {
        Message::Text(format!("{}{}", ERROR_PREFIX, description))
    }

    /// Description of an `ERROR: ...` text message.
    pub fn as_error(&self) -> Option<&str> {
        match self {
            Message::Text(text) => text.strip_prefix(ERROR_PREFIX),
            _ => None,
        }
    }

    pub fn into_envelope(self) -> Option<Envelope> {
        match self {
            Message::Envelope(envelope) => Some(envelope),
            _ => None,
        }
    }

    /// The `type` tag as a receiver sees it; text has none (`undefined`).
    pub fn type_tag(&self) -> String {
        match self {
            Message::Envelope(envelope) => envelope.kind().to_string(),
            Message::Unrecognized(unrecognized) => unrecognized.type_tag.clone(),
            Message::Text(_) => "undefined".to_string(),
        }
    }
}

impl From<Envelope> for Message {
    fn from(envelope: Envelope) -> Self {
        Message::Envelope(envelope)
    }
}

plain_structured_clone!(Snapshot, SerializedMessageErrorEvent, UnrecognizedEnvelope);

// Every record type below is the value type itself: handles and ports are
// re-instantiated on materialize, everything else is copied.

impl StructuredClone for CloneValue {
    type Record = CloneValue;

    fn serialize(&self) -> Result<Self::Record, DataCloneError> {
        Ok(match self {
            CloneValue::Handle(handle) => CloneValue::Handle(StructuredClone::serialize(handle)?),
            other => other.clone(),
        })
    }

    fn materialize(
        record: Self::Record,
        target: &ExecutionContext,
    ) -> Result<Self, DataCloneError> {
        Ok(match record {
            CloneValue::Handle(handle) => {
                CloneValue::Handle(FileSystemHandle::materialize(handle, target)?)
            }
            other => other,
        })
    }
}

impl StructuredClone for SerializedHandle {
    type Record = SerializedHandle;

    fn serialize(&self) -> Result<Self::Record, DataCloneError> {
        Ok(SerializedHandle {
            handle: StructuredClone::serialize(&self.handle)?,
            serialized: self.serialized.clone(),
        })
    }

    fn materialize(
        record: Self::Record,
        target: &ExecutionContext,
    ) -> Result<Self, DataCloneError> {
        Ok(SerializedHandle {
            handle: FileSystemHandle::materialize(record.handle, target)?,
            serialized: record.serialized,
        })
    }
}

impl StructuredClone for Envelope {
    type Record = Envelope;

    fn serialize(&self) -> Result<Self::Record, DataCloneError> {
        Ok(match self {
            Envelope::ReceiveMessagePort { message_port } => Envelope::ReceiveMessagePort {
                message_port: StructuredClone::serialize(message_port)?,
            },
            Envelope::ReceiveFileSystemHandles {
                file_system_handles,
            } => Envelope::ReceiveFileSystemHandles {
                file_system_handles: StructuredClone::serialize(file_system_handles)?,
            },
            Envelope::ReceiveSerializedFileSystemHandles {
                serialized_file_system_handles,
            } => Envelope::ReceiveSerializedFileSystemHandles {
                serialized_file_system_handles: StructuredClone::serialize(
                    serialized_file_system_handles,
                )?,
            },
            Envelope::ReceiveFile { file_handle } => Envelope::ReceiveFile {
                file_handle: StructuredClone::serialize(file_handle)?,
            },
            Envelope::ReceiveDirectory { directory_handle } => Envelope::ReceiveDirectory {
                directory_handle: StructuredClone::serialize(directory_handle)?,
            },
            Envelope::CreateBroadcastChannel { .. }
            | Envelope::BroadcastChannelCreated
            | Envelope::CreateFile
            | Envelope::CreateDirectory
            | Envelope::SerializedMessageError { .. } => self.clone(),
        })
    }

    fn materialize(
        record: Self::Record,
        target: &ExecutionContext,
    ) -> Result<Self, DataCloneError> {
        Ok(match record {
            Envelope::ReceiveMessagePort { message_port } => Envelope::ReceiveMessagePort {
                message_port: MessagePort::materialize(message_port, target)?,
            },
            Envelope::ReceiveFileSystemHandles {
                file_system_handles,
            } => Envelope::ReceiveFileSystemHandles {
                file_system_handles: Vec::materialize(file_system_handles, target)?,
            },
            Envelope::ReceiveSerializedFileSystemHandles {
                serialized_file_system_handles,
            } => Envelope::ReceiveSerializedFileSystemHandles {
                serialized_file_system_handles: Vec::materialize(
                    serialized_file_system_handles,
                    target,
                )?,
            },
            Envelope::ReceiveFile { file_handle } => Envelope::ReceiveFile {
                file_handle: FileHandle::materialize(file_handle, target)?,
            },
            Envelope::ReceiveDirectory { directory_handle } => Envelope::ReceiveDirectory {
                directory_handle: DirectoryHandle::materialize(directory_handle, target)?,
            },
            plain => plain,
        })
    }
}

impl StructuredClone for Message {
    type Record = Message;

    fn serialize(&self) -> Result<Self::Record, DataCloneError> {
        Ok(match self {
            Message::Envelope(envelope) => Message::Envelope(StructuredClone::serialize(envelope)?),
            other => other.clone(),
        })
    }

    fn materialize(
        record: Self::Record,
        target: &ExecutionContext,
    ) -> Result<Self, DataCloneError> {
        Ok(match record {
            Message::Envelope(envelope) => {
                Message::Envelope(Envelope::materialize(envelope, target)?)
            }
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_type_tags_match_wire_names() {
        let envelope = Envelope::CreateBroadcastChannel {
            broadcast_channel_name: "chan".into(),
        };
        assert_eq!(
            serde_json::to_value(Message::from(envelope)).unwrap(),
            json!({ "type": "create-broadcast-channel", "broadcast_channel_name": "chan" })
        );
        assert_eq!(
            serde_json::to_value(Message::from(Envelope::CreateFile)).unwrap(),
            json!({ "type": "create-file" })
        );
        assert_eq!(
            serde_json::to_value(EnvelopeType::ReceiveSerializedFileSystemHandles).unwrap(),
            json!(EnvelopeType::ReceiveSerializedFileSystemHandles.as_str())
        );
    }

    #[test]
    fn error_messages_round_trip_their_description() {
        let message = Message::error("Unknown message type: 'x'");
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!("ERROR: Unknown message type: 'x'")
        );
        assert_eq!(message.as_error(), Some("Unknown message type: 'x'"));
        assert_eq!(Message::Text("hi".into()).as_error(), None);
    }

    #[test]
    fn type_tags() {
        assert_eq!(
            Message::from(Envelope::BroadcastChannelCreated).type_tag(),
            "broadcast-channel-created"
        );
        assert_eq!(
            Message::Unrecognized(UnrecognizedEnvelope::new("bogus")).type_tag(),
            "bogus"
        );
        assert_eq!(Message::Text("plain".into()).type_tag(), "undefined");
    }

    #[test]
    fn message_error_event_serializes_with_null_data() {
        let event = SerializedMessageErrorEvent {
            data: serde_json::Value::Null,
            origin: "https://primary.test".into(),
            last_event_id: String::new(),
            has_source: true,
            ports_length: 0,
        };
        let wire = serde_json::to_value(Message::from(Envelope::SerializedMessageError {
            serialized_message_error_event: event,
        }))
        .unwrap();
        assert_eq!(wire["type"], "serialized-message-error");
        assert_eq!(wire["serialized_message_error_event"]["data"], json!(null));
        assert_eq!(wire["serialized_message_error_event"]["ports_length"], 0);
    }
}
