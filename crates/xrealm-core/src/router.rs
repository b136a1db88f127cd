// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Message router attached to an endpoint in a remote realm
//!
//! Each received envelope is dispatched by its `type`. Replies go to the
//! event's source when it has one and to the configured reply target
//! otherwise. A failure while handling a message is reported to the peer
//! as `ERROR: <description>` so the peer never waits forever.

use crate::error::{RouterError, RouterResult};
use crate::serializer::{expect_handle, serialize_handle};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use xrealm_host::{
    Endpoint, Event, EventReceiver, MessageErrorEvent, MessageEvent, PostOptions, Realm,
    TargetOrigin, TransportError,
};
use xrealm_proto::{Envelope, Message, SerializedHandle, SerializedMessageErrorEvent};

/// Name of the file created for `create-file`.
pub const CREATED_FILE_NAME: &str = "temp-file";
/// Name of the directory created for `create-directory`.
pub const CREATED_DIRECTORY_NAME: &str = "temp-directory";

#[derive(Clone, Default)]
pub struct RouterConfig {
    /// Where replies go when an event has no source (workers, ports,
    /// broadcast channels).
    pub reply_target: Option<Endpoint<Message>>,
    /// Target origin used when posting replies.
    pub target_origin: Option<TargetOrigin>,
}

impl RouterConfig {
    pub fn with_reply_target(reply_target: Endpoint<Message>) -> Self {
        Self {
            reply_target: Some(reply_target),
            target_origin: None,
        }
    }
}

/// Picks where a reply goes: the event source, else the fallback.
pub fn resolve_reply_destination(
    source: Option<Endpoint<Message>>,
    fallback: Option<Endpoint<Message>>,
) -> RouterResult<Endpoint<Message>> {
    source.or(fallback).ok_or(RouterError::NoReplyDestination)
}

/// Spawns a router serving `receiver` on behalf of `realm`.
///
/// The task runs until the receiver closes or the handle is aborted;
/// aborting it also stops the routers it attached to ports and channels.
pub fn attach_router(
    realm: Realm<Message>,
    receiver: EventReceiver<Message>,
    config: RouterConfig,
) -> JoinHandle<()> {
    let router = Router {
        realm,
        config,
        label: receiver.label().to_string(),
        nested: Vec::new(),
    };
    tokio::spawn(router.run(receiver))
}

struct Router {
    realm: Realm<Message>,
    config: RouterConfig,
    label: String,
    nested: Vec<JoinHandle<()>>,
}

impl Router {
    async fn run(mut self, mut receiver: EventReceiver<Message>) {
        debug!(endpoint = %self.label, realm = self.realm.label(), "router attached");
        while let Some(event) = receiver.recv().await {
            match event {
                Event::Message(event) => self.on_message(event).await,
                Event::MessageError(event) => self.on_message_error(event),
            }
        }
        debug!(endpoint = %self.label, "router detached");
    }

    async fn on_message(&mut self, event: MessageEvent<Message>) {
        let MessageEvent { data, source, .. } = event;
        let message_type = data.type_tag();
        debug!(endpoint = %self.label, %message_type, "routing message");

        let reply = match self.dispatch(data).await {
            Ok(Some(reply)) => reply,
            Ok(None) => return,
            Err(err) => {
                warn!(endpoint = %self.label, %message_type, error = %err, "message handling failed");
                Message::error(err)
            }
        };
        self.reply(source, reply);
    }

    fn on_message_error(&mut self, event: MessageErrorEvent<Message>) {
        debug!(endpoint = %self.label, origin = %event.origin, "reporting messageerror");
        let serialized = SerializedMessageErrorEvent::from(&event);
        self.reply(
            event.source,
            Envelope::SerializedMessageError {
                serialized_message_error_event: serialized,
            }
            .into(),
        );
    }

    async fn dispatch(&mut self, message: Message) -> RouterResult<Option<Message>> {
        let envelope = match message {
            Message::Envelope(envelope) => envelope,
            other => return Err(RouterError::UnknownMessageType(other.type_tag())),
        };

        match envelope {
            Envelope::ReceiveMessagePort { message_port } => {
                let receiver = message_port.start().map_err(|err| match err {
                    TransportError::AlreadyListening(port) => RouterError::PortAlreadyStarted(port),
                    other => RouterError::from(other),
                })?;
                self.attach_nested(receiver, Arc::new(message_port));
                Ok(None)
            }
            Envelope::CreateBroadcastChannel {
                broadcast_channel_name,
            } => {
                let channel = self.realm.open_broadcast_channel(&broadcast_channel_name);
                let receiver = channel.listen()?;
                self.attach_nested(receiver, Arc::new(channel));
                Ok(Some(Envelope::BroadcastChannelCreated.into()))
            }
            Envelope::ReceiveFileSystemHandles {
                file_system_handles,
            } => {
                let mut serialized_file_system_handles =
                    Vec::with_capacity(file_system_handles.len());
                for value in &file_system_handles {
                    let handle = expect_handle(value)?;
                    let serialized = serialize_handle(handle).await?;
                    serialized_file_system_handles.push(SerializedHandle {
                        handle: handle.clone(),
                        serialized,
                    });
                }
                Ok(Some(
                    Envelope::ReceiveSerializedFileSystemHandles {
                        serialized_file_system_handles,
                    }
                    .into(),
                ))
            }
            Envelope::ReceiveSerializedFileSystemHandles { .. } => Ok(None),
            Envelope::CreateFile => {
                let file_handle = self
                    .realm
                    .storage_root()
                    .get_file_handle(CREATED_FILE_NAME, true)
                    .await?;
                Ok(Some(Envelope::ReceiveFile { file_handle }.into()))
            }
            Envelope::CreateDirectory => {
                let directory_handle = self
                    .realm
                    .storage_root()
                    .get_directory_handle(CREATED_DIRECTORY_NAME, true)
                    .await?;
                Ok(Some(Envelope::ReceiveDirectory { directory_handle }.into()))
            }
            reply @ (Envelope::BroadcastChannelCreated
            | Envelope::ReceiveFile { .. }
            | Envelope::ReceiveDirectory { .. }
            | Envelope::SerializedMessageError { .. }) => {
                Err(RouterError::UnknownMessageType(reply.kind().to_string()))
            }
        }
    }

    fn attach_nested(&mut self, receiver: EventReceiver<Message>, reply_target: Endpoint<Message>) {
        let config = RouterConfig {
            reply_target: Some(reply_target),
            target_origin: self.config.target_origin.clone(),
        };
        self.nested.push(attach_router(self.realm.clone(), receiver, config));
    }

    fn reply(&self, source: Option<Endpoint<Message>>, reply: Message) {
        let fallback = self.config.reply_target.clone();
        let destination = match resolve_reply_destination(source, fallback) {
            Ok(destination) => destination,
            Err(err) => {
                error!(endpoint = %self.label, reply_type = %reply.type_tag(), error = %err, "dropping reply");
                return;
            }
        };

        let options = PostOptions {
            target_origin: self.config.target_origin.clone(),
            transfer: Vec::new(),
        };
        if let Err(err) = destination.post_message(&reply, options) {
            let err = RouterError::from(err);
            warn!(destination = %destination.label(), reply_type = %reply.type_tag(), error = %err, "reply delivery failed");
        }
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        for task in &self.nested {
            task.abort();
        }
    }
}
