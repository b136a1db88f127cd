// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Message transports between realms
//!
//! Every endpoint that can receive has a [`Mailbox`]: an unbounded tokio
//! queue of serialized deliveries. The sending side runs
//! [`StructuredClone::serialize`]; [`EventReceiver::recv`] materializes in
//! the listener's context and turns failures into message-error events.

mod broadcast;
mod port;
mod window;
mod worker;

pub use broadcast::BroadcastChannel;
pub use port::{MessageChannel, MessagePort};
pub use window::WindowProxy;
pub use worker::{Worker, WorkerParent};

pub(crate) use broadcast::BroadcastRegistry;
pub(crate) use window::WindowRef;

use crate::error::{DataCloneError, TransportError, TransportResult};
use crate::{ExecutionContext, StructuredClone, TargetOrigin};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// Extra arguments of [`MessageTarget::post_message`].
pub struct PostOptions<M: StructuredClone> {
    /// Only honoured by window proxies.
    pub target_origin: Option<TargetOrigin>,
    /// Ports handed to the receiver alongside the message.
    pub transfer: Vec<MessagePort<M>>,
}

impl<M: StructuredClone> Default for PostOptions<M> {
    fn default() -> Self {
        Self {
            target_origin: None,
            transfer: Vec::new(),
        }
    }
}

impl<M: StructuredClone> PostOptions<M> {
    pub fn target_origin(target_origin: TargetOrigin) -> Self {
        Self {
            target_origin: Some(target_origin),
            transfer: Vec::new(),
        }
    }

    pub fn transfer(ports: Vec<MessagePort<M>>) -> Self {
        Self {
            target_origin: None,
            transfer: ports,
        }
    }
}

/// Anything messages can be posted to.
pub trait MessageTarget<M: StructuredClone>: Send + Sync {
    /// Serializes `message` in the caller's realm and queues it. Fails only
    /// when serialization fails; receiving-side failures become
    /// [`Event::MessageError`].
    fn post_message(&self, message: &M, options: PostOptions<M>) -> TransportResult<()>;

    /// Human readable name for logs.
    fn label(&self) -> String;
}

pub type Endpoint<M> = Arc<dyn MessageTarget<M>>;

pub(crate) struct Delivery<M: StructuredClone> {
    pub(crate) record: M::Record,
    pub(crate) origin: String,
    pub(crate) source: Option<Endpoint<M>>,
    pub(crate) ports: Vec<MessagePort<M>>,
}

impl<M: StructuredClone> Delivery<M> {
    pub(crate) fn new(
        message: &M,
        origin: impl Into<String>,
        source: Option<Endpoint<M>>,
        ports: Vec<MessagePort<M>>,
    ) -> Result<Self, DataCloneError> {
        Ok(Self {
            record: message.serialize()?,
            origin: origin.into(),
            source,
            ports,
        })
    }
}

pub(crate) type Inbox<M> = mpsc::UnboundedSender<Delivery<M>>;

/// Receive side of an endpoint. The receiver can be taken exactly once.
pub(crate) struct Mailbox<M: StructuredClone> {
    label: String,
    tx: Inbox<M>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Delivery<M>>>>,
}

impl<M: StructuredClone> Mailbox<M> {
    pub(crate) fn new(label: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            label: label.into(),
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    pub(crate) fn inbox(&self) -> Inbox<M> {
        self.tx.clone()
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn listen(&self, context: ExecutionContext) -> TransportResult<EventReceiver<M>> {
        let rx = self
            .rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| TransportError::AlreadyListening(self.label.clone()))?;
        Ok(EventReceiver {
            context,
            label: self.label.clone(),
            rx,
        })
    }
}

/// Queues a delivery; a closed queue means the receiver is gone and the
/// message is dropped, as a message to a closed realm would be.
pub(crate) fn deliver<M: StructuredClone>(inbox: &Inbox<M>, label: &str, delivery: Delivery<M>) {
    if inbox.send(delivery).is_err() {
        tracing::warn!(endpoint = label, "receiver closed, dropping message");
    }
}

pub struct MessageEvent<M: StructuredClone> {
    pub data: M,
    pub origin: String,
    pub last_event_id: String,
    pub source: Option<Endpoint<M>>,
    pub ports: Vec<MessagePort<M>>,
}

/// A message that arrived but could not be materialized in the receiver.
pub struct MessageErrorEvent<M: StructuredClone> {
    pub origin: String,
    pub last_event_id: String,
    pub source: Option<Endpoint<M>>,
    /// Always empty: transferred ports are not delivered with an error.
    pub ports: Vec<MessagePort<M>>,
    pub error: DataCloneError,
}

pub enum Event<M: StructuredClone> {
    Message(MessageEvent<M>),
    MessageError(MessageErrorEvent<M>),
}

pub struct EventReceiver<M: StructuredClone> {
    context: ExecutionContext,
    label: String,
    rx: mpsc::UnboundedReceiver<Delivery<M>>,
}

impl<M: StructuredClone> EventReceiver<M> {
    /// The context deliveries are materialized into.
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Next event, or `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Event<M>> {
        let delivery = self.rx.recv().await?;
        Some(self.materialize(delivery))
    }

    fn materialize(&self, delivery: Delivery<M>) -> Event<M> {
        let Delivery {
            record,
            origin,
            source,
            ports,
        } = delivery;
        match M::materialize(record, &self.context) {
            Ok(data) => Event::Message(MessageEvent {
                data,
                origin,
                last_event_id: String::new(),
                source,
                ports: ports
                    .into_iter()
                    .map(|port| port.adopt(&self.context))
                    .collect(),
            }),
            Err(error) => {
                tracing::warn!(endpoint = %self.label, %error, "message could not be deserialized");
                Event::MessageError(MessageErrorEvent {
                    origin,
                    last_event_id: String::new(),
                    source,
                    ports: Vec::new(),
                    error,
                })
            }
        }
    }
}
