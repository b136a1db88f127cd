// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use super::{deliver, Delivery, EventReceiver, Inbox, Mailbox, MessageTarget, PostOptions};
use crate::error::{DataCloneError, TransportResult};
use crate::{ExecutionContext, StructuredClone};
use serde::{Serialize, Serializer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct PortShared<M: StructuredClone> {
    id: u64,
    mailbox: Mailbox<M>,
    peer: Inbox<M>,
}

/// One end of an entangled pair. Posting delivers to the other end.
///
/// The value remembers the realm that owns it; cloning it through a
/// message re-homes it into the receiving realm.
pub struct MessagePort<M: StructuredClone> {
    shared: Arc<PortShared<M>>,
    owner: ExecutionContext,
}

impl<M: StructuredClone> Clone for MessagePort<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            owner: self.owner.clone(),
        }
    }
}

impl<M: StructuredClone> std::fmt::Debug for MessagePort<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagePort")
            .field("id", &self.shared.id)
            .field("owner", &self.owner.label())
            .finish()
    }
}

impl<M: StructuredClone> MessagePort<M> {
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn owner(&self) -> &ExecutionContext {
        &self.owner
    }

    /// Begins delivery of queued and future messages. Only the first call
    /// succeeds.
    pub fn start(&self) -> TransportResult<EventReceiver<M>> {
        self.shared.mailbox.listen(self.owner.clone())
    }

    pub(crate) fn adopt(&self, owner: &ExecutionContext) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            owner: owner.clone(),
        }
    }
}

impl<M: StructuredClone> MessageTarget<M> for MessagePort<M> {
    fn post_message(&self, message: &M, options: PostOptions<M>) -> TransportResult<()> {
        // Port events carry neither origin nor source.
        let delivery = Delivery::new(message, "", None, options.transfer)?;
        deliver(&self.shared.peer, self.shared.mailbox.label(), delivery);
        Ok(())
    }

    fn label(&self) -> String {
        self.shared.mailbox.label().to_string()
    }
}

impl<M: StructuredClone> StructuredClone for MessagePort<M> {
    type Record = MessagePort<M>;

    fn serialize(&self) -> Result<Self::Record, DataCloneError> {
        Ok(self.clone())
    }

    fn materialize(
        record: Self::Record,
        target: &ExecutionContext,
    ) -> Result<Self, DataCloneError> {
        Ok(record.adopt(target))
    }
}

impl<M: StructuredClone> Serialize for MessagePort<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.shared.mailbox.label())
    }
}

/// A freshly entangled pair of ports, both owned by the creating realm.
pub struct MessageChannel<M: StructuredClone> {
    pub port1: MessagePort<M>,
    pub port2: MessagePort<M>,
}

impl<M: StructuredClone> MessageChannel<M> {
    pub(crate) fn new(owner: &ExecutionContext) -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        let first = COUNTER.fetch_add(2, Ordering::Relaxed);
        let mailbox1 = Mailbox::new(format!("port#{}", first));
        let mailbox2 = Mailbox::new(format!("port#{}", first + 1));
        let (inbox1, inbox2) = (mailbox1.inbox(), mailbox2.inbox());

        let port1 = MessagePort {
            shared: Arc::new(PortShared {
                id: first,
                mailbox: mailbox1,
                peer: inbox2,
            }),
            owner: owner.clone(),
        };
        let port2 = MessagePort {
            shared: Arc::new(PortShared {
                id: first + 1,
                mailbox: mailbox2,
                peer: inbox1,
            }),
            owner: owner.clone(),
        };
        Self { port1, port2 }
    }
}
