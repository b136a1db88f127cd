// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use super::{deliver, Delivery, EventReceiver, Inbox, Mailbox, MessageTarget, PostOptions};
use crate::error::TransportResult;
use crate::{ExecutionContext, Origin, StructuredClone};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type ChannelKey = (Origin, String);

struct Subscriber<M: StructuredClone> {
    id: u64,
    label: String,
    inbox: Inbox<M>,
}

/// Host-wide table of open broadcast channels, keyed by origin and name.
pub(crate) struct BroadcastRegistry<M: StructuredClone> {
    channels: Mutex<HashMap<ChannelKey, Vec<Subscriber<M>>>>,
    next_id: AtomicU64,
}

impl<M: StructuredClone> Default for BroadcastRegistry<M> {
    fn default() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<M: StructuredClone> BroadcastRegistry<M> {
    fn channels(&self) -> MutexGuard<'_, HashMap<ChannelKey, Vec<Subscriber<M>>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(&self, key: ChannelKey, label: String, inbox: Inbox<M>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.channels().entry(key).or_default().push(Subscriber { id, label, inbox });
        id
    }

    fn unsubscribe(&self, key: &ChannelKey, id: u64) {
        let mut channels = self.channels();
        if let Some(subscribers) = channels.get_mut(key) {
            subscribers.retain(|subscriber| subscriber.id != id);
            if subscribers.is_empty() {
                channels.remove(key);
            }
        }
    }

    fn peers(&self, key: &ChannelKey, id: u64) -> Vec<(String, Inbox<M>)> {
        self.channels()
            .get(key)
            .map(|subscribers| {
                subscribers
                    .iter()
                    .filter(|subscriber| subscriber.id != id)
                    .map(|subscriber| (subscriber.label.clone(), subscriber.inbox.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn subscriber_count(&self, origin: &Origin, name: &str) -> usize {
        self.channels()
            .get(&(origin.clone(), name.to_string()))
            .map_or(0, Vec::len)
    }
}

/// Named same-origin channel. A post reaches every *other* open channel
/// object with the same name and origin, each getting its own copy.
pub struct BroadcastChannel<M: StructuredClone> {
    id: u64,
    key: ChannelKey,
    context: ExecutionContext,
    registry: Arc<BroadcastRegistry<M>>,
    mailbox: Mailbox<M>,
}

impl<M: StructuredClone> BroadcastChannel<M> {
    pub(crate) fn open(
        registry: Arc<BroadcastRegistry<M>>,
        context: &ExecutionContext,
        name: &str,
    ) -> Self {
        let key = (context.origin().clone(), name.to_string());
        let mailbox = Mailbox::new(format!("broadcast:{}@{}", name, context.label()));
        let id = registry.subscribe(key.clone(), mailbox.label().to_string(), mailbox.inbox());
        tracing::debug!(channel = name, realm = context.label(), "broadcast channel opened");
        Self {
            id,
            key,
            context: context.clone(),
            registry,
            mailbox,
        }
    }

    pub fn name(&self) -> &str {
        &self.key.1
    }

    pub fn listen(&self) -> TransportResult<EventReceiver<M>> {
        self.mailbox.listen(self.context.clone())
    }
}

impl<M: StructuredClone> MessageTarget<M> for BroadcastChannel<M> {
    fn post_message(&self, message: &M, _options: PostOptions<M>) -> TransportResult<()> {
        let origin = self.context.origin().to_string();
        for (label, inbox) in self.registry.peers(&self.key, self.id) {
            let delivery = Delivery::new(message, origin.clone(), None, Vec::new())?;
            deliver(&inbox, &label, delivery);
        }
        Ok(())
    }

    fn label(&self) -> String {
        self.mailbox.label().to_string()
    }
}

impl<M: StructuredClone> Drop for BroadcastChannel<M> {
    fn drop(&mut self) {
        self.registry.unsubscribe(&self.key, self.id);
    }
}
