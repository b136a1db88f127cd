// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Host: owner of origins, storage and realms

use crate::error::TransportResult;
use crate::fs::{DirectoryHandle, FileSystem};
use crate::transport::{
    BroadcastChannel, BroadcastRegistry, Endpoint, EventReceiver, Mailbox, MessageChannel,
    WindowProxy, WindowRef, Worker,
};
use crate::{ContextKind, ExecutionContext, Origin, StructuredClone};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

struct HostInner<M: StructuredClone> {
    storage: Mutex<HashMap<Origin, FileSystem>>,
    broadcast: Arc<BroadcastRegistry<M>>,
}

/// One simulated user agent. Realms created from the same host share
/// per-origin storage and broadcast channels; separate hosts share nothing.
pub struct Host<M: StructuredClone> {
    inner: Arc<HostInner<M>>,
}

impl<M: StructuredClone> Clone for Host<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: StructuredClone> Default for Host<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: StructuredClone> Host<M> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HostInner {
                storage: Mutex::new(HashMap::new()),
                broadcast: Arc::new(BroadcastRegistry::default()),
            }),
        }
    }

    /// Origin-private file system, created on first use.
    pub fn file_system(&self, origin: &Origin) -> FileSystem {
        self.inner
            .storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(origin.clone())
            .or_insert_with(|| FileSystem::new(origin.clone()))
            .clone()
    }

    pub fn create_window(&self, origin: impl Into<Origin>, label: &str) -> Realm<M> {
        let context = ExecutionContext::new(ContextKind::Window, origin.into(), label);
        tracing::debug!(realm = label, origin = %context.origin(), "window created");
        Realm::new(self.clone(), context, None)
    }

    /// Starts a same-origin dedicated worker owned by `parent`.
    pub fn spawn_dedicated_worker(&self, parent: &Realm<M>, label: &str) -> (Worker<M>, Realm<M>) {
        let context = ExecutionContext::new(
            ContextKind::DedicatedWorker,
            parent.origin().clone(),
            label,
        );
        let mailbox = Mailbox::new(format!("scope:{}", label));
        let (worker, back) = Worker::new(parent.context().clone(), mailbox.inbox(), label);
        let back: Endpoint<M> = Arc::new(back);
        tracing::debug!(realm = label, parent = parent.label(), "dedicated worker started");
        let realm = Realm {
            inner: Arc::new(RealmInner {
                host: self.clone(),
                context,
                mailbox,
                parent: Some(back),
            }),
        };
        (worker, realm)
    }

    /// Number of open channel objects for `name` in `origin`.
    pub fn broadcast_subscribers(&self, origin: &Origin, name: &str) -> usize {
        self.inner.broadcast.subscriber_count(origin, name)
    }
}

struct RealmInner<M: StructuredClone> {
    host: Host<M>,
    context: ExecutionContext,
    mailbox: Mailbox<M>,
    parent: Option<Endpoint<M>>,
}

/// A window or worker global scope.
pub struct Realm<M: StructuredClone> {
    inner: Arc<RealmInner<M>>,
}

impl<M: StructuredClone> Clone for Realm<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: StructuredClone> Realm<M> {
    fn new(host: Host<M>, context: ExecutionContext, parent: Option<Endpoint<M>>) -> Self {
        let mailbox = Mailbox::new(context.label().to_string());
        Self {
            inner: Arc::new(RealmInner {
                host,
                context,
                mailbox,
                parent,
            }),
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.inner.context
    }

    pub fn origin(&self) -> &Origin {
        self.inner.context.origin()
    }

    pub fn label(&self) -> &str {
        self.inner.context.label()
    }

    pub fn host(&self) -> &Host<M> {
        &self.inner.host
    }

    /// Messages posted to this realm's global scope.
    pub fn listen(&self) -> TransportResult<EventReceiver<M>> {
        self.inner.mailbox.listen(self.inner.context.clone())
    }

    /// Proxy through which this realm posts to `target`.
    pub fn window_proxy(&self, target: &Realm<M>) -> WindowProxy<M> {
        WindowProxy::new(self.window_ref(), target.window_ref())
    }

    fn window_ref(&self) -> WindowRef<M> {
        WindowRef {
            context: self.inner.context.clone(),
            inbox: self.inner.mailbox.inbox(),
        }
    }

    /// The owning window's `Worker` object, for worker realms.
    pub fn parent(&self) -> Option<Endpoint<M>> {
        self.inner.parent.clone()
    }

    pub fn message_channel(&self) -> MessageChannel<M> {
        MessageChannel::new(&self.inner.context)
    }

    pub fn open_broadcast_channel(&self, name: &str) -> BroadcastChannel<M> {
        BroadcastChannel::open(
            Arc::clone(&self.inner.host.inner.broadcast),
            &self.inner.context,
            name,
        )
    }

    pub fn file_system(&self) -> FileSystem {
        self.inner.host.file_system(self.origin())
    }

    /// Root of the realm's origin-private file system.
    pub fn storage_root(&self) -> DirectoryHandle {
        self.file_system().root()
    }
}
