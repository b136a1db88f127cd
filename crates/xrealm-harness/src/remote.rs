// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Remote realms with a router attached, as seen from the driver

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use xrealm_core::{attach_router, RouterConfig};
use xrealm_host::{Endpoint, EventReceiver, Origin, PostOptions, Realm};
use xrealm_proto::Message;

/// Something the driver can send to plus where replies show up.
pub struct Link {
    pub endpoint: Endpoint<Message>,
    pub events: EventReceiver<Message>,
}

impl Link {
    pub fn new(endpoint: Endpoint<Message>, events: EventReceiver<Message>) -> Self {
        Self { endpoint, events }
    }

    pub fn send(&self, message: impl Into<Message>) -> Result<()> {
        self.send_with(message, PostOptions::default())
    }

    pub fn send_with(
        &self,
        message: impl Into<Message>,
        options: PostOptions<Message>,
    ) -> Result<()> {
        let message = message.into();
        tracing::debug!(endpoint = %self.endpoint.label(), message_type = %message.type_tag(), "sending");
        self.endpoint
            .post_message(&message, options)
            .with_context(|| format!("posting to {}", self.endpoint.label()))
    }
}

/// A realm running a router, reachable through `link`. Dropping it stops
/// the router.
pub struct Remote {
    pub realm: Realm<Message>,
    pub link: Link,
    router: JoinHandle<()>,
}

impl Remote {
    /// Opens a window in `origin` that replies to the event source.
    pub fn window(local: &Realm<Message>, origin: &Origin, label: &str) -> Result<Self> {
        let realm = local.host().create_window(origin.clone(), label);
        let router = attach_router(
            realm.clone(),
            realm.listen().context("listening in remote window")?,
            RouterConfig::default(),
        );
        let endpoint: Endpoint<Message> = Arc::new(local.window_proxy(&realm));
        let events = local.listen().context("listening in driver window")?;
        Ok(Self {
            realm,
            link: Link::new(endpoint, events),
            router,
        })
    }

    /// Starts a dedicated worker whose router replies to its parent.
    pub fn worker(local: &Realm<Message>, label: &str) -> Result<Self> {
        let (worker, realm) = local.host().spawn_dedicated_worker(local, label);
        let parent = realm
            .parent()
            .context("dedicated worker has no parent endpoint")?;
        let router = attach_router(
            realm.clone(),
            realm.listen().context("listening in worker scope")?,
            RouterConfig::with_reply_target(parent),
        );
        let events = worker.listen().context("listening on worker object")?;
        Ok(Self {
            realm,
            link: Link::new(Arc::new(worker), events),
            router,
        })
    }
}

impl Drop for Remote {
    fn drop(&mut self) {
        self.router.abort();
    }
}
