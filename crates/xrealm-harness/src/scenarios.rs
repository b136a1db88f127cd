// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Conformance scenarios
//!
//! Every scenario builds its own [`Host`], so nothing leaks between runs:
//! a driver window in the primary origin, a remote realm running a router,
//! and whatever transport the scenario is about.

use crate::fixtures::fixture_batch;
use crate::remote::{Link, Remote};
use crate::verify::{verify_message_error, verify_round_trip, verify_same_entry};
use crate::wait::{expect_envelope, expect_error_reply, expect_quiet, wait_for_envelope};
use anyhow::{bail, ensure, Context, Result};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use xrealm_core::{CREATED_DIRECTORY_NAME, CREATED_FILE_NAME};
use xrealm_host::{FileSystemHandle, Host, Origin, PostOptions, Realm};
use xrealm_proto::{CloneValue, Envelope, EnvelopeType, Message, UnrecognizedEnvelope};

/// How long to watch for stray replies after the expected one.
const QUIET_PERIOD: Duration = Duration::from_millis(50);

pub const BROADCAST_CHANNEL_NAME: &str = "xrealm-handles";
pub const UNKNOWN_TYPE_PROBE: &str = "not-a-known-type";

#[derive(Clone, Debug)]
pub struct ScenarioContext {
    pub primary_origin: Origin,
    pub cross_origin: Origin,
}

impl Default for ScenarioContext {
    fn default() -> Self {
        Self {
            primary_origin: Origin::new("https://primary.test"),
            cross_origin: Origin::new("https://cross.test"),
        }
    }
}

type ScenarioFn = fn(ScenarioContext) -> BoxFuture<'static, Result<()>>;

pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    run: ScenarioFn,
}

impl Scenario {
    pub fn run(&self, context: ScenarioContext) -> BoxFuture<'static, Result<()>> {
        (self.run)(context)
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario").field("name", &self.name).finish()
    }
}

static SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "window-post-message",
        description: "handles sent to a same-origin window come back with equal snapshots",
        run: |ctx| window_post_message(ctx).boxed(),
    },
    Scenario {
        name: "dedicated-worker",
        description: "handles sent to a dedicated worker; replies use the fallback target",
        run: |ctx| dedicated_worker(ctx).boxed(),
    },
    Scenario {
        name: "message-port",
        description: "handles sent over a transferred message port",
        run: |ctx| message_port(ctx).boxed(),
    },
    Scenario {
        name: "broadcast-channel",
        description: "handles sent over a named broadcast channel",
        run: |ctx| broadcast_channel(ctx).boxed(),
    },
    Scenario {
        name: "cross-origin-window",
        description: "handles sent to another origin fail with a messageerror",
        run: |ctx| cross_origin_window(ctx).boxed(),
    },
    Scenario {
        name: "cross-origin-message-port",
        description: "handles sent over a port into another origin fail without a source",
        run: |ctx| cross_origin_message_port(ctx).boxed(),
    },
    Scenario {
        name: "remote-created-file",
        description: "a file created by the remote resolves to the same entry locally",
        run: |ctx| remote_created_file(ctx).boxed(),
    },
    Scenario {
        name: "remote-created-directory",
        description: "a directory created by the remote resolves to the same entry locally",
        run: |ctx| remote_created_directory(ctx).boxed(),
    },
    Scenario {
        name: "unknown-message-type",
        description: "an unrecognized envelope type is answered with an ERROR reply",
        run: |ctx| unknown_message_type(ctx).boxed(),
    },
];

pub fn all() -> &'static [Scenario] {
    SCENARIOS
}

pub fn find(name: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|scenario| scenario.name == name)
}

fn driver(ctx: &ScenarioContext) -> Realm<Message> {
    Host::new().create_window(ctx.primary_origin.clone(), "driver")
}

/// Sends the fixture batch over `link` and checks what comes back.
async fn send_fixture_batch(driver: &Realm<Message>, link: &mut Link) -> Result<()> {
    let originals = fixture_batch(&driver.storage_root())
        .await
        .context("creating fixture handles")?;
    link.send(Envelope::ReceiveFileSystemHandles {
        file_system_handles: originals.iter().cloned().map(CloneValue::from).collect(),
    })?;

    let reply = wait_for_envelope(
        &mut link.events,
        EnvelopeType::ReceiveSerializedFileSystemHandles,
    )
    .await?;
    let Envelope::ReceiveSerializedFileSystemHandles {
        serialized_file_system_handles,
    } = reply
    else {
        bail!("reply changed type after matching");
    };
    verify_round_trip(&originals, &serialized_file_system_handles).await?;
    info!(handles = originals.len(), "batch round-tripped");
    expect_quiet(&mut link.events, QUIET_PERIOD).await
}

async fn window_post_message(ctx: ScenarioContext) -> Result<()> {
    let driver = driver(&ctx);
    let mut remote = Remote::window(&driver, &ctx.primary_origin, "remote-window")?;
    send_fixture_batch(&driver, &mut remote.link).await
}

async fn dedicated_worker(ctx: ScenarioContext) -> Result<()> {
    let driver = driver(&ctx);
    let mut remote = Remote::worker(&driver, "remote-worker")?;
    send_fixture_batch(&driver, &mut remote.link).await
}

async fn message_port(ctx: ScenarioContext) -> Result<()> {
    let driver = driver(&ctx);
    let remote = Remote::window(&driver, &ctx.primary_origin, "remote-window")?;

    let channel = driver.message_channel();
    let events = channel.port1.start()?;
    remote.link.send_with(
        Envelope::ReceiveMessagePort {
            message_port: channel.port2.clone(),
        },
        PostOptions::transfer(vec![channel.port2]),
    )?;

    let mut port_link = Link::new(Arc::new(channel.port1), events);
    send_fixture_batch(&driver, &mut port_link).await
}

async fn broadcast_channel(ctx: ScenarioContext) -> Result<()> {
    let driver = driver(&ctx);
    let mut remote = Remote::window(&driver, &ctx.primary_origin, "remote-window")?;

    remote.link.send(Envelope::CreateBroadcastChannel {
        broadcast_channel_name: BROADCAST_CHANNEL_NAME.to_string(),
    })?;
    wait_for_envelope(&mut remote.link.events, EnvelopeType::BroadcastChannelCreated).await?;

    let channel = driver.open_broadcast_channel(BROADCAST_CHANNEL_NAME);
    let events = channel.listen()?;
    let mut channel_link = Link::new(Arc::new(channel), events);
    send_fixture_batch(&driver, &mut channel_link).await
}

async fn cross_origin_window(ctx: ScenarioContext) -> Result<()> {
    ensure!(
        ctx.primary_origin != ctx.cross_origin,
        "cross origin must differ from the primary origin"
    );
    let driver = driver(&ctx);
    let mut remote = Remote::window(&driver, &ctx.cross_origin, "cross-origin-window")?;

    let originals = fixture_batch(&driver.storage_root()).await?;
    remote.link.send(Envelope::ReceiveFileSystemHandles {
        file_system_handles: originals.into_iter().map(CloneValue::from).collect(),
    })?;

    let reply =
        expect_envelope(&mut remote.link.events, EnvelopeType::SerializedMessageError).await?;
    let Envelope::SerializedMessageError {
        serialized_message_error_event,
    } = reply
    else {
        bail!("reply changed type after matching");
    };
    verify_message_error(&serialized_message_error_event, &ctx.primary_origin, true)?;
    expect_quiet(&mut remote.link.events, QUIET_PERIOD).await
}

async fn cross_origin_message_port(ctx: ScenarioContext) -> Result<()> {
    ensure!(
        ctx.primary_origin != ctx.cross_origin,
        "cross origin must differ from the primary origin"
    );
    let driver = driver(&ctx);
    let remote = Remote::window(&driver, &ctx.cross_origin, "cross-origin-window")?;

    let channel = driver.message_channel();
    let events = channel.port1.start()?;
    remote.link.send_with(
        Envelope::ReceiveMessagePort {
            message_port: channel.port2.clone(),
        },
        PostOptions::transfer(vec![channel.port2]),
    )?;
    let mut port_link = Link::new(Arc::new(channel.port1), events);

    let originals = fixture_batch(&driver.storage_root()).await?;
    port_link.send(Envelope::ReceiveFileSystemHandles {
        file_system_handles: originals.into_iter().map(CloneValue::from).collect(),
    })?;

    let reply =
        expect_envelope(&mut port_link.events, EnvelopeType::SerializedMessageError).await?;
    let Envelope::SerializedMessageError {
        serialized_message_error_event,
    } = reply
    else {
        bail!("reply changed type after matching");
    };
    // Port events carry no origin and no source; the reply used the port.
    verify_message_error(&serialized_message_error_event, &Origin::new(""), false)?;
    expect_quiet(&mut port_link.events, QUIET_PERIOD).await
}

async fn remote_created_file(ctx: ScenarioContext) -> Result<()> {
    let driver = driver(&ctx);
    let mut remote = Remote::window(&driver, &ctx.primary_origin, "remote-window")?;

    remote.link.send(Envelope::CreateFile)?;
    let Envelope::ReceiveFile { file_handle } =
        wait_for_envelope(&mut remote.link.events, EnvelopeType::ReceiveFile).await?
    else {
        bail!("reply changed type after matching");
    };

    let local = driver
        .storage_root()
        .get_file_handle(CREATED_FILE_NAME, false)
        .await
        .context("looking up the remotely created file")?;
    local.write("written by the driver").await?;
    verify_same_entry(&FileSystemHandle::from(file_handle), &local.into()).await
}

async fn remote_created_directory(ctx: ScenarioContext) -> Result<()> {
    let driver = driver(&ctx);
    let mut remote = Remote::window(&driver, &ctx.primary_origin, "remote-window")?;

    remote.link.send(Envelope::CreateDirectory)?;
    let Envelope::ReceiveDirectory { directory_handle } =
        wait_for_envelope(&mut remote.link.events, EnvelopeType::ReceiveDirectory).await?
    else {
        bail!("reply changed type after matching");
    };

    let local = driver
        .storage_root()
        .get_directory_handle(CREATED_DIRECTORY_NAME, false)
        .await
        .context("looking up the remotely created directory")?;
    local.get_file_handle("child.txt", true).await?;
    verify_same_entry(&FileSystemHandle::from(directory_handle), &local.into()).await
}

async fn unknown_message_type(ctx: ScenarioContext) -> Result<()> {
    let driver = driver(&ctx);
    let mut remote = Remote::window(&driver, &ctx.primary_origin, "remote-window")?;

    remote
        .link
        .send(Message::Unrecognized(UnrecognizedEnvelope::new(UNKNOWN_TYPE_PROBE)))?;
    let description = expect_error_reply(&mut remote.link.events).await?;
    let expected = format!("Unknown message type: '{}'", UNKNOWN_TYPE_PROBE);
    ensure!(
        description == expected,
        "error reply was '{}' (expected '{}')",
        description,
        expected
    );
    expect_quiet(&mut remote.link.events, QUIET_PERIOD).await
}
