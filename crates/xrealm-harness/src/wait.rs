// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Waiting for replies

use anyhow::{bail, Result};
use std::time::Duration;
use xrealm_host::{Event, EventReceiver};
use xrealm_proto::{Envelope, EnvelopeType, Message};

async fn next_message(events: &mut EventReceiver<Message>) -> Result<Message> {
    match events.recv().await {
        None => bail!("{} closed while waiting for a reply", events.label()),
        Some(Event::MessageError(event)) => {
            bail!("unexpected messageerror on {}: {}", events.label(), event.error)
        }
        Some(Event::Message(event)) => Ok(event.data),
    }
}

/// Waits for the next envelope of type `expected`, skipping other
/// envelopes. An `ERROR: ...` reply fails the wait.
pub async fn wait_for_envelope(
    events: &mut EventReceiver<Message>,
    expected: EnvelopeType,
) -> Result<Envelope> {
    loop {
        let message = next_message(events).await?;
        if let Some(description) = message.as_error() {
            bail!("remote reported ERROR while waiting for {}: {}", expected, description);
        }
        match message {
            Message::Envelope(envelope) if envelope.kind() == expected => return Ok(envelope),
            other => {
                tracing::debug!(expected = %expected, received = %other.type_tag(), "skipping reply");
            }
        }
    }
}

/// The next message must be an envelope of type `expected`.
pub async fn expect_envelope(
    events: &mut EventReceiver<Message>,
    expected: EnvelopeType,
) -> Result<Envelope> {
    let message = next_message(events).await?;
    if let Some(description) = message.as_error() {
        bail!("expected {} but remote reported ERROR: {}", expected, description);
    }
    match message {
        Message::Envelope(envelope) if envelope.kind() == expected => Ok(envelope),
        other => bail!("expected {} but received {}", expected, other.type_tag()),
    }
}

/// The next message must be an `ERROR: ...` text; returns its description.
pub async fn expect_error_reply(events: &mut EventReceiver<Message>) -> Result<String> {
    let message = next_message(events).await?;
    match message.as_error() {
        Some(description) => Ok(description.to_string()),
        None => bail!("expected an ERROR reply but received {}", message.type_tag()),
    }
}

/// Fails if anything arrives within `grace`.
pub async fn expect_quiet(events: &mut EventReceiver<Message>, grace: Duration) -> Result<()> {
    match tokio::time::timeout(grace, events.recv()).await {
        Err(_) | Ok(None) => Ok(()),
        Ok(Some(Event::Message(event))) => {
            bail!("unexpected extra message: {}", event.data.type_tag())
        }
        Ok(Some(Event::MessageError(event))) => {
            bail!("unexpected extra messageerror: {}", event.error)
        }
    }
}
