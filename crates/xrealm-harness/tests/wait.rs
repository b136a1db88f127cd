// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::sync::Arc;
use std::time::Duration;
use xrealm_harness::wait::{expect_quiet, wait_for_envelope};
use xrealm_harness::Link;
use xrealm_host::{Endpoint, Host};
use xrealm_proto::{Envelope, EnvelopeType, Message};

fn loopback() -> Link {
    let host: Host<Message> = Host::new();
    let a = host.create_window("https://primary.test", "a");
    let b = host.create_window("https://primary.test", "b");
    let to_a: Endpoint<Message> = Arc::new(b.window_proxy(&a));
    Link::new(to_a, a.listen().unwrap())
}

#[tokio::test]
async fn a_duplicate_reply_breaks_the_quiet_period() {
    let mut link = loopback();
    link.send(Envelope::BroadcastChannelCreated).unwrap();
    link.send(Envelope::BroadcastChannelCreated).unwrap();

    wait_for_envelope(&mut link.events, EnvelopeType::BroadcastChannelCreated)
        .await
        .unwrap();
    let err = expect_quiet(&mut link.events, Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("unexpected extra message"), "{}", err);
}

#[tokio::test]
async fn a_single_reply_stays_quiet() {
    let mut link = loopback();
    link.send(Envelope::BroadcastChannelCreated).unwrap();

    wait_for_envelope(&mut link.events, EnvelopeType::BroadcastChannelCreated)
        .await
        .unwrap();
    expect_quiet(&mut link.events, Duration::from_millis(50))
        .await
        .unwrap();
}
