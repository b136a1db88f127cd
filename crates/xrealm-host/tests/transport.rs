// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::sync::Arc;
use std::time::Duration;
use xrealm_host::{
    Event, EventReceiver, FileSystemHandle, Host, MessageTarget, PostOptions, StructuredClone,
    TargetOrigin, TransportError,
};

type Batch = Vec<FileSystemHandle>;

async fn next_event<M: StructuredClone>(receiver: &mut EventReceiver<M>) -> Event<M> {
    tokio::time::timeout(Duration::from_secs(2), receiver.recv())
        .await
        .expect("timed out waiting for event")
        .expect("receiver closed")
}

async fn assert_nothing_queued<M: StructuredClone>(receiver: &mut EventReceiver<M>) {
    let outcome = tokio::time::timeout(Duration::from_millis(50), receiver.recv()).await;
    assert!(outcome.is_err(), "unexpected event delivered");
}

#[tokio::test]
async fn window_message_carries_sender_origin_and_source() {
    let host: Host<String> = Host::new();
    let a = host.create_window("https://a.test", "a");
    let b = host.create_window("https://a.test", "b");
    let mut a_events = a.listen().unwrap();
    let mut b_events = b.listen().unwrap();

    a.window_proxy(&b)
        .post_message(&"ping".to_string(), PostOptions::default())
        .unwrap();

    let Event::Message(event) = next_event(&mut b_events).await else {
        panic!("expected a message");
    };
    assert_eq!(event.data, "ping");
    assert_eq!(event.origin, "https://a.test");
    assert_eq!(event.last_event_id, "");

    // Replying through `source` lands in the sender's realm.
    let source = event.source.expect("window messages have a source");
    source
        .post_message(&"pong".to_string(), PostOptions::default())
        .unwrap();
    let Event::Message(reply) = next_event(&mut a_events).await else {
        panic!("expected a reply");
    };
    assert_eq!(reply.data, "pong");
}

#[tokio::test]
async fn mismatched_target_origin_is_never_delivered() {
    let host: Host<String> = Host::new();
    let a = host.create_window("https://a.test", "a");
    let b = host.create_window("https://b.test", "b");
    let mut b_events = b.listen().unwrap();

    let proxy = a.window_proxy(&b);
    proxy
        .post_message(
            &"secret".to_string(),
            PostOptions::target_origin(TargetOrigin::parse("https://c.test")),
        )
        .unwrap();
    assert_nothing_queued(&mut b_events).await;

    proxy
        .post_message(
            &"hello".to_string(),
            PostOptions::target_origin(TargetOrigin::parse("https://b.test")),
        )
        .unwrap();
    assert!(matches!(next_event(&mut b_events).await, Event::Message(e) if e.data == "hello"));
}

#[tokio::test]
async fn cross_origin_handles_become_message_errors() {
    let host: Host<Batch> = Host::new();
    let a = host.create_window("https://a.test", "a");
    let b = host.create_window("https://b.test", "b");
    let mut b_events = b.listen().unwrap();

    let file = a.storage_root().get_file_handle("f.txt", true).await.unwrap();
    a.window_proxy(&b)
        .post_message(&vec![file.into()], PostOptions::default())
        .unwrap();

    let Event::MessageError(event) = next_event(&mut b_events).await else {
        panic!("expected a message error");
    };
    assert_eq!(event.origin, "https://a.test");
    assert_eq!(event.last_event_id, "");
    assert!(event.source.is_some());
    assert!(event.ports.is_empty());
}

#[tokio::test]
async fn worker_messages_have_no_origin_or_source() {
    let host: Host<Batch> = Host::new();
    let window = host.create_window("https://a.test", "main");
    let (worker, scope) = host.spawn_dedicated_worker(&window, "w");
    let mut scope_events = scope.listen().unwrap();
    let mut worker_events = worker.listen().unwrap();

    let dir = window.storage_root().get_directory_handle("d", true).await.unwrap();
    let original: FileSystemHandle = dir.into();
    worker
        .post_message(&vec![original.clone()], PostOptions::default())
        .unwrap();

    let Event::Message(event) = next_event(&mut scope_events).await else {
        panic!("expected a message");
    };
    assert_eq!(event.origin, "");
    assert!(event.source.is_none());
    assert!(!event.data[0].same_instance(&original));
    assert!(event.data[0].is_same_entry(&original));

    let parent = scope.parent().expect("worker realms know their parent");
    parent.post_message(&event.data, PostOptions::default()).unwrap();
    let Event::Message(back) = next_event(&mut worker_events).await else {
        panic!("expected a message from the worker");
    };
    assert!(back.data[0].is_same_entry(&original));
}

#[tokio::test]
async fn ports_are_entangled_and_start_once() {
    let host: Host<String> = Host::new();
    let window = host.create_window("https://a.test", "a");
    let channel = window.message_channel();

    let mut port2_events = channel.port2.start().unwrap();
    assert!(matches!(
        channel.port2.start(),
        Err(TransportError::AlreadyListening(_))
    ));

    channel
        .port1
        .post_message(&"over the port".to_string(), PostOptions::default())
        .unwrap();
    let Event::Message(event) = next_event(&mut port2_events).await else {
        panic!("expected a message");
    };
    assert_eq!(event.data, "over the port");
    assert_eq!(event.origin, "");
    assert!(event.source.is_none());
}

#[tokio::test]
async fn transferred_ports_are_adopted_by_the_receiver() {
    let host: Host<String> = Host::new();
    let a = host.create_window("https://a.test", "a");
    let b = host.create_window("https://a.test", "b");
    let mut b_events = b.listen().unwrap();
    let channel = a.message_channel();

    a.window_proxy(&b)
        .post_message(
            &"port".to_string(),
            PostOptions::transfer(vec![channel.port2.clone()]),
        )
        .unwrap();
    let Event::Message(event) = next_event(&mut b_events).await else {
        panic!("expected a message");
    };
    assert_eq!(event.ports.len(), 1);
    assert_eq!(event.ports[0].owner(), b.context());
    assert_eq!(event.ports[0].id(), channel.port2.id());
}

#[tokio::test]
async fn broadcast_reaches_other_subscribers_only() {
    let host: Host<String> = Host::new();
    let a = host.create_window("https://a.test", "a");
    let b = host.create_window("https://a.test", "b");
    let other_origin = host.create_window("https://b.test", "c");

    let sender = Arc::new(a.open_broadcast_channel("chan"));
    let receiver = b.open_broadcast_channel("chan");
    let stranger = other_origin.open_broadcast_channel("chan");
    assert_eq!(host.broadcast_subscribers(a.origin(), "chan"), 2);

    let mut sender_events = sender.listen().unwrap();
    let mut receiver_events = receiver.listen().unwrap();
    let mut stranger_events = stranger.listen().unwrap();

    sender
        .post_message(&"hi".to_string(), PostOptions::default())
        .unwrap();
    let Event::Message(event) = next_event(&mut receiver_events).await else {
        panic!("expected a broadcast");
    };
    assert_eq!(event.data, "hi");
    assert_eq!(event.origin, "https://a.test");
    assert!(event.source.is_none());

    assert_nothing_queued(&mut sender_events).await;
    assert_nothing_queued(&mut stranger_events).await;

    drop(receiver);
    assert_eq!(host.broadcast_subscribers(a.origin(), "chan"), 1);
}

#[tokio::test]
async fn realms_of_one_origin_share_storage() {
    let host: Host<String> = Host::new();
    let a = host.create_window("https://a.test", "a");
    let b = host.create_window("https://a.test", "b");
    let c = host.create_window("https://c.test", "c");

    let file = a.storage_root().get_file_handle("shared", true).await.unwrap();
    file.write("data").await.unwrap();

    let seen = b.storage_root().get_file_handle("shared", false).await.unwrap();
    assert_eq!(seen.read_text().await.unwrap(), "data");
    assert!(c.storage_root().get_file_handle("shared", false).await.is_err());
}
