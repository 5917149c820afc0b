//! Broker client against the in-memory transport: replay, callbacks,
//! routing and offline behaviour.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use roomhub::adapters::memory_broker::MemoryBroker;
use roomhub::error::CommsError;
use roomhub::integration::mqtt::{ConnectionState, MqttClient};

fn client() -> (Arc<MqttClient>, Arc<MemoryBroker>) {
    let broker = Arc::new(MemoryBroker::new());
    let client = MqttClient::new(broker.clone(), "mqtt://test:1883", "room/state");
    (client, broker)
}

#[test]
fn nothing_happens_before_network_ready() {
    let (client, broker) = client();
    client.subscribe("a/set", Arc::new(|_: &str, _: &str| {}));

    assert_eq!(broker.starts(), 0);
    assert!(broker.subscribed().is_empty());
    assert!(!broker.connect(), "no handler before start");
    assert_eq!(
        client.try_publish("a/state", "x", false),
        Err(CommsError::NetworkNotReady)
    );
}

#[test]
fn network_ready_starts_once() {
    let (client, broker) = client();
    client.on_network_ready().unwrap();
    client.on_network_ready().unwrap();
    assert_eq!(broker.starts(), 1);
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[test]
fn each_connect_replays_every_topic_once() {
    let (client, broker) = client();
    client.subscribe("a/set", Arc::new(|_: &str, _: &str| {}));
    client.subscribe("b/set", Arc::new(|_: &str, _: &str| {}));
    // Replacing a handler keeps one subscription per topic.
    client.subscribe("a/set", Arc::new(|_: &str, _: &str| {}));
    assert_eq!(client.subscription_count(), 2);

    client.on_network_ready().unwrap();
    assert!(broker.subscribed().is_empty());

    for _ in 0..3 {
        broker.connect();
        let mut subs = broker.subscribed();
        subs.sort();
        assert_eq!(subs, vec!["a/set".to_string(), "b/set".to_string()]);
        broker.disconnect();
        broker.clear();
    }
}

#[test]
fn subscribe_while_connected_is_issued_immediately() {
    let (client, broker) = client();
    client.on_network_ready().unwrap();
    broker.connect();

    client.subscribe("late/set", Arc::new(|_: &str, _: &str| {}));
    assert_eq!(broker.subscribed(), vec!["late/set".to_string()]);
}

#[test]
fn callbacks_fire_once_per_connected_transition() {
    let (client, broker) = client();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    client.on_connected(Arc::new(move |_: &MqttClient| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    client.on_network_ready().unwrap();
    broker.connect();
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    broker.disconnect();
    assert!(!client.is_connected());
    broker.connect();
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

#[test]
fn callback_registered_while_connected_runs_now() {
    let (client, broker) = client();
    client.on_network_ready().unwrap();
    broker.connect();

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    client.on_connected(Arc::new(move |_: &MqttClient| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn callback_may_publish_through_the_client() {
    let (client, broker) = client();
    client.on_connected(Arc::new(|c: &MqttClient| {
        assert!(c.publish("room/online", "1", true));
    }));
    client.on_network_ready().unwrap();
    broker.connect();

    let published = broker.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, "room/online");
    assert!(published[0].retain);
}

#[test]
fn messages_reach_the_matching_handler_only() {
    let (client, broker) = client();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    client.subscribe(
        "lamp/set",
        Arc::new(move |topic: &str, payload: &str| {
            log.lock().unwrap().push(format!("{topic}={payload}"));
        }),
    );
    client.on_network_ready().unwrap();
    broker.connect();

    broker.deliver("lamp/set", "ON");
    broker.deliver("fan/set", "OFF");
    assert_eq!(*seen.lock().unwrap(), vec!["lamp/set=ON".to_string()]);
}

#[test]
fn publish_while_disconnected_is_dropped() {
    let (client, broker) = client();
    client.on_network_ready().unwrap();

    assert!(!client.publish("room/state", "x", false));
    assert_eq!(
        client.try_publish("room/state", "x", false),
        Err(CommsError::NotConnected)
    );
    assert!(broker.published().is_empty());

    broker.connect();
    assert!(client.publish("room/state", "x", false));
    assert_eq!(broker.payloads_on("room/state"), vec!["x".to_string()]);
}

#[test]
fn status_reports_connection() {
    let (client, broker) = client();
    client.on_network_ready().unwrap();
    assert_eq!(client.status_json()["connected"], false);
    broker.connect();
    let status = client.status_json();
    assert_eq!(status["connected"], true);
    assert_eq!(status["broker"], "mqtt://test:1883");
    assert_eq!(status["topic"], "room/state");
}
