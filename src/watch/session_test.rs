use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tonic::Code;

use super::*;
use crate::proto;
use crate::test_utils::enable_logger;
use crate::Broker;
use crate::Todo;
use crate::TodoEvent;
use crate::WatchConfig;

struct Harness {
    broker: Arc<Broker>,
    control_tx: mpsc::Sender<WatchControl>,
    outbound_rx: mpsc::Receiver<std::result::Result<proto::TodoEvent, tonic::Status>>,
    cancel: CancellationToken,
    session: JoinHandle<SessionEnd>,
}

fn spawn_session(config: WatchConfig) -> Harness {
    enable_logger();
    let broker = Arc::new(Broker::new(&config));
    let (control_tx, control_rx) = mpsc::channel(8);
    let (outbound_tx, outbound_rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();

    let session = WatchSession::new(1, broker.clone(), control_rx, outbound_tx, cancel.clone());
    Harness {
        broker,
        control_tx,
        outbound_rx,
        cancel,
        session: tokio::spawn(session.run()),
    }
}

async fn wait_for_subscribers(
    broker: &Broker,
    expected: usize,
) {
    timeout(Duration::from_secs(1), async {
        while broker.subscriber_count().await != expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("subscriber count never reached the expected value");
}

#[tokio::test]
async fn idle_session_receives_nothing() {
    let mut h = spawn_session(WatchConfig::default());

    h.broker.publish(TodoEvent::Upserted(Todo::new("0", "a"))).await;

    assert!(timeout(Duration::from_millis(50), h.outbound_rx.recv()).await.is_err());
    assert_eq!(h.broker.subscriber_count().await, 0);
}

#[tokio::test]
async fn start_forwards_events_as_upserted() {
    let mut h = spawn_session(WatchConfig::default());

    h.control_tx.send(WatchControl::Start).await.unwrap();
    wait_for_subscribers(&h.broker, 1).await;

    h.broker.publish(TodoEvent::Upserted(Todo::new("0", "Buy milk"))).await;

    let event = h.outbound_rx.recv().await.unwrap().unwrap();
    assert_eq!(event.event_type(), proto::TodoEventType::Upserted);
    let todo = event.todo.unwrap();
    assert_eq!(todo.id, "0");
    assert_eq!(todo.title, "Buy milk");
}

#[tokio::test]
async fn duplicate_start_keeps_a_single_subscription() {
    let mut h = spawn_session(WatchConfig::default());

    h.control_tx.send(WatchControl::Start).await.unwrap();
    h.control_tx.send(WatchControl::Start).await.unwrap();
    wait_for_subscribers(&h.broker, 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.broker.subscriber_count().await, 1);

    h.broker.publish(TodoEvent::deleted("3")).await;

    let event = h.outbound_rx.recv().await.unwrap().unwrap();
    assert_eq!(event.event_type(), proto::TodoEventType::Deleted);
    assert!(timeout(Duration::from_millis(50), h.outbound_rx.recv()).await.is_err());
}

#[tokio::test]
async fn stop_unsubscribes_and_ends_stream() {
    let mut h = spawn_session(WatchConfig::default());

    h.control_tx.send(WatchControl::Start).await.unwrap();
    wait_for_subscribers(&h.broker, 1).await;
    h.control_tx.send(WatchControl::Stop).await.unwrap();

    assert_eq!(h.session.await.unwrap(), SessionEnd::Stopped);
    assert_eq!(h.broker.subscriber_count().await, 0);
    assert!(h.outbound_rx.recv().await.is_none());
}

#[tokio::test]
async fn stop_while_idle_terminates() {
    let h = spawn_session(WatchConfig::default());

    h.control_tx.send(WatchControl::Stop).await.unwrap();

    assert_eq!(h.session.await.unwrap(), SessionEnd::Stopped);
}

#[tokio::test]
async fn closing_inbound_releases_subscription() {
    let h = spawn_session(WatchConfig::default());

    h.control_tx.send(WatchControl::Start).await.unwrap();
    wait_for_subscribers(&h.broker, 1).await;
    drop(h.control_tx);

    assert_eq!(h.session.await.unwrap(), SessionEnd::InboundClosed);
    assert_eq!(h.broker.subscriber_count().await, 0);
}

#[tokio::test]
async fn dropped_outbound_is_a_client_disconnect() {
    let h = spawn_session(WatchConfig::default());

    h.control_tx.send(WatchControl::Start).await.unwrap();
    wait_for_subscribers(&h.broker, 1).await;
    drop(h.outbound_rx);

    assert_eq!(h.session.await.unwrap(), SessionEnd::ClientDisconnected);
    assert_eq!(h.broker.subscriber_count().await, 0);
}

#[tokio::test]
async fn stop_does_not_deadlock_against_blocked_publish() {
    let mut h = spawn_session(WatchConfig::default());

    h.control_tx.send(WatchControl::Start).await.unwrap();
    wait_for_subscribers(&h.broker, 1).await;

    // Fill the outbound buffer so the session stalls and the subscription
    // channel backs up behind it
    let publisher = {
        let broker = h.broker.clone();
        tokio::spawn(async move {
            for i in 0..32 {
                broker.publish(TodoEvent::Upserted(Todo::new(i.to_string(), "t"))).await;
            }
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!publisher.is_finished());

    // Draining one slot lets the session reach its next select, where the
    // queued Stop wins over pending deliveries
    h.control_tx.send(WatchControl::Stop).await.unwrap();
    h.outbound_rx.recv().await;

    let end = timeout(Duration::from_secs(1), h.session)
        .await
        .expect("session must terminate")
        .unwrap();
    assert_eq!(end, SessionEnd::Stopped);

    timeout(Duration::from_secs(1), publisher)
        .await
        .expect("publisher must not stay blocked on a stopped session")
        .unwrap();
    assert_eq!(h.broker.subscriber_count().await, 0);
}

#[tokio::test]
async fn cancellation_sends_unavailable_and_ends() {
    let mut h = spawn_session(WatchConfig::default());

    h.control_tx.send(WatchControl::Start).await.unwrap();
    wait_for_subscribers(&h.broker, 1).await;
    h.cancel.cancel();

    assert_eq!(h.session.await.unwrap(), SessionEnd::Shutdown);
    let status = h.outbound_rx.recv().await.unwrap().unwrap_err();
    assert_eq!(status.code(), Code::Unavailable);
    assert_eq!(h.broker.subscriber_count().await, 0);
}

#[tokio::test]
async fn eviction_by_broker_ends_session_with_unavailable() {
    let config = WatchConfig {
        watcher_buffer_size: 1,
        slow_consumer_timeout_ms: 20,
        ..Default::default()
    };
    let broker = Arc::new(Broker::new(&config));
    let (control_tx, control_rx) = mpsc::channel(8);
    // Outbound of one slot that nobody drains makes the session a slow consumer
    let (outbound_tx, mut outbound_rx) = mpsc::channel(1);
    let session = WatchSession::new(7, broker.clone(), control_rx, outbound_tx, CancellationToken::new());
    let handle = tokio::spawn(session.run());

    control_tx.send(WatchControl::Start).await.unwrap();
    wait_for_subscribers(&broker, 1).await;

    for i in 0..4 {
        broker.publish(TodoEvent::Upserted(Todo::new(i.to_string(), "t"))).await;
    }
    assert_eq!(broker.subscriber_count().await, 0);

    // Let the session observe the closed subscription
    let first = outbound_rx.recv().await.unwrap().unwrap();
    assert_eq!(first.todo.unwrap().id, "0");
    let mut saw_unavailable = false;
    while let Some(item) = outbound_rx.recv().await {
        if let Err(status) = item {
            assert_eq!(status.code(), Code::Unavailable);
            saw_unavailable = true;
        }
    }
    assert!(saw_unavailable);
    assert_eq!(handle.await.unwrap(), SessionEnd::SubscriptionClosed);
}
