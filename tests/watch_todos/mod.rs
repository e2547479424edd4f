use std::time::Duration;

use tokio::time::timeout;
use todo_grpc::client::ClientError;
use todo_grpc::Todo;
use todo_grpc::TodoEvent;
use todo_grpc::TodoPatch;

use crate::common::TestServer;

const QUIET_PERIOD: Duration = Duration::from_millis(100);

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_watcher_receives_created_todo_exactly_once() {
    let server = TestServer::start().await;
    let watcher = server.client().await;
    let writer = server.client().await;

    let mut stream = watcher.watch().await.unwrap();
    stream.start().await.unwrap();
    server.wait_for_subscribers(1).await;

    let created = writer.create("buy milk").await.unwrap();

    let event = stream.next_event().await.unwrap().unwrap();
    assert_eq!(event, TodoEvent::Upserted(created));
    assert!(
        timeout(QUIET_PERIOD, stream.next_event()).await.is_err(),
        "no duplicate delivery"
    );

    drop(stream);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_nothing_is_delivered_before_start() {
    let server = TestServer::start().await;
    let client = server.client().await;

    let mut stream = client.watch().await.unwrap();
    client.create("unseen").await.unwrap();

    assert!(timeout(QUIET_PERIOD, stream.next_event()).await.is_err());
    assert_eq!(server.broker.subscriber_count().await, 0);

    drop(stream);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_mutations_arrive_in_order_with_delete_marker() {
    let server = TestServer::start().await;
    let client = server.client().await;

    let mut stream = client.watch().await.unwrap();
    stream.start().await.unwrap();
    server.wait_for_subscribers(1).await;

    let created = client.create("buy milk").await.unwrap();
    let updated = client.update(&created.id, TodoPatch::completed(true)).await.unwrap();
    client.delete(&created.id).await.unwrap();

    assert_eq!(stream.next_event().await.unwrap(), Some(TodoEvent::Upserted(created)));
    assert_eq!(stream.next_event().await.unwrap(), Some(TodoEvent::Upserted(updated)));
    let deleted = stream.next_event().await.unwrap().unwrap();
    assert!(deleted.is_deleted());
    assert_eq!(deleted.todo(), &Todo::tombstone("0"));

    drop(stream);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_duplicate_start_does_not_duplicate_events() {
    let server = TestServer::start().await;
    let client = server.client().await;

    let mut stream = client.watch().await.unwrap();
    stream.start().await.unwrap();
    stream.start().await.unwrap();
    server.wait_for_subscribers(1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(server.broker.subscriber_count().await, 1);

    client.create("once").await.unwrap();

    assert!(stream.next_event().await.unwrap().is_some());
    assert!(timeout(QUIET_PERIOD, stream.next_event()).await.is_err());

    drop(stream);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_stop_ends_stream_and_releases_subscription() {
    let server = TestServer::start().await;
    let client = server.client().await;

    let mut stream = client.watch().await.unwrap();
    stream.start().await.unwrap();
    server.wait_for_subscribers(1).await;

    stream.stop().await.unwrap();

    assert_eq!(stream.next_event().await.unwrap(), None);
    server.wait_for_subscribers(0).await;
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_dropping_the_stream_releases_subscription() {
    let server = TestServer::start().await;
    let client = server.client().await;

    let stream = client.watch().await.unwrap();
    stream.start().await.unwrap();
    server.wait_for_subscribers(1).await;

    drop(stream);

    server.wait_for_subscribers(0).await;
    // Writers are not blocked by the departed watcher
    timeout(Duration::from_secs(1), client.create("after disconnect"))
        .await
        .expect("create must not stall")
        .unwrap();
    server.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_all_watchers_see_the_same_order() {
    let server = TestServer::start().await;
    let client = server.client().await;

    let mut streams = Vec::new();
    for _ in 0..3 {
        let stream = client.watch().await.unwrap();
        stream.start().await.unwrap();
        streams.push(stream);
    }
    server.wait_for_subscribers(3).await;

    let mut writers = Vec::new();
    for w in 0..3 {
        let client = client.clone();
        writers.push(tokio::spawn(async move {
            for i in 0..5 {
                client.create(format!("{w}-{i}")).await.unwrap();
            }
        }));
    }
    for writer in writers {
        writer.await.unwrap();
    }

    let mut sequences = Vec::new();
    for stream in streams.iter_mut() {
        let mut seen = Vec::new();
        for _ in 0..15 {
            seen.push(stream.next_event().await.unwrap().unwrap().id().to_string());
        }
        sequences.push(seen);
    }

    assert_eq!(sequences[0], sequences[1]);
    assert_eq!(sequences[1], sequences[2]);

    drop(streams);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_ends_open_watch_streams_with_unavailable() {
    let server = TestServer::start().await;
    let client = server.client().await;

    let mut idle = client.watch().await.unwrap();
    let mut watching = client.watch().await.unwrap();
    watching.start().await.unwrap();
    server.wait_for_subscribers(1).await;
    let broker = server.broker.clone();

    let shutdown = tokio::spawn(server.shutdown());

    for stream in [&mut idle, &mut watching] {
        let err = stream.next_event().await.unwrap_err();
        assert!(matches!(err, ClientError::Unavailable(_)), "unexpected {err:?}");
    }
    shutdown.await.unwrap().unwrap();
    assert_eq!(broker.subscriber_count().await, 0);
}
