use std::collections::HashSet;

use todo_grpc::client::ClientError;
use todo_grpc::client::TodoClient;
use todo_grpc::NetworkConfig;
use todo_grpc::Todo;
use todo_grpc::TodoPatch;
use todo_grpc::TodoServerConfig;

use crate::common::TestServer;

#[tokio::test]
async fn test_create_list_and_partial_update() {
    let server = TestServer::start().await;
    let client = server.client().await;

    let milk = client.create("buy milk").await.unwrap();
    let eggs = client.create("buy eggs").await.unwrap();
    assert_eq!(milk, Todo::new("0", "buy milk"));
    assert_eq!(eggs.id, "1");

    let ids: HashSet<String> = client.list().await.unwrap().into_iter().map(|t| t.id).collect();
    assert_eq!(ids, HashSet::from(["0".to_string(), "1".to_string()]));

    let updated = client.update("0", TodoPatch::completed(true)).await.unwrap();
    assert_eq!(
        updated,
        Todo {
            id: "0".into(),
            title: "buy milk".into(),
            completed: true,
        }
    );

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_update_unknown_id_is_not_found() {
    let server = TestServer::start().await;
    let client = server.client().await;

    let err = client.update("99", TodoPatch::title("x")).await.unwrap_err();

    assert!(matches!(err, ClientError::NotFound(_)), "unexpected {err:?}");
    assert!(client.list().await.unwrap().is_empty());
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_delete_is_idempotent_and_ids_are_not_reused() {
    let server = TestServer::start().await;
    let client = server.client().await;

    let first = client.create("a").await.unwrap();
    client.delete(&first.id).await.unwrap();
    client.delete(&first.id).await.unwrap();
    client.delete("never-existed").await.unwrap();
    let second = client.create("b").await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(client.list().await.unwrap(), vec![second]);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_compressed_round_trip() {
    let server = TestServer::start_with(TodoServerConfig {
        network: NetworkConfig {
            enable_compression: true,
            ..Default::default()
        },
        ..Default::default()
    })
    .await;
    let client = TodoClient::builder(server.endpoint())
        .enable_compression(true)
        .build()
        .await
        .unwrap();

    let todo = client.create("x".repeat(4096)).await.unwrap();

    assert_eq!(todo.title.len(), 4096);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_compressed_requests_accepted_without_server_compression() {
    let server = TestServer::start().await;
    let client = TodoClient::builder(server.endpoint())
        .enable_compression(true)
        .build()
        .await
        .unwrap();

    let todo = client.create("x".repeat(4096)).await.unwrap();

    assert_eq!(todo.title.len(), 4096);
    assert_eq!(client.list().await.unwrap(), vec![todo]);
    server.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_get_unique_ids() {
    let server = TestServer::start().await;
    let client = server.client().await;

    let mut handles = Vec::new();
    for i in 0..16 {
        let client = client.clone();
        handles.push(tokio::spawn(async move { client.create(format!("todo {i}")).await }));
    }
    let mut ids = HashSet::new();
    for h in handles {
        ids.insert(h.await.unwrap().unwrap().id);
    }

    assert_eq!(ids.len(), 16);
    assert_eq!(client.list().await.unwrap().len(), 16);
    server.shutdown().await.unwrap();
}
