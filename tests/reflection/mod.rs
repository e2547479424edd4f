use tokio_stream::StreamExt;
use tonic_reflection::pb::v1::server_reflection_client::ServerReflectionClient;
use tonic_reflection::pb::v1::server_reflection_request::MessageRequest;
use tonic_reflection::pb::v1::server_reflection_response::MessageResponse;
use tonic_reflection::pb::v1::ServerReflectionRequest;

use crate::common::TestServer;

async fn reflect(
    server: &TestServer,
    request: MessageRequest,
) -> MessageResponse {
    let channel = tonic::transport::Endpoint::new(server.endpoint())
        .unwrap()
        .connect()
        .await
        .unwrap();
    let mut client = ServerReflectionClient::new(channel);
    let request = ServerReflectionRequest {
        host: String::new(),
        message_request: Some(request),
    };

    let mut responses = client
        .server_reflection_info(tokio_stream::iter(vec![request]))
        .await
        .unwrap()
        .into_inner();
    let response = responses.next().await.expect("one reflection response").unwrap();
    response.message_response.expect("message response set")
}

#[tokio::test]
async fn test_reflection_lists_served_services() {
    let server = TestServer::start().await;

    let response = reflect(&server, MessageRequest::ListServices(String::new())).await;

    let MessageResponse::ListServicesResponse(list) = response else {
        panic!("unexpected reflection response {response:?}");
    };
    let names: Vec<String> = list.service.into_iter().map(|s| s.name).collect();
    assert!(names.contains(&"todo.TodoService".to_string()), "{names:?}");
    assert!(names.contains(&"grpc.health.v1.Health".to_string()), "{names:?}");
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reflection_resolves_todo_service_symbol() {
    let server = TestServer::start().await;

    let response = reflect(
        &server,
        MessageRequest::FileContainingSymbol("todo.TodoService".into()),
    )
    .await;

    let MessageResponse::FileDescriptorResponse(files) = response else {
        panic!("unexpected reflection response {response:?}");
    };
    assert!(!files.file_descriptor_proto.is_empty());
    server.shutdown().await.unwrap();
}
