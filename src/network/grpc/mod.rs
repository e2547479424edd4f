//! gRPC server for the todo service.
//!
//! Unary RPCs go straight to [`TodoManager`](crate::TodoManager).
//! `WatchTodos` streams are handed to the watch dispatcher, which owns the
//! per-stream sessions.

mod grpc_todo_service;
pub use grpc_todo_service::*;


//-------------------------------------------------------------------------------
// Start RPC Server
use std::time::Duration;

use futures::FutureExt;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tonic::codec::CompressionEncoding;
use tonic::transport::server::TcpIncoming;
use tonic_health::server::health_reporter;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::proto;
use crate::proto::todo_service_server::TodoServiceServer;
use crate::Error;
use crate::NetworkConfig;
use crate::Result;
use crate::SystemError;

/// Serves the todo service on an already bound listener until the shutdown
/// signal fires.
///
/// In-flight calls are allowed to finish. Watch streams only end once their
/// sessions terminate, which the dispatcher drives on the same signal.
pub async fn start_rpc_server(
    service: TodoRpcService,
    listener: TcpListener,
    config: &NetworkConfig,
    mut shutdown_signal: watch::Receiver<()>,
) -> Result<()> {
    let local_addr = listener.local_addr()?;

    // Create a HealthReporter to manage the health status
    let (mut health_reporter, health_service) = health_reporter();
    health_reporter
        .set_serving::<TodoServiceServer<TodoRpcService>>()
        .await;

    let keepalive = Some(Duration::from_secs(config.tcp_keepalive_in_secs));
    let incoming = TcpIncoming::from_listener(listener, config.tcp_nodelay, keepalive)
        .map_err(|e| Error::Fatal(format!("failed to accept on {local_addr}: {e}")))?;

    let mut todo_service =
        TodoServiceServer::new(service).accept_compressed(CompressionEncoding::Gzip);
    if config.enable_compression {
        todo_service = todo_service.send_compressed(CompressionEncoding::Gzip);
    }

    let reflection_service = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(proto::FILE_DESCRIPTOR_SET)
        .register_encoded_file_descriptor_set(tonic_health::pb::FILE_DESCRIPTOR_SET)
        .build_v1()
        .map_err(|e| Error::Fatal(format!("failed to build reflection service: {e}")))?;

    info!("gRPC server listening on {}", local_addr);

    if let Err(e) = tonic::transport::Server::builder()
        .concurrency_limit_per_connection(config.concurrency_limit)
        .max_concurrent_streams(Some(config.max_concurrent_streams))
        .http2_keepalive_interval(Some(Duration::from_secs(
            config.http2_keep_alive_interval_in_secs,
        )))
        .http2_keepalive_timeout(Some(Duration::from_secs(
            config.http2_keep_alive_timeout_in_secs,
        )))
        .initial_stream_window_size(config.stream_window_size)
        .initial_connection_window_size(config.connection_window_size)
        .http2_adaptive_window(Some(config.adaptive_window))
        .add_service(health_service)
        .add_service(reflection_service)
        .add_service(todo_service)
        .serve_with_incoming_shutdown(
            incoming,
            shutdown_signal.changed().map(move |_| {
                warn!("Stopping RPC server. {}", local_addr);
            }),
        )
        .await
    {
        error!("error to start rpc server :{:?}.", e);
        return Err(SystemError::ServerUnavailable.into());
    }

    debug!("rpc service finished!");
    Ok(())
}
