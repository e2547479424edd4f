use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use todo_grpc::client::TodoClient;
use todo_grpc::Broker;
use todo_grpc::Result;
use todo_grpc::ServerBuilder;
use todo_grpc::TodoServerConfig;
use tracing_subscriber::EnvFilter;

pub const WAIT_FOR_SERVER_IN_SEC: u64 = 5;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for integration test.");
}

/// A server on an ephemeral localhost port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub broker: Arc<Broker>,
    shutdown_tx: watch::Sender<()>,
    handle: JoinHandle<Result<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(TodoServerConfig::default()).await
    }

    pub async fn start_with(config: TodoServerConfig) -> Self {
        enable_logger();

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown_tx, shutdown_rx) = watch::channel(());

        let server = ServerBuilder::init(config, shutdown_rx)
            .build()
            .ready()
            .expect("server built");
        let broker = server.broker().clone();
        let handle = tokio::spawn(server.run_with_listener(listener));

        Self {
            addr,
            broker,
            shutdown_tx,
            handle,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn client(&self) -> TodoClient {
        TodoClient::builder(self.endpoint())
            .connect_timeout(Duration::from_secs(WAIT_FOR_SERVER_IN_SEC))
            .build()
            .await
            .expect("client connects")
    }

    /// Waits until the broker holds exactly `expected` subscriptions.
    pub async fn wait_for_subscribers(
        &self,
        expected: usize,
    ) {
        timeout(Duration::from_secs(WAIT_FOR_SERVER_IN_SEC), async {
            while self.broker.subscriber_count().await != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("broker never reached {expected} subscribers"));
    }

    /// Fires the shutdown signal and waits for the server to drain.
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown_tx.send(()).expect("server still listening for shutdown");
        timeout(Duration::from_secs(WAIT_FOR_SERVER_IN_SEC), self.handle)
            .await
            .expect("server drained before timeout")
            .expect("server task did not panic")
    }
}
