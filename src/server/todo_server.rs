use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::error;
use tracing::info;

use crate::network::grpc;
use crate::Broker;
use crate::Result;
use crate::TodoManager;
use crate::TodoRpcService;
use crate::TodoServerConfig;
use crate::TodoStore;
use crate::WatchDispatcherHandle;

/// A fully wired todo service, ready to accept connections.
pub struct TodoServer {
    config: TodoServerConfig,
    manager: TodoManager,
    watch_dispatcher: WatchDispatcherHandle,
    dispatcher_task: JoinHandle<()>,
    shutdown_signal: watch::Receiver<()>,
}

impl TodoServer {
    pub(super) fn new(
        config: TodoServerConfig,
        manager: TodoManager,
        watch_dispatcher: WatchDispatcherHandle,
        dispatcher_task: JoinHandle<()>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            config,
            manager,
            watch_dispatcher,
            dispatcher_task,
            shutdown_signal,
        }
    }

    pub fn config(&self) -> &TodoServerConfig {
        &self.config
    }

    pub fn manager(&self) -> &TodoManager {
        &self.manager
    }

    pub fn store(&self) -> &Arc<TodoStore> {
        self.manager.store()
    }

    pub fn broker(&self) -> &Arc<Broker> {
        self.manager.broker()
    }

    pub fn active_watch_sessions(&self) -> u64 {
        self.watch_dispatcher.active_count()
    }

    pub fn rpc_service(&self) -> TodoRpcService {
        TodoRpcService::new(
            self.manager.clone(),
            self.watch_dispatcher.clone(),
            self.config.watch.response_buffer_size,
        )
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.server.listen_address).await?;
        self.run_with_listener(listener).await
    }

    /// Serves on `listener` until the shutdown signal fires, then waits for
    /// every watch session to release its subscription.
    pub async fn run_with_listener(
        self,
        listener: TcpListener,
    ) -> Result<()> {
        let service = self.rpc_service();
        let served = grpc::start_rpc_server(
            service,
            listener,
            &self.config.network,
            self.shutdown_signal.clone(),
        )
        .await;

        if let Err(e) = &served {
            error!("RPC server stops. {:?}", e);
        }

        // The dispatcher observes the same signal; a server that failed
        // before shutdown leaves it running, so stop it explicitly.
        if served.is_err() {
            self.dispatcher_task.abort();
        } else if let Err(e) = self.dispatcher_task.await {
            error!("watch dispatcher failed: {:?}", e);
            return Err(e.into());
        }

        let subscribers = self.manager.broker().subscriber_count().await;
        info!(subscribers, "todo server stopped");
        served
    }
}
