//! Builder for a runnable [`TodoServer`].
//!
//! ## Example
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(());
//! let server = ServerBuilder::init(config, shutdown_rx)
//!     .build()
//!     .start_metrics_server(shutdown_tx.subscribe())
//!     .ready()?;
//! server.run().await?;
//! ```
//!
//! `build()` spawns the watch dispatcher, so it must be called from inside a
//! tokio runtime.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;
use tracing::info;

use super::TodoServer;
use crate::metrics;
use crate::Broker;
use crate::Result;
use crate::SystemError;
use crate::TodoManager;
use crate::TodoServerConfig;
use crate::TodoStore;
use crate::WatchDispatcher;

pub struct ServerBuilder {
    pub(super) config: TodoServerConfig,
    pub(super) store: Option<Arc<TodoStore>>,
    pub(super) shutdown_signal: watch::Receiver<()>,

    pub(super) server: Option<TodoServer>,
}

impl ServerBuilder {
    /// Loads configuration from the environment (and `config_path`, if any)
    /// and validates it.
    pub fn new(
        config_path: Option<&str>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Result<Self> {
        let mut config = TodoServerConfig::new()?;
        if let Some(p) = config_path {
            info!("with_override_config from: {}", p);
            config = config.with_override_config(p)?;
        }
        Ok(Self::init(config.validate()?, shutdown_signal))
    }

    /// Core initialization logic shared by all construction paths
    pub fn init(
        config: TodoServerConfig,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            config,
            store: None,
            shutdown_signal,
            server: None,
        }
    }

    /// Serves an existing store instead of a fresh empty one.
    pub fn store(
        mut self,
        store: Arc<TodoStore>,
    ) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(
        mut self,
        config: TodoServerConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Wires store, broker and manager together and spawns the watch
    /// dispatcher.
    pub fn build(mut self) -> Self {
        let store = self.store.take().unwrap_or_default();
        let broker = Arc::new(Broker::new(&self.config.watch));
        let manager = TodoManager::new(store, broker.clone());

        let (dispatcher, watch_dispatcher) =
            WatchDispatcher::new(broker, &self.config.watch, self.shutdown_signal.clone());
        let dispatcher_task = tokio::spawn(dispatcher.run());
        debug!("watch dispatcher spawned");

        self.server = Some(TodoServer::new(
            self.config.clone(),
            manager,
            watch_dispatcher,
            dispatcher_task,
            self.shutdown_signal.clone(),
        ));
        self
    }

    /// Launches the Prometheus endpoint when monitoring is enabled.
    pub fn start_metrics_server(
        self,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        if !self.config.monitoring.prometheus_enabled {
            debug!("prometheus exporter disabled");
            return self;
        }

        let port = self.config.monitoring.prometheus_port;
        tokio::spawn(async move {
            metrics::start_server(port, shutdown_signal).await;
        });
        self
    }

    /// Returns the built server.
    ///
    /// # Errors
    /// `ServerUnavailable` if [`build`](Self::build) has not run.
    pub fn ready(self) -> Result<TodoServer> {
        self.server.ok_or_else(|| SystemError::ServerUnavailable.into())
    }
}
