use std::time::Duration;

use super::ClientConfig;
use super::ClientError;
use super::TodoClient;

pub struct ClientBuilder {
    config: ClientConfig,
    endpoint: String,
}

impl ClientBuilder {
    /// Create a new builder with default config for `endpoint`
    /// (e.g. `http://127.0.0.1:8080`)
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            config: ClientConfig::default(),
            endpoint: endpoint.into(),
        }
    }

    /// Set connection timeout (default: 1s)
    pub fn connect_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set request timeout (default: 3s)
    pub fn request_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Enable/disable gzip compression (default: disabled)
    pub fn enable_compression(
        mut self,
        enable: bool,
    ) -> Self {
        self.config.enable_compression = enable;
        self
    }

    /// Completely replaces the default configuration, discarding anything set
    /// through the individual methods.
    pub fn set_config(
        mut self,
        config: ClientConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Connects and returns the client
    pub async fn build(self) -> Result<TodoClient, ClientError> {
        TodoClient::connect(self.endpoint, self.config).await
    }
}
