use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// gRPC server transport parameters
///
/// Watch streams are long-lived, so keepalive settings matter more here than
/// per-request timeouts: they are what lets the server notice a vanished
/// client and tear its watch session down.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NetworkConfig {
    /// Max concurrent requests per connection
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// HTTP2 SETTINGS_MAX_CONCURRENT_STREAMS
    #[serde(default = "default_max_streams")]
    pub max_concurrent_streams: u32,

    /// TCP keepalive in seconds
    #[serde(default = "default_tcp_keepalive")]
    pub tcp_keepalive_in_secs: u64,

    /// HTTP2 keepalive ping interval in seconds
    #[serde(default = "default_h2_keepalive_interval")]
    pub http2_keep_alive_interval_in_secs: u64,

    /// HTTP2 keepalive timeout in seconds
    #[serde(default = "default_h2_keepalive_timeout")]
    pub http2_keep_alive_timeout_in_secs: u64,

    /// Initial connection-level flow control window in bytes
    #[serde(default = "default_conn_window_size")]
    pub connection_window_size: u32,

    /// Initial stream-level flow control window in bytes
    #[serde(default = "default_stream_window_size")]
    pub stream_window_size: u32,

    /// Enable HTTP2 adaptive window sizing
    #[serde(default = "default_adaptive_window")]
    pub adaptive_window: bool,

    #[serde(default = "default_tcp_nodelay")]
    pub tcp_nodelay: bool,

    /// Gzip-compress responses. Gzip requests are accepted either way.
    #[serde(default = "default_enable_compression")]
    pub enable_compression: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            max_concurrent_streams: default_max_streams(),
            tcp_keepalive_in_secs: default_tcp_keepalive(),
            http2_keep_alive_interval_in_secs: default_h2_keepalive_interval(),
            http2_keep_alive_timeout_in_secs: default_h2_keepalive_timeout(),
            connection_window_size: default_conn_window_size(),
            stream_window_size: default_stream_window_size(),
            adaptive_window: default_adaptive_window(),
            tcp_nodelay: default_tcp_nodelay(),
            enable_compression: default_enable_compression(),
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.concurrency_limit == 0 {
            return Err(Error::Config(ConfigError::Message(
                "concurrency_limit must be > 0".into(),
            )));
        }

        if self.max_concurrent_streams == 0 {
            return Err(Error::Config(ConfigError::Message(
                "max_concurrent_streams must be > 0".into(),
            )));
        }

        if self.http2_keep_alive_timeout_in_secs >= self.http2_keep_alive_interval_in_secs {
            return Err(Error::Config(ConfigError::Message(format!(
                "keepalive timeout {}s must be < interval {}s",
                self.http2_keep_alive_timeout_in_secs, self.http2_keep_alive_interval_in_secs
            ))));
        }

        if !self.adaptive_window {
            const MIN_WINDOW: u32 = 65535; // HTTP2 spec minimum
            if self.stream_window_size < MIN_WINDOW {
                return Err(Error::Config(ConfigError::Message(format!(
                    "stream window size {} below minimum {}",
                    self.stream_window_size, MIN_WINDOW
                ))));
            }

            if self.connection_window_size < self.stream_window_size {
                return Err(Error::Config(ConfigError::Message(format!(
                    "connection window {} smaller than stream window {}",
                    self.connection_window_size, self.stream_window_size
                ))));
            }
        }

        Ok(())
    }
}

fn default_concurrency_limit() -> usize {
    256
}
fn default_max_streams() -> u32 {
    500
}
fn default_tcp_keepalive() -> u64 {
    3600
}
fn default_h2_keepalive_interval() -> u64 {
    30
}
fn default_h2_keepalive_timeout() -> u64 {
    10
}
fn default_conn_window_size() -> u32 {
    1_048_576 // 1MB
}
fn default_stream_window_size() -> u32 {
    262_144 // 256KB
}
fn default_adaptive_window() -> bool {
    false
}
fn default_tcp_nodelay() -> bool {
    true
}
fn default_enable_compression() -> bool {
    false
}
