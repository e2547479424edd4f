use std::time::Duration;

/// Client connection settings
///
/// Defaults suit a server on the local network; raise the timeouts for
/// remote deployments.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum time to wait for establishing a TCP connection
    /// Default: 1 second
    pub connect_timeout: Duration,

    /// Maximum time to wait for a unary response (or for a watch stream to
    /// be accepted)
    /// Default: 3 seconds
    pub request_timeout: Duration,

    /// TCP keepalive duration for idle connections
    /// Default: 5 minutes (300s)
    pub tcp_keepalive: Duration,

    /// Interval for HTTP/2 keepalive pings
    /// Default: 1 minute (60s)
    pub http2_keepalive_interval: Duration,

    /// Timeout for HTTP/2 keepalive pings
    /// Default: 20 seconds
    pub http2_keepalive_timeout: Duration,

    /// Gzip request bodies and accept gzip responses. Responses are only
    /// compressed when the server has `network.enable_compression` set.
    /// Default: false
    pub enable_compression: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(1000),
            request_timeout: Duration::from_millis(3000),
            tcp_keepalive: Duration::from_secs(300),
            http2_keepalive_interval: Duration::from_secs(60),
            http2_keepalive_timeout: Duration::from_secs(20),
            enable_compression: false,
        }
    }
}
