use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::Error;
use crate::Result;

/// Notification broker and watch stream configuration
///
/// # Example
/// ```toml
/// [watch]
/// watcher_buffer_size = 1
/// slow_consumer_timeout_ms = 0
/// response_buffer_size = 16
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchConfig {
    /// Capacity of each subscription's delivery channel
    ///
    /// `1` is the closest tokio has to an unbuffered rendezvous channel: a
    /// publish returns only once every subscriber has taken (or buffered) the
    /// previous record. Larger values decouple writers from subscribers by
    /// that many records while keeping per-subscriber FIFO order.
    ///
    /// **Default**: 1
    #[serde(default = "default_watcher_buffer_size")]
    pub watcher_buffer_size: usize,

    /// How long a publish waits on one subscriber before evicting it
    ///
    /// `0` waits forever: a subscriber that never drains stalls every writer
    /// and every other subscriber. A non-zero value evicts the laggard (its
    /// stream is closed) so the rest keep receiving a gap-free sequence.
    ///
    /// **Default**: 0
    #[serde(default = "default_slow_consumer_timeout_ms")]
    pub slow_consumer_timeout_ms: u64,

    /// Outbound gRPC message buffer per watch stream
    #[serde(default = "default_response_buffer_size")]
    pub response_buffer_size: usize,

    /// Pending stream registrations the dispatcher will queue
    #[serde(default = "default_registration_queue_size")]
    pub registration_queue_size: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            watcher_buffer_size: default_watcher_buffer_size(),
            slow_consumer_timeout_ms: default_slow_consumer_timeout_ms(),
            response_buffer_size: default_response_buffer_size(),
            registration_queue_size: default_registration_queue_size(),
        }
    }
}

impl WatchConfig {
    /// `None` when publishes should wait indefinitely.
    pub fn slow_consumer_timeout(&self) -> Option<Duration> {
        (self.slow_consumer_timeout_ms > 0)
            .then(|| Duration::from_millis(self.slow_consumer_timeout_ms))
    }

    pub fn validate(&self) -> Result<()> {
        if self.watcher_buffer_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "watch.watcher_buffer_size must be greater than 0".into(),
            )));
        }

        if self.watcher_buffer_size > 10_000 {
            warn!(
                "watch.watcher_buffer_size ({}) is very large; slow subscribers will hold that many records each",
                self.watcher_buffer_size
            );
        }

        if self.response_buffer_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "watch.response_buffer_size must be greater than 0".into(),
            )));
        }

        if self.registration_queue_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "watch.registration_queue_size must be greater than 0".into(),
            )));
        }

        Ok(())
    }
}

fn default_watcher_buffer_size() -> usize {
    1
}
fn default_slow_consumer_timeout_ms() -> u64 {
    0
}
fn default_response_buffer_size() -> usize {
    16
}
fn default_registration_queue_size() -> usize {
    1024
}
