//! Per-stream watch sessions and the dispatcher that owns them.
//!
//! ```text
//! TodoRpcService::watch_todos
//!   ├─> inbound reader task ── WatchControl ──┐
//!   └─> WatchDispatcherHandle::register ──────┴─> WatchDispatcher
//!                                                   └─> WatchSession::run (1 task per stream)
//!                                                         Broker ─> Subscription ─> outbound stream
//! ```

mod dispatcher;
mod session;
pub use dispatcher::*;
pub use session::*;

#[cfg(test)]
mod session_test;

/// Client instruction read from the inbound half of a watch stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchControl {
    /// Begin receiving change events
    Start,
    /// Unsubscribe and end the stream
    Stop,
}
