//! A gRPC todo service with live change notifications.
//!
//! Mutations go through [`TodoManager`], which updates the [`TodoStore`] and
//! then publishes a [`TodoEvent`] to the [`Broker`]. Each open `WatchTodos`
//! stream is driven by a [`WatchSession`] that forwards the events of its
//! subscription to the client.
//!
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(());
//! let server = ServerBuilder::init(TodoServerConfig::new()?.validate()?, shutdown_rx)
//!     .build()
//!     .start_metrics_server(shutdown_tx.subscribe())
//!     .ready()?;
//! server.run().await?;
//! ```

mod broker;
mod config;
mod errors;
mod server;
mod service;
mod store;
mod todo;
mod watch;

pub mod client;
pub mod metrics;
pub mod network;
pub mod proto;
pub mod utils;

pub use broker::*;
pub use config::*;
pub use errors::*;
pub use network::grpc::start_rpc_server;
pub use network::grpc::TodoRpcService;
pub use server::*;
pub use service::*;
pub use store::*;
pub use todo::*;
pub use watch::*;


//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;

//-----------------------------------------------------------
// Autometrics
/// autometrics: https://docs.autometrics.dev/rust/adding-alerts-and-slos
use autometrics::objectives::Objective;
use autometrics::objectives::ObjectiveLatency;
use autometrics::objectives::ObjectivePercentile;
const API_SLO: Objective = Objective::new("api")
    .success_rate(ObjectivePercentile::P99_9)
    .latency(ObjectiveLatency::Ms10, ObjectivePercentile::P99);
