//! Typed client for the todo gRPC service.
//!
//! - [`TodoClient`] - CRUD calls and watch streams
//! - [`ClientBuilder`] - Configurable client construction
//! - [`WatchStream`] - Handle over one `WatchTodos` stream
//!
//! # Basic Usage
//! ```no_run
//! use std::time::Duration;
//! use todo_grpc::client::TodoClient;
//! use todo_grpc::TodoPatch;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let client = TodoClient::builder("http://127.0.0.1:8080")
//!         .connect_timeout(Duration::from_secs(3))
//!         .build()
//!         .await
//!         .unwrap();
//!
//!     let mut watch = client.watch().await.unwrap();
//!     watch.start().await.unwrap();
//!
//!     let todo = client.create("buy milk").await.unwrap();
//!     client.update(&todo.id, TodoPatch::completed(true)).await.unwrap();
//!
//!     while let Some(event) = watch.next_event().await.unwrap() {
//!         println!("{:?}", event);
//!     }
//! }
//! ```

mod builder;
mod config;
mod error;
mod todo_client;
mod watch_stream;

pub use builder::*;
pub use config::*;
pub use error::*;
pub use todo_client::*;
pub use watch_stream::*;
