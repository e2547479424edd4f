//! Todo service error hierarchy
//!
//! Errors are grouped by the layer that raises them. Only [`TodoError`] is
//! expected to reach RPC callers as a user-visible failure; everything else is
//! infrastructure and surfaces as `INTERNAL`/`UNAVAILABLE`.

use config::ConfigError;
use tokio::task::JoinError;
use tonic::Status;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Record-level failures visible to RPC callers
    #[error(transparent)]
    Todo(#[from] TodoError),

    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Infrastructure-level failures (network, background tasks, signals)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TodoError {
    /// UpdateTodo referenced an identifier the store does not hold
    #[error("Todo {id} not found")]
    NotFound { id: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Watch dispatcher is not running")]
    DispatcherClosed,

    #[error("Failed to initialize logging: {0}")]
    Observability(String),

    #[error("Internal server error")]
    ServerUnavailable,
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// gRPC transport layer errors
    #[error(transparent)]
    TonicError(#[from] Box<tonic::transport::Error>),

    /// Listener bind, socket or signal handler setup failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),

    #[error("{0}")]
    SignalSendFailed(String),
}

// ============== Conversion Implementations ============== //
impl From<NetworkError> for Error {
    fn from(e: NetworkError) -> Self {
        Error::System(SystemError::Network(e))
    }
}

impl From<tonic::transport::Error> for Error {
    fn from(err: tonic::transport::Error) -> Self {
        NetworkError::TonicError(Box::new(err)).into()
    }
}

impl From<JoinError> for Error {
    fn from(err: JoinError) -> Self {
        NetworkError::TaskFailed(err).into()
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        NetworkError::Io(err).into()
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::Todo(TodoError::NotFound { id }) => {
                Status::not_found(format!("todo {id} not found"))
            }
            Error::System(SystemError::DispatcherClosed) => {
                Status::unavailable("Watch service is shutting down")
            }
            Error::System(SystemError::ServerUnavailable) => {
                Status::unavailable("Service is not ready")
            }
            other => Status::internal(other.to_string()),
        }
    }
}
