use tonic::Code;
use tonic::Status;

/// Failures surfaced by [`TodoClient`](super::TodoClient).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The referenced todo does not exist
    #[error("{0}")]
    NotFound(String),

    /// Server is shutting down, or evicted this watch stream
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Could not connect to the endpoint
    #[error(transparent)]
    Transport(#[from] tonic::transport::Error),

    /// Any other RPC failure
    #[error("RPC failed: {0}")]
    Status(Status),
}

impl From<Status> for ClientError {
    fn from(status: Status) -> Self {
        match status.code() {
            Code::NotFound => ClientError::NotFound(status.message().to_string()),
            Code::Unavailable => ClientError::Unavailable(status.message().to_string()),
            _ => ClientError::Status(status),
        }
    }
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, ClientError::Unavailable(_))
    }
}
