use tokio::sync::mpsc;
use tonic::Streaming;
use tracing::warn;

use super::ClientError;
use crate::proto;
use crate::utils::convert::control_to_request;
use crate::utils::convert::event_from_proto;
use crate::TodoEvent;
use crate::WatchControl;

/// Client end of one `WatchTodos` stream.
///
/// Dropping it half-closes the request side, which the server treats like
/// `stop`.
pub struct WatchStream {
    control_tx: mpsc::Sender<proto::WatchTodosRequest>,
    events: Streaming<proto::TodoEvent>,
}

impl WatchStream {
    pub(super) fn new(
        control_tx: mpsc::Sender<proto::WatchTodosRequest>,
        events: Streaming<proto::TodoEvent>,
    ) -> Self {
        Self { control_tx, events }
    }

    /// Begins delivery. A second call on the same stream has no effect.
    pub async fn start(&self) -> Result<(), ClientError> {
        self.send(WatchControl::Start).await
    }

    /// Asks the server to unsubscribe and end the stream. Remaining events
    /// can still be drained with [`next_event`](Self::next_event).
    pub async fn stop(&self) -> Result<(), ClientError> {
        self.send(WatchControl::Stop).await
    }

    /// Next change event; `Ok(None)` once the server has ended the stream.
    ///
    /// # Errors
    /// [`ClientError::Unavailable`] when the server shut down or evicted
    /// this watcher for falling behind.
    pub async fn next_event(&mut self) -> Result<Option<TodoEvent>, ClientError> {
        loop {
            match self.events.message().await? {
                Some(event) => match event_from_proto(event) {
                    Some(event) => return Ok(Some(event)),
                    None => warn!("Dropping watch event without a todo payload"),
                },
                None => return Ok(None),
            }
        }
    }

    async fn send(
        &self,
        control: WatchControl,
    ) -> Result<(), ClientError> {
        self.control_tx
            .send(control_to_request(control))
            .await
            .map_err(|_| ClientError::Unavailable("watch stream is closed".to_string()))
    }
}
