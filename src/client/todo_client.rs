use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::codec::CompressionEncoding;
use tonic::transport::Channel;
use tonic::transport::Endpoint;
use tracing::debug;
use tracing::error;

use super::ClientBuilder;
use super::ClientConfig;
use super::ClientError;
use super::WatchStream;
use crate::proto;
use crate::proto::todo_service_client::TodoServiceClient;
use crate::Todo;
use crate::TodoPatch;

/// Pending control frames a watch stream buffers before `start`/`stop`
/// have to wait.
const WATCH_CONTROL_BUFFER: usize = 4;

/// Todo service client
///
/// Cheap to clone; clones share one HTTP/2 connection.
#[derive(Clone)]
pub struct TodoClient {
    client: TodoServiceClient<Channel>,
}

impl TodoClient {
    pub fn builder(endpoint: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(endpoint)
    }

    pub(super) async fn connect(
        endpoint: String,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        debug!("connect, endpoint = {:?}", &endpoint);
        let channel = Endpoint::from_shared(endpoint)?
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .tcp_keepalive(Some(config.tcp_keepalive))
            .http2_keep_alive_interval(config.http2_keepalive_interval)
            .keep_alive_timeout(config.http2_keepalive_timeout)
            .connect()
            .await?;

        let mut client = TodoServiceClient::new(channel);
        if config.enable_compression {
            client = client
                .send_compressed(CompressionEncoding::Gzip)
                .accept_compressed(CompressionEncoding::Gzip);
        }

        Ok(Self { client })
    }

    pub async fn create(
        &self,
        title: impl Into<String>,
    ) -> Result<Todo, ClientError> {
        let request = proto::CreateTodoRequest { title: title.into() };
        match self.client.clone().create_todo(request).await {
            Ok(response) => Ok(response.into_inner().into()),
            Err(status) => {
                error!("[:TodoClient:create] status: {:?}", status);
                Err(status.into())
            }
        }
    }

    /// All todos, in no particular order
    pub async fn list(&self) -> Result<Vec<Todo>, ClientError> {
        let response = self.client.clone().get_todos(()).await?;
        Ok(response.into_inner().todos.into_iter().map(Into::into).collect())
    }

    /// Applies `patch` to todo `id`.
    ///
    /// # Errors
    /// [`ClientError::NotFound`] when `id` does not exist.
    pub async fn update(
        &self,
        id: &str,
        patch: TodoPatch,
    ) -> Result<Todo, ClientError> {
        let request = proto::UpdateTodoRequest {
            id: id.to_string(),
            title: patch.title,
            completed: patch.completed,
        };
        let response = self.client.clone().update_todo(request).await?;
        Ok(response.into_inner().into())
    }

    /// Deletes todo `id`; deleting an unknown id succeeds.
    pub async fn delete(
        &self,
        id: &str,
    ) -> Result<(), ClientError> {
        let request = proto::DeleteTodoRequest { id: id.to_string() };
        self.client.clone().delete_todo(request).await?;
        Ok(())
    }

    /// Opens a watch stream. No events arrive until
    /// [`WatchStream::start`] is called.
    pub async fn watch(&self) -> Result<WatchStream, ClientError> {
        let (control_tx, control_rx) = mpsc::channel(WATCH_CONTROL_BUFFER);
        let response = self
            .client
            .clone()
            .watch_todos(ReceiverStream::new(control_rx))
            .await?;

        Ok(WatchStream::new(control_tx, response.into_inner()))
    }
}
