//! `TodoService` gRPC handlers.

use autometrics::autometrics;
use futures::Stream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::Request;
use tonic::Response;
use tonic::Status;
use tonic::Streaming;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::proto;
use crate::proto::todo_service_server::TodoService;
use crate::utils::convert::control_from_request;
use crate::utils::convert::patch_from_request;
use crate::TodoManager;
use crate::WatchControl;
use crate::WatchDispatcherHandle;
use crate::API_SLO;

/// Control frames are tiny and consumed eagerly by the session loop.
const CONTROL_CHANNEL_SIZE: usize = 8;

#[derive(Clone)]
pub struct TodoRpcService {
    manager: TodoManager,
    watch_dispatcher: WatchDispatcherHandle,
    response_buffer_size: usize,
}

impl std::fmt::Debug for TodoRpcService {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("TodoRpcService")
            .field("active_watch_sessions", &self.watch_dispatcher.active_count())
            .finish_non_exhaustive()
    }
}

impl TodoRpcService {
    pub fn new(
        manager: TodoManager,
        watch_dispatcher: WatchDispatcherHandle,
        response_buffer_size: usize,
    ) -> Self {
        Self {
            manager,
            watch_dispatcher,
            response_buffer_size,
        }
    }
}

#[tonic::async_trait]
impl TodoService for TodoRpcService {
    type WatchTodosStream = ReceiverStream<std::result::Result<proto::TodoEvent, Status>>;

    #[cfg_attr(not(doc), autometrics(objective = API_SLO))]
    #[tracing::instrument(skip(self))]
    async fn create_todo(
        &self,
        request: Request<proto::CreateTodoRequest>,
    ) -> std::result::Result<Response<proto::Todo>, Status> {
        let req = request.into_inner();
        let todo = self.manager.create_todo(req.title).await?;
        Ok(Response::new(todo.into()))
    }

    #[cfg_attr(not(doc), autometrics(objective = API_SLO))]
    #[tracing::instrument(skip(self))]
    async fn get_todos(
        &self,
        _request: Request<()>,
    ) -> std::result::Result<Response<proto::GetTodosResponse>, Status> {
        let todos = self.manager.get_todos().into_iter().map(Into::into).collect();
        Ok(Response::new(proto::GetTodosResponse { todos }))
    }

    #[cfg_attr(not(doc), autometrics(objective = API_SLO))]
    #[tracing::instrument(skip(self))]
    async fn update_todo(
        &self,
        request: Request<proto::UpdateTodoRequest>,
    ) -> std::result::Result<Response<proto::Todo>, Status> {
        let (id, patch) = patch_from_request(request.into_inner());
        let todo = self.manager.update_todo(&id, patch).await?;
        Ok(Response::new(todo.into()))
    }

    #[cfg_attr(not(doc), autometrics(objective = API_SLO))]
    #[tracing::instrument(skip(self))]
    async fn delete_todo(
        &self,
        request: Request<proto::DeleteTodoRequest>,
    ) -> std::result::Result<Response<()>, Status> {
        let req = request.into_inner();
        self.manager.delete_todo(&req.id).await?;
        Ok(Response::new(()))
    }

    /// Opens a watch stream.
    ///
    /// Nothing is delivered until the client sends `Start`. `Stop`, a
    /// half-close or a disconnect ends the stream and releases the
    /// subscription. On server shutdown the stream ends with `UNAVAILABLE`.
    async fn watch_todos(
        &self,
        request: Request<Streaming<proto::WatchTodosRequest>>,
    ) -> std::result::Result<Response<Self::WatchTodosStream>, Status> {
        let remote_addr = request.remote_addr();
        let inbound = request.into_inner();

        let (control_tx, control_rx) = mpsc::channel(CONTROL_CHANNEL_SIZE);
        let (response_tx, response_rx) = mpsc::channel(self.response_buffer_size);

        let cancel = self.watch_dispatcher.register(control_rx, response_tx).await?;
        info!(?remote_addr, "WatchTodos stream opened");

        tokio::spawn(forward_controls(inbound, control_tx, cancel));

        Ok(Response::new(ReceiverStream::new(response_rx)))
    }
}

/// Reads control frames off the inbound half of a watch stream.
///
/// Ends on a read error, a client half-close, or when the session's token is
/// cancelled. Dropping `control_tx` on exit is how the session learns the
/// inbound side is gone.
pub(crate) async fn forward_controls<S>(
    mut inbound: S,
    control_tx: mpsc::Sender<WatchControl>,
    cancel: CancellationToken,
) where
    S: Stream<Item = std::result::Result<proto::WatchTodosRequest, Status>> + Unpin,
{
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = inbound.next() => next,
        };

        match next {
            Some(Ok(req)) => match control_from_request(&req) {
                Some(control) => {
                    if control_tx.send(control).await.is_err() {
                        break;
                    }
                }
                None => warn!("WatchTodos request without an action ignored"),
            },
            Some(Err(status)) => {
                debug!("WatchTodos inbound read failed: {}", status);
                break;
            }
            None => {
                debug!("WatchTodos inbound closed by client");
                break;
            }
        }
    }
}
