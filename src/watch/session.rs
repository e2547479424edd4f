//! State machine driving one WatchTodos stream.
//!
//! ```text
//!           Start                 Stop / inbound closed / client gone
//!   Idle ───────────> Watching ────────────────────────────────────> Terminated
//!    │                   │ events: Subscription ─> outbound
//!    └── Stop / closed ──┴──────────────────────────────────────────> Terminated
//! ```
//!
//! A session owns at most one subscription. A repeated `Start` while watching
//! is ignored. On every exit path the subscription's receiver is closed
//! before it is unsubscribed, so a publish blocked on this session fails fast
//! and releases the broker lock that `unsubscribe` needs.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::Status;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::WatchControl;
use crate::proto;
use crate::Broker;
use crate::Subscription;
use crate::TodoEvent;

pub type WatchResponseSender = mpsc::Sender<std::result::Result<proto::TodoEvent, Status>>;

#[derive(Debug)]
pub enum SessionState {
    Idle,
    Watching(Subscription),
    Terminated,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Client sent `Stop`
    Stopped,
    /// Client half-closed or the inbound stream failed
    InboundClosed,
    /// Outbound stream was dropped by the transport
    ClientDisconnected,
    /// Server is shutting down
    Shutdown,
    /// Broker removed the subscription (slow consumer eviction)
    SubscriptionClosed,
}

enum Step {
    Control(WatchControl),
    Delivery(Option<TodoEvent>),
    End(SessionEnd),
}

pub struct WatchSession {
    session_id: u64,
    broker: Arc<Broker>,
    control_rx: mpsc::Receiver<WatchControl>,
    outbound: WatchResponseSender,
    cancel: CancellationToken,
    state: SessionState,
}

impl WatchSession {
    pub fn new(
        session_id: u64,
        broker: Arc<Broker>,
        control_rx: mpsc::Receiver<WatchControl>,
        outbound: WatchResponseSender,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            broker,
            control_rx,
            outbound,
            cancel,
            state: SessionState::Idle,
        }
    }

    pub fn id(&self) -> u64 {
        self.session_id
    }

    /// Drives the session until it terminates, then releases its subscription.
    ///
    /// The session token is cancelled on return so the inbound reader for
    /// this stream stops as well.
    pub async fn run(mut self) -> SessionEnd {
        let _cancel_on_exit = self.cancel.clone().drop_guard();
        debug!(session_id = self.session_id, "Watch session started");

        let end = loop {
            let step = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Step::End(SessionEnd::Shutdown),
                _ = self.outbound.closed() => Step::End(SessionEnd::ClientDisconnected),
                control = self.control_rx.recv() => match control {
                    Some(control) => Step::Control(control),
                    None => Step::End(SessionEnd::InboundClosed),
                },
                delivery = next_delivery(&mut self.state) => Step::Delivery(delivery),
            };

            let outcome = match step {
                Step::Control(control) => self.handle_control(control).await,
                Step::Delivery(Some(event)) => self.forward(event).await,
                Step::Delivery(None) => {
                    warn!(session_id = self.session_id, "Subscription closed by broker");
                    self.send_status(Status::unavailable("Watch subscription was closed by the server"))
                        .await;
                    Some(SessionEnd::SubscriptionClosed)
                }
                Step::End(end) => Some(end),
            };

            if let Some(end) = outcome {
                break end;
            }
        };

        if end == SessionEnd::Shutdown {
            let _ = self
                .outbound
                .try_send(Err(Status::unavailable("Server is shutting down")));
        }

        self.terminate().await;
        info!(session_id = self.session_id, reason = ?end, "Watch session ended");
        end
    }

    async fn handle_control(
        &mut self,
        control: WatchControl,
    ) -> Option<SessionEnd> {
        let idle = matches!(self.state, SessionState::Idle);
        match control {
            WatchControl::Start if idle => {
                let subscription = self.broker.subscribe().await;
                debug!(
                    session_id = self.session_id,
                    subscription_id = subscription.id(),
                    "Watching"
                );
                self.state = SessionState::Watching(subscription);
                None
            }
            WatchControl::Start => {
                debug!(session_id = self.session_id, "Duplicate Start ignored");
                None
            }
            WatchControl::Stop => Some(SessionEnd::Stopped),
        }
    }

    async fn forward(
        &mut self,
        event: TodoEvent,
    ) -> Option<SessionEnd> {
        trace!(session_id = self.session_id, todo_id = event.id(), "Forwarding event");

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Some(SessionEnd::Shutdown),
            sent = self.outbound.send(Ok(event.into())) => match sent {
                Ok(()) => None,
                Err(_) => Some(SessionEnd::ClientDisconnected),
            },
        }
    }

    /// Delivers a terminal status unless the client is gone or the server is
    /// shutting down first.
    async fn send_status(
        &self,
        status: Status,
    ) {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {}
            _ = self.outbound.send(Err(status)) => {}
        }
    }

    async fn terminate(&mut self) {
        if let SessionState::Watching(mut subscription) =
            std::mem::replace(&mut self.state, SessionState::Terminated)
        {
            subscription.close();
            self.broker.unsubscribe(subscription.id()).await;
        }
        self.control_rx.close();
    }
}

async fn next_delivery(state: &mut SessionState) -> Option<TodoEvent> {
    match state {
        SessionState::Watching(subscription) => subscription.recv().await,
        SessionState::Idle | SessionState::Terminated => std::future::pending().await,
    }
}
