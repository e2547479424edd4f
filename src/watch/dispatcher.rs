//! Owner of every live watch session.
//!
//! The dispatcher runs as one long-lived task and spawns a [`WatchSession`]
//! per registered stream. On shutdown it cancels all sessions and waits for
//! each one to release its subscription before returning.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::WatchControl;
use super::WatchResponseSender;
use super::WatchSession;
use crate::metrics::ACTIVE_WATCH_SESSIONS;
use crate::Broker;
use crate::Result;
use crate::SystemError;
use crate::WatchConfig;

/// Request to run a session for a newly opened stream
pub struct WatchRegistration {
    /// Decoded client instructions
    pub control_rx: mpsc::Receiver<WatchControl>,

    /// Sender for gRPC responses back to client
    pub response_sender: WatchResponseSender,

    /// Cancelled when the session ends or the server shuts down
    pub cancel: CancellationToken,
}

pub struct WatchDispatcher {
    broker: Arc<Broker>,

    registration_rx: mpsc::Receiver<WatchRegistration>,

    shutdown: watch::Receiver<()>,

    /// Parent of every session token
    root: CancellationToken,

    sessions: JoinSet<()>,

    next_session_id: u64,

    active_count: Arc<AtomicU64>,
}

/// Handle for communicating with the dispatcher
#[derive(Clone)]
pub struct WatchDispatcherHandle {
    registration_tx: mpsc::Sender<WatchRegistration>,
    root: CancellationToken,
    active_count: Arc<AtomicU64>,
}

impl WatchDispatcher {
    /// Returns (dispatcher, handle) pair
    pub fn new(
        broker: Arc<Broker>,
        config: &WatchConfig,
        shutdown: watch::Receiver<()>,
    ) -> (Self, WatchDispatcherHandle) {
        let (registration_tx, registration_rx) = mpsc::channel(config.registration_queue_size);
        let active_count = Arc::new(AtomicU64::new(0));
        let root = CancellationToken::new();

        let dispatcher = Self {
            broker,
            registration_rx,
            shutdown,
            root: root.clone(),
            sessions: JoinSet::new(),
            next_session_id: 0,
            active_count: active_count.clone(),
        };

        let handle = WatchDispatcherHandle {
            registration_tx,
            root,
            active_count,
        };

        (dispatcher, handle)
    }

    /// Processes registrations until the shutdown signal fires, then drains
    /// every session.
    pub async fn run(mut self) {
        info!("Watch dispatcher started");

        loop {
            tokio::select! {
                Some(registration) = self.registration_rx.recv() => {
                    self.handle_registration(registration);
                }

                Some(joined) = self.sessions.join_next(), if !self.sessions.is_empty() => {
                    if let Err(e) = joined {
                        error!("Watch session task failed: {:?}", e);
                    }
                }

                _ = self.shutdown.changed() => {
                    info!("Watch dispatcher shutting down");
                    break;
                }
            }
        }

        self.root.cancel();

        // Registrations still queued never get a session; dropping them ends
        // their streams.
        self.registration_rx.close();
        while self.registration_rx.try_recv().is_ok() {}

        while let Some(joined) = self.sessions.join_next().await {
            if let Err(e) = joined {
                error!("Watch session task failed during shutdown: {:?}", e);
            }
        }

        info!("Watch dispatcher stopped");
    }

    fn handle_registration(
        &mut self,
        registration: WatchRegistration,
    ) {
        let WatchRegistration {
            control_rx,
            response_sender,
            cancel,
        } = registration;

        let session_id = self.next_session_id;
        self.next_session_id += 1;

        let session = WatchSession::new(
            session_id,
            self.broker.clone(),
            control_rx,
            response_sender,
            cancel,
        );

        let prev_count = self.active_count.fetch_add(1, Ordering::Relaxed);
        ACTIVE_WATCH_SESSIONS.inc();
        debug!(session_id, active_count = prev_count + 1, "Spawning watch session");

        let active_count = self.active_count.clone();
        self.sessions.spawn(async move {
            session.run().await;

            let prev = active_count.fetch_sub(1, Ordering::Relaxed);
            ACTIVE_WATCH_SESSIONS.dec();
            debug!(session_id, active_count = prev - 1, "Watch session completed");
        });
    }
}

impl WatchDispatcherHandle {
    /// Hands a new stream to the dispatcher.
    ///
    /// Returns the session's cancellation token, which the caller's inbound
    /// reader should observe so it stops together with the session.
    pub async fn register(
        &self,
        control_rx: mpsc::Receiver<WatchControl>,
        response_sender: WatchResponseSender,
    ) -> Result<CancellationToken> {
        if self.root.is_cancelled() {
            return Err(SystemError::DispatcherClosed.into());
        }

        let cancel = self.root.child_token();
        let registration = WatchRegistration {
            control_rx,
            response_sender,
            cancel: cancel.clone(),
        };

        self.registration_tx
            .send(registration)
            .await
            .map_err(|_| SystemError::DispatcherClosed)?;

        Ok(cancel)
    }

    /// Number of sessions currently running
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::Relaxed)
    }
}
