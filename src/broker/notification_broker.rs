//! Synchronous fan-out broker for todo change events.
//!
//! # Delivery model
//!
//! ```text
//! writer ── publish() ──┬─> send(sub A) ─ await accepted
//!                       ├─> send(sub B) ─ await accepted
//!                       └─> send(sub C) ─ await accepted ──> return
//! ```
//!
//! `publish` holds the shared lock on the subscriber set for the whole
//! fan-out and awaits each channel in turn, so a subscriber registered after
//! `subscribe` returns sees every later publish, in publish order. The cost
//! is that publisher latency is bounded by the slowest subscriber: with
//! `slow_consumer_timeout_ms = 0` one stalled subscriber stalls every writer
//! and every other subscriber. A non-zero timeout evicts the laggard instead.
//!
//! Subscribe and unsubscribe take the exclusive lock, so they wait for any
//! in-flight fan-out. A subscriber about to unsubscribe must close its
//! receiver first; that fails the pending send to it immediately and lets the
//! fan-out (and therefore the write lock) make progress.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio::sync::RwLock;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::metrics::ACTIVE_SUBSCRIPTIONS;
use crate::metrics::PUBLISHED_EVENTS;
use crate::metrics::SLOW_CONSUMER_EVICTIONS;
use crate::TodoEvent;
use crate::WatchConfig;

pub type SubscriptionId = String;

/// Receiving half of a registered subscription.
///
/// Owned by exactly one watch session. The channel is closed from the broker
/// side only by [`Broker::unsubscribe`].
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::Receiver<TodoEvent>,
}

impl Subscription {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Next delivered event; `None` once the broker has dropped the channel.
    pub async fn recv(&mut self) -> Option<TodoEvent> {
        self.receiver.recv().await
    }

    /// Stops accepting deliveries. Any publish blocked on this subscription
    /// returns immediately; events already buffered can still be drained.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

enum Delivery {
    Accepted,
    ReceiverClosed,
    TimedOut,
}

#[derive(Debug)]
pub struct Broker {
    subscribers: RwLock<HashMap<SubscriptionId, mpsc::Sender<TodoEvent>>>,

    /// Serialises publishes so that every subscriber observes the same
    /// global order, even with concurrent writers.
    publish_gate: Mutex<()>,

    buffer_size: usize,
    slow_consumer_timeout: Option<Duration>,
}

impl Broker {
    pub fn new(config: &WatchConfig) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            publish_gate: Mutex::new(()),
            buffer_size: config.watcher_buffer_size.max(1),
            slow_consumer_timeout: config.slow_consumer_timeout(),
        }
    }

    /// Registers a fresh subscription and returns its receiving half.
    pub async fn subscribe(&self) -> Subscription {
        let id = nanoid::nanoid!();
        let (sender, receiver) = mpsc::channel(self.buffer_size);

        let count = {
            let mut subscribers = self.subscribers.write().await;
            subscribers.insert(id.clone(), sender);
            subscribers.len()
        };
        ACTIVE_SUBSCRIPTIONS.inc();

        debug!(subscription_id = %id, subscribers = count, "Subscribed");
        Subscription { id, receiver }
    }

    /// Removes the registration and closes its channel.
    ///
    /// Unknown ids are a silent no-op, so calling this more than once is
    /// safe. Returns whether a registration was removed.
    pub async fn unsubscribe(
        &self,
        id: &str,
    ) -> bool {
        // Dropping the sender is what closes the channel
        let removed = self.subscribers.write().await.remove(id);
        match removed {
            Some(_sender) => {
                ACTIVE_SUBSCRIPTIONS.dec();
                debug!(subscription_id = %id, "Unsubscribed");
                true
            }
            None => {
                trace!(subscription_id = %id, "Unsubscribe of unknown subscription ignored");
                false
            }
        }
    }

    /// Delivers `event` to every registered subscription.
    ///
    /// Returns once each subscriber has accepted the event, has closed its
    /// receiver, or (with a slow-consumer timeout) has been evicted. The
    /// return value is the number of subscribers that accepted it.
    pub async fn publish(
        &self,
        event: TodoEvent,
    ) -> usize {
        let _gate = self.publish_gate.lock().await;

        let label = if event.is_deleted() { "deleted" } else { "upserted" };
        PUBLISHED_EVENTS.with_label_values(&[label]).inc();

        let mut delivered = 0;
        let mut laggards = Vec::new();
        {
            let subscribers = self.subscribers.read().await;
            for (id, sender) in subscribers.iter() {
                match self.deliver(sender, event.clone()).await {
                    Delivery::Accepted => delivered += 1,
                    Delivery::ReceiverClosed => {
                        trace!(subscription_id = %id, "Subscriber closed before delivery");
                    }
                    Delivery::TimedOut => laggards.push(id.clone()),
                }
            }
            trace!(
                todo_id = %event.id(),
                delivered,
                subscribers = subscribers.len(),
                "Event published"
            );
        }

        for id in laggards {
            warn!(
                subscription_id = %id,
                timeout = ?self.slow_consumer_timeout,
                "Evicting slow consumer"
            );
            SLOW_CONSUMER_EVICTIONS.inc();
            self.unsubscribe(&id).await;
        }

        delivered
    }

    async fn deliver(
        &self,
        sender: &mpsc::Sender<TodoEvent>,
        event: TodoEvent,
    ) -> Delivery {
        let send = sender.send(event);
        let result = match self.slow_consumer_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, send).await {
                Ok(result) => result,
                Err(_elapsed) => return Delivery::TimedOut,
            },
            None => send.await,
        };

        match result {
            Ok(()) => Delivery::Accepted,
            Err(_) => Delivery::ReceiverClosed,
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    pub async fn is_subscribed(
        &self,
        id: &str,
    ) -> bool {
        self.subscribers.read().await.contains_key(id)
    }
}
