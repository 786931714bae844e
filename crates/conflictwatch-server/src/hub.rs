//! Fan-out of broadcast messages to live subscribers.
//!
//! Each subscriber owns a bounded FIFO queue. Publishing serializes the
//! message once and `try_send`s it to every queue, so a slow or dead peer can
//! never block the publisher: a full or closed queue gets its subscriber
//! removed instead.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::messages::{BroadcastMessage, CycleStatus};

pub type SubscriberId = u64;

/// Queue depth used when none is configured.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

/// Delivery outcome of one [`BroadcastHub::publish`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub dropped: usize,
}

#[derive(Debug)]
pub struct BroadcastHub {
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<Arc<str>>>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

impl BroadcastHub {
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Register a new subscriber.
    ///
    /// The subscriber's first queued message is a heartbeat carrying the
    /// subscriber count including itself.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);

        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let count = subscribers.len() + 1;
        if let Some(text) = serialize(&BroadcastMessage::heartbeat(count, CycleStatus::Connected)) {
            // Fresh queue with capacity >= 1; cannot be full.
            let _ = tx.try_send(text);
        }
        subscribers.insert(id, tx);
        drop(subscribers);

        tracing::info!(subscriber = id, subscribers = count, "hub: subscriber connected");
        Subscription {
            id,
            rx,
            hub: Arc::clone(self),
        }
    }

    /// Remove a subscriber. Safe to call more than once.
    ///
    /// Takes the write lock, so it waits out any publish currently iterating
    /// and no later publish can reach this subscriber.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();
        if removed {
            tracing::info!(subscriber = id, "hub: subscriber disconnected");
        }
        removed
    }

    /// Deliver `message` to every registered subscriber without blocking.
    ///
    /// Subscribers whose queue is full or closed are removed. Failures are
    /// never reported to the caller beyond the returned counts.
    pub fn publish(&self, message: &BroadcastMessage) -> PublishReport {
        let Some(text) = serialize(message) else {
            return PublishReport::default();
        };

        let mut report = PublishReport::default();
        let mut failed: Vec<SubscriberId> = Vec::new();
        {
            let subscribers = self
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            for (&id, tx) in subscribers.iter() {
                match tx.try_send(Arc::clone(&text)) {
                    Ok(()) => report.delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(subscriber = id, "hub: subscriber queue full; dropping subscriber");
                        failed.push(id);
                    }
                    Err(TrySendError::Closed(_)) => {
                        tracing::debug!(subscriber = id, "hub: subscriber queue closed");
                        failed.push(id);
                    }
                }
            }
        }

        if !failed.is_empty() {
            let mut subscribers = self
                .subscribers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            for id in &failed {
                subscribers.remove(id);
            }
        }
        report.dropped = failed.len();

        tracing::debug!(
            kind = message.kind(),
            delivered = report.delivered,
            dropped = report.dropped,
            "hub: published"
        );
        report
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn serialize(message: &BroadcastMessage) -> Option<Arc<str>> {
    match serde_json::to_string(message) {
        Ok(text) => Some(Arc::from(text)),
        Err(e) => {
            tracing::error!(kind = message.kind(), error = %e, "hub: failed to serialize message");
            None
        }
    }
}

/// Receiving end of one subscriber. Unregisters itself on drop.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Arc<str>>,
    hub: Arc<BroadcastHub>,
}

impl Subscription {
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next serialized message, or `None` once the hub has dropped this
    /// subscriber or [`Subscription::close`] was called.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`Subscription::recv`].
    pub fn try_recv(&mut self) -> Option<Arc<str>> {
        self.rx.try_recv().ok()
    }

    /// Unregister and discard anything still queued.
    ///
    /// Nothing is observable through this subscription afterwards.
    pub fn close(&mut self) {
        self.hub.unsubscribe(self.id);
        self.rx.close();
        while self.try_recv().is_some() {}
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}

#[cfg(test)]
#[path = "hub_test.rs"]
mod tests;
