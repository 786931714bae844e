//! In-memory conflict event store.
//!
//! [`EventStore`] is a cheap-to-clone handle around a single
//! `tokio::sync::RwLock`. Reads clone matching records while holding the read
//! guard, so every query sees one consistent point-in-time view; writers
//! replace whole records under the write guard and never expose a
//! half-applied patch.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use conflictwatch_core::{ConflictEvent, EventPatch, FilterSpec, NaturalKey, NewConflictEvent};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("event not found: {0}")]
    NotFound(String),
}

/// Outcome of a [`EventStore::bulk_upsert`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
}

#[derive(Debug)]
struct Entry {
    /// Insertion sequence; breaks `event_date` ties in queries.
    seq: u64,
    event: ConflictEvent,
}

#[derive(Debug, Default)]
struct Inner {
    events: HashMap<String, Entry>,
    next_seq: u64,
}

impl Inner {
    fn put(&mut self, new: NewConflictEvent) -> ConflictEvent {
        let now = Utc::now();
        let id = new
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let event = new.into_event(id.clone(), now);

        if let Some(entry) = self.events.get_mut(&id) {
            tracing::debug!(id = %id, "store: replacing event with existing id");
            entry.event = event.clone();
        } else {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.events.insert(
                id,
                Entry {
                    seq,
                    event: event.clone(),
                },
            );
        }
        event
    }

    fn ordered(&self) -> Vec<&Entry> {
        let mut entries: Vec<&Entry> = self.events.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventStore {
    inner: Arc<RwLock<Inner>>,
}

impl EventStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store one event, assigning a UUID when it carries no id.
    ///
    /// An id that is already present replaces the stored record in place and
    /// keeps its original insertion position.
    pub async fn insert(&self, event: NewConflictEvent) -> ConflictEvent {
        self.inner.write().await.put(event)
    }

    /// Insert each event in input order.
    ///
    /// Additive: nothing already stored is removed or deduplicated. The batch
    /// is applied under one write guard, so readers see all of it or none.
    pub async fn bulk_insert(&self, events: Vec<NewConflictEvent>) -> Vec<ConflictEvent> {
        let mut inner = self.inner.write().await;
        let stored: Vec<ConflictEvent> = events.into_iter().map(|e| inner.put(e)).collect();
        drop(inner);
        tracing::debug!(count = stored.len(), "store: bulk insert applied");
        stored
    }

    /// Refresh-style load that deduplicates on the natural key
    /// (`event_date`, `location`, `actor1`, `actor2`).
    ///
    /// A record whose natural key already exists overwrites that record and
    /// keeps its id; anything else is inserted.
    pub async fn bulk_upsert(&self, events: Vec<NewConflictEvent>) -> UpsertSummary {
        let mut inner = self.inner.write().await;
        let mut by_key: HashMap<NaturalKey, String> = inner
            .events
            .values()
            .map(|entry| (entry.event.natural_key(), entry.event.id.clone()))
            .collect();

        let mut summary = UpsertSummary::default();
        for mut event in events {
            let existing_id = event
                .id
                .clone()
                .filter(|id| inner.events.contains_key(id))
                .or_else(|| by_key.get(&event.natural_key()).cloned());

            match existing_id {
                Some(id) => {
                    // The overwrite may move the record to a new natural key.
                    if let Some(old_key) = inner.events.get(&id).map(|e| e.event.natural_key()) {
                        if by_key.get(&old_key) == Some(&id) {
                            by_key.remove(&old_key);
                        }
                    }
                    let key = event.natural_key();
                    event.id = Some(id.clone());
                    inner.put(event);
                    by_key.insert(key, id);
                    summary.updated += 1;
                }
                None => {
                    let key = event.natural_key();
                    let stored = inner.put(event);
                    by_key.insert(key, stored.id);
                    summary.inserted += 1;
                }
            }
        }
        drop(inner);

        tracing::info!(
            inserted = summary.inserted,
            updated = summary.updated,
            "store: bulk upsert applied"
        );
        summary
    }

    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no event has this id.
    pub async fn get(&self, id: &str) -> Result<ConflictEvent, StoreError> {
        self.inner
            .read()
            .await
            .events
            .get(id)
            .map(|entry| entry.event.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Merge `patch` into the stored event and re-stamp `last_updated`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no event has this id.
    pub async fn update(&self, id: &str, patch: EventPatch) -> Result<ConflictEvent, StoreError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .events
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let mut updated = entry.event.clone();
        patch.apply(&mut updated, Utc::now());
        entry.event = updated.clone();
        Ok(updated)
    }

    /// Remove an event. Returns `true` if one existed.
    pub async fn delete(&self, id: &str) -> bool {
        self.inner.write().await.events.remove(id).is_some()
    }

    /// Events matching every predicate in `filter`, newest `event_date`
    /// first, ties in insertion order, truncated to the filter's limit.
    pub async fn query(&self, filter: &FilterSpec) -> Vec<ConflictEvent> {
        let mut matched: Vec<(u64, ConflictEvent)> = {
            let inner = self.inner.read().await;
            inner
                .events
                .values()
                .filter(|entry| filter.matches(&entry.event))
                .map(|entry| (entry.seq, entry.event.clone()))
                .collect()
        };

        matched.sort_by(|(seq_a, a), (seq_b, b)| {
            b.event_date.cmp(&a.event_date).then(seq_a.cmp(seq_b))
        });
        matched.truncate(filter.effective_limit());
        matched.into_iter().map(|(_, event)| event).collect()
    }

    /// Every stored event in insertion order.
    pub async fn snapshot(&self) -> Vec<ConflictEvent> {
        let inner = self.inner.read().await;
        inner
            .ordered()
            .into_iter()
            .map(|entry| entry.event.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.events.is_empty()
    }
}
