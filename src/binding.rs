//! Data binding
//!
//! Keeps the in-memory record set in sync with a live query on the store.
//! Exactly one subscription is active at a time: changing the window tears the
//! old one down before the new one is opened, and pushes that arrive for an
//! older binding are discarded.

use crate::app::AppEvent;
use crate::calendar::{bucket_of, shift_for_bucket, to_local};
use crate::store::{RangeQuery, SnapshotPush, SnapshotSink, SpeedStore, StoreDocument, SubscriptionId};
use crate::types::{BucketKey, DayOfWeek, SpeedRecord, ViewWindow};
use chrono::FixedOffset;
use std::collections::HashMap;
use std::sync::mpsc::Sender;
use tracing::{debug, error, info, warn};

struct ActiveBinding {
    subscription: SubscriptionId,
    window: ViewWindow,
}

/// Live binding between the selected window and the store
pub struct DataBindingLayer<S: SpeedStore> {
    store: S,
    collection: String,
    offset: FixedOffset,
    sender: Sender<AppEvent>,
    active: Option<ActiveBinding>,
    generation: u64,
    records: Vec<SpeedRecord>,
}

impl<S: SpeedStore> DataBindingLayer<S> {
    /// Create an unbound layer owning `store`.
    ///
    /// Store timestamps are read as wall-clock time in `offset`; snapshots are
    /// delivered through `sender`.
    pub fn new(store: S, collection: &str, offset: FixedOffset, sender: Sender<AppEvent>) -> Self {
        Self {
            store,
            collection: collection.to_string(),
            offset,
            sender,
            active: None,
            generation: 0,
            records: Vec::new(),
        }
    }

    /// Re-bind to a new window.
    ///
    /// The previous subscription is cancelled first. If the new one cannot be
    /// established the failure is logged and the last records stay displayed.
    /// Returns whether a subscription is active afterwards.
    pub fn on_window_changed(&mut self, window: &ViewWindow) -> bool {
        self.teardown();
        self.generation += 1;

        let query = RangeQuery::for_window(&self.collection, window, &self.offset);
        let sink = SnapshotSink::new(self.generation, self.sender.clone());

        match self.store.subscribe(query.clone(), sink) {
            Ok(subscription) => {
                info!(%window, %query, generation = self.generation, "bound window");
                self.active = Some(ActiveBinding {
                    subscription,
                    window: *window,
                });
                true
            }
            Err(e) => {
                error!(%window, error = %e, "failed to establish query, keeping last records");
                false
            }
        }
    }

    /// Apply a snapshot push; returns `false` if it belongs to an older binding.
    pub fn apply_snapshot(&mut self, push: SnapshotPush) -> bool {
        let Some(active) = &self.active else {
            warn!(generation = push.generation, "discarding snapshot with no active binding");
            return false;
        };
        if push.generation != self.generation {
            warn!(
                generation = push.generation,
                current = self.generation,
                "discarding stale snapshot"
            );
            return false;
        }

        let offset = self.offset;
        self.records = push
            .documents
            .into_iter()
            .filter_map(|doc| match doc.validate() {
                Ok(()) => Some(normalize(doc, &offset)),
                Err(e) => {
                    warn!(error = %e, "skipping invalid document in snapshot");
                    None
                }
            })
            .collect();

        debug!(
            window = %active.window,
            records = self.records.len(),
            "applied snapshot"
        );
        for (bucket, count) in self.collisions() {
            debug!(%bucket, count, "bucket collision, showing first record");
        }
        true
    }

    /// First record in snapshot order that falls on `(day, hour)`.
    ///
    /// When several records share a bucket only the first one is shown.
    pub fn find(&self, day: DayOfWeek, hour: u32) -> Option<&SpeedRecord> {
        let key = BucketKey::new(day, hour);
        self.records.iter().find(|r| r.bucket == key)
    }

    /// Buckets holding more than one record
    pub fn collisions(&self) -> Vec<(BucketKey, usize)> {
        let mut counts: HashMap<BucketKey, usize> = HashMap::new();
        for record in &self.records {
            *counts.entry(record.bucket).or_default() += 1;
        }
        let mut collisions: Vec<_> = counts.into_iter().filter(|(_, n)| *n > 1).collect();
        collisions.sort();
        collisions
    }

    /// Cancel the active subscription, if any. Records are kept.
    pub fn teardown(&mut self) {
        if let Some(active) = self.active.take() {
            self.store.unsubscribe(active.subscription);
            debug!(window = %active.window, "unbound window");
        }
    }

    pub fn records(&self) -> &[SpeedRecord] {
        &self.records
    }

    pub fn is_bound(&self) -> bool {
        self.active.is_some()
    }

    pub fn bound_window(&self) -> Option<ViewWindow> {
        self.active.as_ref().map(|a| a.window)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

impl<S: SpeedStore> Drop for DataBindingLayer<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Convert a store document into a bucketed record
pub fn normalize(doc: StoreDocument, offset: &FixedOffset) -> SpeedRecord {
    let timestamp = shift_for_bucket(&to_local(&doc.datetime, offset));
    SpeedRecord {
        id: doc.id,
        bucket: bucket_of(&timestamp),
        timestamp,
        speed: doc.speed,
    }
}
