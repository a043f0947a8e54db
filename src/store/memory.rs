//! In-process document store with live range queries

use super::{DocumentChange, RangeQuery, SnapshotSink, SpeedStore, StoreDocument, SubscriptionId};
use crate::error::HeatmapError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, warn};

struct Subscription {
    query: RangeQuery,
    sink: SnapshotSink,
}

/// Document store held in memory.
///
/// Documents are kept in `(datetime, id)` order, which is the order range
/// queries return them in. Every write pushes a fresh snapshot to the
/// subscriptions whose range it touches.
#[derive(Default)]
pub struct MemoryStore {
    collections: HashMap<String, Vec<StoreDocument>>,
    subscriptions: HashMap<SubscriptionId, Subscription>,
    offline: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with one collection preloaded; invalid documents are skipped.
    pub fn with_documents(collection: &str, documents: Vec<StoreDocument>) -> Self {
        let mut store = Self::new();
        let docs = store.collections.entry(collection.to_string()).or_default();
        for document in documents {
            match document.validate() {
                Ok(()) => upsert_sorted(docs, document),
                Err(e) => warn!(collection, error = %e, "skipping invalid document"),
            }
        }
        store
    }

    /// Simulate losing the connection: new subscriptions fail to establish.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn documents(&self, collection: &str) -> &[StoreDocument] {
        self.collections
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Insert or replace a document by id, notifying affected subscriptions
    pub fn upsert(&mut self, collection: &str, document: StoreDocument) -> Result<(), HeatmapError> {
        document
            .validate()
            .map_err(|e| HeatmapError::InvalidDocument(e.to_string()))?;

        let docs = self.collections.entry(collection.to_string()).or_default();
        let mut touched = vec![document.datetime];
        if let Some(old) = docs.iter().find(|d| d.id == document.id) {
            touched.push(old.datetime);
        }
        upsert_sorted(docs, document);

        self.notify(collection, &touched);
        Ok(())
    }

    /// Delete a document by id; returns whether it existed
    pub fn remove(&mut self, collection: &str, id: &str) -> bool {
        let Some(docs) = self.collections.get_mut(collection) else {
            return false;
        };
        let Some(pos) = docs.iter().position(|d| d.id == id) else {
            return false;
        };
        let removed = docs.remove(pos);
        self.notify(collection, &[removed.datetime]);
        true
    }

    /// Current result set of a query
    pub fn snapshot(&self, query: &RangeQuery) -> Vec<StoreDocument> {
        snapshot_of(self.documents(&query.collection), query)
    }

    fn notify(&mut self, collection: &str, touched: &[DateTime<Utc>]) {
        let docs = self
            .collections
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        self.subscriptions.retain(|id, sub| {
            if sub.query.collection != collection
                || !touched.iter().any(|ts| sub.query.contains(ts))
            {
                return true;
            }
            let delivered = sub.sink.push(snapshot_of(docs, &sub.query));
            if !delivered {
                debug!(subscription = %id, "dropping subscription with closed sink");
            }
            delivered
        });
    }
}

impl SpeedStore for MemoryStore {
    fn subscribe(
        &mut self,
        query: RangeQuery,
        sink: SnapshotSink,
    ) -> Result<SubscriptionId, HeatmapError> {
        if self.offline {
            return Err(HeatmapError::QueryEstablish {
                collection: query.collection,
                reason: "store is offline".to_string(),
            });
        }

        let id = SubscriptionId::new();
        sink.push(self.snapshot(&query));
        debug!(subscription = %id, %query, "subscription opened");
        self.subscriptions.insert(id, Subscription { query, sink });
        Ok(id)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    fn active_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    fn ingest(&mut self, collection: &str, change: DocumentChange) -> Result<(), HeatmapError> {
        match change {
            DocumentChange::Upsert(document) => self.upsert(collection, document),
            DocumentChange::Remove(id) => {
                if !self.remove(collection, &id) {
                    warn!(collection, id = %id, "remove of unknown document");
                }
                Ok(())
            }
        }
    }
}

fn snapshot_of(docs: &[StoreDocument], query: &RangeQuery) -> Vec<StoreDocument> {
    docs.iter()
        .filter(|d| query.contains(&d.datetime))
        .cloned()
        .collect()
}

fn upsert_sorted(docs: &mut Vec<StoreDocument>, document: StoreDocument) {
    docs.retain(|d| d.id != document.id);
    let pos = docs.partition_point(|d| (d.datetime, &d.id) <= (document.datetime, &document.id));
    docs.insert(pos, document);
}
