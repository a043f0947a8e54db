//! Live document store
//!
//! The heatmap reads speed documents through live range queries: a
//! subscription receives the full current result set on every change inside
//! its range, until it is cancelled. This module defines that contract and an
//! in-process implementation of it.

mod document;
mod memory;

pub use document::*;
pub use memory::MemoryStore;

use crate::app::AppEvent;
use crate::calendar::{self, local_to_utc};
use crate::error::HeatmapError;
use crate::types::ViewWindow;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::mpsc::Sender;
use uuid::Uuid;

/// Collection holding the speed documents
pub const DEFAULT_COLLECTION: &str = "slot";

/// Handle of an active subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Timestamp range query, inclusive at both ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeQuery {
    pub collection: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl RangeQuery {
    pub fn new(collection: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            collection: collection.into(),
            start,
            end,
        }
    }

    /// Query for a view window whose local days are in `offset`.
    ///
    /// A window past the end of its month, or outside the representable
    /// date range, yields a query that matches nothing.
    pub fn for_window(collection: &str, window: &ViewWindow, offset: &FixedOffset) -> Self {
        let bounds = calendar::window_bounds(window).and_then(|(start, end)| {
            Some((local_to_utc(&start, offset)?, local_to_utc(&end, offset)?))
        });
        match bounds {
            Some((start, end)) => Self::new(collection, start, end),
            None => Self::empty(collection, window, offset),
        }
    }

    /// Empty range anchored at the start of the month after `window`
    fn empty(collection: &str, window: &ViewWindow, offset: &FixedOffset) -> Self {
        let (year, month) = calendar::shift_month(window.year, window.month, 1);
        let start = NaiveDate::from_ymd_opt(year, month + 1, 1)
            .and_then(|date| local_to_utc(&date.and_time(NaiveTime::MIN), offset))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let end = start
            .checked_sub_signed(Duration::milliseconds(1))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self::new(collection, start, end)
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        self.start <= *timestamp && *timestamp <= self.end
    }
}

impl fmt::Display for RangeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{:?} .. {:?}]",
            self.collection, self.start, self.end
        )
    }
}

/// Full result set delivered by a subscription
#[derive(Debug, Clone)]
pub struct SnapshotPush {
    /// Binding generation the subscription was opened for
    pub generation: u64,
    pub documents: Vec<StoreDocument>,
}

/// Delivers snapshots into the application event queue
#[derive(Debug, Clone)]
pub struct SnapshotSink {
    generation: u64,
    sender: Sender<AppEvent>,
}

impl SnapshotSink {
    pub fn new(generation: u64, sender: Sender<AppEvent>) -> Self {
        Self { generation, sender }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Queue a snapshot; returns `false` once the queue is gone.
    pub fn push(&self, documents: Vec<StoreDocument>) -> bool {
        self.sender
            .send(AppEvent::Snapshot(SnapshotPush {
                generation: self.generation,
                documents,
            }))
            .is_ok()
    }
}

/// Live range-query interface of a document store
pub trait SpeedStore {
    /// Open a live query; the sink receives the current result set now and
    /// again on every change within the range.
    fn subscribe(
        &mut self,
        query: RangeQuery,
        sink: SnapshotSink,
    ) -> Result<SubscriptionId, HeatmapError>;

    /// Cancel a subscription; returns whether it was active.
    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;

    fn active_subscriptions(&self) -> usize;

    /// Apply a write from an external producer. Stores that only serve
    /// reads reject it.
    fn ingest(&mut self, collection: &str, change: DocumentChange) -> Result<(), HeatmapError> {
        let _ = change;
        Err(HeatmapError::ReadOnlyStore(collection.to_string()))
    }
}

/// A write observed on the store
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentChange {
    Upsert(StoreDocument),
    Remove(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bangkok() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    #[test]
    fn test_query_for_window() {
        let query = RangeQuery::for_window("slot", &ViewWindow::new(2024, 0, 3), &bangkok());
        assert_eq!(query.start, Utc.with_ymd_and_hms(2024, 1, 14, 17, 0, 0).unwrap());
        assert_eq!(query.end, Utc.with_ymd_and_hms(2024, 1, 20, 17, 0, 0).unwrap());
        assert!(query.contains(&query.start));
        assert!(query.contains(&query.end));
        assert!(!query.is_empty());
    }

    #[test]
    fn test_query_for_empty_window() {
        let query = RangeQuery::for_window("slot", &ViewWindow::new(2023, 1, 5), &bangkok());
        assert!(query.is_empty());
        assert!(!query.contains(&query.start));
        assert!(!query.contains(&query.end));
    }

    #[test]
    fn test_query_for_unrepresentable_year_is_empty() {
        for year in [300_000, -300_000, i32::MAX, i32::MIN] {
            for offset in [bangkok(), FixedOffset::west_opt(5 * 3600).unwrap()] {
                let window = ViewWindow::new(year, 11, 1);
                let query = RangeQuery::for_window("slot", &window, &offset);
                assert!(query.is_empty(), "{} {}", window, query);
            }
        }
    }
}
