//! Speed Heatmap - weekly day-by-hour view of live traffic-speed measurements
//!
//! Speed documents are read through a live range query for the selected week,
//! bucketed by weekday and hour, and classified into fast / moderate / slow
//! tiers on a 7 x 15 grid:
//! view state → range query → snapshot push → normalization → grid.
//!
//! ## Modules
//!
//! - **View state**: month/week navigation, "now" highlight, semester label
//! - **Binding**: one live subscription per selected window, stale pushes discarded
//! - **Grid**: cell classification, tooltips and text rendering

pub mod app;
pub mod binding;
pub mod calendar;
pub mod config;
pub mod error;
pub mod grid;
pub mod logging;
pub mod store;
pub mod types;
pub mod view_state;

pub use app::{AppEvent, Command, HeatmapApp};
pub use binding::DataBindingLayer;
pub use config::HeatmapConfig;
pub use error::HeatmapError;
pub use grid::HeatmapGrid;
pub use store::{MemoryStore, RangeQuery, SpeedStore, StoreDocument};
pub use types::{BucketKey, DayOfWeek, Semester, SpeedRecord, SpeedTier, ViewWindow};
pub use view_state::{Clock, SystemClock, ViewStateController};

/// Crate version
pub const HEATMAP_VERSION: &str = env!("CARGO_PKG_VERSION");
