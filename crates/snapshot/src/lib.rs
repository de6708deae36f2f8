//! Snapshot crate.
//!
//! Turns upstream payloads into the served snapshot and keeps the latest
//! good one cached.

pub mod cache;
pub mod normalize;
pub mod pipeline;

pub use cache::{CacheStats, CachedView, CycleOutcome, RefreshCache};
pub use normalize::normalize;
pub use pipeline::{FetchPipeline, StockSource};
