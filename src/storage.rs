//! Storage Layer
//!
//! SQLite-backed persistence for tagged metrics:
//!
//! - [`SqlitePool`]: connection pool wrapper (WAL mode, foreign keys on)
//! - [`schema::provision`]: idempotent table/index creation
//! - [`MetricStore`]: atomic metric+tag-link insert and filtered query
//!
//! The store holds no in-process mutable state; concurrency correctness
//! rests entirely on transactions and the unique constraint on tag text.

pub mod db;
mod error;
mod metric_store;
pub mod schema;
mod types;

pub use db::SqlitePool;
pub use error::StorageError;
pub use metric_store::MetricStore;
pub use types::{Metric, MetricFilter, NewMetric};
