//! Vitals - Tagged Metrics Store
//!
//! Ingests scalar measurements carrying a key, numeric value, millisecond
//! timestamp, and free-text tags, and serves them back filtered by key,
//! tag, and timestamp range. Tags form a shared, deduplicated dictionary;
//! the many-to-many link between metrics and tags is written atomically
//! with each metric.
//!
//! Can be used as a library through [`MetricStore`], or run as a service
//! with the `vitals` binary, which exposes the store over HTTP.
//!
//! # Example
//!
//! ```rust,ignore
//! use vitals::storage::{MetricFilter, MetricStore, NewMetric, SqlitePool, schema};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = SqlitePool::connect("sqlite:data/vitals.db?mode=rwc").await?;
//!     schema::provision(&pool).await?;
//!     let store = MetricStore::new(pool);
//!
//!     store
//!         .insert(NewMetric {
//!             key: "heartrate".into(),
//!             value: 72.5,
//!             timestamp: 1000,
//!             tags: vec!["bed-1".into(), "icu".into()],
//!         })
//!         .await?;
//!
//!     let metrics = store
//!         .query(MetricFilter {
//!             tag: Some("icu".into()),
//!             ..Default::default()
//!         })
//!         .await?;
//!     println!("{metrics:?}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod server;
pub mod storage;

pub use config::AppConfig;
pub use storage::{Metric, MetricFilter, MetricStore, NewMetric, SqlitePool, StorageError};
