//! Database schema definitions and provisioning.
//!
//! Three tables back the store: `metrics` (one row per measurement),
//! `tags` (a shared, append-only dictionary of tag texts), and
//! `metric_tags` (the many-to-many link between them).

use crate::storage::StorageError;
use crate::storage::db::SqlitePool;

/// SQL statement for creating the metrics table.
///
/// `AUTOINCREMENT` keeps ids strictly monotonic; plain rowids can be
/// reused after deletes.
pub const METRICS_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS metrics (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    key       TEXT NOT NULL,
    value     REAL NOT NULL,
    timestamp INTEGER NOT NULL
);
"#;

/// Index on the metric key for equality filtering.
pub const METRICS_KEY_INDEX_DDL: &str =
    "CREATE INDEX IF NOT EXISTS idx_metrics_key ON metrics(key);";

/// Index on the metric timestamp for range filtering and ordering.
pub const METRICS_TIMESTAMP_INDEX_DDL: &str =
    "CREATE INDEX IF NOT EXISTS idx_metrics_timestamp ON metrics(timestamp);";

/// SQL statement for creating the tags table.
///
/// The unique constraint on `text` is what makes concurrent tag creation
/// safe: racing writers all land on the same row via ON CONFLICT.
pub const TAGS_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS tags (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL UNIQUE
);
"#;

/// SQL statement for creating the metric/tag link table.
///
/// Deleting a metric cascades to its links; a tag still in use cannot be
/// dropped (RESTRICT). Tags themselves are never deleted by normal
/// operation, so orphaned tags may accumulate.
pub const METRIC_TAGS_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS metric_tags (
    metric_id INTEGER NOT NULL REFERENCES metrics(id) ON DELETE CASCADE,
    tag_id    INTEGER NOT NULL REFERENCES tags(id) ON DELETE RESTRICT,
    PRIMARY KEY (metric_id, tag_id)
);
"#;

/// Index in the reverse order of the primary key.
///
/// Tag-filtered queries hit the tag side first, so they need
/// (tag_id, metric_id) rather than the (metric_id, tag_id) primary order.
pub const METRIC_TAGS_TAG_INDEX_DDL: &str =
    "CREATE INDEX IF NOT EXISTS idx_metric_tags_tag_id_metric_id ON metric_tags(tag_id, metric_id);";

/// Create all tables, constraints, and indexes if absent.
///
/// Idempotent; safe to call on every process start. The only expected
/// failure mode is connectivity loss, which is fatal to startup.
pub async fn provision(pool: &SqlitePool) -> Result<(), StorageError> {
    let statements = [
        METRICS_TABLE_DDL,
        METRICS_KEY_INDEX_DDL,
        METRICS_TIMESTAMP_INDEX_DDL,
        TAGS_TABLE_DDL,
        METRIC_TAGS_TABLE_DDL,
        METRIC_TAGS_TAG_INDEX_DDL,
    ];

    for ddl in statements {
        sqlx::query(ddl).execute(pool.inner()).await?;
    }

    tracing::debug!("Schema provisioned");
    Ok(())
}
