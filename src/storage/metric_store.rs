//! Metric persistence and retrieval.
//!
//! [`MetricStore`] is the storage core behind the two external operations:
//!
//! - `insert`: one metric row plus its tag links, written in a single
//!   transaction so no reader ever observes a partially-linked metric
//! - `query`: dynamic conjunction of optional predicates over a
//!   metrics/tags join, with the flat rows re-nested into per-metric
//!   tag lists in Rust
//!
//! The store is stateless between calls; all coordination is delegated to
//! the database's transactional guarantees.

use sqlx::sqlite::SqliteConnection;
use sqlx::{QueryBuilder, Row, Sqlite};

use crate::storage::StorageError;
use crate::storage::db::SqlitePool;
use crate::storage::types::{Metric, MetricFilter, NewMetric};

// =============================================================================
// Constants
// =============================================================================

/// Upper bound on metrics returned per query.
///
/// Guards the database against unbounded scans. This is a blunt cap, not
/// a pagination strategy; production use would need real paging.
const MAX_QUERY_ROWS: i64 = 100_000;

// =============================================================================
// Store
// =============================================================================

/// Facade over the metrics, tags, and metric_tags tables.
#[derive(Clone)]
pub struct MetricStore {
    pool: SqlitePool,
    max_rows: i64,
}

impl std::fmt::Debug for MetricStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricStore").finish_non_exhaustive()
    }
}

impl MetricStore {
    /// Create a new store over an existing pool.
    ///
    /// Expects [`crate::storage::schema::provision`] to have run.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_rows: MAX_QUERY_ROWS,
        }
    }

    /// Store with a smaller row cap, so cap behavior is testable without
    /// inserting 100,000 rows.
    #[cfg(test)]
    fn with_row_cap(pool: SqlitePool, max_rows: i64) -> Self {
        Self { pool, max_rows }
    }

    /// Cheap connectivity probe for readiness checks.
    pub async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(self.pool.inner()).await?;
        Ok(())
    }

    /// Persist one metric and link it to its tags atomically.
    ///
    /// Returns the number of metric rows created (0 or 1). A metric with
    /// no tags is stored as a standalone row with no link step. Errors
    /// roll the whole unit back; a caller retrying after a transient
    /// failure creates a second, distinct metric row (duplicate
    /// suppression is not a goal here).
    pub async fn insert(&self, metric: NewMetric) -> Result<u64, StorageError> {
        let mut tx = self.pool.inner().begin().await?;

        let result = sqlx::query("INSERT INTO metrics (key, value, timestamp) VALUES (?, ?, ?)")
            .bind(&metric.key)
            .bind(metric.value)
            .bind(metric.timestamp)
            .execute(&mut *tx)
            .await?;
        let metric_id = result.last_insert_rowid();
        let inserted = result.rows_affected();

        if !metric.tags.is_empty() {
            let tag_ids = resolve_tags(&mut tx, &metric.tags).await?;
            for tag_id in tag_ids {
                // A repeated text in one request collapses to one link
                sqlx::query(
                    "INSERT INTO metric_tags (metric_id, tag_id) VALUES (?, ?)
                     ON CONFLICT (metric_id, tag_id) DO NOTHING",
                )
                .bind(metric_id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        tracing::debug!(
            key = %metric.key,
            timestamp = metric.timestamp,
            tags = metric.tags.len(),
            "Metric inserted"
        );
        Ok(inserted)
    }

    /// Retrieve metrics matching the filter, ascending by timestamp.
    ///
    /// Only the supplied criteria constrain the query; an all-absent
    /// filter returns everything up to the cap. The cap counts metrics,
    /// never join rows, so a returned metric always carries its complete
    /// tag list. Metrics with no tags are still returned (outer join)
    /// with an empty tag list. Under a tag filter, each returned metric
    /// carries the matched tag text only, and the lookup is served by
    /// the (tag_id, metric_id) index rather than a full association scan.
    pub async fn query(&self, filter: MetricFilter) -> Result<Vec<Metric>, StorageError> {
        let filter = filter.normalized();

        let mut qb = QueryBuilder::<Sqlite>::new("");
        if let Some(tag) = filter.tag {
            // The unique tag text yields at most one join row per metric,
            // so the row cap is a metric cap here.
            qb.push(
                "SELECT m.id, m.key, m.value, m.timestamp, t.text AS tag \
                 FROM metrics m \
                 JOIN metric_tags mt ON mt.metric_id = m.id \
                 JOIN tags t ON t.id = mt.tag_id \
                 WHERE t.text = ",
            )
            .push_bind(tag);
            if let Some(key) = filter.key {
                qb.push(" AND m.key = ").push_bind(key);
            }
            if let Some(min) = filter.min_timestamp {
                qb.push(" AND m.timestamp >= ").push_bind(min);
            }
            if let Some(max) = filter.max_timestamp {
                qb.push(" AND m.timestamp < ").push_bind(max);
            }
            qb.push(" ORDER BY m.timestamp ASC, m.id ASC LIMIT ")
                .push_bind(self.max_rows);
        } else {
            // Without a tag filter a metric expands to one row per tag,
            // so cap the metrics in a subquery before joining the tags
            // back on.
            qb.push(
                "SELECT m.id, m.key, m.value, m.timestamp, t.text AS tag \
                 FROM (SELECT id, key, value, timestamp FROM metrics",
            );
            let mut prefix = " WHERE ";
            if let Some(key) = filter.key {
                qb.push(prefix).push("key = ").push_bind(key);
                prefix = " AND ";
            }
            if let Some(min) = filter.min_timestamp {
                qb.push(prefix).push("timestamp >= ").push_bind(min);
                prefix = " AND ";
            }
            if let Some(max) = filter.max_timestamp {
                qb.push(prefix).push("timestamp < ").push_bind(max);
            }
            qb.push(" ORDER BY timestamp ASC, id ASC LIMIT ")
                .push_bind(self.max_rows);
            // Secondary ordering keeps a metric's join rows adjacent for
            // the grouping pass below; tag id order is tag-creation order.
            qb.push(
                ") m \
                 LEFT JOIN metric_tags mt ON mt.metric_id = m.id \
                 LEFT JOIN tags t ON t.id = mt.tag_id \
                 ORDER BY m.timestamp ASC, m.id ASC, t.id ASC",
            );
        }

        let rows = qb.build().fetch_all(self.pool.inner()).await?;

        // Re-nest flat join rows into per-metric tag lists
        let mut metrics: Vec<Metric> = Vec::new();
        let mut last_id: Option<i64> = None;

        for row in rows {
            let id: i64 = row.try_get("id")?;
            if last_id != Some(id) {
                metrics.push(Metric {
                    key: row.try_get("key")?,
                    value: row.try_get("value")?,
                    timestamp: row.try_get("timestamp")?,
                    tags: Vec::new(),
                });
                last_id = Some(id);
            }
            if let Some(text) = row.try_get::<Option<String>, _>("tag")?
                && let Some(metric) = metrics.last_mut()
            {
                metric.tags.push(text);
            }
        }

        Ok(metrics)
    }
}

// =============================================================================
// Tag resolution
// =============================================================================

/// Map tag texts to ids, creating any that do not exist yet.
///
/// Insert-or-return-existing keyed on the unique text constraint: when
/// concurrent writers race to create the same new text, the constraint is
/// the sole arbiter and every racer observes the same id. The no-op
/// `DO UPDATE` (rather than `DO NOTHING`) is what makes `RETURNING id`
/// yield a row on the conflict path too.
async fn resolve_tags(
    conn: &mut SqliteConnection,
    texts: &[String],
) -> Result<Vec<i64>, StorageError> {
    let mut ids = Vec::with_capacity(texts.len());
    for text in texts {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO tags (text) VALUES (?)
             ON CONFLICT (text) DO UPDATE SET text = excluded.text
             RETURNING id",
        )
        .bind(text)
        .fetch_one(&mut *conn)
        .await?;
        ids.push(id);
    }
    Ok(ids)
}
