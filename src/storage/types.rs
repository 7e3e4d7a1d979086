//! Core data types for the storage layer.
//!
//! - [`NewMetric`]: a measurement as handed to the writer
//! - [`Metric`]: a stored measurement with its tag list reconstituted
//! - [`MetricFilter`]: optional criteria narrowing a query

use serde::{Deserialize, Serialize};

/// A measurement to be persisted.
///
/// The timestamp is integer milliseconds; whether it comes from the caller
/// or is assigned at ingestion is the caller's business. Tag texts are
/// expected to be distinct and non-empty (the HTTP layer validates this);
/// the store itself collapses any duplicates into one link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMetric {
    /// Measurement key (e.g., "heartrate").
    pub key: String,
    /// Numeric value. Zero is a valid value, distinct from absent.
    pub value: f64,
    /// Unix milliseconds.
    pub timestamp: i64,
    /// Tag texts to associate, 0-50 entries.
    pub tags: Vec<String>,
}

/// A stored measurement as returned by queries.
///
/// `tags` is always a list, empty for tagless metrics, never omitted.
/// Under a tag filter it holds the matched tag text only, mirroring the
/// predicate landing on the joined tag row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Measurement key.
    pub key: String,
    /// Numeric value.
    pub value: f64,
    /// Unix milliseconds.
    pub timestamp: i64,
    /// Associated tag texts in tag-creation order.
    pub tags: Vec<String>,
}

/// Optional criteria for querying metrics.
///
/// Every field is independently optional; absent fields impose no
/// constraint. An empty string or a zero timestamp also counts as absent
/// (see [`MetricFilter::normalized`]), which makes a key of `""` or a
/// timestamp of exactly 0 unfilterable-on. That is a known limitation
/// carried over deliberately, not an oversight to fix.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricFilter {
    /// Exact match on the metric key.
    pub key: Option<String>,
    /// Exact match against a single tag text.
    pub tag: Option<String>,
    /// Inclusive lower timestamp bound.
    pub min_timestamp: Option<i64>,
    /// Exclusive upper timestamp bound.
    pub max_timestamp: Option<i64>,
}

impl MetricFilter {
    /// Collapse zero/empty values into "no constraint".
    pub fn normalized(self) -> Self {
        Self {
            key: self.key.filter(|s| !s.is_empty()),
            tag: self.tag.filter(|s| !s.is_empty()),
            min_timestamp: self.min_timestamp.filter(|&ts| ts != 0),
            max_timestamp: self.max_timestamp.filter(|&ts| ts != 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_drops_zero_and_empty() {
        let filter = MetricFilter {
            key: Some(String::new()),
            tag: Some(String::new()),
            min_timestamp: Some(0),
            max_timestamp: Some(0),
        }
        .normalized();

        assert!(filter.key.is_none());
        assert!(filter.tag.is_none());
        assert!(filter.min_timestamp.is_none());
        assert!(filter.max_timestamp.is_none());
    }

    #[test]
    fn test_normalized_keeps_real_values() {
        let filter = MetricFilter {
            key: Some("heartrate".to_string()),
            tag: None,
            min_timestamp: Some(100),
            max_timestamp: Some(200),
        }
        .normalized();

        assert_eq!(filter.key.as_deref(), Some("heartrate"));
        assert_eq!(filter.min_timestamp, Some(100));
        assert_eq!(filter.max_timestamp, Some(200));
    }

    #[test]
    fn test_metric_serializes_empty_tags_as_list() {
        let metric = Metric {
            key: "heartrate".to_string(),
            value: 0.0,
            timestamp: 1000,
            tags: Vec::new(),
        };
        let json = serde_json::to_value(&metric).unwrap();
        assert_eq!(json["tags"], serde_json::json!([]));
        assert_eq!(json["value"], serde_json::json!(0.0));
    }
}
