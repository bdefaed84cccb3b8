//! Summary extraction over a finished aggregate table.
//!
//! [`Summary`] holds every entry in ascending key order. Charts consume the
//! full series; the text report consumes a bounded head and tail of it.

use std::collections::BTreeMap;

use crate::aggregate::entry::AggregateEntry;
use crate::aggregate::AggregateTable;
use crate::trace::record::{BucketKey, TraceRecord};
use crate::trace::Schema;

/// Default number of entries taken from each end of the sorted table.
pub const DEFAULT_HIGHLIGHTS: usize = 5;

/// One point of the chart series, keyed by the primary size field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesPoint {
    pub size: i64,
    pub count: i64,
    pub raw_bytes: i64,
    pub stride_bytes: Option<i64>,
    pub peak: i64,
}

/// Read-only, key-sorted view of a completed aggregation.
#[derive(Debug, Clone)]
pub struct Summary<K> {
    schema: Schema,
    rows: Vec<AggregateEntry<K>>,
}

impl<K: BucketKey> Summary<K> {
    pub fn from_table<R>(table: &AggregateTable<R>) -> Self
    where
        R: TraceRecord<Key = K>,
    {
        Self {
            schema: R::SCHEMA,
            rows: table.snapshot(),
        }
    }

    pub fn from_entries(schema: Schema, mut rows: Vec<AggregateEntry<K>>) -> Self {
        rows.sort_by_key(|row| row.key);
        Self { schema, rows }
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// Every entry, ascending by key.
    pub fn rows(&self) -> &[AggregateEntry<K>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first `n` and last `n` entries. When the table has at most `2n`
    /// entries the selection covers it exactly once, so the result always
    /// holds `min(len, 2n)` rows.
    pub fn highlights(&self, n: usize) -> Vec<&AggregateEntry<K>> {
        let len = self.rows.len();
        let head = n.min(len);
        let tail = n.min(len - head);
        self.rows[..head]
            .iter()
            .chain(self.rows[len - tail..].iter())
            .collect()
    }

    /// Chart series grouped by the primary key field. Counts and byte sums
    /// add up (saturating) across secondary key fields; the peak is the
    /// largest of them.
    pub fn series(&self) -> Vec<SeriesPoint> {
        let mut points: BTreeMap<i64, SeriesPoint> = BTreeMap::new();
        for row in &self.rows {
            let size = row.key.primary();
            let point = points.entry(size).or_insert(SeriesPoint {
                size,
                count: 0,
                raw_bytes: 0,
                stride_bytes: row.stride_bytes.map(|_| 0),
                peak: 0,
            });
            point.count = point.count.saturating_add(row.count);
            point.raw_bytes = point.raw_bytes.saturating_add(row.raw_bytes);
            if let (Some(total), Some(stride)) = (point.stride_bytes.as_mut(), row.stride_bytes) {
                *total = total.saturating_add(stride);
            }
            point.peak = point.peak.max(row.peak);
        }
        points.into_values().collect()
    }
}
