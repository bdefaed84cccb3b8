use std::fmt::Debug;
use std::hash::Hash;

use super::parse::{ParseError, RowFields};
use super::Schema;

/// Grouping identity for aggregate entries.
///
/// Ordering is the report order: ascending by the primary field first.
pub trait BucketKey: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static {
    /// The size-class field charts are drawn over.
    fn primary(&self) -> i64;

    /// Append this key's report cells, one per key column.
    fn push_cells(&self, cells: &mut Vec<String>);
}

/// Key for the stride schema: the allocator bucket (stride size).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StrideKey {
    pub bucket: i64,
}

impl BucketKey for StrideKey {
    fn primary(&self) -> i64 {
        self.bucket
    }

    fn push_cells(&self, cells: &mut Vec<String>) {
        cells.push(self.bucket.to_string());
    }
}

/// Key for the proxy schema: requested size plus the metapool proxy index.
/// The alignment column does not participate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProxyKey {
    pub raw_size: i64,
    pub proxy_index: i64,
}

impl BucketKey for ProxyKey {
    fn primary(&self) -> i64 {
        self.raw_size
    }

    fn push_cells(&self, cells: &mut Vec<String>) {
        cells.push(self.raw_size.to_string());
        cells.push(self.proxy_index.to_string());
    }
}

/// Quantities a record adds to its key's cumulative totals.
/// Fields a schema does not define are `None`, never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordTotals {
    pub count: i64,
    pub raw_bytes: i64,
    pub stride_bytes: Option<i64>,
    pub fallbacks: Option<i64>,
}

/// One parsed row of a phase file.
pub trait TraceRecord: Sized {
    type Key: BucketKey;

    /// Schema this record type decodes.
    const SCHEMA: Schema;

    /// Header columns every row must provide.
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &RowFields<'_>) -> Result<Self, ParseError>;

    fn key(&self) -> Self::Key;

    fn totals(&self) -> RecordTotals;

    /// Bytes this record contributes to its phase subtotal, the quantity
    /// peak tracking observes.
    fn phase_bytes(&self) -> i64;
}

/// Stride schema row: `bucket,count,raw_bytes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrideRecord {
    pub bucket: i64,
    pub count: i64,
    pub raw_bytes: i64,
}

impl TraceRecord for StrideRecord {
    type Key = StrideKey;

    const SCHEMA: Schema = Schema::Stride;

    const COLUMNS: &'static [&'static str] = &["bucket", "count", "raw_bytes"];

    fn from_row(row: &RowFields<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            bucket: row.int("bucket")?,
            count: row.int("count")?,
            raw_bytes: row.int("raw_bytes")?,
        })
    }

    fn key(&self) -> StrideKey {
        StrideKey {
            bucket: self.bucket,
        }
    }

    fn totals(&self) -> RecordTotals {
        RecordTotals {
            count: self.count,
            raw_bytes: self.raw_bytes,
            stride_bytes: None,
            fallbacks: None,
        }
    }

    fn phase_bytes(&self) -> i64 {
        self.raw_bytes
    }
}

/// Proxy schema row as written by the metapool tracer:
/// `raw_size,alignment,proxy_index,count,fallbacks,raw_total_bytes,stride_total_bytes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyRecord {
    pub raw_size: i64,
    pub alignment: i64,
    pub proxy_index: i64,
    pub count: i64,
    pub fallbacks: i64,
    pub raw_total_bytes: i64,
    pub stride_total_bytes: i64,
}

impl TraceRecord for ProxyRecord {
    type Key = ProxyKey;

    const SCHEMA: Schema = Schema::Proxy;

    const COLUMNS: &'static [&'static str] = &[
        "raw_size",
        "alignment",
        "proxy_index",
        "count",
        "fallbacks",
        "raw_total_bytes",
        "stride_total_bytes",
    ];

    fn from_row(row: &RowFields<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            raw_size: row.int("raw_size")?,
            alignment: row.int("alignment")?,
            proxy_index: row.int("proxy_index")?,
            count: row.int("count")?,
            fallbacks: row.int("fallbacks")?,
            raw_total_bytes: row.int("raw_total_bytes")?,
            stride_total_bytes: row.int("stride_total_bytes")?,
        })
    }

    fn key(&self) -> ProxyKey {
        ProxyKey {
            raw_size: self.raw_size,
            proxy_index: self.proxy_index,
        }
    }

    fn totals(&self) -> RecordTotals {
        RecordTotals {
            count: self.count,
            raw_bytes: self.raw_total_bytes,
            stride_bytes: Some(self.stride_total_bytes),
            fallbacks: Some(self.fallbacks),
        }
    }

    fn phase_bytes(&self) -> i64 {
        self.stride_total_bytes
    }
}
