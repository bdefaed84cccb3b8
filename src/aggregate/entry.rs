use std::sync::atomic::{AtomicI64, Ordering};

use crate::trace::record::RecordTotals;
use crate::trace::Schema;

/// Running totals for one bucket key.
/// Sums saturate at the `i64` bounds instead of wrapping. The peak starts at
/// zero and is raised through a CAS loop. All operations are safe for
/// concurrent use.
pub struct EntryAggregate {
    count: AtomicI64,
    raw_bytes: AtomicI64,
    stride_bytes: AtomicI64,
    fallbacks: AtomicI64,
    peak: AtomicI64,
}

impl EntryAggregate {
    pub fn new() -> Self {
        Self {
            count: AtomicI64::new(0),
            raw_bytes: AtomicI64::new(0),
            stride_bytes: AtomicI64::new(0),
            fallbacks: AtomicI64::new(0),
            peak: AtomicI64::new(0),
        }
    }

    /// Adds one record's quantities to the cumulative sums.
    pub fn add(&self, totals: &RecordTotals) {
        saturating_add(&self.count, totals.count);
        saturating_add(&self.raw_bytes, totals.raw_bytes);
        if let Some(stride) = totals.stride_bytes {
            saturating_add(&self.stride_bytes, stride);
        }
        if let Some(fallbacks) = totals.fallbacks {
            saturating_add(&self.fallbacks, fallbacks);
        }
    }

    /// Raises the peak to `subtotal` if it is larger.
    pub fn raise_peak(&self, subtotal: i64) {
        // CAS loop for max.
        loop {
            let old_peak = self.peak.load(Ordering::Relaxed);
            if subtotal <= old_peak {
                break;
            }
            if self
                .peak
                .compare_exchange_weak(old_peak, subtotal, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }
    }

    /// Returns a point-in-time view. Fields `schema` does not define are `None`.
    pub fn snapshot<K>(&self, key: K, schema: Schema) -> AggregateEntry<K> {
        AggregateEntry {
            key,
            count: self.count.load(Ordering::Relaxed),
            raw_bytes: self.raw_bytes.load(Ordering::Relaxed),
            stride_bytes: schema
                .has_stride_bytes()
                .then(|| self.stride_bytes.load(Ordering::Relaxed)),
            fallbacks: schema
                .has_fallbacks()
                .then(|| self.fallbacks.load(Ordering::Relaxed)),
            peak: self.peak.load(Ordering::Relaxed),
        }
    }
}

impl Default for EntryAggregate {
    fn default() -> Self {
        Self::new()
    }
}

fn saturating_add(sum: &AtomicI64, value: i64) {
    // The closure always returns Some, so the update cannot fail.
    let _ = sum.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |old| {
        Some(old.saturating_add(value))
    });
}

/// Point-in-time view of one key's aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateEntry<K> {
    pub key: K,
    pub count: i64,
    pub raw_bytes: i64,
    pub stride_bytes: Option<i64>,
    pub fallbacks: Option<i64>,
    /// Largest single-phase subtotal seen for this key, never below zero.
    pub peak: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(count: i64, raw: i64, stride: Option<i64>, fallbacks: Option<i64>) -> RecordTotals {
        RecordTotals {
            count,
            raw_bytes: raw,
            stride_bytes: stride,
            fallbacks,
        }
    }

    #[test]
    fn test_add_accumulates() {
        let agg = EntryAggregate::new();
        agg.add(&totals(3, 48, None, None));
        agg.add(&totals(2, 40, None, None));

        let snap = agg.snapshot(16i64, Schema::Stride);
        assert_eq!(snap.count, 5);
        assert_eq!(snap.raw_bytes, 88);
        assert_eq!(snap.stride_bytes, None);
        assert_eq!(snap.fallbacks, None);
        assert_eq!(snap.peak, 0);
    }

    #[test]
    fn test_add_optional_fields() {
        let agg = EntryAggregate::new();
        agg.add(&totals(1, 24, Some(32), Some(0)));
        agg.add(&totals(1, 24, Some(32), Some(1)));

        let snap = agg.snapshot((), Schema::Proxy);
        assert_eq!(snap.stride_bytes, Some(64));
        assert_eq!(snap.fallbacks, Some(1));
    }

    #[test]
    fn test_proxy_schema_reports_zero_not_absent() {
        let agg = EntryAggregate::new();
        agg.add(&totals(1, 8, Some(0), Some(0)));
        let snap = agg.snapshot((), Schema::Proxy);
        assert_eq!(snap.stride_bytes, Some(0));
        assert_eq!(snap.fallbacks, Some(0));
    }

    #[test]
    fn test_raise_peak_is_max() {
        let agg = EntryAggregate::new();
        agg.raise_peak(48);
        agg.raise_peak(40);
        assert_eq!(agg.snapshot((), Schema::Stride).peak, 48);

        agg.raise_peak(100);
        agg.raise_peak(100);
        assert_eq!(agg.snapshot((), Schema::Stride).peak, 100);
    }

    #[test]
    fn test_raise_peak_concurrent() {
        use std::sync::Arc;
        use std::thread;

        let agg = Arc::new(EntryAggregate::new());
        let mut handles = Vec::new();

        for t in 0..4i64 {
            let agg = Arc::clone(&agg);
            handles.push(thread::spawn(move || {
                for i in 0..1000i64 {
                    agg.raise_peak(t * 1000 + i);
                    agg.add(&totals(1, 1, None, None));
                }
            }));
        }

        for h in handles {
            h.join().expect("thread panicked");
        }

        let snap = agg.snapshot((), Schema::Stride);
        assert_eq!(snap.peak, 3999);
        assert_eq!(snap.count, 4000);
        assert_eq!(snap.raw_bytes, 4000);
    }

    #[test]
    fn test_add_saturates_instead_of_wrapping() {
        let agg = EntryAggregate::new();
        agg.add(&totals(1, i64::MAX, Some(i64::MAX), Some(0)));
        let first = agg.snapshot((), Schema::Proxy);

        agg.add(&totals(1, 10, Some(10), Some(0)));
        let second = agg.snapshot((), Schema::Proxy);

        assert_eq!(second.raw_bytes, i64::MAX);
        assert_eq!(second.stride_bytes, Some(i64::MAX));
        assert!(second.raw_bytes >= first.raw_bytes);
        assert_eq!(second.count, 2);
    }

    #[test]
    fn test_negative_values_accumulate_and_peak_floors_at_zero() {
        let agg = EntryAggregate::new();
        agg.add(&totals(-1, 8, None, None));
        agg.add(&totals(2, 16, None, None));
        agg.raise_peak(-5);

        let snap = agg.snapshot((), Schema::Stride);
        assert_eq!(snap.count, 1);
        assert_eq!(snap.raw_bytes, 24);
        assert_eq!(snap.peak, 0);
    }
}
