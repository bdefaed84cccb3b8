pub mod entry;
pub mod subtotal;

use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;

use crate::trace::record::TraceRecord;

use self::entry::{AggregateEntry, EntryAggregate};
use self::subtotal::PhaseSubtotals;

/// Process-wide aggregate for one run, keyed by bucket key.
///
/// Uses `DashMap` so phases may be folded from several threads; each entry
/// is independently lockable and its fields are atomics. Sums are
/// order-independent and peaks are merged with a CAS max, so the result does
/// not depend on phase order or interleaving.
pub struct AggregateTable<R: TraceRecord> {
    entries: DashMap<R::Key, EntryAggregate>,
    phases: AtomicUsize,
    _record: PhantomData<fn() -> R>,
}

impl<R: TraceRecord> AggregateTable<R> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            phases: AtomicUsize::new(0),
            _record: PhantomData,
        }
    }

    /// Folds one phase's records into the cumulative sums and returns the
    /// phase's per-key subtotals. Never fails; entries are created on first
    /// sight of a key.
    pub fn fold_phase<I>(&self, records: I) -> PhaseSubtotals<R::Key>
    where
        I: IntoIterator<Item = R>,
    {
        let mut subtotals = PhaseSubtotals::new();
        for record in records {
            let key = record.key();
            self.entries.entry(key).or_default().add(&record.totals());
            subtotals.add(key, record.phase_bytes());
        }
        subtotals
    }

    /// Merges a completed phase's subtotals into the per-key peaks.
    /// Call exactly once per phase, after [`fold_phase`](Self::fold_phase).
    pub fn merge_peaks(&self, subtotals: PhaseSubtotals<R::Key>) {
        for (key, bytes) in subtotals {
            match self.entries.get(&key) {
                Some(entry) => entry.raise_peak(bytes),
                None => self.entries.entry(key).or_default().raise_peak(bytes),
            }
        }
        self.phases.fetch_add(1, Ordering::Relaxed);
    }

    /// Folds a whole phase and merges its peaks. Returns the number of
    /// distinct keys the phase referenced.
    pub fn ingest_phase<I>(&self, records: I) -> usize
    where
        I: IntoIterator<Item = R>,
    {
        let subtotals = self.fold_phase(records);
        let keys = subtotals.len();
        self.merge_peaks(subtotals);
        keys
    }

    /// Number of phases merged so far.
    pub fn phases(&self) -> usize {
        self.phases.load(Ordering::Relaxed)
    }

    /// Number of distinct keys seen across all phases.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &R::Key) -> Option<AggregateEntry<R::Key>> {
        self.entries
            .get(key)
            .map(|entry| entry.snapshot(*key, R::SCHEMA))
    }

    /// All entries, sorted ascending by key.
    pub fn snapshot(&self) -> Vec<AggregateEntry<R::Key>> {
        let mut rows: Vec<AggregateEntry<R::Key>> = self
            .entries
            .iter()
            .map(|item| item.value().snapshot(*item.key(), R::SCHEMA))
            .collect();
        rows.sort_by_key(|row| row.key);
        rows
    }
}

impl<R: TraceRecord> Default for AggregateTable<R> {
    fn default() -> Self {
        Self::new()
    }
}
