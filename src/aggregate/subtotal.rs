use std::collections::hash_map;
use std::collections::HashMap;
use std::hash::Hash;

/// Byte totals per key for a single phase.
///
/// Built while one phase is folded, then handed by value to
/// [`AggregateTable::merge_peaks`](super::AggregateTable::merge_peaks).
#[derive(Debug, Clone)]
pub struct PhaseSubtotals<K> {
    totals: HashMap<K, i64>,
}

impl<K: Eq + Hash> PhaseSubtotals<K> {
    pub fn new() -> Self {
        Self {
            totals: HashMap::new(),
        }
    }

    /// Adds `bytes` to the key's phase total, saturating at the `i64` bounds.
    pub fn add(&mut self, key: K, bytes: i64) {
        let total = self.totals.entry(key).or_insert(0);
        *total = total.saturating_add(bytes);
    }

    pub fn get(&self, key: &K) -> Option<i64> {
        self.totals.get(key).copied()
    }

    /// Number of distinct keys this phase referenced.
    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

impl<K: Eq + Hash> Default for PhaseSubtotals<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> IntoIterator for PhaseSubtotals<K> {
    type Item = (K, i64);
    type IntoIter = hash_map::IntoIter<K, i64>;

    fn into_iter(self) -> Self::IntoIter {
        self.totals.into_iter()
    }
}
