//! Ordered time-indexed container, used as the historical fixing store.

use std::collections::BTreeMap;
use std::ops::RangeBounds;

/// Values keyed by an ordered key (typically a date), backed by a `BTreeMap`.
///
/// Missing keys return `None`; there is no null sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries<K: Ord + Clone, V: Clone> {
    data: BTreeMap<K, V>,
}

impl<K: Ord + Clone, V: Clone> Default for TimeSeries<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V: Clone> FromIterator<(K, V)> for TimeSeries<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

impl<K: Ord + Clone, V: Clone> TimeSeries<K, V> {
    /// Create an empty time series.
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the series is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The earliest key.
    pub fn first_key(&self) -> Option<&K> {
        self.data.keys().next()
    }

    /// The latest key.
    pub fn last_key(&self) -> Option<&K> {
        self.data.keys().next_back()
    }

    /// Look up a value by key.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.data.get(key)
    }

    /// Insert or overwrite a value, returning the previous one.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.data.insert(key, value)
    }

    /// Remove an entry.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.data.remove(key)
    }

    /// Whether a key is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.data.contains_key(key)
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.data.iter()
    }

    /// Entries whose keys fall in `range`.
    pub fn range<R: RangeBounds<K>>(&self, range: R) -> impl Iterator<Item = (&K, &V)> {
        self.data.range(range)
    }

    /// The latest entry with key `<= key`.
    pub fn last_at_or_before(&self, key: &K) -> Option<(&K, &V)> {
        self.data.range(..=key.clone()).next_back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TimeSeries<i32, f64> {
        [(3, 30.0), (1, 10.0), (2, 20.0)].into_iter().collect()
    }

    #[test]
    fn ordered_by_key() {
        let ts = sample();
        let keys: Vec<i32> = ts.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![1, 2, 3]);
        assert_eq!(ts.first_key(), Some(&1));
        assert_eq!(ts.last_key(), Some(&3));
    }

    #[test]
    fn insert_overwrites() {
        let mut ts = sample();
        assert_eq!(ts.insert(2, 25.0), Some(20.0));
        assert_eq!(ts.get(&2), Some(&25.0));
        assert_eq!(ts.len(), 3);
    }

    #[test]
    fn range_and_lookup_before() {
        let ts = sample();
        let mid: Vec<f64> = ts.range(2..).map(|(_, v)| *v).collect();
        assert_eq!(mid, vec![20.0, 30.0]);
        assert_eq!(ts.last_at_or_before(&5), Some((&3, &30.0)));
        assert_eq!(ts.last_at_or_before(&0), None);
    }
}
