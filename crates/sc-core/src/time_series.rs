//! Ordered time-indexed series used for forward and interest-rate curves.
//!
//! `TimeSeries<K, V>` is an ordered map from a period key (usually a
//! `chrono::NaiveDate`) to a value.  Curves handed to the calibration are
//! read-only; lookups never interpolate.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An ordered map from period to value, backed by a `BTreeMap`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "K: Ord + Serialize, V: Serialize",
        deserialize = "K: Ord + Deserialize<'de>, V: Deserialize<'de>"
    ))
)]
pub struct TimeSeries<K: Ord, V> {
    data: BTreeMap<K, V>,
}

impl<K: Ord, V> Default for TimeSeries<K, V> {
    fn default() -> Self {
        Self {
            data: BTreeMap::new(),
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for TimeSeries<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

impl<K: Ord, V> TimeSeries<K, V> {
    /// Create an empty series.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(key, value)` pairs. Later duplicates overwrite earlier ones.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        pairs.into_iter().collect()
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

    /// Exact lookup.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.data.get(key)
    }

    /// Insert or overwrite a value.
    pub fn insert(&mut self, key: K, value: V) {
        self.data.insert(key, value);
    }

    /// Whether the series has at least one point at or before `start` and one
    /// at or after `end`, i.e. its key span encloses `[start, end]`.
    pub fn covers(&self, start: &K, end: &K) -> bool {
        match (self.first_key(), self.last_key()) {
            (Some(first), Some(last)) => first <= start && last >= end,
            _ => false,
        }
    }

    /// Iterate over `(key, value)` pairs in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.data.iter()
    }
}

impl<'a, K: Ord, V> IntoIterator for &'a TimeSeries<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = std::collections::btree_map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}
