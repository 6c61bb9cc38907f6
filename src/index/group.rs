//! Incrementally reduced groupings over a dimension's keys.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

use crate::index::GroupObserver;
use crate::index::dimension::{Dimension, SortKey};

/// Incremental reduction of records into a per-bucket accumulator.
///
/// `add` and `remove` must be exact inverses on every summed field: groups
/// never recompute a bucket, they rely on `remove` cancelling a prior `add`.
/// Non-inverse reducers leave accumulator values unspecified.
pub trait Reducer<R> {
    /// Per-bucket accumulator.
    type Acc;

    /// Fresh accumulator for an empty bucket.
    fn initial(&self) -> Self::Acc;

    /// Fold an entering record into the bucket.
    fn add(&self, acc: &mut Self::Acc, record: &R);

    /// Take a leaving record back out of the bucket.
    fn remove(&self, acc: &mut Self::Acc, record: &R);
}

/// Handle to a group registered with a [`FilterIndex`](crate::index::FilterIndex).
///
/// Handles are not `Clone`; removing the group consumes the handle.
pub struct GroupId<K, Red> {
    index_id: u64,
    slot: usize,
    _marker: PhantomData<fn() -> (K, Red)>,
}

impl<K, Red> GroupId<K, Red> {
    pub(crate) fn new(index_id: u64, slot: usize) -> Self {
        Self {
            index_id,
            slot,
            _marker: PhantomData,
        }
    }

    pub(crate) fn index_id(&self) -> u64 {
        self.index_id
    }

    pub(crate) fn slot(&self) -> usize {
        self.slot
    }
}

impl<K, Red> fmt::Debug for GroupId<K, Red> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupId")
            .field("index_id", &self.index_id)
            .field("slot", &self.slot)
            .finish()
    }
}

/// Buckets of a grouping: one accumulator per distinct key.
#[derive(Debug, Clone)]
pub struct Group<K, A> {
    keys: Vec<K>,
    values: Vec<A>,
    members: Vec<u32>,
    bucket_of: Vec<u32>,
}

impl<K: SortKey, A> Group<K, A> {
    /// Non-empty buckets in ascending key order.
    pub fn all(&self) -> impl Iterator<Item = (&K, &A)> + '_ {
        self.keys
            .iter()
            .zip(&self.values)
            .zip(&self.members)
            .filter(|(_, members)| **members > 0)
            .map(|(entry, _)| entry)
    }

    /// Accumulator of a non-empty bucket.
    #[cfg(test)]
    pub(crate) fn get(&self, key: &K) -> Option<&A> {
        let bucket = self
            .keys
            .binary_search_by(|probe| probe.cmp_key(key))
            .ok()?;
        (self.members[bucket] > 0).then(|| &self.values[bucket])
    }
}

/// A group bundled with its reducer, as stored inside the index.
pub(crate) struct ReducedGroup<K, Red: Reducer<R>, R> {
    buckets: Group<K, Red::Acc>,
    reducer: Red,
    _record: PhantomData<fn(&R)>,
}

impl<K, Red, R> ReducedGroup<K, Red, R>
where
    K: SortKey + Clone,
    Red: Reducer<R>,
{
    /// Assign every record of `dimension` to a bucket; all buckets start empty.
    pub(crate) fn new(dimension: &Dimension<K>, record_count: usize, reducer: Red) -> Self {
        let mut keys: Vec<K> = Vec::new();
        let mut bucket_of = vec![0u32; record_count];
        for (key, &record) in dimension.keys().iter().zip(dimension.order()) {
            let is_new = keys
                .last()
                .is_none_or(|last| last.cmp_key(key) != Ordering::Equal);
            if is_new {
                keys.push(key.clone());
            }
            bucket_of[record as usize] = (keys.len() - 1) as u32;
        }
        let values = keys.iter().map(|_| reducer.initial()).collect();
        let members = vec![0; keys.len()];
        Self {
            buckets: Group {
                keys,
                values,
                members,
                bucket_of,
            },
            reducer,
            _record: PhantomData,
        }
    }

    pub(crate) fn buckets(&self) -> &Group<K, Red::Acc> {
        &self.buckets
    }
}

impl<K, Red, R> GroupObserver<R> for ReducedGroup<K, Red, R>
where
    K: SortKey + Clone + 'static,
    Red: Reducer<R> + 'static,
    Red::Acc: 'static,
    R: 'static,
{
    fn add(&mut self, records: &[R], entered: &[u32]) {
        let group = &mut self.buckets;
        for &record in entered {
            let bucket = group.bucket_of[record as usize] as usize;
            group.members[bucket] += 1;
            self.reducer
                .add(&mut group.values[bucket], &records[record as usize]);
        }
    }

    fn remove(&mut self, records: &[R], exited: &[u32]) {
        let group = &mut self.buckets;
        for &record in exited {
            let bucket = group.bucket_of[record as usize] as usize;
            debug_assert!(group.members[bucket] > 0, "bucket member count underflow");
            group.members[bucket] = group.members[bucket].saturating_sub(1);
            self.reducer
                .remove(&mut group.values[bucket], &records[record as usize]);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::FilterIndex;

    #[derive(Debug, Clone, Copy)]
    struct Item {
        group: u32,
        weight: f64,
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Sum {
        total: f64,
        count: i64,
    }

    struct SumWeights;

    impl Reducer<Item> for SumWeights {
        type Acc = Sum;

        fn initial(&self) -> Sum {
            Sum::default()
        }

        fn add(&self, acc: &mut Sum, item: &Item) {
            acc.total += item.weight;
            acc.count += 1;
        }

        fn remove(&self, acc: &mut Sum, item: &Item) {
            acc.total -= item.weight;
            acc.count -= 1;
        }
    }

    fn items() -> Vec<Item> {
        vec![
            Item { group: 2, weight: 1.0 },
            Item { group: 1, weight: 2.0 },
            Item { group: 2, weight: 4.0 },
            Item { group: 3, weight: 8.0 },
        ]
    }

    #[test]
    fn group_starts_with_visible_records_only() {
        let mut index = FilterIndex::new(items());
        let mut weight = index.dimension(|item| item.weight);
        weight.filter_range(&mut index, 2.0, 100.0);
        let by_group = index.dimension(|item| item.group);
        let id = index.group(&by_group, SumWeights);
        let group = index.group_buckets(&id).expect("live group");
        assert_eq!(group.all().count(), 3);
        assert_eq!(group.get(&2), Some(&Sum { total: 4.0, count: 1 }));
    }

    #[test]
    fn empty_buckets_are_skipped() {
        let mut index = FilterIndex::new(items());
        let by_group = index.dimension(|item| item.group);
        let id = index.group(&by_group, SumWeights);
        let mut weight = index.dimension(|item| item.weight);
        weight.filter_range(&mut index, 0.0, 5.0);

        let group = index.group_buckets(&id).expect("live group");
        let keys: Vec<u32> = group.all().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec![1, 2]);
        assert_eq!(group.get(&3), None);
        assert_eq!(group.get(&42), None);
    }

    #[test]
    fn add_then_remove_restores_initial() {
        let reducer = SumWeights;
        let item = Item { group: 1, weight: 3.5 };
        let mut acc = reducer.initial();
        reducer.add(&mut acc, &item);
        reducer.remove(&mut acc, &item);
        assert_eq!(acc, reducer.initial());
    }

    #[test]
    fn filtering_the_grouped_dimension_itself_is_observed() {
        let mut index = FilterIndex::new(items());
        let mut by_group = index.dimension(|item| item.group);
        let id = index.group(&by_group, SumWeights);
        by_group.filter_exact(&mut index, 2);
        let group = index.group_buckets(&id).expect("live group");
        assert_eq!(group.all().count(), 1);
        assert_eq!(group.get(&2), Some(&Sum { total: 5.0, count: 2 }));
    }
}
