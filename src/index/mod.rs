//! Incremental cross-filter index.
//!
//! A [`FilterIndex`] owns the record store and one filter bit per live
//! [`Dimension`], up to [`MAX_DIMENSIONS`]. A record is visible iff no
//! dimension has its bit set. When a dimension changes its predicate it reports
//! only the records whose pass state flipped; the index turns those into
//! visibility deltas and forwards them to every registered [`Group`], which
//! reduce them incrementally.

mod dimension;
mod group;

pub use dimension::{Dimension, SortKey};
pub use group::{Group, GroupId, Reducer};

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};

use group::ReducedGroup;

static INDEX_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Maximum number of dimensions live on one index.
pub const MAX_DIMENSIONS: usize = 64;

/// A dimension's bit inside the per-record filter word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FilterBit(u64);

/// Per-record filter words, one bit per live dimension.
#[derive(Debug, Clone, Default)]
struct FilterBits {
    words: Vec<u64>,
    allocated: u64,
}

impl FilterBits {
    fn new(len: usize) -> Self {
        Self {
            words: vec![0; len],
            allocated: 0,
        }
    }

    fn allocate(&mut self) -> FilterBit {
        assert!(
            self.allocated != u64::MAX,
            "at most {MAX_DIMENSIONS} dimensions can be live at once"
        );
        let mask = 1u64 << (!self.allocated).trailing_zeros();
        self.allocated |= mask;
        FilterBit(mask)
    }

    fn release(&mut self, bit: FilterBit) {
        debug_assert!(
            self.words.iter().all(|word| word & bit.0 == 0),
            "released filter bit is still set"
        );
        self.allocated &= !bit.0;
    }

    fn is_set(&self, record: u32, bit: FilterBit) -> bool {
        self.words[record as usize] & bit.0 != 0
    }

    fn set(&mut self, record: u32, bit: FilterBit) {
        self.words[record as usize] |= bit.0;
    }

    fn clear(&mut self, record: u32, bit: FilterBit) {
        self.words[record as usize] &= !bit.0;
    }

    fn is_visible(&self, record: u32) -> bool {
        self.words[record as usize] == 0
    }
}

/// Receives visibility deltas from the index.
pub(crate) trait GroupObserver<R> {
    /// Records that just became visible.
    fn add(&mut self, records: &[R], entered: &[u32]);
    /// Records that just became hidden.
    fn remove(&mut self, records: &[R], exited: &[u32]);
    fn as_any(&self) -> &dyn Any;
}

/// Record store plus filter state shared by all dimensions and groups.
pub struct FilterIndex<R> {
    id: u64,
    records: Vec<R>,
    bits: FilterBits,
    groups: Vec<Option<Box<dyn GroupObserver<R> + Send>>>,
}

impl<R> FilterIndex<R> {
    /// Attach a record store. All records start visible.
    pub fn new(records: Vec<R>) -> Self {
        debug_assert!(records.len() <= u32::MAX as usize);
        Self {
            id: INDEX_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            bits: FilterBits::new(records.len()),
            records,
            groups: Vec::new(),
        }
    }

    /// All records, visible or not.
    pub fn records(&self) -> &[R] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check whether a record passes every dimension.
    pub fn is_visible(&self, index: u32) -> bool {
        (index as usize) < self.records.len() && self.bits.is_visible(index)
    }

    /// Iterate over visible records in store order.
    #[cfg(test)]
    pub(crate) fn visible(&self) -> impl Iterator<Item = &R> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(index, _)| self.bits.is_visible(*index as u32))
            .map(|(_, record)| record)
    }

    /// Count visible records.
    pub fn visible_len(&self) -> usize {
        (0..self.records.len() as u32)
            .filter(|index| self.bits.is_visible(*index))
            .count()
    }

    /// Create a dimension keyed by `key`. It starts unfiltered.
    ///
    /// # Panics
    ///
    /// Panics if [`MAX_DIMENSIONS`] dimensions are already live.
    pub fn dimension<K: SortKey>(&mut self, key: impl Fn(&R) -> K) -> Dimension<K> {
        let bit = self.bits.allocate();
        Dimension::build(self.id, bit, &self.records, key)
    }

    /// Group the visible records by the keys of `dimension`, reducing each
    /// bucket with `reducer`.
    ///
    /// The group observes every dimension of this index, including its own.
    pub fn group<K, Red>(&mut self, dimension: &Dimension<K>, reducer: Red) -> GroupId<K, Red>
    where
        R: 'static,
        K: SortKey + Clone + Send + 'static,
        Red: Reducer<R> + Send + 'static,
        Red::Acc: Send + 'static,
    {
        debug_assert_eq!(dimension.index_id(), self.id, "dimension from another index");
        let mut group = ReducedGroup::new(dimension, self.records.len(), reducer);
        let visible: Vec<u32> = (0..self.records.len() as u32)
            .filter(|index| self.bits.is_visible(*index))
            .collect();
        group.add(&self.records, &visible);

        let slot = match self.groups.iter().position(Option::is_none) {
            Some(slot) => {
                self.groups[slot] = Some(Box::new(group));
                slot
            }
            None => {
                self.groups.push(Some(Box::new(group)));
                self.groups.len() - 1
            }
        };
        GroupId::new(self.id, slot)
    }

    /// Access a group's buckets.
    ///
    /// Returns `None` only for a handle issued by another index.
    pub fn group_buckets<K, Red>(&self, id: &GroupId<K, Red>) -> Option<&Group<K, Red::Acc>>
    where
        R: 'static,
        K: SortKey + Clone + 'static,
        Red: Reducer<R> + 'static,
        Red::Acc: 'static,
    {
        if id.index_id() != self.id {
            return None;
        }
        self.groups
            .get(id.slot())?
            .as_ref()?
            .as_any()
            .downcast_ref::<ReducedGroup<K, Red, R>>()
            .map(ReducedGroup::buckets)
    }

    /// Detach a group. Its slot is reused by the next group.
    pub fn remove_group<K, Red>(&mut self, id: GroupId<K, Red>) {
        if id.index_id() != self.id {
            return;
        }
        if let Some(slot) = self.groups.get_mut(id.slot()) {
            *slot = None;
        }
    }

    fn group_count(&self) -> usize {
        self.groups.iter().flatten().count()
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn passes(&self, record: u32, bit: FilterBit) -> bool {
        !self.bits.is_set(record, bit)
    }

    pub(crate) fn release_bit(&mut self, bit: FilterBit) {
        self.bits.release(bit);
    }

    /// Apply a dimension's pass-state change and notify groups of records
    /// whose overall visibility flipped.
    ///
    /// `entered` now pass the dimension, `exited` no longer do; the two sets
    /// must be disjoint.
    pub(crate) fn apply_change(&mut self, bit: FilterBit, entered: &[u32], exited: &[u32]) {
        let mut removed = Vec::new();
        for &record in exited {
            if self.bits.is_visible(record) {
                removed.push(record);
            }
            self.bits.set(record, bit);
        }
        let mut added = Vec::new();
        for &record in entered {
            self.bits.clear(record, bit);
            if self.bits.is_visible(record) {
                added.push(record);
            }
        }
        tracing::trace!(
            entered = entered.len(),
            exited = exited.len(),
            added = added.len(),
            removed = removed.len(),
            "filter change applied"
        );
        if added.is_empty() && removed.is_empty() {
            return;
        }
        for group in self.groups.iter_mut().flatten() {
            group.remove(&self.records, &removed);
            group.add(&self.records, &added);
        }
    }
}

impl<R> std::fmt::Debug for FilterIndex<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterIndex")
            .field("id", &self.id)
            .field("records", &self.records.len())
            .field("live_dimensions", &self.bits.allocated.count_ones())
            .field("groups", &self.group_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Row {
        a: f64,
        b: u32,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { a: 1.0, b: 1 },
            Row { a: 2.0, b: 2 },
            Row { a: 3.0, b: 1 },
            Row { a: 4.0, b: 2 },
        ]
    }

    struct Count;

    impl Reducer<Row> for Count {
        type Acc = u32;

        fn initial(&self) -> u32 {
            0
        }

        fn add(&self, acc: &mut u32, _: &Row) {
            *acc += 1;
        }

        fn remove(&self, acc: &mut u32, _: &Row) {
            *acc -= 1;
        }
    }

    #[test]
    fn dimensions_compose_by_and() {
        let mut index = FilterIndex::new(rows());
        let mut a = index.dimension(|row| row.a);
        let mut b = index.dimension(|row| row.b);
        a.filter_range(&mut index, 2.0, 5.0);
        b.filter_exact(&mut index, 1);
        let visible: Vec<_> = index.visible().copied().collect();
        assert_eq!(visible, vec![Row { a: 3.0, b: 1 }]);
        b.filter_all(&mut index);
        assert_eq!(index.visible_len(), 3);
    }

    #[test]
    fn groups_follow_other_dimensions() {
        let mut index = FilterIndex::new(rows());
        let mut a = index.dimension(|row| row.a);
        let b = index.dimension(|row| row.b);
        let id = index.group(&b, Count);

        a.filter_range(&mut index, 0.0, 3.0);
        let buckets: Vec<_> = index
            .group_buckets(&id)
            .expect("live group")
            .all()
            .map(|(key, count)| (*key, *count))
            .collect();
        assert_eq!(buckets, vec![(1, 1), (2, 1)]);

        a.filter_range(&mut index, 2.5, 10.0);
        let buckets: Vec<_> = index
            .group_buckets(&id)
            .expect("live group")
            .all()
            .map(|(key, count)| (*key, *count))
            .collect();
        assert_eq!(buckets, vec![(1, 1), (2, 1)]);

        a.filter_exact(&mut index, 4.0);
        let group = index.group_buckets(&id).expect("live group");
        assert_eq!(group.all().count(), 1);
        assert_eq!(group.get(&2), Some(&1));
        assert_eq!(group.get(&1), None);
    }

    #[test]
    fn disposing_a_dimension_restores_visibility() {
        let mut index = FilterIndex::new(rows());
        let mut a = index.dimension(|row| row.a);
        let b = index.dimension(|row| row.b);
        let id = index.group(&b, Count);
        a.filter_exact(&mut index, 1.0);
        assert_eq!(index.visible_len(), 1);

        a.dispose(&mut index);
        assert_eq!(index.visible_len(), 4);
        let total: u32 = index
            .group_buckets(&id)
            .expect("live group")
            .all()
            .map(|(_, count)| *count)
            .sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn released_bits_are_reused() {
        let mut index = FilterIndex::new(rows());
        let mut dimensions: Vec<_> = (0..MAX_DIMENSIONS)
            .map(|_| index.dimension(|row| row.b))
            .collect();
        assert_eq!(index.bits.allocated, u64::MAX);

        let last = dimensions.last_mut().expect("dimension");
        last.filter_exact(&mut index, 2);
        assert_eq!(index.visible_len(), 2);

        let first = dimensions.remove(0);
        first.dispose(&mut index);
        let _reused = index.dimension(|row| row.a);
        assert_eq!(index.bits.allocated, u64::MAX);
        assert_eq!(index.visible_len(), 2);
    }

    #[test]
    #[should_panic(expected = "dimensions can be live at once")]
    fn too_many_live_dimensions_panics() {
        let mut index = FilterIndex::new(rows());
        let _dimensions: Vec<_> = (0..=MAX_DIMENSIONS)
            .map(|_| index.dimension(|row| row.b))
            .collect();
    }

    #[test]
    fn removed_group_handle_slot_is_reused() {
        let mut index = FilterIndex::new(rows());
        let b = index.dimension(|row| row.b);
        let first = index.group(&b, Count);
        index.remove_group(first);
        assert_eq!(index.group_count(), 0);
        let second = index.group(&b, Count);
        assert_eq!(index.group_count(), 1);
        assert!(index.group_buckets(&second).is_some());
    }

    #[test]
    fn handles_from_another_index_are_rejected() {
        let mut one = FilterIndex::new(rows());
        let mut other = FilterIndex::new(rows());
        let b = one.dimension(|row| row.b);
        let id = one.group(&b, Count);
        let _ = other.dimension(|row| row.b);
        assert!(other.group_buckets(&id).is_none());
    }

    #[test]
    fn empty_index_degenerates_to_empty_results() {
        let mut index: FilterIndex<Row> = FilterIndex::new(Vec::new());
        let mut a = index.dimension(|row| row.a);
        let id = index.group(&a, Count);
        a.filter_range(&mut index, 0.0, 1.0);
        a.filter_fn(&mut index, |_| true);
        a.filter_all(&mut index);
        assert!(index.group_buckets(&id).expect("live group").all().next().is_none());
        assert_eq!(a.extent(&index), None);
    }
}
