//! Filterable projections of the record store onto sorted keys.

use std::cmp::Ordering;
use std::ops::Range;

use crate::index::{FilterBit, FilterIndex};
use crate::sample::{BinId, TaxonomyId, TaxonomySet};

/// Total order used to sort dimension keys.
///
/// Floats are ordered with `total_cmp`, so NaN keys sort after every finite
/// value instead of breaking the binary searches.
pub trait SortKey {
    /// Compare two keys.
    fn cmp_key(&self, other: &Self) -> Ordering;

    /// Whether the key can be an extreme of [`Dimension::extent`].
    fn is_bounded(&self) -> bool {
        true
    }
}

macro_rules! sort_key_via_ord {
    ($($ty:ty),* $(,)?) => {
        $(
            impl SortKey for $ty {
                fn cmp_key(&self, other: &Self) -> Ordering {
                    self.cmp(other)
                }
            }
        )*
    };
}

sort_key_via_ord!(
    u8, u16, u32, u64, usize, i32, i64, bool, String, BinId, TaxonomyId, TaxonomySet
);

impl SortKey for f64 {
    fn cmp_key(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }

    fn is_bounded(&self) -> bool {
        self.is_finite()
    }
}

impl SortKey for f32 {
    fn cmp_key(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }

    fn is_bounded(&self) -> bool {
        self.is_finite()
    }
}

impl<T: SortKey> SortKey for Option<T> {
    fn cmp_key(&self, other: &Self) -> Ordering {
        match (self, other) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp_key(b),
        }
    }
}

impl<A: SortKey, B: SortKey> SortKey for (A, B) {
    fn cmp_key(&self, other: &Self) -> Ordering {
        self.0
            .cmp_key(&other.0)
            .then_with(|| self.1.cmp_key(&other.1))
    }
}

impl<A: SortKey, B: SortKey, C: SortKey> SortKey for (A, B, C) {
    fn cmp_key(&self, other: &Self) -> Ordering {
        self.0
            .cmp_key(&other.0)
            .then_with(|| self.1.cmp_key(&other.1))
            .then_with(|| self.2.cmp_key(&other.2))
    }
}

/// Records passing the current predicate, in sorted-key positions.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Selection {
    /// A contiguous run of sorted positions (unfiltered, range or exact).
    Run(Range<usize>),
    /// An arbitrary predicate; pass state lives only in the filter bits.
    Scattered,
}

/// A filterable projection of the record store onto a derived key.
///
/// Keys are computed once, sorted, and kept alongside the record index they
/// came from. Range and exact filters select a contiguous run of sorted
/// positions, so changing them touches only the positions entering or leaving
/// the run.
#[derive(Debug)]
pub struct Dimension<K> {
    index_id: u64,
    bit: FilterBit,
    keys: Vec<K>,
    order: Vec<u32>,
    selection: Selection,
}

impl<K: SortKey> Dimension<K> {
    pub(crate) fn build<R>(
        index_id: u64,
        bit: FilterBit,
        records: &[R],
        key: impl Fn(&R) -> K,
    ) -> Self {
        let mut entries: Vec<(K, u32)> = records
            .iter()
            .enumerate()
            .map(|(index, record)| (key(record), index as u32))
            .collect();
        entries.sort_by(|a, b| a.0.cmp_key(&b.0).then(a.1.cmp(&b.1)));
        let (keys, order): (Vec<K>, Vec<u32>) = entries.into_iter().unzip();
        let len = keys.len();
        Self {
            index_id,
            bit,
            keys,
            order,
            selection: Selection::Run(0..len),
        }
    }

    pub(crate) fn index_id(&self) -> u64 {
        self.index_id
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    /// Record indices in ascending key order.
    pub(crate) fn order(&self) -> &[u32] {
        &self.order
    }

    /// Keep records with `min <= key < max`.
    pub fn filter_range<R>(&mut self, index: &mut FilterIndex<R>, min: K, max: K) {
        let start = self.lower_bound(&min);
        let end = self.lower_bound(&max).max(start);
        self.select_run(index, start..end);
    }

    /// Keep records whose key equals `key`.
    pub fn filter_exact<R>(&mut self, index: &mut FilterIndex<R>, key: K) {
        let start = self.lower_bound(&key);
        let end = self.upper_bound(&key);
        self.select_run(index, start..end);
    }

    /// Keep records whose key satisfies `predicate`.
    ///
    /// The predicate is evaluated for every key; only records whose pass state
    /// flips are reported to groups.
    pub fn filter_fn<R>(&mut self, index: &mut FilterIndex<R>, predicate: impl Fn(&K) -> bool) {
        debug_assert_eq!(self.index_id, index.id(), "dimension from another index");
        let mut entered = Vec::new();
        let mut exited = Vec::new();
        for (key, &record) in self.keys.iter().zip(&self.order) {
            let was = index.passes(record, self.bit);
            let now = predicate(key);
            if now && !was {
                entered.push(record);
            } else if was && !now {
                exited.push(record);
            }
        }
        self.selection = Selection::Scattered;
        index.apply_change(self.bit, &entered, &exited);
    }

    /// Remove the predicate.
    pub fn filter_all<R>(&mut self, index: &mut FilterIndex<R>) {
        let len = self.keys.len();
        self.select_run(index, 0..len);
    }

    /// Lowest and highest visible key.
    ///
    /// Keys for which [`SortKey::is_bounded`] is false are skipped.
    pub fn extent<'a, R>(&'a self, index: &'a FilterIndex<R>) -> Option<(&'a K, &'a K)> {
        let low = self
            .visible_positions(index, self.order.iter().enumerate())
            .find(|position| self.keys[*position].is_bounded())?;
        let high = self
            .visible_positions(index, self.order.iter().enumerate().rev())
            .find(|position| self.keys[*position].is_bounded())?;
        Some((&self.keys[low], &self.keys[high]))
    }

    /// Detach the dimension from the index, releasing its filter bit.
    ///
    /// Records excluded only by this dimension become visible again.
    pub fn dispose<R>(mut self, index: &mut FilterIndex<R>) {
        self.filter_all(index);
        index.release_bit(self.bit);
    }

    fn visible_positions<'a, R>(
        &'a self,
        index: &'a FilterIndex<R>,
        positions: impl Iterator<Item = (usize, &'a u32)> + 'a,
    ) -> impl Iterator<Item = usize> + 'a {
        positions
            .filter(move |(_, record)| index.is_visible(**record))
            .map(|(position, _)| position)
    }

    fn select_run<R>(&mut self, index: &mut FilterIndex<R>, next: Range<usize>) {
        debug_assert_eq!(self.index_id, index.id(), "dimension from another index");
        let (entered, exited) = match &self.selection {
            Selection::Run(current) => {
                let entered = self.records_in(run_difference(&next, current));
                let exited = self.records_in(run_difference(current, &next));
                (entered, exited)
            }
            Selection::Scattered => {
                let mut entered = Vec::new();
                let mut exited = Vec::new();
                for (position, &record) in self.order.iter().enumerate() {
                    let was = index.passes(record, self.bit);
                    let now = next.contains(&position);
                    if now && !was {
                        entered.push(record);
                    } else if was && !now {
                        exited.push(record);
                    }
                }
                (entered, exited)
            }
        };
        self.selection = Selection::Run(next);
        index.apply_change(self.bit, &entered, &exited);
    }

    fn records_in(&self, runs: [Range<usize>; 2]) -> Vec<u32> {
        runs.into_iter()
            .flat_map(|run| self.order[run].iter().copied())
            .collect()
    }

    fn lower_bound(&self, target: &K) -> usize {
        self.keys
            .partition_point(|key| key.cmp_key(target) == Ordering::Less)
    }

    fn upper_bound(&self, target: &K) -> usize {
        self.keys
            .partition_point(|key| key.cmp_key(target) != Ordering::Greater)
    }
}

/// Positions in `from` that are not in `to`, as at most two runs.
fn run_difference(from: &Range<usize>, to: &Range<usize>) -> [Range<usize>; 2] {
    if to.start >= to.end {
        return [from.clone(), 0..0];
    }
    let below = from.start..from.end.min(to.start).max(from.start);
    let above = from.start.max(to.end).min(from.end)..from.end;
    [below, above]
}
