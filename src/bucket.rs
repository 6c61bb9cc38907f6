//! Bubble buckets: composite keys, per-bucket aggregates and their reducer.

use std::cmp::Ordering;

use crate::color::{Color, ColorMap};
use crate::index::{Reducer, SortKey};
use crate::sample::{BinId, Sample};

/// Grid cell a sample falls into, plus its bin.
///
/// The bin is part of the key so a bubble never mixes bins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketKey {
    /// GC cell (or exact GC when zoomed).
    pub gc: f64,
    /// Coverage cell.
    pub coverage: f64,
    /// Bin of the members.
    pub bin: Option<BinId>,
}

impl SortKey for BucketKey {
    fn cmp_key(&self, other: &Self) -> Ordering {
        self.gc
            .total_cmp(&other.gc)
            .then_with(|| self.coverage.total_cmp(&other.coverage))
            .then_with(|| self.bin.cmp_key(&other.bin))
    }
}

/// Running sums over the visible members of a bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BucketAggregate {
    /// Sum of member GC values.
    pub sum_gc: f64,
    /// Sum of member coverage values.
    pub sum_coverage: f64,
    /// Sum of member lengths.
    pub sum_length: f64,
    /// Number of visible members.
    pub count: u32,
    /// Color taken from the first member that ever entered the bucket.
    pub color: Option<Color>,
}

/// Finalized view of a non-empty bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketSummary {
    /// Mean GC of the members.
    pub mean_gc: f64,
    /// Mean coverage of the members.
    pub mean_coverage: f64,
    /// Number of members.
    pub count: u32,
    /// Total length of the members.
    pub sum_length: f64,
    /// Bubble color.
    pub color: Option<Color>,
}

impl BucketAggregate {
    /// Means and totals, or `None` for an empty bucket.
    pub fn finalize(&self) -> Option<BucketSummary> {
        if self.count == 0 {
            return None;
        }
        let count = f64::from(self.count);
        Some(BucketSummary {
            mean_gc: self.sum_gc / count,
            mean_coverage: self.sum_coverage / count,
            count: self.count,
            sum_length: self.sum_length,
            color: self.color,
        })
    }
}

/// Sums GC, coverage and length; colors a bucket once, by its first member.
///
/// Removing members never recolors the bucket.
#[derive(Debug, Clone)]
pub struct BucketReducer {
    colors: ColorMap,
    unbinned: Color,
}

impl BucketReducer {
    /// Create a reducer with a bin color map and the color for unbinned samples.
    pub fn new(colors: ColorMap, unbinned: Color) -> Self {
        Self { colors, unbinned }
    }
}

impl Reducer<Sample> for BucketReducer {
    type Acc = BucketAggregate;

    fn initial(&self) -> BucketAggregate {
        BucketAggregate::default()
    }

    fn add(&self, acc: &mut BucketAggregate, sample: &Sample) {
        acc.sum_gc += sample.gc;
        acc.sum_coverage += sample.coverage;
        acc.sum_length += sample.length;
        acc.count += 1;
        if acc.color.is_none() {
            acc.color = Some(match sample.bin {
                Some(bin) => self.colors.color(bin),
                None => self.unbinned,
            });
        }
    }

    fn remove(&self, acc: &mut BucketAggregate, sample: &Sample) {
        debug_assert!(acc.count > 0, "removing from an empty bucket");
        acc.sum_gc -= sample.gc;
        acc.sum_coverage -= sample.coverage;
        acc.sum_length -= sample.length;
        acc.count -= 1;
    }
}
