//! Projection of bucket aggregates into plot points and summary statistics.

use crate::bucket::BucketAggregate;
use crate::color::Color;

/// A bubble ready for plotting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterPoint {
    /// Mean GC of the bucket.
    pub gc: f64,
    /// Mean coverage of the bucket.
    pub coverage: f64,
    /// Bubble size, omitted when the visible GC extremes are degenerate.
    pub size: Option<f64>,
    /// Bubble color.
    pub color: Option<Color>,
}

/// Whole-view statistics over the visible samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SummaryStats {
    /// Total length of visible samples.
    pub total_length: f64,
    /// Mean GC over visible samples.
    pub mean_gc: f64,
    /// Mean coverage over visible samples.
    pub mean_coverage: f64,
}

/// Receiver of summary statistic changes.
///
/// Each method fires at most once per query, and only when the value differs
/// from the one previously pushed.
pub trait SummarySink {
    /// Total visible length changed.
    fn total_length_changed(&mut self, total_length: f64);
    /// Mean visible GC changed.
    fn mean_gc_changed(&mut self, mean_gc: f64);
    /// Mean visible coverage changed.
    fn mean_coverage_changed(&mut self, mean_coverage: f64);
}

/// A single summary notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SummaryChange {
    /// See [`SummarySink::total_length_changed`].
    TotalLength(f64),
    /// See [`SummarySink::mean_gc_changed`].
    MeanGc(f64),
    /// See [`SummarySink::mean_coverage_changed`].
    MeanCoverage(f64),
}

impl SummarySink for Vec<SummaryChange> {
    fn total_length_changed(&mut self, total_length: f64) {
        self.push(SummaryChange::TotalLength(total_length));
    }

    fn mean_gc_changed(&mut self, mean_gc: f64) {
        self.push(SummaryChange::MeanGc(mean_gc));
    }

    fn mean_coverage_changed(&mut self, mean_coverage: f64) {
        self.push(SummaryChange::MeanCoverage(mean_coverage));
    }
}

/// Sink that drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSummary;

impl SummarySink for DiscardSummary {
    fn total_length_changed(&mut self, _: f64) {}
    fn mean_gc_changed(&mut self, _: f64) {}
    fn mean_coverage_changed(&mut self, _: f64) {}
}

/// Size factor from the visible GC extremes.
///
/// Returns `None` unless there are two distinct extremes with a positive,
/// finite radicand.
pub fn size_scaling(size_scale: f64, gc_extent: Option<(f64, f64)>) -> Option<f64> {
    let (min_gc, max_gc) = gc_extent?;
    let radicand = max_gc * max_gc - min_gc * min_gc;
    if !(radicand.is_finite() && radicand > 0.0) {
        return None;
    }
    let scaling = size_scale / radicand.sqrt();
    scaling.is_finite().then_some(scaling)
}

/// Turns buckets into points and keeps the last pushed summary values.
#[derive(Debug, Clone, Default)]
pub struct AggregateProjector {
    size_scale: f64,
    last_total_length: Option<f64>,
    last_mean_gc: Option<f64>,
    last_mean_coverage: Option<f64>,
}

impl AggregateProjector {
    /// Create a projector; `size_scale` is the numerator of the size factor.
    pub fn new(size_scale: f64) -> Self {
        Self {
            size_scale,
            ..Self::default()
        }
    }

    /// Project buckets into points and push changed summary values.
    ///
    /// Buckets with no members are skipped.
    pub fn project<'a>(
        &mut self,
        buckets: impl IntoIterator<Item = &'a BucketAggregate>,
        gc_extent: Option<(f64, f64)>,
        sink: &mut impl SummarySink,
    ) -> (Vec<ScatterPoint>, SummaryStats) {
        let scaling = size_scaling(self.size_scale, gc_extent);
        let mut points = Vec::new();
        let mut total_length = 0.0;
        let mut sum_gc = 0.0;
        let mut sum_coverage = 0.0;
        let mut count = 0u64;
        for bucket in buckets {
            let Some(summary) = bucket.finalize() else {
                continue;
            };
            total_length += bucket.sum_length;
            sum_gc += bucket.sum_gc;
            sum_coverage += bucket.sum_coverage;
            count += u64::from(bucket.count);
            points.push(ScatterPoint {
                gc: summary.mean_gc,
                coverage: summary.mean_coverage,
                size: scaling.map(|scaling| summary.sum_length.ln() * scaling),
                color: summary.color,
            });
        }

        let stats = if count == 0 {
            SummaryStats::default()
        } else {
            SummaryStats {
                total_length,
                mean_gc: sum_gc / count as f64,
                mean_coverage: sum_coverage / count as f64,
            }
        };
        self.push(stats, sink);
        (points, stats)
    }

    fn push(&mut self, stats: SummaryStats, sink: &mut impl SummarySink) {
        if changed(&mut self.last_total_length, stats.total_length) {
            tracing::debug!(total_length = stats.total_length, "total length changed");
            sink.total_length_changed(stats.total_length);
        }
        if changed(&mut self.last_mean_gc, stats.mean_gc) {
            tracing::debug!(mean_gc = stats.mean_gc, "mean gc changed");
            sink.mean_gc_changed(stats.mean_gc);
        }
        if changed(&mut self.last_mean_coverage, stats.mean_coverage) {
            tracing::debug!(mean_coverage = stats.mean_coverage, "mean coverage changed");
            sink.mean_coverage_changed(stats.mean_coverage);
        }
    }
}

fn changed(last: &mut Option<f64>, value: f64) -> bool {
    if *last == Some(value) {
        return false;
    }
    *last = Some(value);
    true
}
