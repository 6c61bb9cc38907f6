//! The binned GC/coverage scatter: filter state, bucket grid and projection.
//!
//! [`BinScatter`] wires the pieces together. It owns the sample index with one
//! dimension per filterable field plus the bucket dimension and its group, and
//! it rebuilds the bucket grid whenever the rebinning controller asks for it.
//! Range and exact filters touch only the samples whose visibility flips.
//! A query walks every bucket key of the current grid, skipping empty ones,
//! and scans the GC dimension from both ends for the visible extremes.

use std::collections::BTreeSet;

use crate::bucket::{BucketKey, BucketReducer};
use crate::color::{Color, ColorMap};
use crate::config::ScatterConfig;
use crate::error::Result;
use crate::index::{Dimension, FilterIndex, GroupId};
use crate::projector::{AggregateProjector, ScatterPoint, SummarySink, SummaryStats};
use crate::rebin::{RebinController, Resolution};
use crate::sample::{BinId, Sample, TaxonomyId, TaxonomySet};
use crate::view::{DataBounds, Range, ViewDomain};

/// User-facing filter state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    /// Visible window; `None` when fully zoomed out.
    pub domain: Option<ViewDomain>,
    /// Bin picked in the bin list.
    pub selected_bin: Option<BinId>,
    /// The bin filter only applies while this is on.
    pub bin_view: bool,
    /// Only samples carrying this taxonomy are shown.
    pub selected_taxonomy: Option<TaxonomyId>,
    /// Samples carrying any of these taxonomies are hidden.
    pub excluded_taxonomies: BTreeSet<TaxonomyId>,
}

/// The bucket dimension together with the group reducing it.
#[derive(Debug)]
struct BucketGrid {
    dimension: Dimension<BucketKey>,
    group: GroupId<BucketKey, BucketReducer>,
}

impl BucketGrid {
    fn build(
        index: &mut FilterIndex<Sample>,
        resolution: Resolution,
        reducer: BucketReducer,
    ) -> Self {
        let dimension = index.dimension(move |sample| resolution.key(sample));
        let group = index.group(&dimension, reducer);
        Self { dimension, group }
    }

    fn dispose(self, index: &mut FilterIndex<Sample>) {
        index.remove_group(self.group);
        self.dimension.dispose(index);
    }
}

/// Binned scatter over a set of samples.
///
/// ```
/// use ubin_plot::{BinScatter, DiscardSummary, Sample};
///
/// let mut scatter = BinScatter::new(vec![
///     Sample::new(41.0, 100.0, 1000.0),
///     Sample::new(42.0, 120.0, 2000.0),
/// ]);
/// let points = scatter.query(&mut DiscardSummary);
/// assert_eq!(points.len(), 1);
/// ```
#[derive(Debug)]
pub struct BinScatter {
    config: ScatterConfig,
    colors: ColorMap,
    unbinned: Color,
    index: FilterIndex<Sample>,
    gc: Dimension<f64>,
    coverage: Dimension<f64>,
    bin: Dimension<Option<BinId>>,
    taxonomy: Dimension<TaxonomySet>,
    grid: BucketGrid,
    controller: RebinController,
    projector: AggregateProjector,
    filters: FilterState,
    summary: SummaryStats,
    generation: u64,
}

impl BinScatter {
    /// Create a scatter with the default configuration and palette.
    pub fn new(samples: Vec<Sample>) -> Self {
        Self::assemble(samples, ScatterConfig::default(), ColorMap::default())
    }

    /// Create a scatter with a validated configuration.
    pub fn with_config(
        samples: Vec<Sample>,
        config: ScatterConfig,
        colors: ColorMap,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(samples, config, colors))
    }

    /// Start building a scatter.
    pub fn builder() -> BinScatterBuilder {
        BinScatterBuilder::default()
    }

    fn assemble(samples: Vec<Sample>, config: ScatterConfig, colors: ColorMap) -> Self {
        let unbinned = config
            .unbinned_color()
            .unwrap_or_else(|_| Color::from_rgb8(0x45, 0x5a, 0x64));
        let mut index = FilterIndex::new(samples);
        let gc = index.dimension(|sample| sample.gc);
        let coverage = index.dimension(|sample| sample.coverage);
        let bin = index.dimension(|sample| sample.bin);
        let taxonomy = index.dimension(|sample| sample.taxonomies.clone());
        let controller = RebinController::new(config.clone());
        let grid = BucketGrid::build(
            &mut index,
            controller.resolution(),
            BucketReducer::new(colors.clone(), unbinned),
        );
        tracing::debug!(samples = index.len(), "scatter index built");
        Self {
            projector: AggregateProjector::new(config.size_scale),
            config,
            colors,
            unbinned,
            index,
            gc,
            coverage,
            bin,
            taxonomy,
            grid,
            controller,
            filters: FilterState::default(),
            summary: SummaryStats::default(),
            generation: 0,
        }
    }

    /// Replace the dataset.
    ///
    /// Every dimension and the bucket grid are rebuilt; the current filters
    /// are re-applied to the new samples.
    pub fn load(&mut self, samples: Vec<Sample>) {
        let filters = std::mem::take(&mut self.filters);
        let mut fresh = Self::assemble(samples, self.config.clone(), self.colors.clone());
        fresh.projector = std::mem::take(&mut self.projector);
        fresh.summary = self.summary;
        fresh.generation = self.generation.wrapping_add(1);
        *self = fresh;
        self.apply_filters(filters);
    }

    /// Set every filter at once.
    pub fn apply_filters(&mut self, filters: FilterState) {
        self.filters = filters;
        self.apply_domain();
        self.apply_bin();
        self.apply_taxonomies();
        self.rebin();
    }

    /// Configuration in use.
    pub fn config(&self) -> &ScatterConfig {
        &self.config
    }

    /// Current filter state.
    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// All samples, visible or not.
    pub fn samples(&self) -> &[Sample] {
        self.index.records()
    }

    /// Number of samples passing every filter.
    pub fn visible_len(&self) -> usize {
        self.index.visible_len()
    }

    /// Bucket grid in effect.
    pub fn resolution(&self) -> Resolution {
        self.controller.resolution()
    }

    /// Counter bumped on every bucket grid rebuild.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Summary from the last query.
    pub fn summary(&self) -> SummaryStats {
        self.summary
    }

    /// Set the visible window. `None` zooms fully out.
    ///
    /// Each axis keeps samples with `min <= value < max`.
    pub fn set_domain(&mut self, domain: Option<ViewDomain>) {
        self.filters.domain = domain.filter(|domain| !domain.is_empty());
        self.apply_domain();
        self.rebin();
    }

    /// Set the GC window only.
    pub fn set_domain_x(&mut self, x: Option<Range>) {
        let mut domain = self.filters.domain.unwrap_or_default();
        domain.x = x;
        self.set_domain(Some(domain));
    }

    /// Set the coverage window only.
    pub fn set_domain_y(&mut self, y: Option<Range>) {
        let mut domain = self.filters.domain.unwrap_or_default();
        domain.y = y;
        self.set_domain(Some(domain));
    }

    /// Pick a bin; it filters only while bin view is on.
    pub fn set_selected_bin(&mut self, bin: Option<BinId>) {
        self.filters.selected_bin = bin;
        self.apply_bin();
    }

    /// Toggle bin view.
    pub fn set_bin_view(&mut self, enabled: bool) {
        self.filters.bin_view = enabled;
        self.apply_bin();
    }

    /// Show only samples carrying `taxonomy`.
    pub fn set_selected_taxonomy(&mut self, taxonomy: Option<TaxonomyId>) {
        self.filters.selected_taxonomy = taxonomy;
        self.apply_taxonomies();
    }

    /// Replace the set of hidden taxonomies.
    pub fn set_excluded_taxonomies(&mut self, taxonomies: impl IntoIterator<Item = TaxonomyId>) {
        self.filters.excluded_taxonomies = taxonomies.into_iter().collect();
        self.apply_taxonomies();
    }

    /// Hide one more taxonomy.
    pub fn add_excluded_taxonomy(&mut self, taxonomy: TaxonomyId) {
        if self.filters.excluded_taxonomies.insert(taxonomy) {
            self.apply_taxonomies();
        }
    }

    /// Clear the GC window.
    pub fn reset_gc(&mut self) {
        self.set_domain_x(None);
    }

    /// Clear the coverage window.
    pub fn reset_coverage(&mut self) {
        self.set_domain_y(None);
    }

    /// Clear the bin selection and leave bin view.
    pub fn reset_bin(&mut self) {
        self.filters.selected_bin = None;
        self.filters.bin_view = false;
        self.apply_bin();
    }

    /// Clear the taxonomy selection and exclusions.
    pub fn reset_taxonomies(&mut self) {
        self.filters.selected_taxonomy = None;
        self.filters.excluded_taxonomies.clear();
        self.apply_taxonomies();
    }

    /// Clear every filter.
    pub fn reset_filters(&mut self) {
        self.apply_filters(FilterState::default());
    }

    /// GC and coverage extents of the whole dataset, ignoring filters.
    ///
    /// Falls back to the configured domain when there is no finite sample.
    pub fn data_bounds(&self) -> DataBounds {
        let fallback = self.config.fallback_domain;
        DataBounds {
            x: finite_extent(self.gc.keys()).unwrap_or(fallback.x),
            y: finite_extent(self.coverage.keys()).unwrap_or(fallback.y),
        }
    }

    /// Project the visible buckets into points.
    ///
    /// Summary values that changed since the last query are pushed to `sink`.
    pub fn query(&mut self, sink: &mut impl SummarySink) -> Vec<ScatterPoint> {
        let gc_extent = self.gc.extent(&self.index).map(|(low, high)| (*low, *high));
        let buckets = self.index.group_buckets(&self.grid.group);
        let aggregates = buckets.into_iter().flat_map(|group| group.all().map(|(_, acc)| acc));
        let (points, summary) = self.projector.project(aggregates, gc_extent, sink);
        tracing::trace!(points = points.len(), "scatter query");
        self.summary = summary;
        points
    }

    fn apply_domain(&mut self) {
        let domain = self.filters.domain.unwrap_or_default();
        match domain.x {
            Some(x) => self.gc.filter_range(&mut self.index, x.min, x.max),
            None => self.gc.filter_all(&mut self.index),
        }
        match domain.y {
            Some(y) => self.coverage.filter_range(&mut self.index, y.min, y.max),
            None => self.coverage.filter_all(&mut self.index),
        }
    }

    fn apply_bin(&mut self) {
        match self.filters.selected_bin {
            Some(bin) if self.filters.bin_view => self.bin.filter_exact(&mut self.index, Some(bin)),
            _ => self.bin.filter_all(&mut self.index),
        }
    }

    fn apply_taxonomies(&mut self) {
        let selected = self.filters.selected_taxonomy;
        let excluded = &self.filters.excluded_taxonomies;
        if selected.is_none() && excluded.is_empty() {
            self.taxonomy.filter_all(&mut self.index);
            return;
        }
        self.taxonomy.filter_fn(&mut self.index, |taxonomies| {
            selected.is_none_or(|taxonomy| taxonomies.contains(taxonomy))
                && !taxonomies.contains_any(excluded)
        });
    }

    fn rebin(&mut self) {
        let Some(resolution) = self.controller.observe(self.filters.domain.as_ref()) else {
            return;
        };
        let reducer = BucketReducer::new(self.colors.clone(), self.unbinned);
        let grid = BucketGrid::build(&mut self.index, resolution, reducer);
        std::mem::replace(&mut self.grid, grid).dispose(&mut self.index);
        self.generation = self.generation.wrapping_add(1);
        tracing::debug!(?resolution, generation = self.generation, "bucket grid rebuilt");
    }
}

fn finite_extent(sorted: &[f64]) -> Option<Range> {
    let low = sorted.iter().copied().find(|value| value.is_finite())?;
    let high = sorted.iter().copied().rfind(|value| value.is_finite())?;
    Some(Range::new(low, high))
}

/// Builder for configuring a scatter before construction.
#[derive(Debug, Default)]
pub struct BinScatterBuilder {
    config: ScatterConfig,
    colors: ColorMap,
    samples: Vec<Sample>,
}

impl BinScatterBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: ScatterConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the bin palette.
    pub fn colors(mut self, colors: ColorMap) -> Self {
        self.colors = colors;
        self
    }

    /// Set the samples.
    pub fn samples(mut self, samples: Vec<Sample>) -> Self {
        self.samples = samples;
        self
    }

    /// Validate the configuration and build the scatter.
    pub fn build(self) -> Result<BinScatter> {
        BinScatter::with_config(self.samples, self.config, self.colors)
    }
}
