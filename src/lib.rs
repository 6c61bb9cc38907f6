//! ubin_plot is an incremental, filterable binned scatter of genomic samples.
//! Samples are bucketed on a GC/coverage grid that adapts to the zoom level,
//! and filter changes only touch the samples whose visibility flips.

#![forbid(unsafe_code)]

pub mod bucket;
pub mod color;
pub mod config;
pub mod error;
pub mod index;
pub mod projector;
pub mod rebin;
pub mod sample;
pub mod scatter;
pub mod view;

pub use bucket::{BucketAggregate, BucketKey, BucketReducer, BucketSummary};
pub use color::{Color, ColorMap};
pub use config::ScatterConfig;
pub use error::ConfigError;
pub use index::{Dimension, FilterIndex, Group, GroupId, Reducer, SortKey};
pub use projector::{
    AggregateProjector, DiscardSummary, ScatterPoint, SummaryChange, SummarySink, SummaryStats,
    size_scaling,
};
pub use rebin::{RebinController, Resolution, granularity_for_span};
pub use sample::{BinId, Sample, TaxonomyId, TaxonomySet};
pub use scatter::{BinScatter, BinScatterBuilder, FilterState};
pub use view::{DataBounds, Range, ViewDomain};
