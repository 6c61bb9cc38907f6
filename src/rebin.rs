//! Adaptive rebinning: which bucket grid to use for the current zoom.
//!
//! Zoomed out, samples are snapped to a fixed coarse grid so the bubble count
//! stays bounded. Zoomed in, GC is kept exact and coverage is snapped to a
//! granularity derived from the visible coverage span, floored so that float
//! noise cannot explode the bucket count.

use crate::bucket::BucketKey;
use crate::config::ScatterConfig;
use crate::sample::Sample;
use crate::view::ViewDomain;

/// Bucket grid in effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Fixed grid used when fully zoomed out.
    Coarse {
        /// GC cell width.
        gc_step: f64,
        /// Coverage cell height.
        coverage_step: f64,
    },
    /// Exact GC, coverage rounded up to a multiple of `granularity`.
    Dynamic {
        /// Coverage granularity.
        granularity: f64,
    },
}

impl Resolution {
    /// Coarse grid from the configuration.
    pub fn coarse(config: &ScatterConfig) -> Self {
        Self::Coarse {
            gc_step: config.coarse_gc_step,
            coverage_step: config.coarse_coverage_step,
        }
    }

    /// Bucket key of a sample under this grid.
    pub fn key(&self, sample: &Sample) -> BucketKey {
        match *self {
            Self::Coarse {
                gc_step,
                coverage_step,
            } => BucketKey {
                gc: snap(sample.gc, gc_step),
                coverage: snap(sample.coverage, coverage_step),
                bin: sample.bin,
            },
            Self::Dynamic { granularity } => BucketKey {
                gc: sample.gc,
                coverage: round_up_to(sample.coverage, granularity),
                bin: sample.bin,
            },
        }
    }

    /// Check for the zoomed-out grid.
    pub fn is_coarse(&self) -> bool {
        matches!(self, Self::Coarse { .. })
    }
}

/// Round to the nearest multiple of `step`, halves towards positive infinity.
fn snap(value: f64, step: f64) -> f64 {
    round_half_up(value / step) * step
}

/// Next multiple of `step` at or above `value`, to one decimal.
fn round_up_to(value: f64, step: f64) -> f64 {
    round_half_up((value / step).ceil() * step * 10.0) / 10.0
}

fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Coverage granularity for a visible coverage span.
pub fn granularity_for_span(span: f64, config: &ScatterConfig) -> f64 {
    let granularity = round_half_up(span.abs() / config.granularity_divisor);
    if granularity > config.min_granularity {
        granularity
    } else {
        config.min_granularity
    }
}

/// Decides when the bucket grid has to be rebuilt.
///
/// Rebuilding touches every sample, so the controller only asks for it when
/// the visible coverage span actually changed, or once when leaving the
/// zoomed state.
#[derive(Debug, Clone)]
pub struct RebinController {
    config: ScatterConfig,
    resolution: Resolution,
    current_span: Option<f64>,
    allow_coarse: bool,
}

impl RebinController {
    /// Start in the coarse grid.
    pub fn new(config: ScatterConfig) -> Self {
        Self {
            resolution: Resolution::coarse(&config),
            config,
            current_span: None,
            allow_coarse: true,
        }
    }

    /// Grid currently in effect.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Observe the view domain; returns the new grid if a rebuild is needed.
    pub fn observe(&mut self, domain: Option<&ViewDomain>) -> Option<Resolution> {
        let zoomed = domain.and_then(|domain| Some((domain.x?, domain.y?)));
        match zoomed {
            Some((_, y)) => {
                let span = y.span().abs();
                if self.current_span == Some(span) {
                    return None;
                }
                let granularity = granularity_for_span(span, &self.config);
                tracing::debug!(span, granularity, "switching to dynamic bucket grid");
                self.current_span = Some(span);
                self.allow_coarse = true;
                self.resolution = Resolution::Dynamic { granularity };
                Some(self.resolution)
            }
            None if self.allow_coarse && self.current_span.is_some() => {
                tracing::debug!("switching to coarse bucket grid");
                self.current_span = None;
                self.allow_coarse = false;
                self.resolution = Resolution::coarse(&self.config);
                Some(self.resolution)
            }
            None => None,
        }
    }
}
