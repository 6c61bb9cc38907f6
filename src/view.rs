//! View domains and data ranges.

use serde::{Deserialize, Serialize};

/// Numeric range on one plot axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    /// Minimum value.
    pub min: f64,
    /// Maximum value.
    pub max: f64,
}

impl Range {
    /// Create a new range, swapping bounds if needed.
    pub fn new(mut min: f64, mut max: f64) -> Self {
        if min > max {
            std::mem::swap(&mut min, &mut max);
        }
        Self { min, max }
    }

    /// Span of the range.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Check whether both bounds are finite.
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Check whether the range has positive span and finite bounds.
    pub fn is_valid(&self) -> bool {
        self.is_finite() && self.span() > 0.0
    }

}

/// Visible window pushed by the brush on drag end.
///
/// A missing axis means that axis is unzoomed. The domain as a whole being
/// absent (`Option<ViewDomain>::None`) means the plot is fully zoomed out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewDomain {
    /// GC window.
    pub x: Option<Range>,
    /// Coverage window.
    pub y: Option<Range>,
}

impl ViewDomain {
    /// Create a domain with both axes zoomed.
    pub fn new(x: Range, y: Range) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
        }
    }

    /// Neither axis is zoomed.
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none()
    }
}

/// Extents of the loaded data on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataBounds {
    /// GC extent.
    pub x: Range,
    /// Coverage extent.
    pub y: Range,
}

impl DataBounds {
    /// Create bounds from X and Y ranges.
    pub fn new(x: Range, y: Range) -> Self {
        Self { x, y }
    }

    /// Check whether both axes are valid.
    pub fn is_valid(&self) -> bool {
        self.x.is_valid() && self.y.is_valid()
    }
}
