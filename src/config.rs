//! Binning and projection settings.

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{ConfigError, Result};
use crate::view::{DataBounds, Range};

/// Configuration for a [`BinScatter`](crate::scatter::BinScatter).
///
/// Every field has a default, so a partial JSON document is enough to
/// override individual settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterConfig {
    /// GC cell width of the coarse grid.
    pub coarse_gc_step: f64,
    /// Coverage cell height of the coarse grid.
    pub coarse_coverage_step: f64,
    /// Visible coverage span is divided by this to get the zoomed granularity.
    pub granularity_divisor: f64,
    /// Lower bound for the zoomed coverage granularity.
    pub min_granularity: f64,
    /// Numerator of the bubble size scaling factor.
    pub size_scale: f64,
    /// Color of buckets whose first member has no bin.
    pub unbinned_color: String,
    /// Domain reported by `data_bounds` for an empty dataset.
    pub fallback_domain: DataBounds,
}

impl Default for ScatterConfig {
    fn default() -> Self {
        Self {
            coarse_gc_step: 2.0,
            coarse_coverage_step: 50.0,
            granularity_divisor: 100.0,
            min_granularity: 10.0,
            size_scale: 20.0,
            unbinned_color: "#455a64".to_owned(),
            fallback_domain: DataBounds::new(Range::new(0.0, 100.0), Range::new(0.0, 8000.0)),
        }
    }
}

impl ScatterConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every setting.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("coarse_gc_step", self.coarse_gc_step),
            ("coarse_coverage_step", self.coarse_coverage_step),
            ("granularity_divisor", self.granularity_divisor),
            ("min_granularity", self.min_granularity),
            ("size_scale", self.size_scale),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        self.unbinned_color()?;
        if !self.fallback_domain.is_valid() {
            return Err(ConfigError::InvalidDomain(format!(
                "{:?}",
                self.fallback_domain
            )));
        }
        Ok(())
    }

    /// Parsed unbinned color.
    pub fn unbinned_color(&self) -> Result<Color> {
        Color::from_hex(&self.unbinned_color)
            .ok_or_else(|| ConfigError::InvalidColor(self.unbinned_color.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ScatterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.unbinned_color().expect("valid color").to_hex(),
            "#455a64"
        );
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ScatterConfig::from_json_str(r#"{"min_granularity": 25}"#)
            .expect("valid config");
        assert_eq!(config.min_granularity, 25.0);
        assert_eq!(config.coarse_coverage_step, 50.0);
    }

    #[test]
    fn rejects_zero_step() {
        let err = ScatterConfig::from_json_str(r#"{"coarse_gc_step": 0}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NonPositive {
                name: "coarse_gc_step",
                ..
            }
        ));
    }

    #[test]
    fn rejects_bad_color_and_domain() {
        let err = ScatterConfig::from_json_str(r##"{"unbinned_color": "grey"}"##).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidColor(_)));

        let err = ScatterConfig::from_json_str(
            r#"{"fallback_domain": {"x": {"min": 1, "max": 1}, "y": {"min": 0, "max": 10}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDomain(_)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = ScatterConfig::from_json_str("{").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
