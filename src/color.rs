//! Colors and the bin-to-color mapping.

use std::fmt;
use std::sync::Arc;

use crate::sample::BinId;

/// RGBA color.
///
/// All components are expected to be in the 0.0..=1.0 range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    /// Red channel.
    pub r: f32,
    /// Green channel.
    pub g: f32,
    /// Blue channel.
    pub b: f32,
    /// Alpha channel.
    pub a: f32,
}

impl Color {
    /// Create a new color.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color from 8-bit channels.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            1.0,
        )
    }

    /// Parse `#rrggbb` (the leading `#` is optional).
    pub fn from_hex(text: &str) -> Option<Self> {
        let digits = text.strip_prefix('#').unwrap_or(text);
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |at: usize| u8::from_str_radix(&digits[at..at + 2], 16).ok();
        Some(Self::from_rgb8(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Format as `#rrggbb`, ignoring alpha.
    pub fn to_hex(&self) -> String {
        let byte = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", byte(self.r), byte(self.g), byte(self.b))
    }

    /// Opaque color from hue (degrees), saturation and value.
    fn from_hsv(hue: f32, saturation: f32, value: f32) -> Self {
        let hue = hue.rem_euclid(360.0) / 60.0;
        let chroma = value * saturation;
        let x = chroma * (1.0 - (hue % 2.0 - 1.0).abs());
        let (r, g, b) = match hue as u32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        let m = value - chroma;
        Self::new(r + m, g + m, b + m, 1.0)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Deterministic mapping from bin identifier to bubble color.
///
/// The mapping must be pure: the same id always yields the same color.
#[derive(Clone, Default)]
pub enum ColorMap {
    /// Golden-angle hue walk over the bin id.
    #[default]
    Default,
    /// Custom mapping callback.
    Custom(Arc<dyn Fn(BinId) -> Color + Send + Sync>),
}

impl ColorMap {
    /// Wrap a custom mapping function.
    pub fn custom(map: impl Fn(BinId) -> Color + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(map))
    }

    /// Color for a bin.
    pub fn color(&self, bin: BinId) -> Color {
        match self {
            Self::Default => {
                const GOLDEN_ANGLE: f32 = 137.507_77;
                let hue = (bin.0 as f32 * GOLDEN_ANGLE) % 360.0;
                Color::from_hsv(hue, 0.65, 0.85)
            }
            Self::Custom(map) => map(bin),
        }
    }
}

impl fmt::Debug for ColorMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("ColorMap::Default"),
            Self::Custom(_) => f.write_str("ColorMap::Custom(..)"),
        }
    }
}
