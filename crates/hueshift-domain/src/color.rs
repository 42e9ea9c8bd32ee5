//! Color module - the fixed hue ramp used for role color rotation

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Asset;

/// An opaque RGB color value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Color {
    /// Create a color from its channels
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Packed `0xRRGGBB` value, the representation remote APIs expect
    ///
    /// # Examples
    ///
    /// ```
    /// use hueshift_domain::Color;
    ///
    /// assert_eq!(Color::rgb(255, 0, 0).value(), 0xFF0000);
    /// ```
    pub fn value(&self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// The closed, ordered color set: a full turn of the hue wheel in 36 steps.
///
/// Starts at pure red, passes yellow, green, cyan, blue and magenta, and ends
/// one step short of red so that wrapping around is seamless.
pub const HUE_RAMP: [Color; 36] = [
    Color::rgb(255, 0, 0),
    Color::rgb(255, 42, 0),
    Color::rgb(255, 85, 0),
    Color::rgb(255, 128, 0),
    Color::rgb(255, 170, 0),
    Color::rgb(255, 212, 0),
    Color::rgb(255, 255, 0),
    Color::rgb(212, 255, 0),
    Color::rgb(170, 255, 0),
    Color::rgb(127, 255, 0),
    Color::rgb(85, 255, 0),
    Color::rgb(42, 255, 0),
    Color::rgb(0, 255, 0),
    Color::rgb(0, 255, 43),
    Color::rgb(0, 255, 85),
    Color::rgb(0, 255, 128),
    Color::rgb(0, 255, 170),
    Color::rgb(0, 255, 213),
    Color::rgb(0, 255, 255),
    Color::rgb(0, 212, 255),
    Color::rgb(0, 170, 255),
    Color::rgb(0, 127, 255),
    Color::rgb(0, 85, 255),
    Color::rgb(0, 42, 255),
    Color::rgb(0, 0, 255),
    Color::rgb(43, 0, 255),
    Color::rgb(85, 0, 255),
    Color::rgb(128, 0, 255),
    Color::rgb(170, 0, 255),
    Color::rgb(213, 0, 255),
    Color::rgb(255, 0, 255),
    Color::rgb(255, 0, 212),
    Color::rgb(255, 0, 170),
    Color::rgb(255, 0, 127),
    Color::rgb(255, 0, 85),
    Color::rgb(255, 0, 42),
];

/// The hue ramp as pool items, in ramp order
pub fn hue_ramp() -> Vec<Asset> {
    HUE_RAMP.iter().copied().map(Asset::Color).collect()
}
