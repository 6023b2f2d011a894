//! RGBA colors.

use crate::{HeatmapError, HeatmapResult};
use serde::{Deserialize, Serialize};

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA` (the leading `#` is optional).
    /// Six-digit colors are fully opaque.
    pub fn from_hex(hex: &str) -> HeatmapResult<Self> {
        let digits = hex.trim().trim_start_matches('#');
        let invalid = || HeatmapError::InvalidColor(hex.to_string());

        if !digits.is_ascii() || (digits.len() != 6 && digits.len() != 8) {
            return Err(invalid());
        }

        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid());
        let a = if digits.len() == 8 { channel(6)? } else { 255 };

        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?, a))
    }

    /// Format as `#RRGGBBAA`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }

    /// Unpack from `0xRRGGBBAA`.
    pub const fn from_packed(value: u32) -> Self {
        Self {
            r: (value >> 24) as u8,
            g: (value >> 16) as u8,
            b: (value >> 8) as u8,
            a: value as u8,
        }
    }

    /// Pack into `0xRRGGBBAA`.
    pub const fn packed(&self) -> u32 {
        ((self.r as u32) << 24) | ((self.g as u32) << 16) | ((self.b as u32) << 8) | self.a as u32
    }

    /// Relative luminance (Rec. 709 weights), ignoring alpha.
    pub fn luminance(&self) -> f64 {
        0.2126 * self.r as f64 + 0.7152 * self.g as f64 + 0.0722 * self.b as f64
    }

    /// Linear interpolation towards `other`; `t` is clamped to `[0, 1]` and
    /// channels are rounded, so `t = 0` and `t = 1` return the endpoints.
    pub fn lerp(&self, other: Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;

        Color::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }

    /// Same color with alpha multiplied by `factor` (clamped to `[0, 1]`).
    pub fn with_alpha_scaled(&self, factor: f64) -> Color {
        let factor = factor.clamp(0.0, 1.0);
        Color {
            a: (self.a as f64 * factor).round() as u8,
            ..*self
        }
    }
}
