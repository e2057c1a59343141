//! Turns a remaining-iteration count into a colour.
//!
//! Each channel is the count times that channel's factor, wrapped to a
//! byte.  The wrap is deliberate; it produces the banded look of the
//! renderer, and a clamp would flatten it.

use image::{Pixel as ImagePixel, Rgba};

use settings::Settings;

/// Per-channel multipliers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    red: i64,
    green: i64,
    blue: i64,
}

impl Palette {
    /// A palette with explicit channel factors.
    pub fn new(red: i64, green: i64, blue: i64) -> Self {
        Palette { red, green, blue }
    }

    /// The palette described by a settings record.
    pub fn from_settings(settings: &Settings) -> Self {
        Palette::new(
            settings.red_factor,
            settings.green_factor,
            settings.blue_factor,
        )
    }

    /// The opaque colour for a pixel with `remaining` iterations left.
    pub fn colour(&self, remaining: u32) -> Rgba<u8> {
        Rgba::from_channels(
            channel(remaining, self.red),
            channel(remaining, self.green),
            channel(remaining, self.blue),
            0xff,
        )
    }
}

/// `(remaining * factor) mod 256`, computed in wrapping byte arithmetic.
/// Truncating both operands first gives the same low byte as the full
/// product, negative factors included.
#[inline]
pub fn channel(remaining: u32, factor: i64) -> u8 {
    (remaining as u8).wrapping_mul(factor as u8)
}
