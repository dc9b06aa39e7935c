// Color sources for series builders

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Supplies colors to series builders, one per call.
pub trait ColorSource {
    fn next_color(&mut self) -> Color;
}

/// Deterministic cycle through a fixed palette.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    colors: Vec<Color>,
    next: usize,
}

impl ColorPalette {
    /// The ten-color categorical palette (Tableau 10 / d3 category10).
    pub fn category10() -> Self {
        Self::new(vec![
            Color::rgb(0x1f, 0x77, 0xb4),
            Color::rgb(0xff, 0x7f, 0x0e),
            Color::rgb(0x2c, 0xa0, 0x2c),
            Color::rgb(0xd6, 0x27, 0x28),
            Color::rgb(0x94, 0x67, 0xbd),
            Color::rgb(0x8c, 0x56, 0x4b),
            Color::rgb(0xe3, 0x77, 0xc2),
            Color::rgb(0x7f, 0x7f, 0x7f),
            Color::rgb(0xbc, 0xbd, 0x22),
            Color::rgb(0x17, 0xbe, 0xcf),
        ])
    }

    /// An empty list falls back to `category10`.
    pub fn new(colors: Vec<Color>) -> Self {
        if colors.is_empty() {
            return Self::category10();
        }
        Self { colors, next: 0 }
    }
}

impl ColorSource for ColorPalette {
    fn next_color(&mut self) -> Color {
        let color = self.colors[self.next % self.colors.len()];
        self.next = (self.next + 1) % self.colors.len();
        color
    }
}

/// Uniformly random colors from a seedable generator.
#[derive(Debug, Clone)]
pub struct RandomColors {
    rng: StdRng,
}

impl RandomColors {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl ColorSource for RandomColors {
    fn next_color(&mut self) -> Color {
        Color::rgb(self.rng.gen(), self.rng.gen(), self.rng.gen())
    }
}
