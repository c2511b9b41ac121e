use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// An opaque map color. Stored and exchanged as `"r,g,b"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorParseError {
    #[error("expected three comma-separated channels, got {0}")]
    ChannelCount(usize),
    #[error("invalid channel value {0:?} (expected 0-255)")]
    Channel(String),
}

/// Clamp a scaled channel back into byte range. Every scaling path goes
/// through here so brighten and dim can't drift apart.
pub fn clamp_channel(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.floor().clamp(0.0, 255.0) as u8
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Multiply every channel by `factor`, flooring and clamping to 0..=255.
    pub fn scale(self, factor: f64) -> Self {
        Self {
            r: clamp_channel(self.r as f64 * factor),
            g: clamp_channel(self.g as f64 * factor),
            b: clamp_channel(self.b as f64 * factor),
        }
    }

    pub fn is_black(self) -> bool {
        self == Self::BLACK
    }

    /// Background white as drawn by the map editors (anti-aliased edges included).
    pub fn is_near_white(self) -> bool {
        self.r > 250 && self.g > 250 && self.b > 250
    }

    pub fn is_near_black(self) -> bool {
        self.r < 5 && self.g < 5 && self.b < 5
    }

    pub fn max_channel(self) -> u8 {
        self.r.max(self.g).max(self.b)
    }

    /// Difference between the largest and smallest channel. Zero for grays.
    pub fn channel_spread(self) -> u8 {
        self.max_channel() - self.r.min(self.g).min(self.b)
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self { r, g, b }
    }
}

impl From<Rgb> for (u8, u8, u8) {
    fn from(c: Rgb) -> Self {
        (c.r, c.g, c.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(ColorParseError::ChannelCount(parts.len()));
        }
        let channel = |raw: &str| {
            raw.parse::<u8>()
                .map_err(|_| ColorParseError::Channel(raw.to_owned()))
        };
        Ok(Self {
            r: channel(parts[0])?,
            g: channel(parts[1])?,
            b: channel(parts[2])?,
        })
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
