//! Palette maintenance for the map images: which flat colors an image uses,
//! how a redrawn map differs from the old one, and which mappings point at
//! colors that no longer exist.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::raster::RasterBuffer;
use crate::registry::{ColorMapping, ColorRegistry};
use crate::rgb::Rgb;

/// A redrawn map with this many times more colors than the old one is
/// almost certainly anti-aliased, which defeats exact color matching.
const ANTIALIAS_RATIO: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorCount {
    pub color: Rgb,
    pub pixels: u64,
}

fn is_background(color: Rgb) -> bool {
    color.is_near_white() || color.is_near_black()
}

/// Unique colors and their pixel counts, most common first. Background white
/// and border black are skipped.
pub fn census(buffer: &RasterBuffer) -> Vec<ColorCount> {
    let mut counts: HashMap<Rgb, u64> = HashMap::new();
    for color in buffer.iter_rgb().filter(|c| !is_background(*c)) {
        *counts.entry(color).or_insert(0) += 1;
    }
    let mut out: Vec<ColorCount> = counts
        .into_iter()
        .map(|(color, pixels)| ColorCount { color, pixels })
        .collect();
    out.sort_by(|a, b| b.pixels.cmp(&a.pixels).then(a.color.cmp(&b.color)));
    out
}

fn color_set(buffer: &RasterBuffer) -> BTreeSet<Rgb> {
    buffer.iter_rgb().filter(|c| !is_background(*c)).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteDiff {
    /// In both images; mappings for these survive a map swap.
    pub preserved: Vec<Rgb>,
    /// Only in the old image; mappings for these are lost.
    pub lost: Vec<Rgb>,
    pub added: Vec<Rgb>,
}

impl PaletteDiff {
    /// Share of the old palette still present, in percent.
    pub fn preservation_rate(&self) -> f64 {
        let old = self.preserved.len() + self.lost.len();
        if old == 0 {
            return 0.0;
        }
        self.preserved.len() as f64 / old as f64 * 100.0
    }

    pub fn looks_antialiased(&self) -> bool {
        let old = self.preserved.len() + self.lost.len();
        let new = self.preserved.len() + self.added.len();
        new > old * ANTIALIAS_RATIO
    }
}

/// Compare the palettes of an old and a redrawn map. Lists are sorted.
pub fn compare(old: &RasterBuffer, new: &RasterBuffer) -> PaletteDiff {
    let old = color_set(old);
    let new = color_set(new);
    PaletteDiff {
        preserved: old.intersection(&new).copied().collect(),
        lost: old.difference(&new).copied().collect(),
        added: new.difference(&old).copied().collect(),
    }
}

/// Mappings whose color does not appear anywhere in `buffer`.
pub fn stale_mappings<'a>(
    registry: &'a ColorRegistry,
    buffer: &RasterBuffer,
) -> Vec<&'a ColorMapping> {
    let present: BTreeSet<Rgb> = buffer.iter_rgb().collect();
    registry
        .mappings()
        .iter()
        .filter(|m| !present.contains(&m.color))
        .collect()
}

/// Image colors no mapping claims yet, most common first.
pub fn unmapped_colors(registry: &ColorRegistry, buffer: &RasterBuffer) -> Vec<ColorCount> {
    census(buffer)
        .into_iter()
        .filter(|entry| registry.lookup_by_color(entry.color).is_empty())
        .collect()
}
