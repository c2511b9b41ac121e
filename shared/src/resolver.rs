use serde::{Deserialize, Serialize};

use crate::raster::RasterBuffer;
use crate::registry::ColorRegistry;
use crate::rgb::Rgb;

/// A click in on-screen (CSS pixel) coordinates relative to the displayed map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickPoint {
    pub x: f64,
    pub y: f64,
}

/// Size the map is currently displayed at, which differs from its native size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

/// A click whose color is owned by several regions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbiguousClick {
    pub color: Rgb,
    pub candidate_regions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    OutOfBounds,
    Unassigned(Rgb),
    Single(String),
    Ambiguous(AmbiguousClick),
}

/// Scale a display-space click to native pixel coordinates.
pub fn to_native(click: ClickPoint, display: DisplaySize, native: (u32, u32)) -> Option<(u32, u32)> {
    if !(display.width > 0.0 && display.height > 0.0) {
        return None;
    }
    let x = (click.x * native.0 as f64 / display.width).floor();
    let y = (click.y * native.1 as f64 / display.height).floor();
    if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
        return None;
    }
    if x >= native.0 as f64 || y >= native.1 as f64 {
        return None;
    }
    Some((x as u32, y as u32))
}

/// Hit-test a click against the pristine map. Callers must pass the
/// unmodified image so highlighting never changes what a click resolves to.
pub fn resolve(
    click: ClickPoint,
    display: DisplaySize,
    pristine: &RasterBuffer,
    registry: &ColorRegistry,
) -> Resolution {
    let Some((x, y)) = to_native(click, display, (pristine.width(), pristine.height())) else {
        return Resolution::OutOfBounds;
    };
    let Some(color) = pristine.pixel(x, y) else {
        return Resolution::OutOfBounds;
    };
    resolve_color(color, registry)
}

pub fn resolve_color(color: Rgb, registry: &ColorRegistry) -> Resolution {
    let mut regions = registry.lookup_by_color(color);
    match regions.len() {
        0 => Resolution::Unassigned(color),
        1 => Resolution::Single(regions.remove(0)),
        _ => Resolution::Ambiguous(AmbiguousClick {
            color,
            candidate_regions: regions,
        }),
    }
}
