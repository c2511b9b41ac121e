use crate::registry::ColorMapping;
use crate::rgb::Rgb;

const MADRAS: &str = "Madras Presidency";
const BOMBAY: &str = "Bombay Presidency";
const BENGAL: &str = "Bengal Presidency";

/// Stock presidency mappings: fill and border per presidency, plus the fill,
/// stripe and boundary of the districts annexed into Madras.
pub fn presidency_defaults() -> Vec<ColorMapping> {
    [
        (MADRAS, Rgb::new(255, 200, 180)),
        (MADRAS, Rgb::new(200, 120, 100)),
        // Arcot
        (MADRAS, Rgb::new(0, 190, 180)),
        (MADRAS, Rgb::new(0, 140, 130)),
        (MADRAS, Rgb::new(0, 100, 95)),
        // Madurai
        (MADRAS, Rgb::new(220, 120, 50)),
        (MADRAS, Rgb::new(170, 85, 30)),
        (MADRAS, Rgb::new(160, 80, 30)),
        // Sivagangai / Ramnad
        (MADRAS, Rgb::new(50, 140, 220)),
        (MADRAS, Rgb::new(30, 100, 170)),
        (MADRAS, Rgb::new(30, 90, 160)),
        (BOMBAY, Rgb::new(180, 210, 255)),
        (BOMBAY, Rgb::new(100, 130, 200)),
        (BENGAL, Rgb::new(180, 240, 190)),
        (BENGAL, Rgb::new(100, 180, 110)),
    ]
    .into_iter()
    .map(|(region, color)| ColorMapping {
        region: region.to_owned(),
        color,
    })
    .collect()
}
