//! Recolors a map so the selected regions stand out.
//!
//! Every render starts from the pristine image and writes a complete new
//! buffer. Nothing here ever reads a previously highlighted frame, so
//! repeated selections can't compound brightness changes.

use std::collections::HashSet;

use crate::raster::RasterBuffer;
use crate::registry::ColorRegistry;
use crate::rgb::Rgb;

/// What happens to pixels outside the target color set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Suppression {
    /// Targets are multiplied by `gain`, everything else by `attenuation`.
    BrightenDim { gain: f64, attenuation: f64 },
    /// Targets keep their color, everything else turns white.
    WhiteoutOutside,
}

/// Colors near black with little hue: unregistered shared trading posts.
///
/// The boundary is a tuning knob, not an exact registry match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DarkPostBand {
    pub max_channel: u8,
    pub max_spread: u8,
}

impl Default for DarkPostBand {
    fn default() -> Self {
        Self {
            max_channel: 60,
            max_spread: 20,
        }
    }
}

impl DarkPostBand {
    pub fn contains(&self, color: Rgb) -> bool {
        color.max_channel() <= self.max_channel && color.channel_spread() <= self.max_spread
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpecialCase {
    /// Target pixels with one of these colors are cut out as pure white.
    /// Takes precedence over brightening.
    AnnexedWhiteout(&'static [Rgb]),
    /// Pure black borders survive suppression.
    PreserveBlackBorders,
    /// Pixels in the band survive suppression.
    PreserveDarkPosts(DarkPostBand),
    /// Paint a filled disc around every target pixel so tiny markers stay visible.
    EnlargeMarkers { radius: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct HighlightPolicy {
    pub suppression: Suppression,
    pub special_cases: Vec<SpecialCase>,
}

struct PixelRules<'a> {
    suppression: Suppression,
    targets: &'a HashSet<Rgb>,
    annexed: HashSet<Rgb>,
    keep_black: bool,
    dark_posts: Option<DarkPostBand>,
}

impl PixelRules<'_> {
    fn apply(&self, color: Rgb) -> Rgb {
        let selected = self.targets.contains(&color);
        if selected && self.annexed.contains(&color) {
            return Rgb::WHITE;
        }
        match self.suppression {
            Suppression::BrightenDim { gain, attenuation } => {
                if selected {
                    color.scale(gain)
                } else {
                    color.scale(attenuation)
                }
            }
            Suppression::WhiteoutOutside => {
                let preserved = (self.keep_black && color.is_black())
                    || self.dark_posts.is_some_and(|band| band.contains(color));
                if selected || preserved {
                    color
                } else {
                    Rgb::WHITE
                }
            }
        }
    }
}

/// Recompute the displayed map for `targets`. An empty target list returns
/// an exact copy of `pristine`.
pub fn render<S: AsRef<str>>(
    policy: &HighlightPolicy,
    pristine: &RasterBuffer,
    registry: &ColorRegistry,
    targets: &[S],
) -> RasterBuffer {
    if targets.is_empty() {
        return pristine.clone();
    }
    let target_colors = registry.target_colors(targets);
    render_colors(policy, pristine, &target_colors)
}

/// Same as [`render`] for an already-resolved target color set.
pub fn render_colors(
    policy: &HighlightPolicy,
    pristine: &RasterBuffer,
    target_colors: &HashSet<Rgb>,
) -> RasterBuffer {
    let mut rules = PixelRules {
        suppression: policy.suppression,
        targets: target_colors,
        annexed: HashSet::new(),
        keep_black: false,
        dark_posts: None,
    };
    let mut marker_radius = None;
    for case in &policy.special_cases {
        match case {
            SpecialCase::AnnexedWhiteout(colors) => {
                rules.annexed.extend(colors.iter().copied());
            }
            SpecialCase::PreserveBlackBorders => rules.keep_black = true,
            SpecialCase::PreserveDarkPosts(band) => rules.dark_posts = Some(*band),
            SpecialCase::EnlargeMarkers { radius } => marker_radius = Some(*radius),
        }
    }

    let mut out = pristine.map_pixels(|color| rules.apply(color));

    if let Some(radius) = marker_radius.filter(|r| *r > 0) {
        enlarge_markers(pristine, &mut out, &rules, radius);
    }
    out
}

fn enlarge_markers(
    pristine: &RasterBuffer,
    out: &mut RasterBuffer,
    rules: &PixelRules<'_>,
    radius: u32,
) {
    let r = radius as i64;
    let r2 = r * r;
    let (w, h) = (pristine.width() as i64, pristine.height() as i64);
    for y in 0..pristine.height() {
        for x in 0..pristine.width() {
            let Some(color) = pristine.pixel(x, y) else {
                continue;
            };
            if !rules.targets.contains(&color) {
                continue;
            }
            let paint = rules.apply(color);
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx * dx + dy * dy > r2 {
                        continue;
                    }
                    let (px, py) = (x as i64 + dx, y as i64 + dy);
                    if px < 0 || py < 0 || px >= w || py >= h {
                        continue;
                    }
                    out.put(px as u32, py as u32, paint);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ColorMapping;
    use crate::variant::{ANNEXED_DISTRICT_COLORS, MapVariant};

    fn registry(entries: &[(&str, Rgb)]) -> ColorRegistry {
        ColorRegistry::from_mappings(
            entries
                .iter()
                .map(|(region, color)| ColorMapping::new(region, *color).expect("mapping"))
                .collect(),
        )
    }

    fn strip(colors: &[Rgb]) -> RasterBuffer {
        let mut buf = RasterBuffer::filled(colors.len() as u32, 1, Rgb::WHITE).expect("buffer");
        for (x, color) in colors.iter().enumerate() {
            buf.put(x as u32, 0, *color);
        }
        buf
    }

    #[test]
    fn empty_selection_returns_pristine_bytes() {
        let map = strip(&[Rgb::new(1, 2, 3), Rgb::new(200, 100, 50)]);
        let reg = registry(&[("A", Rgb::new(1, 2, 3))]);
        let none: [&str; 0] = [];
        for variant in MapVariant::ALL {
            let out = render(&variant.policy(), &map, &reg, &none);
            assert_eq!(out.as_rgba(), map.as_rgba());
        }
    }

    #[test]
    fn brightens_target_and_dims_the_rest() {
        let map = strip(&[Rgb::new(100, 100, 100), Rgb::new(50, 60, 70)]);
        let reg = registry(&[("R", Rgb::new(100, 100, 100))]);
        let out = render(&MapVariant::PrincipalStates.policy(), &map, &reg, &["R"]);
        assert_eq!(out.pixel(0, 0), Some(Rgb::new(150, 150, 150)));
        assert_eq!(out.pixel(1, 0), Some(Rgb::new(20, 24, 28)));
    }

    #[test]
    fn brighten_clamps_at_white() {
        let map = strip(&[Rgb::new(255, 200, 180)]);
        let reg = registry(&[("Madras Presidency", Rgb::new(255, 200, 180))]);
        let out = render(
            &MapVariant::Presidencies.policy(),
            &map,
            &reg,
            &["Madras Presidency"],
        );
        assert_eq!(out.pixel(0, 0), Some(Rgb::new(255, 255, 255)));
    }

    #[test]
    fn rendering_twice_is_byte_identical() {
        let map = strip(&[Rgb::new(100, 100, 100), Rgb::new(50, 60, 70), Rgb::new(0, 190, 180)]);
        let reg = registry(&[("R", Rgb::new(100, 100, 100)), ("R", Rgb::new(0, 190, 180))]);
        for variant in MapVariant::ALL {
            let policy = variant.policy();
            let a = render(&policy, &map, &reg, &["R"]);
            let b = render(&policy, &map, &reg, &["R"]);
            assert_eq!(a.as_rgba(), b.as_rgba(), "{variant}");
        }
    }

    #[test]
    fn annexed_district_is_cut_out_of_presidency_highlight() {
        let arcot = ANNEXED_DISTRICT_COLORS[0];
        let madras = Rgb::new(100, 100, 100);
        let map = strip(&[arcot, madras]);
        let reg = registry(&[("Madras Presidency", madras), ("Madras Presidency", arcot)]);
        let out = render(
            &MapVariant::Presidencies.policy(),
            &map,
            &reg,
            &["Madras Presidency"],
        );
        assert_eq!(out.pixel(0, 0), Some(Rgb::WHITE));
        assert_eq!(out.pixel(1, 0), Some(Rgb::new(150, 150, 150)));
    }

    #[test]
    fn annexed_color_dims_when_not_targeted() {
        let arcot = ANNEXED_DISTRICT_COLORS[0];
        let map = strip(&[arcot]);
        let reg = registry(&[("Madras Presidency", arcot), ("Bombay Presidency", Rgb::new(1, 1, 1))]);
        let out = render(
            &MapVariant::Presidencies.policy(),
            &map,
            &reg,
            &["Bombay Presidency"],
        );
        assert_eq!(out.pixel(0, 0), Some(arcot.scale(0.4)));
    }

    #[test]
    fn principal_states_brighten_annexed_colors_normally() {
        let arcot = ANNEXED_DISTRICT_COLORS[0];
        let map = strip(&[arcot]);
        let reg = registry(&[("Arcot", arcot)]);
        let out = render(&MapVariant::PrincipalStates.policy(), &map, &reg, &["Arcot"]);
        assert_eq!(out.pixel(0, 0), Some(arcot.scale(1.5)));
    }

    #[test]
    fn multiple_targets_brighten_together() {
        let map = strip(&[Rgb::new(10, 10, 10), Rgb::new(20, 20, 20), Rgb::new(30, 30, 30)]);
        let reg = registry(&[
            ("A", Rgb::new(10, 10, 10)),
            ("B", Rgb::new(20, 20, 20)),
            ("C", Rgb::new(30, 30, 30)),
        ]);
        let out = render(&MapVariant::PrincipalStates.policy(), &map, &reg, &["A", "B"]);
        assert_eq!(out.pixel(0, 0), Some(Rgb::new(15, 15, 15)));
        assert_eq!(out.pixel(1, 0), Some(Rgb::new(30, 30, 30)));
        assert_eq!(out.pixel(2, 0), Some(Rgb::new(12, 12, 12)));
    }

    #[test]
    fn trading_map_whites_out_others_but_keeps_borders_and_posts() {
        let dutch = Rgb::new(240, 120, 0);
        let british = Rgb::new(200, 0, 0);
        let shared_post = Rgb::new(40, 35, 30);
        let map = strip(&[dutch, british, Rgb::BLACK, shared_post]);
        let reg = registry(&[("Dutch", dutch), ("British", british)]);
        let policy = HighlightPolicy {
            suppression: Suppression::WhiteoutOutside,
            special_cases: vec![
                SpecialCase::PreserveBlackBorders,
                SpecialCase::PreserveDarkPosts(DarkPostBand::default()),
            ],
        };
        let out = render(&policy, &map, &reg, &["Dutch"]);
        assert_eq!(out.pixel(0, 0), Some(dutch));
        assert_eq!(out.pixel(1, 0), Some(Rgb::WHITE));
        assert_eq!(out.pixel(2, 0), Some(Rgb::BLACK));
        assert_eq!(out.pixel(3, 0), Some(shared_post));
    }

    #[test]
    fn dark_post_band_rejects_saturated_darks() {
        let band = DarkPostBand::default();
        assert!(band.contains(Rgb::new(20, 20, 25)));
        assert!(!band.contains(Rgb::new(60, 0, 0)));
        assert!(!band.contains(Rgb::new(70, 70, 70)));
    }

    #[test]
    fn trading_posts_are_enlarged_into_discs() {
        let post = Rgb::new(0, 0, 200);
        let mut map = RasterBuffer::filled(9, 9, Rgb::new(230, 230, 200)).expect("buffer");
        map.put(4, 4, post);
        let reg = registry(&[("Danish", post)]);
        let out = render(&MapVariant::TradingCompanies.policy(), &map, &reg, &["Danish"]);

        assert_eq!(out.pixel(4, 4), Some(post));
        assert_eq!(out.pixel(7, 4), Some(post));
        assert_eq!(out.pixel(4, 1), Some(post));
        assert_eq!(out.pixel(6, 6), Some(post));
        // Corner of the bounding square lies outside the radius-3 disc.
        assert_eq!(out.pixel(7, 7), Some(Rgb::WHITE));
        assert_eq!(out.pixel(0, 0), Some(Rgb::WHITE));
    }

    #[test]
    fn discs_are_clipped_at_the_edge() {
        let post = Rgb::new(0, 0, 200);
        let mut map = RasterBuffer::filled(5, 5, Rgb::new(230, 230, 200)).expect("buffer");
        map.put(0, 0, post);
        let reg = registry(&[("Danish", post)]);
        let out = render(&MapVariant::TradingCompanies.policy(), &map, &reg, &["Danish"]);
        assert_eq!(out.width(), 5);
        assert_eq!(out.pixel(3, 0), Some(post));
        assert_eq!(out.pixel(0, 3), Some(post));
        assert_eq!(out.pixel(3, 3), Some(Rgb::WHITE));
    }

    #[test]
    fn alpha_is_carried_from_pristine() {
        let map = RasterBuffer::from_rgba(1, 1, vec![100, 100, 100, 7]).expect("buffer");
        let reg = registry(&[("R", Rgb::new(100, 100, 100))]);
        let out = render(&MapVariant::PrincipalStates.policy(), &map, &reg, &["R"]);
        assert_eq!(out.as_rgba(), &[150, 150, 150, 7]);
    }
}
