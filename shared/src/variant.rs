use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::highlight::{DarkPostBand, HighlightPolicy, SpecialCase, Suppression};
use crate::rgb::Rgb;

/// Districts drawn inside the Madras Presidency that belong to other units:
/// Arcot, Madurai and Sivagangai/Ramnad (fill, stripe, boundary each).
pub const ANNEXED_DISTRICT_COLORS: &[Rgb] = &[
    Rgb::new(0, 190, 180),
    Rgb::new(0, 140, 130),
    Rgb::new(0, 100, 95),
    Rgb::new(220, 120, 50),
    Rgb::new(170, 85, 30),
    Rgb::new(160, 80, 30),
    Rgb::new(50, 140, 220),
    Rgb::new(30, 100, 170),
    Rgb::new(30, 90, 160),
];

pub const BRIGHTEN_GAIN: f64 = 1.5;
pub const DIM_ATTENUATION: f64 = 0.4;
pub const TRADING_POST_RADIUS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MapVariant {
    PrincipalStates,
    TradingCompanies,
    Presidencies,
}

/// How a new mapping interacts with colors the region already owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertMode {
    /// The region owns a single color; registering again moves it.
    ReplaceRegion,
    /// The region accumulates colors; only an identical pair is replaced.
    AddColor,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown map variant {0:?}")]
pub struct UnknownVariant(pub String);

impl MapVariant {
    pub const ALL: [MapVariant; 3] = [
        MapVariant::PrincipalStates,
        MapVariant::TradingCompanies,
        MapVariant::Presidencies,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PrincipalStates => "principal-states",
            Self::TradingCompanies => "trading-companies",
            Self::Presidencies => "presidencies",
        }
    }

    /// Key under which the variant's mapping list lives in the KV store.
    pub fn storage_key(self) -> &'static str {
        match self {
            Self::PrincipalStates => "princely_states_map_colors",
            Self::TradingCompanies => "trading_companies_map_colors",
            Self::Presidencies => "presidencies_map_colors",
        }
    }

    pub fn image_path(self) -> &'static str {
        match self {
            Self::PrincipalStates => "/maps/princely-states.png",
            Self::TradingCompanies => "/maps/trading-companies.png",
            Self::Presidencies => "/maps/presidencies.png",
        }
    }

    pub fn upsert_mode(self) -> UpsertMode {
        match self {
            Self::PrincipalStates => UpsertMode::ReplaceRegion,
            Self::TradingCompanies | Self::Presidencies => UpsertMode::AddColor,
        }
    }

    pub fn policy(self) -> HighlightPolicy {
        match self {
            Self::PrincipalStates => HighlightPolicy {
                suppression: Suppression::BrightenDim {
                    gain: BRIGHTEN_GAIN,
                    attenuation: DIM_ATTENUATION,
                },
                special_cases: Vec::new(),
            },
            Self::Presidencies => HighlightPolicy {
                suppression: Suppression::BrightenDim {
                    gain: BRIGHTEN_GAIN,
                    attenuation: DIM_ATTENUATION,
                },
                special_cases: vec![SpecialCase::AnnexedWhiteout(ANNEXED_DISTRICT_COLORS)],
            },
            Self::TradingCompanies => HighlightPolicy {
                suppression: Suppression::WhiteoutOutside,
                special_cases: vec![
                    SpecialCase::PreserveBlackBorders,
                    SpecialCase::PreserveDarkPosts(DarkPostBand::default()),
                    SpecialCase::EnlargeMarkers {
                        radius: TRADING_POST_RADIUS,
                    },
                ],
            },
        }
    }
}

impl fmt::Display for MapVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapVariant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MapVariant::ALL
            .into_iter()
            .find(|variant| variant.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_owned()))
    }
}
