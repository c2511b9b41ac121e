use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rgb::Rgb;
use crate::variant::UpsertMode;

/// One `region -> color` association. Older stored lists call the region `state`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorMapping {
    #[serde(alias = "state")]
    pub region: String,
    pub color: Rgb,
}

/// A color owned by more than one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedColor {
    pub color: Rgb,
    pub regions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("region name must not be empty")]
    EmptyRegion,
    #[error("region {0:?} has no color mappings")]
    UnknownRegion(String),
    #[error("region {0:?} already owns a color")]
    RegionTaken(String),
}

impl ColorMapping {
    pub fn new(region: &str, color: Rgb) -> Result<Self, RegistryError> {
        Ok(Self {
            region: normalize_region(region)?.to_owned(),
            color,
        })
    }
}

fn normalize_region(region: &str) -> Result<&str, RegistryError> {
    let trimmed = region.trim();
    if trimmed.is_empty() {
        return Err(RegistryError::EmptyRegion);
    }
    Ok(trimmed)
}

/// The color mappings of a single map variant, in insertion order.
///
/// Colors are not unique: two regions sharing a triple is a surfaced
/// ambiguity (see [`ColorRegistry::shared_colors`]), not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorRegistry {
    mappings: Vec<ColorMapping>,
}

impl ColorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_mappings(mappings: Vec<ColorMapping>) -> Self {
        Self { mappings }
    }

    pub fn mappings(&self) -> &[ColorMapping] {
        &self.mappings
    }

    pub fn into_mappings(self) -> Vec<ColorMapping> {
        self.mappings
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Every region owning exactly `color`, without duplicates, in registry order.
    pub fn lookup_by_color(&self, color: Rgb) -> Vec<String> {
        let mut seen = HashSet::new();
        self.mappings
            .iter()
            .filter(|m| m.color == color)
            .map(|m| m.region.as_str())
            .filter(|region| seen.insert(*region))
            .map(str::to_owned)
            .collect()
    }

    pub fn lookup_by_region(&self, region: &str) -> Vec<Rgb> {
        let mut seen = HashSet::new();
        self.mappings
            .iter()
            .filter(|m| m.region == region)
            .filter(|m| seen.insert(m.color))
            .map(|m| m.color)
            .collect()
    }

    /// Union of the colors owned by every region in `regions`.
    pub fn target_colors<S: AsRef<str>>(&self, regions: &[S]) -> HashSet<Rgb> {
        let wanted: HashSet<&str> = regions.iter().map(AsRef::as_ref).collect();
        self.mappings
            .iter()
            .filter(|m| wanted.contains(m.region.as_str()))
            .map(|m| m.color)
            .collect()
    }

    pub fn upsert(&mut self, mapping: ColorMapping, mode: UpsertMode) {
        match mode {
            UpsertMode::ReplaceRegion => self.mappings.retain(|m| m.region != mapping.region),
            UpsertMode::AddColor => self.mappings.retain(|m| m != &mapping),
        }
        self.mappings.push(mapping);
    }

    /// Re-key every mapping of `from` to `to`. Colors already owned by `to`
    /// are not duplicated. Under [`UpsertMode::ReplaceRegion`] a region owns a
    /// single color, so `to` must not name another existing region.
    pub fn rename(
        &mut self,
        from: &str,
        to: &str,
        mode: UpsertMode,
    ) -> Result<usize, RegistryError> {
        let to = normalize_region(to)?;
        let colors = self.lookup_by_region(from);
        if colors.is_empty() {
            return Err(RegistryError::UnknownRegion(from.to_owned()));
        }
        if matches!(mode, UpsertMode::ReplaceRegion)
            && to != from
            && self.mappings.iter().any(|m| m.region == to)
        {
            return Err(RegistryError::RegionTaken(to.to_owned()));
        }
        self.remove(from);
        for color in &colors {
            let mapping = ColorMapping {
                region: to.to_owned(),
                color: *color,
            };
            self.upsert(mapping, UpsertMode::AddColor);
        }
        Ok(colors.len())
    }

    /// Drop every color of `region`. Returns how many mappings were removed.
    pub fn remove(&mut self, region: &str) -> usize {
        let before = self.mappings.len();
        self.mappings.retain(|m| m.region != region);
        before - self.mappings.len()
    }

    /// Colors claimed by two or more distinct regions, sorted by color.
    pub fn shared_colors(&self) -> Vec<SharedColor> {
        let mut owners: BTreeMap<Rgb, Vec<String>> = BTreeMap::new();
        for mapping in &self.mappings {
            let regions = owners.entry(mapping.color).or_default();
            if !regions.contains(&mapping.region) {
                regions.push(mapping.region.clone());
            }
        }
        owners
            .into_iter()
            .filter(|(_, regions)| regions.len() > 1)
            .map(|(color, regions)| SharedColor { color, regions })
            .collect()
    }

    /// Distinct region names in first-seen order.
    pub fn regions(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.mappings
            .iter()
            .map(|m| m.region.as_str())
            .filter(|region| seen.insert(*region))
            .collect()
    }

    /// Content hash of the mapping list, stable across processes.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        for mapping in &self.mappings {
            hasher.update(mapping.region.as_bytes());
            hasher.update(&[0]);
            hasher.update(&[mapping.color.r, mapping.color.g, mapping.color.b]);
        }
        hasher.finalize()
    }
}
