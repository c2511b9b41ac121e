pub mod explorer;
pub mod highlight;
pub mod palette;
pub mod raster;
pub mod registry;
pub mod resolver;
pub mod rgb;
pub mod seeds;
pub mod variant;

pub use explorer::{ClickOutcome, ExplorerError, MapExplorer, PendingMapping, Prompt};
pub use highlight::{DarkPostBand, HighlightPolicy, SpecialCase, Suppression};
pub use raster::{RasterBuffer, RasterError};
pub use registry::{ColorMapping, ColorRegistry, RegistryError, SharedColor};
pub use resolver::{AmbiguousClick, ClickPoint, DisplaySize, Resolution};
pub use rgb::{ColorParseError, Rgb};
pub use variant::{ANNEXED_DISTRICT_COLORS, MapVariant, UpsertMode};
