//! Interaction state for one map view: selection, the disambiguation and
//! create-mapping prompts, and the pristine/displayed raster pair.
//!
//! The explorer never touches the network. Registry writes are handed out
//! as [`PendingMapping`]s and only applied once the caller confirms that
//! persistence succeeded.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::highlight::{self, HighlightPolicy};
use crate::raster::RasterBuffer;
use crate::registry::{ColorMapping, ColorRegistry, RegistryError};
use crate::resolver::{self, AmbiguousClick, ClickPoint, DisplaySize, Resolution};
use crate::rgb::Rgb;
use crate::variant::MapVariant;

/// Modal prompt currently blocking map clicks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Prompt {
    #[default]
    Idle,
    AwaitingChoice(AmbiguousClick),
    CreateMapping { color: Rgb, region: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Outside the map, image not loaded, a prompt is open, or an unmapped
    /// color clicked without admin rights.
    Ignored,
    Selected(String),
    NeedsChoice(AmbiguousClick),
    CreateMappingOpened(Rgb),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExplorerError {
    #[error("no region choice is pending")]
    NotAwaitingChoice,
    #[error("{0:?} is not one of the candidate regions")]
    NotACandidate(String),
    #[error("no mapping is being created")]
    NotCreatingMapping,
    #[error("creating mappings requires admin access")]
    NotAdmin,
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// A mapping the user submitted, waiting to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMapping {
    pub variant: MapVariant,
    pub mapping: ColorMapping,
}

/// A deferred highlight pass. Owns everything it needs so it can run after
/// the loading indicator has painted, or on another thread.
#[derive(Debug, Clone)]
pub struct RenderJob {
    generation: u64,
    variant: MapVariant,
    policy: HighlightPolicy,
    pristine: Arc<RasterBuffer>,
    targets: Vec<String>,
    target_colors: HashSet<Rgb>,
}

#[derive(Debug, Clone)]
pub struct RenderedFrame {
    generation: u64,
    variant: MapVariant,
    buffer: RasterBuffer,
}

impl RenderJob {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn run(self) -> RenderedFrame {
        let buffer = if self.targets.is_empty() {
            (*self.pristine).clone()
        } else {
            highlight::render_colors(&self.policy, &self.pristine, &self.target_colors)
        };
        RenderedFrame {
            generation: self.generation,
            variant: self.variant,
            buffer,
        }
    }
}

impl RenderedFrame {
    pub fn buffer(&self) -> &RasterBuffer {
        &self.buffer
    }
}

#[derive(Debug)]
pub struct MapExplorer {
    variant: MapVariant,
    registry: ColorRegistry,
    pristine: Option<Arc<RasterBuffer>>,
    displayed: Option<RasterBuffer>,
    selection: Vec<String>,
    prompt: Prompt,
    admin: bool,
    generation: u64,
    render_pending: bool,
    in_flight: Option<u64>,
}

impl MapExplorer {
    pub fn new(variant: MapVariant, registry: ColorRegistry) -> Self {
        Self {
            variant,
            registry,
            pristine: None,
            displayed: None,
            selection: Vec::new(),
            prompt: Prompt::Idle,
            admin: false,
            generation: 0,
            render_pending: false,
            in_flight: None,
        }
    }

    pub fn variant(&self) -> MapVariant {
        self.variant
    }

    pub fn registry(&self) -> &ColorRegistry {
        &self.registry
    }

    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    pub fn displayed(&self) -> Option<&RasterBuffer> {
        self.displayed.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.pristine.is_some()
    }

    /// True from a selection change until its frame is swapped in.
    pub fn is_rendering(&self) -> bool {
        self.render_pending || self.in_flight.is_some()
    }

    pub fn set_admin(&mut self, admin: bool) {
        self.admin = admin;
    }

    /// Capture the decoded image. Only the first load per variant is kept;
    /// returns whether this buffer became the pristine copy.
    pub fn load_image(&mut self, buffer: RasterBuffer) -> bool {
        if self.pristine.is_some() {
            return false;
        }
        self.displayed = Some(buffer.clone());
        self.pristine = Some(Arc::new(buffer));
        if !self.selection.is_empty() {
            self.schedule_render();
        }
        true
    }

    /// Move to another map. Selection, prompts and both buffers are dropped.
    pub fn switch_variant(&mut self, variant: MapVariant, registry: ColorRegistry) {
        self.variant = variant;
        self.registry = registry;
        self.pristine = None;
        self.displayed = None;
        self.selection.clear();
        self.prompt = Prompt::Idle;
        self.generation += 1;
        self.render_pending = false;
        self.in_flight = None;
    }

    /// Swap in a freshly loaded registry and re-highlight the current selection.
    pub fn replace_registry(&mut self, registry: ColorRegistry) {
        self.registry = registry;
        if !self.selection.is_empty() {
            self.schedule_render();
        }
    }

    pub fn click(&mut self, point: ClickPoint, display: DisplaySize) -> ClickOutcome {
        if self.prompt != Prompt::Idle {
            return ClickOutcome::Ignored;
        }
        let Some(pristine) = self.pristine.as_deref() else {
            return ClickOutcome::Ignored;
        };
        match resolver::resolve(point, display, pristine, &self.registry) {
            Resolution::OutOfBounds => ClickOutcome::Ignored,
            Resolution::Unassigned(color) => {
                if !self.admin {
                    return ClickOutcome::Ignored;
                }
                self.prompt = Prompt::CreateMapping {
                    color,
                    region: String::new(),
                };
                ClickOutcome::CreateMappingOpened(color)
            }
            Resolution::Single(region) => {
                self.select(vec![region.clone()]);
                ClickOutcome::Selected(region)
            }
            Resolution::Ambiguous(ambiguous) => {
                self.prompt = Prompt::AwaitingChoice(ambiguous.clone());
                ClickOutcome::NeedsChoice(ambiguous)
            }
        }
    }

    /// Resolve a pending disambiguation prompt.
    pub fn choose(&mut self, region: &str) -> Result<(), ExplorerError> {
        let Prompt::AwaitingChoice(ambiguous) = &self.prompt else {
            return Err(ExplorerError::NotAwaitingChoice);
        };
        if !ambiguous.candidate_regions.iter().any(|c| c == region) {
            return Err(ExplorerError::NotACandidate(region.to_owned()));
        }
        self.prompt = Prompt::Idle;
        self.select(vec![region.to_owned()]);
        Ok(())
    }

    /// Close whichever prompt is open. The selection is left as it was.
    pub fn cancel(&mut self) {
        self.prompt = Prompt::Idle;
    }

    pub fn set_region_name(&mut self, name: &str) -> Result<(), ExplorerError> {
        let Prompt::CreateMapping { region, .. } = &mut self.prompt else {
            return Err(ExplorerError::NotCreatingMapping);
        };
        *region = name.to_owned();
        Ok(())
    }

    /// Validate the create-mapping form. The registry is untouched until
    /// [`MapExplorer::confirm_mapping`]; on a failed write the prompt stays
    /// open with the user's input.
    pub fn submit_mapping(&self) -> Result<PendingMapping, ExplorerError> {
        if !self.admin {
            return Err(ExplorerError::NotAdmin);
        }
        let Prompt::CreateMapping { color, region } = &self.prompt else {
            return Err(ExplorerError::NotCreatingMapping);
        };
        Ok(PendingMapping {
            variant: self.variant,
            mapping: ColorMapping::new(region, *color)?,
        })
    }

    /// Apply a mapping the store accepted and select its region.
    pub fn confirm_mapping(&mut self, pending: PendingMapping) {
        if pending.variant != self.variant {
            return;
        }
        let region = pending.mapping.region.clone();
        self.registry.upsert(pending.mapping, self.variant.upsert_mode());
        if matches!(self.prompt, Prompt::CreateMapping { .. }) {
            self.prompt = Prompt::Idle;
        }
        self.select(vec![region]);
    }

    /// The store refused `pending`. Registry and selection stay as they were
    /// and the create-mapping prompt holds the submitted input for a retry.
    pub fn abandon_mapping(&mut self, pending: PendingMapping) {
        if pending.variant != self.variant {
            return;
        }
        if !matches!(self.prompt, Prompt::CreateMapping { .. }) {
            self.prompt = Prompt::CreateMapping {
                color: pending.mapping.color,
                region: pending.mapping.region,
            };
        }
    }

    /// Change the highlight target. Duplicates are dropped; an empty list
    /// restores the unmodified map.
    pub fn select(&mut self, regions: Vec<String>) {
        let mut seen = HashSet::new();
        let regions: Vec<String> = regions
            .into_iter()
            .filter(|region| seen.insert(region.clone()))
            .collect();
        self.selection = regions;
        self.schedule_render();
    }

    pub fn clear_selection(&mut self) {
        self.select(Vec::new());
    }

    fn schedule_render(&mut self) {
        self.generation += 1;
        self.render_pending = self.pristine.is_some();
    }

    /// Hand out the scan for the latest selection, if one is waiting.
    pub fn take_render_job(&mut self) -> Option<RenderJob> {
        if !self.render_pending {
            return None;
        }
        let pristine = Arc::clone(self.pristine.as_ref()?);
        self.render_pending = false;
        self.in_flight = Some(self.generation);
        Some(RenderJob {
            generation: self.generation,
            variant: self.variant,
            policy: self.variant.policy(),
            pristine,
            target_colors: self.registry.target_colors(&self.selection),
            targets: self.selection.clone(),
        })
    }

    /// Swap in a finished frame. Frames superseded by a later selection or a
    /// variant switch are dropped; returns whether the display changed.
    pub fn finish_render(&mut self, frame: RenderedFrame) -> bool {
        if self.in_flight == Some(frame.generation) {
            self.in_flight = None;
        }
        if frame.generation != self.generation || frame.variant != self.variant {
            return false;
        }
        self.displayed = Some(frame.buffer);
        true
    }

    /// Run any pending render synchronously.
    pub fn render_now(&mut self) -> bool {
        match self.take_render_job() {
            Some(job) => {
                let frame = job.run();
                self.finish_render(frame)
            }
            None => false,
        }
    }
}
