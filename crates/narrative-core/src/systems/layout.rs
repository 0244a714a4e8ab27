//! # Layout System
//!
//! Measures the horizontal track.
//!
//! ## Responsibilities
//! - **Slot Widths**: Resolves each scene's declared width against the viewport.
//! - **Slot Placement**: Packs slots edge to edge in registry order (no gaps, no overlaps).
//! - **Travel Distance**: `content_width - viewport_width`.
//!
//! ## Key Types
//! - `SlotWidth`: Declared width (`"100vw"`, `"1200px"`).
//! - `SlotRect`: Resolved horizontal extent of one scene.
//! - `TrackLayout`: All slots plus the total content width.

use crate::errors::NarrativeError;
use crate::scene::SceneRegistry;
use crate::types::{SceneId, Viewport};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::instrument;

/// Declared width of a scene slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SlotWidth {
    /// Multiples of the viewport width (`1.0` = `100vw`).
    Viewports(f64),
    /// Fixed pixel width.
    Pixels(f64),
}

impl SlotWidth {
    /// One full viewport.
    pub const FULL: SlotWidth = SlotWidth::Viewports(1.0);

    pub fn resolve(&self, viewport: &Viewport) -> f64 {
        let width = match self {
            SlotWidth::Viewports(v) => v * viewport.width,
            SlotWidth::Pixels(px) => *px,
        };
        width.max(0.0)
    }
}

impl Default for SlotWidth {
    fn default() -> Self {
        Self::FULL
    }
}

impl FromStr for SlotWidth {
    type Err = NarrativeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || NarrativeError::InvalidSlotWidth(s.to_string());
        if let Some(v) = trimmed.strip_suffix("vw") {
            let value: f64 = v.trim().parse().map_err(|_| invalid())?;
            Ok(SlotWidth::Viewports(value / 100.0))
        } else if let Some(px) = trimmed.strip_suffix("px") {
            Ok(SlotWidth::Pixels(px.trim().parse().map_err(|_| invalid())?))
        } else {
            Ok(SlotWidth::Pixels(trimmed.parse().map_err(|_| invalid())?))
        }
    }
}

impl TryFrom<String> for SlotWidth {
    type Error = NarrativeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SlotWidth> for String {
    fn from(value: SlotWidth) -> Self {
        value.to_string()
    }
}

impl fmt::Display for SlotWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotWidth::Viewports(v) => write!(f, "{}vw", v * 100.0),
            SlotWidth::Pixels(px) => write!(f, "{}px", px),
        }
    }
}

/// Horizontal extent of one scene on the track, in track pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotRect {
    pub scene_id: SceneId,
    pub slot_index: usize,
    pub left: f64,
    pub width: f64,
}

impl SlotRect {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }
}

/// The measured horizontal track.
#[derive(Debug, Clone, Default)]
pub struct TrackLayout {
    pub slots: Vec<SlotRect>,
    pub content_width: f64,
}

impl TrackLayout {
    /// Packs every registered scene into consecutive slots.
    #[instrument(level = "debug", skip(scenes), fields(scenes = scenes.len()))]
    pub fn measure(scenes: &SceneRegistry, viewport: &Viewport) -> Self {
        let mut slots = Vec::with_capacity(scenes.len());
        let mut cursor = 0.0;
        for (slot_index, scene) in scenes.iter().enumerate() {
            let width = scene.slot_width.resolve(viewport);
            slots.push(SlotRect {
                scene_id: scene.id.clone(),
                slot_index,
                left: cursor,
                width,
            });
            cursor += width;
        }
        Self {
            slots,
            content_width: cursor,
        }
    }

    /// `content_width - viewport_width`; may be zero or negative.
    pub fn travel_distance(&self, viewport: &Viewport) -> f64 {
        self.content_width - viewport.width
    }

    pub fn slot(&self, scene_id: &str) -> Option<&SlotRect> {
        self.slots.iter().find(|s| s.scene_id == scene_id)
    }
}
