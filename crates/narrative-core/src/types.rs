//! # Types Module
//!
//! Shared data types used across the engine.
//!
//! ## Key Types
//! - `Viewport`: The visible window the pinned section is rendered into.
//! - `SceneInfo`: Metadata published to the info panel for the centered scene.
//! - `Visual`: A renderer-agnostic snapshot of an animated layer.
//! - `SceneId`: Stable string identifier of a scene.

use serde::{Deserialize, Serialize};

/// A stable, unique scene identifier.
pub type SceneId = String;

/// Identifies a media element inside a scene.
pub type MediaId = String;

/// The size of the visible window, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1920.0, 1080.0)
    }
}

/// Metadata shown by the external info panel while a scene is centered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneInfo {
    pub title: String,
    pub description: String,
}

/// Renderer-agnostic visual state of one animated layer.
///
/// Offsets are in pixels unless the field name says otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Visual {
    pub opacity: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub scale: f32,
}

impl Visual {
    /// A fully visible layer with no transform.
    pub fn identity() -> Self {
        Self {
            opacity: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            scale: 1.0,
        }
    }

    /// A fully transparent layer with no transform.
    pub fn hidden() -> Self {
        Self {
            opacity: 0.0,
            ..Self::identity()
        }
    }
}

impl Default for Visual {
    fn default() -> Self {
        Self::identity()
    }
}
