//! Per-tick snapshot handed to the hosting renderer.

use crate::contributors::ContributorFrame;
use crate::media::MediaState;
use crate::systems::transitions::CoverLayer;
use crate::timeline::PhaseLabel;
use crate::types::{MediaId, SceneId, Visual};
use serde::Serialize;

/// Whether the section is pinned and scrubbed or laid out as static content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageMode {
    Pinned,
    /// Nothing to travel: no pin, no master motion.
    Static,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaFrame {
    pub id: MediaId,
    pub state: MediaState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneFrame {
    pub id: SceneId,
    /// Triggers were skipped for this build because anchors are missing.
    pub disabled: bool,
    pub contributors: Vec<ContributorFrame>,
    pub media: Vec<MediaFrame>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageFrame {
    pub mode: StageMode,
    /// Scroll position inside the pinned region.
    pub scroll: f64,
    /// Smoothed master-timeline position, in scroll pixels.
    pub playhead: f64,
    pub phase: Option<PhaseLabel>,
    pub title: Visual,
    pub covers: Vec<CoverLayer>,
    /// The static intro layer; the track is shown when this is false.
    pub intro_visible: bool,
    /// How far the track has moved left, in pixels.
    pub track_offset: f64,
    pub travel_progress: Option<f64>,
    pub active_scene: Option<SceneId>,
    pub scenes: Vec<SceneFrame>,
}

impl StageFrame {
    /// The frame of a section that is not pinned.
    pub fn static_frame(scroll: f64) -> Self {
        Self {
            mode: StageMode::Static,
            scroll,
            playhead: 0.0,
            phase: None,
            title: Visual::identity(),
            covers: Vec::new(),
            intro_visible: true,
            track_offset: 0.0,
            travel_progress: None,
            active_scene: None,
            scenes: Vec::new(),
        }
    }

    pub fn scene(&self, id: &str) -> Option<&SceneFrame> {
        self.scenes.iter().find(|s| s.id == id)
    }
}
