//! # Lazy Media
//!
//! Deferred loading and debounced playback of embedded media, driven by
//! virtual proximity along the master motion rather than by real visibility.
//!
//! ## Responsibilities
//! - **Host Seam**: `MediaElement` / `MediaBackend` abstract the playback surface.
//! - **Controller**: `LazyMediaController` owns one element and its two windows.
//! - **Debounce**: `Debouncer` coalesces play/pause flicker into one settled intent.
//! - **Headless Backend**: A recording backend for simulation and tests.

pub mod controller;
pub mod debounce;
pub mod headless;

pub use controller::{LazyMediaController, MediaState, MediaStats};
pub use debounce::Debouncer;
pub use headless::{HeadlessMediaBackend, MediaCall, MediaCallKind};

use crate::types::MediaId;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// How much of a media element is buffered, mirroring the host's ready states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

impl ReadyState {
    /// Whether playback can start without stalling immediately.
    pub fn can_play(&self) -> bool {
        *self >= ReadyState::HaveFutureData
    }
}

/// Notifications the host forwards from a media element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    /// The element has buffered enough to start playing.
    CanPlay,
    /// Fetching or decoding failed.
    Error(String),
}

/// A media element declared by a scene. The source is assigned lazily.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSpec {
    pub id: MediaId,
    /// Deferred source path, resolved by the host.
    pub source: String,
}

impl MediaSpec {
    pub fn new(id: impl Into<MediaId>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
        }
    }
}

/// A playback surface owned by exactly one controller.
pub trait MediaElement: Send + std::fmt::Debug {
    /// Assigns the deferred source and starts fetching it.
    fn load(&mut self, source: &str) -> Result<()>;

    /// Current buffering level.
    fn ready_state(&self) -> ReadyState;

    /// Starts playback. Backends may refuse, e.g. when interrupted.
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);
}

/// Creates media elements for scenes.
///
/// This lets the engine run against a browser, a native player, or the
/// headless recorder without knowing which.
pub trait MediaBackend: Send + Sync {
    fn create_element(&self, scene_id: &str, spec: &MediaSpec) -> Result<Box<dyn MediaElement>>;
}
