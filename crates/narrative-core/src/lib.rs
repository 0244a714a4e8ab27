//! # Narrative Engine
//!
//! `narrative-core` turns one continuous vertical scroll gesture into a pinned,
//! horizontal sequence of scenes.
//!
//! A master timeline plays an intro, hides the swap to the horizontal track
//! behind transitional cover layers, then translates the track linearly with
//! the scroll. Everything else (scene-local animations, lazy media, the
//! centered-scene signal) hangs off that one master motion through virtual
//! triggers, never off the real scroll position.
//!
//! ## Core Features
//!
//! *   **Master Timeline**: Ordered phase descriptors compiled into scroll-pixel positions.
//! *   **Virtual Triggers**: Activation windows resolved against the master motion.
//! *   **Scoped Teardown**: Every scene's triggers are released by a single revert.
//! *   **Lazy Media**: Wide pre-load window, narrow debounced playback window.
//! *   **Active Scene**: At most one centered scene, published over a channel.
//!
//! ## Usage
//!
//! The entry point is [`StoryEngine`]. The host feeds it scroll positions and
//! frame times and applies the returned [`StageFrame`].
//!
//! ```rust,no_run
//! use narrative_core::{EngineConfig, HeadlessMediaBackend, Scene, StoryEngine, Viewport};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let mut engine = StoryEngine::new(
//!     EngineConfig::default(),
//!     Viewport::new(1440.0, 900.0),
//!     Arc::new(HeadlessMediaBackend::new()),
//! );
//! engine.mount(Scene::new("opening").with_info("Opening", "Where it starts")).unwrap();
//! engine.mount(Scene::new("tibet")).unwrap();
//! engine.scroll_to(1200.0);
//! let frame = engine.tick(Duration::from_millis(16));
//! println!("{:?}", frame.track_offset);
//! ```

/// Keyframe animation primitives and the clock-driven playhead.
pub mod animation;

/// Centered-scene detection and the info-panel channel.
pub mod broadcast;

/// Measures the track and owns the master motion.
pub mod composer;

pub mod config;

/// Scene-local behaviors wired to the master motion.
pub mod contributors;

pub mod errors;

/// Lazy loading and debounced playback of embedded media.
pub mod media;

/// The master motion and its read-only broadcast channel.
pub mod motion;

/// Scene definitions and the ordered scene registry.
pub mod scene;

/// Per-tick snapshot for the hosting renderer.
pub mod stage;

/// The engine coordinator.
pub mod story;

/// Layout and intro transition systems.
pub mod systems;

/// Phase descriptors and the compiled master timeline.
pub mod timeline;

/// Virtual triggers, bounds and scopes.
pub mod trigger;

/// Shared data structures used across the engine.
pub mod types;

pub use config::EngineConfig;
pub use contributors::ContributorSpec;
pub use errors::NarrativeError;
pub use media::{HeadlessMediaBackend, MediaBackend, MediaElement, MediaEvent, MediaSpec};
pub use scene::Scene;
pub use stage::{StageFrame, StageMode};
pub use story::StoryEngine;
pub use types::{SceneInfo, Viewport};
