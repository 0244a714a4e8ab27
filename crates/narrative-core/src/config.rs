//! # Engine Configuration
//!
//! Tuning parameters for the narrative engine. Every threshold the engine
//! uses lives here so hosts can tune them per story.
//!
//! ## Key Types
//! - `EngineConfig`: Root configuration, loadable from JSON.
//! - `WindowConfig`: A start/end bound pair for a family of triggers.
//! - `PhaseWeights`: Relative lengths of the pre-travel phases.
//! - `SplitConfig`: Responsive spread for split reveals.

use crate::errors::NarrativeError;
use crate::trigger::Bound;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Start and end bound for one family of virtual triggers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub start: Bound,
    pub end: Bound,
}

impl WindowConfig {
    pub const fn new(start: Bound, end: Bound) -> Self {
        Self { start, end }
    }
}

/// Relative lengths of the intro phases, in intro units.
///
/// The whole intro (everything before travel) spans `intro_viewports`
/// viewport heights of scroll; these weights divide it up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseWeights {
    pub title_reveal: f64,
    pub title_hold: f64,
    pub title_exit: f64,
    pub cover_enter: f64,
    /// Delay between consecutive cover layers.
    pub cover_stagger: f64,
    pub cover_dispersal: f64,
}

impl Default for PhaseWeights {
    fn default() -> Self {
        Self {
            title_reveal: 3.0,
            title_hold: 1.0,
            title_exit: 3.0,
            cover_enter: 5.0,
            cover_stagger: 0.1,
            cover_dispersal: 7.0,
        }
    }
}

/// Spread of split-reveal halves, chosen by viewport width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Viewports at or below this width use the mobile spread.
    pub breakpoint_px: f64,
    /// Per-half travel as a fraction of viewport width.
    pub desktop_spread: f64,
    pub mobile_spread: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            breakpoint_px: 768.0,
            desktop_spread: 0.35,
            mobile_spread: 0.48,
        }
    }
}

impl SplitConfig {
    pub fn spread_px(&self, viewport_width: f64) -> f64 {
        let fraction = if viewport_width <= self.breakpoint_px {
            self.mobile_spread
        } else {
            self.desktop_spread
        };
        fraction * viewport_width
    }
}

/// Root engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds the master playhead takes to catch up with the scroll position.
    /// `0.0` follows the scroll exactly.
    pub scrub_lag_secs: f64,
    /// Scroll length of the pre-travel phases, in viewport heights.
    pub intro_viewports: f64,
    pub phases: PhaseWeights,
    /// Number of transitional cover layers.
    pub cover_count: usize,
    /// When lazy media starts fetching.
    pub preload_window: WindowConfig,
    /// When lazy media plays.
    pub playback_window: WindowConfig,
    /// When a scene counts as centered for the info panel.
    pub active_window: WindowConfig,
    /// Default start bound for fade-and-rise reveals.
    pub reveal_start: Bound,
    /// Quiet period before a play/pause intent is applied.
    pub play_debounce_ms: u64,
    pub split: SplitConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scrub_lag_secs: 1.5,
            intro_viewports: 1.0,
            phases: PhaseWeights::default(),
            cover_count: 3,
            preload_window: WindowConfig::new(Bound::left_at(2.0), Bound::right_at(0.0)),
            playback_window: WindowConfig::new(Bound::left_at(0.7), Bound::right_at(0.3)),
            active_window: WindowConfig::new(Bound::left_at(0.75), Bound::right_at(0.25)),
            reveal_start: Bound::left_at(0.8),
            play_debounce_ms: 100,
            split: SplitConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, NarrativeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NarrativeError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// A configuration whose playhead follows the scroll position exactly.
    pub fn immediate() -> Self {
        Self {
            scrub_lag_secs: 0.0,
            ..Self::default()
        }
    }
}
