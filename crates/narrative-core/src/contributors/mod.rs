//! # Sub-Timeline Contributors
//!
//! Scene-local animated behaviors that run in lockstep with the master motion.
//!
//! Every contributor creates its triggers through an `AttachContext`, which
//! only hands out triggers bound to the shared motion and records them in the
//! owning scene's scope. There is no way for a contributor to observe the real
//! scroll position.
//!
//! ## Kinds
//! - `SplitReveal`: two label halves slide apart while a centered media grows in (scrubbed).
//! - `FillBar`: a bar and a percentage readout advance across the scene (scrubbed).
//! - `FadeRise`: staggered fade, rise and scale-in of one or more element groups (clock-driven, toggle actions).
//! - `Parallax`: alternating vertical drift of repeated elements (scrubbed).
//!
//! Scrubbed kinds may trail their window with their own `scrub_lag_secs`.

pub mod fade_rise;
pub mod fill_bar;
pub mod parallax;
pub mod split_reveal;

pub use fade_rise::{FadeRise, FadeRiseSpec, RevealTrack};
pub use fill_bar::{FillBar, FillBarSpec};
pub use parallax::{Parallax, ParallaxSpec};
pub use split_reveal::{SplitReveal, SplitRevealSpec};

use crate::animation::chase;
use crate::config::EngineConfig;
use crate::motion::MotionHandle;
use crate::systems::layout::SlotRect;
use crate::trigger::{Bound, TriggerId, TriggerRegistry, TriggerScope, TriggerUpdate};
use crate::types::{Viewport, Visual};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Everything a component needs to wire itself to the master motion.
pub struct AttachContext<'a> {
    pub slot: &'a SlotRect,
    pub viewport: Viewport,
    pub motion: &'a MotionHandle,
    pub config: &'a EngineConfig,
    scope: &'a mut TriggerScope,
    registry: &'a mut TriggerRegistry,
}

impl<'a> AttachContext<'a> {
    pub fn new(
        slot: &'a SlotRect,
        viewport: Viewport,
        motion: &'a MotionHandle,
        config: &'a EngineConfig,
        scope: &'a mut TriggerScope,
        registry: &'a mut TriggerRegistry,
    ) -> Self {
        Self {
            slot,
            viewport,
            motion,
            config,
            scope,
            registry,
        }
    }

    pub fn scene_id(&self) -> &str {
        &self.slot.scene_id
    }

    /// Creates a trigger for this scene's slot, owned by the scene's scope.
    pub fn create_trigger(&mut self, start: &Bound, end: &Bound) -> TriggerId {
        self.scope
            .create(self.registry, self.slot, start, end, self.motion)
    }
}

/// Below this gap a lagging window progress snaps onto its target.
const PROGRESS_SNAP: f64 = 1e-4;

/// Window progress as shown by a scrubbed contributor.
///
/// Without a lag it follows the trigger exactly; with one it chases the
/// trigger on the frame clock the way the master playhead chases the scroll.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrubbedProgress {
    lag_secs: f64,
    target: f64,
    shown: f64,
}

impl ScrubbedProgress {
    pub fn new(lag_secs: f64) -> Self {
        Self {
            lag_secs: lag_secs.max(0.0),
            ..Self::default()
        }
    }

    pub fn set_target(&mut self, progress: f64) {
        self.target = progress.clamp(0.0, 1.0);
        if self.lag_secs <= 0.0 {
            self.shown = self.target;
        }
    }

    pub fn tick(&mut self, dt: f64) {
        self.shown = chase(self.shown, self.target, self.lag_secs, dt, PROGRESS_SNAP);
    }

    /// Back to the start of the window, without easing.
    pub fn reset(&mut self) {
        self.target = 0.0;
        self.shown = 0.0;
    }

    pub fn value(&self) -> f64 {
        self.shown
    }

    pub fn target(&self) -> f64 {
        self.target
    }
}

/// A scene-local behavior driven by its own virtual triggers.
pub trait Contributor: Send + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Creates this contributor's triggers for the current build.
    fn attach(&mut self, cx: &mut AttachContext<'_>);

    /// Forgets trigger ids after the owning scope was reverted.
    fn release(&mut self);

    fn owns(&self, id: TriggerId) -> bool;

    fn on_trigger(&mut self, update: &TriggerUpdate);

    /// Advances clock-driven tweens by `dt` seconds.
    fn tick(&mut self, _dt: f64) {}

    fn frame(&self) -> ContributorFrame;
}

/// Renderer-facing snapshot of one contributor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContributorFrame {
    SplitReveal {
        left: Visual,
        right: Visual,
        media: Visual,
    },
    FillBar {
        /// Horizontal scale of the bar, `0.0..=1.0`.
        fill_scale: f64,
        /// Continuous percentage; never rounded.
        percent: f64,
        /// Display text, rounded to a whole percent.
        label: String,
    },
    FadeRise {
        anchor: String,
        /// First target of the first track.
        visual: Visual,
        targets: Vec<TargetFrame>,
    },
    Parallax {
        anchor: String,
        /// Vertical offset of each element, in percent of its own height.
        offsets_pct: Vec<f64>,
    },
}

/// One element of a multi-target contributor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetFrame {
    pub anchor: String,
    pub index: usize,
    pub visual: Visual,
}

/// Declarative form of a contributor, as found in story documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContributorSpec {
    SplitReveal(SplitRevealSpec),
    FillBar(FillBarSpec),
    FadeRise(FadeRiseSpec),
    Parallax(ParallaxSpec),
}

impl ContributorSpec {
    /// Element anchors the scene content must expose for this contributor.
    pub fn required_anchors(&self) -> Vec<String> {
        match self {
            ContributorSpec::SplitReveal(_) => split_reveal::ANCHORS.iter().map(|a| a.to_string()).collect(),
            ContributorSpec::FillBar(_) => fill_bar::ANCHORS.iter().map(|a| a.to_string()).collect(),
            ContributorSpec::FadeRise(spec) => spec.anchors(),
            ContributorSpec::Parallax(spec) => vec![spec.anchor.clone()],
        }
    }

    pub fn build(&self) -> Box<dyn Contributor> {
        match self {
            ContributorSpec::SplitReveal(spec) => Box::new(SplitReveal::new(spec.clone())),
            ContributorSpec::FillBar(spec) => Box::new(FillBar::new(spec.clone())),
            ContributorSpec::FadeRise(spec) => Box::new(FadeRise::new(spec.clone())),
            ContributorSpec::Parallax(spec) => Box::new(Parallax::new(spec.clone())),
        }
    }
}
