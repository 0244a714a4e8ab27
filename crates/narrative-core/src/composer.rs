//! # Timeline Composer
//!
//! Measures the track, compiles the master timeline and owns the master
//! motion.
//!
//! ## Responsibilities
//! - **Measurement**: Travel distance is `content_width - viewport_width`.
//! - **Degenerate Mode**: Non-positive travel means no pin and no motion.
//! - **Phases**: Compiles the intro, transition and travel phases.
//! - **Scrubbing**: The playhead chases the scroll position with a configurable lag.
//! - **Rebuilds**: Every build releases the previous motion before creating a new one.

use crate::animation::chase;
use crate::config::EngineConfig;
use crate::errors::NarrativeError;
use crate::motion::{MasterMotion, MotionHandle};
use crate::scene::SceneRegistry;
use crate::stage::{StageFrame, StageMode};
use crate::systems::layout::TrackLayout;
use crate::systems::transitions::StageEffects;
use crate::timeline::{intro_weight, standard_phases, MasterTimeline};
use crate::types::Viewport;
use tracing::{info, instrument};

/// Below this gap (in scroll pixels) the playhead snaps onto its target.
const SNAP_EPSILON: f64 = 0.5;

/// Result of one build.
#[derive(Debug, Clone)]
pub enum BuildOutcome {
    /// A pinned, scrubbed section; dependent triggers key off this handle.
    Pinned(MotionHandle),
    /// Nothing to scroll horizontally.
    Static,
}

struct PinnedBuild {
    motion: MasterMotion,
    timeline: MasterTimeline,
    effects: StageEffects,
}

pub struct TimelineComposer {
    config: EngineConfig,
    generation: u64,
    layout: TrackLayout,
    build: Option<PinnedBuild>,
    scroll_target: f64,
    playhead: f64,
}

impl TimelineComposer {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            generation: 0,
            layout: TrackLayout::default(),
            build: None,
            scroll_target: 0.0,
            playhead: 0.0,
        }
    }

    /// Measures `scenes` and builds a fresh master timeline.
    ///
    /// The previous motion is released first, so handles from an earlier
    /// build never observe the new geometry.
    #[instrument(level = "debug", skip(self, scenes), fields(scenes = scenes.len()))]
    pub fn build(
        &mut self,
        scenes: &SceneRegistry,
        viewport: &Viewport,
    ) -> Result<BuildOutcome, NarrativeError> {
        self.invalidate();
        self.layout = TrackLayout::measure(scenes, viewport);
        let travel = self.layout.travel_distance(viewport);
        if travel <= 0.0 {
            info!(
                content_width = self.layout.content_width,
                viewport_width = viewport.width,
                "nothing to travel; section stays static"
            );
            return Ok(BuildOutcome::Static);
        }

        let phases = standard_phases(&self.config.phases, self.config.cover_count);
        let intro_len = (self.config.intro_viewports * viewport.height).max(0.0);
        let weight = intro_weight(&phases);
        let unit = if weight > 0.0 { intro_len / weight } else { 0.0 };
        let timeline = MasterTimeline::compile(&phases, unit, travel)?;
        let effects = StageEffects::build(
            &timeline,
            self.config.cover_count,
            self.config.phases.cover_stagger * unit,
        );

        self.generation += 1;
        let motion = MasterMotion::new(self.generation, travel, viewport.width);
        let handle = motion.handle();
        info!(
            generation = self.generation,
            travel,
            pin_length = timeline.total(),
            "master timeline built"
        );

        // A refresh jumps straight to the current scroll position.
        self.scroll_target = self.scroll_target.clamp(0.0, timeline.total());
        self.playhead = self.scroll_target;
        motion.set_progress(timeline.travel_progress(self.playhead));
        self.build = Some(PinnedBuild {
            motion,
            timeline,
            effects,
        });
        Ok(BuildOutcome::Pinned(handle))
    }

    /// Releases the current motion. Every outstanding handle goes dead.
    pub fn invalidate(&mut self) {
        if let Some(build) = self.build.take() {
            build.motion.release();
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.build.is_some()
    }

    pub fn layout(&self) -> &TrackLayout {
        &self.layout
    }

    pub fn timeline(&self) -> Option<&MasterTimeline> {
        self.build.as_ref().map(|b| &b.timeline)
    }

    /// Scroll length of the pinned region; zero when static.
    pub fn pin_length(&self) -> f64 {
        self.timeline().map(|t| t.total()).unwrap_or(0.0)
    }

    /// Sets the scroll position relative to the start of the pinned region.
    pub fn scroll_to(&mut self, position: f64) {
        self.scroll_target = position.max(0.0);
        if let Some(total) = self.timeline().map(|t| t.total()) {
            self.scroll_target = self.scroll_target.min(total);
        }
    }

    pub fn scroll_target(&self) -> f64 {
        self.scroll_target
    }

    pub fn playhead(&self) -> f64 {
        self.playhead
    }

    /// Moves the playhead towards the scroll target and updates the motion.
    ///
    /// With a lag the gap shrinks exponentially so it is mostly closed after
    /// `scrub_lag_secs`.
    pub fn advance(&mut self, dt: f64) {
        let Some(build) = self.build.as_ref() else {
            return;
        };
        self.playhead = chase(
            self.playhead,
            self.scroll_target,
            self.config.scrub_lag_secs,
            dt,
            SNAP_EPSILON,
        );
        build
            .motion
            .set_progress(build.timeline.travel_progress(self.playhead));
    }

    /// The stage snapshot at the current playhead. Scene frames are left empty.
    pub fn stage(&self) -> StageFrame {
        let Some(build) = self.build.as_ref() else {
            return StageFrame::static_frame(self.scroll_target);
        };
        let t = self.playhead;
        let travel_progress = build.timeline.travel_progress(t);
        StageFrame {
            mode: StageMode::Pinned,
            scroll: self.scroll_target,
            playhead: t,
            phase: build.timeline.phase_at(t),
            title: build.effects.title(t),
            covers: build.effects.covers(t),
            intro_visible: build.effects.intro_visible(t),
            track_offset: travel_progress.unwrap_or(0.0) * build.timeline.travel().duration,
            travel_progress,
            active_scene: None,
            scenes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Scene;
    use crate::systems::layout::SlotWidth;

    fn scenes(widths: &[f64]) -> SceneRegistry {
        let mut registry = SceneRegistry::new();
        for (i, w) in widths.iter().enumerate() {
            registry
                .register(Scene::new(format!("s{i}")).with_width(SlotWidth::Pixels(*w)))
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_degenerate_without_travel() {
        let mut composer = TimelineComposer::new(EngineConfig::immediate());
        let viewport = Viewport::new(1000.0, 800.0);
        assert!(matches!(
            composer.build(&SceneRegistry::new(), &viewport).unwrap(),
            BuildOutcome::Static
        ));
        assert!(matches!(
            composer.build(&scenes(&[600.0, 400.0]), &viewport).unwrap(),
            BuildOutcome::Static
        ));
        assert_eq!(composer.stage().mode, StageMode::Static);
        assert_eq!(composer.pin_length(), 0.0);
    }

    #[test]
    fn test_rebuild_releases_previous_motion() {
        let mut composer = TimelineComposer::new(EngineConfig::immediate());
        let viewport = Viewport::new(1000.0, 800.0);
        let registry = scenes(&[3000.0, 3000.0]);
        let BuildOutcome::Pinned(first) = composer.build(&registry, &viewport).unwrap() else {
            panic!("expected a pinned build");
        };
        let BuildOutcome::Pinned(second) = composer.build(&registry, &viewport).unwrap() else {
            panic!("expected a pinned build");
        };
        assert!(!first.is_live());
        assert!(second.is_live());
        assert!(second.generation() > first.generation());
        assert_eq!(second.travel_distance(), 5000.0);
    }

    #[test]
    fn test_scroll_maps_linearly_onto_travel() {
        let mut composer = TimelineComposer::new(EngineConfig::immediate());
        let viewport = Viewport::new(1000.0, 800.0);
        let BuildOutcome::Pinned(motion) = composer.build(&scenes(&[6000.0]), &viewport).unwrap() else {
            panic!("expected a pinned build");
        };
        let travel_start = composer.timeline().unwrap().travel().start;
        assert!((travel_start - 800.0).abs() < 1e-9);
        assert!((composer.pin_length() - 5800.0).abs() < 1e-9);

        composer.scroll_to(400.0);
        composer.advance(0.016);
        assert_eq!(motion.progress(), None);

        for step in [0.0, 1250.0, 2500.0, 5000.0] {
            composer.scroll_to(travel_start + step);
            composer.advance(0.016);
            assert!((motion.offset().unwrap() - step).abs() < 1e-6);
        }
        composer.scroll_to(1e9);
        composer.advance(0.016);
        assert_eq!(motion.offset(), Some(5000.0));
    }

    #[test]
    fn test_lagged_playhead_converges() {
        let mut composer = TimelineComposer::new(EngineConfig::default());
        let viewport = Viewport::new(1000.0, 800.0);
        composer.build(&scenes(&[6000.0]), &viewport).unwrap();
        composer.scroll_to(3000.0);
        composer.advance(0.1);
        let early = composer.playhead();
        assert!(early > 0.0 && early < 3000.0);
        for _ in 0..400 {
            composer.advance(0.016);
        }
        assert_eq!(composer.playhead(), 3000.0);
    }
}
