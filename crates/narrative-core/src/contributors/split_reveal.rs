use crate::animation::{Animated, EasingType};
use crate::contributors::{AttachContext, Contributor, ContributorFrame, ScrubbedProgress};
use crate::trigger::{Bound, TriggerId, TriggerUpdate};
use crate::types::Visual;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const ANCHORS: [&str; 3] = ["split-left", "split-right", "split-media"];

/// Local timeline length: the halves take 1.0, the media 1.2.
const HALVES_DURATION: f64 = 1.0;
const MEDIA_DURATION: f64 = 1.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitRevealSpec {
    pub start: Bound,
    pub end: Bound,
    /// Seconds the reveal trails the window progress by.
    pub scrub_lag_secs: f64,
}

impl Default for SplitRevealSpec {
    /// From the scene entering on the right to it leaving on the left.
    fn default() -> Self {
        Self {
            start: Bound::left_at(1.0),
            end: Bound::right_at(0.0),
            scrub_lag_secs: 0.0,
        }
    }
}

/// Two label halves slide apart symmetrically while the media between them
/// scales in. Scrubbed: the sub-timeline position is the window progress.
#[derive(Debug, Clone)]
pub struct SplitReveal {
    spec: SplitRevealSpec,
    trigger: Option<TriggerId>,
    progress: ScrubbedProgress,
    spread: f32,
    left_x: Animated<f32>,
    right_x: Animated<f32>,
    media_scale: Animated<f32>,
}

impl SplitReveal {
    pub fn new(spec: SplitRevealSpec) -> Self {
        let mut reveal = Self {
            progress: ScrubbedProgress::new(spec.scrub_lag_secs),
            spec,
            trigger: None,
            spread: 0.0,
            left_x: Animated::new(0.0),
            right_x: Animated::new(0.0),
            media_scale: Animated::new(0.0),
        };
        reveal.build_tracks(0.0);
        reveal
    }

    /// Per-half travel in pixels for the current viewport.
    pub fn spread(&self) -> f32 {
        self.spread
    }

    fn build_tracks(&mut self, spread: f32) {
        self.spread = spread;
        self.left_x = Animated::from_to(0.0, -spread, 0.0, HALVES_DURATION, EasingType::EaseInOut);
        self.right_x = Animated::from_to(0.0, spread, 0.0, HALVES_DURATION, EasingType::EaseInOut);
        self.media_scale = Animated::from_to(0.0, 1.0, 0.0, MEDIA_DURATION, EasingType::EaseOut);
    }
}

impl Contributor for SplitReveal {
    fn name(&self) -> &'static str {
        "split_reveal"
    }

    fn attach(&mut self, cx: &mut AttachContext<'_>) {
        let spread = cx.config.split.spread_px(cx.viewport.width) as f32;
        debug!(scene = cx.scene_id(), spread, "split reveal attached");
        self.build_tracks(spread);
        self.progress.reset();
        self.trigger = Some(cx.create_trigger(&self.spec.start, &self.spec.end));
    }

    fn release(&mut self) {
        self.trigger = None;
    }

    fn owns(&self, id: TriggerId) -> bool {
        self.trigger == Some(id)
    }

    fn on_trigger(&mut self, update: &TriggerUpdate) {
        self.progress.set_target(update.progress);
    }

    fn tick(&mut self, dt: f64) {
        self.progress.tick(dt);
    }

    fn frame(&self) -> ContributorFrame {
        let t = self.progress.value() * HALVES_DURATION.max(MEDIA_DURATION);
        let scale = self.media_scale.sample(t);
        ContributorFrame::SplitReveal {
            left: Visual {
                offset_x: self.left_x.sample(t),
                ..Visual::identity()
            },
            right: Visual {
                offset_x: self.right_x.sample(t),
                ..Visual::identity()
            },
            media: Visual {
                opacity: scale,
                scale,
                ..Visual::identity()
            },
        }
    }
}
