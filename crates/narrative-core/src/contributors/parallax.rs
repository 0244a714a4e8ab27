use crate::contributors::{AttachContext, Contributor, ContributorFrame, ScrubbedProgress};
use crate::trigger::{Bound, TriggerId, TriggerUpdate};
use serde::{Deserialize, Serialize};
use tracing::debug;

fn default_count() -> usize {
    1
}

fn default_amplitude() -> f64 {
    5.0
}

fn default_start() -> Bound {
    Bound::left_at(1.0)
}

fn default_end() -> Bound {
    Bound::right_at(0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallaxSpec {
    /// Anchor shared by the repeated elements.
    pub anchor: String,
    #[serde(default = "default_count")]
    pub count: usize,
    /// Drift at the end of the window, in percent of the element height.
    #[serde(default = "default_amplitude")]
    pub amplitude_pct: f64,
    #[serde(default = "default_start")]
    pub start: Bound,
    #[serde(default = "default_end")]
    pub end: Bound,
    #[serde(default)]
    pub scrub_lag_secs: f64,
}

impl ParallaxSpec {
    pub fn new(anchor: impl Into<String>, count: usize) -> Self {
        Self {
            anchor: anchor.into(),
            count,
            amplitude_pct: default_amplitude(),
            start: default_start(),
            end: default_end(),
            scrub_lag_secs: 0.0,
        }
    }
}

/// Repeated elements drift vertically while the scene crosses the viewport,
/// even ones down and odd ones up. Linear and scrubbed.
#[derive(Debug, Clone)]
pub struct Parallax {
    spec: ParallaxSpec,
    trigger: Option<TriggerId>,
    progress: ScrubbedProgress,
}

impl Parallax {
    pub fn new(spec: ParallaxSpec) -> Self {
        Self {
            progress: ScrubbedProgress::new(spec.scrub_lag_secs),
            spec,
            trigger: None,
        }
    }

    pub fn offsets_pct(&self) -> Vec<f64> {
        let drift = self.spec.amplitude_pct * self.progress.value();
        (0..self.spec.count)
            .map(|i| if i % 2 == 0 { drift } else { -drift })
            .collect()
    }
}

impl Contributor for Parallax {
    fn name(&self) -> &'static str {
        "parallax"
    }

    fn attach(&mut self, cx: &mut AttachContext<'_>) {
        debug!(scene = cx.scene_id(), count = self.spec.count, "parallax attached");
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
        ContributorFrame::Parallax {
            anchor: self.spec.anchor.clone(),
            offsets_pct: self.offsets_pct(),
        }
    }
}
