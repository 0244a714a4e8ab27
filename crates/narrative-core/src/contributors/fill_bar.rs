use crate::contributors::{AttachContext, Contributor, ContributorFrame, ScrubbedProgress};
use crate::trigger::{Bound, TriggerId, TriggerUpdate};
use serde::{Deserialize, Serialize};

pub const ANCHORS: [&str; 2] = ["fill", "readout"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillBarSpec {
    pub start: Bound,
    pub end: Bound,
    /// Seconds the bar trails the window progress by; zero follows it exactly.
    pub scrub_lag_secs: f64,
}

impl Default for FillBarSpec {
    /// Spans the scene's full width: left edge at viewport left to right edge
    /// at viewport right.
    fn default() -> Self {
        Self {
            start: Bound::left_at(0.0),
            end: Bound::right_at(1.0),
            scrub_lag_secs: 0.0,
        }
    }
}

/// A progress bar and its percentage readout, scrubbed across the scene.
///
/// The bar and the number share one continuous progress value; only the
/// label is rounded.
#[derive(Debug, Clone)]
pub struct FillBar {
    spec: FillBarSpec,
    trigger: Option<TriggerId>,
    progress: ScrubbedProgress,
}

impl FillBar {
    pub fn new(spec: FillBarSpec) -> Self {
        Self {
            progress: ScrubbedProgress::new(spec.scrub_lag_secs),
            spec,
            trigger: None,
        }
    }

    /// Continuous percentage in `0.0..=100.0`.
    pub fn percent(&self) -> f64 {
        (self.progress.value() * 100.0).clamp(0.0, 100.0)
    }

    pub fn label(&self) -> String {
        format!("{}%", self.percent().round() as i64)
    }
}

impl Contributor for FillBar {
    fn name(&self) -> &'static str {
        "fill_bar"
    }

    fn attach(&mut self, cx: &mut AttachContext<'_>) {
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
        ContributorFrame::FillBar {
            fill_scale: self.progress.value(),
            percent: self.percent(),
            label: self.label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(progress: f64) -> TriggerUpdate {
        TriggerUpdate {
            id: 0,
            scope: 1,
            transitions: Vec::new(),
            active: true,
            progress,
            entered_at: 1,
        }
    }

    fn at(progress: f64) -> FillBar {
        let mut bar = FillBar::new(FillBarSpec::default());
        bar.on_trigger(&update(progress));
        bar
    }

    #[test]
    fn test_label_rounds_but_progress_does_not() {
        let bar = at(0.4449);
        assert!((bar.percent() - 44.49).abs() < 1e-9);
        assert_eq!(bar.label(), "44%");
        assert_eq!(at(0.446).label(), "45%");
        assert_eq!(at(0.0).label(), "0%");
    }

    #[test]
    fn test_never_overshoots() {
        let bar = at(1.0);
        assert_eq!(bar.percent(), 100.0);
        assert_eq!(bar.label(), "100%");
        match bar.frame() {
            ContributorFrame::FillBar { fill_scale, .. } => assert_eq!(fill_scale, 1.0),
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_lagging_bar_catches_up() {
        let spec = FillBarSpec {
            scrub_lag_secs: 1.5,
            ..FillBarSpec::default()
        };
        let mut bar = FillBar::new(spec);
        bar.on_trigger(&update(0.8));
        assert_eq!(bar.percent(), 0.0);
        bar.tick(0.25);
        assert!(bar.percent() > 0.0 && bar.percent() < 80.0);
        for _ in 0..400 {
            bar.tick(0.016);
        }
        assert!((bar.percent() - 80.0).abs() < 1e-9);
        assert_eq!(bar.label(), "80%");
    }
}
