use crate::animation::{Animated, EasingType, Playhead};
use crate::contributors::{AttachContext, Contributor, ContributorFrame, TargetFrame};
use crate::trigger::{Bound, ToggleAction, ToggleActions, TriggerId, TriggerUpdate};
use crate::types::Visual;
use serde::{Deserialize, Serialize};
use tracing::trace;

fn default_duration() -> f64 {
    1.0
}

fn default_rise() -> f64 {
    50.0
}

fn default_count() -> usize {
    1
}

fn default_scale() -> f64 {
    1.0
}

/// One group of elements revealed by a `FadeRise` timeline.
///
/// Element `i` of the group starts at `at_secs + i * stagger_secs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevealTrack {
    pub anchor: String,
    #[serde(default = "default_count")]
    pub count: usize,
    /// Position of the group on the contributor's timeline.
    #[serde(default)]
    pub at_secs: f64,
    #[serde(default = "default_duration")]
    pub duration_secs: f64,
    #[serde(default = "default_rise")]
    pub rise_px: f64,
    /// Scale each element grows from.
    #[serde(default = "default_scale")]
    pub from_scale: f64,
    #[serde(default)]
    pub stagger_secs: f64,
}

impl RevealTrack {
    pub fn new(anchor: impl Into<String>) -> Self {
        Self {
            anchor: anchor.into(),
            count: default_count(),
            at_secs: 0.0,
            duration_secs: default_duration(),
            rise_px: default_rise(),
            from_scale: default_scale(),
            stagger_secs: 0.0,
        }
    }

    pub fn at(mut self, secs: f64) -> Self {
        self.at_secs = secs;
        self
    }

    pub fn lasting(mut self, secs: f64) -> Self {
        self.duration_secs = secs;
        self
    }

    pub fn rising(mut self, px: f64) -> Self {
        self.rise_px = px;
        self
    }

    pub fn repeated(mut self, count: usize, stagger_secs: f64) -> Self {
        self.count = count;
        self.stagger_secs = stagger_secs;
        self
    }

    pub fn scaled_from(mut self, scale: f64) -> Self {
        self.from_scale = scale;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FadeRiseSpec {
    /// Element that fades in. With explicit `tracks` it only names the group.
    pub anchor: String,
    /// Defaults to the engine's `reveal_start`.
    #[serde(default)]
    pub start: Option<Bound>,
    /// Defaults to the element's right edge at the viewport's left edge.
    #[serde(default)]
    pub end: Option<Bound>,
    #[serde(default)]
    pub toggle_actions: ToggleActions,
    #[serde(default = "default_duration")]
    pub duration_secs: f64,
    #[serde(default = "default_rise")]
    pub rise_px: f64,
    /// Element groups on one shared timeline. Empty means `anchor` alone.
    #[serde(default)]
    pub tracks: Vec<RevealTrack>,
}

impl FadeRiseSpec {
    pub fn new(anchor: impl Into<String>) -> Self {
        Self {
            anchor: anchor.into(),
            start: None,
            end: None,
            toggle_actions: ToggleActions::default(),
            duration_secs: default_duration(),
            rise_px: default_rise(),
            tracks: Vec::new(),
        }
    }

    pub fn with_window(mut self, start: Bound, end: Bound) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn with_toggle_actions(mut self, actions: ToggleActions) -> Self {
        self.toggle_actions = actions;
        self
    }

    pub fn with_track(mut self, track: RevealTrack) -> Self {
        self.tracks.push(track);
        self
    }

    /// The groups this contributor animates.
    pub fn resolved_tracks(&self) -> Vec<RevealTrack> {
        if self.tracks.is_empty() {
            vec![RevealTrack::new(self.anchor.clone())
                .lasting(self.duration_secs)
                .rising(self.rise_px)]
        } else {
            self.tracks.clone()
        }
    }

    /// Anchors the scene must expose.
    pub fn anchors(&self) -> Vec<String> {
        let mut anchors = vec![self.anchor.clone()];
        for track in &self.tracks {
            if !anchors.contains(&track.anchor) {
                anchors.push(track.anchor.clone());
            }
        }
        anchors
    }
}

#[derive(Debug, Clone)]
struct RevealTarget {
    anchor: String,
    index: usize,
    opacity: Animated<f32>,
    offset_y: Animated<f32>,
    scale: Animated<f32>,
}

impl RevealTarget {
    fn new(track: &RevealTrack, index: usize) -> Self {
        let delay = (track.at_secs + track.stagger_secs * index as f64).max(0.0);
        let duration = track.duration_secs.max(0.0);
        let ease = EasingType::EaseOut;
        Self {
            anchor: track.anchor.clone(),
            index,
            opacity: Animated::from_to(0.0, 1.0, delay, duration, ease),
            offset_y: Animated::from_to(track.rise_px as f32, 0.0, delay, duration, ease),
            scale: Animated::from_to(track.from_scale as f32, 1.0, delay, duration, ease),
        }
    }

    fn end(&self) -> f64 {
        self.opacity.duration()
    }

    fn visual(&self, t: f64) -> Visual {
        Visual {
            opacity: self.opacity.sample(t),
            offset_y: self.offset_y.sample(t),
            scale: self.scale.sample(t),
            ..Visual::identity()
        }
    }
}

/// Fades groups of elements in while they rise (and optionally grow) into
/// place, each group at its own offset on one timeline.
///
/// Not scrubbed: trigger crossings pick a toggle action and the timeline then
/// runs on the frame clock.
#[derive(Debug, Clone)]
pub struct FadeRise {
    spec: FadeRiseSpec,
    trigger: Option<TriggerId>,
    playhead: Playhead,
    targets: Vec<RevealTarget>,
}

impl FadeRise {
    pub fn new(spec: FadeRiseSpec) -> Self {
        let targets: Vec<RevealTarget> = spec
            .resolved_tracks()
            .iter()
            .flat_map(|track| (0..track.count).map(move |i| RevealTarget::new(track, i)))
            .collect();
        let duration = targets.iter().map(RevealTarget::end).fold(0.0, f64::max);
        Self {
            playhead: Playhead::new(duration),
            targets,
            trigger: None,
            spec,
        }
    }

    pub fn playhead(&self) -> &Playhead {
        &self.playhead
    }

    fn apply(&mut self, action: ToggleAction) {
        match action {
            ToggleAction::Play => self.playhead.play(),
            ToggleAction::Pause => self.playhead.pause(),
            ToggleAction::Resume => self.playhead.resume(),
            ToggleAction::Reverse => self.playhead.reverse(),
            ToggleAction::Restart => self.playhead.restart(),
            ToggleAction::Reset => self.playhead.reset(),
            ToggleAction::Complete => self.playhead.complete(),
            ToggleAction::None => {}
        }
    }
}

impl Contributor for FadeRise {
    fn name(&self) -> &'static str {
        "fade_rise"
    }

    fn attach(&mut self, cx: &mut AttachContext<'_>) {
        let start = self.spec.start.unwrap_or(cx.config.reveal_start);
        let end = self.spec.end.unwrap_or(Bound::right_at(0.0));
        self.trigger = Some(cx.create_trigger(&start, &end));
    }

    /// Reverting also puts every element back in its initial state.
    fn release(&mut self) {
        self.trigger = None;
        self.playhead.reset();
    }

    fn owns(&self, id: TriggerId) -> bool {
        self.trigger == Some(id)
    }

    fn on_trigger(&mut self, update: &TriggerUpdate) {
        for transition in &update.transitions {
            let action = self.spec.toggle_actions.action_for(*transition);
            trace!(anchor = %self.spec.anchor, ?transition, %action, "toggle action");
            self.apply(action);
        }
    }

    fn tick(&mut self, dt: f64) {
        self.playhead.advance(dt);
    }

    fn frame(&self) -> ContributorFrame {
        let t = self.playhead.time();
        let targets: Vec<TargetFrame> = self
            .targets
            .iter()
            .map(|target| TargetFrame {
                anchor: target.anchor.clone(),
                index: target.index,
                visual: target.visual(t),
            })
            .collect();
        ContributorFrame::FadeRise {
            anchor: self.spec.anchor.clone(),
            visual: targets.first().map(|f| f.visual).unwrap_or_else(Visual::hidden),
            targets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::TriggerTransition;

    fn update(transitions: Vec<TriggerTransition>) -> TriggerUpdate {
        TriggerUpdate {
            id: 0,
            scope: 1,
            active: transitions.last().is_some_and(|t| t.activates()),
            transitions,
            progress: 0.0,
            entered_at: 1,
        }
    }

    fn visual(fx: &FadeRise) -> Visual {
        match fx.frame() {
            ContributorFrame::FadeRise { visual, .. } => visual,
            other => panic!("unexpected frame {:?}", other),
        }
    }

    fn targets(fx: &FadeRise) -> Vec<TargetFrame> {
        match fx.frame() {
            ContributorFrame::FadeRise { targets, .. } => targets,
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_play_on_enter_reverse_on_leave_back() {
        let mut fx = FadeRise::new(FadeRiseSpec::new("headline"));
        assert!(visual(&fx).opacity.abs() < 1e-4);
        assert!((visual(&fx).offset_y - 50.0).abs() < 1e-4);

        fx.on_trigger(&update(vec![TriggerTransition::Enter]));
        fx.tick(0.5);
        let mid = visual(&fx);
        assert!(mid.opacity > 0.0 && mid.opacity < 1.0);
        fx.tick(1.0);
        assert!((visual(&fx).opacity - 1.0).abs() < 1e-4);

        // "none" on leave: stays revealed.
        fx.on_trigger(&update(vec![TriggerTransition::Leave]));
        fx.tick(1.0);
        assert!((visual(&fx).opacity - 1.0).abs() < 1e-4);

        fx.on_trigger(&update(vec![TriggerTransition::EnterBack, TriggerTransition::LeaveBack]));
        fx.tick(2.0);
        assert!(visual(&fx).opacity.abs() < 1e-4);
    }

    #[test]
    fn test_play_reverse_play_reverse() {
        let actions: ToggleActions = "play reverse play reverse".parse().unwrap();
        let mut fx = FadeRise::new(FadeRiseSpec::new("grid").with_toggle_actions(actions));
        fx.on_trigger(&update(vec![TriggerTransition::Enter]));
        fx.tick(1.0);
        fx.on_trigger(&update(vec![TriggerTransition::Leave]));
        fx.tick(0.25);
        let v = visual(&fx);
        assert!(v.opacity < 1.0 && v.opacity > 0.0);
        fx.tick(1.0);
        assert!(visual(&fx).opacity.abs() < 1e-4);
    }

    /// Image grid with staggered scale-in, then three text lines at fixed offsets.
    fn terraces() -> FadeRiseSpec {
        FadeRiseSpec::new("terraces")
            .with_track(RevealTrack::new("image").lasting(1.2).rising(20.0).scaled_from(0.95).repeated(4, 0.05))
            .with_track(RevealTrack::new("title").at(0.2).rising(30.0))
            .with_track(RevealTrack::new("subtitle").at(0.4).lasting(0.8).rising(20.0))
            .with_track(RevealTrack::new("description").at(0.6).lasting(0.8).rising(10.0))
    }

    #[test]
    fn test_tracks_share_one_timeline() {
        let fx = FadeRise::new(terraces());
        assert_eq!(targets(&fx).len(), 7);
        // Last image ends at 0.15 + 1.2; the description at 0.6 + 0.8.
        assert!((fx.playhead().progress() - 0.0).abs() < 1e-9);
        let mut done = fx.clone();
        done.playhead.complete();
        assert!((done.playhead().time() - 1.4).abs() < 1e-9);
        assert_eq!(
            terraces().anchors(),
            vec!["terraces", "image", "title", "subtitle", "description"]
        );

        let start = targets(&fx);
        assert!((start[0].visual.scale - 0.95).abs() < 1e-6);
        assert!((start[4].visual.offset_y - 30.0).abs() < 1e-4);
        assert!((start[4].visual.scale - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_stagger_and_offsets_order_the_reveal() {
        let mut fx = FadeRise::new(terraces());
        fx.on_trigger(&update(vec![TriggerTransition::Enter]));
        fx.tick(0.1);
        let t = targets(&fx);
        assert!(t[0].visual.opacity > t[1].visual.opacity);
        assert!(t[1].visual.opacity > t[2].visual.opacity);
        assert_eq!(t[3].index, 3);
        assert!(t[3].visual.opacity.abs() < 1e-6);
        // Text has not started yet.
        assert!(t[4].visual.opacity.abs() < 1e-6);

        fx.tick(0.2);
        let t = targets(&fx);
        assert!(t[4].visual.opacity > 0.0);
        assert!(t[5].visual.opacity.abs() < 1e-6);
        assert!(t[6].visual.opacity.abs() < 1e-6);

        fx.tick(2.0);
        for target in targets(&fx) {
            assert!((target.visual.opacity - 1.0).abs() < 1e-4);
            assert!((target.visual.scale - 1.0).abs() < 1e-4);
            assert!(target.visual.offset_y.abs() < 1e-3);
        }

        // Reversing runs the same timeline backwards: text hides first.
        fx.on_trigger(&update(vec![TriggerTransition::LeaveBack]));
        fx.tick(0.9);
        let t = targets(&fx);
        assert!(t[6].visual.opacity.abs() < 1e-6);
        assert!(t[0].visual.opacity > 0.0);
    }
}
