use crate::contributors::AttachContext;
use crate::media::{Debouncer, MediaElement, MediaEvent, MediaSpec};
use crate::trigger::{TriggerId, TriggerRegistry, TriggerUpdate};
use crate::types::{MediaId, SceneId};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Load/playback state of one media element.
///
/// Loading only moves forward. `ReadyPlaying` is only reachable from a ready
/// state, so nothing plays before it has loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MediaState {
    Unloaded,
    Loading,
    ReadyPaused,
    ReadyPlaying,
}

impl MediaState {
    pub fn is_ready(&self) -> bool {
        matches!(self, MediaState::ReadyPaused | MediaState::ReadyPlaying)
    }
}

/// Calls issued against the element over the controller's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MediaStats {
    pub loads: u32,
    pub plays: u32,
    pub pauses: u32,
    pub failures: u32,
}

/// Drives one media element from a wide pre-load window and a narrow
/// playback window.
#[derive(Debug)]
pub struct LazyMediaController {
    scene_id: SceneId,
    media_id: MediaId,
    source: String,
    element: Option<Box<dyn MediaElement>>,
    state: MediaState,
    load_issued: bool,
    /// A play intent is waiting for the element to report readiness.
    pending_play: bool,
    preload_trigger: Option<TriggerId>,
    playback_trigger: Option<TriggerId>,
    debounce: Debouncer<bool>,
    stats: MediaStats,
}

impl LazyMediaController {
    pub fn new(
        scene_id: impl Into<SceneId>,
        spec: &MediaSpec,
        element: Box<dyn MediaElement>,
        debounce: Duration,
    ) -> Self {
        Self {
            scene_id: scene_id.into(),
            media_id: spec.id.clone(),
            source: spec.source.clone(),
            element: Some(element),
            state: MediaState::Unloaded,
            load_issued: false,
            pending_play: false,
            preload_trigger: None,
            playback_trigger: None,
            debounce: Debouncer::new(debounce),
            stats: MediaStats::default(),
        }
    }

    pub fn scene_id(&self) -> &str {
        &self.scene_id
    }

    pub fn media_id(&self) -> &str {
        &self.media_id
    }

    pub fn state(&self) -> MediaState {
        self.state
    }

    pub fn stats(&self) -> MediaStats {
        self.stats
    }

    pub fn is_attached(&self) -> bool {
        self.element.is_some()
    }

    /// Registers the pre-load and playback windows against the master motion.
    pub fn attach(&mut self, cx: &mut AttachContext<'_>) {
        if self.element.is_none() {
            return;
        }
        let preload = cx.config.preload_window;
        let playback = cx.config.playback_window;
        self.preload_trigger = Some(cx.create_trigger(&preload.start, &preload.end));
        self.playback_trigger = Some(cx.create_trigger(&playback.start, &playback.end));
    }

    /// Forgets trigger ids and any unsettled intent. The scope that created
    /// the triggers is responsible for releasing them.
    pub fn release_triggers(&mut self) {
        self.preload_trigger = None;
        self.playback_trigger = None;
        self.debounce.cancel();
        self.pending_play = false;
    }

    pub fn owns(&self, id: TriggerId) -> bool {
        self.preload_trigger == Some(id) || self.playback_trigger == Some(id)
    }

    /// Reacts to a trigger update for one of this controller's windows.
    pub fn on_trigger(&mut self, update: &TriggerUpdate, now: Duration) {
        if Some(update.id) == self.preload_trigger
            && update.transitions.iter().any(|t| t.activates())
        {
            self.ensure_loaded();
        }
        if Some(update.id) == self.playback_trigger && !update.transitions.is_empty() {
            debug!(
                scene = %self.scene_id,
                media = %self.media_id,
                active = update.active,
                "playback intent"
            );
            self.debounce.push(update.active, now);
        }
    }

    /// Queues a pause when playback is running outside a freshly built
    /// playback window that reported no crossing.
    pub fn reconcile(&mut self, registry: &TriggerRegistry, now: Duration) {
        let Some(id) = self.playback_trigger else {
            return;
        };
        let active = registry.get(id).is_some_and(|t| t.is_active());
        if !active && self.state == MediaState::ReadyPlaying && !self.debounce.is_pending() {
            self.debounce.push(false, now);
        }
    }

    /// Applies a settled intent and promotes readiness discovered by probing.
    pub fn tick(&mut self, now: Duration) {
        if self.state == MediaState::Loading {
            let ready = self
                .element
                .as_ref()
                .is_some_and(|e| e.ready_state().can_play());
            if ready {
                self.become_ready();
            }
        }
        if let Some(play) = self.debounce.poll(now) {
            self.settle(play);
        }
    }

    /// Handles a host notification for this element.
    pub fn on_event(&mut self, event: &MediaEvent) {
        match event {
            MediaEvent::CanPlay => {
                if self.state == MediaState::Loading {
                    self.become_ready();
                }
            }
            MediaEvent::Error(message) => {
                warn!(
                    scene = %self.scene_id,
                    media = %self.media_id,
                    error = %message,
                    "media failed; scene continues without it"
                );
                self.stats.failures += 1;
                self.state = MediaState::Unloaded;
                self.pending_play = false;
            }
        }
    }

    /// Pauses if needed and drops the element. The controller never touches
    /// it again.
    pub fn detach(&mut self) {
        if self.state == MediaState::ReadyPlaying {
            if let Some(element) = self.element.as_mut() {
                element.pause();
                self.stats.pauses += 1;
            }
            self.state = MediaState::ReadyPaused;
        }
        self.release_triggers();
        self.element = None;
    }

    #[instrument(level = "debug", skip(self), fields(scene = %self.scene_id, media = %self.media_id))]
    fn ensure_loaded(&mut self) {
        if self.load_issued {
            return;
        }
        let Some(element) = self.element.as_mut() else {
            return;
        };
        self.load_issued = true;
        self.stats.loads += 1;
        match element.load(&self.source) {
            Ok(()) => {
                debug!(source = %self.source, "media load started");
                self.state = MediaState::Loading;
                if element.ready_state().can_play() {
                    self.become_ready();
                }
            }
            Err(e) => {
                warn!(source = %self.source, error = %e, "media load failed");
                self.stats.failures += 1;
                self.state = MediaState::Unloaded;
            }
        }
    }

    fn become_ready(&mut self) {
        self.state = MediaState::ReadyPaused;
        if self.pending_play {
            self.pending_play = false;
            self.start_playback();
        }
    }

    fn settle(&mut self, play: bool) {
        if play {
            match self.state {
                MediaState::Unloaded => {
                    debug!(scene = %self.scene_id, media = %self.media_id, "play skipped; media not loaded");
                }
                MediaState::Loading => {
                    // One deferred play, issued when readiness is reported.
                    self.pending_play = true;
                }
                MediaState::ReadyPaused => self.start_playback(),
                MediaState::ReadyPlaying => {
                    debug!(scene = %self.scene_id, media = %self.media_id, "already playing");
                }
            }
        } else {
            self.pending_play = false;
            if matches!(self.state, MediaState::Loading) || self.state.is_ready() {
                if let Some(element) = self.element.as_mut() {
                    element.pause();
                    self.stats.pauses += 1;
                }
                if self.state == MediaState::ReadyPlaying {
                    self.state = MediaState::ReadyPaused;
                }
            }
        }
    }

    fn start_playback(&mut self) {
        let Some(element) = self.element.as_mut() else {
            return;
        };
        self.stats.plays += 1;
        match element.play() {
            Ok(()) => self.state = MediaState::ReadyPlaying,
            Err(e) => {
                warn!(scene = %self.scene_id, media = %self.media_id, error = %e, "play rejected");
                self.stats.failures += 1;
                self.state = MediaState::ReadyPaused;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::ReadyState;
    use anyhow::anyhow;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct Calls {
        loads: u32,
        plays: u32,
        pauses: u32,
        ready: Option<ReadyState>,
    }

    #[derive(Debug)]
    struct FakeElement {
        calls: Arc<Mutex<Calls>>,
        fail_load: bool,
    }

    impl MediaElement for FakeElement {
        fn load(&mut self, _source: &str) -> anyhow::Result<()> {
            self.calls.lock().unwrap().loads += 1;
            if self.fail_load {
                Err(anyhow!("404"))
            } else {
                Ok(())
            }
        }
        fn ready_state(&self) -> ReadyState {
            self.calls.lock().unwrap().ready.unwrap_or(ReadyState::HaveNothing)
        }
        fn play(&mut self) -> anyhow::Result<()> {
            self.calls.lock().unwrap().plays += 1;
            Ok(())
        }
        fn pause(&mut self) {
            self.calls.lock().unwrap().pauses += 1;
        }
    }

    fn controller(fail_load: bool) -> (LazyMediaController, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let element = FakeElement {
            calls: calls.clone(),
            fail_load,
        };
        let spec = MediaSpec::new("clip", "/videos/clip.mp4");
        let mut c = LazyMediaController::new("scene", &spec, Box::new(element), Duration::from_millis(100));
        c.preload_trigger = Some(0);
        c.playback_trigger = Some(1);
        (c, calls)
    }

    fn update(id: TriggerId, active: bool) -> TriggerUpdate {
        use crate::trigger::TriggerTransition::*;
        TriggerUpdate {
            id,
            scope: 1,
            transitions: vec![if active { Enter } else { Leave }],
            active,
            progress: 0.0,
            entered_at: 0,
        }
    }

    #[test]
    fn test_load_is_issued_once() {
        let (mut c, calls) = controller(false);
        c.on_trigger(&update(0, true), Duration::ZERO);
        c.on_trigger(&update(0, false), Duration::ZERO);
        c.on_trigger(&update(0, true), Duration::ZERO);
        assert_eq!(calls.lock().unwrap().loads, 1);
        assert_eq!(c.state(), MediaState::Loading);
    }

    #[test]
    fn test_play_waits_for_readiness() {
        let (mut c, calls) = controller(false);
        let ms = Duration::from_millis;
        c.on_trigger(&update(0, true), ms(0));
        c.on_trigger(&update(1, true), ms(0));
        c.tick(ms(150));
        assert_eq!(calls.lock().unwrap().plays, 0);

        c.on_event(&MediaEvent::CanPlay);
        c.on_event(&MediaEvent::CanPlay);
        assert_eq!(calls.lock().unwrap().plays, 1);
        assert_eq!(c.state(), MediaState::ReadyPlaying);
    }

    #[test]
    fn test_failed_load_skips_playback() {
        let (mut c, calls) = controller(true);
        let ms = Duration::from_millis;
        c.on_trigger(&update(0, true), ms(0));
        c.on_trigger(&update(1, true), ms(0));
        c.tick(ms(200));
        assert_eq!(c.state(), MediaState::Unloaded);
        assert_eq!(calls.lock().unwrap().plays, 0);
        assert_eq!(c.stats().failures, 1);

        c.on_trigger(&update(0, true), ms(300));
        assert_eq!(calls.lock().unwrap().loads, 1);
    }

    #[test]
    fn test_repeated_play_intent_is_absorbed() {
        let (mut c, calls) = controller(false);
        calls.lock().unwrap().ready = Some(ReadyState::HaveEnoughData);
        let ms = Duration::from_millis;
        c.on_trigger(&update(0, true), ms(0));
        c.on_trigger(&update(1, true), ms(0));
        c.tick(ms(100));
        assert_eq!(c.state(), MediaState::ReadyPlaying);

        c.release_triggers();
        c.playback_trigger = Some(1);
        c.on_trigger(&update(1, true), ms(200));
        c.tick(ms(300));
        assert_eq!(calls.lock().unwrap().plays, 1);
        assert_eq!(c.stats().plays, 1);
        assert_eq!(c.state(), MediaState::ReadyPlaying);
    }

    #[test]
    fn test_detach_drops_element() {
        let (mut c, calls) = controller(false);
        calls.lock().unwrap().ready = Some(ReadyState::HaveEnoughData);
        let ms = Duration::from_millis;
        c.on_trigger(&update(0, true), ms(0));
        c.on_trigger(&update(1, true), ms(0));
        c.tick(ms(100));
        assert_eq!(c.state(), MediaState::ReadyPlaying);

        c.detach();
        assert!(!c.is_attached());
        assert_eq!(calls.lock().unwrap().pauses, 1);
        c.on_trigger(&update(1, false), ms(200));
        c.tick(ms(400));
        assert_eq!(calls.lock().unwrap().pauses, 1);
    }
}
