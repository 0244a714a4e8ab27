//! # Story Engine
//!
//! The host-facing entry point that ties the composer, the motion channel,
//! the trigger registry and every mounted scene together.
//!
//! ## Responsibilities
//! - **Lifecycle**: `mount`, `unmount`, `rebuild` and `shutdown` acquire and release scene runtimes.
//! - **Frame Loop**: `tick` advances the playhead, evaluates triggers and routes each update to its owner.
//! - **Media**: Forwards host notifications and reconciles playback after every rebuild.
//! - **Snapshots**: Produces one `StageFrame` per tick for the renderer.
//!
//! ## Key Types
//! - `StoryEngine`: Owns the whole section.

use crate::broadcast::ActiveSceneBroadcaster;
use crate::composer::{BuildOutcome, TimelineComposer};
use crate::config::EngineConfig;
use crate::contributors::{AttachContext, Contributor};
use crate::errors::NarrativeError;
use crate::media::{LazyMediaController, MediaBackend, MediaEvent, MediaState, MediaStats};
use crate::motion::{MotionChannel, MotionHandle};
use crate::scene::{Scene, SceneRegistry};
use crate::stage::{MediaFrame, SceneFrame, StageFrame};
use crate::systems::layout::TrackLayout;
use crate::trigger::{ScopeId, TriggerRegistry, TriggerScope, TriggerUpdate};
use crate::types::{SceneId, SceneInfo, Viewport};
use crossbeam_channel::Receiver;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Everything one mounted scene owns.
///
/// All of the scene's triggers (contributors, media, active window) are
/// created through `scope`; a single `revert` releases them.
struct SceneRuntime {
    scope: TriggerScope,
    contributors: Vec<Box<dyn Contributor>>,
    media: Vec<LazyMediaController>,
    /// Anchors were missing at the last build; no triggers were created.
    disabled: bool,
}

impl SceneRuntime {
    fn release(&mut self, registry: &mut TriggerRegistry) -> usize {
        let released = self.scope.revert(registry);
        for contributor in &mut self.contributors {
            contributor.release();
        }
        for media in &mut self.media {
            media.release_triggers();
        }
        released
    }
}

/// The scroll-synchronized narrative engine.
///
/// `StoryEngine` owns the scene registry, the timeline composer, the motion
/// channel, the trigger registry and every scene's runtime. It is driven by
/// the host: `scroll_to` on scroll input, `tick` once per frame, `resize` on
/// viewport changes and `media_event` for media notifications.
pub struct StoryEngine {
    config: EngineConfig,
    viewport: Viewport,
    backend: Arc<dyn MediaBackend>,
    scenes: SceneRegistry,
    runtimes: HashMap<SceneId, SceneRuntime>,
    composer: TimelineComposer,
    channel: MotionChannel,
    registry: TriggerRegistry,
    broadcaster: ActiveSceneBroadcaster,
    last_tick: Option<Duration>,
}

impl StoryEngine {
    /// Creates an engine with no scenes. It starts in static mode.
    pub fn new(config: EngineConfig, viewport: Viewport, backend: Arc<dyn MediaBackend>) -> Self {
        Self {
            composer: TimelineComposer::new(config.clone()),
            config,
            viewport,
            backend,
            scenes: SceneRegistry::new(),
            runtimes: HashMap::new(),
            channel: MotionChannel::new(),
            registry: TriggerRegistry::new(),
            broadcaster: ActiveSceneBroadcaster::new(),
            last_tick: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scenes(&self) -> &SceneRegistry {
        &self.scenes
    }

    pub fn layout(&self) -> &TrackLayout {
        self.composer.layout()
    }

    /// Scroll length of the pinned region; zero in static mode.
    pub fn pin_length(&self) -> f64 {
        self.composer.pin_length()
    }

    /// Scroll position at which horizontal travel begins.
    pub fn travel_start(&self) -> Option<f64> {
        self.composer.timeline().map(|t| t.travel().start)
    }

    /// Appends a scene to the end of the track and rebuilds.
    ///
    /// Media elements the backend cannot create are logged and skipped.
    #[instrument(level = "debug", skip(self, scene), fields(scene = %scene.id))]
    pub fn mount(&mut self, scene: Scene) -> Result<(), NarrativeError> {
        if self.scenes.get(&scene.id).is_some() {
            return Err(NarrativeError::DuplicateScene(scene.id));
        }
        let mut media = Vec::with_capacity(scene.media.len());
        for spec in &scene.media {
            match self.backend.create_element(&scene.id, spec) {
                Ok(element) => media.push(LazyMediaController::new(
                    scene.id.clone(),
                    spec,
                    element,
                    Duration::from_millis(self.config.play_debounce_ms),
                )),
                Err(e) => warn!(media = %spec.id, error = %e, "media element unavailable; skipped"),
            }
        }
        let runtime = SceneRuntime {
            scope: self.registry.open_scope(scene.id.clone()),
            contributors: scene.contributors.iter().map(|c| c.build()).collect(),
            media,
            disabled: false,
        };

        let id = scene.id.clone();
        let info = scene.info.clone();
        self.scenes.register(scene)?;
        self.broadcaster.set_info(&id, info);
        self.runtimes.insert(id, runtime);
        self.rebuild()
    }

    /// Removes a scene, releasing its triggers and media before it goes.
    ///
    /// The track is not re-measured until the next rebuild or resize.
    #[instrument(level = "debug", skip(self))]
    pub fn unmount(&mut self, scene_id: &str) -> Result<(), NarrativeError> {
        let mut runtime = self
            .runtimes
            .remove(scene_id)
            .ok_or_else(|| NarrativeError::UnknownScene(scene_id.to_string()))?;
        let released = runtime.release(&mut self.registry);
        for media in &mut runtime.media {
            media.detach();
        }
        self.broadcaster.forget_scene(scene_id);
        self.broadcaster.settle();
        self.scenes.remove(scene_id);
        info!(scene = scene_id, released, "scene unmounted");
        Ok(())
    }

    /// Discards every trigger and the master motion, then builds afresh.
    #[instrument(level = "debug", skip(self))]
    pub fn rebuild(&mut self) -> Result<(), NarrativeError> {
        let mut released = 0;
        for runtime in self.runtimes.values_mut() {
            released += runtime.release(&mut self.registry);
        }
        self.broadcaster.clear_triggers();
        self.channel.reset();
        self.composer.invalidate();
        debug_assert!(self.registry.is_empty());
        debug!(released, "previous build discarded");

        match self.composer.build(&self.scenes, &self.viewport)? {
            BuildOutcome::Pinned(handle) => {
                self.channel.publish(handle)?;
                self.attach_all();
            }
            BuildOutcome::Static => {}
        }

        let now = self.last_tick.unwrap_or_default();
        self.dispatch(now);
        for runtime in self.runtimes.values_mut() {
            for media in &mut runtime.media {
                media.reconcile(&self.registry, now);
            }
        }
        self.broadcaster.settle();
        Ok(())
    }

    /// Applies a new viewport. Every resize is a full rebuild.
    pub fn resize(&mut self, viewport: Viewport) -> Result<(), NarrativeError> {
        info!(width = viewport.width, height = viewport.height, "viewport resized");
        self.viewport = viewport;
        self.rebuild()
    }

    /// Sets the scroll position relative to the start of the pinned region.
    pub fn scroll_to(&mut self, position: f64) {
        self.composer.scroll_to(position);
    }

    /// Advances one frame at host time `now` and returns the stage snapshot.
    #[instrument(level = "trace", skip(self))]
    pub fn tick(&mut self, now: Duration) -> StageFrame {
        let dt = self
            .last_tick
            .map(|last| now.saturating_sub(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last_tick = Some(now);

        self.composer.advance(dt);
        self.dispatch(now);
        for runtime in self.runtimes.values_mut() {
            for media in &mut runtime.media {
                media.tick(now);
            }
            for contributor in &mut runtime.contributors {
                contributor.tick(dt);
            }
        }
        self.broadcaster.settle();
        self.frame()
    }

    /// Forwards a host media notification. Returns `false` if nothing owns
    /// the element any more; late notifications are dropped.
    pub fn media_event(&mut self, scene_id: &str, media_id: &str, event: MediaEvent) -> bool {
        match self.controller_mut(scene_id, media_id) {
            Some(controller) => {
                controller.on_event(&event);
                true
            }
            None => {
                debug!(scene = scene_id, media = media_id, ?event, "media event for detached element ignored");
                false
            }
        }
    }

    /// Receives the centered scene's metadata whenever it changes.
    pub fn subscribe_info(&mut self) -> Receiver<Option<SceneInfo>> {
        self.broadcaster.subscribe()
    }

    pub fn active_scene(&self) -> Option<&str> {
        self.broadcaster.active_scene()
    }

    pub fn current_info(&self) -> Option<&SceneInfo> {
        self.broadcaster.current()
    }

    /// Live triggers across every scene.
    pub fn trigger_count(&self) -> usize {
        self.registry.len()
    }

    pub fn scene_trigger_count(&self, scene_id: &str) -> usize {
        self.registry.count_for_scene(scene_id)
    }

    /// The published master motion, `None` in static mode.
    pub fn motion(&self) -> Option<MotionHandle> {
        self.channel.get()
    }

    pub fn media_state(&self, scene_id: &str, media_id: &str) -> Option<MediaState> {
        self.controller(scene_id, media_id).map(|c| c.state())
    }

    pub fn media_stats(&self, scene_id: &str, media_id: &str) -> Option<MediaStats> {
        self.controller(scene_id, media_id).map(|c| c.stats())
    }

    /// Tears the whole section down: every scene, every trigger, the motion.
    pub fn shutdown(&mut self) {
        let ids: Vec<SceneId> = self.scenes.iter().map(|s| s.id.clone()).collect();
        for id in ids.iter().rev() {
            if let Err(e) = self.unmount(id) {
                warn!(scene = %id, error = %e, "unmount during shutdown failed");
            }
        }
        self.channel.reset();
        self.composer.invalidate();
        self.registry.clear();
        self.broadcaster.settle();
        info!("story engine shut down");
    }

    fn attach_all(&mut self) {
        let Some(motion) = self.channel.get() else {
            return;
        };
        for scene in self.scenes.iter() {
            let Some(runtime) = self.runtimes.get_mut(&scene.id) else {
                continue;
            };
            let missing = scene.missing_anchors();
            runtime.disabled = !missing.is_empty();
            if runtime.disabled {
                for anchor in &missing {
                    warn!(
                        "{}",
                        NarrativeError::MissingAnchor {
                            scene: scene.id.clone(),
                            anchor: anchor.clone(),
                        }
                    );
                }
                warn!(scene = %scene.id, "scene triggers skipped for this build");
                continue;
            }
            let Some(slot) = self.composer.layout().slot(&scene.id) else {
                continue;
            };

            let mut cx = AttachContext::new(
                slot,
                self.viewport,
                &motion,
                &self.config,
                &mut runtime.scope,
                &mut self.registry,
            );
            for contributor in &mut runtime.contributors {
                contributor.attach(&mut cx);
            }
            for media in &mut runtime.media {
                media.attach(&mut cx);
            }
            self.broadcaster.register(&mut cx);
            debug!(
                scene = %scene.id,
                triggers = runtime.scope.len(),
                "scene attached"
            );
        }
    }

    /// Evaluates every trigger once and routes updates to their owners.
    fn dispatch(&mut self, now: Duration) {
        let updates = self.registry.evaluate();
        if updates.is_empty() {
            return;
        }
        let owners: HashMap<ScopeId, SceneId> = self
            .runtimes
            .iter()
            .map(|(id, rt)| (rt.scope.id(), id.clone()))
            .collect();
        for update in &updates {
            let Some(runtime) = owners
                .get(&update.scope)
                .and_then(|id| self.runtimes.get_mut(id))
            else {
                continue;
            };
            route(runtime, &mut self.broadcaster, update, now);
        }
    }

    fn frame(&self) -> StageFrame {
        let mut frame = self.composer.stage();
        frame.active_scene = self.broadcaster.active_scene().map(str::to_string);
        frame.scenes = self
            .scenes
            .iter()
            .filter_map(|scene| {
                let runtime = self.runtimes.get(&scene.id)?;
                Some(SceneFrame {
                    id: scene.id.clone(),
                    disabled: runtime.disabled,
                    contributors: runtime.contributors.iter().map(|c| c.frame()).collect(),
                    media: runtime
                        .media
                        .iter()
                        .map(|m| MediaFrame {
                            id: m.media_id().to_string(),
                            state: m.state(),
                        })
                        .collect(),
                })
            })
            .collect();
        frame
    }

    fn controller(&self, scene_id: &str, media_id: &str) -> Option<&LazyMediaController> {
        self.runtimes
            .get(scene_id)?
            .media
            .iter()
            .find(|m| m.media_id() == media_id)
    }

    fn controller_mut(&mut self, scene_id: &str, media_id: &str) -> Option<&mut LazyMediaController> {
        self.runtimes
            .get_mut(scene_id)?
            .media
            .iter_mut()
            .find(|m| m.media_id() == media_id)
    }
}

fn route(
    runtime: &mut SceneRuntime,
    broadcaster: &mut ActiveSceneBroadcaster,
    update: &TriggerUpdate,
    now: Duration,
) {
    if broadcaster.owns(update.id) {
        broadcaster.on_trigger(update);
        return;
    }
    if let Some(media) = runtime.media.iter_mut().find(|m| m.owns(update.id)) {
        media.on_trigger(update, now);
        return;
    }
    if let Some(contributor) = runtime.contributors.iter_mut().find(|c| c.owns(update.id)) {
        contributor.on_trigger(update);
    }
}
