//! A media backend with no playback surface.
//!
//! Every call is appended to a shared log so simulations and tests can assert
//! on exactly what the engine asked for.

use crate::media::{MediaBackend, MediaElement, MediaSpec, ReadyState};
use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCallKind {
    Load(String),
    Play,
    Pause,
}

/// One call issued against a headless element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCall {
    pub scene: String,
    pub media: String,
    pub kind: MediaCallKind,
}

#[derive(Debug, Default)]
struct BackendState {
    calls: Vec<MediaCall>,
    ready: HashMap<(String, String), ReadyState>,
    failing_sources: HashSet<String>,
}

/// Records calls and reports configurable ready states.
#[derive(Debug, Clone)]
pub struct HeadlessMediaBackend {
    state: Arc<Mutex<BackendState>>,
    /// Ready state reported right after a successful load.
    ready_after_load: ReadyState,
}

impl Default for HeadlessMediaBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessMediaBackend {
    /// Elements become playable as soon as their source is assigned.
    pub fn new() -> Self {
        Self::with_ready_after_load(ReadyState::HaveEnoughData)
    }

    /// Elements report `ready` after load until changed with `set_ready_state`.
    pub fn with_ready_after_load(ready: ReadyState) -> Self {
        Self {
            state: Arc::new(Mutex::new(BackendState::default())),
            ready_after_load: ready,
        }
    }

    /// Makes loads of `source` fail.
    pub fn fail_source(&self, source: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_sources.insert(source.into());
        }
    }

    pub fn set_ready_state(&self, scene: &str, media: &str, ready: ReadyState) {
        if let Ok(mut state) = self.state.lock() {
            state.ready.insert((scene.to_string(), media.to_string()), ready);
        }
    }

    /// Every call so far, in issue order.
    pub fn calls(&self) -> Vec<MediaCall> {
        self.state
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    pub fn calls_for(&self, scene: &str, media: &str) -> Vec<MediaCallKind> {
        self.calls()
            .into_iter()
            .filter(|c| c.scene == scene && c.media == media)
            .map(|c| c.kind)
            .collect()
    }

    pub fn count(&self, scene: &str, media: &str, pred: impl Fn(&MediaCallKind) -> bool) -> usize {
        self.calls_for(scene, media).iter().filter(|k| pred(k)).count()
    }

    pub fn clear_calls(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.calls.clear();
        }
    }
}

impl MediaBackend for HeadlessMediaBackend {
    fn create_element(&self, scene_id: &str, spec: &MediaSpec) -> Result<Box<dyn MediaElement>> {
        Ok(Box::new(HeadlessElement {
            scene: scene_id.to_string(),
            media: spec.id.clone(),
            loaded: false,
            ready_after_load: self.ready_after_load,
            state: self.state.clone(),
        }))
    }
}

#[derive(Debug)]
struct HeadlessElement {
    scene: String,
    media: String,
    loaded: bool,
    ready_after_load: ReadyState,
    state: Arc<Mutex<BackendState>>,
}

impl HeadlessElement {
    fn record(&self, kind: MediaCallKind) {
        trace!(scene = %self.scene, media = %self.media, ?kind, "headless media call");
        if let Ok(mut state) = self.state.lock() {
            state.calls.push(MediaCall {
                scene: self.scene.clone(),
                media: self.media.clone(),
                kind,
            });
        }
    }
}

impl MediaElement for HeadlessElement {
    fn load(&mut self, source: &str) -> Result<()> {
        self.record(MediaCallKind::Load(source.to_string()));
        let failing = self
            .state
            .lock()
            .map(|s| s.failing_sources.contains(source))
            .unwrap_or(false);
        if failing {
            return Err(anyhow!("failed to fetch {source}"));
        }
        self.loaded = true;
        Ok(())
    }

    fn ready_state(&self) -> ReadyState {
        if !self.loaded {
            return ReadyState::HaveNothing;
        }
        self.state
            .lock()
            .ok()
            .and_then(|s| s.ready.get(&(self.scene.clone(), self.media.clone())).copied())
            .unwrap_or(self.ready_after_load)
    }

    fn play(&mut self) -> Result<()> {
        self.record(MediaCallKind::Play);
        Ok(())
    }

    fn pause(&mut self) {
        self.record(MediaCallKind::Pause);
    }
}
