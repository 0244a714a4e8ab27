//! Shared helpers for engine integration tests.
#![allow(dead_code)]

use narrative_core::stage::StageFrame;
use narrative_core::{EngineConfig, HeadlessMediaBackend, Scene, StoryEngine, Viewport};
use std::sync::Arc;
use std::time::Duration;

pub fn viewport() -> Viewport {
    Viewport::new(1000.0, 800.0)
}

/// `count` full-viewport scenes named `s0..`, each with info.
pub fn story(count: usize) -> Vec<Scene> {
    (0..count)
        .map(|i| Scene::new(format!("s{i}")).with_info(format!("Scene {i}"), format!("About scene {i}")))
        .collect()
}

/// An engine with a headless backend and an explicit frame clock.
pub struct Harness {
    pub engine: StoryEngine,
    pub backend: HeadlessMediaBackend,
    pub now: Duration,
}

impl Harness {
    pub fn new(scenes: Vec<Scene>) -> Self {
        Self::with_backend(scenes, HeadlessMediaBackend::new())
    }

    pub fn with_backend(scenes: Vec<Scene>, backend: HeadlessMediaBackend) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let mut engine = StoryEngine::new(EngineConfig::immediate(), viewport(), Arc::new(backend.clone()));
        for scene in scenes {
            engine.mount(scene).unwrap();
        }
        Self {
            engine,
            backend,
            now: Duration::ZERO,
        }
    }

    pub fn travel_start(&self) -> f64 {
        self.engine.travel_start().expect("section should be pinned")
    }

    /// Moves the track to `offset` pixels of travel, then advances the clock.
    pub fn travel_to(&mut self, offset: f64, dt_ms: u64) -> StageFrame {
        let start = self.travel_start();
        self.engine.scroll_to(start + offset);
        self.advance(dt_ms)
    }

    pub fn advance(&mut self, dt_ms: u64) -> StageFrame {
        self.now += Duration::from_millis(dt_ms);
        self.engine.tick(self.now)
    }
}
