//! Story documents: the serialized form of a narrative section.
//!
//! A document carries the viewport it was authored for, optional engine
//! tuning, and the ordered scenes with their info, anchors, media and
//! contributors. [`load_story`] validates a document and mounts it.

use narrative_core::media::MediaBackend;
use narrative_core::{EngineConfig, NarrativeError, Scene, StoryEngine, Viewport};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to read story file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed story document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Viewport must be positive, got {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },
    #[error("Scene #{0} has an empty id")]
    EmptySceneId(usize),
    #[error("Scene id declared more than once: {0}")]
    DuplicateScene(String),
    #[error("Scene '{scene}' declares media '{media}' more than once")]
    DuplicateMedia { scene: String, media: String },
    #[error(transparent)]
    Engine(#[from] NarrativeError),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StoryDocument {
    #[serde(default)]
    pub title: Option<String>,
    /// Initial viewport; hosts replace it with the real one via resize.
    #[serde(default)]
    pub viewport: Viewport,
    /// Engine tuning. Omitted fields take their defaults.
    #[serde(default)]
    pub config: EngineConfig,
    /// Scenes in narrative order.
    pub scenes: Vec<Scene>,
}

impl StoryDocument {
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SchemaError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Checks the document for errors that prevent mounting.
    ///
    /// Missing anchors are not fatal: the engine skips that scene's triggers
    /// and keeps the rest of the story running. They come back as the `Ok`
    /// list so callers can report them.
    pub fn validate(&self) -> Result<Vec<NarrativeError>, SchemaError> {
        let Viewport { width, height } = self.viewport;
        if !(width > 0.0 && height > 0.0) {
            return Err(SchemaError::InvalidViewport { width, height });
        }

        let mut ids = HashSet::new();
        let mut issues = Vec::new();
        for (index, scene) in self.scenes.iter().enumerate() {
            if scene.id.trim().is_empty() {
                return Err(SchemaError::EmptySceneId(index));
            }
            if !ids.insert(scene.id.as_str()) {
                return Err(SchemaError::DuplicateScene(scene.id.clone()));
            }

            let mut media = HashSet::new();
            for spec in &scene.media {
                if !media.insert(spec.id.as_str()) {
                    return Err(SchemaError::DuplicateMedia {
                        scene: scene.id.clone(),
                        media: spec.id.clone(),
                    });
                }
            }

            issues.extend(
                scene
                    .missing_anchors()
                    .into_iter()
                    .map(|anchor| NarrativeError::MissingAnchor {
                        scene: scene.id.clone(),
                        anchor,
                    }),
            );
        }
        Ok(issues)
    }
}

/// Validates `document` and mounts its scenes, in order, into a new engine.
pub fn load_story(
    document: &StoryDocument,
    backend: Arc<dyn MediaBackend>,
) -> Result<StoryEngine, SchemaError> {
    for issue in document.validate()? {
        warn!("{}", issue);
    }

    let mut engine = StoryEngine::new(document.config.clone(), document.viewport, backend);
    for scene in &document.scenes {
        engine.mount(scene.clone())?;
    }
    info!(
        title = document.title.as_deref().unwrap_or("untitled"),
        scenes = document.scenes.len(),
        pinned = engine.motion().is_some(),
        "story loaded"
    );
    Ok(engine)
}
