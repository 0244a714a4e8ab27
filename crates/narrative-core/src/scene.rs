use crate::contributors::ContributorSpec;
use crate::errors::NarrativeError;
use crate::media::MediaSpec;
use crate::systems::layout::SlotWidth;
use crate::types::{SceneId, SceneInfo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One narrative unit occupying a horizontal slot of the track.
///
/// The engine treats the visual content as opaque. It only sees the named
/// anchors the content exposes, the media it embeds, and the animated
/// behaviors it wants wired to the master motion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: SceneId,
    #[serde(default)]
    pub slot_width: SlotWidth,
    /// Metadata published to the info panel while this scene is centered.
    #[serde(default)]
    pub info: Option<SceneInfo>,
    /// Named element anchors present in the scene's content.
    #[serde(default)]
    pub anchors: BTreeSet<String>,
    #[serde(default)]
    pub media: Vec<MediaSpec>,
    #[serde(default)]
    pub contributors: Vec<ContributorSpec>,
}

impl Scene {
    pub fn new(id: impl Into<SceneId>) -> Self {
        Self {
            id: id.into(),
            slot_width: SlotWidth::default(),
            info: None,
            anchors: BTreeSet::new(),
            media: Vec::new(),
            contributors: Vec::new(),
        }
    }

    pub fn with_width(mut self, width: SlotWidth) -> Self {
        self.slot_width = width;
        self
    }

    pub fn with_info(mut self, title: impl Into<String>, description: impl Into<String>) -> Self {
        self.info = Some(SceneInfo {
            title: title.into(),
            description: description.into(),
        });
        self
    }

    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchors.insert(anchor.into());
        self
    }

    pub fn with_media(mut self, media: MediaSpec) -> Self {
        self.media.push(media);
        self
    }

    /// Adds a contributor and, unless already present, the anchors it needs.
    pub fn with_contributor(mut self, spec: ContributorSpec) -> Self {
        for anchor in spec.required_anchors() {
            self.anchors.insert(anchor);
        }
        self.contributors.push(spec);
        self
    }

    /// Adds a contributor without declaring its anchors.
    pub fn with_contributor_unchecked(mut self, spec: ContributorSpec) -> Self {
        self.contributors.push(spec);
        self
    }

    /// Anchors required by this scene's contributors that its content lacks.
    pub fn missing_anchors(&self) -> Vec<String> {
        self.contributors
            .iter()
            .flat_map(|c| c.required_anchors())
            .filter(|a| !self.anchors.contains(a))
            .collect()
    }
}

/// Ordered scene definitions. Insertion order is narrative order.
#[derive(Debug, Clone, Default)]
pub struct SceneRegistry {
    scenes: Vec<Scene>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self { scenes: Vec::new() }
    }

    /// Appends a scene to the end of the sequence and returns its slot index.
    pub fn register(&mut self, scene: Scene) -> Result<usize, NarrativeError> {
        if self.get(&scene.id).is_some() {
            return Err(NarrativeError::DuplicateScene(scene.id));
        }
        self.scenes.push(scene);
        Ok(self.scenes.len() - 1)
    }

    /// Removes a scene; later scenes move up one slot.
    pub fn remove(&mut self, id: &str) -> Option<Scene> {
        let pos = self.scenes.iter().position(|s| s.id == id)?;
        Some(self.scenes.remove(pos))
    }

    pub fn get(&self, id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.id == id)
    }

    pub fn slot_index(&self, id: &str) -> Option<usize> {
        self.scenes.iter().position(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.iter()
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = SceneRegistry::new();
        assert_eq!(registry.register(Scene::new("intro")).unwrap(), 0);
        assert_eq!(registry.register(Scene::new("tibet")).unwrap(), 1);
        assert!(matches!(
            registry.register(Scene::new("intro")),
            Err(NarrativeError::DuplicateScene(_))
        ));

        registry.remove("intro");
        assert_eq!(registry.slot_index("tibet"), Some(0));
    }
}
