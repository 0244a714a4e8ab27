//! # Active-Scene Broadcaster
//!
//! Decides which single scene is centered and publishes its metadata to
//! external consumers (the info panel).
//!
//! Each scene gets one activation window narrower than the viewport. Adjacent
//! windows may still overlap, so the winner is the active trigger entered
//! most recently. Consumers receive `Some(info)` or `None` whenever the
//! published value changes, plus the current value on subscription.

use crate::contributors::AttachContext;
use crate::trigger::{TriggerId, TriggerUpdate};
use crate::types::{SceneId, SceneInfo};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct SceneWindow {
    scene_id: SceneId,
    active: bool,
    entered_at: u64,
}

#[derive(Debug, Default)]
pub struct ActiveSceneBroadcaster {
    subscribers: Vec<Sender<Option<SceneInfo>>>,
    windows: HashMap<TriggerId, SceneWindow>,
    info: HashMap<SceneId, Option<SceneInfo>>,
    active: Option<SceneId>,
    published: Option<SceneInfo>,
    publishes: u64,
}

impl ActiveSceneBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a receiver. The current value is delivered immediately.
    pub fn subscribe(&mut self) -> Receiver<Option<SceneInfo>> {
        let (tx, rx) = unbounded();
        if tx.send(self.published.clone()).is_ok() {
            self.subscribers.push(tx);
        }
        rx
    }

    /// Records the metadata a scene publishes while centered.
    pub fn set_info(&mut self, scene_id: &str, info: Option<SceneInfo>) {
        self.info.insert(scene_id.to_string(), info);
    }

    /// Creates the scene's activation window for the current build.
    pub fn register(&mut self, cx: &mut AttachContext<'_>) -> TriggerId {
        let window = cx.config.active_window;
        let id = cx.create_trigger(&window.start, &window.end);
        self.windows.insert(
            id,
            SceneWindow {
                scene_id: cx.scene_id().to_string(),
                active: false,
                entered_at: 0,
            },
        );
        id
    }

    pub fn owns(&self, id: TriggerId) -> bool {
        self.windows.contains_key(&id)
    }

    /// Drops a scene's windows and metadata. Call `settle` afterwards.
    pub fn forget_scene(&mut self, scene_id: &str) {
        self.windows.retain(|_, w| w.scene_id != scene_id);
        self.info.remove(scene_id);
    }

    /// Drops every window ahead of a rebuild. Metadata is kept.
    pub fn clear_triggers(&mut self) {
        self.windows.clear();
    }

    pub fn on_trigger(&mut self, update: &TriggerUpdate) {
        if let Some(window) = self.windows.get_mut(&update.id) {
            window.active = update.active;
            window.entered_at = update.entered_at;
        }
    }

    /// Resolves the winner and publishes if the visible value changed.
    pub fn settle(&mut self) {
        let winner = self
            .windows
            .values()
            .filter(|w| w.active)
            .max_by_key(|w| w.entered_at)
            .map(|w| w.scene_id.clone());

        if winner != self.active {
            debug!(from = ?self.active, to = ?winner, "active scene changed");
            self.active = winner;
        }

        let next = self
            .active
            .as_ref()
            .and_then(|id| self.info.get(id).cloned().flatten());
        if next != self.published {
            self.published = next;
            self.publish();
        }
    }

    pub fn active_scene(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// The value consumers currently see.
    pub fn current(&self) -> Option<&SceneInfo> {
        self.published.as_ref()
    }

    /// Number of value changes sent so far.
    pub fn publish_count(&self) -> u64 {
        self.publishes
    }

    fn publish(&mut self) {
        self.publishes += 1;
        info!(
            title = self.published.as_ref().map(|i| i.title.as_str()).unwrap_or("<none>"),
            "scene info published"
        );
        let value = self.published.clone();
        // Disconnected receivers are pruned on the first failed send.
        self.subscribers.retain(|tx| tx.send(value.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(title: &str) -> Option<SceneInfo> {
        Some(SceneInfo {
            title: title.to_string(),
            description: format!("{title} description"),
        })
    }

    fn window(b: &mut ActiveSceneBroadcaster, id: TriggerId, scene: &str) {
        b.windows.insert(
            id,
            SceneWindow {
                scene_id: scene.to_string(),
                active: false,
                entered_at: 0,
            },
        );
    }

    fn update(id: TriggerId, active: bool, entered_at: u64) -> TriggerUpdate {
        TriggerUpdate {
            id,
            scope: 1,
            transitions: Vec::new(),
            active,
            progress: 0.0,
            entered_at,
        }
    }

    #[test]
    fn test_most_recent_entry_wins() {
        let mut b = ActiveSceneBroadcaster::new();
        b.set_info("tibet", info("Tibet"));
        b.set_info("yunnan", info("Yunnan"));
        window(&mut b, 0, "tibet");
        window(&mut b, 1, "yunnan");
        let rx = b.subscribe();
        assert_eq!(rx.try_recv().unwrap(), None);

        b.on_trigger(&update(0, true, 1));
        b.settle();
        assert_eq!(b.active_scene(), Some("tibet"));

        b.on_trigger(&update(1, true, 2));
        b.settle();
        assert_eq!(b.active_scene(), Some("yunnan"));

        b.on_trigger(&update(1, false, 2));
        b.settle();
        assert_eq!(b.active_scene(), Some("tibet"));

        let seen: Vec<_> = rx.try_iter().collect();
        assert_eq!(seen, vec![info("Tibet"), info("Yunnan"), info("Tibet")]);
    }

    #[test]
    fn test_scene_without_info_publishes_none() {
        let mut b = ActiveSceneBroadcaster::new();
        b.set_info("title-card", None);
        window(&mut b, 0, "title-card");
        b.on_trigger(&update(0, true, 1));
        b.settle();
        assert_eq!(b.active_scene(), Some("title-card"));
        assert_eq!(b.current(), None);
        assert_eq!(b.publish_count(), 0);
    }

    #[test]
    fn test_dropped_receivers_are_pruned() {
        let mut b = ActiveSceneBroadcaster::new();
        b.set_info("tibet", info("Tibet"));
        window(&mut b, 0, "tibet");
        let rx = b.subscribe();
        drop(rx);
        b.on_trigger(&update(0, true, 1));
        b.settle();
        assert!(b.subscribers.is_empty());
    }
}
