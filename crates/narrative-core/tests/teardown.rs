//! Teardown Tests
//!
//! Scoped trigger release on unmount, rebuild and shutdown, and the
//! missing-anchor containment policy.

mod common;

use common::{story, Harness};
use narrative_core::contributors::{FillBarSpec, SplitRevealSpec};
use narrative_core::media::MediaCallKind;
use narrative_core::{ContributorSpec, MediaEvent, MediaSpec, NarrativeError, Scene};

fn rich_story() -> Vec<Scene> {
    let mut scenes = story(6);
    scenes[2] = Scene::new("s2")
        .with_media(MediaSpec::new("clip", "/videos/huangshan.mp4"))
        .with_contributor(ContributorSpec::SplitReveal(SplitRevealSpec::default()));
    scenes[4] = Scene::new("s4").with_contributor(ContributorSpec::FillBar(FillBarSpec::default()));
    scenes
}

#[test]
fn unmount_mid_transit_leaves_no_triggers() {
    let mut h = Harness::new(rich_story());
    h.travel_to(2000.0, 16);
    h.advance(200);

    // Active window, two media windows and the split reveal.
    assert_eq!(h.engine.scene_trigger_count("s2"), 4);
    let total = h.engine.trigger_count();

    h.engine.unmount("s2").unwrap();
    assert_eq!(h.engine.scene_trigger_count("s2"), 0);
    assert_eq!(h.engine.trigger_count(), total - 4);

    // The playing clip was paused on the way out and is never touched again.
    let calls = h.backend.calls_for("s2", "clip");
    assert_eq!(calls.last(), Some(&MediaCallKind::Pause));
    assert!(!h.engine.media_event("s2", "clip", MediaEvent::CanPlay));
    h.travel_to(2100.0, 16);
    h.advance(300);
    assert_eq!(h.backend.calls_for("s2", "clip"), calls);
}

#[test]
fn unmounting_active_scene_clears_signal() {
    let mut h = Harness::new(story(4));
    let rx = h.engine.subscribe_info();
    h.travel_to(1000.0, 16);
    assert_eq!(h.engine.active_scene(), Some("s1"));

    h.engine.unmount("s1").unwrap();
    assert_eq!(h.engine.active_scene(), None);
    let seen: Vec<_> = rx.try_iter().collect();
    assert_eq!(seen.last(), Some(&None));
}

#[test]
fn unmount_unknown_scene_fails() {
    let mut h = Harness::new(story(2));
    assert!(matches!(
        h.engine.unmount("nowhere"),
        Err(NarrativeError::UnknownScene(_))
    ));
}

#[test]
fn duplicate_mount_is_rejected() {
    let mut h = Harness::new(story(3));
    let triggers = h.engine.trigger_count();
    assert!(matches!(
        h.engine.mount(Scene::new("s1")),
        Err(NarrativeError::DuplicateScene(_))
    ));
    assert_eq!(h.engine.trigger_count(), triggers);
}

#[test]
fn rebuild_replaces_every_trigger() {
    let mut h = Harness::new(rich_story());
    let before = h.engine.trigger_count();
    let old_motion = h.engine.motion().unwrap();
    h.engine.rebuild().unwrap();
    assert_eq!(h.engine.trigger_count(), before);
    assert!(!old_motion.is_live());
}

#[test]
fn shutdown_releases_everything() {
    let mut h = Harness::new(rich_story());
    h.travel_to(2500.0, 16);
    let motion = h.engine.motion().unwrap();
    let rx = h.engine.subscribe_info();

    h.engine.shutdown();
    assert_eq!(h.engine.trigger_count(), 0);
    assert!(h.engine.motion().is_none());
    assert!(!motion.is_live());
    assert_eq!(h.engine.active_scene(), None);
    assert_eq!(rx.try_iter().last(), Some(None));
    assert!(h.engine.scenes().is_empty());
}

/// A scene whose content lacks an anchor loses its triggers for the build;
/// the rest of the story is unaffected.
#[test]
fn missing_anchor_skips_scene_triggers() {
    let mut scenes = story(5);
    scenes[2] = Scene::new("s2")
        .with_info("Broken", "No fill anchor")
        .with_anchor("readout")
        .with_contributor_unchecked(ContributorSpec::FillBar(FillBarSpec::default()));
    assert_eq!(scenes[2].missing_anchors(), vec!["fill".to_string()]);

    let mut h = Harness::new(scenes);
    assert_eq!(h.engine.scene_trigger_count("s2"), 0);
    assert_eq!(h.engine.scene_trigger_count("s1"), 1);
    assert_eq!(h.engine.scene_trigger_count("s3"), 1);

    let frame = h.travel_to(2000.0, 16);
    assert!(frame.scene("s2").unwrap().disabled);
    assert_eq!(frame.active_scene, None);

    let frame = h.travel_to(3000.0, 16);
    assert_eq!(frame.active_scene.as_deref(), Some("s3"));
}
