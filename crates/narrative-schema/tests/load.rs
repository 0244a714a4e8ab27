use narrative_core::{HeadlessMediaBackend, StageMode};
use narrative_schema::{load_story, SchemaError, StoryDocument};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

const STORY: &str = r#"{
    "title": "Rooftops",
    "viewport": { "width": 1000, "height": 800 },
    "config": { "scrub_lag_secs": 0.0 },
    "scenes": [
        { "id": "opening", "info": { "title": "Opening", "description": "Where it starts" } },
        { "id": "tibet", "info": { "title": "Tibet", "description": "Prayer flags" },
          "media": [{ "id": "clip", "source": "/videos/tibet.mp4" }] },
        { "id": "closing" }
    ]
}"#;

fn write_story(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn loads_and_mounts_from_file() {
    let file = write_story(STORY);
    let doc = StoryDocument::load(file.path()).unwrap();
    assert_eq!(doc.title.as_deref(), Some("Rooftops"));

    let mut engine = load_story(&doc, Arc::new(HeadlessMediaBackend::new())).unwrap();
    assert_eq!(engine.scenes().len(), 3);
    assert_eq!(engine.motion().unwrap().travel_distance(), 2000.0);

    let start = engine.travel_start().unwrap();
    engine.scroll_to(start + 1000.0);
    let frame = engine.tick(Duration::from_millis(16));
    assert_eq!(frame.mode, StageMode::Pinned);
    assert_eq!(frame.active_scene.as_deref(), Some("tibet"));
    assert_eq!(engine.current_info().map(|i| i.title.as_str()), Some("Tibet"));
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    match StoryDocument::load(&path) {
        Err(SchemaError::Read { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected read error, got {other:?}"),
    }
}

#[test]
fn malformed_json_is_a_parse_error() {
    let file = write_story(r#"{ "scenes": [ { "id": "a" } "#);
    assert!(matches!(
        StoryDocument::load(file.path()),
        Err(SchemaError::Parse(_))
    ));
}

#[test]
fn duplicate_media_blocks_loading() {
    let doc = StoryDocument::from_json(
        r#"{ "scenes": [{ "id": "a", "media": [
            { "id": "clip", "source": "/a.mp4" },
            { "id": "clip", "source": "/b.mp4" }
        ] }] }"#,
    )
    .unwrap();
    let result = load_story(&doc, Arc::new(HeadlessMediaBackend::new()));
    assert!(matches!(result, Err(SchemaError::DuplicateMedia { .. })));
}

#[test]
fn scene_missing_anchors_loads_disabled() {
    let doc = StoryDocument::from_json(
        r#"{
            "viewport": { "width": 1000, "height": 800 },
            "scenes": [
                { "id": "a" },
                { "id": "data", "contributors": [{ "kind": "fill_bar" }] },
                { "id": "c" }
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(doc.validate().unwrap().len(), 2);

    let mut engine = load_story(&doc, Arc::new(HeadlessMediaBackend::new())).unwrap();
    assert_eq!(engine.scene_trigger_count("data"), 0);
    assert_eq!(engine.scene_trigger_count("c"), 1);
    let frame = engine.tick(Duration::ZERO);
    assert!(frame.scene("data").unwrap().disabled);
}

#[test]
fn invalid_viewport_is_rejected() {
    let doc = StoryDocument::from_json(r#"{ "viewport": { "width": 0, "height": 800 }, "scenes": [] }"#)
        .unwrap();
    assert!(matches!(
        doc.validate(),
        Err(SchemaError::InvalidViewport { .. })
    ));
}

#[test]
fn demo_story_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos/story.json");
    let doc = StoryDocument::load(path).unwrap();
    assert!(doc.validate().unwrap().is_empty());

    let engine = load_story(&doc, Arc::new(HeadlessMediaBackend::new())).unwrap();
    assert_eq!(engine.motion().unwrap().travel_distance(), 6.0 * 1440.0);
    assert_eq!(engine.scene_trigger_count("glaciers"), 2);
    assert_eq!(engine.scene_trigger_count("terraces"), 3);
}
