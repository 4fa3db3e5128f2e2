//! Storybook export against the real filesystem.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use dreamquest::export::export_storybook;
use dreamquest::export::storybook::render_storybook;
use dreamquest::{SessionMeta, StoryLogEntry};

fn meta() -> SessionMeta {
    SessionMeta {
        character_name: "Mira".to_string(),
        theme: "sunken city".to_string(),
        language: "en".to_string(),
    }
}

fn narration_clip() -> String {
    // 100 ms of silence, 24 kHz mono s16le
    STANDARD.encode(vec![0u8; 2400 * 2])
}

fn entries() -> Vec<StoryLogEntry> {
    vec![
        StoryLogEntry {
            narrative: "Mira descends into the drowned plaza.".to_string(),
            image: Some("data:image/png;base64,iVBORw0KGgo=".to_string()),
            audio: Some(narration_clip()),
        },
        StoryLogEntry {
            narrative: "A bell tolls somewhere <below>.".to_string(),
            image: None,
            audio: None,
        },
    ]
}

#[test]
fn export_writes_one_self_contained_html_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = export_storybook(&entries(), &meta(), dir.path()).unwrap();

    assert!(path.exists());
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("DreamQuest-Mira-"), "got {}", name);
    assert!(name.ends_with(".html"));

    let html = std::fs::read_to_string(&path).unwrap();
    assert!(html.contains("Mira descends into the drowned plaza."));
    // HTML-sensitive characters are escaped
    assert!(html.contains("&lt;below&gt;"));
    assert!(!html.contains("<below>"));
    // Media embedded inline, nothing fetched from the network
    assert!(html.contains("data:image/png;base64,"));
    assert!(html.contains("data:audio/wav;base64,"));
    assert!(!html.contains("http://"));
    assert!(!html.contains("https://"));
}

#[test]
fn export_from_media_stripped_log_still_works() {
    // A reloaded save carries narrative only
    let stripped: Vec<StoryLogEntry> = entries()
        .into_iter()
        .map(|e| StoryLogEntry {
            narrative: e.narrative,
            image: None,
            audio: None,
        })
        .collect();

    let dir = tempfile::tempdir().unwrap();
    let path = export_storybook(&stripped, &meta(), dir.path()).unwrap();
    let html = std::fs::read_to_string(&path).unwrap();

    assert!(html.contains("Mira descends"));
    assert!(!html.contains("data:image/"));
    assert!(!html.contains("data:audio/"));
}

#[test]
fn rendered_book_carries_ambient_player() {
    let html = render_storybook(&entries(), &meta());
    // The embedded drone script drives a toggleable ambient pad
    assert!(html.contains("<script>"));
    assert!(html.contains("AudioContext"));
    assert!(html.contains("110"));
}

#[test]
fn empty_narratives_are_dropped_from_the_book() {
    let mut list = entries();
    list.push(StoryLogEntry {
        narrative: "   ".to_string(),
        image: None,
        audio: None,
    });

    let html = render_storybook(&list, &meta());
    let sections = html.matches("<section").count();
    assert_eq!(sections, 2);
}
