//! Full session flow: begin, choose, export, save and reload.

use async_trait::async_trait;
use dreamquest::story::save::{load_session, save_session, FileBlobStore};
use dreamquest::{
    Choice, Generators, HistoryItem, ImageGenerator, Result, Session, SessionMeta,
    SpeechGenerator, StoryTurn, TextGenerator,
};
use std::sync::Arc;

fn meta() -> SessionMeta {
    SessionMeta {
        character_name: "Orin".to_string(),
        theme: "glass desert".to_string(),
        language: "en".to_string(),
    }
}

fn scripted_turn(narrative: &str, hp_change: Option<i32>) -> StoryTurn {
    StoryTurn {
        narrative: narrative.to_string(),
        visual_description: format!("a scene of {}", narrative),
        choices: vec![
            Choice {
                id: "on".to_string(),
                text: "Press on".to_string(),
            },
            Choice {
                id: "rest".to_string(),
                text: "Make camp".to_string(),
            },
        ],
        hp_change,
    }
}

struct ScriptedText;

#[async_trait]
impl TextGenerator for ScriptedText {
    async fn new_story(&self, _: &str, _: &str, _: &str) -> Result<StoryTurn> {
        Ok(scripted_turn("The glass dunes shimmer.", None))
    }
    async fn continue_story(&self, _: &[HistoryItem], _: &str, _: &str) -> Result<StoryTurn> {
        Ok(scripted_turn("A storm of shards approaches.", Some(-30)))
    }
}

struct TinyPng;

#[async_trait]
impl ImageGenerator for TinyPng {
    async fn generate(&self, _: &str) -> Result<Vec<u8>> {
        Ok(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A])
    }
}

struct SilentSpeech;

#[async_trait]
impl SpeechGenerator for SilentSpeech {
    async fn synthesize(&self, _: &str) -> Result<String> {
        use base64::Engine;
        Ok(base64::engine::general_purpose::STANDARD.encode(vec![0u8; 480]))
    }
}

fn generators() -> Generators {
    Generators {
        text: Arc::new(ScriptedText),
        image: Arc::new(TinyPng),
        speech: Arc::new(SilentSpeech),
    }
}

#[tokio::test]
async fn a_played_session_survives_save_and_reload() {
    let gens = generators();
    let mut session = Session::new(meta());
    session.begin(&gens).await;
    assert!(session.choose("on", &gens).await);
    assert_eq!(session.hp(), 70);

    // Live export sees archived and current entries, with media
    let export = session.export_log();
    assert_eq!(export.len(), 2);
    assert!(export[0].image.is_some());
    assert!(export[0].audio.is_some());

    let dir = tempfile::tempdir().unwrap();
    let store = FileBlobStore::new(dir.path().to_path_buf());
    save_session(&store, &session).unwrap();

    let restored = load_session(&store).unwrap().unwrap();
    assert_eq!(restored.meta, meta());
    assert_eq!(restored.hp(), 70);
    assert_eq!(restored.history().len(), session.history().len());
    assert_eq!(
        restored.current_turn().unwrap().narrative,
        "A storm of shards approaches."
    );

    // Media was stripped on the way to disk
    let reexport = restored.export_log();
    assert_eq!(reexport.len(), 2);
    assert!(reexport[0].image.is_none());
    assert!(reexport[0].audio.is_none());
    assert_eq!(reexport[0].narrative, "The glass dunes shimmer.");
}

#[tokio::test]
async fn empty_store_loads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileBlobStore::new(dir.path().to_path_buf());
    assert!(load_session(&store).unwrap().is_none());
}

#[tokio::test]
async fn invalid_choice_leaves_session_untouched() {
    let gens = generators();
    let mut session = Session::new(meta());
    session.begin(&gens).await;

    assert!(!session.choose("fly", &gens).await);
    assert_eq!(session.hp(), 100);
    assert_eq!(session.log().len(), 0);
    assert_eq!(
        session.current_turn().unwrap().narrative,
        "The glass dunes shimmer."
    );
}
