//! Session state: the running story.
//!
//! Owns health, the conversational history, the archived story log and the
//! current turn's transient media. Image and narration for a turn are
//! requested concurrently and joined before the turn counts as ready.

use crate::defaults::{HP_MAX, HP_MIN};
use crate::story::generator::{turn_or_fallback, Generators};
use crate::story::types::{HistoryItem, StoryLogEntry, StoryTurn};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Who and what the story is about.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SessionMeta {
    pub character_name: String,
    pub theme: String,
    pub language: String,
}

/// A running story session.
pub struct Session {
    pub meta: SessionMeta,
    hp: i32,
    history: Vec<HistoryItem>,
    log: Vec<StoryLogEntry>,
    current: Option<StoryTurn>,
    current_image: Option<String>,
    current_audio: Option<String>,
}

impl Session {
    pub fn new(meta: SessionMeta) -> Self {
        Self {
            meta,
            hp: HP_MAX,
            history: Vec::new(),
            log: Vec::new(),
            current: None,
            current_image: None,
            current_audio: None,
        }
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn history(&self) -> &[HistoryItem] {
        &self.history
    }

    pub fn log(&self) -> &[StoryLogEntry] {
        &self.log
    }

    pub fn current_turn(&self) -> Option<&StoryTurn> {
        self.current.as_ref()
    }

    pub fn current_image(&self) -> Option<&str> {
        self.current_image.as_deref()
    }

    pub fn current_audio(&self) -> Option<&str> {
        self.current_audio.as_deref()
    }

    /// Overwrite the current turn's image. Idempotent by construction: a
    /// stale completion after a turn change just writes state that the next
    /// archive ignores.
    pub fn set_current_image(&mut self, image: Option<String>) {
        self.current_image = image;
    }

    /// Overwrite the current turn's narration clip. Same staleness contract
    /// as [`Session::set_current_image`].
    pub fn set_current_audio(&mut self, audio: Option<String>) {
        self.current_audio = audio;
    }

    /// Open the story: first turn plus its media.
    pub async fn begin(&mut self, generators: &Generators) {
        self.history.push(HistoryItem::user(format!(
            "Begin a {} story about {}.",
            self.meta.theme, self.meta.character_name
        )));

        let turn = turn_or_fallback(
            generators
                .text
                .new_story(
                    &self.meta.theme,
                    &self.meta.character_name,
                    &self.meta.language,
                )
                .await,
        );
        self.apply_turn(turn);
        self.fetch_media(generators).await;
    }

    /// The player acts: archive the current turn, then advance.
    ///
    /// Returns false if `choice_id` does not belong to the current turn.
    pub async fn choose(&mut self, choice_id: &str, generators: &Generators) -> bool {
        let action = match self
            .current
            .as_ref()
            .and_then(|t| t.choices.iter().find(|c| c.id == choice_id))
        {
            Some(choice) => choice.text.clone(),
            None => return false,
        };

        self.archive_current();
        self.history.push(HistoryItem::user(action.clone()));

        let turn = turn_or_fallback(
            generators
                .text
                .continue_story(&self.history, &action, &self.meta.language)
                .await,
        );
        self.apply_turn(turn);
        self.fetch_media(generators).await;
        true
    }

    /// Move the current turn's narrative and media into the story log.
    fn archive_current(&mut self) {
        if let Some(turn) = self.current.take() {
            self.log.push(StoryLogEntry {
                narrative: turn.narrative,
                image: self.current_image.take(),
                audio: self.current_audio.take(),
            });
        }
    }

    /// Install a new turn: clamp health, extend history, reset media.
    fn apply_turn(&mut self, turn: StoryTurn) {
        if let Some(delta) = turn.hp_change {
            self.hp = (self.hp + delta).clamp(HP_MIN, HP_MAX);
        }
        self.history.push(HistoryItem::model(turn.narrative.clone()));
        self.current = Some(turn);
        self.current_image = None;
        self.current_audio = None;
    }

    /// Request image and narration for the current turn concurrently and
    /// wait for both. Either failing degrades to a missing asset.
    async fn fetch_media(&mut self, generators: &Generators) {
        let (description, narrative) = match self.current.as_ref() {
            Some(turn) => (turn.visual_description.clone(), turn.narrative.clone()),
            None => return,
        };

        let image_task = async {
            if description.is_empty() {
                return None;
            }
            match generators.image.generate(&description).await {
                Ok(bytes) => Some(image_data_uri(&bytes)),
                Err(e) => {
                    eprintln!("dreamquest: image generation failed: {}", e);
                    None
                }
            }
        };
        let speech_task = async {
            if narrative.is_empty() {
                return None;
            }
            match generators.speech.synthesize(&narrative).await {
                Ok(clip) => Some(clip),
                Err(e) => {
                    eprintln!("dreamquest: speech generation failed: {}", e);
                    None
                }
            }
        };

        let (image, audio) = tokio::join!(image_task, speech_task);
        self.set_current_image(image);
        self.set_current_audio(audio);
    }

    /// The full ordered sequence for export: archived entries plus the
    /// still-in-progress current turn, if any.
    pub fn export_log(&self) -> Vec<StoryLogEntry> {
        let mut entries = self.log.clone();
        if let Some(turn) = &self.current {
            entries.push(StoryLogEntry {
                narrative: turn.narrative.clone(),
                image: self.current_image.clone(),
                audio: self.current_audio.clone(),
            });
        }
        entries
    }

    pub(crate) fn restore_parts(
        meta: SessionMeta,
        hp: i32,
        history: Vec<HistoryItem>,
        log: Vec<StoryLogEntry>,
        current: Option<StoryTurn>,
    ) -> Self {
        Self {
            meta,
            hp: hp.clamp(HP_MIN, HP_MAX),
            history,
            log,
            current,
            current_image: None,
            current_audio: None,
        }
    }
}

/// Wrap encoded image bytes as a `data:` URI, sniffing PNG vs JPEG.
fn image_data_uri(bytes: &[u8]) -> String {
    let mime = if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else {
        "image/jpeg"
    };
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}
