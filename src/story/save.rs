//! Save/resume: a key-value blob store with a file-backed implementation.
//!
//! One fixed save slot. The persisted state carries session metadata, the
//! conversational history, the story log with narrative only (media is
//! stripped by the log entry's serde shape) and the current turn.

use crate::defaults::SAVE_SLOT_KEY;
use crate::error::{DreamQuestError, Result};
use crate::story::session::{Session, SessionMeta};
use crate::story::types::{HistoryItem, StoryLogEntry, StoryTurn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Key-value blob store. Values are opaque strings (JSON in practice).
pub trait BlobStore: Send + Sync {
    fn put(&self, key: &str, value: &str) -> Result<()>;
    fn get(&self, key: &str) -> Result<Option<String>>;
}

/// Blob store backed by one file per key under the platform data dir.
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Store rooted at `~/.local/share/dreamquest` (platform equivalent).
    pub fn default_store() -> Result<Self> {
        let root = dirs::data_dir()
            .ok_or_else(|| DreamQuestError::Persistence {
                message: "Could not determine data directory".to_string(),
            })?
            .join("dreamquest");
        Ok(Self::new(root))
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

impl BlobStore for FileBlobStore {
    fn put(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| DreamQuestError::Persistence {
            message: format!("Failed to create save directory: {}", e),
        })?;
        fs::write(self.key_path(key), value).map_err(|e| DreamQuestError::Persistence {
            message: format!("Failed to write save slot: {}", e),
        })
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DreamQuestError::Persistence {
                message: format!("Failed to read save slot: {}", e),
            }),
        }
    }
}

/// Serialized shape of the save slot.
#[derive(Debug, Serialize, Deserialize)]
struct SaveState {
    meta: SessionMeta,
    hp: i32,
    history: Vec<HistoryItem>,
    log: Vec<StoryLogEntry>,
    current: Option<StoryTurn>,
}

/// Write the session to the fixed save slot.
///
/// Media never reaches the store: `StoryLogEntry` skips its image/audio
/// fields on serialization, and the current turn's transient media is not
/// part of the save shape at all.
pub fn save_session(store: &dyn BlobStore, session: &Session) -> Result<()> {
    let state = SaveState {
        meta: session.meta.clone(),
        hp: session.hp(),
        history: session.history().to_vec(),
        log: session.log().to_vec(),
        current: session.current_turn().cloned(),
    };
    let json = serde_json::to_string(&state).map_err(|e| DreamQuestError::Persistence {
        message: format!("Failed to serialize save state: {}", e),
    })?;
    store.put(SAVE_SLOT_KEY, &json)
}

/// Load the session from the fixed save slot, if one exists.
///
/// Restored log entries carry narrative only; media returns as turns are
/// regenerated.
pub fn load_session(store: &dyn BlobStore) -> Result<Option<Session>> {
    let json = match store.get(SAVE_SLOT_KEY)? {
        Some(json) => json,
        None => return Ok(None),
    };
    let state: SaveState =
        serde_json::from_str(&json).map_err(|e| DreamQuestError::Persistence {
            message: format!("Save slot is corrupted: {}", e),
        })?;
    Ok(Some(Session::restore_parts(
        state.meta,
        state.hp,
        state.history,
        state.log,
        state.current,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory store for tests.
    #[derive(Default)]
    struct MemStore {
        map: Mutex<std::collections::HashMap<String, String>>,
    }

    impl BlobStore for MemStore {
        fn put(&self, key: &str, value: &str) -> Result<()> {
            self.map
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
        fn get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.map.lock().unwrap().get(key).cloned())
        }
    }

    fn sample_session() -> Session {
        Session::restore_parts(
            SessionMeta {
                character_name: "Aria".to_string(),
                theme: "haunted forest".to_string(),
                language: "en".to_string(),
            },
            70,
            vec![HistoryItem::user("go"), HistoryItem::model("you went")],
            vec![StoryLogEntry {
                narrative: "you went".to_string(),
                image: Some("data:image/png;base64,MEDIA".to_string()),
                audio: Some("MEDIA".to_string()),
            }],
            Some(StoryTurn::fallback()),
        )
    }

    #[test]
    fn save_load_round_trip_strips_media() {
        let store = MemStore::default();
        save_session(&store, &sample_session()).unwrap();

        let restored = load_session(&store).unwrap().unwrap();
        assert_eq!(restored.meta.character_name, "Aria");
        assert_eq!(restored.hp(), 70);
        assert_eq!(restored.history().len(), 2);
        assert_eq!(restored.log().len(), 1);
        assert_eq!(restored.log()[0].narrative, "you went");
        assert_eq!(restored.log()[0].image, None);
        assert_eq!(restored.log()[0].audio, None);
        assert!(restored.current_turn().is_some());
    }

    #[test]
    fn saved_blob_contains_no_media_payload() {
        let store = MemStore::default();
        save_session(&store, &sample_session()).unwrap();
        let blob = store.get(SAVE_SLOT_KEY).unwrap().unwrap();
        assert!(!blob.contains("MEDIA"));
    }

    #[test]
    fn empty_store_loads_none() {
        let store = MemStore::default();
        assert!(load_session(&store).unwrap().is_none());
    }

    #[test]
    fn corrupted_slot_surfaces_persistence_error() {
        let store = MemStore::default();
        store.put(SAVE_SLOT_KEY, "{ not json").unwrap();
        assert!(matches!(
            load_session(&store),
            Err(DreamQuestError::Persistence { .. })
        ));
    }

    #[test]
    fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobStore::new(dir.path().join("saves"));
        store.put("slot", "payload").unwrap();
        assert_eq!(store.get("slot").unwrap().as_deref(), Some("payload"));
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn restored_hp_is_clamped() {
        let session = Session::restore_parts(
            SessionMeta {
                character_name: "x".to_string(),
                theme: "y".to_string(),
                language: "en".to_string(),
            },
            999,
            vec![],
            vec![],
            None,
        );
        assert_eq!(session.hp(), 100);
    }
}
