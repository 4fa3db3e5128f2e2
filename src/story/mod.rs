//! Story engine: turn data model, collaborator seams, session state,
//! save/load.

pub mod generator;
pub mod remote;
pub mod save;
pub mod session;
pub mod types;

pub use generator::{Generators, ImageGenerator, SpeechGenerator, TextGenerator};
pub use save::{BlobStore, FileBlobStore};
pub use session::{Session, SessionMeta};
pub use types::{Choice, HistoryItem, Role, StoryLogEntry, StoryTurn};
