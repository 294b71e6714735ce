//! notesync-core - Offline-first note synchronization engine
//!
//! Keeps a local replica of an account's notes in `SQLite` and reconciles it
//! with a Nextcloud Notes compatible server. Local edits never wait for the
//! network: they are committed, marked, and pushed by the sync coordinator
//! whenever connectivity allows.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod remote;
pub mod services;
pub mod state;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Account, AccountId, Note, NoteId, NoteStatus};
pub use services::{NotesService, NotesStore};
pub use state::{SyncState, SyncStatus};
pub use sync::{SyncCoordinator, SyncHandle, SyncReport};
