use std::io;

use notesync_core::remote::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] notesync_core::Error),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No note content provided")]
    EmptyContent,
    #[error("Edited note content cannot be empty")]
    EmptyEditedContent,
    #[error("Note ID cannot be empty")]
    EmptyNoteId,
    #[error("Note not found for id: {0}")]
    NoteNotFound(String),
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("No account configured. Run `notesync account add <URL> <USER>` first.")]
    NoAccount,
    #[error("Unknown account: {0}")]
    UnknownAccount(String),
    #[error("Several accounts configured ({0}); choose one with --account")]
    AmbiguousAccount(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Password must not be empty")]
    EmptyPassword,
    #[error("Sync failed: {0}")]
    SyncFailed(String),
}
