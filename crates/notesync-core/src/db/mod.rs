//! Database layer for notesync

mod account_repository;
mod category_options_repository;
mod connection;
mod migrations;
mod note_repository;
mod settings_repository;

pub use account_repository::{AccountRepository, SqliteAccountRepository};
pub use category_options_repository::{
    CategoryOptionsRepository, SqliteCategoryOptionsRepository,
};
pub use connection::Database;
pub use note_repository::{NoteRepository, SqliteNoteRepository};
pub use settings_repository::{SettingsRepository, SqliteSettingsRepository};
