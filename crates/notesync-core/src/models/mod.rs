//! Data models for notesync

mod account;
mod api_version;
mod category;
mod note;
pub mod text;

pub use account::{
    Account, AccountId, Capabilities, NewAccount, DEFAULT_COLOR, DEFAULT_TEXT_COLOR,
};
pub use api_version::{format_api_versions, parse_api_versions, preferred_api_version, ApiVersion};
pub use category::{CategorySortingMethod, NavigationCategory};
pub use note::{
    Note, NoteDraft, NoteId, NoteOrigin, NoteStatus, PushSnapshot, RemoteId, RemoteNote,
};
