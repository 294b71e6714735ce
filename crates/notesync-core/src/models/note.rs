//! Note model

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use super::account::AccountId;
use super::text::{generate_note_excerpt, generate_note_title};

/// Local row identifier of a note.
///
/// Never sent to the server and never used to match notes across devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(i64);

impl NoteId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NoteId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Server-assigned note identifier, the only cross-device join key.
pub type RemoteId = i64;

/// Sync state of a local note row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoteStatus {
    /// Identical to the server copy as far as is known
    #[default]
    Void,
    /// Created or edited locally, waiting for a push
    LocalEdited,
    /// Deleted locally, waiting for the server to confirm
    LocalDeleted,
}

impl NoteStatus {
    /// Storage representation
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Void => "",
            Self::LocalEdited => "LOCAL_EDITED",
            Self::LocalDeleted => "LOCAL_DELETED",
        }
    }
}

impl fmt::Display for NoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("VOID"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl FromStr for NoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "VOID" => Ok(Self::Void),
            "LOCAL_EDITED" => Ok(Self::LocalEdited),
            "LOCAL_DELETED" => Ok(Self::LocalDeleted),
            other => Err(format!("unknown note status '{other}'")),
        }
    }
}

impl ToSql for NoteStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for NoteStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: String| FromSqlError::Other(error.into()))
    }
}

/// Where a new note row comes from; decides its initial status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteOrigin {
    /// Created by the user, must be pushed
    Local,
    /// Discovered on the server during a pull
    Remote,
}

impl NoteOrigin {
    pub const fn initial_status(self) -> NoteStatus {
        match self {
            Self::Local => NoteStatus::LocalEdited,
            Self::Remote => NoteStatus::Void,
        }
    }
}

/// A note stored in the local replica
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    /// `None` until the note has been pushed once
    pub remote_id: Option<RemoteId>,
    pub account_id: AccountId,
    pub title: String,
    pub content: String,
    /// Cached list preview, derived from content and title
    pub excerpt: String,
    /// Empty means uncategorized; `/` separates sub-categories
    pub category: String,
    pub favorite: bool,
    pub etag: Option<String>,
    /// Last modification (Unix ms)
    pub modified: i64,
    pub status: NoteStatus,
    pub scroll_y: i64,
}

impl Note {
    /// The values a push guard compares against.
    pub fn snapshot(&self) -> PushSnapshot {
        PushSnapshot {
            content: self.content.clone(),
            category: self.category.clone(),
            favorite: self.favorite,
        }
    }

    /// Fields sent to the server when pushing this note.
    pub fn to_draft(&self) -> NoteDraft {
        NoteDraft {
            remote_id: self.remote_id,
            title: self.title.clone(),
            content: self.content.clone(),
            category: self.category.clone(),
            favorite: self.favorite,
            etag: self.etag.clone(),
            modified: self.modified,
        }
    }
}

/// Note fields independent of any local row.
///
/// Used as the input of local inserts and as the payload of pushes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NoteDraft {
    pub remote_id: Option<RemoteId>,
    pub title: String,
    pub content: String,
    pub category: String,
    pub favorite: bool,
    pub etag: Option<String>,
    /// Unix ms
    pub modified: i64,
}

impl NoteDraft {
    /// New local note; an empty title is derived from the content.
    pub fn new(title: impl Into<String>, content: impl Into<String>, category: impl Into<String>) -> Self {
        let content = content.into();
        let mut title = title.into();
        if title.trim().is_empty() {
            title = generate_note_title(&content);
        }
        Self {
            remote_id: None,
            title,
            content,
            category: category.into(),
            favorite: false,
            etag: None,
            modified: crate::util::unix_millis_now(),
        }
    }

    pub fn excerpt(&self) -> String {
        generate_note_excerpt(&self.content, Some(&self.title))
    }
}

/// A complete note as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteNote {
    pub remote_id: RemoteId,
    pub title: String,
    pub content: String,
    pub category: String,
    pub favorite: bool,
    pub etag: Option<String>,
    /// Unix ms
    pub modified: i64,
}

impl RemoteNote {
    pub fn excerpt(&self) -> String {
        generate_note_excerpt(&self.content, Some(&self.title))
    }

    pub fn into_draft(self) -> NoteDraft {
        NoteDraft {
            remote_id: Some(self.remote_id),
            title: self.title,
            content: self.content,
            category: self.category,
            favorite: self.favorite,
            etag: self.etag,
            modified: self.modified,
        }
    }
}

/// Local values captured before a push; the push result only lands when
/// the row still holds them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSnapshot {
    pub content: String,
    pub category: String,
    pub favorite: bool,
}
