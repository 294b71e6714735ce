//! JSON and header formats of the Notes HTTP API.

use reqwest::header::{HeaderMap, ETAG, LAST_MODIFIED};
use serde::{Deserialize, Serialize};

use super::error::{RemoteError, RemoteResult};
use crate::models::{parse_api_versions, ApiVersion, NoteDraft, RemoteId, RemoteNote};

/// Header listing the API versions a server supports
pub const API_VERSIONS_HEADER: &str = "x-notes-api-versions";

/// A note entry of a list response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListedNote {
    /// Unchanged since `pruneBefore`; the server only sent its id
    Pruned { remote_id: RemoteId },
    Full(RemoteNote),
}

impl ListedNote {
    pub const fn remote_id(&self) -> RemoteId {
        match self {
            Self::Pruned { remote_id } => *remote_id,
            Self::Full(note) => note.remote_id,
        }
    }
}

/// A changed note list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotesListing {
    pub notes: Vec<ListedNote>,
    /// ETag to send with the next list request, quotes stripped
    pub etag: Option<String>,
    /// `Last-Modified` of the response (Unix ms)
    pub last_modified: Option<i64>,
    /// Versions from the `X-Notes-API-Versions` header
    pub supported_api_versions: Option<Vec<ApiVersion>>,
}

#[derive(Debug, Deserialize)]
struct WireNote {
    id: RemoteId,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    favorite: Option<bool>,
    #[serde(default)]
    etag: Option<String>,
    /// Unix seconds; absent for pruned entries
    #[serde(default)]
    modified: Option<i64>,
}

impl From<WireNote> for ListedNote {
    fn from(note: WireNote) -> Self {
        let Some(modified) = note.modified else {
            return Self::Pruned { remote_id: note.id };
        };
        Self::Full(RemoteNote {
            remote_id: note.id,
            title: note.title.unwrap_or_default(),
            content: note.content.unwrap_or_default(),
            category: note.category.unwrap_or_default(),
            favorite: note.favorite.unwrap_or_default(),
            etag: note.etag,
            modified: modified.saturating_mul(1000),
        })
    }
}

/// Request body for create and edit calls
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct NoteBody<'a> {
    /// API 0.2 has no separate title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    pub content: &'a str,
    pub category: &'a str,
    pub favorite: bool,
    /// Unix seconds
    pub modified: i64,
}

impl<'a> NoteBody<'a> {
    pub fn new(note: &'a NoteDraft, with_title: bool) -> Self {
        Self {
            title: with_title.then_some(note.title.as_str()),
            content: &note.content,
            category: &note.category,
            favorite: note.favorite,
            modified: note.modified / 1000,
        }
    }
}

/// Parse a single-note response; pruned entries are not acceptable here.
pub fn parse_note(body: &str) -> RemoteResult<RemoteNote> {
    let note: WireNote = serde_json::from_str(body)?;
    match ListedNote::from(note) {
        ListedNote::Full(note) => Ok(note),
        ListedNote::Pruned { remote_id } => Err(RemoteError::InvalidPayload(format!(
            "note {remote_id} was returned without content"
        ))),
    }
}

/// Parse a changed list response together with its headers.
pub fn parse_notes_listing(headers: &HeaderMap, body: &str) -> RemoteResult<NotesListing> {
    let notes: Vec<WireNote> = serde_json::from_str(body)?;
    Ok(NotesListing {
        notes: notes.into_iter().map(ListedNote::from).collect(),
        etag: header_str(headers, ETAG.as_str()).map(strip_etag),
        last_modified: header_str(headers, LAST_MODIFIED.as_str()).and_then(parse_http_date_millis),
        supported_api_versions: header_str(headers, API_VERSIONS_HEADER).map(parse_api_versions),
    })
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Remove the surrounding quotes (and a weak validator prefix) from an ETag.
pub fn strip_etag(raw: &str) -> String {
    raw.trim()
        .trim_start_matches("W/")
        .trim_matches('"')
        .to_string()
}

/// Quote an ETag for use in `If-None-Match`.
pub fn quote_etag(etag: &str) -> String {
    format!("\"{}\"", strip_etag(etag))
}

/// Parse an HTTP date (`Tue, 15 Nov 1994 08:12:31 GMT`) into Unix ms.
pub fn parse_http_date_millis(raw: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|date| date.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reqwest::header::HeaderValue;

    #[test]
    fn parses_full_and_pruned_entries() {
        let body = r#"[
            {"id": 1, "title": "A", "content": "a", "category": "work", "favorite": true, "etag": "e1", "modified": 1700000000, "readonly": false},
            {"id": 2}
        ]"#;
        let listing = parse_notes_listing(&HeaderMap::new(), body).unwrap();
        assert_eq!(
            listing.notes,
            vec![
                ListedNote::Full(RemoteNote {
                    remote_id: 1,
                    title: "A".to_string(),
                    content: "a".to_string(),
                    category: "work".to_string(),
                    favorite: true,
                    etag: Some("e1".to_string()),
                    modified: 1_700_000_000_000,
                }),
                ListedNote::Pruned { remote_id: 2 },
            ]
        );
        assert_eq!(listing.etag, None);
    }

    #[test]
    fn reads_listing_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(ETAG, HeaderValue::from_static("\"abc123\""));
        headers.insert(
            LAST_MODIFIED,
            HeaderValue::from_static("Tue, 14 Nov 2023 22:13:20 GMT"),
        );
        headers.insert(API_VERSIONS_HEADER, HeaderValue::from_static("\"0.2\", \"1.3\""));

        let listing = parse_notes_listing(&headers, "[]").unwrap();
        assert_eq!(listing.etag.as_deref(), Some("abc123"));
        assert_eq!(listing.last_modified, Some(1_700_000_000_000));
        assert_eq!(
            listing.supported_api_versions,
            Some(vec![ApiVersion::new(1, 3), ApiVersion::V0_2])
        );
    }

    #[test]
    fn single_note_must_be_complete() {
        assert!(parse_note(r#"{"id": 5, "modified": 10, "content": "x"}"#).is_ok());
        assert!(matches!(
            parse_note(r#"{"id": 5}"#),
            Err(RemoteError::InvalidPayload(_))
        ));
        assert!(matches!(
            parse_note("<html>"),
            Err(RemoteError::InvalidPayload(_))
        ));
    }

    #[test]
    fn body_omits_title_for_legacy_api() {
        let mut draft = NoteDraft::new("Title", "content", "cat");
        draft.modified = 5_000;
        let legacy = serde_json::to_value(NoteBody::new(&draft, false)).unwrap();
        assert!(legacy.get("title").is_none());
        assert_eq!(legacy["modified"], 5);

        let current = serde_json::to_value(NoteBody::new(&draft, true)).unwrap();
        assert_eq!(current["title"], "Title");
    }

    #[test]
    fn etag_quoting() {
        assert_eq!(strip_etag("W/\"abc\""), "abc");
        assert_eq!(quote_etag("abc"), "\"abc\"");
        assert_eq!(quote_etag("\"abc\""), "\"abc\"");
    }
}
