//! Version-negotiated Notes API client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, IF_NONE_MATCH};
use reqwest::{Method, RequestBuilder, StatusCode};

use super::credentials::Credentials;
use super::error::{RemoteError, RemoteResult};
use super::wire::{parse_note, parse_notes_listing, quote_etag, NoteBody, NotesListing};
use crate::config::HttpTimeouts;
use crate::models::{ApiVersion, NoteDraft, RemoteId, RemoteNote};
use crate::util::{is_http_url, normalize_text_option};

const API_ENDPOINT_NOTES_V1: &str = "/index.php/apps/notes/api/v1/";
const API_ENDPOINT_NOTES_V02: &str = "/index.php/apps/notes/api/v0.2/";

/// Result of a conditional list request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOutcome {
    /// Nothing changed since the given ETag
    NotModified,
    Changed(NotesListing),
}

/// Operations the sync engine needs from a notes server
#[async_trait]
pub trait NotesApi: Send + Sync {
    /// List notes; entries unchanged since `prune_before` (Unix ms) come back pruned
    async fn list_notes(
        &self,
        prune_before: Option<i64>,
        last_etag: Option<&str>,
    ) -> RemoteResult<ListOutcome>;

    async fn create_note(&self, note: &NoteDraft) -> RemoteResult<RemoteNote>;

    /// Update the server copy identified by `note.remote_id`
    async fn edit_note(&self, note: &NoteDraft) -> RemoteResult<RemoteNote>;

    async fn delete_note(&self, remote_id: RemoteId) -> RemoteResult<()>;
}

/// Raw response, read completely so it can be parsed without the network
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    /// Turn a non-success response into its error
    pub fn error_for_status(self) -> RemoteResult<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(RemoteError::from_status(self.status, &self.body))
        }
    }
}

/// Authenticated HTTP channel to one server
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpTransport {
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        timeouts: HttpTimeouts,
    ) -> RemoteResult<Self> {
        let base_url = normalize_base_url(base_url)?;
        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.request)
            .user_agent(concat!("notesync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header(ACCEPT, "application/json")
    }

    pub(crate) async fn send(&self, request: RequestBuilder) -> RemoteResult<RawResponse> {
        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

fn normalize_base_url(raw: &str) -> RemoteResult<String> {
    let url = normalize_text_option(Some(raw.to_string())).ok_or_else(|| {
        RemoteError::InvalidConfiguration("server URL must not be empty".to_string())
    })?;
    if is_http_url(&url) {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(RemoteError::InvalidConfiguration(
            "server URL must include http:// or https://".to_string(),
        ))
    }
}

/// Notes API client bound to one protocol version
#[derive(Debug, Clone)]
pub enum NotesClient {
    /// API 0.2, which has no separate title field
    V02(HttpTransport),
    V1(HttpTransport),
}

impl NotesClient {
    /// Pick the protocol for a server's preferred version, falling back to 0.2.
    pub fn new(transport: HttpTransport, preferred: Option<ApiVersion>) -> Self {
        match preferred {
            Some(version) if version.major == ApiVersion::V1_0.major => {
                tracing::debug!("Using Notes API {}", ApiVersion::V1_0);
                Self::V1(transport)
            }
            Some(version) if version.major == ApiVersion::V0_2.major => {
                tracing::debug!("Using Notes API {}", ApiVersion::V0_2);
                Self::V02(transport)
            }
            Some(version) => {
                tracing::warn!(
                    "Unsupported Notes API version {version}, trying {}",
                    ApiVersion::V0_2
                );
                Self::V02(transport)
            }
            None => {
                tracing::info!(
                    "No preferred Notes API version known, using {}",
                    ApiVersion::V0_2
                );
                Self::V02(transport)
            }
        }
    }

    /// Protocol version spoken by this client
    pub const fn api_version(&self) -> ApiVersion {
        match self {
            Self::V02(_) => ApiVersion::V0_2,
            Self::V1(_) => ApiVersion::V1_0,
        }
    }

    const fn transport(&self) -> &HttpTransport {
        match self {
            Self::V02(transport) | Self::V1(transport) => transport,
        }
    }

    fn path(&self, rest: &str) -> String {
        let prefix = match self {
            Self::V02(_) => API_ENDPOINT_NOTES_V02,
            Self::V1(_) => API_ENDPOINT_NOTES_V1,
        };
        format!("{prefix}{rest}")
    }

    fn body<'a>(&self, note: &'a NoteDraft) -> NoteBody<'a> {
        NoteBody::new(note, matches!(self, Self::V1(_)))
    }
}

#[async_trait]
impl NotesApi for NotesClient {
    async fn list_notes(
        &self,
        prune_before: Option<i64>,
        last_etag: Option<&str>,
    ) -> RemoteResult<ListOutcome> {
        let prune_before_secs = prune_before.unwrap_or(0).max(0) / 1000;
        let mut request = self
            .transport()
            .request(Method::GET, &self.path("notes"))
            .query(&[("pruneBefore", prune_before_secs)]);
        if let Some(etag) = last_etag.filter(|etag| !etag.trim().is_empty()) {
            request = request.header(IF_NONE_MATCH, quote_etag(etag));
        }

        let response = self.transport().send(request).await?;
        if response.status == StatusCode::NOT_MODIFIED {
            return Ok(ListOutcome::NotModified);
        }
        let response = response.error_for_status()?;
        let listing = parse_notes_listing(&response.headers, &response.body)?;
        tracing::debug!("Server returned {} notes", listing.notes.len());
        Ok(ListOutcome::Changed(listing))
    }

    async fn create_note(&self, note: &NoteDraft) -> RemoteResult<RemoteNote> {
        let request = self
            .transport()
            .request(Method::POST, &self.path("notes"))
            .json(&self.body(note));
        let response = self.transport().send(request).await?.error_for_status()?;
        parse_note(&response.body)
    }

    async fn edit_note(&self, note: &NoteDraft) -> RemoteResult<RemoteNote> {
        let Some(remote_id) = note.remote_id else {
            return Err(RemoteError::InvalidConfiguration(
                "cannot edit a note that has no remote id".to_string(),
            ));
        };
        let request = self
            .transport()
            .request(Method::PUT, &self.path(&format!("notes/{remote_id}")))
            .json(&self.body(note));
        let response = self.transport().send(request).await?.error_for_status()?;
        parse_note(&response.body)
    }

    async fn delete_note(&self, remote_id: RemoteId) -> RemoteResult<()> {
        let request = self
            .transport()
            .request(Method::DELETE, &self.path(&format!("notes/{remote_id}")));
        self.transport().send(request).await?.error_for_status()?;
        Ok(())
    }
}
