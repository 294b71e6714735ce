//! Remote error taxonomy

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::util::compact_text;

/// Errors reported by the remote notes client
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The note does not exist (anymore) on the server
    #[error("Note not found on server")]
    NotFound,

    /// The server answered 304 where content was expected
    #[error("Not modified")]
    NotModified,

    /// Credentials were rejected; the cached session must be dropped
    #[error("Authentication rejected by server (HTTP {status})")]
    AuthExpired { status: u16 },

    /// Connection, DNS or timeout failure
    #[error("Server unreachable: {0}")]
    Unreachable(String),

    /// Any other non-success response
    #[error("Server error: {message}")]
    ServerError { status: u16, message: String },

    /// The response could not be understood
    #[error("Invalid server payload: {0}")]
    InvalidPayload(String),

    /// No credentials are stored for the account
    #[error("No credentials stored for {0}")]
    MissingCredentials(String),

    /// The account or client is misconfigured
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),

    /// Reading or writing the credential store failed
    #[error("Credential store error: {0}")]
    CredentialStore(String),
}

/// Result type for remote calls
pub type RemoteResult<T> = Result<T, RemoteError>;

impl RemoteError {
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    pub const fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired { .. })
    }

    /// The server is in maintenance mode (HTTP 503)
    pub const fn is_maintenance(&self) -> bool {
        matches!(self, Self::ServerError { status: 503, .. })
    }

    /// Classify a non-success HTTP response.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::NOT_MODIFIED => Self::NotModified,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::AuthExpired {
                status: status.as_u16(),
            },
            StatusCode::SERVICE_UNAVAILABLE => Self::ServerError {
                status: status.as_u16(),
                message: format!("server is in maintenance mode ({})", status.as_u16()),
            },
            _ => Self::ServerError {
                status: status.as_u16(),
                message: parse_api_error(status, body),
            },
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return Self::InvalidPayload(error.to_string());
        }
        if error.is_builder() {
            return Self::InvalidConfiguration(error.to_string());
        }
        if let Some(status) = error.status() {
            return Self::from_status(status, "");
        }
        Self::Unreachable(error.to_string())
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidPayload(error.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", compact_text(&message), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", compact_text(trimmed), status.as_u16())
    }
}
