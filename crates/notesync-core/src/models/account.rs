//! Account model

use std::fmt;

use serde::{Deserialize, Serialize};

use super::api_version::{preferred_api_version, ApiVersion};

/// Default brand color of Nextcloud servers.
pub const DEFAULT_COLOR: &str = "#0082C9";
/// Default text color drawn on top of the brand color.
pub const DEFAULT_TEXT_COLOR: &str = "#FFFFFF";

/// Local identifier of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

impl AccountId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One login on a remote notes server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Server base URL without trailing slash
    pub url: String,
    pub username: String,
    /// Unique `user@host` name, also the credential lookup key
    pub account_name: String,
    pub display_name: Option<String>,
    /// Versions advertised by the server, highest first
    #[serde(skip)]
    pub api_versions: Vec<ApiVersion>,
    /// ETag of the last note list response
    pub etag: Option<String>,
    /// Last-Modified of the last note list response (Unix ms)
    pub modified: Option<i64>,
    pub capabilities_etag: Option<String>,
    pub color: String,
    pub text_color: String,
}

impl Account {
    /// Version used to talk to this account's server.
    pub fn preferred_api_version(&self) -> Option<ApiVersion> {
        preferred_api_version(&self.api_versions)
    }

    /// Name shown to users.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.account_name)
    }
}

/// Input for creating an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub url: String,
    pub username: String,
    pub account_name: String,
    pub display_name: Option<String>,
}

impl NewAccount {
    /// Build an account for `username` on `url`, deriving the `user@host` name.
    pub fn new(url: &str, username: &str) -> Self {
        let url = url.trim().trim_end_matches('/').to_string();
        let username = username.trim().to_string();
        let host = url
            .split_once("://")
            .map_or(url.as_str(), |(_, rest)| rest)
            .to_string();
        Self {
            account_name: format!("{username}@{host}"),
            url,
            username,
            display_name: None,
        }
    }
}

/// Server capabilities relevant for syncing and presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub api_versions: Vec<ApiVersion>,
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub etag: Option<String>,
}
