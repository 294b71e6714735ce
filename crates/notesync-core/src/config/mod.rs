//! Engine configuration.
//!
//! `EngineConfig` is read from a JSON file (see the CLI for its location),
//! then overridden by `NOTESYNC_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::normalize_text_option;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Environment variable overriding the database path
pub const ENV_DB_PATH: &str = "NOTESYNC_DB_PATH";
/// Environment variable overriding the Wi-Fi only policy
pub const ENV_SYNC_ONLY_ON_WIFI: &str = "NOTESYNC_SYNC_ONLY_ON_WIFI";

/// Runtime configuration for the sync engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct EngineConfig {
    /// Only sync on unmetered networks
    pub sync_only_on_wifi: bool,
    /// Whole-request timeout for server calls
    pub http_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Local database file; the caller picks a platform default when unset
    pub database_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sync_only_on_wifi: false,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            database_path: None,
        }
    }
}

/// Timeouts applied to every HTTP client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        EngineConfig::default().http_timeouts()
    }
}

impl EngineConfig {
    /// Load configuration from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(raw) => Self::parse(&raw)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(error) => return Err(error.into()),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse and validate a JSON configuration document.
    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(path) = normalize_text_option(lookup(ENV_DB_PATH)) {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_SYNC_ONLY_ON_WIFI)) {
            self.sync_only_on_wifi = parse_bool(&raw).ok_or_else(|| {
                Error::InvalidInput(format!("{ENV_SYNC_ONLY_ON_WIFI} must be a boolean, got '{raw}'"))
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.http_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(Error::InvalidInput(
                "timeouts must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    pub const fn http_timeouts(&self) -> HttpTimeouts {
        HttpTimeouts {
            connect: Duration::from_secs(self.connect_timeout_secs),
            request: Duration::from_secs(self.http_timeout_secs),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
