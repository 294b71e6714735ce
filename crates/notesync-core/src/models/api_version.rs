//! Notes API versions advertised by servers.

use std::cmp::Ordering;
use std::fmt;

use serde_json::Value;

/// A `major.minor` Notes API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    pub const V0_2: Self = Self::new(0, 2);
    pub const V1_0: Self = Self::new(1, 0);

    /// Versions this client can speak, preferred first.
    pub const SUPPORTED: [Self; 2] = [Self::V1_0, Self::V0_2];

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse a loose version string such as `1.2`, `v1.3-beta` or `0`.
    ///
    /// Missing or non-numeric parts read as zero.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.trim().split('.');
        let major = parts.next().map_or(0, extract_number);
        let minor = parts.next().map_or(0, extract_number);
        Self { major, minor }
    }

    /// Whether this client implements the major version.
    pub fn is_supported(self) -> bool {
        Self::SUPPORTED
            .iter()
            .any(|supported| supported.major == self.major)
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
    }
}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

fn extract_number(part: &str) -> u32 {
    let digits: String = part
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(0)
}

/// Parse the versions a server advertises.
///
/// Accepts a JSON array of strings or numbers (`["0.2","1.0"]`, `[0.2, 1]`)
/// as well as the bare header form without brackets (`"0.2", "1.0"`).
/// `0.0` entries are dropped. The result is sorted highest first and deduplicated.
pub fn parse_api_versions(raw: &str) -> Vec<ApiVersion> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let wrapped;
    let json = if raw.starts_with('[') {
        raw
    } else {
        wrapped = format!("[{raw}]");
        &wrapped
    };

    let Ok(Value::Array(entries)) = serde_json::from_str::<Value>(json) else {
        tracing::debug!("Could not parse API versions from {raw:?}");
        return Vec::new();
    };

    let mut versions: Vec<ApiVersion> = entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(value) => Some(ApiVersion::parse(value)),
            Value::Number(value) => Some(ApiVersion::parse(&value.to_string())),
            _ => None,
        })
        .filter(|version| *version != ApiVersion::new(0, 0))
        .collect();
    versions.sort_unstable_by(|a, b| b.cmp(a));
    versions.dedup();
    versions
}

/// Storage form of a version list, e.g. `[1.0,0.2]`.
pub fn format_api_versions(versions: &[ApiVersion]) -> String {
    let joined = versions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("[{joined}]")
}

/// Highest advertised version whose major version this client supports.
pub fn preferred_api_version(versions: &[ApiVersion]) -> Option<ApiVersion> {
    versions
        .iter()
        .copied()
        .filter(|version| version.is_supported())
        .max()
}
