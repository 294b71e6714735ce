//! Server capabilities (supported Notes API versions and brand colors).

use reqwest::header::{ETAG, IF_NONE_MATCH};
use reqwest::{Method, StatusCode};
use serde_json::Value;

use super::client::HttpTransport;
use super::error::{RemoteError, RemoteResult};
use super::wire::{quote_etag, strip_etag};
use crate::models::{parse_api_versions, Capabilities};
use crate::util::normalize_hex_color;

const CAPABILITIES_ENDPOINT: &str = "/ocs/v2.php/cloud/capabilities";

/// Result of a conditional capabilities request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilitiesOutcome {
    NotModified,
    Changed(Capabilities),
}

/// Fetch capabilities, sending `last_etag` as a validator.
pub async fn fetch_capabilities(
    transport: &HttpTransport,
    last_etag: Option<&str>,
) -> RemoteResult<CapabilitiesOutcome> {
    let mut request = transport
        .request(Method::GET, CAPABILITIES_ENDPOINT)
        .query(&[("format", "json")])
        .header("OCS-APIRequest", "true");
    if let Some(etag) = last_etag.filter(|etag| !etag.trim().is_empty()) {
        request = request.header(IF_NONE_MATCH, quote_etag(etag));
    }

    let response = transport.send(request).await?;
    if response.status == StatusCode::NOT_MODIFIED {
        return Ok(CapabilitiesOutcome::NotModified);
    }
    let response = response.error_for_status()?;
    let etag = response
        .headers
        .get(ETAG)
        .and_then(|value| value.to_str().ok())
        .map(strip_etag)
        .filter(|etag| !etag.is_empty());
    let capabilities = parse_capabilities(&response.body, etag)?;
    Ok(CapabilitiesOutcome::Changed(capabilities))
}

/// Parse an OCS capabilities document.
pub fn parse_capabilities(body: &str, etag: Option<String>) -> RemoteResult<Capabilities> {
    let document: Value = serde_json::from_str(body)?;
    let capabilities = document
        .pointer("/ocs/data/capabilities")
        .ok_or_else(|| {
            RemoteError::InvalidPayload("response has no ocs.data.capabilities".to_string())
        })?;

    let api_versions = capabilities
        .pointer("/notes/api_version")
        .map(|versions| parse_api_versions(&versions.to_string()))
        .unwrap_or_default();

    let color = |key: &str| {
        capabilities
            .pointer(&format!("/theming/{key}"))
            .and_then(Value::as_str)
            .and_then(normalize_hex_color)
    };

    Ok(Capabilities {
        api_versions,
        color: color("color"),
        text_color: color("color-text"),
        etag,
    })
}
