use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use regex::Regex;
use serde::Deserialize;

use skiff_update::{SourceError, UpdateInfo, UpdateSource, Version};

use crate::SOURCE_NAME;

static SHA256_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"SHA256:\s*([0-9a-fA-F]{64})").expect("checksum marker pattern is valid")
});

/// Update channel backed by a caller-supplied JSON endpoint.
///
/// The request carries the application name and current version as headers so
/// a multi-tenant server can branch on them; an API key header is attached
/// when configured.
#[derive(Debug, Clone)]
pub struct WebApiSource {
    endpoint: String,
    app_name: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    update_available: bool,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    release_url: Option<String>,
    #[serde(default)]
    release_notes: Option<String>,
    #[serde(default)]
    is_mandatory: bool,
    #[serde(default)]
    published_date: Option<DateTime<Utc>>,
}

impl WebApiSource {
    pub fn new(endpoint: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            app_name: app_name.into(),
            api_key: None,
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    // The server already saw our version in the request headers, so its
    // `updateAvailable` verdict is authoritative; metadata-only answers are
    // kept as diagnostics.
    fn response_to_info(&self, response: ApiResponse) -> Result<Option<UpdateInfo>, SourceError> {
        let download_url = response.download_url.filter(|url| !url.is_empty());

        let (Some(tag), Some(download_url)) = (response.version, download_url) else {
            if response.update_available {
                return Err(SourceError::parse(
                    SOURCE_NAME,
                    "server reported an update without version or download url",
                ));
            }
            debug!("web api at {} reports nothing to offer", self.endpoint);
            return Ok(None);
        };

        let version =
            Version::parse(&tag).map_err(|_| SourceError::invalid_tag(SOURCE_NAME, &tag))?;
        let release_notes = response.release_notes.unwrap_or_default();
        // Legacy servers embed the digest in the notes blob instead of a
        // dedicated field.
        let checksum = extract_sha256(&release_notes);

        let release_url = response
            .release_url
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| download_url.clone());

        let mut info = UpdateInfo::new(version, download_url, release_url)
            .map_err(|error| SourceError::parse(SOURCE_NAME, error))?
            .with_release_notes(release_notes)
            .with_checksum(checksum)
            .with_mandatory(response.is_mandatory)
            .with_update_needed(response.update_available);
        if let Some(published_date) = response.published_date {
            info = info.with_published_at(published_date);
        }
        Ok(Some(info))
    }
}

/// Extract a `SHA256: <64-hex>` marker from an unstructured notes blob.
#[must_use]
pub fn extract_sha256(notes: &str) -> Option<String> {
    SHA256_MARKER_RE
        .captures(notes)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

#[async_trait]
impl UpdateSource for WebApiSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn check(
        &self,
        client: &reqwest::Client,
        current: &Version,
    ) -> Result<Option<UpdateInfo>, SourceError> {
        let mut request = client
            .get(&self.endpoint)
            .header("X-Application-Name", &self.app_name)
            .header("X-Application-Version", current.to_string());
        if let Some(api_key) = &self.api_key {
            request = request.header("X-API-Key", api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|error| SourceError::request(SOURCE_NAME, "update check", error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::status(SOURCE_NAME, status, &self.endpoint));
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|error| SourceError::parse(SOURCE_NAME, error))?;
        self.response_to_info(body)
    }
}
