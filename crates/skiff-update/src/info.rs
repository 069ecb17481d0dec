use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::version::Version;

/// Release metadata produced by one source for one check cycle.
///
/// Immutable once built; consumed by the orchestrator within the same
/// check/install cycle and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    pub version: Version,
    pub download_url: String,
    pub release_url: String,
    pub release_notes: String,
    /// SHA-256 hex digest of the downloadable asset. `None` means the source
    /// provided no checksum and verification is skipped.
    pub checksum: Option<String>,
    pub mandatory: bool,
    pub published_at: DateTime<Utc>,
    /// Whether the source considers this release an update over the caller's
    /// current version. Distinct from "a later version exists": a source may
    /// report metadata for diagnostics even when nothing is newer.
    pub update_needed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UpdateInfoError {
    #[error("update info field `{field}` must not be empty")]
    EmptyField { field: &'static str },
}

impl UpdateInfo {
    /// Build update metadata for a release.
    ///
    /// # Errors
    /// Fails when `download_url` or `release_url` is empty.
    pub fn new(
        version: Version,
        download_url: impl Into<String>,
        release_url: impl Into<String>,
    ) -> Result<Self, UpdateInfoError> {
        let download_url = download_url.into();
        if download_url.is_empty() {
            return Err(UpdateInfoError::EmptyField {
                field: "download_url",
            });
        }
        let release_url = release_url.into();
        if release_url.is_empty() {
            return Err(UpdateInfoError::EmptyField {
                field: "release_url",
            });
        }

        Ok(Self {
            version,
            download_url,
            release_url,
            release_notes: String::new(),
            checksum: None,
            mandatory: false,
            published_at: Utc::now(),
            update_needed: false,
        })
    }

    #[must_use]
    pub fn with_release_notes(mut self, notes: impl Into<String>) -> Self {
        self.release_notes = notes.into();
        self
    }

    #[must_use]
    pub fn with_checksum(mut self, checksum: Option<String>) -> Self {
        self.checksum = checksum;
        self
    }

    #[must_use]
    pub fn with_mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = mandatory;
        self
    }

    #[must_use]
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = published_at;
        self
    }

    #[must_use]
    pub fn with_update_needed(mut self, update_needed: bool) -> Self {
        self.update_needed = update_needed;
        self
    }
}
