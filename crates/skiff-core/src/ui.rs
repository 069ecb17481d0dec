//! Boundary between the update machinery and whatever front-end hosts it.
//!
//! The orchestrator never touches a dialog or a resource table directly: it
//! emits [`UpdateProgress`] events over a channel, asks an injected
//! [`UpdatePrompt`] for consent, and takes user-facing strings from an
//! injected [`MessageCatalog`].

use async_trait::async_trait;

use skiff_update::UpdateInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadProgress {
    /// Percent complete, 0..=100, monotonically non-decreasing.
    Percent(u8),
    /// The server did not announce a content length; the caller may receive
    /// any number of these and no percentage at all.
    Indeterminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateProgress {
    Downloading(DownloadProgress),
    Extracting,
    Applying,
}

/// Asks the user whether a discovered update should be installed.
#[async_trait]
pub trait UpdatePrompt: Send + Sync {
    async fn confirm_update(&self, info: &UpdateInfo) -> bool;
}

/// Prompt for silent update cycles: accepts every update without asking.
pub struct AutoAccept;

#[async_trait]
impl UpdatePrompt for AutoAccept {
    async fn confirm_update(&self, _info: &UpdateInfo) -> bool {
        true
    }
}

/// Localized user-facing strings. Host applications plug in their own
/// resource-backed catalog; the default is plain English.
pub trait MessageCatalog: Send + Sync {
    fn no_update_available(&self) -> String;
    fn update_available(&self, info: &UpdateInfo) -> String;
}

pub struct EnglishCatalog;

impl MessageCatalog for EnglishCatalog {
    fn no_update_available(&self) -> String {
        "No update available".to_string()
    }

    fn update_available(&self, info: &UpdateInfo) -> String {
        format!("Version {} is available", info.version)
    }
}
