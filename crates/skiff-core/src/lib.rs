//! Update orchestration for the Skiff applications.
//!
//! This crate drives the whole check-and-install cycle on top of the
//! channels defined in `skiff-update`:
//! - The [`Updater`] orchestrator (first-wins source resolution).
//! - Asset download with progress reporting and cancellation.
//! - The deferred self-replace install protocol.
//! - The UI adapter boundary (progress events, prompt, message catalog).

mod download;
mod error;
mod install;
mod script;
mod ui;
mod updater;

/// Progress-reporting asset download into a UUID-named staging directory.
pub use download::{StagedAsset, download_asset};
/// Orchestrator-level error taxonomy.
pub use error::UpdateError;
/// Deferred-script install protocol and staging-dir housekeeping.
pub use install::{LaunchedInstall, cleanup_stale_staging, exit_for_update, prepare_install};
/// Progress events, prompt capability, and localized message boundary.
pub use ui::{AutoAccept, DownloadProgress, EnglishCatalog, MessageCatalog, UpdatePrompt, UpdateProgress};
/// Check/install cycle driver.
pub use updater::{CheckOutcome, CycleOutcome, Updater};
