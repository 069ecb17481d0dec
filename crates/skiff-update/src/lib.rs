//! Shared update data model for the Skiff applications.
//!
//! This crate defines the pieces every update channel and the orchestrator
//! agree on:
//! - Release version parsing and ordering.
//! - The immutable per-check release metadata value.
//! - The [`UpdateSource`] capability implemented by concrete channels.
//! - The source-level error taxonomy.

mod error;
mod info;
mod source;
mod version;

pub use error::SourceError;
pub use info::{UpdateInfo, UpdateInfoError};
pub use source::UpdateSource;
pub use version::{Version, VersionParseError};
