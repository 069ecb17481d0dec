//! GitHub releases update channel.
//!
//! Discovers the latest release of a configured repository and maps it to the
//! shared update metadata model:
//! - releases-latest API client with required `User-Agent`,
//! - asset matching against the application identifier,
//! - HTML releases-page scrape fallback for rate-limited API calls.

mod release;
mod scrape;
mod source;

pub(crate) const SOURCE_NAME: &str = "github";

pub use release::{Release, ReleaseAsset, asset_matches, match_asset};
pub use source::GitHubSource;
