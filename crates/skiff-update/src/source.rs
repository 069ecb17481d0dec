use async_trait::async_trait;

use crate::error::SourceError;
use crate::info::UpdateInfo;
use crate::version::Version;

/// One update discovery channel (GitHub releases, a vendor web API, ...).
///
/// Implementations are stateless from the caller's perspective beyond their
/// own configuration and produce at most one [`UpdateInfo`] per check call.
///
/// Outcome contract:
/// - `Ok(Some(info))`: the source produced release metadata;
///   `info.update_needed` may still be false (kept for diagnostics).
/// - `Ok(None)`: the source answered authoritatively that it has nothing to
///   offer.
/// - `Err(_)`: the source is unavailable (network or parse failure). The
///   orchestrator logs this and consults the next source.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(
        &self,
        client: &reqwest::Client,
        current: &Version,
    ) -> Result<Option<UpdateInfo>, SourceError>;
}
