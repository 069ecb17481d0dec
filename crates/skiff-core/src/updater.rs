use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use skiff_update::{UpdateInfo, UpdateSource, Version};

use crate::download::download_asset;
use crate::error::UpdateError;
use crate::install::{exit_for_update, prepare_install};
use crate::ui::{EnglishCatalog, MessageCatalog, UpdatePrompt, UpdateProgress};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of one update check.
#[derive(Debug, Clone)]
pub enum CheckOutcome {
    UpdateAvailable(UpdateInfo),
    /// No source reported a needed update. `latest_seen` carries the first
    /// release metadata any source produced, for diagnostics.
    UpToDate { latest_seen: Option<UpdateInfo> },
}

/// Result of a full check-prompt-install cycle that did not end in an
/// install. The accepted-install path terminates the process instead of
/// returning.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    UpToDate { message: String },
    Declined(UpdateInfo),
}

/// Drives the update sources, the downloader, and the installer for one
/// application.
///
/// Owns the HTTP client explicitly; nothing here reads ambient global state.
/// One check-and-install cycle may be in flight per instance: concurrent
/// calls are rejected with [`UpdateError::Busy`] rather than racing.
pub struct Updater {
    client: reqwest::Client,
    sources: Vec<Box<dyn UpdateSource>>,
    current: Version,
    app_name: String,
    install_target: Option<PathBuf>,
    catalog: Box<dyn MessageCatalog>,
    busy: AtomicBool,
}

impl Updater {
    /// Build an updater for an application at its current version.
    ///
    /// # Errors
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(app_name: impl Into<String>, current: Version) -> Result<Self, UpdateError> {
        let app_name = app_name.into();
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(format!("{app_name}/{current}"))
            .build()
            .map_err(|error| UpdateError::http("failed to build http client", error))?;

        Ok(Self {
            client,
            sources: Vec::new(),
            current,
            app_name,
            install_target: None,
            catalog: Box::new(EnglishCatalog),
            busy: AtomicBool::new(false),
        })
    }

    /// Register an update source. Sources are consulted in registration
    /// order.
    #[must_use]
    pub fn with_source(mut self, source: Box<dyn UpdateSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Override the executable path that the installer replaces and
    /// relaunches. Defaults to the running executable.
    #[must_use]
    pub fn with_install_target(mut self, target: PathBuf) -> Self {
        self.install_target = Some(target);
        self
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: Box<dyn MessageCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    #[must_use]
    pub fn current_version(&self) -> Version {
        self.current
    }

    /// Ask each configured source, in order, whether an update exists.
    ///
    /// First-wins policy: the first source reporting a needed update
    /// short-circuits the loop, even if a later source might know a newer
    /// version. This is a deliberate contract, not an oversight. A failing
    /// source is logged and skipped; it never aborts the check.
    ///
    /// # Errors
    /// Returns [`UpdateError::Busy`] when another cycle is in flight on this
    /// instance.
    pub async fn check_for_update(&self) -> Result<CheckOutcome, UpdateError> {
        let _guard = self.begin()?;

        let mut latest_seen = None;
        for source in &self.sources {
            match source.check(&self.client, &self.current).await {
                Ok(Some(info)) if info.update_needed => {
                    info!(
                        "source {} reports update {} over current {}",
                        source.name(),
                        info.version,
                        self.current
                    );
                    return Ok(CheckOutcome::UpdateAvailable(info));
                }
                Ok(Some(info)) => {
                    debug!(
                        "source {} reports {}, no update over {}",
                        source.name(),
                        info.version,
                        self.current
                    );
                    if latest_seen.is_none() {
                        latest_seen = Some(info);
                    }
                }
                Ok(None) => debug!("source {} has nothing to offer", source.name()),
                Err(error) => warn!("update source {} unavailable: {error}", source.name()),
            }
        }

        Ok(CheckOutcome::UpToDate { latest_seen })
    }

    /// Download the update asset and hand it to the installer.
    ///
    /// **Does not return on success.** Once the deferred replacement script
    /// is running, this process exits to release its file handles. Every
    /// failure before that point surfaces as an error and leaves the process
    /// running; partially downloaded staging directories are removed.
    ///
    /// # Errors
    /// Returns [`UpdateError::Busy`] when another cycle is in flight, or any
    /// download/verification/install-script failure.
    pub async fn download_and_install(
        &self,
        info: &UpdateInfo,
        progress: mpsc::Sender<UpdateProgress>,
        cancel: CancellationToken,
    ) -> Result<Infallible, UpdateError> {
        let _guard = self.begin()?;

        let target = self.install_target()?;
        let asset = download_asset(
            &self.client,
            &info.download_url,
            &self.app_name,
            &progress,
            &cancel,
        )
        .await?;
        let launched =
            prepare_install(&asset, info.checksum.as_deref(), &target, &progress).await?;

        exit_for_update(&launched)
    }

    /// Full cycle: check, confirm through the UI adapter, install.
    ///
    /// Mandatory updates skip the prompt. The accepted-install path does not
    /// return (see [`Updater::download_and_install`]); the outcomes that do
    /// return are "up to date" and "declined".
    ///
    /// # Errors
    /// Propagates check and install errors.
    pub async fn run_update_cycle(
        &self,
        prompt: &dyn UpdatePrompt,
        progress: mpsc::Sender<UpdateProgress>,
        cancel: CancellationToken,
    ) -> Result<CycleOutcome, UpdateError> {
        let info = match self.check_for_update().await? {
            CheckOutcome::UpdateAvailable(info) => info,
            CheckOutcome::UpToDate { .. } => {
                let message = self.catalog.no_update_available();
                info!("{message}");
                return Ok(CycleOutcome::UpToDate { message });
            }
        };

        info!("{}", self.catalog.update_available(&info));
        if !info.mandatory && !prompt.confirm_update(&info).await {
            info!("update to {} declined", info.version);
            return Ok(CycleOutcome::Declined(info));
        }

        let never = self.download_and_install(&info, progress, cancel).await?;
        match never {}
    }

    fn install_target(&self) -> Result<PathBuf, UpdateError> {
        if let Some(target) = &self.install_target {
            return Ok(target.clone());
        }
        std::env::current_exe().map_err(|error| UpdateError::InstallLocation {
            details: error.to_string(),
        })
    }

    fn begin(&self) -> Result<BusyGuard<'_>, UpdateError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(UpdateError::Busy);
        }
        Ok(BusyGuard { flag: &self.busy })
    }
}

struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
