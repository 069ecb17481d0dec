use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use log::{debug, info};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::UpdateError;
use crate::ui::{DownloadProgress, UpdateProgress};

/// A downloaded update asset in its staging directory.
///
/// The staging directory is a plain directory under the system temp dir, not
/// an RAII temp dir: the deferred replacement script reads from it after this
/// process has exited. Stale directories from earlier attempts are swept by
/// [`crate::cleanup_stale_staging`].
#[derive(Debug, Clone)]
pub struct StagedAsset {
    pub path: PathBuf,
    pub staging_dir: PathBuf,
}

pub(crate) fn staging_dir_prefix(app_name: &str) -> String {
    format!("{app_name}_update_")
}

/// Download an update asset into a fresh UUID-named staging directory,
/// reporting progress along the way.
///
/// Progress degrades to indeterminate signals when the server omits
/// `Content-Length`. A full progress channel drops events rather than
/// stalling the transfer. Cancellation is observed between chunks; a
/// cancelled or failed download removes the staging directory again.
///
/// # Errors
/// Returns an error when the staging directory cannot be created, the
/// request fails, the server answers with a non-success status, or a stream
/// read/write fails.
pub async fn download_asset(
    client: &reqwest::Client,
    url: &str,
    app_name: &str,
    progress: &mpsc::Sender<UpdateProgress>,
    cancel: &CancellationToken,
) -> Result<StagedAsset, UpdateError> {
    let staging_dir =
        std::env::temp_dir().join(format!("{}{}", staging_dir_prefix(app_name), Uuid::new_v4()));
    std::fs::create_dir_all(&staging_dir)
        .map_err(|error| UpdateError::io("failed to create staging directory", error))?;

    match download_into(client, url, &staging_dir, progress, cancel).await {
        Ok(asset) => Ok(asset),
        Err(error) => {
            let _ = std::fs::remove_dir_all(&staging_dir);
            Err(error)
        }
    }
}

async fn download_into(
    client: &reqwest::Client,
    url: &str,
    staging_dir: &Path,
    progress: &mpsc::Sender<UpdateProgress>,
    cancel: &CancellationToken,
) -> Result<StagedAsset, UpdateError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|error| UpdateError::http("download request failed", error))?;

    let status = response.status();
    if !status.is_success() {
        return Err(UpdateError::DownloadStatus { status });
    }

    let dest = staging_dir.join(asset_file_name(url));
    let mut tracker = ProgressTracker::new(response.content_length());

    let mut file = tokio::fs::File::create(&dest).await.map_err(|error| {
        UpdateError::io_with_path("failed to create download file", &dest, &error)
    })?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        if cancel.is_cancelled() {
            debug!("download of {url} cancelled");
            return Err(UpdateError::Cancelled);
        }
        let chunk = chunk.map_err(|error| UpdateError::http("download stream error", error))?;
        file.write_all(&chunk).await.map_err(|error| {
            UpdateError::io_with_path("failed to write download data", &dest, &error)
        })?;
        if let Some(event) = tracker.on_chunk(chunk.len() as u64) {
            let _ = progress.try_send(UpdateProgress::Downloading(event));
        }
    }

    file.flush().await.map_err(|error| {
        UpdateError::io_with_path("failed to flush download file", &dest, &error)
    })?;

    info!("download complete: {} bytes from {url}", tracker.downloaded);
    Ok(StagedAsset {
        path: dest,
        staging_dir: staging_dir.to_path_buf(),
    })
}

fn asset_file_name(url: &str) -> &str {
    let raw_name = url.rsplit('/').next().unwrap_or("update-download");
    Path::new(raw_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && !n.contains(".."))
        .unwrap_or("update-download")
}

struct ProgressTracker {
    total: Option<u64>,
    downloaded: u64,
    last_percent: Option<u8>,
}

impl ProgressTracker {
    fn new(total: Option<u64>) -> Self {
        Self {
            total: total.filter(|&t| t > 0),
            downloaded: 0,
            last_percent: None,
        }
    }

    /// Account for one received chunk and decide what, if anything, to
    /// report. Percentages are clamped to 100 and only emitted when they
    /// advance, so receivers observe a non-decreasing sequence.
    #[allow(clippy::cast_possible_truncation)]
    fn on_chunk(&mut self, len: u64) -> Option<DownloadProgress> {
        self.downloaded += len;
        match self.total {
            Some(total) => {
                let percent = (self.downloaded.min(total) * 100 / total) as u8;
                if self.last_percent.is_none_or(|last| percent > last) {
                    self.last_percent = Some(percent);
                    Some(DownloadProgress::Percent(percent))
                } else {
                    None
                }
            }
            None => Some(DownloadProgress::Indeterminate),
        }
    }
}
