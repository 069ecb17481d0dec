use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("another update operation is already in flight")]
    Busy,

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Http {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("download failed with HTTP {status}")]
    DownloadStatus { status: reqwest::StatusCode },

    #[error("{context}: {source}")]
    Zip {
        context: &'static str,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("unsupported update asset format: {file_name}")]
    UnsupportedAsset { file_name: String },

    #[error("checksum mismatch for {file_name}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file_name: String,
        expected: String,
        actual: String,
    },

    /// The deferred replacement script could not be written or launched.
    /// The process keeps running; nothing destructive has happened yet.
    #[error("install script {context}: {source}")]
    InstallScript {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("could not determine install location: {details}")]
    InstallLocation { details: String },

    #[error("update cancelled")]
    Cancelled,
}

impl UpdateError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn http(context: &'static str, source: reqwest::Error) -> Self {
        Self::Http { context, source }
    }

    pub(crate) fn zip(context: &'static str, source: zip::result::ZipError) -> Self {
        Self::Zip { context, source }
    }

    pub(crate) fn io_with_path(context: &'static str, path: &Path, source: &std::io::Error) -> Self {
        Self::io(
            context,
            std::io::Error::new(source.kind(), format!("{}: {source}", path.display())),
        )
    }
}
