use thiserror::Error;

/// Failure of a single update source during one check call.
///
/// A source error means "this channel is unavailable right now". It is
/// deliberately a different type from the "no update found" outcome
/// (`Ok(None)` from a check) so the two can never be conflated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("{source_name}: {operation} request failed: {details}")]
    Request {
        source_name: &'static str,
        operation: &'static str,
        details: String,
    },

    #[error("{source_name}: HTTP {status} from {url}")]
    Status {
        source_name: &'static str,
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("{source_name}: failed to parse response: {details}")]
    Parse {
        source_name: &'static str,
        details: String,
    },

    #[error("{source_name}: release tag {tag:?} is not a recognizable version")]
    InvalidVersionTag {
        source_name: &'static str,
        tag: String,
    },

    #[error("{source_name}: release page scrape found no usable version")]
    ScrapeFailed { source_name: &'static str },
}

impl SourceError {
    pub fn request<E>(source_name: &'static str, operation: &'static str, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::Request {
            source_name,
            operation,
            details: error.to_string(),
        }
    }

    pub fn status(
        source_name: &'static str,
        status: reqwest::StatusCode,
        url: impl Into<String>,
    ) -> Self {
        Self::Status {
            source_name,
            status,
            url: url.into(),
        }
    }

    pub fn parse<E>(source_name: &'static str, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::Parse {
            source_name,
            details: error.to_string(),
        }
    }

    pub fn invalid_tag(source_name: &'static str, tag: impl Into<String>) -> Self {
        Self::InvalidVersionTag {
            source_name,
            tag: tag.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SourceError;

    #[test]
    fn request_helper_formats_details() {
        let error = SourceError::request("github", "releases-latest", "connection refused");
        assert_eq!(
            error.to_string(),
            "github: releases-latest request failed: connection refused"
        );
    }

    #[test]
    fn invalid_tag_display_quotes_the_tag() {
        let error = SourceError::invalid_tag("github", "nightly");
        assert!(error.to_string().contains("\"nightly\""));
    }
}
