use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[vV]?(\d+)\.(\d+)\.(\d+)(?:\.(\d+))?$").expect("tag pattern is valid")
});

/// Four-component release version as used in release tags
/// (`vMAJOR.MINOR.PATCH[.REVISION]`). Missing components are 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub revision: u32,
}

impl Version {
    #[must_use]
    pub fn new(major: u32, minor: u32, patch: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            revision,
        }
    }

    /// Parse a release tag.
    ///
    /// Accepts an optional `v`/`V` prefix and one to four dot-separated
    /// components. Tags that do not match the release-tag shape go through a
    /// generic numeric-dot pass that reads the leading digits of each
    /// component (so `1.2-beta` parses as `1.2.0.0`).
    ///
    /// # Errors
    /// Returns an error when no numeric component can be extracted at all.
    pub fn parse(tag: &str) -> Result<Self, VersionParseError> {
        let trimmed = tag.trim();

        if let Some(caps) = TAG_RE.captures(trimmed) {
            let component = |idx: usize| {
                caps.get(idx)
                    .map_or(Ok(0), |m| m.as_str().parse::<u32>())
                    .map_err(|_| VersionParseError::new(tag))
            };
            return Ok(Self::new(
                component(1)?,
                component(2)?,
                component(3)?,
                component(4)?,
            ));
        }

        Self::parse_numeric_dot(trimmed).ok_or_else(|| VersionParseError::new(tag))
    }

    /// Total version parse: like [`Version::parse`] but falls back to the
    /// `0.0.0.0` sentinel on input with no numeric components.
    ///
    /// The sentinel compares older than every real version, so callers that
    /// use the result to decide "is an update needed" should prefer
    /// [`Version::parse`] and fail loudly instead of silently suppressing an
    /// update.
    #[must_use]
    pub fn parse_or_zero(tag: &str) -> Self {
        Self::parse(tag).unwrap_or_default()
    }

    fn parse_numeric_dot(input: &str) -> Option<Self> {
        let stripped = input
            .strip_prefix(['v', 'V'])
            .unwrap_or(input);

        let mut components = [0_u32; 4];
        let mut parsed_any = false;

        for (slot, part) in components.iter_mut().zip(stripped.split('.')) {
            let digits: &str = {
                let end = part
                    .char_indices()
                    .find(|(_, ch)| !ch.is_ascii_digit())
                    .map_or(part.len(), |(idx, _)| idx);
                &part[..end]
            };
            let Ok(value) = digits.parse::<u32>() else {
                break;
            };
            *slot = value;
            parsed_any = true;
        }

        parsed_any.then(|| {
            let [major, minor, patch, revision] = components;
            Self::new(major, minor, patch, revision)
        })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then(self.revision.cmp(&other.revision))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.patch, self.revision
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no numeric version components in {input:?}")]
pub struct VersionParseError {
    pub input: String,
}

impl VersionParseError {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
        }
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
