//! Best-effort extraction of release data from the public releases page.
//!
//! Used only when the releases API answers HTTP 403 (rate limited). The page
//! has no stable schema; both extractions are regex-based and may fail, in
//! which case the source reports itself unavailable rather than "no update".

use std::sync::LazyLock;

use regex::Regex;

use skiff_update::Version;

static TAG_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"releases/tag/(v?(\d+)\.(\d+)\.(\d+)(?:\.(\d+))?)").expect("tag link pattern is valid")
});

static NOTES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<div[^>]*class="[^"]*markdown-body[^"]*"[^>]*>(.*?)</div>"#)
        .expect("notes container pattern is valid")
});

static MARKUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("markup pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScrapedRelease {
    /// Tag exactly as it appears in the page link, e.g. `v3.4.5`.
    pub tag: String,
    pub version: Version,
    /// Plain-text release notes; empty when the notes container is missing.
    pub notes: String,
}

pub(crate) fn scrape_releases_page(html: &str) -> Option<ScrapedRelease> {
    let caps = TAG_LINK_RE.captures(html)?;
    let tag = caps.get(1)?.as_str().to_string();
    let version = Version::parse(&tag).ok()?;
    let notes = scrape_release_notes(html).unwrap_or_default();
    Some(ScrapedRelease {
        tag,
        version,
        notes,
    })
}

fn scrape_release_notes(html: &str) -> Option<String> {
    let caps = NOTES_RE.captures(html)?;
    Some(strip_markup(caps.get(1)?.as_str()))
}

fn strip_markup(fragment: &str) -> String {
    let text = MARKUP_RE.replace_all(fragment, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
