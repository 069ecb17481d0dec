use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use skiff_update::{SourceError, UpdateInfo, Version};

use crate::SOURCE_NAME;

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

#[derive(Debug, Deserialize)]
pub struct Release {
    pub tag_name: String,
    pub html_url: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
    #[serde(default)]
    pub zipball_url: Option<String>,
}

/// Whether a release asset belongs to this application: the name contains the
/// application identifier (case-insensitive) and ends in `.exe` or `.zip`.
#[must_use]
pub fn asset_matches(asset_name: &str, app_name: &str) -> bool {
    let name = asset_name.to_ascii_lowercase();
    if !name.contains(&app_name.to_ascii_lowercase()) {
        return false;
    }
    Path::new(&name)
        .extension()
        .is_some_and(|ext| ext == "exe" || ext == "zip")
}

/// First matching asset in API order. Deterministic for a fixed asset list;
/// the API itself does not guarantee a stable order across calls.
#[must_use]
pub fn match_asset<'a>(assets: &'a [ReleaseAsset], app_name: &str) -> Option<&'a ReleaseAsset> {
    assets.iter().find(|asset| asset_matches(&asset.name, app_name))
}

pub(crate) fn release_to_info(
    release: Release,
    current: &Version,
    app_name: &str,
) -> Result<UpdateInfo, SourceError> {
    let version = Version::parse(&release.tag_name)
        .map_err(|_| SourceError::invalid_tag(SOURCE_NAME, &release.tag_name))?;

    let download_url = match match_asset(&release.assets, app_name) {
        Some(asset) => asset.browser_download_url.clone(),
        None => release
            .zipball_url
            .clone()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                SourceError::parse(SOURCE_NAME, "release has no matching asset and no zipball url")
            })?,
    };

    let mut info = UpdateInfo::new(version, download_url, release.html_url)
        .map_err(|error| SourceError::parse(SOURCE_NAME, error))?
        .with_release_notes(release.body.unwrap_or_default())
        .with_update_needed(version > *current);
    if let Some(published_at) = release.published_at {
        info = info.with_published_at(published_at);
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::{Release, ReleaseAsset, asset_matches, match_asset, release_to_info};
    use skiff_update::{SourceError, Version};

    fn asset(name: &str) -> ReleaseAsset {
        ReleaseAsset {
            name: name.to_string(),
            browser_download_url: format!("https://example.com/{name}"),
        }
    }

    #[test]
    fn first_qualifying_asset_wins() {
        let assets = [
            asset("MyApp-Setup.exe"),
            asset("MyApp.zip"),
            asset("readme.txt"),
        ];
        let selected = match_asset(&assets, "MyApp").expect("an asset should match");
        assert_eq!(selected.name, "MyApp-Setup.exe");
    }

    #[test]
    fn matching_is_deterministic_for_a_fixed_list() {
        let assets = [asset("myapp.zip"), asset("MyApp-Setup.exe")];
        let first = match_asset(&assets, "MyApp").map(|a| a.name.clone());
        let second = match_asset(&assets, "MyApp").map(|a| a.name.clone());
        assert_eq!(first, second);
        assert_eq!(first.as_deref(), Some("myapp.zip"));
    }

    #[test]
    fn matching_ignores_case_of_name_and_extension() {
        assert!(asset_matches("MYAPP-portable.ZIP", "myapp"));
        assert!(asset_matches("myapp-setup.Exe", "MyApp"));
    }

    #[test]
    fn non_binary_assets_never_match() {
        assert!(!asset_matches("readme.txt", "MyApp"));
        assert!(!asset_matches("MyApp.txt", "MyApp"));
        assert!(!asset_matches("MyApp.tar.gz", "MyApp"));
    }

    #[test]
    fn unrelated_names_never_match() {
        assert!(!asset_matches("OtherTool-Setup.exe", "MyApp"));
    }

    fn release(tag: &str, assets: Vec<ReleaseAsset>) -> Release {
        Release {
            tag_name: tag.to_string(),
            html_url: "https://github.com/skiffworks/skiff/releases/tag/latest".to_string(),
            body: Some("notes".to_string()),
            published_at: None,
            assets,
            zipball_url: Some("https://api.github.com/zipball/latest".to_string()),
        }
    }

    #[test]
    fn newer_tag_needs_update() {
        let current = Version::new(1, 0, 0, 0);
        let info = release_to_info(release("v1.0.1", vec![asset("MyApp.zip")]), &current, "MyApp")
            .expect("release should map");
        assert!(info.update_needed);
        assert_eq!(info.version, Version::new(1, 0, 1, 0));
        assert_eq!(info.download_url, "https://example.com/MyApp.zip");
    }

    #[test]
    fn equal_tag_reports_metadata_without_update() {
        let current = Version::new(1, 0, 1, 0);
        let info = release_to_info(release("v1.0.1", vec![asset("MyApp.zip")]), &current, "MyApp")
            .expect("release should map");
        assert!(!info.update_needed);
    }

    #[test]
    fn falls_back_to_zipball_when_nothing_matches() {
        let current = Version::new(1, 0, 0, 0);
        let info = release_to_info(release("v2.0.0", vec![asset("readme.txt")]), &current, "MyApp")
            .expect("release should map");
        assert_eq!(info.download_url, "https://api.github.com/zipball/latest");
    }

    #[test]
    fn unparseable_tag_is_a_loud_failure() {
        let current = Version::new(1, 0, 0, 0);
        let result = release_to_info(release("nightly", vec![asset("MyApp.zip")]), &current, "MyApp");
        assert!(matches!(
            result,
            Err(SourceError::InvalidVersionTag { ref tag, .. }) if tag == "nightly"
        ));
    }
}
