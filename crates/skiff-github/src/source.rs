use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{StatusCode, header};

use skiff_update::{SourceError, UpdateInfo, UpdateSource, Version};

use crate::SOURCE_NAME;
use crate::release::{Release, release_to_info};
use crate::scrape::scrape_releases_page;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_HTML_BASE: &str = "https://github.com";

/// Update channel backed by a repository's GitHub releases.
///
/// The primary path is the releases-latest API. When that answers HTTP 403
/// (rate limited) the source falls back to scraping the public releases page
/// instead of failing the check outright.
#[derive(Debug, Clone)]
pub struct GitHubSource {
    owner: String,
    repo: String,
    app_name: String,
    api_base: String,
    html_base: String,
}

impl GitHubSource {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            app_name: app_name.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            html_base: DEFAULT_HTML_BASE.to_string(),
        }
    }

    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    #[must_use]
    pub fn with_html_base(mut self, base: impl Into<String>) -> Self {
        self.html_base = base.into();
        self
    }

    async fn check_via_scrape(
        &self,
        client: &reqwest::Client,
        current: &Version,
    ) -> Result<Option<UpdateInfo>, SourceError> {
        let url = format!("{}/{}/{}/releases", self.html_base, self.owner, self.repo);
        let response = client
            .get(&url)
            .header(header::USER_AGENT, &self.app_name)
            .send()
            .await
            .map_err(|error| SourceError::request(SOURCE_NAME, "releases page", error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::status(SOURCE_NAME, status, url));
        }

        let html = response
            .text()
            .await
            .map_err(|error| SourceError::request(SOURCE_NAME, "releases page body", error))?;

        let scraped = scrape_releases_page(&html).ok_or(SourceError::ScrapeFailed {
            source_name: SOURCE_NAME,
        })?;
        debug!(
            "scraped releases page of {}/{}: tag {}",
            self.owner, self.repo, scraped.tag
        );

        let release_url = format!(
            "{}/{}/{}/releases/tag/{}",
            self.html_base, self.owner, self.repo, scraped.tag
        );
        let download_url = format!(
            "{}/{}/{}/archive/refs/tags/{}.zip",
            self.html_base, self.owner, self.repo, scraped.tag
        );
        let info = UpdateInfo::new(scraped.version, download_url, release_url)
            .map_err(|error| SourceError::parse(SOURCE_NAME, error))?
            .with_release_notes(scraped.notes)
            .with_update_needed(scraped.version > *current);
        Ok(Some(info))
    }
}

#[async_trait]
impl UpdateSource for GitHubSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn check(
        &self,
        client: &reqwest::Client,
        current: &Version,
    ) -> Result<Option<UpdateInfo>, SourceError> {
        let url = format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base, self.owner, self.repo
        );
        let response = client
            .get(&url)
            .header(header::USER_AGENT, &self.app_name)
            .send()
            .await
            .map_err(|error| SourceError::request(SOURCE_NAME, "releases-latest", error))?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            warn!(
                "github releases api rate limited for {}/{}, falling back to page scrape",
                self.owner, self.repo
            );
            return self.check_via_scrape(client, current).await;
        }
        if !status.is_success() {
            return Err(SourceError::status(SOURCE_NAME, status, url));
        }

        let release: Release = response
            .json()
            .await
            .map_err(|error| SourceError::parse(SOURCE_NAME, error))?;
        release_to_info(release, current, &self.app_name).map(Some)
    }
}
