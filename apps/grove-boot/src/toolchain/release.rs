//! Release index access.
//!
//! Releases are published on GitHub. The latest tag comes from the REST API
//! (`<api>/repos/<owner>/<project>/releases/latest`, field `tag_name`) and
//! archives from the release download URL:
//!
//! ```text
//! <download>/<owner>/<project>/releases/download/v1.2.3/<project>_1.2.3_linux_amd64.tar.gz
//! <download>/<owner>/<project>/releases/download/v1.2.3/<project>_1.2.3_checksums.txt
//! ```
//!
//! Both servers can be pointed elsewhere (see [`crate::config`]), which is
//! how the integration tests serve fake releases.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::download::download_file;
use super::{Platform, VersionTag};
use crate::errors::BootstrapError;

/// User-Agent header for HTTP requests. GitHub rejects requests without one.
const USER_AGENT: &str = concat!("grove-boot/", env!("CARGO_PKG_VERSION"));

/// Environment variable holding an optional GitHub token.
const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Where releases are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseConfig {
    /// Repository owner, e.g. `grove-sh`.
    pub owner: String,
    /// Project name; also the artifact file name prefix and binary name.
    pub project: String,
    /// Base URL of the release API.
    pub api_server: String,
    /// Base URL of release downloads.
    pub download_server: String,
    /// Bound on the latest-version query.
    pub version_timeout: Duration,
}

impl ReleaseConfig {
    /// URL of the latest-release endpoint.
    #[must_use]
    pub fn latest_release_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_server.trim_end_matches('/'),
            self.owner,
            self.project
        )
    }

    /// Builds the artifact reference for `version` on `platform`.
    #[must_use]
    pub fn artifact(&self, version: &VersionTag, platform: Platform) -> ReleaseArtifact {
        ReleaseArtifact {
            base_url: format!(
                "{}/{}/{}/releases/download/{version}",
                self.download_server.trim_end_matches('/'),
                self.owner,
                self.project
            ),
            project: self.project.clone(),
            version: version.clone(),
            platform,
        }
    }
}

/// A release archive for one version and platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseArtifact {
    base_url: String,
    pub project: String,
    pub version: VersionTag,
    pub platform: Platform,
}

impl ReleaseArtifact {
    /// Archive file name, e.g. `grove_1.2.3_linux_amd64.tar.gz`.
    #[must_use]
    pub fn filename(&self) -> String {
        format!(
            "{}_{}_{}.tar.gz",
            self.project,
            self.version.without_prefix(),
            self.platform.identifier()
        )
    }

    #[must_use]
    pub fn url(&self) -> String {
        format!("{}/{}", self.base_url, self.filename())
    }

    /// URL of the checksums file published next to the archives.
    #[must_use]
    pub fn checksums_url(&self) -> String {
        format!(
            "{}/{}_{}_checksums.txt",
            self.base_url,
            self.project,
            self.version.without_prefix()
        )
    }
}

/// Finds the SHA-256 for `filename` in a `sha256sum`-style listing.
#[must_use]
pub fn find_checksum(listing: &str, filename: &str) -> Option<String> {
    listing.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let hash = parts.next()?;
        let name = parts.next()?.trim_start_matches('*');
        (name == filename).then(|| hash.to_lowercase())
    })
}

/// A source of releases.
///
/// The resolver only talks to releases through this trait so tests can
/// substitute a fake server.
pub trait ReleaseSource {
    /// Returns the most recently published tag.
    ///
    /// Fails with [`BootstrapError::NetworkUnavailable`] when the index
    /// cannot be reached or answers with anything but a usable tag.
    async fn latest_version(&self) -> Result<VersionTag>;

    /// Downloads the archive for `artifact` to `dest`.
    async fn fetch_archive(&self, artifact: &ReleaseArtifact, dest: &Path) -> Result<()>;

    /// Returns the published SHA-256 of the archive, or `None` if the
    /// release has no checksums file.
    async fn fetch_checksum(&self, artifact: &ReleaseArtifact) -> Result<Option<String>>;
}

#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: String,
}

/// [`ReleaseSource`] backed by the GitHub API and release downloads.
#[derive(Debug, Clone)]
pub struct GithubReleases {
    config: ReleaseConfig,
}

impl GithubReleases {
    #[must_use]
    pub fn new(config: ReleaseConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ReleaseConfig {
        &self.config
    }

    fn client(&self, timeout: Duration) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")
    }
}

impl ReleaseSource for GithubReleases {
    async fn latest_version(&self) -> Result<VersionTag> {
        let url = self.config.latest_release_url();
        let client = self.client(self.config.version_timeout)?;

        let mut request = client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Ok(token) = std::env::var(GITHUB_TOKEN_ENV)
            && !token.trim().is_empty()
        {
            request = request.bearer_auth(token.trim());
        }

        let response = request.send().await.map_err(|e| {
            BootstrapError::network_unavailable_with_source(
                format!("failed to query latest release from {url}"),
                e,
            )
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BootstrapError::network_unavailable(format!(
                "HTTP {} from {url}",
                status.as_u16()
            ))
            .into());
        }

        let body = response.text().await.map_err(|e| {
            BootstrapError::network_unavailable_with_source(
                format!("failed to read response from {url}"),
                e,
            )
        })?;

        let release: LatestRelease = serde_json::from_str(&body).map_err(|e| {
            BootstrapError::network_unavailable_with_source(
                format!("malformed release index from {url}"),
                e,
            )
        })?;

        VersionTag::parse(&release.tag_name).map_err(|e| {
            BootstrapError::network_unavailable(format!(
                "release index at {url} returned unusable tag: {e}"
            ))
            .into()
        })
    }

    async fn fetch_archive(&self, artifact: &ReleaseArtifact, dest: &Path) -> Result<()> {
        download_file(&artifact.url(), dest).await
    }

    async fn fetch_checksum(&self, artifact: &ReleaseArtifact) -> Result<Option<String>> {
        let url = artifact.checksums_url();
        let client = self.client(self.config.version_timeout)?;

        let response = client.get(&url).send().await.map_err(|e| {
            BootstrapError::network_unavailable_with_source(
                format!("failed to fetch checksums from {url}"),
                e,
            )
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(BootstrapError::network_unavailable(format!(
                "HTTP {} from {url}",
                response.status().as_u16()
            ))
            .into());
        }

        let listing = response.text().await.map_err(|e| {
            BootstrapError::network_unavailable_with_source(
                format!("failed to read checksums from {url}"),
                e,
            )
        })?;

        let filename = artifact.filename();
        match find_checksum(&listing, &filename) {
            Some(hash) => Ok(Some(hash)),
            None => Err(BootstrapError::artifact_corrupt(format!(
                "{filename} is not listed in {url}"
            ))
            .into()),
        }
    }
}
