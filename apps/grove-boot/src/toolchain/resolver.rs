//! Resolution of a runnable `grove` binary.
//!
//! The search order is:
//!
//! 1. System search path (`which grove`). Trusted as-is, no version check.
//! 2. Local install record, refreshed from the latest release when its
//!    marker differs from the published tag.
//! 3. Local install record as-is, when the release index is unreachable.
//!
//! ```text
//! START -> CHECK_PATH -> FOUND_SYSTEM
//!                     -> CHECK_LOCAL -> VERSION_MATCH
//!                                    -> STALE_OR_MISSING -> DOWNLOAD -> SUCCESS | FAIL
//!                                    -> OFFLINE_FALLBACK (needs a local binary, else FAIL)
//! ```

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::PathBuf;

use super::installer::{InstallOptions, install_release};
use super::paths::InstallRecord;
use super::platform::Platform;
use super::release::{ReleaseConfig, ReleaseSource};
use super::version::VersionTag;
use crate::errors::{BootstrapError, is_network_error};

/// How the binary was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Found on the search path; invoke by bare name.
    System { name: String, path: PathBuf },
    /// Cached copy already matches the latest release.
    Current { path: PathBuf, version: VersionTag },
    /// Latest release was just installed.
    Installed {
        path: PathBuf,
        version: VersionTag,
        previous: Option<VersionTag>,
    },
    /// Release index unreachable; using whatever is cached.
    Offline {
        path: PathBuf,
        version: Option<VersionTag>,
    },
}

impl Resolution {
    /// What a caller should execute: the bare name for system installs,
    /// the full path otherwise.
    #[must_use]
    pub fn invocable(&self) -> OsString {
        match self {
            Self::System { name, .. } => OsString::from(name),
            Self::Current { path, .. }
            | Self::Installed { path, .. }
            | Self::Offline { path, .. } => path.clone().into_os_string(),
        }
    }

    #[must_use]
    pub fn is_system(&self) -> bool {
        matches!(self, Self::System { .. })
    }
}

/// Resolves a runnable copy of a tool.
///
/// The install record and release source are passed in explicitly; nothing
/// here reads global state except the process `PATH` (unless overridden
/// with [`Resolver::search_path`]) and the host platform (unless fixed
/// with [`Resolver::platform`]).
pub struct Resolver<'a, S> {
    record: &'a InstallRecord,
    source: &'a S,
    release: &'a ReleaseConfig,
    search_path: Option<OsString>,
    platform: Option<Platform>,
    options: InstallOptions,
    skip_system: bool,
}

impl<'a, S: ReleaseSource> Resolver<'a, S> {
    #[must_use]
    pub fn new(record: &'a InstallRecord, source: &'a S, release: &'a ReleaseConfig) -> Self {
        Self {
            record,
            source,
            release,
            search_path: None,
            platform: None,
            options: InstallOptions::default(),
            skip_system: false,
        }
    }

    /// Searches `path` (a `PATH`-style list) instead of the process `PATH`.
    #[must_use]
    pub fn search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    /// Uses `platform` instead of detecting the host.
    #[must_use]
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    #[must_use]
    pub fn install_options(mut self, options: InstallOptions) -> Self {
        self.options = options;
        self
    }

    /// Ignores system installs and always manages the cached copy.
    #[must_use]
    pub fn skip_system(mut self, skip: bool) -> Self {
        self.skip_system = skip;
        self
    }

    /// Looks up the tool on the search path.
    #[must_use]
    pub fn find_system(&self) -> Option<PathBuf> {
        let tool = &self.record.tool;
        match &self.search_path {
            Some(path) => {
                let cwd = std::env::current_dir().ok()?;
                which::which_in(tool, Some(path.as_os_str()), cwd).ok()
            }
            None => which::which(tool).ok(),
        }
    }

    /// Runs the resolution state machine.
    ///
    /// # Errors
    ///
    /// Fails when no executable binary can be produced: the release index is
    /// unreachable and nothing is cached, the platform is unsupported, or
    /// the install fails for a reason other than connectivity.
    pub async fn resolve(&self) -> Result<Resolution> {
        let tool = &self.record.tool;

        if !self.skip_system
            && let Some(path) = self.find_system()
        {
            log::debug!("{tool}: using system install at {}", path.display());
            return Ok(Resolution::System {
                name: tool.clone(),
                path,
            });
        }

        let installed = self.record.installed_version_or_none();
        log::debug!(
            "{tool}: installed version {}",
            installed.as_ref().map_or("<none>", VersionTag::as_str)
        );

        let latest = match self.source.latest_version().await {
            Ok(latest) => latest,
            Err(e) => return self.offline_fallback(installed, e),
        };

        if installed.as_ref() == Some(&latest) && self.record.binary_is_executable() {
            log::debug!("{tool}: {latest} is current");
            return Ok(Resolution::Current {
                path: self.record.binary_path(),
                version: latest,
            });
        }

        self.install(&latest, installed).await
    }

    /// Installs `version` unconditionally.
    ///
    /// # Errors
    ///
    /// Fails if the platform is unsupported or the install fails.
    pub async fn install(
        &self,
        version: &VersionTag,
        previous: Option<VersionTag>,
    ) -> Result<Resolution> {
        let platform = match self.platform {
            Some(platform) => platform,
            None => Platform::detect()?,
        };
        let artifact = self.release.artifact(version, platform);
        log::debug!(
            "{}: installing {version} for {platform} (was {})",
            self.record.tool,
            previous.as_ref().map_or("<none>", VersionTag::as_str)
        );

        match install_release(self.source, self.record, &artifact, self.options).await {
            Ok(path) => Ok(Resolution::Installed {
                path,
                version: version.clone(),
                previous,
            }),
            Err(e) if is_network_error(&e) => self.offline_fallback(previous, e),
            Err(e) => Err(e),
        }
    }

    fn offline_fallback(
        &self,
        installed: Option<VersionTag>,
        cause: anyhow::Error,
    ) -> Result<Resolution> {
        let tool = &self.record.tool;
        if self.record.binary_is_executable() {
            log::warn!(
                "{tool}: release server unavailable ({cause:#}), using cached {}",
                installed.as_ref().map_or("binary", VersionTag::as_str)
            );
            return Ok(Resolution::Offline {
                path: self.record.binary_path(),
                version: installed,
            });
        }

        Err(cause).with_context(|| {
            format!(
                "{tool} is not on PATH, not cached in {}, and could not be downloaded",
                self.record.dir.display()
            )
        })
    }
}

/// Fails unless `resolution` names something that can actually be run.
///
/// # Errors
///
/// Returns `ArtifactCorrupt` if the returned path is not executable.
pub fn ensure_runnable(resolution: &Resolution) -> Result<()> {
    match resolution {
        Resolution::System { .. } => Ok(()),
        other => {
            let invocable = other.invocable();
            let path = std::path::Path::new(&invocable);
            if super::paths::is_executable(path) {
                Ok(())
            } else {
                Err(BootstrapError::artifact_corrupt(format!(
                    "{} is not executable",
                    path.display()
                ))
                .into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::installer::tests::{FakeReleases, test_config};
    use crate::toolchain::paths::set_executable;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;

    struct Fixture {
        cache: TempDir,
        bin: TempDir,
        record: InstallRecord,
        config: ReleaseConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let cache = TempDir::new().unwrap();
            let bin = TempDir::new().unwrap();
            let record = InstallRecord::with_dir(cache.path(), "grove");
            Self {
                cache,
                bin,
                record,
                config: test_config(),
            }
        }

        fn resolver<'a>(&'a self, source: &'a FakeReleases) -> Resolver<'a, FakeReleases> {
            Resolver::new(&self.record, source, &self.config)
                .search_path(self.bin.path().as_os_str())
                .platform(Platform::from_raw("linux", "x86_64").unwrap())
                .install_options(InstallOptions {
                    self_check: cfg!(unix),
                })
        }

        fn put_system_grove(&self) {
            let stub = self.bin.child("grove");
            stub.write_str("#!/bin/sh\necho system\n").unwrap();
            set_executable(stub.path()).unwrap();
        }

        fn populate_cache(&self, version: &str) {
            let binary = self.cache.child("grove");
            binary.write_str("#!/bin/sh\necho cached\n").unwrap();
            set_executable(binary.path()).unwrap();
            self.record
                .write_marker(&VersionTag::parse(version).unwrap())
                .unwrap();
        }
    }

    #[tokio::test]
    async fn prefers_system_binary_over_cache() {
        let fx = Fixture::new();
        fx.put_system_grove();
        fx.populate_cache("v0.1.0");
        let source = FakeReleases::new(Some("v9.0.0"));

        let resolution = fx.resolver(&source).resolve().await.unwrap();

        assert!(resolution.is_system());
        assert_eq!(resolution.invocable(), OsString::from("grove"));
        assert_eq!(source.version_queries.get(), 0);
        assert_eq!(source.downloads.get(), 0);
    }

    #[tokio::test]
    async fn skip_system_manages_cache_anyway() {
        let fx = Fixture::new();
        fx.put_system_grove();
        fx.populate_cache("v1.0.0");
        let source = FakeReleases::new(Some("v1.0.0"));

        let resolution = fx.resolver(&source).skip_system(true).resolve().await.unwrap();

        assert!(matches!(resolution, Resolution::Current { .. }));
    }

    #[tokio::test]
    async fn falls_back_to_cache_when_offline() {
        let fx = Fixture::new();
        fx.populate_cache("v0.1.0");
        let source = FakeReleases::offline();

        let resolution = fx.resolver(&source).resolve().await.unwrap();

        assert_eq!(
            resolution,
            Resolution::Offline {
                path: fx.record.binary_path(),
                version: Some(VersionTag::parse("v0.1.0").unwrap()),
            }
        );
        assert_eq!(resolution.invocable(), fx.record.binary_path().into_os_string());
        assert_eq!(source.downloads.get(), 0);
    }

    #[tokio::test]
    async fn offline_fallback_ignores_missing_marker() {
        let fx = Fixture::new();
        let binary = fx.cache.child("grove");
        binary.write_str("#!/bin/sh\n").unwrap();
        set_executable(binary.path()).unwrap();
        let source = FakeReleases::offline();

        let resolution = fx.resolver(&source).resolve().await.unwrap();

        assert_eq!(
            resolution,
            Resolution::Offline {
                path: fx.record.binary_path(),
                version: None,
            }
        );
    }

    #[tokio::test]
    async fn unreadable_marker_still_falls_back_when_offline() {
        let fx = Fixture::new();
        let binary = fx.cache.child("grove");
        binary.write_str("#!/bin/sh\n").unwrap();
        set_executable(binary.path()).unwrap();
        fx.cache.child("grove.version").create_dir_all().unwrap();
        let source = FakeReleases::offline();

        let resolution = fx.resolver(&source).resolve().await.unwrap();

        assert_eq!(
            resolution,
            Resolution::Offline {
                path: fx.record.binary_path(),
                version: None,
            }
        );
        assert_eq!(source.version_queries.get(), 1);
    }

    #[tokio::test]
    async fn fails_when_offline_and_nothing_cached() {
        let fx = Fixture::new();
        let source = FakeReleases::offline();

        let err = fx.resolver(&source).resolve().await.unwrap_err();

        assert!(is_network_error(&err));
        assert!(err.to_string().contains("not on PATH"));
    }

    #[tokio::test]
    async fn stale_cache_triggers_one_install() {
        let fx = Fixture::new();
        fx.populate_cache("v1.0.0");
        let source = FakeReleases::new(Some("v2.0.0"));

        let resolution = fx.resolver(&source).resolve().await.unwrap();

        assert_eq!(
            resolution,
            Resolution::Installed {
                path: fx.record.binary_path(),
                version: VersionTag::parse("v2.0.0").unwrap(),
                previous: Some(VersionTag::parse("v1.0.0").unwrap()),
            }
        );
        assert_eq!(source.downloads.get(), 1);
        assert_eq!(
            fx.record.installed_version().unwrap().unwrap().as_str(),
            "v2.0.0"
        );
        fx.cache.child("grove").assert(predicates::str::contains("grove 2.0.0"));
    }

    #[tokio::test]
    async fn missing_cache_triggers_install() {
        let fx = Fixture::new();
        let source = FakeReleases::new(Some("v1.4.0"));

        let resolution = fx.resolver(&source).resolve().await.unwrap();

        assert!(matches!(
            resolution,
            Resolution::Installed { previous: None, .. }
        ));
        assert_eq!(source.downloads.get(), 1);
        ensure_runnable(&resolution).unwrap();
    }

    #[tokio::test]
    async fn matching_version_skips_download() {
        let fx = Fixture::new();
        fx.populate_cache("v2.0.0");
        let source = FakeReleases::new(Some("v2.0.0"));

        let resolution = fx.resolver(&source).resolve().await.unwrap();

        assert_eq!(
            resolution,
            Resolution::Current {
                path: fx.record.binary_path(),
                version: VersionTag::parse("v2.0.0").unwrap(),
            }
        );
        assert_eq!(source.version_queries.get(), 1);
        assert_eq!(source.downloads.get(), 0);
        fx.cache.child("grove").assert(predicates::str::contains("cached"));
    }

    #[tokio::test]
    async fn matching_marker_without_binary_reinstalls() {
        let fx = Fixture::new();
        fx.record.ensure_dir().unwrap();
        fx.record
            .write_marker(&VersionTag::parse("v2.0.0").unwrap())
            .unwrap();
        let source = FakeReleases::new(Some("v2.0.0"));

        let resolution = fx.resolver(&source).resolve().await.unwrap();

        assert!(matches!(resolution, Resolution::Installed { .. }));
        assert_eq!(source.downloads.get(), 1);
    }

    #[tokio::test]
    async fn corrupt_download_is_fatal_and_keeps_cache() {
        let fx = Fixture::new();
        fx.populate_cache("v1.0.0");
        let source = FakeReleases::new(Some("v2.0.0"));
        *source.archive.borrow_mut() = b"not an archive".to_vec();

        let err = fx.resolver(&source).resolve().await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<BootstrapError>(),
            Some(BootstrapError::ArtifactCorrupt { .. })
        ));
        assert_eq!(
            fx.record.installed_version().unwrap().unwrap().as_str(),
            "v1.0.0"
        );
    }

    #[test]
    fn ensure_runnable_rejects_missing_path() {
        let resolution = Resolution::Offline {
            path: PathBuf::from("/nonexistent/grove"),
            version: None,
        };
        assert!(ensure_runnable(&resolution).is_err());
    }
}
