//! The local install record.
//!
//! The cached binary and its version marker live side by side in one
//! directory. The root defaults to `<cache_dir>/grove-boot` and can be
//! overridden with `GROVE_BOOT_HOME`.
//!
//! ```text
//! ~/.cache/grove-boot/         # Root directory (or GROVE_BOOT_HOME)
//!   grove                      # Cached executable
//!   grove.version              # Installed version tag, e.g. "v1.2.3"
//!   .staging-XXXXXX/           # Transient, only while an install runs
//! ```
//!
//! Only the installer writes here, and it does so with `rename` so a
//! concurrent reader sees either the old or the new file, never a partial one.
//! The marker is removed before the binary is replaced and renamed in after
//! it, so the marker never names a binary other than the one beside it.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::VersionTag;
use crate::errors::io_error;

/// Environment variable to override the record directory.
pub const GROVE_BOOT_HOME_ENV: &str = "GROVE_BOOT_HOME";

/// Handle to the directory holding a cached tool and its version marker.
#[derive(Debug, Clone)]
pub struct InstallRecord {
    /// Directory containing the binary and the marker.
    pub dir: PathBuf,
    /// Name of the cached executable.
    pub tool: String,
}

impl InstallRecord {
    /// Opens the record for `tool` in the default location.
    ///
    /// The directory is determined by:
    /// 1. The `GROVE_BOOT_HOME` environment variable if set and not empty
    /// 2. `<cache_dir>/grove-boot` (e.g. `~/.cache/grove-boot` on Linux)
    ///
    /// # Errors
    ///
    /// Returns an error if no cache directory can be determined.
    pub fn new(tool: &str) -> Result<Self> {
        let dir = match std::env::var(GROVE_BOOT_HOME_ENV) {
            Ok(home) if !home.trim().is_empty() => PathBuf::from(home.trim()),
            _ => dirs::cache_dir()
                .context("Cannot determine cache directory. Set GROVE_BOOT_HOME.")?
                .join("grove-boot"),
        };
        Ok(Self::with_dir(dir, tool))
    }

    /// Opens the record for `tool` in a specific directory.
    #[must_use = "returns new record handle without side effects"]
    pub fn with_dir(dir: impl Into<PathBuf>, tool: &str) -> Self {
        Self {
            dir: dir.into(),
            tool: tool.to_string(),
        }
    }

    /// Path of the cached executable.
    #[must_use]
    pub fn binary_path(&self) -> PathBuf {
        self.dir.join(&self.tool)
    }

    /// Path of the version marker file.
    #[must_use]
    pub fn marker_path(&self) -> PathBuf {
        self.dir.join(format!("{}.version", self.tool))
    }

    /// Returns true if the cached binary exists and has an execute bit set.
    #[must_use]
    pub fn binary_is_executable(&self) -> bool {
        is_executable(&self.binary_path())
    }

    /// Reads the installed version tag.
    ///
    /// A missing marker is the normal "not installed yet" state and returns
    /// `Ok(None)`. An empty or malformed marker is also reported as `None`
    /// so the caller re-installs.
    ///
    /// # Errors
    ///
    /// Returns an error only if the marker exists but cannot be read.
    pub fn installed_version(&self) -> Result<Option<VersionTag>> {
        let marker = self.marker_path();
        let content = match std::fs::read_to_string(&marker) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&marker, "read version marker", e)),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        match VersionTag::parse(&content) {
            Ok(tag) => Ok(Some(tag)),
            Err(e) => {
                log::warn!("Ignoring version marker {}: {e}", marker.display());
                Ok(None)
            }
        }
    }

    /// Creates the record directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` naming the directory if it cannot be created.
    pub fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| io_error(&self.dir, "create directory", e))
    }

    /// Reads the installed version, treating an unreadable marker as absent.
    ///
    /// Used where the marker only decides whether to refresh; the failure is
    /// logged and the caller proceeds as if nothing were installed.
    #[must_use]
    pub fn installed_version_or_none(&self) -> Option<VersionTag> {
        self.installed_version().unwrap_or_else(|e| {
            log::warn!("Ignoring version marker: {e:#}");
            None
        })
    }

    /// Writes the marker for `version` into `staging`, ready for [`Self::commit`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn stage_marker(&self, staging: &Path, version: &VersionTag) -> Result<PathBuf> {
        let staged = staging.join(format!("{}.version", self.tool));
        std::fs::write(&staged, format!("{version}\n"))
            .map_err(|e| io_error(&staged, "stage version marker", e))?;
        Ok(staged)
    }

    /// Moves a staged binary and marker into place.
    ///
    /// Both must be on the same filesystem as the record directory. The old
    /// marker goes first and the new one lands last: a failure before the
    /// binary rename leaves the record as it was, and a failure after it
    /// leaves a binary without a marker, which reads as "not installed".
    ///
    /// # Errors
    ///
    /// Returns an error if the old marker cannot be removed or either rename
    /// fails.
    pub fn commit(&self, staged_binary: &Path, staged_marker: &Path) -> Result<()> {
        let marker = self.marker_path();
        match std::fs::remove_file(&marker) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(&marker, "remove version marker", e)),
        }

        let binary = self.binary_path();
        std::fs::rename(staged_binary, &binary)
            .map_err(|e| io_error(&binary, "install binary", e))?;
        std::fs::rename(staged_marker, &marker)
            .map_err(|e| io_error(&marker, "write version marker", e))
    }

    /// Writes the version marker directly, outside of an install.
    #[cfg(test)]
    pub(crate) fn write_marker(&self, version: &VersionTag) -> Result<()> {
        self.ensure_dir()?;
        std::fs::write(self.marker_path(), format!("{version}\n"))?;
        Ok(())
    }
}

/// Returns true if `path` is a regular file with any execute bit set.
#[cfg(unix)]
#[must_use]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
#[must_use]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Sets `0o755` on `path`.
///
/// # Errors
///
/// Returns `PermissionDenied` naming the path if the mode cannot be changed.
#[cfg(unix)]
pub fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)
        .map_err(|e| io_error(path, "read metadata", e))?
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).map_err(|e| io_error(path, "set permissions", e))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
pub fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}
