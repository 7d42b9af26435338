//! Status command for the grove-boot CLI.
//!
//! Reports how grove would be resolved right now, without installing
//! anything.
//!
//! ## Checks Performed
//!
//! - Platform detection
//! - System install on `PATH`
//! - Cache directory and installed version
//! - Latest published release
//! - Host multiplexer

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::Session;
use crate::multiplexer::{MultiplexerKind, detect_kind};
use crate::toolchain::{InstallRecord, Platform, ReleaseSource, VersionTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

/// Result of a single status check.
#[derive(Debug, Clone)]
pub struct StatusCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub message: String,
}

impl StatusCheck {
    fn ok(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            status: CheckStatus::Ok,
            message: message.into(),
        }
    }

    fn warning(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            status: CheckStatus::Warning,
            message: message.into(),
        }
    }

    fn error(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            status: CheckStatus::Error,
            message: message.into(),
        }
    }

    /// Returns the CLI prefix for this check status.
    #[must_use]
    pub fn prefix(&self) -> &'static str {
        match self.status {
            CheckStatus::Ok => "[OK]",
            CheckStatus::Warning => "[WARN]",
            CheckStatus::Error => "[FAIL]",
        }
    }
}

/// Executes the status command.
///
/// # Errors
///
/// Returns an error if the settings cannot be loaded. Failed checks are
/// reported, not returned.
pub async fn execute() -> Result<()> {
    let session = Session::load()?;
    let tool = session.record.tool.clone();

    println!("Checking {tool} installation...");
    println!();

    let system = session.resolver().find_system();
    let mux = detect_kind(|key| std::env::var(key).ok());
    let checks = run_checks(&session.record, &session.source, system.as_deref(), mux).await;

    for check in &checks {
        println!("  {} {}: {}", check.prefix(), check.name, check.message);
    }
    println!();

    if checks.iter().any(|c| c.status == CheckStatus::Error) {
        println!("Some checks failed. Run 'grove-boot install' to repair the cache.");
    } else if checks.iter().any(|c| c.status == CheckStatus::Warning) {
        println!("Some warnings were found. {tool} may still run from the cache.");
    } else {
        println!("All checks passed.");
    }

    Ok(())
}

/// Runs every check against `record` and `source`.
pub async fn run_checks<S: ReleaseSource>(
    record: &InstallRecord,
    source: &S,
    system: Option<&Path>,
    mux: Option<MultiplexerKind>,
) -> Vec<StatusCheck> {
    let marker = record.installed_version();
    let latest = source.latest_version().await;

    let mut checks = vec![
        check_platform(),
        check_system(system),
        check_cache_dir(&record.dir),
        check_installed(record, &marker),
    ];
    let installed = marker.ok().flatten();
    checks.push(match &latest {
        Ok(latest) => StatusCheck::ok("latest release", latest.as_str()),
        Err(e) => StatusCheck::warning("latest release", format!("unavailable: {e:#}")),
    });
    if let Ok(latest) = &latest {
        checks.push(check_update(installed.as_ref(), latest, system.is_some()));
    }
    checks.push(check_multiplexer(mux));
    checks
}

fn check_platform() -> StatusCheck {
    match Platform::detect() {
        Ok(platform) => StatusCheck::ok("platform", platform.identifier()),
        Err(e) => StatusCheck::error("platform", e.to_string()),
    }
}

fn check_system(system: Option<&Path>) -> StatusCheck {
    match system {
        Some(path) => StatusCheck::ok(
            "system install",
            format!("{} (used as-is, no version check)", path.display()),
        ),
        None => StatusCheck::ok("system install", "not on PATH, using the cache"),
    }
}

fn check_cache_dir(dir: &Path) -> StatusCheck {
    if dir.is_dir() {
        StatusCheck::ok("cache directory", dir.display().to_string())
    } else if dir.exists() {
        StatusCheck::error(
            "cache directory",
            format!("{} exists but is not a directory", dir.display()),
        )
    } else {
        StatusCheck::warning(
            "cache directory",
            format!("{} does not exist yet", dir.display()),
        )
    }
}

fn check_installed(record: &InstallRecord, marker: &Result<Option<VersionTag>>) -> StatusCheck {
    let installed = match marker {
        Ok(installed) => installed.as_ref(),
        Err(e) => return StatusCheck::error("installed version", format!("{e:#}")),
    };
    let binary: PathBuf = record.binary_path();
    match (installed, record.binary_is_executable()) {
        (Some(version), true) => StatusCheck::ok("installed version", version.as_str()),
        (Some(version), false) => StatusCheck::error(
            "installed version",
            format!("marker says {version} but {} is missing", binary.display()),
        ),
        (None, true) => StatusCheck::warning(
            "installed version",
            format!("{} has no version marker", binary.display()),
        ),
        (None, false) => StatusCheck::warning("installed version", "none"),
    }
}

fn check_update(installed: Option<&VersionTag>, latest: &VersionTag, system: bool) -> StatusCheck {
    match installed {
        Some(installed) if installed == latest => StatusCheck::ok("update", "up to date"),
        _ if system => StatusCheck::ok("update", "not needed, system install is used"),
        Some(installed) if installed.cmp_semver(latest).is_gt() => StatusCheck::warning(
            "update",
            format!("{installed} is newer than the latest release and will be replaced by {latest}"),
        ),
        Some(installed) => StatusCheck::warning(
            "update",
            format!("{installed} -> {latest} will be installed on next run"),
        ),
        None => StatusCheck::warning("update", format!("{latest} will be installed on next run")),
    }
}

fn check_multiplexer(mux: Option<MultiplexerKind>) -> StatusCheck {
    match mux {
        Some(kind) => StatusCheck::ok("multiplexer", kind.to_string()),
        None => StatusCheck::warning("multiplexer", "not inside tmux or zellij"),
    }
}
