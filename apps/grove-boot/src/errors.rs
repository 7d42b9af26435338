//! Error types for grove-boot.
//!
//! Most functions return `anyhow::Result` with context attached at each
//! step. The variants below mark the failures callers need to tell apart:
//! the resolver falls back to a cached binary on [`BootstrapError::NetworkUnavailable`],
//! and `main` propagates [`BootstrapError::ProcessExitCode`] without printing.

use std::path::PathBuf;
use thiserror::Error;

/// Classified failures of the bootstrap flow.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// No release artifact exists for the host OS/architecture.
    #[error("unsupported platform: {os} on {arch} (supported: darwin/linux on amd64/arm64)")]
    PlatformUnsupported {
        /// Raw OS name reported by the host.
        os: String,
        /// Raw architecture name reported by the host.
        arch: String,
    },

    /// The release server could not be reached or answered unusably.
    #[error("network unavailable: {message}")]
    NetworkUnavailable {
        /// What was being fetched and why it failed.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The downloaded archive or the binary inside it is unusable.
    #[error("corrupt release artifact: {message}")]
    ArtifactCorrupt {
        /// Description of what was wrong with the artifact.
        message: String,
    },

    /// The cache directory or the binary in it cannot be written.
    #[error("permission denied: {}", path.display())]
    PermissionDenied {
        /// The path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A version string is not a `v`-prefixed semantic version.
    #[error("invalid version tag: {tag:?}")]
    InvalidVersion {
        /// The rejected string.
        tag: String,
    },

    /// A multiplexer command failed or no multiplexer is running.
    #[error("multiplexer error: {message}")]
    Multiplexer {
        /// Description of the failure.
        message: String,
    },

    /// The launched tool exited with a non-zero code.
    ///
    /// The child already printed its own output, so this is propagated as
    /// the exit code of grove-boot without an extra message.
    #[error("process exited with code {code}")]
    ProcessExitCode {
        /// The exit code from the child process.
        code: i32,
    },
}

impl BootstrapError {
    /// Creates a new `PlatformUnsupported` error.
    #[must_use]
    pub fn platform_unsupported(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self::PlatformUnsupported {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Creates a new `NetworkUnavailable` error.
    #[must_use]
    pub fn network_unavailable(message: impl Into<String>) -> Self {
        Self::NetworkUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new `NetworkUnavailable` error with a source error.
    #[must_use]
    pub fn network_unavailable_with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::NetworkUnavailable {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a new `ArtifactCorrupt` error.
    #[must_use]
    pub fn artifact_corrupt(message: impl Into<String>) -> Self {
        Self::ArtifactCorrupt {
            message: message.into(),
        }
    }

    /// Creates a new `PermissionDenied` error.
    #[must_use]
    pub fn permission_denied(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::PermissionDenied {
            path: path.into(),
            source,
        }
    }

    /// Creates a new `InvalidVersion` error.
    #[must_use]
    pub fn invalid_version(tag: impl Into<String>) -> Self {
        Self::InvalidVersion { tag: tag.into() }
    }

    /// Creates a new `Multiplexer` error.
    #[must_use]
    pub fn multiplexer(message: impl Into<String>) -> Self {
        Self::Multiplexer {
            message: message.into(),
        }
    }

    /// Creates a new `ProcessExitCode` error.
    #[must_use]
    pub const fn process_exit_code(code: i32) -> Self {
        Self::ProcessExitCode { code }
    }
}

/// Returns true if `err` (or anything it wraps) is a network failure.
#[must_use]
pub fn is_network_error(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<BootstrapError>(),
        Some(BootstrapError::NetworkUnavailable { .. })
    )
}

/// Converts an I/O error on `path` into a typed error.
///
/// Permission failures become [`BootstrapError::PermissionDenied`] so the
/// message names the path; everything else is returned as-is with context.
pub fn io_error(path: &std::path::Path, action: &str, source: std::io::Error) -> anyhow::Error {
    if source.kind() == std::io::ErrorKind::PermissionDenied {
        anyhow::Error::new(BootstrapError::permission_denied(path, source))
    } else {
        anyhow::Error::new(source).context(format!("Failed to {action}: {}", path.display()))
    }
}
