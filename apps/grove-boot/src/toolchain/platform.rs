//! Platform detection for release artifacts.
//!
//! Release archives are published per `{os}_{arch}` pair:
//!
//! - `darwin_amd64`, `darwin_arm64`
//! - `linux_amd64`, `linux_arm64`
//!
//! Any other host is rejected; there is no artifact to fetch for it.

use anyhow::Result;
use std::fmt;

use crate::errors::BootstrapError;

/// Operating systems with published release artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Darwin,
    Linux,
}

impl Os {
    /// Maps a raw kernel name (`uname -s` or `std::env::consts::OS`).
    #[must_use]
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "darwin" | "macos" => Some(Self::Darwin),
            "linux" => Some(Self::Linux),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Darwin => "darwin",
            Self::Linux => "linux",
        }
    }
}

/// CPU architectures with published release artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Amd64,
    Arm64,
}

impl Arch {
    /// Maps a raw machine name (`uname -m` or `std::env::consts::ARCH`),
    /// normalizing the usual aliases.
    #[must_use]
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "x86_64" | "amd64" | "x64" => Some(Self::Amd64),
            "aarch64" | "arm64" => Some(Self::Arm64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
        }
    }
}

/// A supported `{os}_{arch}` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    /// Detects the host platform.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::PlatformUnsupported`] if the OS or the
    /// architecture has no published artifact.
    pub fn detect() -> Result<Self> {
        Self::from_raw(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Builds a platform from raw OS and architecture names.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::PlatformUnsupported`] if either name is unknown.
    pub fn from_raw(os: &str, arch: &str) -> Result<Self> {
        match (Os::from_raw(os), Arch::from_raw(arch)) {
            (Some(os), Some(arch)) => Ok(Self { os, arch }),
            _ => Err(BootstrapError::platform_unsupported(os, arch).into()),
        }
    }

    /// Returns the identifier used in artifact file names, e.g. `linux_amd64`.
    #[must_use = "returns the platform string without side effects"]
    pub fn identifier(self) -> String {
        format!("{}_{}", self.os.as_str(), self.arch.as_str())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.os.as_str(), self.arch.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_valid_identifier(id: &str) -> bool {
        let Some((os, arch)) = id.split_once('_') else {
            return false;
        };
        matches!(os, "darwin" | "linux") && matches!(arch, "amd64" | "arm64")
    }

    #[test]
    fn all_supported_pairs_produce_valid_identifiers() {
        for os in ["Darwin", "darwin", "macos", "Linux", "linux"] {
            for arch in ["x86_64", "amd64", "aarch64", "arm64"] {
                let platform = Platform::from_raw(os, arch).expect("supported pair");
                assert!(
                    is_valid_identifier(&platform.identifier()),
                    "{os}/{arch} -> {platform}"
                );
            }
        }
    }

    #[test]
    fn aliases_are_normalized() {
        let p = Platform::from_raw("Darwin", "aarch64").unwrap();
        assert_eq!(p.identifier(), "darwin_arm64");

        let p = Platform::from_raw("Linux", "x86_64").unwrap();
        assert_eq!(p.identifier(), "linux_amd64");
    }

    #[test]
    fn display_matches_identifier() {
        let p = Platform::from_raw("linux", "arm64").unwrap();
        assert_eq!(p.to_string(), p.identifier());
    }

    #[test]
    fn unknown_os_is_unsupported() {
        let err = Platform::from_raw("windows", "x86_64").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BootstrapError>(),
            Some(BootstrapError::PlatformUnsupported { .. })
        ));
    }

    #[test]
    fn unknown_arch_is_unsupported() {
        let err = Platform::from_raw("linux", "riscv64").unwrap_err();
        assert!(err.to_string().contains("riscv64"));
    }

    #[test]
    fn detect_succeeds_on_supported_hosts() {
        let result = Platform::detect();
        #[cfg(all(
            any(target_os = "linux", target_os = "macos"),
            any(target_arch = "x86_64", target_arch = "aarch64")
        ))]
        assert!(is_valid_identifier(&result.unwrap().identifier()));

        #[cfg(not(all(
            any(target_os = "linux", target_os = "macos"),
            any(target_arch = "x86_64", target_arch = "aarch64")
        )))]
        assert!(result.is_err());
    }
}
