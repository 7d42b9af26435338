//! Acquisition of the `grove` binary.
//!
//! ## Module Structure
//!
//! - [`platform`] - OS and architecture detection
//! - [`version`] - Release version tags
//! - [`paths`] - The local install record (cached binary + version marker)
//! - [`release`] - Release index queries and artifact URLs
//! - [`download`] - HTTP download with retries
//! - [`archive`] - tar.gz extraction
//! - [`verify`] - Checksum and `--version` self-check
//! - [`installer`] - Staged, rename-into-place installs
//! - [`resolver`] - System-first resolution with offline fallback

pub mod archive;
pub mod download;
pub mod installer;
pub mod paths;
pub mod platform;
pub mod release;
pub mod resolver;
pub mod verify;
pub mod version;

pub use installer::InstallOptions;
pub use paths::InstallRecord;
pub use platform::Platform;
pub use release::{GithubReleases, ReleaseConfig, ReleaseSource};
pub use resolver::{Resolution, Resolver, ensure_runnable};
pub use version::VersionTag;
