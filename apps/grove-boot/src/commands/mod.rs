//! Command modules for the grove-boot CLI.
//!
//! ## Resolution Commands
//!
//! - [`resolve`] - Print the invocable grove binary
//! - [`run`] - Resolve and launch grove
//! - [`install`] - Refresh the cached copy
//! - [`status`] - Check installation health
//!
//! ## Multiplexer Commands
//!
//! - [`bind`] - Bind a tmux key to the grove popup
//! - [`popup`] - Open the grove popup now
//!
//! ## Other
//!
//! - [`version`] - Display version information

pub mod bind;
pub mod install;
pub mod popup;
pub mod resolve;
pub mod run;
pub mod status;
pub mod version;

use anyhow::Result;

use crate::config::Settings;
use crate::toolchain::{GithubReleases, InstallOptions, InstallRecord, Resolver};

/// Settings, install record and release source for one invocation.
pub struct Session {
    pub settings: Settings,
    pub record: InstallRecord,
    pub source: GithubReleases,
}

impl Session {
    /// Loads settings and opens the install record.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or no cache directory
    /// can be determined.
    pub fn load() -> Result<Self> {
        let settings = Settings::load()?;
        let release = settings.release_config()?;
        let record = InstallRecord::new(settings.tool_name())?;
        Ok(Self {
            settings,
            record,
            source: GithubReleases::new(release),
        })
    }

    #[must_use]
    pub fn resolver(&self) -> Resolver<'_, GithubReleases> {
        Resolver::new(&self.record, &self.source, self.source.config()).install_options(
            InstallOptions {
                self_check: self.settings.verify_install,
            },
        )
    }
}
