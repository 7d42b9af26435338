//! Install command for the grove-boot CLI.
//!
//! Refreshes the cached copy of grove from the latest release, ignoring any
//! system install on `PATH`.
//!
//! ## Usage
//!
//! ```bash
//! grove-boot install          # Install only if the cache is stale
//! grove-boot install --force  # Reinstall even when up to date
//! ```

use anyhow::{Context, Result, bail};
use clap::Args;

use super::Session;
use crate::toolchain::{ReleaseSource, Resolution};

/// Arguments for the install command.
#[derive(Args)]
pub struct InstallArgs {
    /// Reinstall the latest release even when the cache is current.
    #[clap(long = "force", action = clap::ArgAction::SetTrue)]
    pub force: bool,
}

/// Executes the install command.
///
/// # Errors
///
/// Returns an error if the latest release cannot be fetched or installed.
/// Falling back to a cached binary counts as a failure here.
pub async fn execute(args: &InstallArgs) -> Result<()> {
    let session = Session::load()?;
    let tool = &session.record.tool;
    let resolver = session.resolver().skip_system(true);

    let resolution = if args.force {
        let latest = session
            .source
            .latest_version()
            .await
            .context("Failed to query the latest release")?;
        let previous = session.record.installed_version_or_none();
        resolver.install(&latest, previous).await?
    } else {
        resolver.resolve().await?
    };

    match &resolution {
        Resolution::Current { version, path } => {
            println!("{tool} {version} is up to date ({})", path.display());
        }
        Resolution::Installed {
            version,
            previous,
            path,
        } => match previous {
            Some(previous) if previous != version => {
                println!("Updated {tool} {previous} -> {version} ({})", path.display());
            }
            _ => println!("Installed {tool} {version} ({})", path.display()),
        },
        Resolution::Offline { path, .. } => {
            bail!(
                "could not reach the release server; the cached {tool} at {} was left in place",
                path.display()
            );
        }
        Resolution::System { .. } => {}
    }

    if let Some(system) = resolver.find_system() {
        println!(
            "Note: {} is on PATH and takes precedence over the cached copy.",
            system.display()
        );
    }

    Ok(())
}
