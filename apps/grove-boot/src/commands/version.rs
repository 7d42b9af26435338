//! Version command for the grove-boot CLI.
//!
//! In verbose mode, also shows the commit and the platform identifier used
//! to pick release archives.

use anyhow::Result;
use clap::Args;

use crate::toolchain::Platform;

/// Arguments for the version command.
#[derive(Args)]
pub struct VersionArgs {
    /// Show the build commit and release platform.
    #[clap(short = 'v', long = "verbose", action = clap::ArgAction::SetTrue)]
    pub verbose: bool,
}

/// Executes the version command.
#[allow(clippy::unnecessary_wraps)]
pub fn execute(args: &VersionArgs) -> Result<()> {
    println!("grove-boot {}", env!("CARGO_PKG_VERSION"));
    if args.verbose {
        println!();
        println!("Build Information:");
        println!("  Version:  {}", env!("CARGO_PKG_VERSION"));
        println!("  Commit:   {}", git_commit());
        println!("  Platform: {}", platform_string());
    }
    Ok(())
}

/// Returns the git commit hash recorded at build time.
fn git_commit() -> &'static str {
    option_env!("GROVE_BOOT_GIT_COMMIT").unwrap_or("unknown")
}

/// Release platform identifier, or the raw host names when unsupported.
fn platform_string() -> String {
    match Platform::detect() {
        Ok(platform) => platform.identifier(),
        Err(_) => format!(
            "{}-{} (unsupported)",
            std::env::consts::OS,
            std::env::consts::ARCH
        ),
    }
}
