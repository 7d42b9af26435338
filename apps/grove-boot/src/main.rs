#![warn(clippy::pedantic)]

//! # grove-boot
//!
//! Launcher for the grove worktree switcher inside tmux and zellij popups.
//! grove-boot makes sure a runnable `grove` exists before launching it:
//! a system install on `PATH` is used as-is, otherwise a cached copy is kept
//! in step with the latest published release.
//!
//! ## Subcommands
//!
//! - `resolve` - Print the invocable grove binary
//! - `run` - Resolve and launch grove
//! - `install` - Refresh the cached copy
//! - `status` - Check installation health
//! - `bind` - Bind a tmux key to the grove popup
//! - `popup` - Open the grove popup now
//! - `version` - Display version information
//!
//! ## Examples
//!
//! Bind the popup from `.tmux.conf`:
//! ```bash
//! run-shell 'grove-boot bind'
//! ```
//!
//! Use the resolved binary in a script:
//! ```bash
//! "$(grove-boot resolve)" --help
//! ```

mod commands;
mod config;
mod errors;
mod multiplexer;
mod toolchain;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{bind, install, popup, resolve, run, status, version};
use errors::BootstrapError;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "GROVE_BOOT_LOG";

/// Launcher for the grove worktree switcher.
#[derive(Parser)]
#[command(
    name = "grove-boot",
    author,
    version,
    about = "Resolves, caches and launches grove for tmux and zellij",
    after_help = "\
BINARY RESOLUTION:
    grove is located using the following priority order:
    1. System PATH (via 'which grove'), used without a version check
    2. Cached copy, refreshed when the latest release differs
    3. Cached copy as-is, when the release server is unreachable

ENVIRONMENT VARIABLES:
    GROVE_BOOT_HOME             Cache directory (default: <cache_dir>/grove-boot)
    GROVE_BOOT_CONFIG           Settings file (default: <config_dir>/grove/bootstrap.toml)
    GROVE_BOOT_REPOSITORY       Release repository as owner/project
    GROVE_BOOT_API_SERVER       Release API server (default: https://api.github.com)
    GROVE_BOOT_DOWNLOAD_SERVER  Release download server (default: https://github.com)
    GROVE_BOOT_LOG              Log filter (default: warn)
    GITHUB_TOKEN                Token for the release API"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the grove-boot CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Print the grove binary to invoke.
    ///
    /// Prints `grove` when it is on PATH, otherwise the path of the cached
    /// copy, installing or updating it first if needed.
    Resolve,

    /// Resolve grove and run it.
    ///
    /// Arguments after `--` are passed to grove; its exit code is
    /// propagated.
    Run(run::RunArgs),

    /// Install or update the cached copy of grove.
    ///
    /// Ignores any system install on PATH.
    Install(install::InstallArgs),

    /// Check installation health.
    ///
    /// Reports the platform, system install, cached version, latest release
    /// and host multiplexer without changing anything.
    Status,

    /// Bind a tmux key to the grove popup.
    ///
    /// The key is read from the `@grove-key` tmux option and defaults to
    /// `g`.
    Bind,

    /// Open the grove popup in the current multiplexer.
    Popup(popup::PopupArgs),

    /// Display version information.
    Version(version::VersionArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_logging();

    if let Err(e) = run().await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Sends log output to stderr, filtered by `GROVE_BOOT_LOG`.
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or(LOG_ENV, "warn"))
        .format_timestamp(None)
        .init();
}

/// Handles an error and returns the appropriate exit code.
///
/// For `ProcessExitCode` errors, returns the embedded exit code without
/// printing an error message (grove already printed its output).
/// For all other errors, prints the error and returns exit code 1.
fn handle_error(e: &anyhow::Error) -> i32 {
    if let Some(BootstrapError::ProcessExitCode { code }) = e.downcast_ref::<BootstrapError>() {
        return *code;
    }
    eprintln!("Error: {e:?}");
    1
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve => resolve::execute().await,
        Commands::Run(args) => run::execute(&args).await,
        Commands::Install(args) => install::execute(&args).await,
        Commands::Status => status::execute().await,
        Commands::Bind => bind::execute(),
        Commands::Popup(args) => popup::execute(&args),
        Commands::Version(args) => version::execute(&args),
    }
}
