//! Run command for the grove-boot CLI.
//!
//! Resolves grove and runs it in the foreground, passing trailing arguments
//! through and propagating its exit code.
//!
//! ## Popup Mode
//!
//! Popups close as soon as their command exits, which would hide any error.
//! With `--pause-on-error` a failure is printed and grove-boot waits for
//! Enter before exiting:
//!
//! ```bash
//! grove-boot run --pause-on-error -- --all
//! ```

use anyhow::{Context, Result};
use clap::Args;
use std::io::{BufRead, Write};
use std::process::Command;

use super::Session;
use crate::errors::BootstrapError;
use crate::toolchain::ensure_runnable;

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Wait for Enter before exiting when resolution or grove fails.
    #[clap(long = "pause-on-error", action = clap::ArgAction::SetTrue)]
    pub pause_on_error: bool,

    /// Arguments passed to grove.
    #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Executes the run command.
///
/// ## Exit Codes
///
/// - Returns `Ok(())` if grove exits with 0
/// - Returns `Err(BootstrapError::ProcessExitCode)` if grove exits non-zero
/// - Returns other errors if grove cannot be resolved or started
///
/// # Errors
///
/// See above. With `--pause-on-error`, every failure is reported here and
/// returned as `ProcessExitCode` so it is not printed twice.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let result = launch(args).await;

    match result {
        Err(e) if args.pause_on_error => {
            let stdin = std::io::stdin();
            Err(report_and_pause(&e, stdin.lock(), std::io::stderr()))
        }
        other => other,
    }
}

async fn launch(args: &RunArgs) -> Result<()> {
    let session = Session::load()?;
    let resolution = session.resolver().resolve().await?;
    ensure_runnable(&resolution)?;

    let program = resolution.invocable();
    log::debug!(
        "Running {} {} {}",
        if resolution.is_system() { "system" } else { "cached" },
        program.to_string_lossy(),
        args.args.join(" ")
    );

    let status = Command::new(&program)
        .args(&args.args)
        .status()
        .with_context(|| format!("Failed to execute {}", program.to_string_lossy()))?;

    if !status.success() {
        return Err(BootstrapError::process_exit_code(status.code().unwrap_or(1)).into());
    }
    Ok(())
}

/// Prints `err`, waits for a line on `input`, and returns the exit code error.
fn report_and_pause(
    err: &anyhow::Error,
    mut input: impl BufRead,
    mut out: impl Write,
) -> anyhow::Error {
    let code = match err.downcast_ref::<BootstrapError>() {
        Some(BootstrapError::ProcessExitCode { code }) => {
            let _ = writeln!(out, "grove exited with code {code}");
            *code
        }
        _ => {
            let _ = writeln!(out, "Error: {err:?}");
            1
        }
    };
    let _ = write!(out, "Press Enter to close...");
    let _ = out.flush();

    let mut line = String::new();
    let _ = input.read_line(&mut line);

    BootstrapError::process_exit_code(code).into()
}
