//! Resolve command for the grove-boot CLI.
//!
//! Prints what a caller should execute: the bare name `grove` when it is on
//! `PATH`, the full path of the cached binary otherwise. Nothing else is
//! written to stdout, so scripts can use `$(grove-boot resolve)`.

use anyhow::Result;

use super::Session;
use crate::toolchain::ensure_runnable;

/// Executes the resolve command.
///
/// # Errors
///
/// Returns an error if no runnable binary can be produced.
pub async fn execute() -> Result<()> {
    let session = Session::load()?;
    let resolution = session.resolver().resolve().await?;
    ensure_runnable(&resolution)?;

    println!("{}", resolution.invocable().to_string_lossy());
    Ok(())
}
