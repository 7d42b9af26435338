//! Popup command for the grove-boot CLI.
//!
//! Opens grove in a popup of the current multiplexer: a `display-popup` in
//! tmux, a floating pane in zellij.

use anyhow::{Context, Result};
use clap::Args;

use crate::config::Settings;
use crate::multiplexer::{self, binding};

/// Arguments for the popup command.
#[derive(Args)]
pub struct PopupArgs {
    /// Arguments passed to grove.
    #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Executes the popup command.
///
/// # Errors
///
/// Returns an error if no multiplexer is detected or the popup cannot be
/// opened.
pub fn execute(args: &PopupArgs) -> Result<()> {
    let settings = Settings::load()?;
    let mux = multiplexer::detect()?;
    let exe = std::env::current_exe().context("Failed to locate the grove-boot executable")?;

    binding::open_popup(mux.as_ref(), &settings.popup, &exe, &args.args)
}
