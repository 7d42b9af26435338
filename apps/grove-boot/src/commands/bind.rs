//! Bind command for the grove-boot CLI.
//!
//! Binds the tmux key named by the `@grove-key` option (default `g`) to a
//! popup running grove through grove-boot. Meant to be called from
//! `.tmux.conf`:
//!
//! ```bash
//! set -g @grove-key w
//! run-shell 'grove-boot bind'
//! ```

use anyhow::{Context, Result};

use crate::config::Settings;
use crate::multiplexer::{self, binding};

/// Executes the bind command.
///
/// # Errors
///
/// Returns an error if not running inside tmux or if tmux rejects the
/// binding.
pub fn execute() -> Result<()> {
    let settings = Settings::load()?;
    let mux = multiplexer::detect()?;
    let exe = std::env::current_exe().context("Failed to locate the grove-boot executable")?;

    let key = binding::bind_popup(mux.as_ref(), &settings.popup, &exe)?;
    println!("Bound prefix + {key} to the grove popup.");
    Ok(())
}
