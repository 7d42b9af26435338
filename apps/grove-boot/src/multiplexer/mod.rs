//! Terminal multiplexer integration.
//!
//! grove runs inside a popup of the host multiplexer. Everything grove-boot
//! needs from the multiplexer goes through the narrow [`Multiplexer`] trait
//! so the binding logic can be tested without a running tmux or zellij.
//!
//! ## Module Structure
//!
//! - [`tmux`] - `tmux` command surface
//! - [`zellij`] - `zellij` command surface
//! - [`binding`] - Key binding and popup launch

pub mod binding;
pub mod tmux;
pub mod zellij;

use anyhow::Result;
use std::ffi::OsStr;
use std::fmt;
use std::process::{Command, Output, Stdio};

use crate::errors::BootstrapError;

/// Which multiplexer is hosting the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiplexerKind {
    Tmux,
    Zellij,
}

impl fmt::Display for MultiplexerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tmux => write!(f, "tmux"),
            Self::Zellij => write!(f, "zellij"),
        }
    }
}

/// Capabilities grove-boot uses from the host multiplexer.
pub trait Multiplexer {
    fn kind(&self) -> MultiplexerKind;

    /// Reads a user option, returning `default` when it is unset or empty.
    ///
    /// # Errors
    ///
    /// Returns `Multiplexer` if the option store cannot be queried.
    fn get_option(&self, name: &str, default: &str) -> Result<String>;

    /// Runs one multiplexer command with `args`.
    ///
    /// # Errors
    ///
    /// Returns `Multiplexer` if the command cannot be started or fails.
    fn run_action(&self, args: &[String]) -> Result<()>;
}

/// Detects the multiplexer from the session environment variables.
///
/// tmux wins when both are set, which happens when zellij is started from
/// inside a tmux pane and the outer session is the one that owns the popup.
#[must_use]
pub fn detect_kind(lookup: impl Fn(&str) -> Option<String>) -> Option<MultiplexerKind> {
    let set = |key: &str| lookup(key).is_some_and(|v| !v.is_empty());
    if set("TMUX") {
        Some(MultiplexerKind::Tmux)
    } else if set("ZELLIJ") {
        Some(MultiplexerKind::Zellij)
    } else {
        None
    }
}

/// Returns the multiplexer hosting this process.
///
/// # Errors
///
/// Returns `Multiplexer` when not running inside tmux or zellij.
pub fn detect() -> Result<Box<dyn Multiplexer>> {
    match detect_kind(|key| std::env::var(key).ok()) {
        Some(MultiplexerKind::Tmux) => Ok(Box::new(tmux::Tmux::new())),
        Some(MultiplexerKind::Zellij) => Ok(Box::new(zellij::Zellij::new())),
        None => Err(BootstrapError::multiplexer(
            "not running inside tmux or zellij (neither TMUX nor ZELLIJ is set)",
        )
        .into()),
    }
}

/// Runs `program args` and captures its output.
fn run_captured(program: &OsStr, args: &[String]) -> Result<Output> {
    log::debug!("{} {}", program.to_string_lossy(), args.join(" "));
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            BootstrapError::multiplexer(format!(
                "failed to run {}: {e}",
                program.to_string_lossy()
            ))
            .into()
        })
}

/// Fails with the command's stderr unless it exited successfully.
fn check_status(program: &OsStr, args: &[String], output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(BootstrapError::multiplexer(format!(
        "`{} {}` failed ({}): {}",
        program.to_string_lossy(),
        args.first().map_or("", String::as_str),
        output.status,
        stderr.trim()
    ))
    .into())
}
