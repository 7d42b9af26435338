//! Key binding and popup launch.
//!
//! The popup always runs `grove-boot run --pause-on-error`, so resolution
//! happens on every key press and any failure stays readable until the user
//! dismisses it.

use anyhow::Result;
use shell_escape::escape;
use std::path::Path;

use super::{Multiplexer, MultiplexerKind};
use crate::config::PopupSettings;
use crate::errors::BootstrapError;

/// tmux user option holding the key override.
pub const KEY_OPTION: &str = "@grove-key";

/// Returns the key to bind: the user's override, or `default_key`.
///
/// # Errors
///
/// Returns `Multiplexer` if the option store cannot be read.
pub fn bound_key(mux: &dyn Multiplexer, default_key: &str) -> Result<String> {
    mux.get_option(KEY_OPTION, default_key)
}

/// Shell command line that launches grove through `exe`.
#[must_use]
pub fn launch_command(exe: &Path, args: &[String]) -> String {
    let mut parts = vec![
        escape(exe.to_string_lossy()).into_owned(),
        "run".to_string(),
        "--pause-on-error".to_string(),
    ];
    if !args.is_empty() {
        parts.push("--".to_string());
        parts.extend(args.iter().map(|a| escape(a.as_str().into()).into_owned()));
    }
    parts.join(" ")
}

/// Binds the configured key to a grove popup and confirms it.
///
/// Returns the key that was bound.
///
/// # Errors
///
/// Returns `Multiplexer` for zellij, whose bindings live in `config.kdl`,
/// or if a tmux command fails.
pub fn bind_popup(mux: &dyn Multiplexer, popup: &PopupSettings, exe: &Path) -> Result<String> {
    if mux.kind() != MultiplexerKind::Tmux {
        return Err(BootstrapError::multiplexer(format!(
            "{} key bindings are configured in its own config file; \
             bind a key there to run `{}`",
            mux.kind(),
            launch_command(exe, &[])
        ))
        .into());
    }

    let key = bound_key(mux, &popup.default_key)?;
    let mut args = vec!["bind-key".to_string(), key.clone()];
    args.extend(popup_action(MultiplexerKind::Tmux, popup, exe, &[]));
    mux.run_action(&args)?;

    mux.run_action(&[
        "display-message".to_string(),
        format!("grove: press prefix + {key} to switch worktrees"),
    ])?;

    log::info!("Bound {key} to the grove popup");
    Ok(key)
}

/// Multiplexer arguments that open a grove popup.
#[must_use]
pub fn popup_action(
    kind: MultiplexerKind,
    popup: &PopupSettings,
    exe: &Path,
    args: &[String],
) -> Vec<String> {
    match kind {
        MultiplexerKind::Tmux => vec![
            "display-popup".to_string(),
            "-E".to_string(),
            "-w".to_string(),
            popup.width.clone(),
            "-h".to_string(),
            popup.height.clone(),
            launch_command(exe, args),
        ],
        MultiplexerKind::Zellij => {
            let mut action = vec![
                "run".to_string(),
                "--floating".to_string(),
                "--close-on-exit".to_string(),
                "--width".to_string(),
                popup.width.clone(),
                "--height".to_string(),
                popup.height.clone(),
                "--".to_string(),
                exe.to_string_lossy().into_owned(),
                "run".to_string(),
                "--pause-on-error".to_string(),
            ];
            if !args.is_empty() {
                action.push("--".to_string());
                action.extend(args.iter().cloned());
            }
            action
        }
    }
}

/// Opens a grove popup in the current session.
///
/// # Errors
///
/// Returns `Multiplexer` if the popup cannot be opened.
pub fn open_popup(
    mux: &dyn Multiplexer,
    popup: &PopupSettings,
    exe: &Path,
    args: &[String],
) -> Result<()> {
    mux.run_action(&popup_action(mux.kind(), popup, exe, args))
}
