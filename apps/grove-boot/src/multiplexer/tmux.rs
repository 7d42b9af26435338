//! tmux command surface.

use anyhow::Result;
use std::ffi::OsString;

use super::{Multiplexer, MultiplexerKind, check_status, run_captured};

/// Talks to the tmux server of the current session.
pub struct Tmux {
    program: OsString,
}

impl Tmux {
    #[must_use]
    pub fn new() -> Self {
        Self::with_program("tmux")
    }

    /// Uses `program` instead of `tmux` from `PATH`.
    #[must_use]
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Tmux {
    fn default() -> Self {
        Self::new()
    }
}

impl Multiplexer for Tmux {
    fn kind(&self) -> MultiplexerKind {
        MultiplexerKind::Tmux
    }

    fn get_option(&self, name: &str, default: &str) -> Result<String> {
        let args = vec![
            "show-option".to_string(),
            "-gqv".to_string(),
            name.to_string(),
        ];
        let output = run_captured(&self.program, &args)?;
        check_status(&self.program, &args, &output)?;

        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if value.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(value)
        }
    }

    fn run_action(&self, args: &[String]) -> Result<()> {
        let output = run_captured(&self.program, args)?;
        check_status(&self.program, args, &output)
    }
}
