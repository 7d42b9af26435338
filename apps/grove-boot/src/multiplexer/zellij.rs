//! zellij command surface.
//!
//! zellij has no user option store; key bindings live in the user's
//! `config.kdl`, so [`Zellij::get_option`] always yields the default.

use anyhow::Result;
use std::ffi::OsString;

use super::{Multiplexer, MultiplexerKind, check_status, run_captured};

pub struct Zellij {
    program: OsString,
}

impl Zellij {
    #[must_use]
    pub fn new() -> Self {
        Self::with_program("zellij")
    }

    #[must_use]
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Zellij {
    fn default() -> Self {
        Self::new()
    }
}

impl Multiplexer for Zellij {
    fn kind(&self) -> MultiplexerKind {
        MultiplexerKind::Zellij
    }

    fn get_option(&self, _name: &str, default: &str) -> Result<String> {
        Ok(default.to_string())
    }

    fn run_action(&self, args: &[String]) -> Result<()> {
        let output = run_captured(&self.program, args)?;
        check_status(&self.program, args, &output)
    }
}
