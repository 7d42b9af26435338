//! Build script for grove-boot.
//!
//! Embeds the short git commit hash shown by `grove-boot version --verbose`.

use std::process::Command;

fn main() {
    let commit = git_output(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".into());
    println!("cargo:rustc-env=GROVE_BOOT_GIT_COMMIT={commit}");

    if let Some(toplevel) = git_output(&["rev-parse", "--show-toplevel"]) {
        println!("cargo:rerun-if-changed={toplevel}/.git/HEAD");
    }
}

/// Runs git with `args` and returns trimmed stdout, or `None` on any failure.
fn git_output(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() { None } else { Some(text) }
}
