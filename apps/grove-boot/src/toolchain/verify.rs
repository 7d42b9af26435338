//! Integrity checks for downloaded archives and installed binaries.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::errors::{BootstrapError, io_error};

/// Verifies that a file matches the expected SHA-256 checksum.
///
/// # Errors
///
/// Returns `ArtifactCorrupt` on mismatch, or an I/O error if the file
/// cannot be read.
pub fn verify_checksum(file_path: &Path, expected: &str) -> Result<()> {
    let computed = compute_sha256(file_path)?;

    if computed != expected.to_lowercase() {
        return Err(BootstrapError::artifact_corrupt(format!(
            "checksum mismatch for {}: expected {expected}, got {computed}",
            file_path.display()
        ))
        .into());
    }

    Ok(())
}

/// Computes the SHA-256 hash of a file as a lowercase hex string.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn compute_sha256(file_path: &Path) -> Result<String> {
    let mut file =
        std::fs::File::open(file_path).map_err(|e| io_error(file_path, "open", e))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| io_error(file_path, "read", e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Runs `<binary> --version` and requires a zero exit status.
///
/// Returns the first line the binary printed.
///
/// # Errors
///
/// Returns `ArtifactCorrupt` if the binary cannot be started or fails.
pub fn self_check(binary: &Path) -> Result<String> {
    let run = || {
        Command::new(binary)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
    };

    let mut result = run();
    for _ in 0..3 {
        // ETXTBSY: a forked process may briefly hold the freshly written file open.
        match &result {
            Err(e) if e.kind() == std::io::ErrorKind::ExecutableFileBusy => {
                std::thread::sleep(std::time::Duration::from_millis(50));
                result = run();
            }
            _ => break,
        }
    }

    let output = result.map_err(|e| {
        BootstrapError::artifact_corrupt(format!("cannot execute {}: {e}", binary.display()))
    })?;

    if !output.status.success() {
        return Err(BootstrapError::artifact_corrupt(format!(
            "{} --version exited with {}",
            binary.display(),
            output.status
        ))
        .into());
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_string())
}
