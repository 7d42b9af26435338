//! Download-and-install of a release into the local install record.
//!
//! All intermediate files live in a uniquely named staging directory inside
//! the record directory, so the final moves are same-filesystem renames.
//! Both the binary and its marker are staged before anything in the record
//! changes; see [`InstallRecord::commit`] for the order of the final moves.

use anyhow::{Context, Result};
use std::path::PathBuf;

use super::archive::{extract_tar_gz, locate_binary};
use super::paths::{InstallRecord, set_executable};
use super::release::{ReleaseArtifact, ReleaseSource};
use super::verify::{self_check, verify_checksum};
use crate::errors::io_error;

/// Knobs for [`install_release`].
#[derive(Debug, Clone, Copy)]
pub struct InstallOptions {
    /// Run `<binary> --version` before committing the install.
    pub self_check: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self { self_check: true }
    }
}

/// Fetches `artifact` and installs its binary into `record`.
///
/// Returns the path of the installed binary. On any failure the previous
/// binary and marker are left as they were.
///
/// # Errors
///
/// - `NetworkUnavailable` if the archive or its checksums cannot be fetched
/// - `ArtifactCorrupt` if the checksum, extraction or self-check fails
/// - `PermissionDenied` if the record directory cannot be written
pub async fn install_release<S: ReleaseSource>(
    source: &S,
    record: &InstallRecord,
    artifact: &ReleaseArtifact,
    options: InstallOptions,
) -> Result<PathBuf> {
    record.ensure_dir()?;

    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(&record.dir)
        .map_err(|e| io_error(&record.dir, "create staging directory", e))?;

    let archive_path = staging.path().join(artifact.filename());
    log::info!("Downloading {}", artifact.url());
    source
        .fetch_archive(artifact, &archive_path)
        .await
        .with_context(|| format!("Failed to download {}", artifact.url()))?;

    match source.fetch_checksum(artifact).await? {
        Some(expected) => verify_checksum(&archive_path, &expected)?,
        None => log::warn!(
            "No checksums published for {}, skipping verification",
            artifact.version
        ),
    }

    let extract_dir = staging.path().join("extract");
    extract_tar_gz(&archive_path, &extract_dir)?;
    let binary = locate_binary(&extract_dir, &record.tool)?;
    set_executable(&binary)?;

    if options.self_check {
        let reported = self_check(&binary)?;
        log::debug!("{} --version: {reported}", record.tool);
    }

    let marker = record.stage_marker(staging.path(), &artifact.version)?;
    record.commit(&binary, &marker)?;

    log::info!(
        "Installed {} {} to {}",
        record.tool,
        artifact.version,
        record.binary_path().display()
    );
    Ok(record.binary_path())
}
