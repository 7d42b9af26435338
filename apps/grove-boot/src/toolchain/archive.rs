//! tar.gz extraction for release archives.
//!
//! Release archives carry the binary either at the root (`grove`) or under a
//! single folder (`grove_1.2.3_linux_amd64/grove`), next to a README and
//! licence. [`extract_tar_gz`] unpacks everything; [`locate_binary`] then
//! finds the executable wherever it landed.

use anyhow::Result;
use flate2::read::GzDecoder;
use std::path::{Component, Path, PathBuf};
use tar::Archive;

use crate::errors::{BootstrapError, io_error};

/// How deep [`locate_binary`] descends below the extraction root.
const MAX_SEARCH_DEPTH: usize = 3;

/// Extracts a tar.gz archive into `dest_dir`.
///
/// Creates `dest_dir` if it does not exist.
///
/// # Errors
///
/// Returns `ArtifactCorrupt` if the archive cannot be decoded or contains an
/// absolute or `..` path, and an I/O error if files cannot be written.
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dest_dir).map_err(|e| io_error(dest_dir, "create directory", e))?;

    let file = std::fs::File::open(archive_path)
        .map_err(|e| io_error(archive_path, "open archive", e))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let corrupt = |e: std::io::Error| {
        BootstrapError::artifact_corrupt(format!(
            "cannot read {}: {e}",
            archive_path.display()
        ))
    };

    let mut entries_seen = 0usize;
    for entry in archive.entries().map_err(corrupt)? {
        let mut entry = entry.map_err(corrupt)?;
        let entry_path = entry.path().map_err(corrupt)?.into_owned();

        // Reject traversal ("../../etc/passwd") and absolute paths.
        if entry_path.is_absolute()
            || entry_path
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(BootstrapError::artifact_corrupt(format!(
                "archive entry escapes the extraction directory: {}",
                entry_path.display()
            ))
            .into());
        }

        let output_path = dest_dir.join(&entry_path);
        if entry.header().entry_type().is_dir() {
            std::fs::create_dir_all(&output_path)
                .map_err(|e| io_error(&output_path, "create directory", e))?;
        } else {
            if let Some(parent) = output_path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| io_error(parent, "create directory", e))?;
            }
            entry
                .unpack(&output_path)
                .map_err(|e| io_error(&output_path, "extract", e))?;
        }
        entries_seen += 1;
    }

    if entries_seen == 0 {
        return Err(BootstrapError::artifact_corrupt(format!(
            "{} is empty",
            archive_path.display()
        ))
        .into());
    }

    Ok(())
}

/// Finds a regular file named `name` under `root`, breadth first.
///
/// # Errors
///
/// Returns `ArtifactCorrupt` if no such file exists within
/// `MAX_SEARCH_DEPTH` levels.
pub fn locate_binary(root: &Path, name: &str) -> Result<PathBuf> {
    let mut level = vec![root.to_path_buf()];

    for _ in 0..=MAX_SEARCH_DEPTH {
        let mut next = Vec::new();
        for dir in &level {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
            let Ok(entries) = std::fs::read_dir(dir) else {
                continue;
            };
            let mut subdirs: Vec<PathBuf> = entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect();
            subdirs.sort();
            next.extend(subdirs);
        }
        if next.is_empty() {
            break;
        }
        level = next;
    }

    Err(BootstrapError::artifact_corrupt(format!("archive does not contain a `{name}` binary")).into())
}
