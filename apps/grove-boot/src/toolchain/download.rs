//! HTTP downloads of release archives.
//!
//! - Streaming download, so the archive is never held in memory
//! - Up to 3 attempts with exponential backoff and jitter
//! - Written to `<dest>.part`, renamed to `dest` on success
//! - Progress line on stderr, only when stderr is a terminal
//!
//! Every failure to obtain the bytes is reported as
//! [`BootstrapError::NetworkUnavailable`].

use std::io::{IsTerminal, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures_util::StreamExt;
use rand::Rng;
use tokio::io::AsyncWriteExt;

use crate::errors::{BootstrapError, io_error};

/// Maximum number of download attempts.
const MAX_RETRIES: u32 = 3;

/// Base delay between retries in milliseconds.
const BASE_RETRY_DELAY_MS: u64 = 500;

/// Whole-request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Connection timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Minimum interval between progress updates in milliseconds.
const PROGRESS_INTERVAL_MS: u128 = 250;

/// Downloads `url` to `dest`.
///
/// # Errors
///
/// Returns `NetworkUnavailable` if every attempt fails, or an I/O error if
/// the destination cannot be written.
pub async fn download_file(url: &str, dest: &Path) -> Result<()> {
    let temp_path = dest.with_extension("part");

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error(parent, "create directory", e))?;
    }

    let mut last_error = None;

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            let delay = calculate_retry_delay(attempt);
            log::info!(
                "Retrying download of {url} (attempt {}/{MAX_RETRIES})",
                attempt + 1
            );
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        match download_with_progress(url, &temp_path).await {
            Ok(()) => {
                tokio::fs::rename(&temp_path, dest)
                    .await
                    .map_err(|e| io_error(dest, "move download into place", e))?;
                return Ok(());
            }
            Err(e) => {
                log::debug!("Download attempt {} failed: {e:#}", attempt + 1);
                let _ = tokio::fs::remove_file(&temp_path).await;
                // Retrying cannot fix a local write failure.
                if !crate::errors::is_network_error(&e) {
                    return Err(e);
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        BootstrapError::network_unavailable(format!(
            "download of {url} failed after {MAX_RETRIES} attempts"
        ))
        .into()
    }))
}

async fn download_with_progress(url: &str, dest: &Path) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()
        .context("Failed to create HTTP client")?;

    let response = client.get(url).send().await.map_err(|e| {
        BootstrapError::network_unavailable_with_source(format!("failed to connect to {url}"), e)
    })?;

    if !response.status().is_success() {
        return Err(BootstrapError::network_unavailable(format!(
            "HTTP {} from {url}",
            response.status().as_u16()
        ))
        .into());
    }

    let total_size = response.content_length().unwrap_or(0);
    let show_progress = std::io::stderr().is_terminal();

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| io_error(dest, "create file", e))?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    let start_time = Instant::now();
    let mut last_update = Instant::now();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            BootstrapError::network_unavailable_with_source(
                format!("connection to {url} dropped"),
                e,
            )
        })?;
        file.write_all(&chunk)
            .await
            .map_err(|e| io_error(dest, "write", e))?;
        downloaded += chunk.len() as u64;

        if show_progress && last_update.elapsed().as_millis() >= PROGRESS_INTERVAL_MS {
            print_progress(downloaded, total_size, start_time.elapsed().as_secs_f64());
            last_update = Instant::now();
        }
    }

    file.flush().await.map_err(|e| io_error(dest, "flush", e))?;

    if show_progress {
        print_progress(downloaded, total_size, start_time.elapsed().as_secs_f64());
        eprintln!();
    }

    Ok(())
}

#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn print_progress(downloaded: u64, total: u64, elapsed_secs: f64) {
    let percent = if total > 0 {
        (downloaded as f64 / total as f64 * 100.0) as u8
    } else {
        0
    };
    let speed = if elapsed_secs > 0.0 {
        downloaded as f64 / elapsed_secs
    } else {
        0.0
    };

    eprint!(
        "\r{}/{} ({percent}%) {}     ",
        format_bytes(downloaded),
        format_bytes(total),
        format_speed(speed)
    );
    let _ = std::io::stderr().flush();
}

/// Formats bytes into a human-readable string (KB, MB).
fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    #[allow(clippy::cast_precision_loss)]
    let bytes_f = bytes as f64;

    if bytes_f >= MB {
        format!("{:.2} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.2} KB", bytes_f / KB)
    } else {
        format!("{bytes} B")
    }
}

fn format_speed(speed: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    if speed >= MB {
        format!("{:.2} MB/s", speed / MB)
    } else if speed >= KB {
        format!("{:.2} KB/s", speed / KB)
    } else {
        format!("{speed:.0} B/s")
    }
}

/// Calculates the retry delay with exponential backoff and jitter.
///
/// The delay doubles with each attempt (0.5s, 1s, 2s) with +/- 25% jitter.
fn calculate_retry_delay(attempt: u32) -> u64 {
    let base_delay = BASE_RETRY_DELAY_MS * 2u64.pow(attempt);
    let jitter_range = base_delay / 4;
    let jitter = rand::rng().random_range(0..=jitter_range * 2);
    base_delay - jitter_range + jitter
}
