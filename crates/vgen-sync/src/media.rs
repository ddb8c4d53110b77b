//! FFmpeg helpers for the sync subsystem.
//!
//! The rater re-analyzes rendered video, which means pulling its audio track
//! out to a mono 16 kHz WAV the transcriber can consume, and probing media
//! durations for the estimation fallback.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{SyncError, SyncResult};

/// Extract the audio track of a media file to 16 kHz mono PCM WAV.
pub async fn extract_audio_track(input: &Path, output: &Path) -> SyncResult<()> {
    let ffmpeg = which::which("ffmpeg").map_err(|_| SyncError::FfmpegNotFound)?;

    debug!(input = ?input, output = ?output, "Extracting audio track");
    let result = tokio::process::Command::new(ffmpeg)
        .args(["-y", "-v", "error", "-i"])
        .arg(input)
        .args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1"])
        .arg(output)
        .output()
        .await
        .map_err(|e| SyncError::FfmpegFailed {
            message: format!("failed to spawn ffmpeg: {e}"),
            stderr: None,
        })?;

    if !result.status.success() {
        return Err(SyncError::FfmpegFailed {
            message: format!("audio extraction exited with {:?}", result.status.code()),
            stderr: Some(String::from_utf8_lossy(&result.stderr).trim().to_string()),
        });
    }
    Ok(())
}

/// Probe a media file's duration in seconds via ffprobe.
pub async fn probe_duration(input: &Path) -> SyncResult<f64> {
    let ffprobe = which::which("ffprobe").map_err(|_| SyncError::FfprobeNotFound)?;

    let result = tokio::process::Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "json",
        ])
        .arg(input)
        .output()
        .await
        .map_err(|e| SyncError::FfmpegFailed {
            message: format!("failed to spawn ffprobe: {e}"),
            stderr: None,
        })?;

    if !result.status.success() {
        return Err(SyncError::FfmpegFailed {
            message: format!("ffprobe exited with {:?}", result.status.code()),
            stderr: Some(String::from_utf8_lossy(&result.stderr).trim().to_string()),
        });
    }

    let probe: ProbeOutput = serde_json::from_slice(&result.stdout)?;
    probe
        .format
        .duration
        .parse::<f64>()
        .map_err(|_| SyncError::FfmpegFailed {
            message: "ffprobe returned a non-numeric duration".to_string(),
            stderr: None,
        })
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: String,
}
