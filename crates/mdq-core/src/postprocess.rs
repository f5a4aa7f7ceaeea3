//! Best-effort silence trimming via the external transcoder.
//!
//! Produces a trimmed copy next to the original (`<stem>.trim.<ext>`, same
//! container so the transcoder picks the matching codec), then atomically
//! renames it over the original on success. On any failure the temp
//! artifact is removed and the original is left untouched; the caller logs
//! and moves on; trim outcome never changes a job's terminal state.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Default transcoder binary, resolved via `PATH`.
pub const DEFAULT_TRANSCODER: &str = "ffmpeg";

/// Suffix inserted before the extension for the temporary trimmed copy.
const TRIM_SUFFIX: &str = "trim";

/// Silence-trim tuning.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct TrimOptions {
    /// Amplitude threshold below which audio counts as silence, in dB.
    pub threshold_db: f32,
    /// Minimum silence duration to strip, in seconds.
    pub min_silence_secs: f32,
}

impl Default for TrimOptions {
    fn default() -> Self {
        Self {
            threshold_db: -50.0,
            min_silence_secs: 0.3,
        }
    }
}

impl TrimOptions {
    /// `silenceremove` filter spec stripping leading and trailing silence
    /// (tail pass done by reversing, trimming the head, reversing back).
    fn filter_spec(&self) -> String {
        let head = format!(
            "silenceremove=start_periods=1:start_threshold={}dB:start_silence={}",
            self.threshold_db, self.min_silence_secs
        );
        format!("{head},areverse,{head},areverse")
    }
}

/// Trim leading/trailing silence from `input` in place.
///
/// On success the original path holds the trimmed audio. On error the
/// original file is untouched and any temp artifact has been removed.
pub async fn trim_silence(input: &Path, transcoder: &str, opts: &TrimOptions) -> Result<()> {
    if !input.is_file() {
        bail!("source file not found: {}", input.display());
    }
    let temp = trim_temp_path(input)?;

    let output = Command::new(transcoder)
        .arg("-y")
        .arg("-hide_banner")
        .arg("-i")
        .arg(input)
        .arg("-af")
        .arg(opts.filter_spec())
        .arg(&temp)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| format!("spawn transcoder: {transcoder}"))?;

    if !output.status.success() {
        let _ = tokio::fs::remove_file(&temp).await;
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "transcoder exited with {}: {}",
            output.status,
            stderr.lines().last().unwrap_or("").trim()
        );
    }

    // Atomic on the same filesystem; never leaves a window with no file.
    if let Err(e) = tokio::fs::rename(&temp, input).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e).with_context(|| {
            format!("replace original with trimmed copy: {}", input.display())
        });
    }
    tracing::debug!(path = %input.display(), "silence trim applied");
    Ok(())
}

/// Temp output path beside the input, keeping the extension so the
/// transcoder infers the container.
fn trim_temp_path(input: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .context("input path has no file stem")?;
    let ext = input
        .extension()
        .and_then(|s| s.to_str())
        .context("input path has no extension")?;
    Ok(input.with_file_name(format!("{stem}.{TRIM_SUFFIX}.{ext}")))
}
