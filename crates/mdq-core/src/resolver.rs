//! Output-file attribution for completed jobs.
//!
//! The fetcher's reported destination is sometimes unreliable (encoding
//! issues, or it named an intermediate artifact). Resolution order:
//! the reported path if it exists on disk, else the most recently modified
//! audio file in the destination directory, accepted only within a bounded
//! recency window, so a pre-existing file (or a concurrent job's output
//! from long ago) is not misattributed. No candidate is not an error: the
//! fetch itself succeeded, the job completes without a path.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Extensions the directory scan considers audio output.
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "wav", "ogg", "m4a", "aac", "opus", "wma", "webm", "mka",
];

/// Default recency window for directory-scan attribution.
pub const DEFAULT_RECENCY_WINDOW: Duration = Duration::from_secs(120);

/// Resolve the file a completed job produced.
///
/// `reported` is the path captured from the fetcher's output, if any;
/// relative paths are taken against `dir` (the fetcher runs with `dir` as
/// its working directory). `now` is injected so tests can pin the clock.
pub fn resolve_output(
    reported: Option<&Path>,
    dir: &Path,
    window: Duration,
    now: SystemTime,
) -> Option<PathBuf> {
    if let Some(p) = reported {
        let p = if p.is_absolute() {
            p.to_path_buf()
        } else {
            dir.join(p)
        };
        if p.is_file() {
            return Some(p);
        }
        tracing::debug!(path = %p.display(), "reported destination missing, scanning directory");
    }

    let (path, modified) = newest_audio_file(dir)?;
    let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
    if age > window {
        tracing::debug!(
            path = %path.display(),
            age_secs = age.as_secs(),
            "newest audio file is outside the recency window"
        );
        return None;
    }
    Some(path)
}

/// Most recently modified audio file in `dir`, with its mtime.
fn newest_audio_file(dir: &Path) -> Option<(PathBuf, SystemTime)> {
    let mut newest: Option<(PathBuf, SystemTime)> = None;
    for entry in fs::read_dir(dir).ok()? {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if !is_audio_file(&path) {
            continue;
        }
        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }
        let Ok(modified) = meta.modified() else { continue };
        match &newest {
            Some((_, best)) if *best >= modified => {}
            _ => newest = Some((path, modified)),
        }
    }
    newest
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            AUDIO_EXTENSIONS.iter().any(|known| *known == e)
        })
        .unwrap_or(false)
}
