//! Fetcher output parsing.
//!
//! The external fetcher emits free-text progress lines like:
//! `[download]  42.5% of 10.00MiB at 1.20MiB/s ETA 00:08`
//! plus destination announcements and a conversion-phase marker. Each line
//! updates only the fields it successfully parses on the running snapshot
//! owned by the executor; unrecognized or malformed lines update nothing.

use crate::job::{JobStatus, ProgressSnapshot};
use std::path::PathBuf;

/// Progress the snapshot is clamped to when the fetcher enters its own
/// conversion phase (no further percentage lines are expected from it).
pub const CONVERT_PHASE_PROGRESS: f32 = 95.0;

/// Parse the percentage from a `[download]` progress line.
/// The number must immediately precede `%`.
pub fn parse_percent(line: &str) -> Option<f32> {
    let start = line.find("[download]")? + "[download]".len();
    let rest = line[start..].trim_start();
    let end = rest.find('%')?;
    let pct: f32 = rest[..end].trim().parse().ok()?;
    (0.0..=100.0).contains(&pct).then_some(pct)
}

/// Parse the total-size token following an `of` marker (e.g. `of 10.00MiB`).
pub fn parse_total_size(line: &str) -> Option<String> {
    let start = line.find(" of ")? + " of ".len();
    let token = number_unit_token(line[start..].trim_start())?;
    Some(token.to_string())
}

/// Parse the transfer-rate token following an `at` marker
/// (e.g. `at 1.20MiB/s`). The unit always carries a `/s` suffix.
pub fn parse_speed(line: &str) -> Option<String> {
    let start = line.find(" at ")? + " at ".len();
    let rest = line[start..].trim_start();
    let token = rest.split_whitespace().next()?;
    if !token.ends_with("/s") || !token.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some(token.to_string())
}

/// Parse the colon-delimited time following an `ETA` marker.
pub fn parse_eta(line: &str) -> Option<String> {
    let start = line.find("ETA ")? + "ETA ".len();
    let token = line[start..].trim_start().split_whitespace().next()?;
    if !token.contains(':') || !token.chars().all(|c| c.is_ascii_digit() || c == ':') {
        return None;
    }
    Some(token.to_string())
}

/// Parse the destination path from a `Destination: <path>` announcement.
///
/// The fetcher announces a destination twice when it extracts audio (once
/// for the raw fetch, once for the extracted file); callers keep the later
/// one.
pub fn parse_destination(line: &str) -> Option<PathBuf> {
    let start = line.find("Destination: ")? + "Destination: ".len();
    let path = line[start..].trim();
    if path.is_empty() {
        return None;
    }
    Some(PathBuf::from(path))
}

/// Parse the path from a `<path> has already been downloaded` short-circuit
/// line (emitted when the remote resource was fetched previously).
pub fn parse_already_downloaded(line: &str) -> Option<PathBuf> {
    let end = line.find(" has already been downloaded")?;
    let mut path = &line[..end];
    if let Some(rest) = path.strip_prefix("[download]") {
        path = rest;
    }
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    Some(PathBuf::from(path))
}

/// True when the line marks the fetcher's internal conversion phase
/// (audio extraction / remux handled by the tool itself).
pub fn is_convert_phase(line: &str) -> bool {
    line.contains("[ffmpeg]") || line.contains("[ExtractAudio]")
}

/// Apply one output line to the running snapshot.
///
/// A single line may update zero, one, or several fields; fields the line
/// does not mention carry over. Returns true if anything changed, so the
/// executor can skip re-emitting no-op lines.
pub fn apply_line(line: &str, snap: &mut ProgressSnapshot) -> bool {
    let mut changed = false;

    if let Some(pct) = parse_percent(line) {
        snap.progress = pct;
        snap.status = JobStatus::Downloading;
        changed = true;
    }
    if let Some(size) = parse_total_size(line) {
        changed |= snap.total_size.as_deref() != Some(&size);
        snap.total_size = Some(size);
    }
    if let Some(speed) = parse_speed(line) {
        changed |= snap.download_speed.as_deref() != Some(&speed);
        snap.download_speed = Some(speed);
    }
    if let Some(eta) = parse_eta(line) {
        changed |= snap.eta.as_deref() != Some(&eta);
        snap.eta = Some(eta);
    }
    if let Some(path) = parse_destination(line).or_else(|| parse_already_downloaded(line)) {
        // Later announcements win: the post-extract destination supersedes
        // the raw fetch destination.
        snap.file_path = Some(path);
        changed = true;
    }
    if is_convert_phase(line) {
        snap.status = JobStatus::Converting;
        snap.progress = CONVERT_PHASE_PROGRESS;
        changed = true;
    }

    changed
}

/// Leading `<digits><unit>` token (e.g. `10.00MiB`), or None if the text
/// does not start with a digit.
fn number_unit_token(s: &str) -> Option<&str> {
    if !s.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '.'))
        .unwrap_or(s.len());
    let token = &s[..end];
    (!token.is_empty()).then_some(token)
}
