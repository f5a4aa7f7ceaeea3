//! External fetcher invocation arguments.
//!
//! Builds the argument list for the fetch-and-transcode tool (yt-dlp).
//! The format mapping is a pure function of `AudioFormat`; everything else
//! is a fixed argument set (audio extraction, transient-error retries,
//! metadata/thumbnail embedding, per-line progress).

use crate::job::{AudioFormat, Job};

/// Default fetcher binary, resolved via `PATH`.
pub const DEFAULT_FETCHER: &str = "yt-dlp";

/// Build the full fetcher argument list for one job.
///
/// The destination directory is passed as the working directory by the
/// executor; the output template here is relative to it.
pub fn build_fetcher_args(job: &Job) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();

    // Audio-only extraction.
    args.push("-x".into());

    // Resilience against transient network/extractor failures; retries
    // beyond these are the caller's concern (re-submit a new job).
    args.push("--no-check-certificates".into());
    args.push("--prefer-free-formats".into());
    args.extend(["--extractor-retries".into(), "5".into()]);
    args.extend(["--fragment-retries".into(), "10".into()]);

    args.extend(format_args_for(job.format));

    // Embed metadata and cover art into the output file.
    args.push("--embed-metadata".into());
    args.push("--embed-thumbnail".into());
    args.extend(["--convert-thumbnails".into(), "jpg".into()]);

    // Output template, relative to the destination directory.
    args.extend(["-o".into(), "%(artist)s - %(title)s.%(ext)s".into()]);

    // One progress line per update, single resource only.
    args.push("--newline".into());
    args.push("--no-playlist".into());

    args.push(job.url.clone());
    args
}

/// Format selection flags for one `AudioFormat` variant.
fn format_args_for(format: AudioFormat) -> Vec<String> {
    match format {
        // Opus is the highest-quality native format (VBR, typically webm).
        AudioFormat::Opus => vec![
            "-f".into(),
            "bestaudio[ext=webm]/bestaudio".into(),
            "--audio-format".into(),
            "opus".into(),
        ],
        AudioFormat::M4a => vec![
            "-f".into(),
            "bestaudio[ext=m4a]/bestaudio".into(),
            "--audio-format".into(),
            "m4a".into(),
        ],
        // Lossless container; no quality gain over the source stream.
        AudioFormat::Flac => vec![
            "-f".into(),
            "bestaudio".into(),
            "--audio-format".into(),
            "flac".into(),
            "--audio-quality".into(),
            "0".into(),
        ],
        AudioFormat::Best => vec!["-f".into(), "bestaudio/best".into()],
    }
}
