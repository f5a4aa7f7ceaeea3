//! Job, job state, and progress snapshot types.
//!
//! A `Job` is one request to fetch a remote media resource into a local
//! audio file. Identity is a UUID assigned at submission and never reused;
//! progress events and cancellation are keyed by it.

use std::path::PathBuf;
use std::time::SystemTime;
use uuid::Uuid;

/// Job identifier (opaque, assigned at submission).
pub type JobId = Uuid;

/// Requested audio quality/container preference.
///
/// Closed enumeration: each variant maps to a fixed fetcher format
/// selection (see `fetcher::build_fetcher_args`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// Best available audio, whatever codec the source offers.
    #[default]
    Best,
    /// Opus (the highest-quality native format on most sources).
    Opus,
    /// AAC in an M4A container.
    M4a,
    /// Lossless FLAC container (no quality gain over the source).
    Flac,
}

impl AudioFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            AudioFormat::Best => "best",
            AudioFormat::Opus => "opus",
            AudioFormat::M4a => "m4a",
            AudioFormat::Flac => "flac",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "best" => Some(AudioFormat::Best),
            "opus" => Some(AudioFormat::Opus),
            "m4a" => Some(AudioFormat::M4a),
            "flac" => Some(AudioFormat::Flac),
            _ => None,
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One download request.
#[derive(Debug, Clone)]
pub struct Job {
    /// Stable identity for progress correlation and cancellation.
    pub id: JobId,
    /// Source locator, passed through to the external fetcher untouched.
    pub url: String,
    /// Destination directory the fetcher writes into.
    pub output_dir: PathBuf,
    /// Quality/container preference.
    pub format: AudioFormat,
    /// Display title, carried opaquely for UI correlation.
    pub title: Option<String>,
    /// Thumbnail reference, carried opaquely for UI correlation.
    pub thumbnail: Option<String>,
    /// Submission time, for FIFO tie-breaking.
    pub created_at: SystemTime,
}

impl Job {
    /// Create a new job with a fresh identity.
    pub fn new(url: impl Into<String>, output_dir: impl Into<PathBuf>, format: AudioFormat) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            output_dir: output_dir.into(),
            format,
            title: None,
            thumbnail: None,
            created_at: SystemTime::now(),
        }
    }

    /// Set the display title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the thumbnail reference.
    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }
}

/// High-level job state.
///
/// `Queued → Downloading → Converting → Completed | Error`; `Cancelled` is
/// reachable from `Queued` or `Downloading` only. Conversion, once started,
/// always runs to completion or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Downloading,
    Converting,
    Completed,
    Error,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::Converting => "converting",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// True for states no further event will follow.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Error | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured progress for one job, derived from parsed fetcher output.
///
/// `progress` is 0–100 but not monotonic: the fetcher's own conversion
/// phase reports on its own scale, so consumers must tolerate resets.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: f32,
    /// Human-readable total size (e.g. "10.00MiB"), when reported.
    pub total_size: Option<String>,
    /// Human-readable transfer rate (e.g. "1.20MiB/s"), when reported.
    pub download_speed: Option<String>,
    /// Colon-delimited remaining time (e.g. "00:08"), when reported.
    pub eta: Option<String>,
    /// Display title echoed from the job.
    pub title: Option<String>,
    /// Resolved output file, once known.
    pub file_path: Option<PathBuf>,
    /// Failure description for `Error` terminal snapshots.
    pub error: Option<String>,
}

impl ProgressSnapshot {
    /// Initial snapshot for a freshly submitted job.
    pub fn queued(job: &Job) -> Self {
        Self::new(job.id, JobStatus::Queued, job.title.clone())
    }

    pub fn new(id: JobId, status: JobStatus, title: Option<String>) -> Self {
        Self {
            id,
            status,
            progress: 0.0,
            total_size: None,
            download_speed: None,
            eta: None,
            title,
            file_path: None,
            error: None,
        }
    }
}
