//! Job executor: drives exactly one job from `Downloading` to a terminal
//! state.
//!
//! Spawns the external fetcher bound to the destination directory, feeds
//! its combined stdout/stderr through the progress parser, and emits a
//! snapshot on every change. On success it resolves the output file,
//! announces `Converting`, runs the best-effort silence trim, and emits
//! `Completed`. The executor is the only owner of the subprocess handle
//! and releases it on every exit path, including cancellation.

use std::io;
use std::process::Stdio;
use std::time::{Duration, SystemTime};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::MdqConfig;
use crate::fetcher;
use crate::job::{Job, JobStatus, ProgressSnapshot};
use crate::postprocess::{self, TrimOptions};
use crate::progress;
use crate::resolver;

/// Progress value announced when our own conversion step begins
/// (the fetch itself is done at this point).
const CONVERTING_PROGRESS: f32 = 98.0;

/// Everything a job run needs besides the job itself.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Fetcher binary (path or name resolved via `PATH`).
    pub fetcher_path: String,
    /// Transcoder binary for post-processing.
    pub transcoder_path: String,
    /// Recency window for directory-scan file attribution.
    pub recency_window: Duration,
    /// Silence-trim tuning; `None` disables post-processing.
    pub trim: Option<TrimOptions>,
}

impl RunContext {
    pub fn from_config(cfg: &MdqConfig) -> Self {
        Self {
            fetcher_path: cfg.fetcher_path.clone(),
            transcoder_path: cfg.transcoder_path.clone(),
            recency_window: Duration::from_secs(cfg.resolver_recency_secs),
            trim: cfg.trim_silence.then(|| cfg.trim.unwrap_or_default()),
        }
    }
}

/// Fetch failure classification (spawn vs. exit code vs. pipe I/O), so the
/// terminal snapshot can carry a precise message.
#[derive(Debug)]
pub enum FetchError {
    /// The fetcher executable could not be launched.
    Spawn(io::Error),
    /// The fetcher ran but exited nonzero (`None` = killed by a signal).
    Exit(Option<i32>),
    /// Reading from or waiting on the fetcher failed.
    Io(io::Error),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Spawn(e) => write!(f, "failed to launch fetcher: {}", e),
            FetchError::Exit(Some(code)) => write!(f, "fetcher exited with code {}", code),
            FetchError::Exit(None) => write!(f, "fetcher terminated by signal"),
            FetchError::Io(e) => write!(f, "fetcher I/O error: {}", e),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Spawn(e) | FetchError::Io(e) => Some(e),
            FetchError::Exit(_) => None,
        }
    }
}

enum FetchOutcome {
    Finished,
    Cancelled,
}

/// Run one job to its terminal snapshot. Never returns an error: every
/// failure mode is reported through the progress sink.
pub async fn run_job(
    job: Job,
    cancel: CancellationToken,
    ctx: &RunContext,
    progress_tx: &mpsc::Sender<ProgressSnapshot>,
) {
    let mut snap = ProgressSnapshot::new(job.id, JobStatus::Downloading, job.title.clone());
    emit(progress_tx, &snap).await;

    match run_fetch(&job, &cancel, ctx, progress_tx, &mut snap).await {
        Ok(FetchOutcome::Finished) => {
            finish_job(&job, ctx, progress_tx, &mut snap).await;
        }
        Ok(FetchOutcome::Cancelled) => {
            tracing::info!(job_id = %job.id, "download cancelled");
            snap.status = JobStatus::Cancelled;
            emit(progress_tx, &snap).await;
        }
        Err(e) => {
            tracing::warn!(job_id = %job.id, url = %job.url, error = %e, "download failed");
            snap.status = JobStatus::Error;
            snap.error = Some(e.to_string());
            emit(progress_tx, &snap).await;
        }
    }
}

/// Spawn the fetcher and stream its output until exit or cancellation.
async fn run_fetch(
    job: &Job,
    cancel: &CancellationToken,
    ctx: &RunContext,
    progress_tx: &mpsc::Sender<ProgressSnapshot>,
    snap: &mut ProgressSnapshot,
) -> Result<FetchOutcome, FetchError> {
    // A cancel issued between admission and this first poll must not
    // launch a process at all.
    if cancel.is_cancelled() {
        return Ok(FetchOutcome::Cancelled);
    }

    let mut child = Command::new(&ctx.fetcher_path)
        .args(fetcher::build_fetcher_args(job))
        .current_dir(&job.output_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(FetchError::Spawn)?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| FetchError::Io(io::Error::other("failed to capture fetcher stdout")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| FetchError::Io(io::Error::other("failed to capture fetcher stderr")))?;

    // Merge both pipes into one ordered-per-stream line channel; the
    // channel closes when both pipes hit EOF.
    let (line_tx, mut line_rx) = mpsc::channel::<String>(64);
    tokio::spawn(forward_lines(stdout, line_tx.clone()));
    tokio::spawn(forward_lines(stderr, line_tx));

    loop {
        tokio::select! {
            // Once the fetcher's own conversion phase starts, the download
            // has effectively succeeded; cancellation is no longer honored.
            _ = cancel.cancelled(), if snap.status != JobStatus::Converting => {
                let _ = child.kill().await;
                return Ok(FetchOutcome::Cancelled);
            }
            maybe_line = line_rx.recv() => match maybe_line {
                Some(line) => {
                    tracing::trace!(job_id = %job.id, "fetcher: {}", line);
                    if progress::apply_line(&line, snap) {
                        emit(progress_tx, snap).await;
                    }
                }
                None => break,
            }
        }
    }

    let status = tokio::select! {
        _ = cancel.cancelled(), if snap.status != JobStatus::Converting => {
            let _ = child.kill().await;
            return Ok(FetchOutcome::Cancelled);
        }
        status = child.wait() => status.map_err(FetchError::Io)?,
    };

    if status.success() {
        Ok(FetchOutcome::Finished)
    } else {
        Err(FetchError::Exit(status.code()))
    }
}

/// Success tail: resolve the output file, run the best-effort trim, and
/// emit `Completed`. Trim failure and resolution failure are degraded
/// outcomes, never errors: the fetch itself succeeded.
async fn finish_job(
    job: &Job,
    ctx: &RunContext,
    progress_tx: &mpsc::Sender<ProgressSnapshot>,
    snap: &mut ProgressSnapshot,
) {
    let reported = snap.file_path.clone();
    let resolved = resolver::resolve_output(
        reported.as_deref(),
        &job.output_dir,
        ctx.recency_window,
        SystemTime::now(),
    );

    if let Some(path) = resolved {
        snap.status = JobStatus::Converting;
        snap.progress = CONVERTING_PROGRESS;
        snap.file_path = Some(path.clone());
        emit(progress_tx, snap).await;

        if let Some(opts) = &ctx.trim {
            if let Err(e) = postprocess::trim_silence(&path, &ctx.transcoder_path, opts).await {
                tracing::warn!(
                    job_id = %job.id,
                    path = %path.display(),
                    error = %e,
                    "silence trim failed, keeping original file"
                );
            }
        }
        tracing::info!(job_id = %job.id, path = %path.display(), "download completed");
    } else {
        tracing::warn!(
            job_id = %job.id,
            dir = %job.output_dir.display(),
            "fetcher succeeded but no output file could be attributed"
        );
        snap.file_path = None;
    }

    snap.status = JobStatus::Completed;
    snap.progress = 100.0;
    emit(progress_tx, snap).await;
}

/// Forward one pipe's lines into the merged channel until EOF.
async fn forward_lines<R: AsyncRead + Unpin>(reader: R, tx: mpsc::Sender<String>) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).await.is_err() {
            break;
        }
    }
}

async fn emit(tx: &mpsc::Sender<ProgressSnapshot>, snap: &ProgressSnapshot) {
    if tx.send(snap.clone()).await.is_err() {
        tracing::debug!(job_id = %snap.id, "progress receiver dropped");
    }
}
