//! Integration tests for per-job outcomes: fetch failure, degraded
//! resolution, and the best-effort silence trim.

mod common;

use std::fs;
use std::path::PathBuf;

use mdq_core::executor;
use mdq_core::job::{AudioFormat, Job, JobStatus};
use mdq_core::queue::DownloadQueue;
use tempfile::tempdir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn nonzero_exit_reports_error_with_exit_code() {
    let tools = tempdir().unwrap();
    let out = tempdir().unwrap();
    let fetcher = common::failing_fetcher(tools.path(), 3);

    let (tx, rx) = mpsc::channel(64);
    let queue = DownloadQueue::new(common::stub_context(&fetcher, None), 1, tx);
    let mut log = common::SnapshotLog::new(rx);

    let job = Job::new("https://example.com/gone", out.path(), AudioFormat::Best);
    let id = job.id;
    queue.submit(job).await;

    let terminal = log
        .wait_for(|s| s.id == id && s.status.is_terminal(), "terminal snapshot")
        .await;
    assert_eq!(terminal.status, JobStatus::Error);
    let message = terminal.error.expect("error message");
    assert!(message.contains("code 3"), "got: {message}");
    assert!(terminal.file_path.is_none());
}

#[tokio::test]
async fn resolution_failure_still_completes_without_a_path() {
    let tools = tempdir().unwrap();
    let out = tempdir().unwrap();
    let fetcher = common::silent_fetcher(tools.path());

    let (tx, rx) = mpsc::channel(64);
    let queue = DownloadQueue::new(common::stub_context(&fetcher, None), 1, tx);
    let mut log = common::SnapshotLog::new(rx);

    let job = Job::new("https://example.com/ghost", out.path(), AudioFormat::Best);
    let id = job.id;
    queue.submit(job).await;

    let terminal = log
        .wait_for(|s| s.id == id && s.status.is_terminal(), "terminal snapshot")
        .await;
    assert_eq!(terminal.status, JobStatus::Completed);
    assert!(terminal.file_path.is_none());
    assert!(terminal.error.is_none());
    // Degraded completion skips the conversion announcement entirely.
    assert!(!log.has(id, JobStatus::Converting));
}

#[tokio::test]
async fn already_cancelled_job_never_launches_the_fetcher() {
    let tools = tempdir().unwrap();
    let out = tempdir().unwrap();
    let fetcher = common::flag_fetcher(tools.path());
    let ctx = common::stub_context(&fetcher, None);

    let (tx, rx) = mpsc::channel(64);
    let mut log = common::SnapshotLog::new(rx);

    let flag = out.path().join("job.flag");
    let job = Job::new(flag.display().to_string(), out.path(), AudioFormat::Best);
    let id = job.id;
    let cancel = CancellationToken::new();
    cancel.cancel();
    executor::run_job(job, cancel, &ctx, &tx).await;

    let terminal = log
        .wait_for(|s| s.id == id && s.status.is_terminal(), "terminal snapshot")
        .await;
    assert_eq!(terminal.status, JobStatus::Cancelled);
    assert!(terminal.error.is_none());

    // The stub announces itself via the .started flag; it must not exist.
    let started = PathBuf::from(format!("{}.started", flag.display()));
    assert!(!started.exists(), "fetcher was launched for a cancelled job");
}

#[tokio::test]
async fn trim_failure_preserves_the_original_and_the_job_completes() {
    let tools = tempdir().unwrap();
    let out = tempdir().unwrap();
    let fetcher = common::instant_fetcher(tools.path());
    let transcoder = common::failing_transcoder(tools.path());

    let (tx, rx) = mpsc::channel(64);
    let queue = DownloadQueue::new(common::stub_context(&fetcher, Some(&transcoder)), 1, tx);
    let mut log = common::SnapshotLog::new(rx);

    let track = out.path().join("track");
    let job = Job::new(track.display().to_string(), out.path(), AudioFormat::Best);
    let id = job.id;
    queue.submit(job).await;

    let converting = log
        .wait_for(|s| s.id == id && s.status == JobStatus::Converting, "converting")
        .await;
    assert_eq!(converting.progress, 98.0);

    let terminal = log
        .wait_for(|s| s.id == id && s.status.is_terminal(), "terminal snapshot")
        .await;
    assert_eq!(terminal.status, JobStatus::Completed);

    let expected = out.path().join("track.m4a");
    assert_eq!(terminal.file_path.as_deref(), Some(expected.as_path()));
    // Byte-identical original; no temp artifact left behind.
    assert_eq!(fs::read(&expected).unwrap(), b"original-audio");
    assert!(!out.path().join("track.trim.m4a").exists());
}

#[tokio::test]
async fn trim_success_replaces_the_file_at_the_same_path() {
    let tools = tempdir().unwrap();
    let out = tempdir().unwrap();
    let fetcher = common::instant_fetcher(tools.path());
    let transcoder = common::trimming_transcoder(tools.path());

    let (tx, rx) = mpsc::channel(64);
    let queue = DownloadQueue::new(common::stub_context(&fetcher, Some(&transcoder)), 1, tx);
    let mut log = common::SnapshotLog::new(rx);

    let track = out.path().join("track");
    let job = Job::new(track.display().to_string(), out.path(), AudioFormat::Best);
    let id = job.id;
    queue.submit(job).await;

    let terminal = log
        .wait_for(|s| s.id == id && s.status.is_terminal(), "terminal snapshot")
        .await;
    assert_eq!(terminal.status, JobStatus::Completed);

    let expected = out.path().join("track.m4a");
    assert_eq!(terminal.file_path.as_deref(), Some(expected.as_path()));
    assert_eq!(fs::read(&expected).unwrap(), b"trimmed-audio");
    assert!(!out.path().join("track.trim.m4a").exists());
}

#[tokio::test]
async fn progress_fields_flow_through_snapshots() {
    let tools = tempdir().unwrap();
    let out = tempdir().unwrap();
    let fetcher = common::instant_fetcher(tools.path());

    let (tx, rx) = mpsc::channel(64);
    let queue = DownloadQueue::new(common::stub_context(&fetcher, None), 1, tx);
    let mut log = common::SnapshotLog::new(rx);

    let track = out.path().join("track");
    let job = Job::new(track.display().to_string(), out.path(), AudioFormat::Best)
        .with_title("Artist - Song");
    let id = job.id;
    queue.submit(job).await;

    let update = log
        .wait_for(|s| s.id == id && s.progress == 100.0 && s.status == JobStatus::Downloading,
            "parsed progress line")
        .await;
    assert_eq!(update.total_size.as_deref(), Some("1.00MiB"));
    assert_eq!(update.download_speed.as_deref(), Some("1.00MiB/s"));
    assert_eq!(update.eta.as_deref(), Some("00:00"));
    assert_eq!(update.title.as_deref(), Some("Artist - Song"));

    log.wait_for(|s| s.id == id && s.status == JobStatus::Completed, "completion")
        .await;
}
