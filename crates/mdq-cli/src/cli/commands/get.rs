//! `mdq get <url>...` – queue downloads and stream progress until done.

use anyhow::Result;
use std::collections::HashSet;
use std::path::PathBuf;

use mdq_core::config::MdqConfig;
use mdq_core::executor::RunContext;
use mdq_core::job::{AudioFormat, Job, JobStatus, ProgressSnapshot};
use mdq_core::queue::DownloadQueue;
use tokio::sync::mpsc;

pub async fn run_get(
    cfg: &MdqConfig,
    urls: &[String],
    format: AudioFormat,
    jobs: Option<usize>,
    out: Option<PathBuf>,
) -> Result<()> {
    let output_dir = match out.or_else(|| cfg.download_dir.clone()) {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    tokio::fs::create_dir_all(&output_dir).await?;

    let max_concurrent = jobs.unwrap_or(cfg.max_concurrent_downloads);
    let (progress_tx, mut progress_rx) = mpsc::channel(64);
    let queue = DownloadQueue::new(RunContext::from_config(cfg), max_concurrent, progress_tx);

    let mut in_flight: HashSet<_> = HashSet::new();
    for url in urls {
        let job = Job::new(url.clone(), output_dir.clone(), format);
        println!("Queued job {} for URL: {}", job.id, url);
        in_flight.insert(job.id);
        queue.submit(job).await;
    }

    // The queue keeps emitting until every submitted job hits a terminal
    // snapshot; completion order is not submission order.
    while !in_flight.is_empty() {
        let Some(snap) = progress_rx.recv().await else {
            break;
        };
        print_snapshot(&snap);
        if snap.status.is_terminal() {
            in_flight.remove(&snap.id);
        }
    }

    Ok(())
}

fn print_snapshot(snap: &ProgressSnapshot) {
    let id = snap.id.to_string();
    let short = &id[..8];
    match snap.status {
        JobStatus::Queued => println!("[{short}] queued"),
        JobStatus::Downloading => {
            let speed = snap.download_speed.as_deref().unwrap_or("-");
            let eta = snap.eta.as_deref().unwrap_or("-");
            println!("[{short}] {:5.1}%  {speed}  ETA {eta}", snap.progress);
        }
        JobStatus::Converting => println!("[{short}] converting"),
        JobStatus::Completed => match &snap.file_path {
            Some(path) => println!("[{short}] completed: {}", path.display()),
            None => println!("[{short}] completed (output file not identified)"),
        },
        JobStatus::Error => println!(
            "[{short}] error: {}",
            snap.error.as_deref().unwrap_or("unknown failure")
        ),
        JobStatus::Cancelled => println!("[{short}] cancelled"),
    }
}
