//! Shared helpers for integration tests: stub fetcher/transcoder scripts
//! standing in for the external tools, and snapshot-stream collection.
//!
//! The stub fetcher treats the job's source locator (its last argument) as
//! the path of a flag file: it announces progress, blocks until the flag
//! exists, writes `<flag>.m4a`, and announces it as the destination. Tests
//! complete a specific job deterministically by touching its flag.

#![allow(dead_code)]

use std::collections::HashSet;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mdq_core::executor::RunContext;
use mdq_core::job::{JobId, JobStatus, ProgressSnapshot};
use mdq_core::postprocess::TrimOptions;
use tokio::sync::mpsc;

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// Fetcher stub that blocks until its flag file (= job url) exists.
/// Writes `<flag>.started` on startup and `<flag>.m4a` on completion.
pub fn flag_fetcher(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "fake-fetcher",
        r#"for a in "$@"; do last="$a"; done
: > "$last.started"
echo "[download]  10.0% of 4.00MiB at 1.00MiB/s ETA 00:10"
while [ ! -e "$last" ]; do sleep 0.05; done
printf 'audio-bytes' > "$last.m4a"
echo "[download] Destination: $last.m4a""#,
    )
}

/// Fetcher stub that writes its output and exits immediately.
pub fn instant_fetcher(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "fake-fetcher-instant",
        r#"for a in "$@"; do last="$a"; done
printf 'original-audio' > "$last.m4a"
echo "[download] 100% of 1.00MiB at 1.00MiB/s ETA 00:00"
echo "[download] Destination: $last.m4a""#,
    )
}

/// Fetcher stub that fails with the given exit code.
pub fn failing_fetcher(dir: &Path, code: i32) -> PathBuf {
    write_script(
        dir,
        "fake-fetcher-fail",
        &format!("echo \"[download] starting\"\nexit {code}"),
    )
}

/// Fetcher stub that exits 0 without producing any file or destination.
pub fn silent_fetcher(dir: &Path) -> PathBuf {
    write_script(dir, "fake-fetcher-silent", "exit 0")
}

/// Transcoder stub that writes trimmed content to its output (last
/// argument) and succeeds.
pub fn trimming_transcoder(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "fake-transcoder",
        r#"for a in "$@"; do last="$a"; done
printf 'trimmed-audio' > "$last""#,
    )
}

/// Transcoder stub that always fails.
pub fn failing_transcoder(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "fake-transcoder-fail",
        "echo 'simulated transcoder failure' >&2\nexit 1",
    )
}

/// Run context pointing at stub tools. `transcoder = None` disables the
/// silence trim.
pub fn stub_context(fetcher: &Path, transcoder: Option<&Path>) -> RunContext {
    RunContext {
        fetcher_path: fetcher.display().to_string(),
        transcoder_path: transcoder
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "/bin/false".to_string()),
        recency_window: Duration::from_secs(120),
        trim: transcoder.map(|_| TrimOptions::default()),
    }
}

/// Receives snapshots and remembers everything seen, so tests can assert
/// both on what happened and on what never happened.
pub struct SnapshotLog {
    rx: mpsc::Receiver<ProgressSnapshot>,
    pub seen: Vec<ProgressSnapshot>,
}

impl SnapshotLog {
    pub fn new(rx: mpsc::Receiver<ProgressSnapshot>) -> Self {
        Self {
            rx,
            seen: Vec::new(),
        }
    }

    /// Wait (up to 10 s) for a snapshot matching `pred`, recording
    /// everything received along the way.
    pub async fn wait_for(
        &mut self,
        mut pred: impl FnMut(&ProgressSnapshot) -> bool,
        what: &str,
    ) -> ProgressSnapshot {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let snap = self.rx.recv().await.expect("progress channel closed");
                self.seen.push(snap.clone());
                if pred(&snap) {
                    return snap;
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for: {what}"))
    }

    /// Wait until `n` distinct jobs have reported `status`.
    pub async fn wait_for_distinct(&mut self, status: JobStatus, n: usize) -> HashSet<JobId> {
        let mut ids = HashSet::new();
        while ids.len() < n {
            let snap = self
                .wait_for(|s| s.status == status, "distinct status snapshots")
                .await;
            ids.insert(snap.id);
        }
        ids
    }

    /// True if any recorded snapshot for `id` carries `status`.
    pub fn has(&self, id: JobId, status: JobStatus) -> bool {
        self.seen.iter().any(|s| s.id == id && s.status == status)
    }
}
