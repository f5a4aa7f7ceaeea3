//! Download queue manager.
//!
//! Owns the FIFO pending list and the running-job registry (job id →
//! cancellation token), admits jobs up to the concurrency limit, and
//! reclaims the slot when an executor finishes (success, error, or
//! cancellation), immediately admitting the next pending job. All queue
//! state lives behind one mutex that is never held across an await;
//! subprocess I/O happens in the per-job executor tasks, never under the
//! lock.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::executor::{self, RunContext};
use crate::job::{Job, JobId, JobStatus, ProgressSnapshot};

/// Default number of concurrently running downloads.
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

/// The queue manager. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct DownloadQueue {
    inner: Arc<Mutex<QueueInner>>,
    ctx: Arc<RunContext>,
    max_concurrent: usize,
    progress_tx: mpsc::Sender<ProgressSnapshot>,
}

struct QueueInner {
    /// Jobs awaiting a slot, earliest submission first.
    pending: VecDeque<Job>,
    /// Running jobs and the token that cancels their executor.
    running: HashMap<JobId, CancellationToken>,
}

impl DownloadQueue {
    /// Create a queue delivering snapshots to `progress_tx`.
    /// `max_concurrent` is clamped to at least 1.
    pub fn new(
        ctx: RunContext,
        max_concurrent: usize,
        progress_tx: mpsc::Sender<ProgressSnapshot>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(QueueInner {
                pending: VecDeque::new(),
                running: HashMap::new(),
            })),
            ctx: Arc::new(ctx),
            max_concurrent: max_concurrent.max(1),
            progress_tx,
        }
    }

    /// Submit a job: announce `Queued`, append to the pending tail, then
    /// attempt admission.
    pub async fn submit(&self, job: Job) {
        tracing::info!(job_id = %job.id, url = %job.url, "job submitted");
        // The Queued snapshot must be on the channel before the job is
        // admissible: a concurrent slot release would otherwise admit it
        // and its executor could emit Downloading first.
        self.emit(ProgressSnapshot::queued(&job)).await;
        {
            let mut inner = self.inner.lock().unwrap();
            inner.pending.push_back(job);
        }
        self.admit();
    }

    /// Cancel a job by id.
    ///
    /// Running: cancels its executor's token and returns true once the
    /// signal is issued; the terminal `Cancelled` snapshot follows
    /// asynchronously. Pending: removes it from the queue (no process is
    /// ever spawned) and returns true. Unknown id: false.
    pub async fn cancel(&self, id: JobId) -> bool {
        let removed = {
            let mut inner = self.inner.lock().unwrap();
            if let Some(token) = inner.running.get(&id) {
                token.cancel();
                tracing::info!(job_id = %id, "cancellation signalled to running job");
                return true;
            }
            match inner.pending.iter().position(|j| j.id == id) {
                Some(pos) => inner.pending.remove(pos),
                None => None,
            }
        };

        match removed {
            Some(job) => {
                tracing::info!(job_id = %id, "pending job removed from queue");
                let mut snap = ProgressSnapshot::queued(&job);
                snap.status = JobStatus::Cancelled;
                self.emit(snap).await;
                true
            }
            None => false,
        }
    }

    /// Number of jobs currently occupying a concurrency slot.
    pub fn active_count(&self) -> usize {
        self.inner.lock().unwrap().running.len()
    }

    /// Number of jobs still waiting for a slot.
    pub fn pending_count(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    /// Admit pending jobs while slots are free. Runs on every submission
    /// and every slot release, so a burst of completions drains the queue
    /// promptly.
    fn admit(&self) {
        loop {
            let (job, token) = {
                let mut inner = self.inner.lock().unwrap();
                if inner.running.len() >= self.max_concurrent {
                    return;
                }
                let Some(job) = inner.pending.pop_front() else {
                    return;
                };
                let token = CancellationToken::new();
                inner.running.insert(job.id, token.clone());
                (job, token)
            };

            tracing::debug!(job_id = %job.id, "admitting job");
            let queue = self.clone();
            tokio::spawn(async move {
                let id = job.id;
                executor::run_job(job, token, &queue.ctx, &queue.progress_tx).await;
                queue.release(id);
            });
        }
    }

    /// Reclaim a slot after an executor finished, then admit the next
    /// pending job.
    fn release(&self, id: JobId) {
        self.inner.lock().unwrap().running.remove(&id);
        self.admit();
    }

    async fn emit(&self, snap: ProgressSnapshot) {
        if self.progress_tx.send(snap).await.is_err() {
            tracing::debug!("progress receiver dropped");
        }
    }
}
