//! Admission controller.
//!
//! Bounds concurrently running transfers to the configured capacity. The job
//! table below is the only in-memory registry of running jobs; nothing
//! outside this module can start or stop one.
//!
//! # Concurrency Model
//!
//! - One `tokio::sync::Mutex` guards the job table; the `Active`/`Queued`
//!   write for an admission happens under it, so the capacity check and the
//!   status change are one step
//! - A job keeps its entry until it has settled, so a stopping job still
//!   counts against capacity
//! - Every entry carries a `watch` that flips once the job has settled and
//!   left the table; stop, supersede and resume all wait on it
//! - Lease numbers stop a replaced job from releasing its successor's slot
//! - Every release makes exactly one promotion attempt for the oldest
//!   `Queued` task

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures_util::FutureExt;
use futures_util::future::join_all;
use tokio::sync::{Mutex, watch};

use fdl_core::{
    DownloadError, DownloadEvent, DownloadTask, IDLE_SPEED, TaskId, TaskProgress, TaskStatus,
};

use crate::transfer::{StopReason, StopSignal, TransferDeps, TransferOutcome, run_transfer};

/// Result of an admission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A slot was free and a job is running.
    Started,
    /// No slot was free; the task is persisted as `Queued`.
    Queued,
}

/// What an admission does about a job already registered for the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Existing {
    /// Stop a running job and start a fresh one.
    Supersede,
    /// Leave a running job alone; wait out one that is stopping, then admit.
    Keep,
    /// Promotion of a `Queued` task; never waits.
    Promote,
}

/// Message left on a task whose job panicked.
const ABORTED_MESSAGE: &str = "transfer aborted unexpectedly";

/// Lease ID for tracking a job's ownership of its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct LeaseId(u64);

/// State for a running job.
struct ActiveJob {
    lease: LeaseId,
    signal: StopSignal,
    /// Becomes `true` once the job has settled and released its entry.
    done: watch::Receiver<bool>,
}

/// Wait until a job has settled.
async fn settled(mut done: watch::Receiver<bool>) {
    if done.wait_for(|finished| *finished).await.is_err() {
        // The driver was dropped without finishing (runtime shutdown).
        tracing::debug!("job driver dropped before settling");
    }
}

/// Starts, queues, stops, and promotes transfer jobs.
pub struct AdmissionController {
    capacity: usize,
    jobs: Mutex<HashMap<TaskId, ActiveJob>>,
    lease_counter: AtomicU64,
    shutting_down: AtomicBool,
    deps: TransferDeps,
}

impl AdmissionController {
    /// Create a controller with capacity `deps.config.max_concurrent`.
    pub fn new(deps: TransferDeps) -> Arc<Self> {
        let capacity = usize::try_from(deps.config.max_concurrent.max(1)).unwrap_or(1);
        Arc::new(Self {
            capacity,
            jobs: Mutex::new(HashMap::new()),
            lease_counter: AtomicU64::new(0),
            shutting_down: AtomicBool::new(false),
            deps,
        })
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Run `id` now if a slot is free, otherwise queue it.
    ///
    /// A job already registered for `id` is superseded and awaited first.
    pub async fn admit(self: &Arc<Self>, id: TaskId) -> Result<Admission, DownloadError> {
        self.admit_inner(id, Existing::Supersede).await
    }

    /// Like [`admit`](Self::admit), but a running job is kept as is.
    ///
    /// A job that is already stopping is awaited and the task admitted
    /// afresh, so a resume racing a pause is never dropped.
    pub async fn resume(self: &Arc<Self>, id: TaskId) -> Result<Admission, DownloadError> {
        self.admit_inner(id, Existing::Keep).await
    }

    async fn admit_inner(
        self: &Arc<Self>,
        id: TaskId,
        existing: Existing,
    ) -> Result<Admission, DownloadError> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(DownloadError::invalid_state("download manager is shutting down"));
        }

        if existing != Existing::Promote {
            let pending = {
                let jobs = self.jobs.lock().await;
                match jobs.get(&id) {
                    None => None,
                    Some(job) if existing == Existing::Keep && !job.signal.is_requested() => {
                        return Ok(Admission::Started);
                    }
                    Some(job) => {
                        if !job.signal.is_requested() {
                            tracing::debug!(task_id = %id, lease = job.lease.0, "superseding running job");
                            job.signal.request(StopReason::Supersede);
                        }
                        Some(job.done.clone())
                    }
                }
            };
            if let Some(done) = pending {
                settled(done).await;
            }
        }

        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&id) {
            return Ok(Admission::Started);
        }

        let task = self
            .deps
            .repo
            .get(id)
            .await?
            .ok_or_else(|| DownloadError::not_found(format!("task {id}")))?;
        if task.status.is_terminal() {
            return Err(DownloadError::invalid_state(format!(
                "task {id} is {}",
                task.status
            )));
        }
        if existing == Existing::Promote && task.status != TaskStatus::Queued {
            // Paused or started by someone else since it was picked.
            return Ok(Admission::Queued);
        }

        if jobs.len() >= self.capacity {
            self.mark(&task, TaskStatus::Queued).await?;
            self.deps.emitter.emit(DownloadEvent::queued(id));
            tracing::info!(task_id = %id, running = jobs.len(), "task queued");
            return Ok(Admission::Queued);
        }

        self.mark(&task, TaskStatus::Active).await?;
        let lease = LeaseId(self.lease_counter.fetch_add(1, Ordering::Relaxed));
        let signal = StopSignal::new();
        let (done_tx, done) = watch::channel(false);
        tokio::spawn(Arc::clone(self).drive(id, lease, signal.clone(), done_tx));
        jobs.insert(
            id,
            ActiveJob {
                lease,
                signal,
                done,
            },
        );
        tracing::debug!(task_id = %id, lease = lease.0, running = jobs.len(), "job admitted");
        Ok(Admission::Started)
    }

    /// Persist a status change for a task without a job and mirror it.
    async fn mark(&self, task: &DownloadTask, status: TaskStatus) -> Result<(), DownloadError> {
        ensure_transition(task, status)?;
        let update = TaskProgress::new(task.id, status, task.downloaded_bytes, task.total_bytes);
        self.deps.repo.update_progress(&update).await?;

        let mut view = task.clone();
        view.status = status;
        view.refresh_progress();
        self.deps.projection.upsert(view);
        Ok(())
    }

    async fn drive(
        self: Arc<Self>,
        id: TaskId,
        lease: LeaseId,
        signal: StopSignal,
        done: watch::Sender<bool>,
    ) {
        let outcome = AssertUnwindSafe(run_transfer(id, &signal, &self.deps))
            .catch_unwind()
            .await;
        let promote = match outcome {
            Ok(outcome) => {
                tracing::debug!(task_id = %id, ?outcome, "job finished");
                outcome != TransferOutcome::Superseded
            }
            Err(_) => {
                tracing::error!(task_id = %id, "transfer job panicked");
                self.settle_aborted(id).await;
                true
            }
        };

        let released = self.release(id, lease).await;
        done.send_replace(true);
        if released && promote {
            self.promote_next().await;
        }
    }

    /// Park a task whose job died without settling it.
    async fn settle_aborted(&self, id: TaskId) {
        let task = match self.deps.repo.get(id).await {
            Ok(Some(task)) if task.status == TaskStatus::Active => task,
            Ok(_) => return,
            Err(e) => {
                tracing::warn!(task_id = %id, error = %e, "failed to read aborted task");
                return;
            }
        };
        let update =
            TaskProgress::new(id, TaskStatus::Paused, task.downloaded_bytes, task.total_bytes)
                .with_message(ABORTED_MESSAGE);
        if let Err(e) = self.deps.repo.update_progress(&update).await {
            tracing::warn!(task_id = %id, error = %e, "failed to park aborted task");
            return;
        }

        let mut view = task;
        view.status = TaskStatus::Paused;
        IDLE_SPEED.clone_into(&mut view.speed);
        ABORTED_MESSAGE.clone_into(&mut view.message);
        self.deps.projection.upsert(view);
        self.deps.emitter.emit(DownloadEvent::paused(
            id,
            update.downloaded_bytes,
            Some(ABORTED_MESSAGE.to_string()),
        ));
    }

    /// Drop the job entry if it still belongs to `lease`.
    async fn release(&self, id: TaskId, lease: LeaseId) -> bool {
        let mut jobs = self.jobs.lock().await;
        if jobs.get(&id).is_some_and(|job| job.lease == lease) {
            jobs.remove(&id);
            true
        } else {
            tracing::debug!(task_id = %id, "ignoring stale release (lease mismatch)");
            false
        }
    }

    /// One best-effort promotion of the oldest queued task.
    ///
    /// Boxed because it re-enters `admit_inner`, whose spawned job calls
    /// back here.
    fn promote_next(self: Arc<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            if self.shutting_down.load(Ordering::Acquire) {
                return;
            }
            match self.deps.repo.next_queued().await {
                Ok(Some(task)) => match self.admit_inner(task.id, Existing::Promote).await {
                    Ok(Admission::Started) => {
                        tracing::info!(task_id = %task.id, "queued task promoted");
                    }
                    Ok(Admission::Queued) => {}
                    Err(e) => tracing::warn!(task_id = %task.id, error = %e, "promotion failed"),
                },
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "failed to read queued tasks"),
            }
        })
    }

    /// Start queued tasks until the slots are full.
    pub async fn start_queued(self: &Arc<Self>) -> Result<usize, DownloadError> {
        let mut started = 0;
        while self.running_count().await < self.capacity {
            let Some(task) = self.deps.repo.next_queued().await? else {
                break;
            };
            if self.admit_inner(task.id, Existing::Promote).await? != Admission::Started {
                break;
            }
            started += 1;
        }
        Ok(started)
    }

    /// Stop `id` keeping its bytes. Waits for a running job to settle.
    pub async fn pause(&self, id: TaskId) -> Result<(), DownloadError> {
        self.stop(id, StopReason::Pause).await
    }

    /// Stop `id` and discard its bytes. Waits for a running job to settle.
    pub async fn cancel(&self, id: TaskId) -> Result<(), DownloadError> {
        self.stop(id, StopReason::Cancel).await
    }

    async fn stop(&self, id: TaskId, reason: StopReason) -> Result<(), DownloadError> {
        let jobs = self.jobs.lock().await;
        if let Some(job) = jobs.get(&id) {
            job.signal.request(reason);
            let done = job.done.clone();
            drop(jobs);
            settled(done).await;
            return Ok(());
        }

        let task = self
            .deps
            .repo
            .get(id)
            .await?
            .ok_or_else(|| DownloadError::not_found(format!("task {id}")))?;

        let target = match reason {
            StopReason::Pause => TaskStatus::Paused,
            StopReason::Cancel | StopReason::Supersede => TaskStatus::Cancelled,
        };
        if task.status == target {
            return Ok(());
        }
        ensure_transition(&task, target)?;

        if target == TaskStatus::Paused {
            self.mark(&task, TaskStatus::Paused).await?;
            drop(jobs);
            self.deps
                .emitter
                .emit(DownloadEvent::paused(id, task.downloaded_bytes, None));
            tracing::info!(task_id = %id, "idle task paused");
            return Ok(());
        }

        if let Err(e) = self.deps.partials.remove(&task.file_name).await {
            tracing::warn!(task_id = %id, error = %e, "failed to remove partial");
        }
        self.deps
            .repo
            .update_progress(&TaskProgress::new(
                id,
                TaskStatus::Cancelled,
                0,
                task.total_bytes,
            ))
            .await?;
        drop(jobs);
        self.deps.projection.remove(id);
        self.deps.emitter.emit(DownloadEvent::cancelled(id));
        tracing::info!(task_id = %id, "idle task cancelled");
        Ok(())
    }

    /// Whether a job is registered for `id`.
    pub async fn has_job(&self, id: TaskId) -> bool {
        self.jobs.lock().await.contains_key(&id)
    }

    /// Number of registered jobs.
    pub async fn running_count(&self) -> usize {
        self.jobs.lock().await.len()
    }

    /// Pause every running job, stop promotions, and wait for all jobs.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        let pending: Vec<watch::Receiver<bool>> = {
            let jobs = self.jobs.lock().await;
            jobs.values()
                .map(|job| {
                    job.signal.request(StopReason::Pause);
                    job.done.clone()
                })
                .collect()
        };
        tracing::info!(count = pending.len(), "pausing running jobs for shutdown");
        join_all(pending.into_iter().map(settled)).await;
    }
}

fn ensure_transition(task: &DownloadTask, next: TaskStatus) -> Result<(), DownloadError> {
    if task.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(DownloadError::invalid_state(format!(
            "task {} is {} and cannot become {next}",
            task.id, task.status
        )))
    }
}
