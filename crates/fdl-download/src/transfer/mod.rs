//! Transfer engine.
//!
//! One call to [`run_transfer`] drives one task from its partial-file offset
//! to end of body, then settles the task exactly once according to how the
//! stream ended. The job never touches the admission registry; the caller
//! owns slot bookkeeping.
//!
//! # Write path
//!
//! - projection: every chunk
//! - store: throttled by [`PersistThrottle`], plus one terminal write
//! - events: `Started`, throttled `Progress`, one terminal event

mod signal;

pub use signal::{StopReason, StopSignal};

use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use reqwest::StatusCode;
use reqwest::header::RANGE;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use fdl_core::download::bytes_per_second;
use fdl_core::{
    DownloadError, DownloadEvent, DownloadEventEmitterPort, DownloadManagerConfig, DownloadTask,
    IDLE_SPEED, PublicStoragePort, TaskId, TaskProgress, TaskRepositoryPort, TaskStatus,
    format_speed, progress_percent,
};

use crate::partial::PartialFileStore;
use crate::progress::{PersistThrottle, SpeedMeter};
use crate::projection::TaskProjection;
use crate::resolver::headers;

/// Everything a job needs, cloned per spawn.
#[derive(Clone)]
pub struct TransferDeps {
    pub repo: Arc<dyn TaskRepositoryPort>,
    pub client: reqwest::Client,
    pub storage: Arc<dyn PublicStoragePort>,
    pub partials: PartialFileStore,
    pub projection: TaskProjection,
    pub emitter: Arc<dyn DownloadEventEmitterPort>,
    pub config: DownloadManagerConfig,
}

/// How a job settled.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    Completed,
    Paused,
    Cancelled,
    /// Settled as `Paused` with the error text as the task message.
    Failed(DownloadError),
    /// Replaced by a newer job; nothing was written.
    Superseded,
}

enum StreamEnd {
    Eof,
    Stopped(StopReason),
}

/// Mutable counters of a running job.
struct Job {
    task: DownloadTask,
    downloaded: i64,
    total: i64,
}

impl Job {
    const fn id(&self) -> TaskId {
        self.task.id
    }

    fn percent(&self) -> f64 {
        progress_percent(self.downloaded, self.total)
    }

    /// Task record reflecting the job's counters, for the projection.
    fn view(&self, status: TaskStatus, speed: &str, message: &str) -> DownloadTask {
        let mut task = self.task.clone();
        task.status = status;
        task.downloaded_bytes = self.downloaded;
        task.total_bytes = self.total;
        task.refresh_progress();
        speed.clone_into(&mut task.speed);
        message.clone_into(&mut task.message);
        task
    }
}

/// Run one job for `id` until it completes, stops, or fails.
pub async fn run_transfer(id: TaskId, signal: &StopSignal, deps: &TransferDeps) -> TransferOutcome {
    let task = match deps.repo.get(id).await {
        Ok(Some(task)) => task,
        Ok(None) => return TransferOutcome::Failed(DownloadError::not_found(format!("task {id}"))),
        Err(e) => return TransferOutcome::Failed(e.into()),
    };

    let mut job = Job {
        downloaded: 0,
        total: task.total_bytes,
        task,
    };

    match stream_body(&mut job, signal, deps).await {
        Ok(StreamEnd::Eof) => complete(&job, deps).await,
        Ok(StreamEnd::Stopped(StopReason::Pause)) => pause(&mut job, deps).await,
        Ok(StreamEnd::Stopped(StopReason::Cancel)) => cancel(&mut job, deps).await,
        Ok(StreamEnd::Stopped(StopReason::Supersede)) => {
            tracing::debug!(task_id = %id, "job superseded");
            TransferOutcome::Superseded
        }
        Err(e) => fail(&job, e, deps).await,
    }
}

fn stopped(signal: &StopSignal) -> StreamEnd {
    StreamEnd::Stopped(signal.reason().unwrap_or(StopReason::Pause))
}

async fn stream_body(
    job: &mut Job,
    signal: &StopSignal,
    deps: &TransferDeps,
) -> Result<StreamEnd, DownloadError> {
    let id = job.id();
    deps.partials.ensure_dir()?;
    let path = deps.partials.path_for(&job.task.file_name);

    let mut offset = if job.task.supports_resume {
        deps.partials.len(&job.task.file_name).await?
    } else {
        0
    };
    if job.total > 0 && offset > job.total {
        tracing::warn!(task_id = %id, offset, total = job.total, "partial longer than remote file, restarting");
        offset = 0;
    }
    job.downloaded = offset;

    deps.repo
        .update_progress(
            &TaskProgress::new(id, TaskStatus::Active, offset, job.total).with_message(""),
        )
        .await?;
    deps.projection.upsert(job.view(TaskStatus::Active, IDLE_SPEED, ""));
    deps.emitter
        .emit(DownloadEvent::started(id, job.task.file_name.clone(), offset));
    tracing::info!(task_id = %id, file_name = %job.task.file_name, offset, "transfer started");

    if job.task.supports_resume && job.total > 0 && offset == job.total {
        tracing::debug!(task_id = %id, "partial already complete, skipping request");
        return Ok(StreamEnd::Eof);
    }

    let mut request = deps.client.get(&job.task.url);
    if offset > 0 {
        request = request.header(RANGE, format!("bytes={offset}-"));
    }

    let response = tokio::select! {
        biased;
        () = signal.requested() => return Ok(stopped(signal)),
        sent = request.send() => sent.map_err(|e| DownloadError::network(e.to_string()))?,
    };

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::network_with_status(
            format!("server returned {status}"),
            status.as_u16(),
        ));
    }

    let mut truncate = offset == 0;
    if offset > 0 {
        if status == StatusCode::PARTIAL_CONTENT {
            if let Some(range) = headers::content_range(response.headers()) {
                if range.start != offset {
                    return Err(DownloadError::network(format!(
                        "server resumed at byte {}, expected {offset}",
                        range.start
                    )));
                }
                if job.total <= 0 {
                    job.total = range.total.unwrap_or(0);
                }
            }
        } else {
            tracing::warn!(task_id = %id, offset, "range ignored by server, restarting from zero");
            offset = 0;
            job.downloaded = 0;
            truncate = true;
        }
    }
    if job.total <= 0 {
        let length = headers::content_length(response.headers());
        if length > 0 {
            job.total = offset + length;
        }
    }

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(!truncate)
        .truncate(truncate)
        .open(&path)
        .await?;

    let chunk_size = deps.config.chunk_size.max(1);
    let started = Instant::now();
    let mut meter = SpeedMeter::new(started);
    let mut throttle = PersistThrottle::new(
        deps.config.persist_interval,
        deps.config.persist_percent_step,
        started,
        job.downloaded,
        job.percent(),
    );
    let mut body = response.bytes_stream();

    loop {
        let next = tokio::select! {
            biased;
            () = signal.requested() => {
                file.flush().await?;
                return Ok(stopped(signal));
            }
            next = body.next() => next,
        };
        let Some(bytes) = next else { break };
        let bytes = bytes.map_err(|e| DownloadError::network(e.to_string()))?;

        for piece in bytes.chunks(chunk_size) {
            if signal.is_requested() {
                file.flush().await?;
                return Ok(stopped(signal));
            }
            file.write_all(piece).await?;
            advance(job, piece.len(), &mut meter, &mut throttle, deps).await;
        }
    }

    file.flush().await?;
    file.sync_all().await?;

    if job.total > 0 && job.downloaded < job.total {
        return Err(DownloadError::network(format!(
            "connection closed after {} of {} bytes",
            job.downloaded, job.total
        )));
    }
    if job.total <= 0 {
        job.total = job.downloaded;
    }
    Ok(StreamEnd::Eof)
}

async fn advance(
    job: &mut Job,
    written: usize,
    meter: &mut SpeedMeter,
    throttle: &mut PersistThrottle,
    deps: &TransferDeps,
) {
    let now = Instant::now();
    job.downloaded = job
        .downloaded
        .saturating_add(i64::try_from(written).unwrap_or(i64::MAX));
    if job.total > 0 && job.downloaded > job.total {
        job.total = job.downloaded;
    }

    let tick_speed = format_speed(meter.sample(written, now));
    deps.projection
        .record_progress(job.id(), job.downloaded, job.total, &tick_speed);

    let percent = job.percent();
    if !throttle.should_persist(now, percent) {
        return;
    }

    let (bytes, elapsed) = throttle.since_last(now, job.downloaded);
    let speed = format_speed(bytes_per_second(bytes, elapsed));
    let update = TaskProgress::new(job.id(), TaskStatus::Active, job.downloaded, job.total)
        .with_speed(speed.clone());
    if let Err(e) = deps.repo.update_progress(&update).await {
        tracing::warn!(task_id = %job.id(), error = %e, "progress write failed");
    }
    throttle.mark(now, job.downloaded, percent);

    deps.emitter.emit(DownloadEvent::progress(
        job.id(),
        job.task.file_name.clone(),
        job.downloaded,
        job.total,
        percent,
        speed,
    ));
}

/// Write a terminal state, retrying once on a store error.
async fn persist_final(deps: &TransferDeps, update: &TaskProgress) {
    for attempt in 1..=2 {
        match deps.repo.update_progress(update).await {
            Ok(true) => return,
            Ok(false) => {
                tracing::warn!(task_id = %update.id, status = %update.status, "task row gone, final state dropped");
                return;
            }
            Err(e) if attempt == 1 => {
                tracing::warn!(task_id = %update.id, error = %e, "final write failed, retrying");
            }
            Err(e) => {
                tracing::error!(task_id = %update.id, status = %update.status, error = %e, "final write failed");
            }
        }
    }
}

async fn complete(job: &Job, deps: &TransferDeps) -> TransferOutcome {
    let id = job.id();
    let path = deps.partials.path_for(&job.task.file_name);

    if let Err(e) = deps
        .storage
        .promote(&path, &job.task.file_name, &job.task.mime_type)
        .await
    {
        tracing::warn!(task_id = %id, error = %e, "promotion failed");
        let message = e.to_string();
        let capped = job.percent().min(99.0);
        persist_final(
            deps,
            &TaskProgress::new(id, TaskStatus::Paused, job.downloaded, job.total)
                .with_progress(capped)
                .with_message(message.clone()),
        )
        .await;
        let mut view = job.view(TaskStatus::Paused, IDLE_SPEED, &message);
        view.progress = capped;
        deps.projection.upsert(view);
        deps.emitter
            .emit(DownloadEvent::paused(id, job.downloaded, Some(message)));
        return TransferOutcome::Failed(e);
    }

    persist_final(
        deps,
        &TaskProgress::new(id, TaskStatus::Completed, job.total, job.total)
            .with_progress(100.0)
            .with_message(""),
    )
    .await;
    if let Err(e) = deps.partials.remove(&job.task.file_name).await {
        tracing::warn!(task_id = %id, error = %e, "failed to remove partial after promotion");
    }

    let mut view = job.view(TaskStatus::Completed, IDLE_SPEED, "");
    view.downloaded_bytes = job.total;
    view.progress = 100.0;
    deps.projection.upsert(view);
    deps.emitter
        .emit(DownloadEvent::completed(id, job.task.file_name.clone()));
    tracing::info!(task_id = %id, file_name = %job.task.file_name, bytes = job.total, "transfer completed");
    TransferOutcome::Completed
}

async fn pause(job: &mut Job, deps: &TransferDeps) -> TransferOutcome {
    let id = job.id();
    if !job.task.supports_resume {
        // Bytes cannot be continued later; drop them now.
        if let Err(e) = deps.partials.remove(&job.task.file_name).await {
            tracing::warn!(task_id = %id, error = %e, "failed to remove partial");
        }
        job.downloaded = 0;
    }

    persist_final(
        deps,
        &TaskProgress::new(id, TaskStatus::Paused, job.downloaded, job.total).with_message(""),
    )
    .await;
    deps.projection
        .upsert(job.view(TaskStatus::Paused, IDLE_SPEED, ""));
    deps.emitter
        .emit(DownloadEvent::paused(id, job.downloaded, None));
    tracing::info!(task_id = %id, downloaded = job.downloaded, "transfer paused");
    TransferOutcome::Paused
}

async fn cancel(job: &mut Job, deps: &TransferDeps) -> TransferOutcome {
    let id = job.id();
    if let Err(e) = deps.partials.remove(&job.task.file_name).await {
        tracing::warn!(task_id = %id, error = %e, "failed to remove partial");
    }
    job.downloaded = 0;

    persist_final(
        deps,
        &TaskProgress::new(id, TaskStatus::Cancelled, 0, job.total).with_message(""),
    )
    .await;
    deps.projection.remove(id);
    deps.emitter.emit(DownloadEvent::cancelled(id));
    tracing::info!(task_id = %id, "transfer cancelled");
    TransferOutcome::Cancelled
}

async fn fail(job: &Job, error: DownloadError, deps: &TransferDeps) -> TransferOutcome {
    let id = job.id();
    let message = error.to_string();
    tracing::warn!(task_id = %id, downloaded = job.downloaded, error = %message, "transfer failed");

    persist_final(
        deps,
        &TaskProgress::new(id, TaskStatus::Paused, job.downloaded, job.total)
            .with_message(message.clone()),
    )
    .await;
    deps.projection
        .upsert(job.view(TaskStatus::Paused, IDLE_SPEED, &message));
    deps.emitter
        .emit(DownloadEvent::paused(id, job.downloaded, Some(message)));
    TransferOutcome::Failed(error)
}
