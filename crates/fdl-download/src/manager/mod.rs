//! Download manager implementation.
//!
//! This module provides the concrete implementation of `DownloadManagerPort`.
//! It wires the resolver, the admission controller, and the projection
//! together and owns the store listener task.
//!
//! # Architecture
//!
//! - **Resolver**: probe + create/reuse the persisted task
//! - **Admission**: slot accounting, job registry, queue promotion
//! - **Transfer**: one job per running task, settles it exactly once
//! - **Projection**: `watch` snapshot fed by jobs and by the store's change feed

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use fdl_core::{
    DownloadError, DownloadEvent, DownloadEventEmitterPort, DownloadManagerConfig,
    DownloadManagerPort, DownloadTask, ProjectionSnapshot, PublicStoragePort, TaskId,
    TaskRepositoryPort, TaskStatus,
};

use crate::admission::{Admission, AdmissionController};
use crate::http::build_client;
use crate::partial::PartialFileStore;
use crate::projection::TaskProjection;
use crate::reconcile::{ReconcileReport, StartupReconciler};
use crate::resolver::MetadataResolver;
use crate::storage::DownloadsDirStorage;
use crate::transfer::TransferDeps;

/// Dependencies for building a download manager.
pub struct DownloadManagerDeps {
    /// Durable task store.
    pub repo: Arc<dyn TaskRepositoryPort>,
    /// Public storage; defaults to [`DownloadsDirStorage`] over `config.downloads_dir`.
    pub storage: Option<Arc<dyn PublicStoragePort>>,
    /// Event sink.
    pub emitter: Arc<dyn DownloadEventEmitterPort>,
    /// Configuration.
    pub config: DownloadManagerConfig,
}

/// Build a download manager from its dependencies.
///
/// Reconciles ghost `Active` tasks and loads the projection before returning,
/// so no job can be admitted against a stale store. Queued tasks are not
/// started here; call [`DownloadManagerImpl::start_queued`] for that.
pub async fn build_download_manager(
    deps: DownloadManagerDeps,
) -> Result<DownloadManagerImpl, DownloadError> {
    let DownloadManagerDeps {
        repo,
        storage,
        emitter,
        config,
    } = deps;

    let client = build_client(&config)?;
    let report = StartupReconciler::new(Arc::clone(&repo)).reconcile().await?;

    let partials = PartialFileStore::new(&config.cache_dir);
    partials.ensure_dir()?;
    let storage = storage.unwrap_or_else(|| {
        Arc::new(DownloadsDirStorage::new(&config.downloads_dir)) as Arc<dyn PublicStoragePort>
    });

    let projection = TaskProjection::new();
    projection.load(repo.as_ref()).await?;
    let listener = projection.spawn_store_listener(Arc::clone(&repo));

    let resolver = MetadataResolver::new(client.clone(), Arc::clone(&repo));
    let admission = AdmissionController::new(TransferDeps {
        repo: Arc::clone(&repo),
        client,
        storage: Arc::clone(&storage),
        partials: partials.clone(),
        projection: projection.clone(),
        emitter: Arc::clone(&emitter),
        config,
    });

    tracing::debug!(
        capacity = admission.capacity(),
        reconciled = report.paused.len(),
        "download manager ready"
    );

    Ok(DownloadManagerImpl {
        repo,
        storage,
        partials,
        emitter,
        projection,
        resolver,
        admission,
        reconciled: report,
        listener,
    })
}

/// Concrete implementation of the download manager.
///
/// Adapters should typically hold `Arc<dyn DownloadManagerPort>` instead of
/// depending on this type directly.
pub struct DownloadManagerImpl {
    repo: Arc<dyn TaskRepositoryPort>,
    storage: Arc<dyn PublicStoragePort>,
    partials: PartialFileStore,
    emitter: Arc<dyn DownloadEventEmitterPort>,
    projection: TaskProjection,
    resolver: MetadataResolver,
    admission: Arc<AdmissionController>,
    reconciled: ReconcileReport,
    listener: JoinHandle<()>,
}

impl DownloadManagerImpl {
    /// Tasks the startup reconciler moved from `Active` to `Paused`.
    pub fn reconciled(&self) -> &ReconcileReport {
        &self.reconciled
    }

    /// Admit persisted `Queued` tasks until every slot is taken.
    pub async fn start_queued(&self) -> Result<usize, DownloadError> {
        self.admission.start_queued().await
    }

    /// Clone of the current projection.
    pub fn snapshot(&self) -> ProjectionSnapshot {
        self.projection.snapshot()
    }

    fn log_admission(id: TaskId, admission: Admission) {
        match admission {
            Admission::Started => tracing::info!(task_id = %id, "task admitted"),
            Admission::Queued => tracing::info!(task_id = %id, "task waiting for a slot"),
        }
    }

    async fn load(&self, id: TaskId) -> Result<DownloadTask, DownloadError> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| DownloadError::not_found(format!("task {id}")))
    }
}

impl Drop for DownloadManagerImpl {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[async_trait]
impl DownloadManagerPort for DownloadManagerImpl {
    async fn resolve_and_start(&self, url: &str) -> Result<TaskId, DownloadError> {
        self.projection.set_loading(true);
        let resolved = self.resolver.resolve(url).await;
        self.projection.set_loading(false);

        let id = resolved?;
        // A job already running for this task is replaced by a fresh one.
        let admission = self.admission.admit(id).await?;
        Self::log_admission(id, admission);
        Ok(id)
    }

    async fn pause(&self, id: TaskId) -> Result<(), DownloadError> {
        self.admission.pause(id).await
    }

    async fn resume(&self, id: TaskId) -> Result<(), DownloadError> {
        let task = self.load(id).await?;
        if task.status.is_terminal() {
            return Err(DownloadError::invalid_state(format!(
                "task {id} is {} and cannot be resumed",
                task.status
            )));
        }
        let admission = self.admission.resume(id).await?;
        Self::log_admission(id, admission);
        Ok(())
    }

    async fn cancel(&self, id: TaskId) -> Result<(), DownloadError> {
        self.admission.cancel(id).await
    }

    async fn delete(&self, id: TaskId) -> Result<(), DownloadError> {
        let task = self.load(id).await?;
        if self.admission.has_job(id).await {
            return Err(DownloadError::invalid_state(format!("task {id} is running")));
        }

        match task.status {
            TaskStatus::Completed => {
                if !self.storage.remove(&task.file_name, &task.mime_type).await? {
                    tracing::debug!(task_id = %id, "promoted file already gone");
                }
            }
            TaskStatus::Cancelled => {
                self.partials.remove(&task.file_name).await?;
            }
            status => {
                return Err(DownloadError::invalid_state(format!(
                    "task {id} is {status}; cancel it before deleting"
                )));
            }
        }

        self.repo.delete(id).await?;
        self.projection.remove(id);
        self.emitter.emit(DownloadEvent::removed(id));
        tracing::info!(task_id = %id, file_name = %task.file_name, "task deleted");
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<ProjectionSnapshot> {
        self.projection.subscribe()
    }

    async fn running_count(&self) -> usize {
        self.admission.running_count().await
    }

    async fn shutdown(&self) {
        self.admission.shutdown().await;
    }
}
