//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter:
//! - Task store (via fdl-db)
//! - Download manager (via fdl-download)
//! - Notification bridge to the terminal
//!
//! Command handlers receive the fully-composed `CliContext`.

use std::sync::Arc;

use anyhow::Result;
use indicatif::MultiProgress;

use fdl_core::{
    ChannelDownloadEmitter, DownloadManagerConfig, ResolvedPaths, TaskRepositoryPort,
    ensure_directory,
};
use fdl_db::CoreFactory;
use fdl_download::{
    DownloadManagerDeps, DownloadManagerImpl, NotificationBridge, build_download_manager,
};

use crate::notifier::TerminalNotifier;
use crate::parser::Cli;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Resolved storage locations.
    pub paths: ResolvedPaths,
    /// Maximum concurrent transfers.
    pub max_concurrent: u32,
}

impl CliConfig {
    /// Resolve paths from flags, environment, and platform defaults.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let paths = ResolvedPaths::resolve(cli.data_dir.as_deref(), cli.downloads_dir.as_deref())?;
        Ok(Self {
            paths,
            max_concurrent: cli
                .max_concurrent
                .unwrap_or_else(|| DownloadManagerConfig::default().max_concurrent),
        })
    }

    /// Download manager configuration for these paths.
    pub fn manager_config(&self) -> DownloadManagerConfig {
        DownloadManagerConfig::new(
            self.paths.cache_dir.clone(),
            self.paths.downloads_dir.clone(),
        )
        .with_max_concurrent(self.max_concurrent)
    }
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    /// Download manager.
    pub downloads: Arc<DownloadManagerImpl>,
    /// Read access to the task store for listings.
    pub tasks: Arc<dyn TaskRepositoryPort>,
    /// Shared terminal area for bars and notifications.
    pub progress: MultiProgress,
    /// Resolved paths.
    pub paths: ResolvedPaths,
}

impl CliContext {
    /// Access the download manager.
    pub const fn downloads(&self) -> &Arc<DownloadManagerImpl> {
        &self.downloads
    }

    /// Access the task store.
    pub const fn tasks(&self) -> &Arc<dyn TaskRepositoryPort> {
        &self.tasks
    }
}

/// Bootstrap the CLI application.
///
/// 1. Creates the data root and opens the task store
/// 2. Starts the notification bridge
/// 3. Builds the download manager (which reconciles stale tasks)
pub async fn bootstrap(config: CliConfig) -> Result<CliContext> {
    ensure_directory(&config.paths.data_root)?;
    let tasks = CoreFactory::open_task_store(&config.paths.database_path).await?;

    let progress = MultiProgress::new();
    let (emitter, events) = ChannelDownloadEmitter::new();
    NotificationBridge::spawn(events, Arc::new(TerminalNotifier::new(progress.clone())));

    let manager = build_download_manager(DownloadManagerDeps {
        repo: Arc::clone(&tasks),
        storage: None,
        emitter: Arc::new(emitter),
        config: config.manager_config(),
    })
    .await?;

    for id in &manager.reconciled().paused {
        tracing::info!(task_id = %id, "interrupted download marked paused");
    }

    Ok(CliContext {
        downloads: Arc::new(manager),
        tasks,
        progress,
        paths: config.paths,
    })
}
