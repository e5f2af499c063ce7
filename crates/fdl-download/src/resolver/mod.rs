//! Metadata resolver.
//!
//! Probes a URL with `HEAD`, derives the task's descriptive fields, and
//! creates or reuses the persisted task. No body bytes are read and no file
//! is created here.

pub mod headers;

use std::sync::Arc;

use tokio::sync::Mutex;

use fdl_core::{
    DownloadError, DownloadTask, RemoteFileMeta, RepositoryError, TaskId, TaskRepositoryPort,
    TaskStatus,
};

/// Resolves URLs into persisted tasks.
pub struct MetadataResolver {
    client: reqwest::Client,
    repo: Arc<dyn TaskRepositoryPort>,
    /// Serializes lookup-then-insert so concurrent resolves of one URL share a row.
    register: Mutex<()>,
}

impl MetadataResolver {
    /// Create a resolver over a configured HTTP client.
    pub fn new(client: reqwest::Client, repo: Arc<dyn TaskRepositoryPort>) -> Self {
        Self {
            client,
            repo,
            register: Mutex::new(()),
        }
    }

    /// Issue the probe and parse its headers.
    pub async fn probe(&self, url: &str) -> Result<RemoteFileMeta, DownloadError> {
        let parsed = reqwest::Url::parse(url.trim())
            .map_err(|e| DownloadError::other(format!("Invalid URL '{url}': {e}")))?;

        let response = self
            .client
            .head(parsed.clone())
            .send()
            .await
            .map_err(|e| DownloadError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::network_with_status(
                format!("probe of {parsed} returned {status}"),
                status.as_u16(),
            ));
        }

        let hdrs = response.headers();
        let file_name = headers::file_name_from_disposition(hdrs)
            .or_else(|| headers::file_name_from_url(response.url()))
            .or_else(|| headers::file_name_from_url(&parsed))
            .unwrap_or_else(|| headers::FALLBACK_FILE_NAME.to_string());

        let meta = RemoteFileMeta {
            url: parsed.to_string(),
            file_name,
            total_bytes: headers::content_length(hdrs),
            mime_type: headers::mime_type(hdrs),
            supports_resume: headers::supports_resume(status, hdrs),
        };

        tracing::debug!(
            url = %meta.url,
            file_name = %meta.file_name,
            total_bytes = meta.total_bytes,
            mime_type = %meta.mime_type,
            supports_resume = meta.supports_resume,
            "probed remote file"
        );
        Ok(meta)
    }

    /// Probe `url` and return the id of a new or reused task.
    ///
    /// Fails with `AlreadyDownloaded` when the same `(file_name, mime_type)`
    /// already completed. A cancelled task with that key is reopened as
    /// `Paused` with fresh metadata.
    pub async fn resolve(&self, url: &str) -> Result<TaskId, DownloadError> {
        let meta = self.probe(url).await?;

        let _registering = self.register.lock().await;
        if let Some(existing) = self
            .repo
            .find_by_file(&meta.file_name, &meta.mime_type)
            .await?
        {
            return self.reuse(existing, &meta).await;
        }

        let task = DownloadTask::from_meta(&meta);
        match self.repo.insert_or_update(&task).await {
            Ok(id) => {
                tracing::info!(task_id = %id, file_name = %meta.file_name, "task created");
                Ok(id)
            }
            Err(RepositoryError::Constraint(_)) => {
                // Another writer inserted the same key first.
                let existing = self
                    .repo
                    .find_by_file(&meta.file_name, &meta.mime_type)
                    .await?
                    .ok_or_else(|| DownloadError::storage("task vanished after conflict"))?;
                self.reuse(existing, &meta).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn reuse(
        &self,
        existing: DownloadTask,
        meta: &RemoteFileMeta,
    ) -> Result<TaskId, DownloadError> {
        match existing.status {
            TaskStatus::Completed => Err(DownloadError::already_downloaded(existing.file_name)),
            TaskStatus::Cancelled => {
                let mut reopened = DownloadTask::from_meta(meta);
                reopened.id = existing.id;
                reopened.created_at = existing.created_at;
                let id = self.repo.insert_or_update(&reopened).await?;
                tracing::info!(task_id = %id, "cancelled task reopened");
                Ok(id)
            }
            _ => {
                tracing::debug!(task_id = %existing.id, status = %existing.status, "reusing task");
                Ok(existing.id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdl_core::{DEFAULT_MIME_TYPE, TaskProgress};
    use fdl_db::TestDb;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn resolver() -> (MetadataResolver, Arc<dyn TaskRepositoryPort>) {
        let db = TestDb::new().await.unwrap();
        let repo: Arc<dyn TaskRepositoryPort> = db.task_repository();
        (
            MetadataResolver::new(reqwest::Client::new(), Arc::clone(&repo)),
            repo,
        )
    }

    async fn mount_head(server: &MockServer, route: &str, template: ResponseTemplate) {
        Mock::given(method("HEAD"))
            .and(path(route))
            .respond_with(template)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_probe_reads_headers() {
        let server = MockServer::start().await;
        mount_head(
            &server,
            "/files/data.bin",
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0u8; 1000])
                .insert_header("Content-Length", "1000")
                .insert_header("Accept-Ranges", "bytes")
                .insert_header("Content-Type", "application/zip")
                .insert_header("Content-Disposition", "attachment; filename=\"archive.zip\""),
        )
        .await;

        let (resolver, _) = resolver().await;
        let meta = resolver
            .probe(&format!("{}/files/data.bin", server.uri()))
            .await
            .unwrap();

        assert_eq!(meta.file_name, "archive.zip");
        assert_eq!(meta.total_bytes, 1000);
        assert_eq!(meta.mime_type, "application/zip");
        assert!(meta.supports_resume);
    }

    #[tokio::test]
    async fn test_probe_falls_back_to_url_name_and_generic_type() {
        let server = MockServer::start().await;
        mount_head(&server, "/pub/image.iso", ResponseTemplate::new(200)).await;

        let (resolver, _) = resolver().await;
        let meta = resolver
            .probe(&format!("{}/pub/image.iso", server.uri()))
            .await
            .unwrap();

        assert_eq!(meta.file_name, "image.iso");
        assert_eq!(meta.total_bytes, 0);
        assert_eq!(meta.mime_type, DEFAULT_MIME_TYPE);
        assert!(!meta.supports_resume);
    }

    #[tokio::test]
    async fn test_non_success_probe_is_typed_error() {
        let server = MockServer::start().await;
        mount_head(&server, "/missing", ResponseTemplate::new(404)).await;

        let (resolver, repo) = resolver().await;
        let err = resolver
            .resolve(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DownloadError::Network {
                status_code: Some(404),
                ..
            }
        ));
        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let (resolver, _) = resolver().await;
        assert!(matches!(
            resolver.resolve("not a url").await,
            Err(DownloadError::Other { .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_creates_paused_task_once() {
        let server = MockServer::start().await;
        mount_head(&server, "/a.bin", ResponseTemplate::new(200)).await;
        let url = format!("{}/a.bin", server.uri());

        let (resolver, repo) = resolver().await;
        let resolver = Arc::new(resolver);

        let (first, second) = tokio::join!(resolver.resolve(&url), resolver.resolve(&url));
        assert_eq!(first.unwrap(), second.unwrap());

        let tasks = repo.list_all().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::Paused);
        assert_eq!(tasks[0].downloaded_bytes, 0);
    }

    #[tokio::test]
    async fn test_completed_task_is_already_downloaded() {
        let server = MockServer::start().await;
        mount_head(&server, "/done.bin", ResponseTemplate::new(200)).await;
        let url = format!("{}/done.bin", server.uri());

        let (resolver, repo) = resolver().await;
        let id = resolver.resolve(&url).await.unwrap();
        repo.update_progress(&TaskProgress::new(id, TaskStatus::Completed, 0, 0))
            .await
            .unwrap();

        let err = resolver.resolve(&url).await.unwrap_err();
        assert_eq!(err, DownloadError::already_downloaded("done.bin"));
    }

    #[tokio::test]
    async fn test_cancelled_task_is_reopened() {
        let server = MockServer::start().await;
        mount_head(&server, "/again.bin", ResponseTemplate::new(200)).await;
        let url = format!("{}/again.bin", server.uri());

        let (resolver, repo) = resolver().await;
        let id = resolver.resolve(&url).await.unwrap();
        repo.update_progress(&TaskProgress::new(id, TaskStatus::Cancelled, 0, 0))
            .await
            .unwrap();

        assert_eq!(resolver.resolve(&url).await.unwrap(), id);
        let task = repo.get(id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Paused);
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
    }
}
