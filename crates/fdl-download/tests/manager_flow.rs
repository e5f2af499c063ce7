//! End-to-end flows through `DownloadManagerImpl` against a mock server.

use std::sync::Arc;
use std::time::Duration;

use fdl_core::{
    ChannelDownloadEmitter, DEFAULT_MIME_TYPE, DownloadTask, NoopDownloadEmitter, RemoteFileMeta,
    TaskProgress, TaskRepositoryPort,
};
use fdl_db::TestDb;
use fdl_download::{
    DownloadError, DownloadEvent, DownloadManagerConfig, DownloadManagerDeps, DownloadManagerImpl,
    DownloadManagerPort, ProjectionSnapshot, TaskId, TaskStatus, build_download_manager,
};
use tempfile::TempDir;
use tokio::sync::watch;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Env {
    temp: TempDir,
    _db: TestDb,
    repo: Arc<dyn TaskRepositoryPort>,
}

impl Env {
    async fn new() -> Self {
        let db = TestDb::new().await.unwrap();
        let repo: Arc<dyn TaskRepositoryPort> = db.task_repository();
        Self {
            temp: TempDir::new().unwrap(),
            _db: db,
            repo,
        }
    }

    fn config(&self) -> DownloadManagerConfig {
        DownloadManagerConfig::new(
            self.temp.path().join("partial"),
            self.temp.path().join("public"),
        )
        .with_max_concurrent(2)
        .with_chunk_size(128)
    }

    async fn manager(&self) -> DownloadManagerImpl {
        build_download_manager(DownloadManagerDeps {
            repo: Arc::clone(&self.repo),
            storage: None,
            emitter: Arc::new(NoopDownloadEmitter::new()),
            config: self.config(),
        })
        .await
        .unwrap()
    }
}

fn payload() -> Vec<u8> {
    (0..1000u32).map(|i| (i * 7 % 256) as u8).collect()
}

async fn wait_for(
    rx: &mut watch::Receiver<ProjectionSnapshot>,
    what: impl FnMut(&ProjectionSnapshot) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(10), rx.wait_for(what))
        .await
        .expect("projection did not reach the expected state")
        .unwrap();
}

async fn wait_idle(manager: &DownloadManagerImpl) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while manager.running_count().await > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

async fn mount_head(server: &MockServer, route: &str) {
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(payload())
                .insert_header("Content-Length", "1000")
                .insert_header("Accept-Ranges", "bytes")
                .insert_header("Content-Type", "application/octet-stream"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn interrupted_transfer_resumes_from_partial_length() {
    let server = MockServer::start().await;
    let body = payload();
    mount_head(&server, "/file.bin").await;

    // First attempt: connection drops after 400 bytes.
    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body[..400].to_vec()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .and(header("Range", "bytes=400-"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("Content-Range", "bytes 400-999/1000")
                .set_body_bytes(body[400..].to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let env = Env::new().await;
    let manager = env.manager().await;
    let mut rx = manager.subscribe();

    let id = manager
        .resolve_and_start(&format!("{}/file.bin", server.uri()))
        .await
        .unwrap();

    wait_for(&mut rx, |s| {
        s.get(id)
            .is_some_and(|t| t.status == TaskStatus::Paused && t.downloaded_bytes == 400)
    })
    .await;
    wait_idle(&manager).await;

    let paused = env.repo.get(id).await.unwrap().unwrap();
    assert_eq!(paused.status, TaskStatus::Paused);
    assert_eq!(paused.downloaded_bytes, 400);
    assert!(!paused.message.is_empty());

    manager.resume(id).await.unwrap();
    wait_for(&mut rx, |s| s.completed.contains_key(&id)).await;
    wait_idle(&manager).await;

    let done = env.repo.get(id).await.unwrap().unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.downloaded_bytes, 1000);
    assert!((done.progress - 100.0).abs() < f64::EPSILON);
    assert!(done.message.is_empty());

    let public = env.temp.path().join("public").join("file.bin");
    assert_eq!(tokio::fs::read(&public).await.unwrap(), body);
    assert!(!env.temp.path().join("partial").join("file.bin").exists());

    // Same file again is refused.
    let again = manager
        .resolve_and_start(&format!("{}/file.bin", server.uri()))
        .await;
    assert!(matches!(again, Err(DownloadError::AlreadyDownloaded { .. })));

    // Delete removes the row and the promoted file.
    manager.delete(id).await.unwrap();
    assert!(env.repo.get(id).await.unwrap().is_none());
    assert!(!public.exists());
    wait_for(&mut rx, |s| s.get(id).is_none()).await;
}

#[tokio::test]
async fn events_follow_lifecycle() {
    let server = MockServer::start().await;
    mount_head(&server, "/events.bin").await;
    Mock::given(method("GET"))
        .and(path("/events.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload()))
        .mount(&server)
        .await;

    let env = Env::new().await;
    let (emitter, mut events) = ChannelDownloadEmitter::new();
    let manager = build_download_manager(DownloadManagerDeps {
        repo: Arc::clone(&env.repo),
        storage: None,
        emitter: Arc::new(emitter),
        config: env.config(),
    })
    .await
    .unwrap();

    let id = manager
        .resolve_and_start(&format!("{}/events.bin", server.uri()))
        .await
        .unwrap();

    let first = tokio::time::timeout(Duration::from_secs(10), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first, DownloadEvent::started(id, "events.bin", 0));

    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.id(), id);
        if event.is_terminal() {
            assert_eq!(event, DownloadEvent::completed(id, "events.bin"));
            break;
        }
    }
}

#[tokio::test]
async fn startup_pauses_ghost_active_tasks() {
    let env = Env::new().await;
    let task = DownloadTask::from_meta(&RemoteFileMeta {
        url: "https://example.invalid/ghost.bin".to_string(),
        file_name: "ghost.bin".to_string(),
        total_bytes: 1000,
        mime_type: DEFAULT_MIME_TYPE.to_string(),
        supports_resume: true,
    });
    let id = env.repo.insert_or_update(&task).await.unwrap();
    env.repo
        .update_progress(&TaskProgress::new(id, TaskStatus::Active, 300, 1000))
        .await
        .unwrap();

    let manager = env.manager().await;

    assert_eq!(manager.reconciled().paused, vec![id]);
    let stored = env.repo.get(id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Paused);
    assert_eq!(stored.downloaded_bytes, 300);
    assert_eq!(manager.snapshot().get(id).unwrap().status, TaskStatus::Paused);
    assert_eq!(manager.running_count().await, 0);
}

#[tokio::test]
async fn loading_flag_covers_the_probe() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/slow.bin"))
        .respond_with(ResponseTemplate::new(404).set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;

    let env = Env::new().await;
    let manager = Arc::new(env.manager().await);
    let mut rx = manager.subscribe();

    let url = format!("{}/slow.bin", server.uri());
    let probing = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.resolve_and_start(&url).await })
    };

    wait_for(&mut rx, |s| s.is_loading).await;
    let result = probing.await.unwrap();
    assert!(matches!(
        result,
        Err(DownloadError::Network {
            status_code: Some(404),
            ..
        })
    ));
    assert!(!manager.snapshot().is_loading);
}

#[tokio::test]
async fn resume_issued_while_pausing_is_not_lost() {
    let server = MockServer::start().await;
    mount_head(&server, "/stall.bin").await;
    Mock::given(method("GET"))
        .and(path("/stall.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(payload())
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let env = Env::new().await;
    let manager = Arc::new(env.manager().await);
    let id = manager
        .resolve_and_start(&format!("{}/stall.bin", server.uri()))
        .await
        .unwrap();

    for _ in 0..5 {
        let pausing = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.pause(id).await })
        };
        // Let the pause request land before resuming.
        tokio::task::yield_now().await;
        manager.resume(id).await.unwrap();
        pausing.await.unwrap().unwrap();

        assert_eq!(manager.running_count().await, 1);
        assert_eq!(
            env.repo.get(id).await.unwrap().unwrap().status,
            TaskStatus::Active
        );
    }

    manager.shutdown().await;
    assert_eq!(
        env.repo.get(id).await.unwrap().unwrap().status,
        TaskStatus::Paused
    );
}

#[tokio::test]
async fn delete_refuses_unfinished_tasks() {
    let env = Env::new().await;
    let task = DownloadTask::from_meta(&RemoteFileMeta {
        url: "https://example.invalid/keep.bin".to_string(),
        file_name: "keep.bin".to_string(),
        total_bytes: 10,
        mime_type: DEFAULT_MIME_TYPE.to_string(),
        supports_resume: true,
    });
    let id = env.repo.insert_or_update(&task).await.unwrap();
    let manager = env.manager().await;

    assert!(matches!(
        manager.delete(id).await,
        Err(DownloadError::InvalidState { .. })
    ));
    assert!(matches!(
        manager.delete(TaskId::new(404)).await,
        Err(DownloadError::NotFound { .. })
    ));

    manager.cancel(id).await.unwrap();
    assert_eq!(
        env.repo.get(id).await.unwrap().unwrap().status,
        TaskStatus::Cancelled
    );
    assert!(matches!(
        manager.resume(id).await,
        Err(DownloadError::InvalidState { .. })
    ));

    manager.delete(id).await.unwrap();
    assert!(env.repo.get(id).await.unwrap().is_none());
}
