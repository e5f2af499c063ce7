//! Get command handler.

use anyhow::{Result, bail};

use fdl_download::{DownloadError, DownloadManagerPort};

use crate::bootstrap::CliContext;
use crate::handlers::monitor;

/// Resolve and start each URL, then follow progress until idle.
///
/// A URL whose file was already downloaded is reported and skipped. The
/// command fails only when no URL could be started.
pub async fn execute(ctx: &CliContext, urls: &[String]) -> Result<()> {
    let mut started = 0usize;
    let mut failed = 0usize;

    for url in urls {
        match ctx.downloads().resolve_and_start(url).await {
            Ok(id) => {
                println!("#{id} {url}");
                started += 1;
            }
            Err(DownloadError::AlreadyDownloaded { file_name }) => {
                println!("Already downloaded: {file_name}");
            }
            Err(e) if e.is_recoverable() => {
                eprintln!("{url}: {} (try again later)", e.user_message());
                failed += 1;
            }
            Err(e) => {
                eprintln!("{url}: {}", e.user_message());
                failed += 1;
            }
        }
    }

    if started == 0 {
        if failed > 0 {
            bail!("no download could be started");
        }
        return Ok(());
    }

    ctx.downloads().start_queued().await?;
    monitor::run(ctx).await
}
