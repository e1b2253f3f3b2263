//! Sync posts into the store

use anyhow::Result;
use notify::{RecursiveMode, Watcher};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::content::{Ingestor, SyncReport};
use crate::Blog;

/// Quiet period before a burst of file events triggers a sync
const DEBOUNCE: Duration = Duration::from_millis(500);

/// Scan the posts root once, optionally keep watching it
pub async fn run(blog: &Blog, watch: bool) -> Result<SyncReport> {
    let store = blog.open_store().await?;
    let ingestor = blog.ingestor(store)?;

    let report = ingestor.sync_report(&blog.posts_dir).await?;
    print_report(&report);

    if watch {
        watch_and_sync(blog, &ingestor).await?;
    }

    Ok(report)
}

/// Re-sync whenever something in the posts root changes
async fn watch_and_sync(blog: &Blog, ingestor: &Ingestor) -> Result<()> {
    if !blog.posts_dir.is_dir() {
        anyhow::bail!("Posts directory {:?} does not exist", blog.posts_dir);
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })?;
    watcher.watch(&blog.posts_dir, RecursiveMode::NonRecursive)?;

    tracing::info!(
        "Watching {:?} for changes. Press Ctrl+C to stop.",
        blog.posts_dir
    );

    while rx.recv().await.is_some() {
        tokio::time::sleep(DEBOUNCE).await;
        while rx.try_recv().is_ok() {}

        tracing::info!("Posts changed, syncing...");
        match ingestor.sync_report(&blog.posts_dir).await {
            Ok(report) => print_report(&report),
            Err(e) => tracing::error!("Sync failed: {}", e),
        }
    }

    Ok(())
}

fn print_report(report: &SyncReport) {
    println!("Synced {} posts", report.synced);
    if report.drafts > 0 {
        println!("  {} unpublished files skipped", report.drafts);
    }
    for failure in &report.failed {
        println!("  failed {:?}: {}", failure.path, failure.error);
    }
}
