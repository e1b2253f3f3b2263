//! Post ingestion - scans the posts root and upserts one row per published file

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use super::frontmatter::DateValue;
use super::{FrontMatter, PostUpsert};
use crate::config::BlogConfig;
use crate::error::{BlogError, BlogResult};
use crate::store::PostStore;

/// A file that could not be synced
#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of one scan of the posts root
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Rows successfully upserted
    pub synced: usize,
    /// Files skipped because they are not marked published
    pub drafts: usize,
    pub failed: Vec<SyncFailure>,
}

/// Scans Markdown files and upserts their summaries into the store
pub struct Ingestor {
    store: Arc<dyn PostStore>,
    config: BlogConfig,
    tz: Tz,
}

impl Ingestor {
    /// Create a new ingestor writing to `store`
    pub fn new(store: Arc<dyn PostStore>, config: &BlogConfig) -> BlogResult<Self> {
        let tz = config
            .tz()
            .map_err(|e| BlogError::Config(e.to_string()))?;
        Ok(Self {
            store,
            config: config.clone(),
            tz,
        })
    }

    /// Sync every post directly under `root`, returning how many were upserted
    pub async fn scan_and_sync(&self, root: &Path) -> BlogResult<usize> {
        Ok(self.sync_report(root).await?.synced)
    }

    /// Sync every post directly under `root`. Per-file failures are logged and
    /// collected; they never abort the scan.
    pub async fn sync_report(&self, root: &Path) -> BlogResult<SyncReport> {
        let mut report = SyncReport::default();

        if !root.is_dir() {
            tracing::info!("Posts directory {:?} does not exist, nothing to sync", root);
            return Ok(report);
        }

        for path in self.post_files(root) {
            let result = match self.load_post(&path, root).await {
                Ok(Some(post)) => self.store.upsert_post(&post).await.map(|()| Some(post)),
                Ok(None) => Ok(None),
                Err(e) => Err(e),
            };

            match result {
                Ok(Some(post)) => {
                    tracing::debug!("Synced {} from {:?}", post.slug, path);
                    report.synced += 1;
                }
                Ok(None) => {
                    tracing::debug!("Skipping unpublished {:?}", path);
                    report.drafts += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to sync post {:?}: {}", path, e);
                    report.failed.push(SyncFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Synced {} posts ({} unpublished, {} failed)",
            report.synced,
            report.drafts,
            report.failed.len()
        );

        Ok(report)
    }

    /// Post files directly under `root`, in file name order
    fn post_files(&self, root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Failed to read entry in {:?}: {}", root, e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| self.config.is_post_file(path))
            .filter(|path| {
                let reserved = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| self.config.is_reserved(n))
                    .unwrap_or(false);
                !reserved
            })
            .collect()
    }

    /// Derive the row for one file, or None if it is not published
    pub async fn load_post(&self, path: &Path, root: &Path) -> BlogResult<Option<PostUpsert>> {
        let content = tokio::fs::read_to_string(path).await?;
        let (fm, _body) = FrontMatter::parse(&content).map_err(|e| BlogError::FrontMatter {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if !fm.published {
            return Ok(None);
        }

        // Relative to the posts root, with forward slashes; must stay reopenable
        let file_path = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_str()
            .ok_or_else(|| BlogError::InvalidPath(path.to_path_buf()))?
            .replace('\\', "/");

        let slug = match fm.slug() {
            Some(slug) => slug.to_string(),
            None => path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| BlogError::InvalidPath(path.to_path_buf()))?
                .to_string(),
        };
        let title = fm.title().map(str::to_string).unwrap_or_else(|| slug.clone());
        let published_at = self.resolve_date(path, fm.date.as_ref())?;

        let tags: BTreeSet<String> = fm
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Some(PostUpsert {
            slug,
            title,
            excerpt: fm.excerpt.unwrap_or_default(),
            file_path,
            published_at: Some(published_at),
            is_draft: false,
            tags,
        }))
    }

    /// Front-matter date, or the sync time when absent or unparseable
    fn resolve_date(&self, path: &Path, date: Option<&DateValue>) -> BlogResult<DateTime<Utc>> {
        let Some(date) = date else {
            return Ok(Utc::now());
        };

        if let Some(resolved) = date.resolve(&self.tz) {
            return Ok(resolved);
        }

        if self.config.strict_dates {
            return Err(BlogError::InvalidDate {
                path: path.to_path_buf(),
                value: date.describe(),
            });
        }

        tracing::warn!(
            "Unparseable date {:?} in {:?}, using current time",
            date.describe(),
            path
        );
        Ok(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use chrono::TimeZone;
    use std::fs;

    async fn ingestor(config: &BlogConfig) -> Ingestor {
        let store = SqliteStore::in_memory().await.unwrap();
        Ingestor::new(Arc::new(store), config).unwrap()
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_slug_and_title_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "hello-world.md",
            "---\npublished: true\ndate: 2024-01-01\n---\nHi\n",
        );

        let ingestor = ingestor(&BlogConfig::default()).await;
        let post = ingestor.load_post(&path, dir.path()).await.unwrap().unwrap();
        assert_eq!(post.slug, "hello-world");
        assert_eq!(post.title, "hello-world");
        assert_eq!(post.excerpt, "");
        assert_eq!(post.file_path, "hello-world.md");
        assert!(post.tags.is_empty());
        assert!(!post.is_draft);
        assert_eq!(
            post.published_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_front_matter_values_win() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "file-name.md",
            r#"---
slug: custom
title: Custom Title
excerpt: Short
published: true
tags: [rust, " rust ", blog, ""]
---
Body
"#,
        );

        let ingestor = ingestor(&BlogConfig::default()).await;
        let post = ingestor.load_post(&path, dir.path()).await.unwrap().unwrap();
        assert_eq!(post.slug, "custom");
        assert_eq!(post.title, "Custom Title");
        assert_eq!(post.excerpt, "Short");
        assert_eq!(
            post.tags.into_iter().collect::<Vec<_>>(),
            vec!["blog".to_string(), "rust".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unpublished_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = write(dir.path(), "a.md", "---\npublished: false\n---\n");
        let missing = write(dir.path(), "b.md", "---\ntitle: B\n---\n");

        let ingestor = ingestor(&BlogConfig::default()).await;
        assert!(ingestor.load_post(&explicit, dir.path()).await.unwrap().is_none());
        assert!(ingestor.load_post(&missing, dir.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bad_date_falls_back_to_now() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "a.md",
            "---\npublished: true\ndate: not a date\n---\n",
        );

        let before = Utc::now();
        let ingestor = ingestor(&BlogConfig::default()).await;
        let post = ingestor.load_post(&path, dir.path()).await.unwrap().unwrap();
        let published_at = post.published_at.unwrap();
        assert!(published_at >= before);
        assert!(published_at <= Utc::now());
    }

    #[tokio::test]
    async fn test_strict_dates_reject_bad_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "a.md",
            "---\npublished: true\ndate: not a date\n---\n",
        );

        let config = BlogConfig {
            strict_dates: true,
            ..Default::default()
        };
        let ingestor = ingestor(&config).await;
        let err = ingestor.load_post(&path, dir.path()).await.unwrap_err();
        assert!(matches!(err, BlogError::InvalidDate { .. }));
    }

    #[tokio::test]
    async fn test_post_files_skip_reserved_nested_and_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "README.md", "---\npublished: true\n---\n");
        write(dir.path(), "b.md", "");
        write(dir.path(), "a.md", "");
        write(dir.path(), "notes.txt", "");
        fs::create_dir(dir.path().join("nested")).unwrap();
        write(&dir.path().join("nested"), "deep.md", "");

        let ingestor = ingestor(&BlogConfig::default()).await;
        let names: Vec<String> = ingestor
            .post_files(dir.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.md", "b.md"]);
    }

    #[tokio::test]
    async fn test_missing_root_syncs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ingestor = ingestor(&BlogConfig::default()).await;
        let count = ingestor
            .scan_and_sync(&dir.path().join("missing"))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_non_utf8_file_names_fail_instead_of_colliding() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        for name in [&b"caf\xe9.md"[..], &b"na\xefve.md"[..]] {
            fs::write(
                dir.path().join(OsStr::from_bytes(name)),
                "---\npublished: true\n---\nBody\n",
            )
            .unwrap();
        }
        write(dir.path(), "plain.md", "---\npublished: true\n---\nBody\n");

        let ingestor = ingestor(&BlogConfig::default()).await;
        let report = ingestor.sync_report(dir.path()).await.unwrap();
        assert_eq!(report.synced, 1);
        assert_eq!(report.failed.len(), 2);
        for failure in &report.failed {
            assert!(failure.error.starts_with("file name is not valid UTF-8"));
        }

        let posts = ingestor.store.list_posts(true).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].slug, "plain");
    }
}
