//! discover-blog: Markdown blog posts ingested into SQLite and served on demand
//!
//! The ingestor scans a directory of Markdown files with front-matter and
//! upserts one summary row per published post, keyed by slug. The query
//! service lists those rows and renders a post body to HTML only when a
//! single post is requested.

pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod store;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use content::{Ingestor, PostDetail, PostQuery, PostSummary, SyncReport};
pub use error::{BlogError, BlogResult};
pub use store::{PostStore, SqliteStore};

/// Name of the configuration file in the base directory
pub const CONFIG_FILE: &str = "blog.yml";

/// Database value selecting a private in-memory store
const MEMORY_DATABASE: &str = ":memory:";

/// The blog application
#[derive(Debug, Clone)]
pub struct Blog {
    /// Blog configuration
    pub config: config::BlogConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Posts root
    pub posts_dir: PathBuf,
}

impl Blog {
    /// Create a new Blog instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            config::BlogConfig::load(&config_path)?
        } else {
            config::BlogConfig::default()
        };

        Ok(Self::with_config(base_dir, config))
    }

    /// Create a Blog instance with an explicit configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::BlogConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let posts_dir = base_dir.join(&config.posts_dir);

        Self {
            config,
            base_dir,
            posts_dir,
        }
    }

    /// Database file, or None for an in-memory store
    pub fn database_path(&self) -> Option<PathBuf> {
        if self.config.database == MEMORY_DATABASE {
            None
        } else {
            Some(self.base_dir.join(&self.config.database))
        }
    }

    /// Open the configured store
    pub async fn open_store(&self) -> BlogResult<Arc<dyn PostStore>> {
        let store = match self.database_path() {
            Some(path) => SqliteStore::new(path).await?,
            None => SqliteStore::in_memory().await?,
        };
        Ok(Arc::new(store))
    }

    /// Ingestor writing to `store`
    pub fn ingestor(&self, store: Arc<dyn PostStore>) -> BlogResult<Ingestor> {
        Ingestor::new(store, &self.config)
    }

    /// Query service reading from `store` and the posts root
    pub fn query(&self, store: Arc<dyn PostStore>) -> PostQuery {
        PostQuery::new(
            store,
            self.posts_dir.clone(),
            content::MarkdownRenderer::from_config(&self.config),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_new_without_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        assert_eq!(blog.posts_dir, dir.path().join("posts"));
        assert_eq!(blog.database_path(), Some(dir.path().join("blog.db")));
    }

    #[test]
    fn test_new_reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "posts_dir: content/blog\ndatabase: \":memory:\"\n",
        )
        .unwrap();

        let blog = Blog::new(dir.path()).unwrap();
        assert_eq!(blog.posts_dir, dir.path().join("content/blog"));
        assert_eq!(blog.database_path(), None);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "posts_dir: [oops\n").unwrap();
        assert!(Blog::new(dir.path()).is_err());
    }
}
