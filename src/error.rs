//! Blog pipeline error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by ingestion, storage and queries.
#[derive(Debug, Error)]
pub enum BlogError {
    /// No public post exists for the slug, or its source file is gone.
    #[error("post not found: {0}")]
    NotFound(String),

    /// The post exists but its source could not be rendered.
    #[error("failed to render post {slug}: {message}")]
    Render { slug: String, message: String },

    #[error("invalid front-matter in {}: {message}", .path.display())]
    FrontMatter { path: PathBuf, message: String },

    /// Source paths are stored and reopened verbatim, so they must be UTF-8.
    #[error("file name is not valid UTF-8: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("invalid date {value:?} in {}", .path.display())]
    InvalidDate { path: PathBuf, value: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl BlogError {
    /// True only for the not-found outcome; render failures are distinct.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlogError::NotFound(_))
    }
}

/// Result type for blog operations.
pub type BlogResult<T> = std::result::Result<T, BlogError>;
