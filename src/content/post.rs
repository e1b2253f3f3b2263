//! Post models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Derived fields written by the ingestor for one source file
#[derive(Debug, Clone, PartialEq)]
pub struct PostUpsert {
    /// Unique key
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    /// Path of the source file relative to the posts root
    pub file_path: String,
    pub published_at: Option<DateTime<Utc>>,
    pub is_draft: bool,
    pub tags: BTreeSet<String>,
}

/// Stored metadata for a post, without its body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub file_path: String,
    pub published_at: Option<DateTime<Utc>>,
    pub is_draft: bool,
    /// Sorted, no duplicates
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostSummary {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A post with its rendered HTML body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub summary: PostSummary,

    /// Rendered HTML content
    pub content: String,
}
