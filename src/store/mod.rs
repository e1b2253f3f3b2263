//! Post store trait and implementations.
//!
//! The store is the only durable state in the pipeline. It is built once and
//! shared as `Arc<dyn PostStore>` between the ingestor and the query service.

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::content::{PostSummary, PostUpsert};
use crate::error::BlogResult;

/// Durable storage for post summaries, keyed by slug.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Create the schema if it does not exist.
    async fn migrate(&self) -> BlogResult<()>;

    /// Check database connectivity.
    async fn health_check(&self) -> BlogResult<()>;

    /// Insert the post, or overwrite every derived field of the existing row
    /// with the same slug. `created_at` is preserved and `updated_at` bumped.
    async fn upsert_post(&self, post: &PostUpsert) -> BlogResult<()>;

    /// All posts, newest first, undated posts last.
    async fn list_posts(&self, include_drafts: bool) -> BlogResult<Vec<PostSummary>>;

    /// Non-draft posts carrying `tag`, in the same order as `list_posts`.
    async fn list_posts_by_tag(&self, tag: &str) -> BlogResult<Vec<PostSummary>>;

    /// The row for `slug`, drafts included.
    async fn get_post(&self, slug: &str) -> BlogResult<Option<PostSummary>>;

    /// Distinct tags across non-draft posts, alphabetically.
    async fn list_tags(&self) -> BlogResult<Vec<String>>;
}
