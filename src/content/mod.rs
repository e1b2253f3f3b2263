//! Content module - front-matter, rendering, ingestion and queries for posts

mod frontmatter;
pub mod ingest;
mod markdown;
mod post;
pub mod query;

pub use frontmatter::{DateValue, FrontMatter};
pub use ingest::{Ingestor, SyncFailure, SyncReport};
pub use markdown::MarkdownRenderer;
pub use post::{PostDetail, PostSummary, PostUpsert};
pub use query::PostQuery;
