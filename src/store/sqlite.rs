//! SQLite-backed post store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::types::Json;
use sqlx::{FromRow, Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use super::PostStore;
use crate::content::{PostSummary, PostUpsert};
use crate::error::BlogResult;

const POST_COLUMNS: &str =
    "slug, title, excerpt, file_path, published_at, is_draft, tags, created_at, updated_at";

/// Newest first, undated last, slug breaks ties.
const POST_ORDER: &str = "published_at IS NULL, published_at DESC, slug ASC";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
    slug TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    excerpt TEXT NOT NULL DEFAULT '',
    file_path TEXT NOT NULL,
    published_at TEXT,
    is_draft INTEGER NOT NULL DEFAULT 0,
    tags TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
CREATE INDEX IF NOT EXISTS idx_posts_published_at ON posts(published_at);
CREATE INDEX IF NOT EXISTS idx_posts_is_draft ON posts(is_draft);
"#;

/// Row shape of the `posts` table.
#[derive(Debug, Clone, FromRow)]
struct PostRow {
    slug: String,
    title: String,
    excerpt: String,
    file_path: String,
    published_at: Option<DateTime<Utc>>,
    is_draft: bool,
    tags: Json<Vec<String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PostRow> for PostSummary {
    fn from(row: PostRow) -> Self {
        Self {
            slug: row.slug,
            title: row.title,
            excerpt: row.excerpt,
            file_path: row.file_path,
            published_at: row.published_at,
            is_draft: row.is_draft,
            tags: row.tags.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// SQLite-based post store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if needed) a database file and run migrations.
    pub async fn new(path: impl AsRef<Path>) -> BlogResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await?;

        tracing::debug!("Opened post store at {:?}", path);
        Self::with_pool(pool).await
    }

    /// An isolated in-memory database, used by tests and `database: ":memory:"`.
    pub async fn in_memory() -> BlogResult<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Every connection to :memory: is a separate database, so keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        tracing::debug!("Opened in-memory post store");
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: Pool<Sqlite>) -> BlogResult<Self> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl PostStore for SqliteStore {
    async fn migrate(&self) -> BlogResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> BlogResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn upsert_post(&self, post: &PostUpsert) -> BlogResult<()> {
        let tags: Vec<&String> = post.tags.iter().collect();

        sqlx::query(
            r#"
            INSERT INTO posts (slug, title, excerpt, file_path, published_at, is_draft, tags)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(slug) DO UPDATE SET
                title = excluded.title,
                excerpt = excluded.excerpt,
                file_path = excluded.file_path,
                published_at = excluded.published_at,
                is_draft = excluded.is_draft,
                tags = excluded.tags,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            "#,
        )
        .bind(&post.slug)
        .bind(&post.title)
        .bind(&post.excerpt)
        .bind(&post.file_path)
        .bind(post.published_at)
        .bind(post.is_draft)
        .bind(Json(tags))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_posts(&self, include_drafts: bool) -> BlogResult<Vec<PostSummary>> {
        let sql = if include_drafts {
            format!("SELECT {POST_COLUMNS} FROM posts ORDER BY {POST_ORDER}")
        } else {
            format!("SELECT {POST_COLUMNS} FROM posts WHERE is_draft = 0 ORDER BY {POST_ORDER}")
        };
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(PostSummary::from).collect())
    }

    async fn list_posts_by_tag(&self, tag: &str) -> BlogResult<Vec<PostSummary>> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE is_draft = 0 \
               AND EXISTS (SELECT 1 FROM json_each(posts.tags) WHERE json_each.value = ?) \
             ORDER BY {POST_ORDER}"
        );
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(tag)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(PostSummary::from).collect())
    }

    async fn get_post(&self, slug: &str) -> BlogResult<Option<PostSummary>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE slug = ?");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(PostSummary::from))
    }

    async fn list_tags(&self) -> BlogResult<Vec<String>> {
        let tags: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT tag.value FROM posts, json_each(posts.tags) AS tag \
             WHERE posts.is_draft = 0 \
             ORDER BY tag.value",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }
}
