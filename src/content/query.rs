//! Read side of the pipeline: listings from the store, bodies rendered on demand

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use super::{FrontMatter, MarkdownRenderer, PostDetail, PostSummary};
use crate::error::{BlogError, BlogResult};
use crate::store::PostStore;

/// Answers list/get/tag queries for public display
pub struct PostQuery {
    store: Arc<dyn PostStore>,
    posts_dir: PathBuf,
    renderer: MarkdownRenderer,
}

impl PostQuery {
    /// Create a query service reading source files from `posts_dir`
    pub fn new(store: Arc<dyn PostStore>, posts_dir: PathBuf, renderer: MarkdownRenderer) -> Self {
        Self {
            store,
            posts_dir,
            renderer,
        }
    }

    /// Posts newest first; drafts only when asked for
    pub async fn list_posts(&self, include_drafts: bool) -> BlogResult<Vec<PostSummary>> {
        let posts = self.store.list_posts(include_drafts).await?;
        if include_drafts {
            return Ok(posts);
        }
        Ok(posts.into_iter().filter(|p| !p.is_draft).collect())
    }

    /// Published posts carrying `tag`
    pub async fn list_posts_by_tag(&self, tag: &str) -> BlogResult<Vec<PostSummary>> {
        let posts = self.store.list_posts_by_tag(tag).await?;
        Ok(posts
            .into_iter()
            .filter(|p| !p.is_draft && p.has_tag(tag))
            .collect())
    }

    /// Distinct tags of published posts, alphabetically
    pub async fn list_tags(&self) -> BlogResult<Vec<String>> {
        self.store.list_tags().await
    }

    /// A published post with its body rendered to HTML.
    ///
    /// Returns `NotFound` when the row is absent, is a draft, or its source
    /// file is gone; `Render` when the file exists but cannot be rendered.
    pub async fn get_post(&self, slug: &str) -> BlogResult<PostDetail> {
        let summary = self
            .store
            .get_post(slug)
            .await?
            .filter(|p| !p.is_draft)
            .ok_or_else(|| BlogError::NotFound(slug.to_string()))?;

        let Some(path) = self.source_path(&summary.file_path) else {
            tracing::warn!(
                "Post {} points outside the posts root: {:?}",
                slug,
                summary.file_path
            );
            return Err(BlogError::NotFound(slug.to_string()));
        };

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Source file for post {} is missing: {:?}", slug, path);
                return Err(BlogError::NotFound(slug.to_string()));
            }
            Err(e) => return Err(render_error(slug, e)),
        };

        // Metadata comes from the row; only the body matters here
        let (_, body) = FrontMatter::parse(&content).map_err(|e| render_error(slug, e))?;
        let html = self
            .renderer
            .render(body)
            .map_err(|e| render_error(slug, e))?;

        Ok(PostDetail {
            summary,
            content: html,
        })
    }

    /// Resolve a stored relative path, refusing anything that climbs out of the root
    fn source_path(&self, file_path: &str) -> Option<PathBuf> {
        let relative = Path::new(file_path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || file_path.is_empty() {
            return None;
        }
        Some(self.posts_dir.join(relative))
    }
}

fn render_error(slug: &str, e: impl std::fmt::Display) -> BlogError {
    tracing::warn!("Failed to render post {}: {}", slug, e);
    BlogError::Render {
        slug: slug.to_string(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::PostUpsert;
    use crate::store::SqliteStore;
    use std::collections::BTreeSet;
    use std::fs;

    async fn setup(dir: &Path) -> (Arc<dyn PostStore>, PostQuery) {
        let store: Arc<dyn PostStore> = Arc::new(SqliteStore::in_memory().await.unwrap());
        let query = PostQuery::new(
            store.clone(),
            dir.to_path_buf(),
            MarkdownRenderer::new(),
        );
        (store, query)
    }

    fn row(slug: &str, file_path: &str, is_draft: bool) -> PostUpsert {
        PostUpsert {
            slug: slug.to_string(),
            title: slug.to_string(),
            excerpt: String::new(),
            file_path: file_path.to_string(),
            published_at: None,
            is_draft,
            tags: BTreeSet::new(),
        }
    }

    #[tokio::test]
    async fn test_get_post_renders_body_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("hello.md"),
            "---\ntitle: Ignored\npublished: true\n---\n# Hello\n\nWorld\n",
        )
        .unwrap();
        let (store, query) = setup(dir.path()).await;
        store.upsert_post(&row("hello", "hello.md", false)).await.unwrap();

        let post = query.get_post("hello").await.unwrap();
        assert_eq!(post.summary.title, "hello");
        assert!(post.content.contains(r#"<h1 id="hello">Hello</h1>"#));
        assert!(!post.content.contains("published"));
    }

    #[tokio::test]
    async fn test_get_post_missing_row_or_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (store, query) = setup(dir.path()).await;
        store.upsert_post(&row("gone", "gone.md", false)).await.unwrap();

        assert!(query.get_post("absent").await.unwrap_err().is_not_found());
        assert!(query.get_post("gone").await.unwrap_err().is_not_found());
        assert_eq!(query.list_posts(false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_post_hides_drafts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("draft.md"), "body").unwrap();
        let (store, query) = setup(dir.path()).await;
        store.upsert_post(&row("draft", "draft.md", true)).await.unwrap();

        assert!(query.get_post("draft").await.unwrap_err().is_not_found());
        assert!(query.list_posts(false).await.unwrap().is_empty());
        assert_eq!(query.list_posts(true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_post_unrenderable_file_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("binary.md"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        fs::write(
            dir.path().join("broken.md"),
            "---\ntitle: [unclosed\npublished: true\n---\nbody\n",
        )
        .unwrap();
        let (store, query) = setup(dir.path()).await;
        store.upsert_post(&row("binary", "binary.md", false)).await.unwrap();
        store.upsert_post(&row("broken", "broken.md", false)).await.unwrap();

        for slug in ["binary", "broken"] {
            let err = query.get_post(slug).await.unwrap_err();
            assert!(matches!(err, BlogError::Render { .. }), "{}: {}", slug, err);
        }
    }

    #[tokio::test]
    async fn test_get_post_refuses_paths_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let posts = dir.path().join("posts");
        fs::create_dir(&posts).unwrap();
        fs::write(dir.path().join("secret.md"), "secret").unwrap();
        let (store, query) = setup(&posts).await;
        store
            .upsert_post(&row("escape", "../secret.md", false))
            .await
            .unwrap();

        assert!(query.get_post("escape").await.unwrap_err().is_not_found());
    }
}
