//! Show one rendered post

use anyhow::Result;

use crate::error::BlogError;
use crate::Blog;

/// Print the rendered HTML of a post, or its full detail as JSON
pub async fn run(blog: &Blog, slug: &str, json: bool) -> Result<()> {
    let store = blog.open_store().await?;
    let query = blog.query(store);

    let post = match query.get_post(slug).await {
        Ok(post) => post,
        Err(BlogError::NotFound(_)) => anyhow::bail!("Post not found: {}", slug),
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&post)?);
    } else {
        println!("{}", post.content);
    }

    Ok(())
}
