//! List posts

use anyhow::Result;

use crate::content::PostSummary;
use crate::Blog;

/// List posts, optionally restricted to one tag
pub async fn run(blog: &Blog, include_drafts: bool, tag: Option<&str>, json: bool) -> Result<()> {
    let store = blog.open_store().await?;
    let query = blog.query(store);

    let posts = match tag {
        Some(tag) => query.list_posts_by_tag(tag).await?,
        None => query.list_posts(include_drafts).await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&posts)?);
        return Ok(());
    }

    println!("Posts ({}):", posts.len());
    for post in &posts {
        println!("  {}", format_line(post));
    }

    Ok(())
}

fn format_line(post: &PostSummary) -> String {
    let date = post
        .published_at
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "----------".to_string());
    let mut line = format!("{} - {} [{}]", date, post.title, post.slug);
    if !post.tags.is_empty() {
        line.push_str(&format!(" #{}", post.tags.join(" #")));
    }
    if post.is_draft {
        line.push_str(" (draft)");
    }
    line
}
