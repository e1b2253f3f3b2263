//! List tags

use anyhow::Result;

use crate::Blog;

/// Print the distinct tags of published posts
pub async fn run(blog: &Blog, json: bool) -> Result<()> {
    let store = blog.open_store().await?;
    let tags = blog.query(store).list_tags().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tags)?);
        return Ok(());
    }

    println!("Tags ({}):", tags.len());
    for tag in tags {
        println!("  {}", tag);
    }

    Ok(())
}
