//! Create a new unpublished post

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use crate::Blog;

const DEFAULT_SCAFFOLD: &str = r#"---
title: {{ title }}
slug: {{ slug }}
date: {{ date }}
excerpt: ""
tags: []
published: false
---
"#;

/// Create a post file in the posts root and return its path
pub fn create_post(blog: &Blog, title: &str, slug: Option<&str>) -> Result<PathBuf> {
    let now = chrono::Local::now();
    let slug = match slug {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => slug::slugify(title),
    };
    if slug.is_empty() {
        anyhow::bail!("Cannot derive a slug from title {:?}", title);
    }

    fs::create_dir_all(&blog.posts_dir)?;

    let filename = blog
        .config
        .new_post_name
        .replace(":title", &slug)
        .replace(":year", &now.format("%Y").to_string())
        .replace(":month", &now.format("%m").to_string())
        .replace(":day", &now.format("%d").to_string());

    if blog.config.is_reserved(&filename) {
        anyhow::bail!("{} is a reserved file name", filename);
    }

    let file_path = blog.posts_dir.join(&filename);

    // Load scaffold template
    let scaffold_path = blog.base_dir.join("scaffolds").join("post.md");
    let scaffold_content = if scaffold_path.exists() {
        fs::read_to_string(&scaffold_path)?
    } else {
        DEFAULT_SCAFFOLD.to_string()
    };

    // A JSON string literal is also a valid YAML scalar
    let content = scaffold_content
        .replace("{{ title }}", &serde_json::to_string(title)?)
        .replace("{{ slug }}", &slug)
        .replace("{{ date }}", &now.format("%Y-%m-%d %H:%M:%S").to_string());

    // Check if file already exists
    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    fs::write(&file_path, content)?;

    tracing::info!("Created {:?}", file_path);

    Ok(file_path)
}
