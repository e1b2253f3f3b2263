//! Blog configuration (blog.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main blog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlogConfig {
    // Directory
    pub posts_dir: String,
    /// File names inside the posts root that are never ingested
    pub reserved_files: Vec<String>,
    pub extensions: Vec<String>,

    // Storage
    /// SQLite database path relative to the base directory, or `:memory:`
    pub database: String,

    // Writing
    /// IANA time zone for dates written without an offset
    pub timezone: String,
    /// Reject files with an unparseable date instead of stamping them with the sync time
    pub strict_dates: bool,
    pub new_post_name: String,

    // Rendering
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub markdown: MarkdownConfig,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            posts_dir: "posts".to_string(),
            reserved_files: vec!["README.md".to_string()],
            extensions: vec!["md".to_string()],

            database: "blog.db".to_string(),

            timezone: "UTC".to_string(),
            strict_dates: false,
            new_post_name: ":title.md".to_string(),

            highlight: HighlightConfig::default(),
            markdown: MarkdownConfig::default(),
        }
    }
}

impl BlogConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: BlogConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the configured time zone
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| anyhow::anyhow!("Unknown timezone {:?}: {}", self.timezone, e))
    }

    /// Whether a file name is reserved and must be skipped during ingestion
    pub fn is_reserved(&self, file_name: &str) -> bool {
        self.reserved_files.iter().any(|r| r == file_name)
    }

    /// Whether a path has one of the configured post extensions
    pub fn is_post_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|ext| ext.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    fn validate(&self) -> Result<()> {
        if self.posts_dir.trim().is_empty() {
            anyhow::bail!("posts_dir must not be empty");
        }
        if self.extensions.is_empty() {
            anyhow::bail!("extensions must list at least one file extension");
        }
        self.tz()?;
        Ok(())
    }
}

/// Code highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub theme: String,
    pub line_numbers: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: "base16-ocean.dark".to_string(),
            line_numbers: false,
        }
    }
}

/// Markdown rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// Render single newlines as `<br />`
    pub hard_breaks: bool,
    /// Paragraph text replaced by the table of contents
    pub toc_marker: String,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            hard_breaks: true,
            toc_marker: "[TOC]".to_string(),
        }
    }
}
