//! CLI entry point for discover-blog

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "discover-blog")]
#[command(version)]
#[command(about = "Index Markdown blog posts into SQLite and render them on demand", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Override the database path (":memory:" for a throwaway store)
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the posts directory and upsert published posts
    Sync {
        /// Keep watching the posts directory and re-sync on change
        #[arg(short, long)]
        watch: bool,
    },

    /// List posts, newest first
    #[command(alias = "ls")]
    List {
        /// Include drafts
        #[arg(long)]
        drafts: bool,

        /// Only posts carrying this tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Render one post by slug
    Show {
        /// Slug of the post
        slug: String,

        /// Print the full post as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the tags of published posts
    Tags {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Create a new unpublished post
    New {
        /// Title of the new post
        title: String,

        /// Slug for the new post (defaults to the slugified title)
        #[arg(short, long)]
        slug: Option<String>,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "discover_blog=debug,info"
    } else {
        "discover_blog=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Commands::Version = cli.command {
        println!("discover-blog version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let mut blog = discover_blog::Blog::new(&base_dir)?;
    if let Some(database) = cli.database {
        blog.config.database = database;
    }

    match cli.command {
        Commands::Sync { watch } => {
            tracing::info!("Syncing posts from {:?}", blog.posts_dir);
            discover_blog::commands::sync::run(&blog, watch).await?;
        }

        Commands::List { drafts, tag, json } => {
            discover_blog::commands::list::run(&blog, drafts, tag.as_deref(), json).await?;
        }

        Commands::Show { slug, json } => {
            discover_blog::commands::show::run(&blog, &slug, json).await?;
        }

        Commands::Tags { json } => {
            discover_blog::commands::tags::run(&blog, json).await?;
        }

        Commands::New { title, slug } => {
            tracing::info!("Creating new post with title: {}", title);
            let path = discover_blog::commands::new::create_post(&blog, &title, slug.as_deref())?;
            println!("Created {}", path.display());
        }

        Commands::Version => {}
    }

    Ok(())
}
