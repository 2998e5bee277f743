use anyhow::Result;
use clap::{Parser, Subcommand};
use iptv_catalog::config::Config;
use iptv_catalog::MetadataCache;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "cache-manager")]
#[command(about = "Metadata cache management utility")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Cache file; defaults to the configured data directory's cache
    #[arg(long)]
    cache_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Get cache statistics
    Stats,
    /// Show the cached record for a title
    Show {
        /// Cleaned program title
        title: String,
    },
    /// Remove one title so the next crawl resolves it again
    Remove {
        /// Cleaned program title
        title: String,
    },
    /// Remove every title that has no genre
    PruneUnclassified,
    /// Clear all cache entries
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let cli = Cli::parse();

    let cache_file = match cli.cache_file {
        Some(path) => path,
        None => Config::load()?.output.cache_path(),
    };
    let mut cache = MetadataCache::load(&cache_file).await?;

    match cli.command {
        Commands::Stats => {
            let stats = cache.get_stats();
            info!("📊 Cache Statistics ({}):", cache_file.display());
            info!("  Total titles: {}", stats.total_entries);
            info!("  Without genre: {}", stats.without_genre);
            info!("  With thumbnail: {}", stats.with_thumbnail);
            info!("  With cast: {}", stats.with_cast);
            for (genre, count) in &stats.by_genre {
                info!("  {}: {}", genre, count);
            }
        }

        Commands::Show { title } => match cache.lookup(&title) {
            Some(record) => {
                info!("📄 {}", title);
                info!("  Genre: {}", record.genre.map(|g| g.as_str()).unwrap_or(""));
                info!("  Subgenre: {}", record.subgenre);
                info!("  Age rating: {}", record.age_rating.as_str());
                info!("  Cast: {}", record.cast);
                info!("  Thumbnail: {}", record.thumbnail);
                info!("  Description: {}", record.description);
            }
            None => warn!("⚠️ Title not cached: {}", title),
        },

        Commands::Remove { title } => {
            if cache.remove(&title) {
                cache.save().await?;
                info!("✅ Removed cached record for: {}", title);
            } else {
                warn!("⚠️ Title not cached: {}", title);
            }
        }

        Commands::PruneUnclassified => {
            let titles: Vec<String> = cache
                .snapshot()
                .iter()
                .filter(|(_, record)| record.genre.is_none())
                .map(|(title, _)| title.clone())
                .collect();
            for title in &titles {
                cache.remove(title);
            }
            cache.save().await?;
            info!("🗑️ Pruned {} unclassified titles", titles.len());
        }

        Commands::Clear => {
            let count = cache.clear();
            cache.save().await?;
            info!("🧹 Cleared {} cached titles", count);
        }
    }

    Ok(())
}
