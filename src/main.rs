use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use iptv_catalog::catalog::CatalogWriter;
use iptv_catalog::config::Config;
use iptv_catalog::crawler::CrawlOrchestrator;
use iptv_catalog::llm::create_llm;
use iptv_catalog::model::OutputRow;
use iptv_catalog::sources::{
    CatalogService, CompletionService, DisabledCatalog, DisabledCompletion, HttpSessionFactory, LlmCompletion,
    TmdbClient,
};
use iptv_catalog::{GenreTaxonomy, MetadataCache, Resolver, ResolverRules, ScheduleNormalizer};

#[derive(Parser)]
#[command(name = "iptv-catalog")]
#[command(version, about = "Daily IPTV program catalog with genre classification and metadata enrichment")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output directory for daily tables and the metadata cache
    #[arg(short = 'o', long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Number of channels crawled in parallel
    #[arg(short, long, value_name = "NUM")]
    workers: Option<usize>,

    /// Channel to crawl, e.g. "KBS1[9]"; repeat for more. Defaults to the configured list
    #[arg(long = "channel", value_name = "NAME")]
    channels: Vec<String>,

    /// Run date used for file names and id continuity (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    date: Option<NaiveDate>,

    /// Skip the per-channel program files
    #[arg(long)]
    no_channel_files: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose {
        "iptv_catalog=debug,warn"
    } else {
        "iptv_catalog=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("Failed to load config, using defaults: {}", e);
            Config::default()
        }),
    };
    apply_cli_overrides(&mut config, &cli);
    config.validate()?;

    let run_date = cli.date.unwrap_or_else(|| Local::now().date_naive());

    info!("🚀 IPTV Catalog starting...");
    info!("📅 Run date: {}", run_date);
    for line in config.summary().lines() {
        info!("{}", line);
    }

    let taxonomy = match &config.taxonomy_file {
        Some(path) => Arc::new(GenreTaxonomy::from_file(path).await?),
        None => Arc::new(GenreTaxonomy::new()),
    };
    let stats = taxonomy.get_stats();
    info!(
        "📚 Genre taxonomy: {} genres, {} subgenres, {} keyword entries",
        stats.genres, stats.total_subgenres, stats.keyword_entries
    );

    let resolver = Resolver::new(
        Arc::clone(&taxonomy),
        Arc::new(ResolverRules::default()),
        build_catalog(&config),
        build_completion(&config).await,
    );
    let sessions = Arc::new(HttpSessionFactory::new(
        config.search.clone(),
        Duration::from_secs(config.crawl.guide_timeout_seconds),
    ));
    let crawler = CrawlOrchestrator::new(
        sessions,
        ScheduleNormalizer::new(Arc::clone(&taxonomy)),
        resolver,
        config.crawl.workers,
    );

    let mut cache = MetadataCache::load(config.output.cache_path()).await?;

    let result = crawler.run(&config.crawl.channels, cache.snapshot()).await;
    result.summary.log();

    for (title, record) in result.resolved {
        cache.record(&title, record);
    }
    let cached = cache
        .flush()
        .await
        .with_context(|| format!("saving metadata cache {}", cache.path().display()))?;
    info!("💾 Metadata cache now holds {} titles", cached);

    let writer = CatalogWriter::new(&config.output.data_dir);
    let mut rows: Vec<OutputRow> = result.rows;
    let table = writer.write_daily(run_date, &mut rows).await?;

    if config.crawl.write_channel_files {
        let written = writer.write_channel_files(&rows).await?;
        info!("📂 Wrote {} channel files", written.len());
    }

    info!("🎉 Crawl completed in {:.2}s", result.summary.elapsed.as_secs_f64());
    info!("📄 Daily table: {}", table.path.display());

    Ok(())
}

fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(dir) = &cli.data_dir {
        config.output.data_dir = dir.clone();
    }
    if let Some(workers) = cli.workers {
        config.crawl.workers = workers;
    }
    if !cli.channels.is_empty() {
        config.crawl.channels = cli.channels.clone();
    }
    if cli.no_channel_files {
        config.crawl.write_channel_files = false;
    }
}

fn build_catalog(config: &Config) -> Arc<dyn CatalogService> {
    match TmdbClient::new(config.catalog_service.clone()) {
        Ok(client) => {
            info!("🎬 Catalog service enabled ({})", config.catalog_service.base_url);
            Arc::new(client)
        }
        Err(e) => {
            warn!("⚠️ Catalog service disabled: {}", e);
            Arc::new(DisabledCatalog)
        }
    }
}

async fn build_completion(config: &Config) -> Arc<dyn CompletionService> {
    let llm = match create_llm(&config.llm) {
        Ok(llm) => llm,
        Err(e) => {
            warn!("⚠️ Completion service disabled: {}", e);
            return Arc::new(DisabledCompletion);
        }
    };
    match LlmCompletion::connect(Arc::from(llm)).await {
        Ok(completion) => {
            info!("🤖 Completion model: {} ({})", config.llm.model, config.llm.provider);
            Arc::new(completion)
        }
        Err(e) => {
            warn!("⚠️ Completion service disabled: {}", e);
            Arc::new(DisabledCompletion)
        }
    }
}
