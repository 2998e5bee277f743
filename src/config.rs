use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::llm::{LLMConfig, LLMProvider};

/// Channels crawled when none are given on the command line
pub const DEFAULT_CHANNELS: &[&str] = &[
    "KBS1[9]",
    "KBS2[7]",
    "MBC[11]",
    "SBS[5]",
    "JTBC[15]",
    "MBN[16]",
    "채널A[18]",
    "TV조선[19]",
    "OBS[26]",
    "tvN[3]",
    "OCN[44]",
    "스크린[46]",
    "씨네프[47]",
    "OCN Movies2[51]",
    "캐치온1[52]",
    "캐치온2[53]",
    "채널액션[54]",
    "드라마큐브[71]",
    "ENA[72]",
    "ENA DRAMA[73]",
    "KBS Story[74]",
    "SBS플러스[33]",
    "MBC드라마넷[35]",
    "투니버스[324]",
    "카툰네트워크[316]",
    "애니박스[327]",
    "애니맥스[326]",
    "어린이TV[322]",
];

/// Configuration for the IPTV catalog crawler
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON taxonomy overriding the built-in tables
    pub taxonomy_file: Option<PathBuf>,

    /// Worker pool and channel selection
    pub crawl: CrawlConfig,

    /// Movie/TV catalog API
    pub catalog_service: CatalogServiceConfig,

    /// Web search page used for genre corroboration
    pub search: SearchConfig,

    /// Completion model settings
    pub llm: LLMConfig,

    /// Output and storage settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Channels processed in parallel, one session each
    pub workers: usize,

    /// Per-request timeout for the channel guide page
    pub guide_timeout_seconds: u64,

    /// Channel names as shown on the guide, e.g. `KBS1[9]`
    pub channels: Vec<String>,

    /// Also write one CSV per channel next to the daily table
    pub write_channel_files: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            guide_timeout_seconds: 13,
            channels: DEFAULT_CHANNELS.iter().map(|c| c.to_string()).collect(),
            write_channel_files: true,
        }
    }
}

/// TMDB-style catalog API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogServiceConfig {
    /// Without a key the catalog step is skipped
    pub api_key: Option<String>,
    pub base_url: String,
    pub language: String,
    /// Region used to pick the age certification
    pub region: String,
    /// Prefix joined with `poster_path`
    pub image_base_url: String,
    pub timeout_seconds: u64,
    pub max_cast: usize,
}

impl Default for CatalogServiceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.themoviedb.org/3".to_string(),
            language: "ko-KR".to_string(),
            region: "KR".to_string(),
            image_base_url: "https://image.tmdb.org/t/p/w500".to_string(),
            timeout_seconds: 10,
            max_cast: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Web search results page
    pub search_url: String,

    /// Channel guide page, queried with `?channel=<name>`
    pub guide_url: String,

    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_cast: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            search_url: "https://search.naver.com/search.naver".to_string(),
            guide_url: "https://www.lguplus.com/iptv/channel-guide".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
            timeout_seconds: 10,
            max_cast: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for daily tables, channel files and the cache
    pub data_dir: PathBuf,

    /// Cache file name, relative to `data_dir` unless absolute
    pub cache_file: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data_crawling"),
            cache_file: PathBuf::from("metadata_cache.csv"),
        }
    }
}

impl OutputConfig {
    pub fn cache_path(&self) -> PathBuf {
        if self.cache_file.is_absolute() {
            self.cache_file.clone()
        } else {
            self.data_dir.join(&self.cache_file)
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_paths = [
            "iptv-catalog.toml",
            "config/iptv-catalog.toml",
            "/etc/iptv-catalog/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config.with_env_overrides());
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load a specific configuration file; environment overrides still apply
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read config file {}: {}", path.display(), e))?;
        let config: Config = toml::from_str(&config_str)
            .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config.with_env_overrides())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::default().with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(api_key) = std::env::var("TMDB_API_KEY") {
            if !api_key.trim().is_empty() {
                self.catalog_service.api_key = Some(api_key);
            }
        }

        if let Ok(api_key) = std::env::var("GEMINI_API_KEY") {
            if !api_key.trim().is_empty() {
                self.llm.api_key = Some(api_key);
            }
        }

        if let Ok(workers) = std::env::var("IPTV_CATALOG_WORKERS") {
            match workers.parse() {
                Ok(workers) => self.crawl.workers = workers,
                Err(_) => tracing::warn!("Ignoring IPTV_CATALOG_WORKERS={}", workers),
            }
        }

        if let Ok(data_dir) = std::env::var("IPTV_CATALOG_DATA_DIR") {
            self.output.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(provider) = std::env::var("IPTV_CATALOG_LLM_PROVIDER") {
            match LLMProvider::from_name(&provider) {
                Some(provider) => self.llm.provider = provider,
                None => tracing::warn!("Unknown LLM provider: {}", provider),
            }
        }

        self
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.crawl.workers == 0 {
            return Err(anyhow!("workers must be greater than 0"));
        }

        if self.crawl.guide_timeout_seconds == 0
            || self.catalog_service.timeout_seconds == 0
            || self.search.timeout_seconds == 0
            || self.llm.timeout_seconds == 0
        {
            return Err(anyhow!("timeouts must be greater than 0"));
        }

        for (name, value) in [
            ("catalog_service.base_url", &self.catalog_service.base_url),
            ("search.search_url", &self.search.search_url),
            ("search.guide_url", &self.search.guide_url),
        ] {
            url::Url::parse(value).map_err(|e| anyhow!("{} is not a valid URL ({}): {}", name, value, e))?;
        }

        if !self.output.data_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(&self.output.data_dir) {
                return Err(anyhow!("Cannot create data directory: {}", e));
            }
        }

        if self.llm.provider == LLMProvider::OpenAICompatible && self.llm.endpoint.is_none() {
            return Err(anyhow!("endpoint required for an OpenAI-compatible LLM provider"));
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "IPTV Catalog Configuration:\n\
            - Workers: {}\n\
            - Channels: {}\n\
            - Data Directory: {}\n\
            - Cache File: {}\n\
            - Catalog Service: {}\n\
            - LLM Provider: {} ({})\n\
            - Channel Files: {}",
            self.crawl.workers,
            self.crawl.channels.len(),
            self.output.data_dir.display(),
            self.output.cache_path().display(),
            if self.catalog_service.api_key.is_some() { "enabled" } else { "disabled" },
            self.llm.provider,
            if self.llm.api_key.is_some() || self.llm.endpoint.is_some() { "configured" } else { "not configured" },
            self.crawl.write_channel_files
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.crawl.workers = workers;
        self
    }

    pub fn with_channels(mut self, channels: Vec<String>) -> Self {
        self.config.crawl.channels = channels;
        self
    }

    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.data_dir = dir;
        self
    }

    pub fn with_catalog_api_key(mut self, api_key: String) -> Self {
        self.config.catalog_service.api_key = Some(api_key);
        self
    }

    pub fn with_llm_provider(mut self, provider: LLMProvider) -> Self {
        self.config.llm.provider = provider;
        self
    }

    pub fn with_taxonomy_file(mut self, path: PathBuf) -> Self {
        self.config.taxonomy_file = Some(path);
        self
    }

    pub fn write_channel_files(mut self, enable: bool) -> Self {
        self.config.crawl.write_channel_files = enable;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.crawl.workers, 5);
        assert_eq!(config.crawl.channels.len(), 28);
        assert_eq!(config.catalog_service.language, "ko-KR");
        assert_eq!(config.llm.model, "gemini-2.0-flash-lite");
        assert!(config.taxonomy_file.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_workers(2)
            .with_channels(vec!["KBS1[9]".to_string()])
            .write_channel_files(false)
            .build();

        assert_eq!(config.crawl.workers, 2);
        assert_eq!(config.crawl.channels, vec!["KBS1[9]"]);
        assert!(!config.crawl.write_channel_files);
    }

    #[test]
    fn test_config_validation() {
        let dir = TempDir::new().unwrap();
        let config = ConfigBuilder::new().with_data_dir(dir.path().join("out")).build();
        assert!(config.validate().is_ok());
        assert!(dir.path().join("out").exists());

        let config = ConfigBuilder::new()
            .with_data_dir(dir.path().to_path_buf())
            .with_workers(0)
            .build();
        assert!(config.validate().is_err());

        let config = ConfigBuilder::new()
            .with_data_dir(dir.path().to_path_buf())
            .with_llm_provider(LLMProvider::OpenAICompatible)
            .build();
        assert!(config.validate().is_err());
        let mut config = ConfigBuilder::new().with_data_dir(dir.path().to_path_buf()).build();
        config.search.guide_url = "lguplus channel guide".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            "[crawl]\nworkers = 3\n\n[output]\ndata_dir = \"/tmp/iptv\"\n",
        )
        .unwrap();

        assert_eq!(config.crawl.workers, 3);
        assert_eq!(config.crawl.guide_timeout_seconds, 13);
        assert_eq!(config.output.cache_path(), PathBuf::from("/tmp/iptv/metadata_cache.csv"));
        assert_eq!(config.search.max_cast, 5);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("iptv-catalog.toml");
        let config = ConfigBuilder::new().with_workers(7).build();

        config.save(path.to_str().unwrap()).unwrap();
        let reloaded: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reloaded.crawl.workers, 7);
        assert_eq!(reloaded.crawl.channels, config.crawl.channels);
    }

    #[test]
    fn test_summary_mentions_workers() {
        let summary = Config::default().summary();
        assert!(summary.contains("Workers: 5"));
        assert!(summary.contains("Channels: 28"));
    }
}
