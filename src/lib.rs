//! IPTV Catalog - daily program catalog builder
//!
//! Crawls per-channel IPTV schedules, normalizes them into program slots and
//! resolves genre, subgenre, description, thumbnail, age rating and cast for
//! every title through an ordered chain of metadata sources.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod crawler;
pub mod error;
pub mod llm;
pub mod model;
pub mod resolver;
pub mod schedule;
pub mod sources;
pub mod taxonomy;

// Re-export main types for easy access
pub use crate::cache::{CacheStats, MetadataCache};
pub use crate::catalog::{CatalogWriter, DailyTable};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::crawler::{CrawlOrchestrator, CrawlResult, RunSummary};
pub use crate::error::{CatalogError, SourceError, SourceResult};
pub use crate::llm::{LLMConfig, LLMProvider};
pub use crate::model::{AgeRating, Genre, MetadataRecord, OutputRow, ProgramSlot, RawRow};
pub use crate::resolver::{Resolver, ResolverRules};
pub use crate::schedule::ScheduleNormalizer;
pub use crate::taxonomy::GenreTaxonomy;
