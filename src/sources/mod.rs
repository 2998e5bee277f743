//! Interfaces to the external collaborators consulted by the crawler and the
//! resolution chain, plus their shipped implementations.
//!
//! Every collaborator reports failures as [`SourceError`]; deciding what to do
//! with a failure is left to the caller.

pub mod completion;
pub mod naver;
pub mod tmdb;

pub use completion::LlmCompletion;
pub use naver::{HttpSession, HttpSessionFactory};
pub use tmdb::TmdbClient;

use async_trait::async_trait;
use std::fmt;

use crate::error::{SourceError, SourceResult};
use crate::model::{Genre, RawRow};

/// Catalog search type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Tv,
    Movie,
}

impl MediaKind {
    pub fn as_path(&self) -> &'static str {
        match self {
            MediaKind::Tv => "tv",
            MediaKind::Movie => "movie",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

/// One search candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogHit {
    pub id: u64,
    pub name: String,
}

/// Genre tag attached to a catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogGenre {
    pub id: Option<u32>,
    pub name: String,
}

/// Details of one catalog entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogDetail {
    pub overview: String,
    /// Full poster URL
    pub poster_url: Option<String>,
    pub genres: Vec<CatalogGenre>,
    /// Raw rating code for the configured region, first matching entry
    pub age_rating: Option<String>,
}

/// Movie/TV metadata provider
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn search(&self, title: &str, kind: MediaKind) -> SourceResult<Vec<CatalogHit>>;

    async fn detail(&self, id: u64, kind: MediaKind) -> SourceResult<CatalogDetail>;

    /// Cast names in billing order
    async fn credits(&self, id: u64, kind: MediaKind) -> SourceResult<Vec<String>>;
}

/// Catalog used when no API key is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCatalog;

#[async_trait]
impl CatalogService for DisabledCatalog {
    async fn search(&self, _title: &str, _kind: MediaKind) -> SourceResult<Vec<CatalogHit>> {
        Ok(Vec::new())
    }

    async fn detail(&self, _id: u64, _kind: MediaKind) -> SourceResult<CatalogDetail> {
        Err(SourceError::NotConfigured("catalog service".to_string()))
    }

    async fn credits(&self, _id: u64, _kind: MediaKind) -> SourceResult<Vec<String>> {
        Err(SourceError::NotConfigured("catalog service".to_string()))
    }
}

/// Genre label and thumbnail found by the secondary web search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecondaryHit {
    pub genre_label: String,
    pub thumbnail: String,
}

/// Source of a channel's raw schedule rows
#[async_trait]
pub trait ChannelGuide: Send {
    async fn fetch_rows(&mut self, channel: &str) -> SourceResult<Vec<RawRow>>;
}

/// Web-search corroboration. Methods take `&mut self`: a session serves one
/// caller at a time.
#[async_trait]
pub trait SecondarySearch: Send {
    async fn lookup_genre_and_thumbnail(&mut self, title: &str) -> SourceResult<SecondaryHit>;

    async fn lookup_cast(&mut self, title: &str) -> SourceResult<Vec<String>>;
}

/// Exclusive per-channel session
#[async_trait]
pub trait Session: ChannelGuide + SecondarySearch {
    /// Tear down the session; called once on every exit path
    async fn close(&mut self) -> SourceResult<()>;
}

/// Opens one [`Session`] per crawl task
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, channel: &str) -> SourceResult<Box<dyn Session>>;
}

/// Input to the completion service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionRequest {
    pub title: String,
    /// Current genre; `None` asks the service to choose from `genre_choices`
    pub genre: Option<Genre>,
    pub genre_choices: Vec<Genre>,
    pub subgenre: String,
    pub description: String,
    pub thumbnail: String,
    pub age_rating: String,
    pub cast: String,
    /// Allowed subgenres for the current genre
    pub allowed_subgenres: Vec<String>,
}

/// Fields returned by the completion service; empty strings mean "not
/// returned"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionFields {
    pub genre: String,
    pub subgenre: String,
    pub description: String,
    pub thumbnail: String,
    pub age_rating: String,
    pub cast: String,
}

impl CompletionFields {
    pub fn is_empty(&self) -> bool {
        self.genre.is_empty()
            && self.subgenre.is_empty()
            && self.description.is_empty()
            && self.thumbnail.is_empty()
            && self.age_rating.is_empty()
            && self.cast.is_empty()
    }
}

/// Generative fill-in for missing fields
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> SourceResult<CompletionFields>;

    /// Localize names, keeping order and count
    async fn localize_names(&self, names: &[String]) -> SourceResult<Vec<String>>;
}

/// Completion service used when no model is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCompletion;

#[async_trait]
impl CompletionService for DisabledCompletion {
    async fn complete(&self, _request: &CompletionRequest) -> SourceResult<CompletionFields> {
        Err(SourceError::NotConfigured("completion model".to_string()))
    }

    async fn localize_names(&self, _names: &[String]) -> SourceResult<Vec<String>> {
        Err(SourceError::NotConfigured("completion model".to_string()))
    }
}
