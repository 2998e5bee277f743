//! Title-keyed store of resolved metadata, persisted as a CSV table
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::{strip_bom, write_with_bom};
use crate::error::CatalogError;
use crate::model::{AgeRating, Genre, MetadataRecord};

/// Read-only view of the cache taken before the crawl starts
pub type CacheSnapshot = Arc<HashMap<String, MetadataRecord>>;

/// On-disk row of the cache table
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheRow {
    title: String,
    genre: String,
    subgenre: String,
    description: String,
    thumbnail: String,
    age_rating: String,
    cast: String,
}

impl CacheRow {
    fn from_record(title: &str, record: &MetadataRecord) -> Self {
        Self {
            title: title.to_string(),
            genre: record.genre.map(|g| g.as_str().to_string()).unwrap_or_default(),
            subgenre: record.subgenre.clone(),
            description: record.description.clone(),
            thumbnail: record.thumbnail.clone(),
            age_rating: record.age_rating.as_str().to_string(),
            cast: record.cast.clone(),
        }
    }

    fn into_entry(self) -> (String, MetadataRecord) {
        let age_rating = AgeRating::from_label(&self.age_rating).unwrap_or_else(|| {
            if !self.age_rating.trim().is_empty() {
                debug!("Cached age rating '{}' for {} is not a tier", self.age_rating, self.title);
            }
            AgeRating::default()
        });
        let record = MetadataRecord {
            genre: Genre::from_name(&self.genre),
            subgenre: self.subgenre,
            description: self.description,
            thumbnail: self.thumbnail,
            age_rating,
            cast: self.cast,
        };
        (self.title, record)
    }
}

/// Cache statistics for the maintenance tool
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub total_entries: usize,
    pub without_genre: usize,
    pub with_thumbnail: usize,
    pub with_cast: usize,
    pub by_genre: BTreeMap<String, usize>,
}

/// Metadata cache: a snapshot loaded at run start plus records staged during
/// the run. No TTL and no eviction.
#[derive(Debug, Clone)]
pub struct MetadataCache {
    path: PathBuf,
    snapshot: CacheSnapshot,
    staged: Vec<(String, MetadataRecord)>,
}

impl MetadataCache {
    /// Empty cache bound to `path`
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            snapshot: Arc::new(HashMap::new()),
            staged: Vec::new(),
        }
    }

    /// Load the cache table. A missing file yields an empty cache; rows that
    /// cannot be read are skipped.
    pub async fn load<P: Into<PathBuf>>(path: P) -> Result<Self, CatalogError> {
        let path = path.into();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("📭 No metadata cache at {}, starting empty", path.display());
                return Ok(Self::new(path));
            }
            Err(e) => return Err(CatalogError::io(&path, e)),
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(strip_bom(&bytes));

        let mut entries = HashMap::new();
        for (line, row) in reader.deserialize::<CacheRow>().enumerate() {
            match row {
                Ok(row) => {
                    let (title, record) = row.into_entry();
                    entries.insert(title, record);
                }
                Err(e) => warn!("⚠️ Skipping unreadable cache row {} in {}: {}", line + 1, path.display(), e),
            }
        }

        info!("📚 Loaded {} cached titles from {}", entries.len(), path.display());
        Ok(Self {
            path,
            snapshot: Arc::new(entries),
            staged: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Exact-title lookup against the loaded snapshot. A hit is returned
    /// as stored, even when fields are empty.
    pub fn lookup(&self, title: &str) -> Option<&MetadataRecord> {
        self.snapshot.get(title)
    }

    /// Shared read-only view for concurrent lookups
    pub fn snapshot(&self) -> CacheSnapshot {
        Arc::clone(&self.snapshot)
    }

    /// Stage a resolved record for the end-of-run merge
    pub fn record(&mut self, title: &str, record: MetadataRecord) {
        self.staged.push((title.to_string(), record));
    }

    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Number of titles in the snapshot
    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    /// Merge staged records into the snapshot (latest staged record wins for
    /// a repeated title) and rewrite the whole table. Returns the number of
    /// titles written.
    pub async fn flush(&mut self) -> Result<usize, CatalogError> {
        let staged = std::mem::take(&mut self.staged);
        let staged_count = staged.len();
        let entries = Arc::make_mut(&mut self.snapshot);
        for (title, record) in staged {
            entries.insert(title, record);
        }

        let written = self.write().await?;
        info!(
            "💾 Metadata cache saved: {} titles ({} staged this run) -> {}",
            written,
            staged_count,
            self.path.display()
        );
        Ok(written)
    }

    /// Drop one title from the snapshot; returns whether it existed
    pub fn remove(&mut self, title: &str) -> bool {
        Arc::make_mut(&mut self.snapshot).remove(title).is_some()
    }

    /// Drop every title and staged record; returns how many titles were held
    pub fn clear(&mut self) -> usize {
        let count = self.snapshot.len();
        self.snapshot = Arc::new(HashMap::new());
        self.staged.clear();
        count
    }

    /// Rewrite the table from the snapshot without merging staged records
    pub async fn save(&self) -> Result<usize, CatalogError> {
        self.write().await
    }

    pub fn get_stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            total_entries: self.snapshot.len(),
            ..Default::default()
        };
        for record in self.snapshot.values() {
            match record.genre {
                Some(genre) => *stats.by_genre.entry(genre.as_str().to_string()).or_insert(0) += 1,
                None => stats.without_genre += 1,
            }
            if !record.thumbnail.is_empty() {
                stats.with_thumbnail += 1;
            }
            if !record.cast.is_empty() {
                stats.with_cast += 1;
            }
        }
        stats
    }

    async fn write(&self) -> Result<usize, CatalogError> {
        let mut titles: Vec<&String> = self.snapshot.keys().collect();
        titles.sort();

        let mut writer = csv::Writer::from_writer(Vec::new());
        for title in &titles {
            if let Some(record) = self.snapshot.get(*title) {
                writer
                    .serialize(CacheRow::from_record(title, record))
                    .map_err(|e| CatalogError::csv(&self.path, e))?;
            }
        }
        let body = writer
            .into_inner()
            .map_err(|e| CatalogError::io(&self.path, e.into_error()))?;

        write_with_bom(&self.path, body).await?;
        Ok(titles.len())
    }
}
