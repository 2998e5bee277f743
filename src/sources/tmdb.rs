//! TMDB implementation of the catalog service
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{CatalogDetail, CatalogGenre, CatalogHit, CatalogService, MediaKind};
use crate::config::CatalogServiceConfig;
use crate::error::{SourceError, SourceResult};
use crate::schedule::clean_query_title;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: u64,
    name: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    #[serde(default)]
    overview: Option<String>,
    poster_path: Option<String>,
    #[serde(default)]
    genres: Vec<GenreEntry>,
}

#[derive(Debug, Deserialize)]
struct GenreEntry {
    id: Option<u32>,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct CreditsResponse {
    #[serde(default)]
    cast: Vec<CastEntry>,
}

#[derive(Debug, Deserialize)]
struct CastEntry {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ContentRatings {
    #[serde(default)]
    results: Vec<ContentRating>,
}

#[derive(Debug, Deserialize)]
struct ContentRating {
    iso_3166_1: String,
    #[serde(default)]
    rating: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseDates {
    #[serde(default)]
    results: Vec<RegionReleases>,
}

#[derive(Debug, Deserialize)]
struct RegionReleases {
    iso_3166_1: String,
    #[serde(default)]
    release_dates: Vec<Release>,
}

#[derive(Debug, Deserialize)]
struct Release {
    #[serde(default)]
    certification: String,
}

/// TMDB v3 client
#[derive(Clone)]
pub struct TmdbClient {
    config: CatalogServiceConfig,
    api_key: String,
    client: reqwest::Client,
}

impl TmdbClient {
    /// Fails with `NotConfigured` when no API key is set
    pub fn new(config: CatalogServiceConfig) -> SourceResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| SourceError::NotConfigured("TMDB API key".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        localized: bool,
    ) -> SourceResult<T> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        let mut request = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params);
        if localized {
            request = request.query(&[("language", self.config.language.as_str())]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }

    async fn region_rating(&self, id: u64, kind: MediaKind) -> SourceResult<Option<String>> {
        let rating = match kind {
            MediaKind::Tv => {
                let ratings: ContentRatings = self.get_json(&format!("tv/{}/content_ratings", id), &[], false).await?;
                tv_rating_for_region(&ratings, &self.config.region)
            }
            MediaKind::Movie => {
                let releases: ReleaseDates = self.get_json(&format!("movie/{}/release_dates", id), &[], false).await?;
                movie_rating_for_region(&releases, &self.config.region)
            }
        };
        Ok(rating)
    }

    fn poster_url(&self, poster_path: &str) -> String {
        format!("{}{}", self.config.image_base_url.trim_end_matches('/'), poster_path)
    }
}

fn tv_rating_for_region(ratings: &ContentRatings, region: &str) -> Option<String> {
    ratings
        .results
        .iter()
        .find(|entry| entry.iso_3166_1 == region)
        .map(|entry| entry.rating.clone())
        .filter(|rating| !rating.is_empty())
}

fn movie_rating_for_region(releases: &ReleaseDates, region: &str) -> Option<String> {
    releases
        .results
        .iter()
        .find(|entry| entry.iso_3166_1 == region)?
        .release_dates
        .iter()
        .find(|release| !release.certification.is_empty())
        .map(|release| release.certification.clone())
}

fn hits_from(search: SearchResponse) -> Vec<CatalogHit> {
    search
        .results
        .into_iter()
        .map(|r| CatalogHit {
            id: r.id,
            name: r.name.or(r.title).unwrap_or_default(),
        })
        .collect()
}

#[async_trait]
impl CatalogService for TmdbClient {
    async fn search(&self, title: &str, kind: MediaKind) -> SourceResult<Vec<CatalogHit>> {
        let query = clean_query_title(title);
        let search: SearchResponse = self
            .get_json(&format!("search/{}", kind.as_path()), &[("query", query.as_str())], true)
            .await?;
        debug!("TMDB {} search '{}': {} results", kind, query, search.results.len());

        Ok(hits_from(search))
    }

    async fn detail(&self, id: u64, kind: MediaKind) -> SourceResult<CatalogDetail> {
        let detail: DetailResponse = self.get_json(&format!("{}/{}", kind.as_path(), id), &[], true).await?;

        // a missing rating does not invalidate the rest of the detail
        let age_rating = match self.region_rating(id, kind).await {
            Ok(rating) => rating,
            Err(e) => {
                debug!("No {} rating for TMDB {} {}: {}", self.config.region, kind, id, e);
                None
            }
        };

        Ok(CatalogDetail {
            overview: detail.overview.unwrap_or_default(),
            poster_url: detail
                .poster_path
                .filter(|p| !p.is_empty())
                .map(|p| self.poster_url(&p)),
            genres: detail
                .genres
                .into_iter()
                .map(|g| CatalogGenre { id: g.id, name: g.name })
                .collect(),
            age_rating,
        })
    }

    async fn credits(&self, id: u64, kind: MediaKind) -> SourceResult<Vec<String>> {
        let credits: CreditsResponse = self.get_json(&format!("{}/{}/credits", kind.as_path(), id), &[], false).await?;
        Ok(credits
            .cast
            .into_iter()
            .map(|c| c.name)
            .filter(|name| !name.trim().is_empty())
            .take(self.config.max_cast)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tv_rating_for_region() {
        let ratings: ContentRatings = serde_json::from_str(
            r#"{"results":[{"iso_3166_1":"US","rating":"TV-14"},{"iso_3166_1":"KR","rating":"15"}]}"#,
        )
        .unwrap();
        assert_eq!(tv_rating_for_region(&ratings, "KR"), Some("15".to_string()));
        assert_eq!(tv_rating_for_region(&ratings, "JP"), None);
    }

    #[test]
    fn test_movie_rating_skips_blank_certifications() {
        let releases: ReleaseDates = serde_json::from_str(
            r#"{"results":[{"iso_3166_1":"KR","release_dates":[{"certification":""},{"certification":"19"}]}]}"#,
        )
        .unwrap();
        assert_eq!(movie_rating_for_region(&releases, "KR"), Some("19".to_string()));
    }

    #[test]
    fn test_search_results_accept_movie_and_tv_shapes() {
        let search: SearchResponse = serde_json::from_str(
            r#"{"results":[{"id":1,"name":"TV Show"},{"id":2,"title":"Film"}]}"#,
        )
        .unwrap();
        let hits = hits_from(search);
        assert_eq!(
            hits,
            vec![
                CatalogHit {
                    id: 1,
                    name: "TV Show".to_string()
                },
                CatalogHit {
                    id: 2,
                    name: "Film".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_search_results_without_results_field() {
        let search: SearchResponse = serde_json::from_str(r#"{"page":1}"#).unwrap();
        assert!(hits_from(search).is_empty());
    }

    #[test]
    fn test_client_requires_api_key() {
        let config = CatalogServiceConfig {
            api_key: None,
            ..CatalogServiceConfig::default()
        };
        assert!(matches!(TmdbClient::new(config), Err(SourceError::NotConfigured(_))));
    }
}
