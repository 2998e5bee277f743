//! Resolution chain: turns one title and its coarse guide genre into a full
//! [`MetadataRecord`].
//!
//! Sources are consulted in a fixed order (override table, catalog service,
//! web search, completion model) with reclassification and validation
//! between them. Collaborator failures are logged and treated as empty
//! results; `resolve` always returns a record.

pub mod finalize;
pub mod rules;
pub mod subgenre;

pub use rules::{ExceptionRule, ResolverRules, TitleMatch};
pub use subgenre::{keep_allowed, SubgenreValidator};

use futures::future::join;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::model::{split_tags, AgeRating, Genre, MetadataRecord};
use crate::schedule::clean_title;
use crate::sources::{
    CatalogService, CompletionFields, CompletionRequest, CompletionService, MediaKind, SecondaryHit, SecondarySearch,
};
use crate::taxonomy::{GenreTaxonomy, SecondaryClass, LABEL_PERFORMANCE_MUSIC, SUB_CULTURE, SUB_KIDS, SUB_MUSIC_VARIETY};
use finalize::{effective_genre, finalize, Draft};

/// What the catalog service contributed for one title
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CatalogFacts {
    description: String,
    thumbnail: String,
    subgenre: String,
    age_code: String,
    cast: Vec<String>,
}

/// Resolution chain over shared collaborators. Cheap to clone.
#[derive(Clone)]
pub struct Resolver {
    taxonomy: Arc<GenreTaxonomy>,
    rules: Arc<ResolverRules>,
    catalog: Arc<dyn CatalogService>,
    completion: Arc<dyn CompletionService>,
}

impl Resolver {
    pub fn new(
        taxonomy: Arc<GenreTaxonomy>,
        rules: Arc<ResolverRules>,
        catalog: Arc<dyn CatalogService>,
        completion: Arc<dyn CompletionService>,
    ) -> Self {
        Self {
            taxonomy,
            rules,
            catalog,
            completion,
        }
    }

    /// Resolve one title. `source_genre` is the coarse label produced by the
    /// schedule normalizer; `search` is the caller's own session.
    pub async fn resolve<S>(&self, title: &str, source_genre: &str, channel: &str, search: &mut S) -> MetadataRecord
    where
        S: SecondarySearch + ?Sized,
    {
        let name = clean_title(title);

        if let Some(record) = self.rules.exception_for(&name) {
            debug!("{} [{}]: fixed record from override table", name, channel);
            return record.clone();
        }

        if let Some(genre) = self.taxonomy.canonical_genre(source_genre).filter(Genre::is_trivial) {
            return MetadataRecord {
                genre: Some(genre),
                subgenre: genre.as_str().to_string(),
                description: title.to_string(),
                thumbnail: String::new(),
                age_rating: AgeRating::AllAges,
                cast: String::new(),
            };
        }

        let validator = SubgenreValidator::new(&self.taxonomy);

        let facts = self.catalog_lookup(&name, source_genre).await;
        let mut draft = Draft {
            genre: source_genre.trim().to_string(),
            subgenre: facts.subgenre,
            description: facts.description,
            thumbnail: facts.thumbnail,
            age_rating: self.taxonomy.normalize_age_rating(&facts.age_code),
            cast: facts.cast.join(", "),
            secondary_label: String::new(),
        };

        let hit = match search.lookup_genre_and_thumbnail(&name).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!("⚠️ Web search failed for {} [{}]: {}", name, channel, e);
                SecondaryHit::default()
            }
        };
        if draft.thumbnail.is_empty() {
            draft.thumbnail = hit.thumbnail;
        }
        draft.secondary_label = hit.genre_label;

        self.reclassify(&mut draft, &validator);
        self.finalize_cast(&mut draft, &name, search).await;

        draft.subgenre = validator.validate(
            effective_genre(&draft.genre, &self.taxonomy),
            &draft.subgenre,
            &draft.description,
            &draft.secondary_label,
        );

        if self.has_gaps(&draft) {
            self.complete(&mut draft, &name, &validator).await;
        }

        finalize(draft, &self.taxonomy)
    }

    /// Catalog lookup: TV first for Drama, Variety and News labels, movie
    /// first otherwise. The second type is tried when the first has no hits
    /// or fails.
    async fn catalog_lookup(&self, title: &str, source_genre: &str) -> CatalogFacts {
        let tv_first = matches!(
            self.taxonomy.canonical_genre(source_genre),
            Some(Genre::Drama | Genre::Variety | Genre::News)
        );
        let order = if tv_first {
            [MediaKind::Tv, MediaKind::Movie]
        } else {
            [MediaKind::Movie, MediaKind::Tv]
        };

        for kind in order {
            let hits = match self.catalog.search(title, kind).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!("⚠️ Catalog {} search failed for {}: {}", kind, title, e);
                    continue;
                }
            };
            let candidate = match hits.len() {
                0 => continue,
                n if n > 1 && self.rules.prefers_second_candidate(title) => &hits[1],
                _ => &hits[0],
            };

            let (detail, credits) = join(
                self.catalog.detail(candidate.id, kind),
                self.catalog.credits(candidate.id, kind),
            )
            .await;

            let detail = match detail {
                Ok(detail) => detail,
                Err(e) => {
                    warn!("⚠️ Catalog {} detail {} failed for {}: {}", kind, candidate.id, title, e);
                    continue;
                }
            };

            let cast = match credits {
                Ok(names) => names,
                Err(e) => {
                    warn!("⚠️ Catalog credits failed for {}: {}", title, e);
                    Vec::new()
                }
            };

            debug!("{}: catalog {} hit {} ({})", title, kind, candidate.id, candidate.name);
            return CatalogFacts {
                description: detail.overview,
                thumbnail: detail.poster_url.unwrap_or_default(),
                subgenre: self.catalog_subgenre(&detail.genres),
                age_code: detail.age_rating.unwrap_or_default(),
                cast,
            };
        }

        CatalogFacts::default()
    }

    /// Map catalog genre ids to subgenres, falling back to genre names when
    /// no id maps. Duplicates keep their first position.
    fn catalog_subgenre(&self, genres: &[crate::sources::CatalogGenre]) -> String {
        let mut tags: Vec<&str> = genres
            .iter()
            .filter_map(|g| g.id.and_then(|id| self.taxonomy.subgenre_for_external_id(id)))
            .collect();
        if tags.is_empty() {
            tags = genres
                .iter()
                .filter_map(|g| self.taxonomy.subgenre_for_external_name(&g.name))
                .collect();
        }

        let mut unique: Vec<&str> = Vec::with_capacity(tags.len());
        for tag in tags {
            if !unique.contains(&tag) {
                unique.push(tag);
            }
        }
        unique.join(", ")
    }

    fn reclassify(&self, draft: &mut Draft, validator: &SubgenreValidator<'_>) {
        match self.taxonomy.secondary_class(&draft.secondary_label) {
            Some(SecondaryClass::Anime) => {
                draft.genre = Genre::Anime.as_str().to_string();
                draft.subgenre = SUB_KIDS.to_string();
            }
            Some(SecondaryClass::CurrentAffairsCulture) => {
                draft.genre = Genre::Variety.as_str().to_string();
                draft.subgenre = SUB_CULTURE.to_string();
            }
            Some(SecondaryClass::CurrentAffairsNews) => {
                draft.genre = Genre::News.as_str().to_string();
                draft.subgenre = Genre::News.as_str().to_string();
            }
            None => {}
        }

        if draft.genre == LABEL_PERFORMANCE_MUSIC {
            draft.genre = Genre::Variety.as_str().to_string();
            draft.subgenre = SUB_MUSIC_VARIETY.to_string();
        }

        if self.taxonomy.canonical_genre(&draft.genre) == Some(Genre::Movie) {
            draft.subgenre = validator.strip_for_movie(&draft.subgenre);
        }
    }

    async fn finalize_cast<S>(&self, draft: &mut Draft, title: &str, search: &mut S)
    where
        S: SecondarySearch + ?Sized,
    {
        if !draft.cast.is_empty() && draft.cast.is_ascii() {
            let names: Vec<String> = split_tags(&draft.cast).map(str::to_string).collect();
            match self.completion.localize_names(&names).await {
                Ok(localized) => draft.cast = localized.join(", "),
                Err(e) => debug!("Keeping original cast names for {}: {}", title, e),
            }
        }

        if draft.cast.is_empty() {
            match search.lookup_cast(title).await {
                Ok(names) if !names.is_empty() => draft.cast = names.join(", "),
                Ok(_) => {}
                Err(e) => warn!("⚠️ Cast search failed for {}: {}", title, e),
            }
        }
    }

    fn has_gaps(&self, draft: &Draft) -> bool {
        effective_genre(&draft.genre, &self.taxonomy).is_none()
            || draft.description.trim().is_empty()
            || draft.subgenre.is_empty()
            || draft.thumbnail.is_empty()
            || draft.age_rating.is_none()
            || draft.cast.is_empty()
    }

    async fn complete(&self, draft: &mut Draft, title: &str, validator: &SubgenreValidator<'_>) {
        let genre = effective_genre(&draft.genre, &self.taxonomy);
        let request = CompletionRequest {
            title: title.to_string(),
            genre,
            genre_choices: if genre.is_none() {
                Genre::COMPLETABLE.to_vec()
            } else {
                Vec::new()
            },
            subgenre: draft.subgenre.clone(),
            description: draft.description.clone(),
            thumbnail: draft.thumbnail.clone(),
            age_rating: draft.age_rating.map(|r| r.as_str().to_string()).unwrap_or_default(),
            cast: draft.cast.clone(),
            allowed_subgenres: genre.map(|g| self.taxonomy.allowed(g).to_vec()).unwrap_or_default(),
        };

        let fields = match self.completion.complete(&request).await {
            Ok(fields) => fields,
            Err(e) => {
                warn!("⚠️ Completion failed for {}: {}", title, e);
                return;
            }
        };
        self.apply_completion(draft, fields);

        draft.subgenre = validator.validate(
            effective_genre(&draft.genre, &self.taxonomy),
            &draft.subgenre,
            &draft.description,
            &draft.secondary_label,
        );
    }

    fn apply_completion(&self, draft: &mut Draft, fields: CompletionFields) {
        if !fields.genre.is_empty() {
            draft.genre = self.taxonomy.map_source_genre(&fields.genre);
        }
        if !fields.subgenre.is_empty() {
            draft.subgenre = fields.subgenre;
        }
        if !fields.description.is_empty() {
            draft.description = fields.description;
        }
        if !fields.thumbnail.is_empty() {
            draft.thumbnail = fields.thumbnail;
        }
        if let Some(rating) = self.taxonomy.normalize_age_rating(&fields.age_rating) {
            draft.age_rating = Some(rating);
        }
        if !fields.cast.is_empty() {
            draft.cast = fields.cast;
        }
    }
}
