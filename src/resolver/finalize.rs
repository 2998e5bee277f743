use crate::model::{AgeRating, Genre, MetadataRecord};
use crate::schedule::collapse_whitespace;
use crate::taxonomy::{GenreTaxonomy, LABEL_DOCUMENTARY, LABEL_EDUCATION, SUB_DOCUMENTARY, SUB_EDUCATION_VARIETY, SUB_KIDS};

use super::subgenre::keep_allowed;

/// Working state of one resolution. `genre` is a label that may not be
/// canonical yet (merged labels such as "DramaComedy", or legacy labels).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Draft {
    pub genre: String,
    pub subgenre: String,
    pub description: String,
    pub thumbnail: String,
    pub age_rating: Option<AgeRating>,
    pub cast: String,
    /// Raw genre text from the web search
    pub secondary_label: String,
}

/// Canonical genre a working label ends up as, legacy labels included
pub(crate) fn effective_genre(label: &str, taxonomy: &GenreTaxonomy) -> Option<Genre> {
    match label.trim() {
        LABEL_DOCUMENTARY | LABEL_EDUCATION => Some(Genre::Variety),
        other => taxonomy.canonical_genre(other),
    }
}

/// Turn a draft into the record that is cached and persisted
pub(crate) fn finalize(draft: Draft, taxonomy: &GenreTaxonomy) -> MetadataRecord {
    let label = draft.genre.trim();
    let subgenre = draft.subgenre.replace('"', "");

    let (genre, subgenre) = match label {
        LABEL_DOCUMENTARY => (Some(Genre::Variety), SUB_DOCUMENTARY.to_string()),
        LABEL_EDUCATION => (Some(Genre::Variety), SUB_EDUCATION_VARIETY.to_string()),
        other => match taxonomy.canonical_genre(other) {
            Some(Genre::Anime) => (Some(Genre::Anime), SUB_KIDS.to_string()),
            Some(genre) => (Some(genre), keep_allowed(&subgenre, taxonomy.allowed(genre))),
            None => (None, String::new()),
        },
    };

    MetadataRecord {
        genre,
        subgenre,
        description: collapse_whitespace(&draft.description),
        thumbnail: draft.thumbnail.trim().to_string(),
        age_rating: draft.age_rating.unwrap_or_default(),
        cast: draft.cast.trim().to_string(),
    }
}
