//! Core data types shared by the normalizer, resolver and persistence layers.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format used for schedule start times, both on the guide page and in the
/// output table.
pub const AIRTIME_FORMAT: &str = "%H:%M:%S";

/// Canonical program genre
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Genre {
    Drama,
    Variety,
    Movie,
    Anime,
    Sports,
    News,
}

impl Genre {
    pub const ALL: [Genre; 6] = [
        Genre::Drama,
        Genre::Variety,
        Genre::Movie,
        Genre::Anime,
        Genre::Sports,
        Genre::News,
    ];

    /// Genres the completion service may pick from when a title has no genre yet
    pub const COMPLETABLE: [Genre; 4] = [Genre::Movie, Genre::Drama, Genre::Variety, Genre::Anime];

    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Drama => "Drama",
            Genre::Variety => "Variety",
            Genre::Movie => "Movie",
            Genre::Anime => "Anime",
            Genre::Sports => "Sports",
            Genre::News => "News",
        }
    }

    /// Parse the English canonical name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Genre> {
        let name = name.trim();
        Genre::ALL
            .iter()
            .copied()
            .find(|g| g.as_str().eq_ignore_ascii_case(name))
    }

    /// Sports and News skip every external source
    pub fn is_trivial(&self) -> bool {
        matches!(self, Genre::Sports | Genre::News)
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four canonical age-rating tiers. Raw provider codes never leave the
/// resolver; they are normalized into one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AgeRating {
    #[default]
    #[serde(rename = "All-Ages")]
    AllAges,
    #[serde(rename = "12+")]
    Twelve,
    #[serde(rename = "15+")]
    Fifteen,
    #[serde(rename = "19+")]
    Nineteen,
}

impl AgeRating {
    pub const ALL: [AgeRating; 4] = [
        AgeRating::AllAges,
        AgeRating::Twelve,
        AgeRating::Fifteen,
        AgeRating::Nineteen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeRating::AllAges => "All-Ages",
            AgeRating::Twelve => "12+",
            AgeRating::Fifteen => "15+",
            AgeRating::Nineteen => "19+",
        }
    }

    /// Parse one of the canonical tier labels exactly as written by `as_str`
    pub fn from_label(label: &str) -> Option<AgeRating> {
        let label = label.trim();
        AgeRating::ALL.iter().copied().find(|r| r.as_str() == label)
    }
}

impl fmt::Display for AgeRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row as delivered by a channel guide source, before any cleanup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    /// `HH:MM:SS`
    pub start_time: String,
    pub raw_title: String,
    pub source_genre: String,
}

impl RawRow {
    pub fn new(start_time: &str, raw_title: &str, source_genre: &str) -> Self {
        Self {
            start_time: start_time.to_string(),
            raw_title: raw_title.to_string(),
            source_genre: source_genre.to_string(),
        }
    }
}

/// One normalized broadcast unit with its computed runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramSlot {
    pub channel: String,
    pub start: NaiveTime,
    /// Cleaned title, episode marker removed
    pub title: String,
    /// Coarse genre label after alias mapping; concatenated for merged slots
    pub source_genre: String,
    pub runtime_minutes: u32,
    pub episode: Option<u32>,
}

impl ProgramSlot {
    pub fn airtime(&self) -> String {
        self.start.format(AIRTIME_FORMAT).to_string()
    }
}

/// Resolved descriptive metadata for one title
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub genre: Option<Genre>,
    /// Comma-joined subgenre tags, or empty
    pub subgenre: String,
    pub description: String,
    pub thumbnail: String,
    pub age_rating: AgeRating,
    /// Comma-joined cast names, or empty
    pub cast: String,
}

impl MetadataRecord {
    pub fn subgenre_tags(&self) -> impl Iterator<Item = &str> {
        split_tags(&self.subgenre)
    }
}

/// One row of the daily output table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRow {
    pub program_id: u64,
    pub channel: String,
    pub airtime: String,
    pub title: String,
    pub episode: Option<u32>,
    pub genre: Option<Genre>,
    pub subgenre: String,
    pub runtime: u32,
    pub description: String,
    pub thumbnail: String,
    pub age_rating: AgeRating,
    pub cast: String,
}

impl OutputRow {
    /// Combine a slot with its metadata. `program_id` is assigned later, at
    /// persistence time.
    pub fn from_slot(slot: &ProgramSlot, record: &MetadataRecord) -> Self {
        Self {
            program_id: 0,
            channel: slot.channel.clone(),
            airtime: slot.airtime(),
            title: slot.title.clone(),
            episode: slot.episode,
            genre: record.genre,
            subgenre: record.subgenre.replace('"', ""),
            runtime: slot.runtime_minutes,
            description: record.description.clone(),
            thumbnail: record.thumbnail.clone(),
            age_rating: record.age_rating,
            cast: record.cast.clone(),
        }
    }
}

/// Split a comma-joined tag list, trimming and skipping blanks
pub fn split_tags(joined: &str) -> impl Iterator<Item = &str> {
    joined.split(',').map(str::trim).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_names_round_trip() {
        for genre in Genre::ALL {
            assert_eq!(Genre::from_name(genre.as_str()), Some(genre));
        }
        assert_eq!(Genre::from_name(" drama "), Some(Genre::Drama));
        assert_eq!(Genre::from_name("DramaComedy"), None);
    }

    #[test]
    fn test_age_rating_labels() {
        assert_eq!(AgeRating::from_label("19+"), Some(AgeRating::Nineteen));
        assert_eq!(AgeRating::from_label("All-Ages"), Some(AgeRating::AllAges));
        assert_eq!(AgeRating::from_label("19"), None);
        assert_eq!(AgeRating::default(), AgeRating::AllAges);
    }

    #[test]
    fn test_output_row_strips_quotes_from_subgenre() {
        let slot = ProgramSlot {
            channel: "KBS1[9]".to_string(),
            start: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            title: "Title".to_string(),
            source_genre: "Drama".to_string(),
            runtime_minutes: 50,
            episode: Some(12),
        };
        let record = MetadataRecord {
            genre: Some(Genre::Drama),
            subgenre: "\"Romance\", Comedy".to_string(),
            ..Default::default()
        };

        let row = OutputRow::from_slot(&slot, &record);
        assert_eq!(row.airtime, "20:00:00");
        assert_eq!(row.subgenre, "Romance, Comedy");
        assert_eq!(row.episode, Some(12));
    }

    #[test]
    fn test_split_tags_skips_blanks() {
        let tags: Vec<&str> = split_tags(" Action, ,Comedy ,").collect();
        assert_eq!(tags, vec!["Action", "Comedy"]);
    }
}
