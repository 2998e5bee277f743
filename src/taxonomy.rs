//! Genre taxonomy: allowed subgenres per genre, description keywords, and the
//! alias tables used to translate guide labels, search labels, external genre
//! ids and raw age-rating codes.
//!
//! Loaded once at startup and shared read-only (`Arc<GenreTaxonomy>`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::model::{AgeRating, Genre};

/// Guide label for concert/music broadcasts, reclassified to Variety
pub const LABEL_PERFORMANCE_MUSIC: &str = "Performance/Music";
/// Legacy genre label reclassified to Variety/Documentary
pub const LABEL_DOCUMENTARY: &str = "Documentary";
/// Legacy genre label reclassified to Variety/Education-Variety
pub const LABEL_EDUCATION: &str = "Education";

pub const SUB_KIDS: &str = "Kids";
pub const SUB_CULTURE: &str = "Culture";
pub const SUB_MUSIC_VARIETY: &str = "Music-Variety";
pub const SUB_EDUCATION_VARIETY: &str = "Education-Variety";
pub const SUB_DOCUMENTARY: &str = "Documentary";
pub const SUB_COMEDY: &str = "Comedy";
pub const SUB_CRIME_THRILLER: &str = "Crime-Thriller";

/// Genre class reported by the secondary web search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecondaryClass {
    #[serde(rename = "Anime")]
    Anime,
    #[serde(rename = "Current-Affairs/Culture")]
    CurrentAffairsCulture,
    #[serde(rename = "Current-Affairs/News")]
    CurrentAffairsNews,
}

impl SecondaryClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecondaryClass::Anime => "Anime",
            SecondaryClass::CurrentAffairsCulture => "Current-Affairs/Culture",
            SecondaryClass::CurrentAffairsNews => "Current-Affairs/News",
        }
    }
}

/// One row of the ordered description-keyword table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub subgenre: String,
    pub keywords: Vec<String>,
}

/// On-disk shape of a taxonomy file. Every section is optional; missing
/// sections keep the built-in defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TaxonomyFile {
    allowed: Option<HashMap<Genre, Vec<String>>>,
    desc_keywords: Option<Vec<KeywordEntry>>,
    source_genre_aliases: Option<HashMap<String, String>>,
    secondary_label_aliases: Option<HashMap<String, SecondaryClass>>,
    external_genre_ids: Option<HashMap<u32, String>>,
    external_genre_names: Option<HashMap<String, String>>,
    age_rating_aliases: Option<HashMap<String, AgeRating>>,
    drama_only_subgenres: Option<Vec<String>>,
    kids_terms: Option<Vec<String>>,
    education_terms: Option<Vec<String>>,
    culture_terms: Option<Vec<String>>,
    not_broadcasting: Option<Vec<String>>,
}

/// Static genre configuration
#[derive(Debug, Clone)]
pub struct GenreTaxonomy {
    allowed: HashMap<Genre, Vec<String>>,
    desc_keywords: Vec<KeywordEntry>,
    source_aliases: HashMap<String, String>,
    secondary_aliases: HashMap<String, SecondaryClass>,
    external_ids: HashMap<u32, String>,
    external_names: HashMap<String, String>,
    age_aliases: HashMap<String, AgeRating>,
    drama_only: Vec<String>,
    kids_terms: Vec<String>,
    education_terms: Vec<String>,
    culture_terms: Vec<String>,
    not_broadcasting: Vec<String>,
}

impl GenreTaxonomy {
    /// Taxonomy with the built-in tables
    pub fn new() -> Self {
        let mut taxonomy = Self {
            allowed: HashMap::new(),
            desc_keywords: Vec::new(),
            source_aliases: HashMap::new(),
            secondary_aliases: HashMap::new(),
            external_ids: HashMap::new(),
            external_names: HashMap::new(),
            age_aliases: HashMap::new(),
            drama_only: Vec::new(),
            kids_terms: Vec::new(),
            education_terms: Vec::new(),
            culture_terms: Vec::new(),
            not_broadcasting: Vec::new(),
        };

        taxonomy.load_default_allowed();
        taxonomy.load_default_keywords();
        taxonomy.load_default_aliases();
        taxonomy.load_default_heuristics();
        taxonomy
    }

    /// Load a JSON taxonomy file on top of the defaults
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("reading taxonomy file {}", path.as_ref().display()))?;
        let taxonomy = Self::from_json(&content)?;
        info!("📚 Loaded genre taxonomy from: {}", path.as_ref().display());
        Ok(taxonomy)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: TaxonomyFile = serde_json::from_str(content).context("parsing taxonomy JSON")?;
        let mut taxonomy = Self::new();

        if let Some(allowed) = file.allowed {
            taxonomy.allowed.extend(allowed);
        }
        if let Some(keywords) = file.desc_keywords {
            taxonomy.desc_keywords = keywords;
        }
        if let Some(aliases) = file.source_genre_aliases {
            taxonomy.source_aliases.extend(aliases);
        }
        if let Some(aliases) = file.secondary_label_aliases {
            taxonomy.secondary_aliases.extend(aliases);
        }
        if let Some(ids) = file.external_genre_ids {
            taxonomy.external_ids = ids;
        }
        if let Some(names) = file.external_genre_names {
            taxonomy.external_names = names;
        }
        if let Some(aliases) = file.age_rating_aliases {
            for (code, rating) in aliases {
                taxonomy.age_aliases.insert(normalize_code(&code), rating);
            }
        }
        if let Some(list) = file.drama_only_subgenres {
            taxonomy.drama_only = list;
        }
        if let Some(terms) = file.kids_terms {
            taxonomy.kids_terms = terms;
        }
        if let Some(terms) = file.education_terms {
            taxonomy.education_terms = terms;
        }
        if let Some(terms) = file.culture_terms {
            taxonomy.culture_terms = terms;
        }
        if let Some(phrases) = file.not_broadcasting {
            taxonomy.not_broadcasting = phrases;
        }

        Ok(taxonomy)
    }

    /// Allowed subgenres for a genre, in prompt order
    pub fn allowed(&self, genre: Genre) -> &[String] {
        self.allowed.get(&genre).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_allowed(&self, genre: Genre, subgenre: &str) -> bool {
        self.allowed(genre).iter().any(|s| s == subgenre)
    }

    /// Resolve a label (English name, or any source alias) to a canonical genre
    pub fn canonical_genre(&self, label: &str) -> Option<Genre> {
        let label = label.trim();
        if label.is_empty() {
            return None;
        }
        Genre::from_name(label).or_else(|| {
            self.source_aliases
                .get(label)
                .and_then(|mapped| Genre::from_name(mapped))
        })
    }

    /// Map guide genre text to a coarse label; unknown text passes through
    pub fn map_source_genre(&self, text: &str) -> String {
        let text = text.trim();
        self.source_aliases
            .get(text)
            .cloned()
            .unwrap_or_else(|| text.to_string())
    }

    pub fn secondary_class(&self, label: &str) -> Option<SecondaryClass> {
        let label = label.trim();
        self.secondary_aliases.get(label).copied().or(match label {
            "Anime" => Some(SecondaryClass::Anime),
            "Current-Affairs/Culture" => Some(SecondaryClass::CurrentAffairsCulture),
            "Current-Affairs/News" => Some(SecondaryClass::CurrentAffairsNews),
            _ => None,
        })
    }

    pub fn subgenre_for_external_id(&self, id: u32) -> Option<&str> {
        self.external_ids.get(&id).map(String::as_str)
    }

    pub fn subgenre_for_external_name(&self, name: &str) -> Option<&str> {
        self.external_names.get(name.trim()).map(String::as_str)
    }

    pub fn desc_keywords(&self) -> &[KeywordEntry] {
        &self.desc_keywords
    }

    /// Translate a raw provider code into a tier. Blank or unmapped codes
    /// return `None`.
    pub fn normalize_age_rating(&self, raw: &str) -> Option<AgeRating> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        AgeRating::from_label(raw).or_else(|| self.age_aliases.get(&normalize_code(raw)).copied())
    }

    /// Subgenres that only make sense for dramas and are rejected for a
    /// Variety guess
    pub fn is_drama_only(&self, subgenre: &str) -> bool {
        self.drama_only.iter().any(|s| s == subgenre)
    }

    pub fn kids_terms(&self) -> &[String] {
        &self.kids_terms
    }

    pub fn education_terms(&self) -> &[String] {
        &self.education_terms
    }

    pub fn culture_terms(&self) -> &[String] {
        &self.culture_terms
    }

    /// True when a cleaned title is one of the guide's "not broadcasting"
    /// placeholders
    pub fn is_not_broadcasting(&self, title: &str) -> bool {
        let probe = sentinel_key(title);
        !probe.is_empty()
            && self
                .not_broadcasting
                .iter()
                .any(|phrase| sentinel_key(phrase) == probe)
    }

    pub fn get_stats(&self) -> TaxonomyStats {
        TaxonomyStats {
            genres: self.allowed.len(),
            total_subgenres: self.allowed.values().map(Vec::len).sum(),
            keyword_entries: self.desc_keywords.len(),
            source_aliases: self.source_aliases.len(),
            age_aliases: self.age_aliases.len(),
        }
    }

    fn load_default_allowed(&mut self) {
        let drama = vec![
            "Foreign-Drama", "US-Drama", "UK-Drama", "Chinese-Drama", "Japanese-Drama",
            "Romance", "Comedy", "Fantasy", "Martial-Arts", "Horror", "Revenge", "Human-Drama",
            "Crime-Thriller", "Medical", "Webtoon-Adaptation", "Politics", "Legal", "Youth",
            "Office", "Historical", "Time-Slip",
        ];
        let variety = vec![
            "Variety", "Documentary", "Travel", "Cooking", "Dating-Reality", "Game", "Talk-Show",
            "Survival", "Observational-Reality", "Sports-Variety", "Education-Variety",
            "Healing-Variety", "Idol", "Music-Survival", "Music-Variety", "Comedy",
            "Family-Variety", "Beauty", "Animal", "Culture",
        ];
        let movie = vec![
            "Drama", "Romance", "Comedy", "Animation", "Thriller", "Mystery", "Adventure",
            "Action", "Fantasy", "SF", "Horror", "Documentary",
        ];

        self.allowed.insert(Genre::Drama, to_strings(&drama));
        self.allowed.insert(Genre::Variety, to_strings(&variety));
        self.allowed.insert(Genre::Movie, to_strings(&movie));
        self.allowed.insert(Genre::Anime, to_strings(&[SUB_KIDS]));
        self.allowed.insert(Genre::News, to_strings(&["News"]));
        self.allowed.insert(Genre::Sports, to_strings(&["Sports"]));
    }

    fn load_default_keywords(&mut self) {
        let table: Vec<(&str, Vec<&str>)> = vec![
            ("Travel", vec!["여행", "배낭", "기행", "travel", "journey"]),
            ("Cooking", vec!["요리", "먹방", "맛집", "셰프", "cooking", "chef"]),
            ("Dating-Reality", vec!["연애", "커플", "소개팅", "dating"]),
            ("Music-Survival", vec!["오디션", "경연", "audition"]),
            ("Music-Variety", vec!["음악", "노래", "가수", "콘서트", "music", "concert"]),
            ("Animal", vec!["동물", "반려", "animal"]),
            ("Documentary", vec!["다큐", "documentary"]),
            ("Talk-Show", vec!["토크", "talk show", "interview"]),
            ("Crime-Thriller", vec!["범죄", "수사", "형사", "살인", "crime", "detective"]),
            ("Medical", vec!["의사", "병원", "medical", "hospital"]),
            ("Legal", vec!["변호사", "법정", "검사", "lawyer", "court"]),
            ("Historical", vec!["조선", "고려", "사극", "historical"]),
            ("Revenge", vec!["복수", "revenge"]),
            ("Romance", vec!["사랑", "로맨스", "romance", "love"]),
            ("Youth", vec!["청춘", "youth"]),
            ("Family-Variety", vec!["가족", "육아", "family"]),
            ("Comedy", vec!["코미디", "개그", "comedy"]),
            (SUB_KIDS, vec!["어린이", "키즈", "kids", "children"]),
        ];

        self.desc_keywords = table
            .into_iter()
            .map(|(subgenre, keywords)| KeywordEntry {
                subgenre: subgenre.to_string(),
                keywords: to_strings(&keywords),
            })
            .collect();
    }

    fn load_default_aliases(&mut self) {
        let source = [
            ("연예/오락", "Variety"),
            ("뉴스/정보", "News"),
            ("만화", "Anime"),
            ("드라마", "Drama"),
            ("예능", "Variety"),
            ("영화", "Movie"),
            ("애니", "Anime"),
            ("Cartoon", "Anime"),
            ("스포츠", "Sports"),
            ("보도", "News"),
            ("공연/음악", LABEL_PERFORMANCE_MUSIC),
            ("다큐", LABEL_DOCUMENTARY),
            ("교육", LABEL_EDUCATION),
        ];
        for (from, to) in source {
            self.source_aliases.insert(from.to_string(), to.to_string());
        }

        let secondary = [
            ("애니", SecondaryClass::Anime),
            ("애니메이션", SecondaryClass::Anime),
            ("시사/교양", SecondaryClass::CurrentAffairsCulture),
            ("시사/보도", SecondaryClass::CurrentAffairsNews),
        ];
        for (from, to) in secondary {
            self.secondary_aliases.insert(from.to_string(), to);
        }

        let ids = [
            (28, "Action"),
            (12, "Adventure"),
            (16, "Animation"),
            (35, "Comedy"),
            (80, "Thriller"),
            (99, "Documentary"),
            (18, "Drama"),
            (14, "Fantasy"),
            (27, "Horror"),
            (9648, "Mystery"),
            (10749, "Romance"),
            (878, "SF"),
            (10770, "Drama"),
            (53, "Thriller"),
            (10752, "Action"),
            (37, "Adventure"),
        ];
        for (id, name) in ids {
            self.external_ids.insert(id, name.to_string());
        }

        let names = [
            ("Action", "Action"),
            ("Thriller", "Thriller"),
            ("Comedy", "Comedy"),
            ("Drama", "Drama"),
            ("Romance", "Romance"),
            ("Fantasy", "Fantasy"),
            ("Science Fiction", "SF"),
            ("Mystery", "Mystery"),
            ("Animation", "Animation"),
            ("Horror", "Horror"),
            ("Documentary", "Documentary"),
            ("Adventure", "Adventure"),
            ("Talk", "Talk-Show"),
            ("Reality", "Variety"),
            ("Sci-Fi & Fantasy", "Fantasy"),
        ];
        for (from, to) in names {
            self.external_names.insert(from.to_string(), to.to_string());
        }

        let ages = [
            ("ALL", AgeRating::AllAges),
            ("전체", AgeRating::AllAges),
            ("전체 이용가", AgeRating::AllAges),
            ("전체관람가", AgeRating::AllAges),
            ("12", AgeRating::Twelve),
            ("12세 이상", AgeRating::Twelve),
            ("15", AgeRating::Fifteen),
            ("15세 이상", AgeRating::Fifteen),
            ("18", AgeRating::Nineteen),
            ("19", AgeRating::Nineteen),
            ("19세 이상", AgeRating::Nineteen),
            ("청소년 관람불가", AgeRating::Nineteen),
        ];
        for (code, rating) in ages {
            self.age_aliases.insert(normalize_code(code), rating);
        }
    }

    fn load_default_heuristics(&mut self) {
        self.drama_only = to_strings(&[
            "Human-Drama", "Romance", "Fantasy", "Martial-Arts", "Horror", "Revenge", "Medical",
            "Webtoon-Adaptation", "Politics", "Legal", "Youth", "Office", "Historical",
            "Time-Slip", SUB_CRIME_THRILLER,
        ]);
        self.kids_terms = to_strings(&["키즈", "어린이", "유아", "동요", "TV만화", "아동", "kids", "children"]);
        self.education_terms = to_strings(&["교육", "학습", "영어", "수학", "학교", "과학", "education"]);
        self.culture_terms = to_strings(&["정보", "생활", "교양", "인문학", "문화", "지식", "culture"]);
        self.not_broadcasting = to_strings(&["방송 시간이 아닙니다", "방송시간이 아닙니다.", "Off Air"]);
    }
}

impl Default for GenreTaxonomy {
    fn default() -> Self {
        Self::new()
    }
}

/// Taxonomy size summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyStats {
    pub genres: usize,
    pub total_subgenres: usize,
    pub keyword_entries: usize,
    pub source_aliases: usize,
    pub age_aliases: usize,
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn sentinel_key(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .flat_map(char::to_lowercase)
        .collect()
}
