//! Hand-curated title rules consulted by the resolver.

use serde::{Deserialize, Serialize};

use crate::model::{AgeRating, Genre, MetadataRecord};

/// How a rule matches a cleaned title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TitleMatch {
    Exact(String),
    Prefix(String),
}

impl TitleMatch {
    pub fn matches(&self, title: &str) -> bool {
        match self {
            TitleMatch::Exact(expected) => title == expected,
            TitleMatch::Prefix(prefix) => title.starts_with(prefix.as_str()),
        }
    }
}

/// A title whose metadata is fixed and bypasses every source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionRule {
    pub title: TitleMatch,
    pub record: MetadataRecord,
}

/// Override table plus the titles whose first catalog hit is a known
/// mismatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverRules {
    pub exceptions: Vec<ExceptionRule>,
    /// Titles for which the second catalog candidate is taken when there are
    /// several
    pub second_candidate_titles: Vec<String>,
}

impl Default for ResolverRules {
    fn default() -> Self {
        Self {
            exceptions: vec![ExceptionRule {
                title: TitleMatch::Exact("세계테마기행".to_string()),
                record: MetadataRecord {
                    genre: Some(Genre::Variety),
                    subgenre: "Travel, Documentary".to_string(),
                    description: "단순한 여행 정보 프로그램에서 벗어나, 자유로운 배낭여행자만이 느낄 수 있는 살아있는 체험기를 전하는 다큐멘터리 프로그램".to_string(),
                    thumbnail: "https://image.tmdb.org/t/p/w500/pHC70ke34d0pEOdhcx8lnWhRtqk.jpg".to_string(),
                    age_rating: AgeRating::AllAges,
                    cast: String::new(),
                },
            }],
            second_candidate_titles: vec!["인간극장".to_string()],
        }
    }
}

impl ResolverRules {
    /// Rules with no overrides at all
    pub fn empty() -> Self {
        Self {
            exceptions: Vec::new(),
            second_candidate_titles: Vec::new(),
        }
    }

    /// First matching override, in table order
    pub fn exception_for(&self, title: &str) -> Option<&MetadataRecord> {
        self.exceptions
            .iter()
            .find(|rule| rule.title.matches(title))
            .map(|rule| &rule.record)
    }

    pub fn prefers_second_candidate(&self, title: &str) -> bool {
        self.second_candidate_titles.iter().any(|t| t == title)
    }
}
