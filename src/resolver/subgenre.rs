//! Subgenre validation: literal membership first, then a description keyword
//! guess, then keyword buckets.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{split_tags, Genre};
use crate::taxonomy::{GenreTaxonomy, SUB_COMEDY, SUB_CRIME_THRILLER, SUB_CULTURE, SUB_EDUCATION_VARIETY, SUB_KIDS};

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Validation against one taxonomy
#[derive(Debug, Clone, Copy)]
pub struct SubgenreValidator<'a> {
    taxonomy: &'a GenreTaxonomy,
}

impl<'a> SubgenreValidator<'a> {
    pub fn new(taxonomy: &'a GenreTaxonomy) -> Self {
        Self { taxonomy }
    }

    /// Full two-stage validation for the current genre.
    ///
    /// `secondary_label` is the raw genre text from the web search; it takes
    /// part in the keyword guess and the buckets.
    pub fn validate(&self, genre: Option<Genre>, subgenre: &str, description: &str, secondary_label: &str) -> String {
        let allowed = genre.map(|g| self.taxonomy.allowed(g)).unwrap_or(&[]);

        let kept = keep_allowed(subgenre, allowed);
        if !kept.is_empty() {
            return kept;
        }

        let guess = self.guess_by_description(&format!("{} {}", secondary_label, description));
        let guess = self.exclude_for_genre(genre, &guess);
        if !guess.is_empty() && allowed.iter().any(|a| *a == guess) {
            return guess;
        }

        self.keyword_bucket(genre, &format!("{} {}", description, secondary_label))
    }

    /// First description keyword hit, in table order
    pub fn guess_by_description(&self, text: &str) -> String {
        let cleaned = NON_WORD.replace_all(text, " ").to_lowercase();
        let cleaned = WHITESPACE.replace_all(&cleaned, " ");
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            return String::new();
        }

        for entry in self.taxonomy.desc_keywords() {
            for keyword in &entry.keywords {
                let keyword = keyword.trim().to_lowercase();
                if !keyword.is_empty() && cleaned.contains(&keyword) {
                    return entry.subgenre.clone();
                }
            }
        }
        String::new()
    }

    /// Genre-specific exclusions for a single guessed tag. Comedy always
    /// survives; drama-only tags are dropped for Variety; Drama accepts only
    /// its own list.
    pub fn exclude_for_genre(&self, genre: Option<Genre>, guess: &str) -> String {
        if guess == SUB_COMEDY {
            return guess.to_string();
        }
        match genre {
            Some(Genre::Variety) if self.taxonomy.is_drama_only(guess) => String::new(),
            Some(Genre::Drama) if !self.taxonomy.is_allowed(Genre::Drama, guess) => String::new(),
            _ => guess.to_string(),
        }
    }

    /// Kids, education and general-knowledge buckets. Only the first bucket
    /// with a matching term decides, even when its genre condition fails.
    pub fn keyword_bucket(&self, genre: Option<Genre>, text: &str) -> String {
        let text = text.to_lowercase();
        let hit = |terms: &[String]| terms.iter().any(|t| !t.is_empty() && text.contains(&t.to_lowercase()));

        if hit(self.taxonomy.kids_terms()) {
            if genre == Some(Genre::Anime) {
                SUB_KIDS.to_string()
            } else {
                String::new()
            }
        } else if hit(self.taxonomy.education_terms()) {
            if genre == Some(Genre::Variety) {
                SUB_EDUCATION_VARIETY.to_string()
            } else {
                String::new()
            }
        } else if hit(self.taxonomy.culture_terms()) {
            if genre == Some(Genre::Variety) {
                SUB_CULTURE.to_string()
            } else {
                String::new()
            }
        } else {
            String::new()
        }
    }

    /// Movies never carry a Variety subgenre (or the crime-thriller drama
    /// tag); the whole value is compared, not its tokens
    pub fn strip_for_movie(&self, subgenre: &str) -> String {
        let value = subgenre.trim();
        if value == SUB_CRIME_THRILLER || self.taxonomy.is_allowed(Genre::Variety, value) {
            String::new()
        } else {
            subgenre.to_string()
        }
    }
}

/// Keep tags that are literal members of `allowed`, first occurrence order
pub fn keep_allowed(subgenre: &str, allowed: &[String]) -> String {
    let mut kept: Vec<&str> = Vec::new();
    for tag in split_tags(subgenre) {
        if allowed.iter().any(|a| a == tag) && !kept.contains(&tag) {
            kept.push(tag);
        }
    }
    kept.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxonomy() -> GenreTaxonomy {
        GenreTaxonomy::new()
    }

    #[test]
    fn test_keep_allowed_filters_and_dedupes() {
        let tax = taxonomy();
        let allowed = tax.allowed(Genre::Drama);
        assert_eq!(keep_allowed("Romance, Action, Romance, Comedy", allowed), "Romance, Comedy");
        assert_eq!(keep_allowed("Action", allowed), "");
        assert_eq!(keep_allowed("", allowed), "");
    }

    #[test]
    fn test_rejected_tag_falls_through_to_description_guess() {
        let tax = taxonomy();
        let validator = SubgenreValidator::new(&tax);

        let result = validator.validate(Some(Genre::Drama), "Action", "형사가 연쇄 살인 사건을 수사한다.", "");
        assert_eq!(result, "Crime-Thriller");
    }

    #[test]
    fn test_guess_uses_table_order() {
        let tax = taxonomy();
        let validator = SubgenreValidator::new(&tax);

        // both Travel and Cooking keywords appear; Travel comes first
        assert_eq!(validator.guess_by_description("맛집을 찾아 떠나는 여행!"), "Travel");
        assert_eq!(validator.guess_by_description("..."), "");
    }

    #[test]
    fn test_variety_rejects_drama_only_guess() {
        let tax = taxonomy();
        let validator = SubgenreValidator::new(&tax);

        assert_eq!(validator.exclude_for_genre(Some(Genre::Variety), "Romance"), "");
        assert_eq!(validator.exclude_for_genre(Some(Genre::Variety), "Comedy"), "Comedy");
        assert_eq!(validator.exclude_for_genre(Some(Genre::Drama), "Travel"), "");
        assert_eq!(validator.exclude_for_genre(Some(Genre::Movie), "Romance"), "Romance");
    }

    #[test]
    fn test_keyword_buckets() {
        let tax = taxonomy();
        let validator = SubgenreValidator::new(&tax);

        assert_eq!(validator.keyword_bucket(Some(Genre::Anime), "유아 동요 프로그램"), "Kids");
        assert_eq!(validator.keyword_bucket(Some(Genre::Variety), "유아 동요 프로그램"), "");
        assert_eq!(validator.keyword_bucket(Some(Genre::Variety), "영어 학습"), "Education-Variety");
        assert_eq!(validator.keyword_bucket(Some(Genre::Variety), "생활 정보"), "Culture");
        assert_eq!(validator.keyword_bucket(Some(Genre::Drama), "생활 정보"), "");
    }

    #[test]
    fn test_culture_bucket_via_validate() {
        let tax = taxonomy();
        let validator = SubgenreValidator::new(&tax);

        assert_eq!(validator.validate(Some(Genre::Variety), "", "알찬 생활 정보", ""), "Culture");
        assert_eq!(validator.validate(None, "Romance", "", ""), "");
    }

    #[test]
    fn test_strip_for_movie_compares_whole_value() {
        let tax = taxonomy();
        let validator = SubgenreValidator::new(&tax);

        assert_eq!(validator.strip_for_movie("Travel"), "");
        assert_eq!(validator.strip_for_movie("Crime-Thriller"), "");
        assert_eq!(validator.strip_for_movie("Action, Comedy"), "Action, Comedy");
    }
}
