//! Completion service backed by a chat model
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::{CompletionFields, CompletionRequest, CompletionService};
use crate::error::{SourceError, SourceResult};
use crate::llm::{strip_code_fence, ChatMessage, LLM};
use crate::model::AgeRating;

/// Answers that mean "no information"
const PLACEHOLDERS: &[&str] = &["정보 없음", "정보없음", "비어 있음", "없음", "unknown", "n/a", "none", "null", "-"];

const SYSTEM_PROMPT: &str = "You fill in missing metadata for Korean IPTV programs. \
Answer with a single JSON object and nothing else. Use an empty string for anything you do not know.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Genre,
    Subgenre,
    Description,
    Thumbnail,
    AgeRating,
    Cast,
}

fn field_for_key(key: &str) -> Option<Field> {
    let key = key
        .trim()
        .trim_start_matches(|c: char| c == '-' || c == '*' || c.is_whitespace())
        .trim_end_matches('*')
        .trim()
        .to_lowercase();
    match key.as_str() {
        "genre" | "장르" => Some(Field::Genre),
        "subgenre" | "sub_genre" | "서브장르" => Some(Field::Subgenre),
        "description" | "desc" | "설명" => Some(Field::Description),
        "thumbnail" | "썸네일" => Some(Field::Thumbnail),
        "age_rating" | "age rating" | "연령등급" => Some(Field::AgeRating),
        "cast" | "출연진" => Some(Field::Cast),
        _ => None,
    }
}

fn clean_value(raw: &str) -> String {
    let value = raw
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '`')
        .trim();
    if PLACEHOLDERS.iter().any(|p| value.eq_ignore_ascii_case(p)) {
        String::new()
    } else {
        value.to_string()
    }
}

fn json_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(json_text)
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn set_field(fields: &mut CompletionFields, field: Field, raw: &str) {
    let value = clean_value(raw);
    match field {
        Field::Genre => fields.genre = value,
        Field::Subgenre => fields.subgenre = value,
        Field::Description => fields.description = value,
        Field::Thumbnail => {
            fields.thumbnail = if value.starts_with("http://") || value.starts_with("https://") {
                value
            } else {
                String::new()
            }
        }
        Field::AgeRating => fields.age_rating = value,
        Field::Cast => fields.cast = value,
    }
}

/// Parse a model answer: a JSON object first, then `key: value` lines
pub fn parse_completion(content: &str) -> CompletionFields {
    let body = strip_code_fence(content);
    let mut fields = CompletionFields::default();

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for (key, value) in &map {
            if let Some(field) = field_for_key(key) {
                set_field(&mut fields, field, &json_text(value));
            }
        }
        return fields;
    }

    for line in body.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if let Some(field) = field_for_key(key) {
            set_field(&mut fields, field, value);
        }
    }
    fields
}

/// Build the user prompt for one title
pub fn build_completion_prompt(request: &CompletionRequest) -> String {
    fn known(value: &str) -> &str {
        if value.trim().is_empty() {
            "(empty)"
        } else {
            value
        }
    }

    let genre = request.genre.map(|g| g.as_str()).unwrap_or("(empty)");
    let mut prompt = format!(
        "Program title: {}\n\
         genre: {}\n\
         subgenre: {}\n\
         description: {}\n\
         thumbnail: {}\n\
         age_rating: {}\n\
         cast: {}\n\n\
         Fill in every empty field.\n",
        request.title,
        genre,
        known(&request.subgenre),
        known(&request.description),
        known(&request.thumbnail),
        known(&request.age_rating),
        known(&request.cast),
    );

    if request.genre.is_none() && !request.genre_choices.is_empty() {
        let choices: Vec<&str> = request.genre_choices.iter().map(|g| g.as_str()).collect();
        prompt.push_str(&format!("- genre must be exactly one of: {}\n", choices.join(", ")));
    }
    if !request.allowed_subgenres.is_empty() {
        prompt.push_str(&format!(
            "- subgenre must use only these values, comma-separated: {}\n",
            request.allowed_subgenres.join(", ")
        ));
    }
    let tiers: Vec<&str> = AgeRating::ALL.iter().map(|r| r.as_str()).collect();
    prompt.push_str(&format!("- age_rating must be one of: {}\n", tiers.join(", ")));
    prompt.push_str(
        "- thumbnail must be a real image URL starting with https://; leave it empty rather than inventing one\n\
         - description must be written in Korean\n\
         - cast names must be written in Korean (Tom Cruise -> 톰 크루즈), comma-separated\n\n\
         Respond as JSON with the keys genre, subgenre, description, thumbnail, age_rating, cast.",
    );
    prompt
}

fn build_localize_prompt(names: &[String]) -> String {
    let list: Vec<String> = names.iter().map(|n| format!("- {}", n)).collect();
    format!(
        "Translate these names into their usual Korean spelling.\n\
         Keep the original order and count. If a name cannot be translated, repeat it unchanged.\n\
         Output one line, names separated by \", \", with no explanation.\n\n{}",
        list.join("\n")
    )
}

/// Split a one-line translation answer and check it lines up with the input
pub fn parse_localized_names(content: &str, expected: usize) -> SourceResult<Vec<String>> {
    let body = strip_code_fence(content);
    let names: Vec<String> = body
        .split([',', '\n'])
        .map(|n| n.trim().trim_start_matches("- ").trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();

    if names.len() != expected {
        return Err(SourceError::Parse(format!(
            "expected {} names, got {}",
            expected,
            names.len()
        )));
    }
    Ok(names)
}

/// [`CompletionService`] over any [`LLM`] provider
#[derive(Clone)]
pub struct LlmCompletion {
    llm: Arc<dyn LLM>,
}

impl LlmCompletion {
    pub fn new(llm: Arc<dyn LLM>) -> Self {
        Self { llm }
    }

    /// Wrap a provider after checking that it answers
    pub async fn connect(llm: Arc<dyn LLM>) -> SourceResult<Self> {
        if !llm.is_available().await {
            return Err(SourceError::Unavailable(format!(
                "LLM provider {} is not available",
                llm.provider_type()
            )));
        }
        Ok(Self::new(llm))
    }
}

#[async_trait]
impl CompletionService for LlmCompletion {
    async fn complete(&self, request: &CompletionRequest) -> SourceResult<CompletionFields> {
        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_completion_prompt(request)),
        ];

        let response = self.llm.chat(messages).await?;
        debug!("Completion for {}: {}", request.title, response.content);

        let fields = parse_completion(&response.content);
        if fields.is_empty() {
            return Err(SourceError::Parse(format!("no usable fields for {}", request.title)));
        }
        Ok(fields)
    }

    async fn localize_names(&self, names: &[String]) -> SourceResult<Vec<String>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let messages = vec![ChatMessage::user(build_localize_prompt(names))];
        let response = self.llm.chat(messages).await?;
        parse_localized_names(&response.content, names.len())
    }
}
