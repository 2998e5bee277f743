//! Title cleanup helpers for guide listings.

use once_cell::sync::Lazy;
use regex::Regex;

static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>|\[[^\]]*\]|\([^)]*\)|〈[^〉]*〉").unwrap());

static BROADCAST_MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(수목드라마|월화드라마|일일드라마|재방송|특별판|스페셜|본방송|본|재|특집|종영|마지막회|최종화|HD|SD|NEW|다시보기)\b",
    )
    .unwrap()
});

static PART_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+부").unwrap());

static PUNCTUATION_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[“”"':\-|·,~!@#$%^&*+=]+"#).unwrap());

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static HANGUL_THEN_LATIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"([가-힣])\s+([A-Za-z])").unwrap());
static LATIN_THEN_HANGUL: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Za-z])\s+([가-힣])").unwrap());

static EPISODE_KO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:제\s*)?(\d+)[회화]").unwrap());
static EPISODE_EP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bEP\.?\s*(\d+)\b").unwrap());

const MAX_EPISODE_DIGITS: usize = 4;

/// Full title cleanup used for slot titles and cache keys.
///
/// Removes bracketed annotations, broadcast markers (rerun, special, weekday
/// drama labels, quality tags), part markers and punctuation runs, then joins
/// Hangul and Latin runs that are separated only by spaces.
pub fn clean_title(raw: &str) -> String {
    let text = BRACKETED.replace_all(raw, " ");
    let text = BROADCAST_MARKERS.replace_all(&text, " ");
    let text = PART_MARKER.replace_all(&text, " ");
    let text = PUNCTUATION_RUN.replace_all(&text, " ");
    let text = WHITESPACE.replace_all(&text, " ");
    let text = HANGUL_THEN_LATIN.replace_all(text.trim(), "${1}${2}");
    let text = LATIN_THEN_HANGUL.replace_all(&text, "${1}${2}");

    text.trim_matches(|c: char| matches!(c, '(' | ')' | '[' | ']' | '〈' | '〉' | ' '))
        .to_string()
}

/// Lighter cleanup for search queries: annotations, episode tokens and
/// punctuation go, but broadcast markers and script spacing stay.
pub fn clean_query_title(raw: &str) -> String {
    let (text, _) = extract_episode(raw);
    let text = BRACKETED.replace_all(&text, " ");
    let text = PUNCTUATION_RUN.replace_all(&text, " ");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Find an episode token (`12회`, `제12회`, `3화`, `EP 7`, `Ep.7`) and return the
/// title with the token removed together with the episode number.
pub fn extract_episode(title: &str) -> (String, Option<u32>) {
    for pattern in [&*EPISODE_KO, &*EPISODE_EP] {
        for caps in pattern.captures_iter(title) {
            let digits = &caps[1];
            if digits.len() > MAX_EPISODE_DIGITS {
                continue;
            }
            let Ok(number) = digits.parse::<u32>() else {
                continue;
            };
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let mut stripped = String::with_capacity(title.len());
            stripped.push_str(&title[..whole.start()]);
            stripped.push_str(&title[whole.end()..]);
            return (stripped, Some(number));
        }
    }
    (title.to_string(), None)
}

/// Collapse whitespace runs into single spaces and trim
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_title_removes_annotations_and_markers() {
        assert_eq!(clean_title("[HD] 인간극장 (재)"), "인간극장");
        assert_eq!(clean_title("월화드라마 닥터 차정숙 2부"), "닥터 차정숙");
        assert_eq!(clean_title("런닝맨 - 스페셜"), "런닝맨");
        assert_eq!(clean_title("〈특집〉 가요무대"), "가요무대");
        assert_eq!(clean_title("<본> 뉴스 9"), "뉴스 9");
    }

    #[test]
    fn test_clean_title_joins_mixed_scripts() {
        assert_eq!(clean_title("KBS 뉴스"), "KBS뉴스");
        assert_eq!(clean_title("나는 SOLO"), "나는SOLO");
        assert_eq!(clean_title("1박 2일"), "1박 2일");
    }

    #[test]
    fn test_clean_title_keeps_words_containing_marker_syllables() {
        assert_eq!(clean_title("재벌집 막내아들"), "재벌집 막내아들");
        assert_eq!(clean_title("Newsroom"), "Newsroom");
    }

    #[test]
    fn test_clean_title_collapses_punctuation() {
        assert_eq!(clean_title("생생정보: 맛집 | 여행"), "생생정보 맛집 여행");
        assert_eq!(clean_title("  "), "");
    }

    #[test]
    fn test_extract_episode() {
        assert_eq!(
            extract_episode("나 혼자 산다 512회"),
            ("나 혼자 산다 ".to_string(), Some(512))
        );
        assert_eq!(
            extract_episode("슈퍼맨이 돌아왔다 (제12회)"),
            ("슈퍼맨이 돌아왔다 ()".to_string(), Some(12))
        );
        assert_eq!(extract_episode("Friends Ep.3"), ("Friends ".to_string(), Some(3)));
        assert_eq!(extract_episode("드라마 3화"), ("드라마 ".to_string(), Some(3)));
        assert_eq!(extract_episode("인간극장"), ("인간극장".to_string(), None));
    }

    #[test]
    fn test_extract_episode_requires_marker_right_after_digits() {
        assert_eq!(
            extract_episode("오늘의 2 화요일 밤"),
            ("오늘의 2 화요일 밤".to_string(), None)
        );
        assert_eq!(extract_episode("제 7회 가요제").1, Some(7));
    }

    #[test]
    fn test_extract_episode_ignores_long_numbers() {
        assert_eq!(extract_episode("특별 12345회").1, None);
    }

    #[test]
    fn test_clean_query_title() {
        assert_eq!(clean_query_title("[재] 인간극장 (5회)"), "인간극장");
        assert_eq!(clean_query_title("런닝맨 스페셜"), "런닝맨 스페셜");
    }
}
