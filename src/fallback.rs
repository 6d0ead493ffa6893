//! Rule-Based Generator
//!
//! Deterministic matcher over the fixed set of Russian question shapes the bot is asked.
//! Rules are evaluated in priority order and the first one that can build a complete query
//! wins. A rule whose phrase matches but whose captures are missing or malformed is skipped.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

/// Query returned for "how many videos total" and whenever nothing else matches.
pub const DEFAULT_QUERY: &str = "SELECT COUNT(*) FROM videos";

/// Genitive month names as they appear in dates ("5 ноября 2025").
pub const MONTHS: [(&str, u32); 12] = [
    ("января", 1),
    ("февраля", 2),
    ("марта", 3),
    ("апреля", 4),
    ("мая", 5),
    ("июня", 6),
    ("июля", 7),
    ("августа", 8),
    ("сентября", 9),
    ("октября", 10),
    ("ноября", 11),
    ("декабря", 12),
];

lazy_static! {
    static ref VIDEO_ID_RE: Regex = Regex::new(r"([a-f0-9-]{36})").unwrap();
    static ref DATE_RE: Regex = Regex::new(
        r"(\d{1,2})\s+(января|февраля|марта|апреля|мая|июня|июля|августа|сентября|октября|ноября|декабря)\s+(\d{4})"
    )
    .unwrap();
    static ref CREATOR_RE: Regex = Regex::new(r"(?i)креатора\s+с\s+id\s+(\S+)").unwrap();
    static ref MORE_THAN_RE: Regex = Regex::new(r"больше\s+(\d[\d\s,]*)").unwrap();
}

type RuleFn = fn(&Question) -> Option<String>;

/// One prioritized template.
pub struct FallbackRule {
    pub name: &'static str,
    build: RuleFn,
}

/// The question in both the original and lower-cased form. Phrase checks run on the
/// lower-cased text; captures that must keep their case read the original.
pub struct Question<'a> {
    original: &'a str,
    lower: String,
}

impl<'a> Question<'a> {
    pub fn new(original: &'a str) -> Self {
        Self {
            original,
            lower: original.to_lowercase(),
        }
    }

    fn has(&self, phrase: &str) -> bool {
        self.lower.contains(phrase)
    }
}

const RULES: &[FallbackRule] = &[
    FallbackRule { name: "total_videos", build: total_videos },
    FallbackRule { name: "video_likes", build: video_likes },
    FallbackRule { name: "views_growth_on_date", build: views_growth_on_date },
    FallbackRule { name: "creator_videos", build: creator_videos },
    FallbackRule { name: "videos_over_views", build: videos_over_views },
    FallbackRule { name: "distinct_videos_growing_on_date", build: distinct_videos_growing_on_date },
];

/// Deterministic, infallible generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedGenerator;

impl RuleBasedGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Build a query for `question`. Always returns a complete SELECT.
    pub fn generate(&self, question: &str) -> String {
        self.generate_with_rule(question).0
    }

    /// Same as [`generate`](Self::generate), also naming the rule that fired
    /// (`"default"` when none did).
    pub fn generate_with_rule(&self, question: &str) -> (String, &'static str) {
        let q = Question::new(question);
        for rule in RULES {
            if let Some(sql) = (rule.build)(&q) {
                debug!("Fallback rule '{}' matched", rule.name);
                return (sql, rule.name);
            }
        }
        debug!("No fallback rule matched, using default count");
        (DEFAULT_QUERY.to_string(), "default")
    }
}

/// Free-function form of the generator.
pub fn generate_fallback(question: &str) -> String {
    RuleBasedGenerator::new().generate(question)
}

fn total_videos(q: &Question) -> Option<String> {
    q.has("сколько всего видео").then(|| DEFAULT_QUERY.to_string())
}

fn video_likes(q: &Question) -> Option<String> {
    if !(q.has("лайков") && q.has("видео")) {
        return None;
    }
    let id = VIDEO_ID_RE.captures(&q.lower)?.get(1)?.as_str();
    Some(format!("SELECT likes_count FROM videos WHERE id = '{}'", id))
}

fn views_growth_on_date(q: &Question) -> Option<String> {
    if !((q.has("выросли") || q.has("прирост")) && q.has("просмотров")) {
        return None;
    }
    let date = parse_russian_date(&q.lower)?;
    Some(format!(
        "SELECT COALESCE(SUM(delta_views_count), 0) FROM video_snapshots WHERE DATE(created_at) = '{}'",
        date
    ))
}

fn creator_videos(q: &Question) -> Option<String> {
    if !q.has("креатора") {
        return None;
    }
    let raw = CREATOR_RE.captures(q.original)?.get(1)?.as_str();
    let token = raw.trim_end_matches(|c: char| matches!(c, '?' | '!' | '.' | ',' | ';' | ':'));
    if token.is_empty() {
        return None;
    }
    Some(format!(
        "SELECT COUNT(*) FROM videos WHERE creator_id = '{}'",
        escape_literal(token)
    ))
}

fn videos_over_views(q: &Question) -> Option<String> {
    if !(q.has("больше") && q.has("просмотров")) {
        return None;
    }
    let raw = MORE_THAN_RE.captures(&q.lower)?.get(1)?.as_str();
    let threshold = parse_grouped_number(raw)?;
    Some(format!(
        "SELECT COUNT(*) FROM videos WHERE views_count > {}",
        threshold
    ))
}

fn distinct_videos_growing_on_date(q: &Question) -> Option<String> {
    if !(q.has("разных видео") && q.has("просмотры")) {
        return None;
    }
    let date = parse_russian_date(&q.lower)?;
    Some(format!(
        "SELECT COUNT(DISTINCT video_id) FROM video_snapshots WHERE DATE(created_at) = '{}' AND delta_views_count > 0",
        date
    ))
}

/// Find "<day> <month> <year>" in lower-cased text and render it as `YYYY-MM-DD`.
/// Impossible calendar dates yield `None`.
pub fn parse_russian_date(lower: &str) -> Option<String> {
    let caps = DATE_RE.captures(lower)?;
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month = month_number(caps.get(2)?.as_str())?;
    let year: i32 = caps.get(3)?.as_str().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.format("%Y-%m-%d").to_string())
}

pub fn month_number(name: &str) -> Option<u32> {
    MONTHS.iter().find(|(m, _)| *m == name).map(|(_, n)| *n)
}

/// "100 000", "100,000" and "100000" all parse to 100000.
pub fn parse_grouped_number(raw: &str) -> Option<u64> {
    let digits: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_videos() {
        assert_eq!(
            generate_fallback("Сколько всего видео есть в системе?"),
            "SELECT COUNT(*) FROM videos"
        );
    }

    #[test]
    fn test_video_likes_with_id() {
        let sql = generate_fallback(
            "Сколько лайков у видео ecd8a4e4-1f24-4b97-a944-35d17078ce7c?",
        );
        assert_eq!(
            sql,
            "SELECT likes_count FROM videos WHERE id = 'ecd8a4e4-1f24-4b97-a944-35d17078ce7c'"
        );
    }

    #[test]
    fn test_video_likes_without_id_falls_through() {
        let (sql, rule) = RuleBasedGenerator::new().generate_with_rule("Сколько лайков у видео?");
        assert_eq!(rule, "default");
        assert_eq!(sql, DEFAULT_QUERY);
    }

    #[test]
    fn test_views_growth_on_date() {
        let sql = generate_fallback("На сколько просмотров в сумме выросли все видео 28 ноября 2025?");
        assert_eq!(
            sql,
            "SELECT COALESCE(SUM(delta_views_count), 0) FROM video_snapshots WHERE DATE(created_at) = '2025-11-28'"
        );
    }

    #[test]
    fn test_views_growth_without_date_is_skipped() {
        let (_, rule) =
            RuleBasedGenerator::new().generate_with_rule("Какой прирост просмотров вчера?");
        assert_eq!(rule, "default");
    }

    #[test]
    fn test_creator_videos() {
        assert_eq!(
            generate_fallback("Сколько видео у креатора с id 123?"),
            "SELECT COUNT(*) FROM videos WHERE creator_id = '123'"
        );
    }

    #[test]
    fn test_creator_token_keeps_case_and_is_escaped() {
        assert_eq!(
            generate_fallback("Сколько видео у креатора с id Ab'C"),
            "SELECT COUNT(*) FROM videos WHERE creator_id = 'Ab''C'"
        );
    }

    #[test]
    fn test_more_than_views() {
        assert_eq!(
            generate_fallback("Сколько видео набрало больше 100000 просмотров?"),
            "SELECT COUNT(*) FROM videos WHERE views_count > 100000"
        );
    }

    #[test]
    fn test_more_than_views_strips_separators() {
        for q in [
            "Сколько видео набрало больше 100 000 просмотров?",
            "Сколько видео набрало больше 100,000 просмотров?",
        ] {
            assert_eq!(
                generate_fallback(q),
                "SELECT COUNT(*) FROM videos WHERE views_count > 100000"
            );
        }
    }

    #[test]
    fn test_distinct_videos_on_date() {
        assert_eq!(
            generate_fallback("Сколько разных видео получали новые просмотры 27 ноября 2025?"),
            "SELECT COUNT(DISTINCT video_id) FROM video_snapshots WHERE DATE(created_at) = '2025-11-27' AND delta_views_count > 0"
        );
    }

    #[test]
    fn test_unknown_question_defaults() {
        assert_eq!(generate_fallback("Привет!"), DEFAULT_QUERY);
        assert_eq!(generate_fallback(""), DEFAULT_QUERY);
    }

    #[test]
    fn test_all_months_pad_days() {
        for (name, number) in MONTHS {
            let first = parse_russian_date(&format!("1 {} 2025", name)).unwrap();
            assert_eq!(first, format!("2025-{:02}-01", number));

            let last = parse_russian_date(&format!("31 {} 2025", name));
            if matches!(number, 1 | 3 | 5 | 7 | 8 | 10 | 12) {
                assert_eq!(last.unwrap(), format!("2025-{:02}-31", number));
            } else {
                assert!(last.is_none(), "31 {} should be rejected", name);
            }
        }
    }

    #[test]
    fn test_grouped_number() {
        assert_eq!(parse_grouped_number("1 000 000 "), Some(1_000_000));
        assert_eq!(parse_grouped_number(" "), None);
        assert_eq!(parse_grouped_number("99999999999999999999999"), None);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let q = "Сколько видео у креатора с id aca1061a9d324ecf8c3fa2bb32d7be63?";
        assert_eq!(generate_fallback(q), generate_fallback(q));
    }
}
