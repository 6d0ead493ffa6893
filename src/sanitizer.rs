//! Query Sanitizer / Validator
//!
//! Cleans generator output and enforces the read-only contract: exactly one statement,
//! starting with SELECT, touching only the known relations.

use crate::schema;
use lazy_static::lazy_static;
use regex::Regex;
use sqlparser::ast::{visit_relations, SetExpr, Statement};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use std::fmt;
use std::ops::ControlFlow;

/// Queries shorter than this must at least mention a known relation.
pub const MIN_PLAUSIBLE_LEN: usize = 20;

const WRAPPER_MARKERS: [&str; 4] = ["```sql", "```", "SQL query:", "SQL:"];

lazy_static! {
    static ref TABLE_PREFIXED_SNAPSHOTS_RE: Regex =
        Regex::new(r"(?i)(?:table_)+video_snapshots_*").unwrap();
    static ref TABLE_PREFIXED_VIDEOS_RE: Regex = Regex::new(r"(?i)(?:table_)+videos_*").unwrap();
    static ref PADDED_SNAPSHOTS_RE: Regex = Regex::new(r"video_snapshots_{3,}").unwrap();
    static ref PADDED_VIDEOS_RE: Regex = Regex::new(r"videos_{3,}").unwrap();
    static ref FILLER_RUN_RE: Regex = Regex::new(r"_{10,}").unwrap();
}

/// Why a candidate was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    NotReadOnly,
    TooShort,
    RelationOnly,
    MultipleStatements,
    Unparsable(String),
    UnknownRelation(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Empty => write!(f, "empty query"),
            Rejection::NotReadOnly => write!(f, "not a read-only SELECT"),
            Rejection::TooShort => write!(f, "too short and names no known relation"),
            Rejection::RelationOnly => write!(f, "bare relation name without a query"),
            Rejection::MultipleStatements => write!(f, "more than one statement"),
            Rejection::Unparsable(msg) => write!(f, "unparsable: {}", msg),
            Rejection::UnknownRelation(name) => write!(f, "unknown relation '{}'", name),
        }
    }
}

pub type Validation = std::result::Result<String, Rejection>;

#[derive(Debug, Default, Clone, Copy)]
pub struct QuerySanitizer;

impl QuerySanitizer {
    pub fn new() -> Self {
        Self
    }

    /// Clean `raw` and check it. The accepted text is what should be executed.
    pub fn sanitize_and_validate(&self, raw: &str) -> Validation {
        let stripped = strip_wrappers(raw);
        let single = single_statement(&stripped)?;
        let repaired = repair_relation_names(&single);
        self.validate(&repaired)
    }

    /// Contract checks only; no cleaning.
    pub fn validate(&self, sql: &str) -> Validation {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(Rejection::Empty);
        }
        if !starts_with_select(sql) {
            return Err(Rejection::NotReadOnly);
        }
        if sql.chars().count() < MIN_PLAUSIBLE_LEN && !schema::mentions_known_relation(sql) {
            return Err(Rejection::TooShort);
        }
        if is_bare_relation(sql) {
            return Err(Rejection::RelationOnly);
        }
        check_statement(sql)?;
        Ok(sql.to_string())
    }
}

/// Free-function form of the sanitizer.
pub fn sanitize_and_validate(raw: &str) -> Validation {
    QuerySanitizer::new().sanitize_and_validate(raw)
}

/// Remove code fences and leading labels. Text after the last marker is kept.
pub fn strip_wrappers(raw: &str) -> String {
    let mut sql = raw.trim();
    while let Some(rest) = sql.strip_suffix("```") {
        sql = rest.trim_end();
    }
    let mut sql = sql.to_string();
    for marker in WRAPPER_MARKERS {
        if let Some(idx) = sql.rfind(marker) {
            sql = sql[idx + marker.len()..].trim().to_string();
        }
    }
    sql
}

/// Start at the first SELECT and keep one statement. A line break ends the statement;
/// a `;` followed by anything but whitespace means a second statement.
pub fn single_statement(text: &str) -> std::result::Result<String, Rejection> {
    let start = text.to_ascii_uppercase().find("SELECT").unwrap_or(0);
    let text = &text[start..];

    match find_terminator(text) {
        Some((idx, ';')) => {
            if !text[idx + 1..].trim().is_empty() {
                return Err(Rejection::MultipleStatements);
            }
            Ok(text[..idx].trim().to_string())
        }
        Some((idx, _)) => Ok(text[..idx].trim().to_string()),
        None => Ok(text.trim().to_string()),
    }
}

/// First `;` or line break outside a single-quoted literal.
fn find_terminator(text: &str) -> Option<(usize, char)> {
    let mut in_literal = false;
    for (idx, c) in text.char_indices() {
        match c {
            '\'' => in_literal = !in_literal,
            ';' | '\n' | '\r' if !in_literal => return Some((idx, c)),
            _ => {}
        }
    }
    None
}

/// Undo relation-name noise seen in generator output. Idempotent: passes repeat until
/// nothing changes. Every rewrite shortens the text.
pub fn repair_relation_names(sql: &str) -> String {
    let mut current = sql.to_string();
    loop {
        let next = repair_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn repair_pass(sql: &str) -> String {
    let sql = FILLER_RUN_RE.replace_all(sql, "");
    let sql = TABLE_PREFIXED_SNAPSHOTS_RE.replace_all(&sql, schema::VIDEO_SNAPSHOTS);
    let sql = TABLE_PREFIXED_VIDEOS_RE.replace_all(&sql, schema::VIDEOS);
    let sql = PADDED_SNAPSHOTS_RE.replace_all(&sql, schema::VIDEO_SNAPSHOTS);
    PADDED_VIDEOS_RE.replace_all(&sql, schema::VIDEOS).into_owned()
}

fn starts_with_select(sql: &str) -> bool {
    sql.get(..6)
        .map(|head| head.eq_ignore_ascii_case("SELECT"))
        .unwrap_or(false)
}

fn is_bare_relation(sql: &str) -> bool {
    let normalized = sql
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();
    schema::KNOWN_RELATIONS
        .iter()
        .any(|r| normalized == format!("SELECT {}", r.to_uppercase()))
}

fn check_statement(sql: &str) -> std::result::Result<(), Rejection> {
    let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)
        .map_err(|e| Rejection::Unparsable(e.to_string()))?;
    if statements.len() != 1 {
        return Err(Rejection::MultipleStatements);
    }
    let statement = &statements[0];

    match statement {
        Statement::Query(query) => {
            if let SetExpr::Select(select) = query.body.as_ref() {
                if select.into.is_some() {
                    return Err(Rejection::NotReadOnly);
                }
            }
        }
        _ => return Err(Rejection::NotReadOnly),
    }

    let outcome = visit_relations(statement, |name| {
        let relation = name
            .0
            .last()
            .map(|ident| ident.value.clone())
            .unwrap_or_default();
        if schema::is_known_relation(&relation) {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(name.to_string())
        }
    });
    match outcome {
        ControlFlow::Break(name) => Err(Rejection::UnknownRelation(name)),
        ControlFlow::Continue(()) => Ok(()),
    }
}
