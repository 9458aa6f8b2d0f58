//! Pure text utilities: tokenization, inverted-index abstract reconstruction,
//! lexical relevance scoring, filename sanitization. No I/O.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

/// Scoring weights. These are design constants, not runtime knobs.
const BODY_WEIGHT: f64 = 0.55;
const TITLE_WEIGHT: f64 = 0.25;
const PHRASE_BOOST: f64 = 0.15;
const ABSTRACT_BOOST: f64 = 0.05;

pub const MAX_FILENAME_LEN: usize = 120;

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"[a-z0-9][a-z0-9_-]*").unwrap();
    static ref SPACE_BEFORE_PUNCT_RE: Regex = Regex::new(r"\s+([,.;:!?])").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// Lowercase and split into tokens: letter/digit start, then
/// letters/digits/underscore/hyphen. Duplicates are kept in order.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Token set of `text`; only membership matters for scoring.
pub fn unique_tokens(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// Reconstruct an abstract from OpenAlex's word → positions inverted index.
///
/// Words are placed into a slot array sized by the highest position, unfilled
/// slots are skipped, and any space left hanging before punctuation is
/// collapsed. Anything other than a non-empty object yields "".
pub fn rebuild_abstract(index: &Value) -> String {
    let Some(map) = index.as_object() else {
        return String::new();
    };

    let mut placed: Vec<(usize, &str)> = Vec::new();
    for (word, positions) in map {
        if let Some(positions) = positions.as_array() {
            for position in positions {
                if let Some(position) = position.as_u64() {
                    placed.push((position as usize, word.as_str()));
                }
            }
        }
    }
    if placed.is_empty() {
        return String::new();
    }

    let size = placed.iter().map(|(p, _)| *p).max().unwrap_or(0) + 1;
    let mut slots: Vec<&str> = vec![""; size];
    for (position, word) in placed {
        slots[position] = word;
    }

    let joined = slots
        .into_iter()
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    SPACE_BEFORE_PUNCT_RE.replace_all(&joined, "$1").into_owned()
}

/// Score plus the human-readable tags explaining it.
#[derive(Debug, Clone)]
pub struct Relevance {
    pub score: f64,
    pub reasons: Vec<String>,
}

/// Deterministic lexical relevance of a work against a keyword query.
///
/// Coverage counts the query tokens found in the lowercased title (and title
/// plus abstract for the body figure). The phrase boost requires the query's
/// full token sequence to appear contiguously among the title tokens, so
/// "graph neural network" does not collect it from "Graph Neural Networks".
pub fn relevance(query: &str, title: &str, abstract_text: &str) -> Relevance {
    let query_tokens = unique_tokens(query);
    if query_tokens.is_empty() {
        return Relevance {
            score: 0.0,
            reasons: vec!["empty query tokens".to_string()],
        };
    }

    let title_lower = title.to_lowercase();
    let body_lower = format!("{} {}", title_lower, abstract_text.to_lowercase());

    let title_coverage = coverage(&query_tokens, &title_lower);
    let body_coverage = coverage(&query_tokens, &body_lower);

    let phrase_boost = if title_contains_phrase(query, title) {
        PHRASE_BOOST
    } else {
        0.0
    };
    let abstract_boost = if abstract_text.is_empty() {
        0.0
    } else {
        ABSTRACT_BOOST
    };

    let score = (BODY_WEIGHT * body_coverage + TITLE_WEIGHT * title_coverage
        + phrase_boost
        + abstract_boost)
        .min(1.0);

    let mut reasons = vec![
        format!("title coverage {title_coverage:.2}"),
        format!("body coverage {body_coverage:.2}"),
    ];
    if phrase_boost > 0.0 {
        reasons.push("query phrase in title".to_string());
    }
    if abstract_boost > 0.0 {
        reasons.push("abstract present".to_string());
    }

    Relevance { score, reasons }
}

/// Fraction of query tokens found in the lowercased text.
fn coverage(query_tokens: &HashSet<String>, text_lower: &str) -> f64 {
    let hits = query_tokens
        .iter()
        .filter(|token| text_lower.contains(token.as_str()))
        .count();
    hits as f64 / query_tokens.len() as f64
}

/// True when the query's token sequence appears contiguously in the title's.
fn title_contains_phrase(query: &str, title: &str) -> bool {
    let query_seq = tokenize(query);
    let title_seq = tokenize(title);
    !query_seq.is_empty()
        && title_seq
            .windows(query_seq.len())
            .any(|window| window == query_seq.as_slice())
}

/// Reduce an arbitrary title to a safe ASCII filename stem.
///
/// Unicode is NFKD-decomposed before the non-ASCII strip so accented letters
/// keep their base character rather than vanishing. Whitespace runs collapse
/// to a single space before the character replacement, so tabs and newlines
/// merge instead of each becoming its own underscore.
pub fn sanitize_filename(name: &str, max_len: usize) -> String {
    let ascii: String = name.nfkd().filter(char::is_ascii).collect();
    let collapsed = WHITESPACE_RE.replace_all(&ascii, " ");
    let replaced: String = collapsed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ' ' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let truncated: String = replaced.trim().chars().take(max_len).collect();
    let result = truncated.trim().replace(' ', "_");

    if result.is_empty() {
        "paper".to_string()
    } else {
        result
    }
}

/// Clip to `max_len` characters, marking the cut with an ellipsis.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let mut clipped: String = text.chars().take(max_len.saturating_sub(3)).collect();
        clipped.push_str("...");
        clipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tokenize_basic() {
        assert_eq!(
            tokenize("Graph-based RNA_seq, v2!"),
            vec!["graph-based", "rna_seq", "v2"]
        );
        assert!(tokenize("").is_empty());
        assert!(tokenize("!!! ???").is_empty());
    }

    #[test]
    fn test_tokenize_keeps_duplicates() {
        assert_eq!(tokenize("cat cat dog"), vec!["cat", "cat", "dog"]);
        assert_eq!(unique_tokens("cat cat dog").len(), 2);
    }

    #[test]
    fn test_rebuild_abstract_orders_words() {
        let index = json!({ "The": [0], "cat": [1], "sat.": [2] });
        assert_eq!(rebuild_abstract(&index), "The cat sat.");
    }

    #[test]
    fn test_rebuild_abstract_collapses_space_before_punctuation() {
        let index = json!({ "Go": [0], ",": [1], "see": [2] });
        assert_eq!(rebuild_abstract(&index), "Go, see");
    }

    #[test]
    fn test_rebuild_abstract_skips_gaps() {
        let index = json!({ "first": [0], "last": [5] });
        assert_eq!(rebuild_abstract(&index), "first last");
    }

    #[test]
    fn test_rebuild_abstract_repeated_word() {
        let index = json!({ "the": [0, 2], "in": [1], "end": [3] });
        assert_eq!(rebuild_abstract(&index), "the in the end");
    }

    #[test]
    fn test_rebuild_abstract_degenerate_inputs() {
        assert_eq!(rebuild_abstract(&Value::Null), "");
        assert_eq!(rebuild_abstract(&json!({})), "");
        assert_eq!(rebuild_abstract(&json!({ "word": [] })), "");
        assert_eq!(rebuild_abstract(&json!("not an object")), "");
    }

    #[test]
    fn test_relevance_pinned_coefficients() {
        // Full token coverage, no literal phrase (title says "Networks"),
        // empty abstract: 0.55 * 1.0 + 0.25 * 1.0 = 0.80.
        let r = relevance(
            "graph neural network",
            "Graph Neural Networks for Protein Function",
            "",
        );
        assert!((r.score - 0.80).abs() < 1e-9, "score was {}", r.score);
        assert!(r.reasons.contains(&"title coverage 1.00".to_string()));
        assert!(r.reasons.contains(&"body coverage 1.00".to_string()));
        assert!(!r.reasons.iter().any(|reason| reason.contains("phrase")));
    }

    #[test]
    fn test_relevance_phrase_and_abstract_boosts() {
        // Exact phrase plus a non-matching abstract word:
        // 0.55 + 0.25 + 0.15 + 0.05 = 1.0, capped.
        let r = relevance(
            "graph attention",
            "Graph Attention Networks",
            "We generalise self-attention to graphs.",
        );
        assert!((r.score - 1.0).abs() < 1e-9);
        assert!(r.reasons.contains(&"query phrase in title".to_string()));
        assert!(r.reasons.contains(&"abstract present".to_string()));
    }

    #[test]
    fn test_relevance_empty_query() {
        let r = relevance("?!", "Some Title", "Some abstract");
        assert_eq!(r.score, 0.0);
        assert_eq!(r.reasons, vec!["empty query tokens".to_string()]);
    }

    #[test]
    fn test_relevance_score_bounded() {
        let r = relevance("deep learning", "Deep Learning", "Deep learning survey.");
        assert!(r.score >= 0.0 && r.score <= 1.0);
    }

    #[test]
    fn test_sanitize_filename_strips_accents_and_symbols() {
        assert_eq!(
            sanitize_filename("Déjà Vu: A Study (2023)", MAX_FILENAME_LEN),
            "Deja_Vu__A_Study__2023_"
        );
    }

    #[test]
    fn test_sanitize_filename_collapses_whitespace() {
        assert_eq!(sanitize_filename("a \t\n  b", MAX_FILENAME_LEN), "a_b");
    }

    #[test]
    fn test_sanitize_filename_truncates() {
        let long = "x".repeat(400);
        assert_eq!(sanitize_filename(&long, 120).len(), 120);
    }

    #[test]
    fn test_sanitize_filename_empty_falls_back() {
        assert_eq!(sanitize_filename("", MAX_FILENAME_LEN), "paper");
        assert_eq!(sanitize_filename("漢字", MAX_FILENAME_LEN), "paper");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("0123456789", 8), "01234...");
    }
}
