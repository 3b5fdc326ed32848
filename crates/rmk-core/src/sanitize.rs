//! Text sanitization used before embedding, and log-line redaction used
//! before any error detail reaches a log sink.

use std::sync::OnceLock;

/// Strips null bytes, collapses whitespace runs, and truncates to
/// `max_chars`. Applied to any text before it is sent to the embedder.
#[must_use]
pub fn sanitize_for_embedding(text: &str) -> String {
    const MAX_CHARS: usize = 8000;
    let no_nulls: String = text.chars().filter(|c| *c != '\0').collect();
    let collapsed = collapse_whitespace(&no_nulls);
    collapsed.chars().take(MAX_CHARS).collect()
}

/// Lowercases, strips `?!.,` anywhere in the string, and collapses
/// whitespace — used for the pre-cortex semantic-cache exact key and the
/// speculation prefix comparison. Two queries differing only in
/// punctuation or whitespace normalize to the same key.
#[must_use]
pub fn normalize_query(query: &str) -> String {
    let lowered = query.to_lowercase();
    let no_punct: String = lowered.chars().filter(|c| !matches!(c, '?' | '!' | '.' | ',')).collect();
    collapse_whitespace(no_punct.trim())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

const STOP_WORDS: &[&str] = &[
    "what", "is", "my", "the", "a", "an", "of", "for", "in", "on", "at", "to", "do", "does",
    "did", "can", "could", "who", "where", "when", "why", "how", "tell", "me", "about", "know",
];

/// Stop-word query cleaner used only by the text-search fallback: lowercases,
/// strips punctuation, removes stop words, joins tokens of length >= 2.
#[must_use]
pub fn clean_query_for_text_search(query: &str) -> String {
    let lowered = query.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| !matches!(c, '?' | '!' | '.' | ',' | '"' | '\''))
        .collect();
    stripped
        .split_whitespace()
        .filter(|tok| tok.len() >= 2 && !STOP_WORDS.contains(tok))
        .collect::<Vec<_>>()
        .join(" ")
}

fn redaction_patterns() -> &'static [(regex::Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(regex::Regex, &'static str)>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            vec![
                (
                    regex::Regex::new(r"(?i)(password|passwd|pwd)\s*[:=]\s*\S+").unwrap(),
                    "$1=[REDACTED]",
                ),
                (
                    regex::Regex::new(r"(?i)(token|secret|api[_-]?key)\s*[:=]\s*\S+").unwrap(),
                    "$1=[REDACTED]",
                ),
                (
                    regex::Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap(),
                    "[REDACTED_EMAIL]",
                ),
                (
                    regex::Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap(),
                    "[REDACTED_IP]",
                ),
                (
                    regex::Regex::new(r"(?m)^\s*at .+\(.+:\d+:\d+\)\s*$").unwrap(),
                    "[REDACTED_STACK_FRAME]",
                ),
            ]
        })
        .as_slice()
}

/// Redacts passwords, tokens, emails, IPs, and stack frames from a log line
/// before it is emitted. Applied at the log-sink boundary so internal error
/// values still carry full detail for the opaque-reference-ID lookup path.
#[must_use]
pub fn redact_for_log(line: &str) -> String {
    let mut out = line.to_string();
    for (re, replacement) in redaction_patterns() {
        out = re.replace_all(&out, *replacement).into_owned();
    }
    out
}
