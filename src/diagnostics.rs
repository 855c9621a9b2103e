//! Readable summaries of catalog error bodies.
//!
//! The catalog answers failures with an HTML error page, a JSON error object or plain text
//! depending on which layer rejected the request. Only the text shown to the user differs.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

fn body_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?is)<body[^>]*>.*</body>").expect("valid regex"))
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^<]+?>").expect("valid regex"))
}

/// Tries the HTML `<body>`, then JSON, then falls back to the raw text.
pub fn describe_failure(body: &str) -> String {
    if let Some(html) = html_body_text(body) {
        return html;
    }
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return serde_json::to_string_pretty(&value).unwrap_or_else(|_| body.trim().to_string());
    }
    body.trim().to_string()
}

fn html_body_text(body: &str) -> Option<String> {
    let matched = body_pattern().find(body)?;
    let stripped = tag_pattern().replace_all(matched.as_str(), " ");
    let lines = stripped
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>();
    if lines.is_empty() {
        return None;
    }
    Some(lines.join("\n"))
}
