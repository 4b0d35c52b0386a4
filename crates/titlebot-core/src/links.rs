//! Link extraction from free-form chat text.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Word boundaries on both ends keep trailing punctuation (`!`, `)`, `.`)
    // out of the match.
    RE.get_or_init(|| Regex::new(r"(?i)\b(https?://\S*)\b").expect("valid regex"))
}

/// URL-shaped substrings of `text`, in order of appearance. Duplicates are kept.
pub fn candidate_links(text: &str) -> impl Iterator<Item = &str> + '_ {
    link_re().find_iter(text).map(|m| m.as_str())
}

/// Candidate links that parse as URLs. Anything that fails to parse is dropped.
pub fn extract(text: &str) -> impl Iterator<Item = Url> + '_ {
    candidate_links(text).filter_map(|raw| Url::parse(raw).ok())
}
