//! Text helpers used while importing marks
//!
//! - `generate_slug`: normalized identifier for tags and labels
//! - `tags_from_hash`: `#hashtag` extraction from free text
//! - `smart_label_key`: domain key used to match smart label rules

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

fn hashtag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^\w&/])#([\p{L}\p{N}_-]+)").expect("compile hashtag regex")
    })
}

fn slug_separator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\p{L}\p{N}]+").expect("compile slug regex"))
}

/// Generate a URL-safe slug: lowercase, separator runs collapsed to `-`
pub fn generate_slug(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    slug_separator_regex()
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

/// Extract hashtags from text, in order of appearance
///
/// Duplicates are kept; callers deduplicate by slug.
pub fn tags_from_hash(text: &str) -> Vec<String> {
    hashtag_regex()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Domain key for smart label lookup
///
/// Lowercased host with a leading `www.` removed. Returns `None` when the URL
/// cannot be parsed or has no host.
pub fn smart_label_key(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}
