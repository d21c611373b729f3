//! Photo-platform handle extraction from free text (channel and video
//! descriptions). Three pattern families run independently; ranking and
//! verification decide between the candidates afterwards.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

static PROFILE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)instagram\.com/([a-z0-9_.]+)").expect("valid regex"));

static MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@([A-Za-z0-9_.]+)").expect("valid regex"));

// `\b` keeps words like "big" from reading as an "ig" label.
static LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:instagram|ig)[\s:]+([a-z0-9_.]+)").expect("valid regex")
});

const MIN_HANDLE_LEN: usize = 2;

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn push_handle(handles: &mut BTreeSet<String>, raw: &str) {
    let handle = raw.trim_end_matches('.');
    if handle.len() >= MIN_HANDLE_LEN {
        handles.insert(handle.to_lowercase());
    }
}

/// A standalone `@name` token: not glued to a preceding word or `@` (rules
/// out e-mail addresses) and not followed by one. When the full run is
/// followed by a word char, the token may still end right before an inner
/// period.
fn mention_token<'t>(text: &'t str, at: usize, run_end: usize) -> Option<&'t str> {
    if let Some(prev) = text[..at].chars().next_back() {
        if prev == '@' || is_word_char(prev) {
            return None;
        }
    }

    let start = at + 1;
    let ends_cleanly = |end: usize| {
        text[end..]
            .chars()
            .next()
            .map_or(true, |next| next != '@' && !is_word_char(next))
    };

    if ends_cleanly(run_end) {
        return Some(&text[start..run_end]);
    }
    text[start..run_end]
        .char_indices()
        .rev()
        .filter(|(_, c)| *c == '.')
        .map(|(i, _)| start + i)
        .find(|&end| end > start && ends_cleanly(end))
        .map(|end| &text[start..end])
}

/// Deduplicated, lower-cased candidate handles found in `text`.
pub fn extract_handles(text: &str) -> BTreeSet<String> {
    let mut handles = BTreeSet::new();

    for caps in PROFILE_URL.captures_iter(text) {
        push_handle(&mut handles, &caps[1]);
    }

    for caps in MENTION.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Some(token) = mention_token(text, whole.start(), name.end()) else {
            continue;
        };
        // A period in a mention is usually a domain, not a handle.
        if token.len() >= MIN_HANDLE_LEN && !token.contains('.') {
            handles.insert(token.to_lowercase());
        }
    }

    for caps in LABEL.captures_iter(text) {
        push_handle(&mut handles, &caps[1]);
    }

    handles
}
