//! Keyword-in-context snippet extraction.
//!
//! Strips Markdown structural markup from a matched section, collapses
//! whitespace, and returns a window centered on the first literal
//! occurrence of the query. The window's first and last words are trimmed
//! away so a truncated partial word never shows.

use regex::Regex;

pub const DEFAULT_SNIPPET_LENGTH: usize = 200;

/// Build a display snippet for one match.
pub fn extract_snippet(content: &str, query: &str, max_length: usize) -> String {
    let stripped = strip_markdown(content);
    let collapsed = collapse_whitespace(&stripped);

    if query.is_empty() {
        return take_prefix(&collapsed, max_length);
    }

    // Case-sensitive, literal.
    let Some(pos) = collapsed.find(query) else {
        return take_prefix(&collapsed, max_length);
    };

    let center = pos + query.len() / 2;
    let half = max_length / 2;
    let start = floor_char_boundary(&collapsed, center.saturating_sub(half));
    let end = ceil_char_boundary(&collapsed, (center + half).min(collapsed.len()));
    trim_edge_words(&collapsed[start..end])
}

/// Remove heading markers and inline-code backticks; the snippet shows
/// prose, not markup.
fn strip_markdown(content: &str) -> String {
    let without_headings = match Regex::new(r"(?m)^\s{0,3}#{1,6}\s*") {
        Ok(re) => re.replace_all(content, "").into_owned(),
        Err(_) => content.to_string(),
    };
    without_headings.replace('`', "")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn take_prefix(text: &str, max_length: usize) -> String {
    if text.len() <= max_length {
        return text.to_string();
    }
    let end = floor_char_boundary(text, max_length);
    text[..end].to_string()
}

/// Drop the first and last whitespace-delimited word whenever the window
/// holds more than 3 words, so edge truncation never shows partial words.
fn trim_edge_words(window: &str) -> String {
    let words: Vec<&str> = window.split_whitespace().collect();
    if words.len() > 3 {
        words[1..words.len() - 1].join(" ")
    } else {
        words.join(" ")
    }
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}
