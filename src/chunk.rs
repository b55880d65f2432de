//! Paragraph-boundary section splitter.
//!
//! Splits a file's text into [`Section`]s that respect a character limit.
//! Splitting happens on blank-line boundaries so each section stays a
//! coherent run of paragraphs; oversized single paragraphs are hard-split
//! at the nearest newline or space.

use uuid::Uuid;

use crate::models::Section;

/// Upper bound on section size in characters.
pub const MAX_SECTION_CHARS: usize = 2800;

/// Split file content into sections with contiguous indices starting at 0.
/// Always returns at least one section, even for empty content.
pub fn split_sections(file_id: &str, content: &str) -> Vec<Section> {
    if content.trim().is_empty() {
        return vec![make_section(file_id, 0, "")];
    }

    let mut sections = Vec::new();
    let mut buf = String::new();
    let mut index: i64 = 0;

    for para in content.split("\n\n") {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        let would_be = if buf.is_empty() {
            trimmed.len()
        } else {
            buf.len() + 2 + trimmed.len()
        };

        if would_be > MAX_SECTION_CHARS && !buf.is_empty() {
            sections.push(make_section(file_id, index, &buf));
            index += 1;
            buf.clear();
        }

        if trimmed.len() > MAX_SECTION_CHARS {
            // A single paragraph over the limit gets hard-split at the
            // nearest newline or space below the boundary.
            let mut remaining = trimmed;
            while !remaining.is_empty() {
                let limit = floor_char_boundary(remaining, MAX_SECTION_CHARS);
                let split_at = if limit < remaining.len() {
                    remaining[..limit]
                        .rfind('\n')
                        .or_else(|| remaining[..limit].rfind(' '))
                        .map(|pos| pos + 1)
                        .unwrap_or(limit)
                } else {
                    remaining.len()
                };
                sections.push(make_section(file_id, index, remaining[..split_at].trim()));
                index += 1;
                remaining = &remaining[split_at..];
            }
        } else {
            if !buf.is_empty() {
                buf.push_str("\n\n");
            }
            buf.push_str(trimmed);
        }
    }

    if !buf.is_empty() {
        sections.push(make_section(file_id, index, &buf));
    }

    if sections.is_empty() {
        sections.push(make_section(file_id, 0, content.trim()));
    }

    sections
}

fn make_section(file_id: &str, index: i64, content: &str) -> Section {
    Section {
        id: Uuid::new_v4().to_string(),
        file_id: file_id.to_string(),
        section_index: index,
        content: content.to_string(),
        meta: serde_json::json!({ "chars": content.len() }),
    }
}

fn floor_char_boundary(s: &str, mut at: usize) -> usize {
    if at >= s.len() {
        return s.len();
    }
    while at > 0 && !s.is_char_boundary(at) {
        at -= 1;
    }
    at
}
