//! Hybrid search service.
//!
//! Combines full-text retrieval with the file-metadata join: ranked section
//! matches are grouped into one result per file, in match order, each
//! carrying a keyword-in-context snippet. Retrieval failures surface to the
//! caller; a file missing from the join is silently skipped.

use std::collections::{BTreeSet, HashMap};

use crate::error::SearchError;
use crate::models::{ResultSection, SearchResult};
use crate::snippet::extract_snippet;
use crate::store::SearchIndex;

/// Hard cap on results per request.
pub const MAX_SEARCH_LIMIT: i64 = 20;

pub async fn search_corpus(
    index: &dyn SearchIndex,
    query: &str,
    project_id: &str,
    limit: i64,
    snippet_length: usize,
) -> Result<Vec<SearchResult>, SearchError> {
    // Empty or whitespace query is an empty result set, not an error.
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let limit = limit.clamp(1, MAX_SEARCH_LIMIT);

    let matches = index
        .search(query, project_id, limit)
        .await
        .map_err(|e| SearchError::Backend(e.to_string()))?;

    if matches.is_empty() {
        return Ok(Vec::new());
    }

    // Distinct file ids, sorted, fetched in one join query.
    let file_ids: Vec<String> = matches
        .iter()
        .map(|m| m.file_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let metas = index
        .join_file_metadata(&file_ids)
        .await
        .map_err(|e| SearchError::Backend(e.to_string()))?;
    let meta_by_id: HashMap<&str, &crate::models::FileMeta> =
        metas.iter().map(|m| (m.id.as_str(), m)).collect();

    // Group matches by file, preserving match order for both the result
    // list and each file's sections.
    let mut order: Vec<&str> = Vec::new();
    let mut grouped: HashMap<&str, SearchResult> = HashMap::new();

    for m in &matches {
        let Some(meta) = meta_by_id.get(m.file_id.as_str()) else {
            // No resolvable file for this match; drop it.
            continue;
        };

        let section = ResultSection {
            content: extract_snippet(&m.content, query, snippet_length),
            meta: m.meta.clone(),
        };

        match grouped.get_mut(m.file_id.as_str()) {
            Some(result) => result.sections.push(section),
            None => {
                order.push(m.file_id.as_str());
                grouped.insert(
                    m.file_id.as_str(),
                    SearchResult {
                        path: meta.path.clone(),
                        meta: meta.meta.clone(),
                        source_type: meta.source_type.clone(),
                        source_data: meta.source_data.clone(),
                        score: m.score,
                        sections: vec![section],
                    },
                );
            }
        }
    }

    Ok(order
        .into_iter()
        .filter_map(|id| grouped.remove(id))
        .collect())
}
