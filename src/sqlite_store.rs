//! SQLite-backed store: checksum lookups, local embedding-free indexing,
//! and FTS5 retrieval with the file-metadata join.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::checksum::checksum;
use crate::chunk::split_sections;
use crate::error::SubmitError;
use crate::models::{FileChecksum, FileMeta, SearchMatch, Source};
use crate::processor::{EmbeddingProcessor, SubmittedFile};
use crate::store::{ChecksumStore, SearchIndex};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert the source row so files can reference it.
    pub async fn register_source(&self, project_id: &str, source: &Source) -> Result<()> {
        let source_data = serde_json::to_string(&source.kind)?;
        sqlx::query(
            r#"
            INSERT INTO sources (id, project_id, source_type, source_data, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                project_id = excluded.project_id,
                source_type = excluded.source_type,
                source_data = excluded.source_data
            "#,
        )
        .bind(&source.id)
        .bind(project_id)
        .bind(source.kind.label())
        .bind(&source_data)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ChecksumStore for SqliteStore {
    async fn load_checksums(&self, source_id: &str) -> Result<Vec<FileChecksum>> {
        let rows = sqlx::query("SELECT path, checksum FROM files WHERE source_id = ?")
            .bind(source_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| FileChecksum {
                path: row.get("path"),
                checksum: row.get("checksum"),
            })
            .collect())
    }
}

#[async_trait]
impl SearchIndex for SqliteStore {
    async fn search(&self, query: &str, project_id: &str, limit: i64) -> Result<Vec<SearchMatch>> {
        let rows = sqlx::query(
            r#"
            SELECT s.file_id AS file_id, s.content AS content, s.meta AS meta, rank
            FROM sections_fts
            JOIN sections s ON s.id = sections_fts.section_id
            WHERE sections_fts MATCH ? AND sections_fts.project_id = ?
            ORDER BY rank
            LIMIT ?
            "#,
        )
        .bind(fts_phrase(query))
        .bind(project_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let rank: f64 = row.get("rank");
                let meta: String = row.get("meta");
                SearchMatch {
                    file_id: row.get("file_id"),
                    content: row.get("content"),
                    meta: serde_json::from_str(&meta).unwrap_or_else(|_| serde_json::json!({})),
                    // bm25 rank is lower-is-better; negate so higher = better
                    score: -rank,
                }
            })
            .collect())
    }

    async fn join_file_metadata(&self, file_ids: &[String]) -> Result<Vec<FileMeta>> {
        if file_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; file_ids.len()].join(", ");
        let sql = format!(
            r#"
            SELECT f.id AS id, f.path AS path, f.meta AS meta,
                   s.source_type AS source_type, s.source_data AS source_data
            FROM files f
            JOIN sources s ON s.id = f.source_id
            WHERE f.id IN ({})
            "#,
            placeholders
        );

        let mut q = sqlx::query(&sql);
        for id in file_ids {
            q = q.bind(id);
        }
        let rows = q.fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| {
                let meta: String = row.get("meta");
                let source_data: String = row.get("source_data");
                FileMeta {
                    id: row.get("id"),
                    path: row.get("path"),
                    meta: serde_json::from_str(&meta).unwrap_or_else(|_| serde_json::json!({})),
                    source_type: row.get("source_type"),
                    source_data: serde_json::from_str(&source_data)
                        .unwrap_or_else(|_| serde_json::json!({})),
                }
            })
            .collect())
    }
}

/// Quote the user query as an FTS5 phrase so punctuation cannot be parsed
/// as match syntax.
fn fts_phrase(query: &str) -> String {
    format!("\"{}\"", query.replace('"', "\"\""))
}

/// Embedding-free processor that indexes submitted files straight into the
/// local FTS store. One transaction per file: the old file row, its
/// sections, and their FTS entries are superseded together.
pub struct LocalProcessor {
    pool: SqlitePool,
    project_id: String,
}

impl LocalProcessor {
    pub fn new(pool: SqlitePool, project_id: impl Into<String>) -> Self {
        Self {
            pool,
            project_id: project_id.into(),
        }
    }

    async fn index_file(&self, source_id: &str, file: &SubmittedFile) -> Result<()> {
        let existing_id: Option<String> =
            sqlx::query_scalar("SELECT id FROM files WHERE source_id = ? AND path = ?")
                .bind(source_id)
                .bind(&file.path)
                .fetch_optional(&self.pool)
                .await?;
        let file_id = existing_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let sections = split_sections(&file_id, &file.content);

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM sections_fts WHERE file_id = ?")
            .bind(&file_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sections WHERE file_id = ?")
            .bind(&file_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO files (id, source_id, path, name, content, checksum, meta, created_at)
            VALUES (?, ?, ?, ?, ?, ?, '{}', ?)
            ON CONFLICT(source_id, path) DO UPDATE SET
                name = excluded.name,
                content = excluded.content,
                checksum = excluded.checksum
            "#,
        )
        .bind(&file_id)
        .bind(source_id)
        .bind(&file.path)
        .bind(&file.name)
        .bind(&file.content)
        .bind(checksum(&file.content))
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut *tx)
        .await?;

        for section in &sections {
            sqlx::query(
                "INSERT INTO sections (id, file_id, section_index, content, meta) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&section.id)
            .bind(&section.file_id)
            .bind(section.section_index)
            .bind(&section.content)
            .bind(section.meta.to_string())
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO sections_fts (section_id, file_id, project_id, content) VALUES (?, ?, ?, ?)",
            )
            .bind(&section.id)
            .bind(&section.file_id)
            .bind(&self.project_id)
            .bind(&section.content)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl EmbeddingProcessor for LocalProcessor {
    async fn submit(&self, source_id: &str, file: &SubmittedFile) -> Result<(), SubmitError> {
        self.index_file(source_id, file)
            .await
            .map_err(|e| SubmitError::Other(e.to_string()))
    }
}
