use anyhow::Result;
use sqlx::SqlitePool;

/// Create the schema if it does not exist. Safe to run on every startup.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sources (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            source_type TEXT NOT NULL,
            source_data TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            id TEXT PRIMARY KEY,
            source_id TEXT NOT NULL,
            path TEXT NOT NULL,
            name TEXT NOT NULL,
            content TEXT NOT NULL,
            checksum TEXT NOT NULL,
            meta TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL,
            UNIQUE(source_id, path),
            FOREIGN KEY (source_id) REFERENCES sources(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sections (
            id TEXT PRIMARY KEY,
            file_id TEXT NOT NULL,
            section_index INTEGER NOT NULL,
            content TEXT NOT NULL,
            meta TEXT NOT NULL DEFAULT '{}',
            UNIQUE(file_id, section_index),
            FOREIGN KEY (file_id) REFERENCES files(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // FTS5 CREATE is not idempotent natively, so check first
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='sections_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE sections_fts USING fts5(
                section_id UNINDEXED,
                file_id UNINDEXED,
                project_id UNINDEXED,
                content
            )
            "#,
        )
        .execute(pool)
        .await?;
    }

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_source_id ON files(source_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sections_file_id ON sections(file_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sources_project_id ON sources(project_id)")
        .execute(pool)
        .await?;

    Ok(())
}
