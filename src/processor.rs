//! Embedding processor contract.
//!
//! Embedding generation and vector storage live in an external service.
//! The pipeline only submits `{path, name, content}` per changed file and
//! reacts to the distinguished quota failure. Submissions are idempotent per
//! `(source_id, path, checksum)` on the processor side, so a retry after a
//! partial failure does not duplicate data.

use async_trait::async_trait;

use crate::error::SubmitError;

/// One changed file handed to the processor.
#[derive(Debug, Clone)]
pub struct SubmittedFile {
    pub path: String,
    pub name: String,
    pub content: String,
}

#[async_trait]
pub trait EmbeddingProcessor: Send + Sync {
    /// Submit one file for embedding and persistence.
    async fn submit(&self, source_id: &str, file: &SubmittedFile) -> Result<(), SubmitError>;
}
