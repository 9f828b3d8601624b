//! Backend traits and error types
//!
//! This module defines the trait interface for article stores and
//! associated error types.

use crate::backend::ArticleMetadata;
use crate::queue::{Target, TargetFilter};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur talking to the backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Backend returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Could not decode backend response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Invalid backend URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Everything posted for one article
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleUpload {
    /// Article id (upsert key)
    pub id: String,

    pub metadata: ArticleMetadata,

    /// MHTML snapshot, present only when the capture succeeded
    pub snapshot: Option<Vec<u8>>,

    /// In-page handshake payload
    pub webpage: Option<serde_json::Value>,
}

/// Read path: where target lists come from
#[async_trait]
pub trait TargetSource: Send + Sync {
    /// Fetches articles matching a status filter, in backend order
    ///
    /// # Arguments
    ///
    /// * `filter` - Which article rows to list
    /// * `from` - Optional offset into the listing
    /// * `size` - Optional maximum number of rows
    async fn fetch_articles(
        &self,
        filter: TargetFilter,
        from: Option<usize>,
        size: Option<usize>,
    ) -> BackendResult<Vec<Target>>;

    /// Fetches specific articles; the returned order is whatever the backend chooses
    async fn fetch_articles_by_id(&self, ids: &[String]) -> BackendResult<Vec<Target>>;
}

/// Write path: where capture outcomes go
///
/// Posting the same id twice overwrites the earlier row.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn post_article(&self, upload: ArticleUpload) -> BackendResult<()>;
}
