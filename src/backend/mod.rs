//! Backend module: the article store the crawler reads targets from and reports to
//!
//! This module handles:
//! - The read path (`GET /articles`, `GET /article?ids=...`) behind [`TargetSource`]
//! - The write path (`POST /article`) behind [`ResultSink`]
//! - The wire shape of the per-article metadata

mod http;
mod traits;

pub use http::HttpBackend;
pub use traits::{ArticleUpload, BackendError, BackendResult, ResultSink, TargetSource};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Outcome column of an article row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArticleStatus {
    Success,
    Failed,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Failed => "Failed",
        }
    }
}

/// Metadata posted for every captured article
///
/// Serialized as `{timestamp, status, saved, pageStatus, numOfFrames}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleMetadata {
    /// ISO-8601 capture time
    pub timestamp: String,

    pub status: ArticleStatus,

    /// Whether a snapshot is attached
    pub saved: bool,

    /// True when the page was captured after load-complete, false when forced
    pub page_status: bool,

    pub num_of_frames: Option<u32>,
}

impl ArticleMetadata {
    pub fn new(
        at: DateTime<Utc>,
        status: ArticleStatus,
        saved: bool,
        page_status: bool,
        num_of_frames: Option<u32>,
    ) -> Self {
        Self {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            status,
            saved,
            page_status,
            num_of_frames,
        }
    }
}
