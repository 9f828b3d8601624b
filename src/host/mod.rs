//! Host module: the environment's tab, navigation and capture primitives
//!
//! The crawl core never talks to a browser directly. Everything it needs from the
//! environment goes through the [`Host`] trait:
//! - pointing a tab at a URL
//! - two navigation-event streams (committed, load-complete), shared by all tabs and frames
//! - the in-page handshake with injected content logic
//! - frame-count queries and full-page snapshots
//!
//! [`HttpHost`] is a built-in host that emulates a single-frame tab over plain HTTP.

mod events;
mod http_host;
mod mhtml;

pub use events::{FrameEvent, HostEvents, TOP_LEVEL_FRAME};
pub use http_host::{preprocess_document, HttpHost};
pub use mhtml::{encode_mhtml, MHTML_CONTENT_TYPE};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::sync::broadcast;

/// Handle of a browser tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors reported by host primitives
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Unknown tab: {0}")]
    UnknownTab(TabId),

    #[error("No document loaded in tab {0}")]
    NoDocument(TabId),

    #[error("Navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Snapshot failed: {0}")]
    Snapshot(String),
}

/// Result type for host operations
pub type HostResult<T> = Result<T, HostError>;

/// Message sent to the injected in-page logic before capturing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeRequest {
    pub command: String,
}

impl HandshakeRequest {
    /// The `{command: "crawl"}` request
    pub fn crawl() -> Self {
        Self {
            command: "crawl".to_string(),
        }
    }
}

/// Reply from the injected in-page logic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakeResponse {
    /// Preprocessed page payload produced in-page
    pub webpage: serde_json::Value,
}

/// Environment-provided tab primitives
///
/// Implementations must be safe to share across tasks. Event streams are global:
/// every subscriber sees every frame of every tab, and filtering is the caller's job.
#[async_trait]
pub trait Host: Send + Sync {
    /// Instructs the tab to load `url`; returns once the request is issued, not when it loads
    async fn update_tab(&self, tab: TabId, url: &str) -> HostResult<()>;

    /// Subscribes to navigation-committed events
    fn subscribe_committed(&self) -> broadcast::Receiver<FrameEvent>;

    /// Subscribes to load-complete events
    fn subscribe_completed(&self) -> broadcast::Receiver<FrameEvent>;

    /// Request/response exchange with the tab's injected script
    async fn send_message(
        &self,
        tab: TabId,
        request: &HandshakeRequest,
    ) -> HostResult<HandshakeResponse>;

    /// Number of frames currently in the tab
    async fn frame_count(&self, tab: TabId) -> HostResult<u32>;

    /// Serializes the whole page (all frames) into an opaque blob
    async fn save_snapshot(&self, tab: TabId) -> HostResult<Vec<u8>>;
}
