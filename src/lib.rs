//! tab-archiver: sequential page archival through a browser tab
//!
//! This crate drives a single browser tab through an ordered list of target pages,
//! decides for each one when the page is ready to capture, takes a full offline
//! snapshot and reports the outcome to a backend store.

pub mod backend;
pub mod config;
pub mod crawler;
pub mod host;
pub mod output;
pub mod queue;
pub mod state;

use thiserror::Error;

/// Main error type for tab-archiver operations
#[derive(Debug, Error)]
pub enum ArchiverError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Backend(#[from] backend::BackendError),

    #[error("Host error: {0}")]
    Host(#[from] host::HostError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tab {0} is already leased by another crawl run")]
    TabBusy(host::TabId),

    #[error("Invalid run transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RunStatus,
        to: state::RunStatus,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for tab-archiver operations
pub type Result<T> = std::result::Result<T, ArchiverError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlRun, StopHandle};
pub use queue::{Target, TargetFilter, TargetQueue};
pub use state::{CaptureState, RunStatus};
