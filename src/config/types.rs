use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for tab-archiver
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub backend: BackendConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub host: HostConfig,
}

/// What to do with a target whose in-page handshake fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandshakeFailurePolicy {
    /// Post a `Failed` record without a snapshot so the gap shows up in the store
    #[default]
    Report,

    /// Move on to the next target without posting anything
    Skip,
}

/// Crawl timing and failure-handling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Time after navigation commit at which a capture is forced (milliseconds)
    #[serde(rename = "force-capture-timeout-ms", default = "default_force_capture_ms")]
    pub force_capture_timeout_ms: u64,

    /// Delay between load-complete and the normal capture (milliseconds)
    #[serde(rename = "preprocess-delay-ms", default = "default_preprocess_ms")]
    pub preprocess_delay_ms: u64,

    /// Upper bound on the in-page handshake round trip (milliseconds)
    #[serde(rename = "handshake-timeout-ms", default = "default_handshake_ms")]
    pub handshake_timeout_ms: u64,

    #[serde(rename = "handshake-failure", default)]
    pub handshake_failure: HandshakeFailurePolicy,
}

impl CrawlerConfig {
    pub fn force_capture_timeout(&self) -> Duration {
        Duration::from_millis(self.force_capture_timeout_ms)
    }

    pub fn preprocess_delay(&self) -> Duration {
        Duration::from_millis(self.preprocess_delay_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            force_capture_timeout_ms: default_force_capture_ms(),
            preprocess_delay_ms: default_preprocess_ms(),
            handshake_timeout_ms: default_handshake_ms(),
            handshake_failure: HandshakeFailurePolicy::default(),
        }
    }
}

/// Backend store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the article API, e.g. `http://localhost:3000`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Timeout for a single backend request (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_ms")]
    pub request_timeout_ms: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the user agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Built-in HTTP host configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    /// Tab handle the crawl runs in
    #[serde(rename = "tab-id", default = "default_tab_id")]
    pub tab_id: u32,

    /// Timeout for loading one page (milliseconds)
    #[serde(rename = "page-timeout-ms", default = "default_page_timeout_ms")]
    pub page_timeout_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tab_id: default_tab_id(),
            page_timeout_ms: default_page_timeout_ms(),
        }
    }
}

fn default_force_capture_ms() -> u64 {
    20_000
}

fn default_preprocess_ms() -> u64 {
    5_000
}

fn default_handshake_ms() -> u64 {
    10_000
}

fn default_request_ms() -> u64 {
    30_000
}

fn default_tab_id() -> u32 {
    1
}

fn default_page_timeout_ms() -> u64 {
    30_000
}
