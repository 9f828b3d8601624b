//! HTTP-backed host implementation
//!
//! `HttpHost` emulates browser tabs without a browser:
//! - `update_tab` spawns a GET request for the URL
//! - response headers received → top-level frame *committed*; the document exists
//!   from here on and grows as body chunks arrive
//! - body fully read → top-level frame *load-complete*
//! - the handshake is answered with a preprocessed summary of what has arrived so far
//! - snapshots are MHTML archives of the received bytes, never re-encoded
//!
//! A request that fails before any response (DNS, connection refused, TLS) never
//! commits, exactly like a browser navigation error.

use crate::config::{HostConfig, UserAgentConfig};
use crate::host::{
    encode_mhtml, FrameEvent, HandshakeRequest, HandshakeResponse, Host, HostError, HostEvents,
    HostResult, TabId,
};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::json;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// The document currently loaded (or loading) in a tab
#[derive(Debug, Clone)]
struct LoadedDocument {
    url: String,
    content_type: String,
    /// Body bytes exactly as received; a prefix while the load is still running
    body: Vec<u8>,
}

impl LoadedDocument {
    /// Body decoded for parsing; invalid UTF-8 sequences are replaced
    fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

#[derive(Debug, Default)]
struct TabSlot {
    /// Bumped by every navigation; stale loads compare against it and drop their result
    generation: u64,
    document: Option<LoadedDocument>,
}

/// Host that loads pages over HTTP
pub struct HttpHost {
    client: Client,
    events: HostEvents,
    tabs: Arc<Mutex<HashMap<TabId, TabSlot>>>,
}

impl HttpHost {
    /// Creates a host with its own HTTP client
    ///
    /// # Arguments
    ///
    /// * `user_agent` - Identification sent with every page request
    /// * `config` - Page load settings
    pub fn new(user_agent: &UserAgentConfig, config: &HostConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent.header_value())
            .timeout(Duration::from_millis(config.page_timeout_ms))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            events: HostEvents::new(),
            tabs: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    fn current_document(&self, tab: TabId) -> HostResult<LoadedDocument> {
        let tabs = self.tabs.lock().unwrap_or_else(|e| e.into_inner());
        let slot = tabs.get(&tab).ok_or(HostError::UnknownTab(tab))?;
        slot.document.clone().ok_or(HostError::NoDocument(tab))
    }

    /// Runs `update` on the tab's slot if `generation` is still the tab's latest navigation
    fn with_current<F>(
        tabs: &Mutex<HashMap<TabId, TabSlot>>,
        tab: TabId,
        generation: u64,
        update: F,
    ) -> bool
    where
        F: FnOnce(&mut TabSlot),
    {
        let mut guard = tabs.lock().unwrap_or_else(|e| e.into_inner());
        match guard.get_mut(&tab) {
            Some(slot) if slot.generation == generation => {
                update(slot);
                true
            }
            _ => false,
        }
    }

    fn is_current(tabs: &Mutex<HashMap<TabId, TabSlot>>, tab: TabId, generation: u64) -> bool {
        tabs.lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&tab)
            .map(|slot| slot.generation == generation)
            .unwrap_or(false)
    }
}

#[async_trait]
impl Host for HttpHost {
    async fn update_tab(&self, tab: TabId, url: &str) -> HostResult<()> {
        let generation = {
            let mut tabs = self.tabs.lock().unwrap_or_else(|e| e.into_inner());
            let slot = tabs.entry(tab).or_default();
            slot.generation += 1;
            slot.document = None;
            slot.generation
        };

        let client = self.client.clone();
        let events = self.events.clone();
        let tabs = Arc::clone(&self.tabs);
        let url = url.to_string();

        tokio::spawn(async move {
            let mut response = match client.get(&url).send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("Navigation to {} failed before commit: {}", url, e);
                    return;
                }
            };

            let final_url = response.url().to_string();
            let content_type = response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("text/html")
                .to_string();

            let committed = Self::with_current(&tabs, tab, generation, |slot| {
                slot.document = Some(LoadedDocument {
                    url: final_url.clone(),
                    content_type,
                    body: Vec::new(),
                });
            });
            if !committed {
                return;
            }

            // Error pages commit too
            events.emit_committed(FrameEvent::top_level(tab, final_url.clone()));

            loop {
                match response.chunk().await {
                    Ok(Some(chunk)) => {
                        let appended = Self::with_current(&tabs, tab, generation, |slot| {
                            if let Some(document) = slot.document.as_mut() {
                                document.body.extend_from_slice(&chunk);
                            }
                        });
                        if !appended {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("Body of {} could not be read: {}", final_url, e);
                        return;
                    }
                }
            }

            if Self::is_current(&tabs, tab, generation) {
                events.emit_completed(FrameEvent::top_level(tab, final_url));
            }
        });

        Ok(())
    }

    fn subscribe_committed(&self) -> broadcast::Receiver<FrameEvent> {
        self.events.subscribe_committed()
    }

    fn subscribe_completed(&self) -> broadcast::Receiver<FrameEvent> {
        self.events.subscribe_completed()
    }

    async fn send_message(
        &self,
        tab: TabId,
        request: &HandshakeRequest,
    ) -> HostResult<HandshakeResponse> {
        if request.command != "crawl" {
            return Err(HostError::Handshake(format!(
                "unsupported command '{}'",
                request.command
            )));
        }

        let document = self
            .current_document(tab)
            .map_err(|e| HostError::Handshake(format!("no receiving end: {}", e)))?;

        Ok(HandshakeResponse {
            webpage: preprocess_document(&document.url, &document.text()),
        })
    }

    async fn frame_count(&self, tab: TabId) -> HostResult<u32> {
        let document = self.current_document(tab)?;
        let html = Html::parse_document(&document.text());
        let iframes = Selector::parse("iframe, frame")
            .map(|selector| html.select(&selector).count())
            .unwrap_or(0);
        Ok(1 + iframes as u32)
    }

    async fn save_snapshot(&self, tab: TabId) -> HostResult<Vec<u8>> {
        let document = self
            .current_document(tab)
            .map_err(|e| HostError::Snapshot(e.to_string()))?;

        if !is_html(&document.content_type) {
            return Err(HostError::Snapshot(format!(
                "cannot archive content type '{}'",
                document.content_type
            )));
        }

        let title = page_title(&document.text());
        Ok(encode_mhtml(
            &document.url,
            title.as_deref(),
            &document.content_type,
            &document.body,
            chrono::Utc::now(),
        ))
    }
}

fn is_html(content_type: &str) -> bool {
    let lowered = content_type.to_ascii_lowercase();
    lowered.contains("text/html") || lowered.contains("application/xhtml")
}

fn page_title(body: &str) -> Option<String> {
    let html = Html::parse_document(body);
    let selector = Selector::parse("title").ok()?;
    html.select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
}

/// Builds the handshake payload for a loaded document
///
/// The payload is an opaque summary forwarded to the backend next to the snapshot:
/// the page title, its outgoing links and the length of its visible text.
pub fn preprocess_document(url: &str, body: &str) -> serde_json::Value {
    let html = Html::parse_document(body);

    let title = Selector::parse("title").ok().and_then(|selector| {
        html.select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
    });

    let links: Vec<String> = Selector::parse("a[href]")
        .map(|selector| {
            html.select(&selector)
                .filter_map(|el| el.value().attr("href"))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let text_length = Selector::parse("body")
        .ok()
        .and_then(|selector| html.select(&selector).next())
        .map(|body| {
            body.text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::len)
                .sum::<usize>()
        })
        .unwrap_or(0);

    json!({
        "url": url,
        "title": title,
        "links": links,
        "textLength": text_length,
    })
}
