//! Scripted host and recording sink for crawler unit tests

use crate::backend::{ArticleUpload, BackendError, BackendResult, ResultSink};
use crate::host::{
    FrameEvent, HandshakeRequest, HandshakeResponse, Host, HostError, HostEvents, HostResult,
    TabId,
};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// How a page behaves once navigated to
#[derive(Debug, Clone)]
pub struct PageScript {
    /// Delay until the top-level commit; `None` never commits
    pub commit_after: Option<Duration>,
    /// Delay until load-complete; `None` never completes
    pub load_after: Option<Duration>,
    pub handshake_fails: bool,
    pub snapshot_fails: bool,
    pub frames: Option<u32>,
}

impl Default for PageScript {
    fn default() -> Self {
        Self {
            commit_after: Some(Duration::ZERO),
            load_after: Some(Duration::ZERO),
            handshake_fails: false,
            snapshot_fails: false,
            frames: Some(1),
        }
    }
}

impl PageScript {
    pub fn never_loads() -> Self {
        Self {
            load_after: None,
            ..Self::default()
        }
    }

    pub fn never_commits() -> Self {
        Self {
            commit_after: None,
            load_after: None,
            ..Self::default()
        }
    }

    pub fn snapshot_fails() -> Self {
        Self {
            snapshot_fails: true,
            ..Self::default()
        }
    }

    pub fn handshake_fails() -> Self {
        Self {
            handshake_fails: true,
            ..Self::default()
        }
    }
}

/// In-memory host whose pages follow [`PageScript`]s keyed by URL
#[derive(Default)]
pub struct ScriptedHost {
    events: HostEvents,
    scripts: Mutex<HashMap<String, PageScript>>,
    current: Mutex<HashMap<TabId, String>>,
    navigations: Mutex<Vec<(TabId, String)>>,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, script: PageScript) -> Self {
        self.scripts.lock().unwrap().insert(url.to_string(), script);
        self
    }

    pub fn events(&self) -> &HostEvents {
        &self.events
    }

    pub fn navigations(&self) -> Vec<(TabId, String)> {
        self.navigations.lock().unwrap().clone()
    }

    fn script_for(&self, tab: TabId) -> HostResult<(String, PageScript)> {
        let url = self
            .current
            .lock()
            .unwrap()
            .get(&tab)
            .cloned()
            .ok_or(HostError::NoDocument(tab))?;
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .unwrap_or_default();
        Ok((url, script))
    }

    fn schedule(&self, delay: Option<Duration>, event: FrameEvent, committed: bool) {
        let Some(delay) = delay else {
            return;
        };
        if delay.is_zero() {
            if committed {
                self.events.emit_committed(event);
            } else {
                self.events.emit_completed(event);
            }
            return;
        }
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if committed {
                events.emit_committed(event);
            } else {
                events.emit_completed(event);
            }
        });
    }
}

#[async_trait]
impl Host for ScriptedHost {
    async fn update_tab(&self, tab: TabId, url: &str) -> HostResult<()> {
        self.navigations
            .lock()
            .unwrap()
            .push((tab, url.to_string()));
        self.current.lock().unwrap().insert(tab, url.to_string());

        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_default();
        self.schedule(script.commit_after, FrameEvent::top_level(tab, url), true);
        self.schedule(script.load_after, FrameEvent::top_level(tab, url), false);
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
        _request: &HandshakeRequest,
    ) -> HostResult<HandshakeResponse> {
        let (url, script) = self.script_for(tab)?;
        if script.handshake_fails {
            return Err(HostError::Handshake(
                "Could not establish connection. Receiving end does not exist.".to_string(),
            ));
        }
        Ok(HandshakeResponse {
            webpage: json!({ "url": url }),
        })
    }

    async fn frame_count(&self, tab: TabId) -> HostResult<u32> {
        let (_, script) = self.script_for(tab)?;
        script.frames.ok_or(HostError::UnknownTab(tab))
    }

    async fn save_snapshot(&self, tab: TabId) -> HostResult<Vec<u8>> {
        let (url, script) = self.script_for(tab)?;
        if script.snapshot_fails {
            return Err(HostError::Snapshot("page capture was blocked".to_string()));
        }
        Ok(format!("MHTML {}", url).into_bytes())
    }
}

/// Sink that keeps every upload with the (paused-clock) time it arrived
#[derive(Default)]
pub struct RecordingSink {
    uploads: Mutex<Vec<(Instant, ArticleUpload)>>,
    failing_ids: HashSet<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects posts for `id` with a backend error
    pub fn failing_for(mut self, id: &str) -> Self {
        self.failing_ids.insert(id.to_string());
        self
    }

    pub fn uploads(&self) -> Vec<(Instant, ArticleUpload)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn ids(&self) -> Vec<String> {
        self.uploads()
            .into_iter()
            .map(|(_, upload)| upload.id)
            .collect()
    }
}

#[async_trait]
impl ResultSink for RecordingSink {
    async fn post_article(&self, upload: ArticleUpload) -> BackendResult<()> {
        if self.failing_ids.contains(&upload.id) {
            return Err(BackendError::Status {
                url: "memory://article".to_string(),
                status: 500,
            });
        }
        self.uploads.lock().unwrap().push((Instant::now(), upload));
        Ok(())
    }
}
