//! Capture coordinator
//!
//! Once the race has picked a trigger, this module runs one capture attempt:
//! handshake with the in-page logic, frame count, snapshot, then hands the
//! resulting [`CaptureRecord`] to the result sink. Per-target failures never
//! propagate; they become `Failed` records (or a skip, depending on policy).

use crate::backend::{ArticleMetadata, ArticleStatus, ArticleUpload, ResultSink};
use crate::config::{CrawlerConfig, HandshakeFailurePolicy};
use crate::host::{HandshakeRequest, HandshakeResponse, Host, HostError, TabId};
use crate::queue::Target;
use crate::state::CaptureTrigger;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Outcome column of a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    Success,
    Failed,
}

/// Result of one capture attempt, created here and consumed by the sink
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRecord {
    pub target_id: String,
    pub timestamp: DateTime<Utc>,
    pub outcome: CaptureOutcome,
    pub was_forced: bool,
    pub frame_count: Option<u32>,
    pub snapshot: Option<Vec<u8>>,
    pub webpage: Option<serde_json::Value>,
}

impl CaptureRecord {
    /// True when a snapshot blob is attached
    pub fn saved(&self) -> bool {
        self.snapshot.is_some()
    }

    fn into_upload(self) -> ArticleUpload {
        let status = match self.outcome {
            CaptureOutcome::Success => ArticleStatus::Success,
            CaptureOutcome::Failed => ArticleStatus::Failed,
        };
        let metadata = ArticleMetadata::new(
            self.timestamp,
            status,
            self.saved(),
            !self.was_forced,
            self.frame_count,
        );

        ArticleUpload {
            id: self.target_id,
            metadata,
            snapshot: self.snapshot,
            webpage: self.webpage,
        }
    }
}

/// What happened to one target, for run accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureReport {
    /// A record was written to the sink
    Recorded(CaptureOutcome),

    /// A record was built but the sink rejected it
    SinkFailed(CaptureOutcome),

    /// Handshake failed under the skip policy; nothing was written
    Skipped,
}

/// Runs capture attempts against a host and reports them to a sink
pub struct CaptureCoordinator {
    host: Arc<dyn Host>,
    sink: Arc<dyn ResultSink>,
    handshake_timeout: Duration,
    handshake_failure: HandshakeFailurePolicy,
}

impl CaptureCoordinator {
    pub fn new(host: Arc<dyn Host>, sink: Arc<dyn ResultSink>, config: &CrawlerConfig) -> Self {
        Self {
            host,
            sink,
            handshake_timeout: config.handshake_timeout(),
            handshake_failure: config.handshake_failure,
        }
    }

    /// Captures `target`, currently loaded in `tab`, and sinks the record
    pub async fn capture(
        &self,
        tab: TabId,
        target: &Target,
        trigger: CaptureTrigger,
    ) -> CaptureReport {
        let was_forced = trigger.was_forced();

        let webpage = match self.handshake(tab).await {
            Ok(response) => Some(response.webpage),
            Err(e) => {
                tracing::warn!("Handshake with tab {} failed for {}: {}", tab, target.id, e);
                match self.handshake_failure {
                    HandshakeFailurePolicy::Skip => return CaptureReport::Skipped,
                    HandshakeFailurePolicy::Report => {
                        let frame_count = self.frame_count(tab).await;
                        let record = failed_record(target, was_forced, frame_count, None);
                        return self.sink(record).await;
                    }
                }
            }
        };

        if was_forced {
            tracing::warn!("Page {} not completely loaded, forcing capture", target.id);
        }

        let frame_count = self.frame_count(tab).await;

        tracing::info!("Saving page {} ({})", target.id, target.origin_url);
        let record = match self.host.save_snapshot(tab).await {
            Ok(snapshot) => CaptureRecord {
                target_id: target.id.clone(),
                timestamp: Utc::now(),
                outcome: CaptureOutcome::Success,
                was_forced,
                frame_count,
                snapshot: Some(snapshot),
                webpage,
            },
            Err(e) => {
                tracing::warn!("Saving {} failed: {}", target.id, e);
                failed_record(target, was_forced, frame_count, webpage)
            }
        };

        self.sink(record).await
    }

    async fn handshake(&self, tab: TabId) -> Result<HandshakeResponse, HostError> {
        let request = HandshakeRequest::crawl();
        match tokio::time::timeout(self.handshake_timeout, self.host.send_message(tab, &request))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(HostError::Handshake(format!(
                "no response within {}ms",
                self.handshake_timeout.as_millis()
            ))),
        }
    }

    /// Best-effort frame count; `None` when the host cannot say
    async fn frame_count(&self, tab: TabId) -> Option<u32> {
        match self.host.frame_count(tab).await {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::debug!("Frame count unavailable for tab {}: {}", tab, e);
                None
            }
        }
    }

    async fn sink(&self, record: CaptureRecord) -> CaptureReport {
        let outcome = record.outcome;
        let target_id = record.target_id.clone();

        match self.sink.post_article(record.into_upload()).await {
            Ok(()) => CaptureReport::Recorded(outcome),
            Err(e) => {
                tracing::error!("Posting article {} failed: {}", target_id, e);
                CaptureReport::SinkFailed(outcome)
            }
        }
    }
}

fn failed_record(
    target: &Target,
    was_forced: bool,
    frame_count: Option<u32>,
    webpage: Option<serde_json::Value>,
) -> CaptureRecord {
    CaptureRecord {
        target_id: target.id.clone(),
        timestamp: Utc::now(),
        outcome: CaptureOutcome::Failed,
        was_forced,
        frame_count,
        snapshot: None,
        webpage,
    }
}
