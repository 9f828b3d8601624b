//! Navigation event plumbing shared by host implementations

use crate::host::TabId;
use tokio::sync::broadcast;

/// Frame index of a tab's top-level document
pub const TOP_LEVEL_FRAME: u32 = 0;

/// Capacity of each event channel; slow subscribers skip the oldest events
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A navigation transition of one frame in one tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEvent {
    pub tab: TabId,
    pub frame_id: u32,
    pub url: String,
}

impl FrameEvent {
    pub fn new(tab: TabId, frame_id: u32, url: impl Into<String>) -> Self {
        Self {
            tab,
            frame_id,
            url: url.into(),
        }
    }

    /// Event for the top-level frame of `tab`
    pub fn top_level(tab: TabId, url: impl Into<String>) -> Self {
        Self::new(tab, TOP_LEVEL_FRAME, url)
    }

    pub fn is_top_level(&self) -> bool {
        self.frame_id == TOP_LEVEL_FRAME
    }
}

/// The two host-level event streams
///
/// Emitting with no subscriber is not an error; the event is dropped.
#[derive(Debug, Clone)]
pub struct HostEvents {
    committed: broadcast::Sender<FrameEvent>,
    completed: broadcast::Sender<FrameEvent>,
}

impl HostEvents {
    pub fn new() -> Self {
        let (committed, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (completed, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            committed,
            completed,
        }
    }

    pub fn emit_committed(&self, event: FrameEvent) {
        tracing::trace!("committed: tab={} frame={} {}", event.tab, event.frame_id, event.url);
        let _ = self.committed.send(event);
    }

    pub fn emit_completed(&self, event: FrameEvent) {
        tracing::trace!("completed: tab={} frame={} {}", event.tab, event.frame_id, event.url);
        let _ = self.completed.send(event);
    }

    pub fn subscribe_committed(&self) -> broadcast::Receiver<FrameEvent> {
        self.committed.subscribe()
    }

    pub fn subscribe_completed(&self) -> broadcast::Receiver<FrameEvent> {
        self.completed.subscribe()
    }

    /// Number of live subscriptions across both streams
    pub fn subscriber_count(&self) -> usize {
        self.committed.receiver_count() + self.completed.receiver_count()
    }
}

impl Default for HostEvents {
    fn default() -> Self {
        Self::new()
    }
}
