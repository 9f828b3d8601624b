//! Navigation driver
//!
//! Thin layer over the host's navigation primitives:
//! - `navigate` points a tab at a URL (fire-and-forget)
//! - [`Subscription`] holds the two event-stream registrations for one run and
//!   filters them down to the run's tab and its top-level frame
//! - [`TabLease`] gives a run exclusive use of a tab

use crate::host::{FrameEvent, Host, TabId};
use crate::ArchiverError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::OwnedMutexGuard;

/// A top-level navigation signal for the subscribed tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSignal {
    Committed(FrameEvent),
    LoadComplete(FrameEvent),
}

/// Drives tab navigation and hands out per-run subscriptions and leases
pub struct NavigationDriver {
    host: Arc<dyn Host>,
    leases: Mutex<HashMap<TabId, Arc<tokio::sync::Mutex<()>>>>,
}

impl NavigationDriver {
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self {
            host,
            leases: Mutex::new(HashMap::new()),
        }
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    /// Instructs the host to load `url` in `tab`
    ///
    /// Fire-and-forget: a rejected request is logged and otherwise surfaces only
    /// as the absence of navigation signals.
    pub async fn navigate(&self, tab: TabId, url: &str) {
        tracing::info!("Open page {}", url);
        if let Err(e) = self.host.update_tab(tab, url).await {
            tracing::warn!("Tab {} rejected navigation to {}: {}", tab, url, e);
        }
    }

    /// Takes exclusive use of `tab`
    ///
    /// # Returns
    ///
    /// * `Ok(TabLease)` - The tab is held until the lease is dropped
    /// * `Err(ArchiverError::TabBusy)` - Another run currently holds the tab
    pub fn lease_tab(&self, tab: TabId) -> Result<TabLease, ArchiverError> {
        let lock = {
            let mut leases = self.leases.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(leases.entry(tab).or_default())
        };

        let guard = lock
            .try_lock_owned()
            .map_err(|_| ArchiverError::TabBusy(tab))?;
        tracing::debug!("Leased tab {}", tab);
        Ok(TabLease { tab, _guard: guard })
    }

    /// Creates an empty subscription scoped to `tab`
    ///
    /// Call [`Subscription::subscribe_committed`] and
    /// [`Subscription::subscribe_load_complete`] to register the listeners.
    pub fn subscribe(&self, tab: TabId) -> Subscription {
        Subscription {
            tab,
            host: Arc::clone(&self.host),
            committed: None,
            completed: None,
        }
    }
}

/// Exclusive hold on a tab for the duration of one run
#[derive(Debug)]
pub struct TabLease {
    tab: TabId,
    _guard: OwnedMutexGuard<()>,
}

impl TabLease {
    pub fn tab(&self) -> TabId {
        self.tab
    }
}

impl Drop for TabLease {
    fn drop(&mut self) {
        tracing::debug!("Released tab {}", self.tab);
    }
}

/// Navigation-event listeners registered for one run
///
/// Dropping the subscription unregisters both listeners, so every exit path of a
/// run (including a dropped future) releases them.
pub struct Subscription {
    tab: TabId,
    host: Arc<dyn Host>,
    committed: Option<broadcast::Receiver<FrameEvent>>,
    completed: Option<broadcast::Receiver<FrameEvent>>,
}

impl Subscription {
    pub fn tab(&self) -> TabId {
        self.tab
    }

    /// Registers the navigation-committed listener (no-op if already registered)
    pub fn subscribe_committed(&mut self) {
        if self.committed.is_none() {
            self.committed = Some(self.host.subscribe_committed());
        }
    }

    /// Registers the load-complete listener (no-op if already registered)
    pub fn subscribe_load_complete(&mut self) {
        if self.completed.is_none() {
            self.completed = Some(self.host.subscribe_completed());
        }
    }

    /// Removes both listeners; safe to call any number of times
    pub fn unsubscribe_all(&mut self) {
        if self.committed.take().is_some() | self.completed.take().is_some() {
            tracing::debug!("Unsubscribed navigation listeners for tab {}", self.tab);
        }
    }

    /// True while at least one listener is registered
    pub fn is_active(&self) -> bool {
        self.committed.is_some() || self.completed.is_some()
    }

    /// Discards every buffered event
    ///
    /// Called right before a navigation so late signals from the previous page
    /// cannot be attributed to the next target.
    pub fn drain(&mut self) -> usize {
        drain_receiver(&mut self.committed) + drain_receiver(&mut self.completed)
    }

    /// Waits for the next top-level signal of this subscription's tab
    ///
    /// Returns `None` once no listener is registered or both streams are closed.
    pub async fn next_signal(&mut self) -> Option<LoadSignal> {
        loop {
            if !self.is_active() {
                return None;
            }

            let (committed, result) = tokio::select! {
                result = recv_from(&mut self.committed) => (true, result),
                result = recv_from(&mut self.completed) => (false, result),
            };

            let event = match result {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Navigation listener lagged, {} events skipped", skipped);
                    continue;
                }
                Err(RecvError::Closed) => {
                    if committed {
                        self.committed = None;
                    } else {
                        self.completed = None;
                    }
                    continue;
                }
            };

            // Other tabs and subframes are not ours
            if event.tab != self.tab || !event.is_top_level() {
                continue;
            }

            return Some(if committed {
                LoadSignal::Committed(event)
            } else {
                LoadSignal::LoadComplete(event)
            });
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe_all();
    }
}

async fn recv_from(
    receiver: &mut Option<broadcast::Receiver<FrameEvent>>,
) -> Result<FrameEvent, RecvError> {
    match receiver {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

fn drain_receiver(receiver: &mut Option<broadcast::Receiver<FrameEvent>>) -> usize {
    let Some(receiver) = receiver else {
        return 0;
    };
    let mut drained = 0;
    loop {
        match receiver.try_recv() {
            Ok(_) => drained += 1,
            Err(TryRecvError::Lagged(skipped)) => drained += skipped as usize,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return drained,
        }
    }
}
