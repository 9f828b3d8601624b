//! Crawl state machine
//!
//! A [`CrawlRun`] walks its [`TargetQueue`] strictly in order, one
//! navigate / race / capture cycle per target, and finishes in `Done`.

use crate::backend::ResultSink;
use crate::config::CrawlerConfig;
use crate::crawler::capture::CaptureCoordinator;
use crate::crawler::driver::{NavigationDriver, Subscription, TabLease};
use crate::crawler::race::{CompletionRace, RaceTimings};
use crate::host::TabId;
use crate::output::RunSummary;
use crate::queue::TargetQueue;
use crate::state::RunStatus;
use crate::ArchiverError;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;

/// Ends a run early from outside the crawl loop
///
/// Any capture trigger still pending when `stop` is called becomes a no-op; the run
/// then tears down and reaches `Done`.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// One execution over a fixed target queue
pub struct CrawlRun {
    queue: TargetQueue,
    cursor: usize,
    status: RunStatus,
    active_tab: Option<TabId>,
    race: CompletionRace,
    driver: Arc<NavigationDriver>,
    capture: CaptureCoordinator,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl CrawlRun {
    /// Creates an idle run
    ///
    /// # Arguments
    ///
    /// * `queue` - Targets to visit, in order
    /// * `driver` - Navigation driver shared by every run on the same host
    /// * `sink` - Where capture records go
    /// * `config` - Race timings and handshake settings
    pub fn new(
        queue: TargetQueue,
        driver: Arc<NavigationDriver>,
        sink: Arc<dyn ResultSink>,
        config: &CrawlerConfig,
    ) -> Self {
        let capture = CaptureCoordinator::new(Arc::clone(driver.host()), sink, config);
        let (stop_tx, stop_rx) = watch::channel(false);

        Self {
            queue,
            cursor: 0,
            status: RunStatus::Idle,
            active_tab: None,
            race: CompletionRace::new(RaceTimings::from(config)),
            driver,
            capture,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Index of the target currently being processed
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn active_tab(&self) -> Option<TabId> {
        self.active_tab
    }

    pub fn queue(&self) -> &TargetQueue {
        &self.queue
    }

    /// True while a capture trigger may still be honored for the current target
    pub fn capture_armed(&self) -> bool {
        self.race.is_armed()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: Arc::clone(&self.stop_tx),
        }
    }

    /// Crawls every target in `tab` and returns the run's counters
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - The run reached `Done`
    /// * `Err(ArchiverError::InvalidTransition)` - The run was already used
    /// * `Err(ArchiverError::TabBusy)` - Another run holds `tab`; this run stays `Idle`
    pub async fn crawl(&mut self, tab: TabId) -> Result<RunSummary, ArchiverError> {
        self.check_transition(RunStatus::Running)?;

        let started = Instant::now();
        let lease = self.driver.lease_tab(tab)?;
        let mut subscription = self.driver.subscribe(tab);
        subscription.subscribe_committed();
        subscription.subscribe_load_complete();

        self.status = RunStatus::Running;
        self.active_tab = Some(tab);
        self.cursor = 0;
        tracing::info!("Crawling {} target(s) in tab {}", self.queue.len(), tab);

        let mut summary = RunSummary::new(self.queue.len());

        while let Some(target) = self.queue.get(self.cursor).cloned() {
            if *self.stop_rx.borrow() {
                break;
            }

            let stale = subscription.drain();
            if stale > 0 {
                tracing::debug!("Discarded {} stale navigation signal(s)", stale);
            }

            tracing::info!(
                "[{}/{}] Archiving {}",
                self.cursor + 1,
                self.queue.len(),
                target.id
            );
            self.race.arm(Instant::now());
            self.driver.navigate(tab, &target.origin_url).await;

            let Some(trigger) = self.race.resolve(&mut subscription, &mut self.stop_rx).await
            else {
                break;
            };

            let report = self.capture.capture(tab, &target, trigger).await;
            summary.record(trigger.was_forced(), report);

            self.check_transition(RunStatus::Running)?;
            self.cursor += 1;
        }

        if *self.stop_rx.borrow() {
            tracing::info!("Run stopped at target {}/{}", self.cursor, self.queue.len());
        }

        self.finish(subscription, lease);
        summary.elapsed = started.elapsed();
        tracing::info!(
            "Crawl finished: {} archived, {} failed, {} skipped in {:.1}s",
            summary.succeeded,
            summary.failed,
            summary.skipped,
            summary.elapsed.as_secs_f64()
        );

        Ok(summary)
    }

    fn finish(&mut self, mut subscription: Subscription, lease: TabLease) {
        self.race.disarm();
        subscription.unsubscribe_all();
        drop(subscription);
        drop(lease);

        self.cursor = 0;
        self.active_tab = None;
        self.status = RunStatus::Done;
    }

    fn check_transition(&self, next: RunStatus) -> Result<(), ArchiverError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(ArchiverError::InvalidTransition {
                from: self.status,
                to: next,
            })
        }
    }
}
