//! Crawler module: the page-archiving loop
//!
//! This module contains the core crawling logic, including:
//! - Tab navigation and navigation-event subscriptions
//! - The completion race between load-complete and the forced deadline
//! - Capture coordination and result reporting
//! - The per-run state machine

mod capture;
mod driver;
mod race;
mod run;

#[cfg(test)]
pub(crate) mod testing;

pub use capture::{CaptureCoordinator, CaptureOutcome, CaptureRecord, CaptureReport};
pub use driver::{LoadSignal, NavigationDriver, Subscription, TabLease};
pub use race::{CompletionRace, RaceTimings};
pub use run::{CrawlRun, StopHandle};

use crate::backend::ResultSink;
use crate::config::Config;
use crate::host::{Host, TabId};
use crate::output::RunSummary;
use crate::queue::TargetQueue;
use crate::ArchiverError;
use std::sync::Arc;

/// Runs a complete crawl over `queue`
///
/// This is the main entry point for archiving a batch of pages. It will:
/// 1. Wrap the host in a navigation driver
/// 2. Create an idle run over the queue
/// 3. Crawl every target in the configured tab
///
/// `on_start` receives the run's [`StopHandle`] before the first navigation, so
/// callers can wire it to an interrupt.
///
/// # Returns
///
/// * `Ok(RunSummary)` - The run reached `Done`
/// * `Err(ArchiverError)` - The tab was busy
pub async fn crawl<F>(
    config: &Config,
    queue: TargetQueue,
    host: Arc<dyn Host>,
    sink: Arc<dyn ResultSink>,
    on_start: F,
) -> Result<RunSummary, ArchiverError>
where
    F: FnOnce(StopHandle),
{
    let driver = Arc::new(NavigationDriver::new(host));
    let mut run = CrawlRun::new(queue, driver, sink, &config.crawler);
    on_start(run.stop_handle());
    run.crawl(TabId(config.host.tab_id)).await
}
