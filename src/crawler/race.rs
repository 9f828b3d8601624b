//! Completion race resolver
//!
//! For every navigation two deadlines compete:
//! - the *forced* deadline, `force_capture_timeout` after the navigation was issued
//!   and re-armed `force_capture_timeout` after the first top-level commit
//! - the *preprocessing* deadline, `preprocess_delay` after the first top-level
//!   load-complete
//!
//! Whichever deadline passes first sets the capture latch and wins; the other one
//! finds the latch set and does nothing. On an exact tie the normal capture wins.

use crate::config::CrawlerConfig;
use crate::crawler::driver::{LoadSignal, Subscription};
use crate::state::{CaptureState, CaptureTrigger};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

/// Durations of the two competing timers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceTimings {
    pub force_capture: Duration,
    pub preprocess_delay: Duration,
}

impl From<&CrawlerConfig> for RaceTimings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            force_capture: config.force_capture_timeout(),
            preprocess_delay: config.preprocess_delay(),
        }
    }
}

/// Per-target race state
#[derive(Debug)]
pub struct CompletionRace {
    timings: RaceTimings,
    state: CaptureState,
    committed: bool,
    force_deadline: Option<Instant>,
    preprocess_deadline: Option<Instant>,
}

impl CompletionRace {
    pub fn new(timings: RaceTimings) -> Self {
        Self {
            timings,
            state: CaptureState::Captured,
            committed: false,
            force_deadline: None,
            preprocess_deadline: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// True between navigation issuance and the first honored trigger
    pub fn is_armed(&self) -> bool {
        self.state.is_armed_for_capture()
    }

    pub fn force_deadline(&self) -> Option<Instant> {
        self.force_deadline
    }

    pub fn preprocess_deadline(&self) -> Option<Instant> {
        self.preprocess_deadline
    }

    /// Resets the latch for a navigation issued at `now`
    ///
    /// The forced deadline is armed here so a navigation that never commits still
    /// ends in a capture.
    pub fn arm(&mut self, now: Instant) {
        self.state.reset();
        self.committed = false;
        self.force_deadline = Some(now + self.timings.force_capture);
        self.preprocess_deadline = None;
    }

    /// First top-level commit re-arms the forced deadline from the commit time
    pub fn on_committed(&mut self, now: Instant) {
        if self.committed || !self.is_armed() {
            return;
        }
        self.committed = true;
        self.force_deadline = Some(now + self.timings.force_capture);
        tracing::debug!(
            "Committed; forced capture in {}s",
            self.timings.force_capture.as_secs_f32()
        );
    }

    /// First top-level load-complete schedules the normal capture
    pub fn on_load_complete(&mut self, now: Instant) {
        if self.state.on_load_complete() {
            self.preprocess_deadline = Some(now + self.timings.preprocess_delay);
            tracing::debug!(
                "Loaded; preprocessing for {}s before capture",
                self.timings.preprocess_delay.as_secs_f32()
            );
        } else {
            tracing::debug!("Load-complete ignored in state {}", self.state);
        }
    }

    /// Honors a capture trigger if the latch is still open
    ///
    /// Returns the trigger for the first caller and `None` for every later one.
    pub fn fire(&mut self, trigger: CaptureTrigger) -> Option<CaptureTrigger> {
        if self.state.try_latch() {
            self.force_deadline = None;
            self.preprocess_deadline = None;
            Some(trigger)
        } else {
            tracing::debug!("{:?} trigger ignored, capture already started", trigger);
            None
        }
    }

    /// Closes the latch without capturing; pending triggers become no-ops
    pub fn disarm(&mut self) {
        self.state.try_latch();
        self.force_deadline = None;
        self.preprocess_deadline = None;
    }

    /// Waits until one of the deadlines wins
    ///
    /// # Arguments
    ///
    /// * `subscription` - The run's navigation listeners
    /// * `stop` - Set to `true` when the run is being torn down
    ///
    /// # Returns
    ///
    /// * `Some(trigger)` - A capture must start now
    /// * `None` - The run was stopped or the latch was already set
    pub async fn resolve(
        &mut self,
        subscription: &mut Subscription,
        stop: &mut watch::Receiver<bool>,
    ) -> Option<CaptureTrigger> {
        let mut signals_open = true;

        loop {
            if !self.is_armed() || *stop.borrow() {
                return None;
            }

            let preprocess_at = self.preprocess_deadline;
            let force_at = self.force_deadline;

            tokio::select! {
                biased;

                _ = stopped(stop) => return None,

                _ = sleep_until_opt(preprocess_at) => {
                    return self.fire_if_active(CaptureTrigger::Normal, stop);
                }

                _ = sleep_until_opt(force_at) => {
                    tracing::info!("Force saving after {}s", self.timings.force_capture.as_secs_f32());
                    return self.fire_if_active(CaptureTrigger::Forced, stop);
                }

                signal = subscription.next_signal(), if signals_open => match signal {
                    Some(LoadSignal::Committed(_)) => self.on_committed(Instant::now()),
                    Some(LoadSignal::LoadComplete(_)) => self.on_load_complete(Instant::now()),
                    None => signals_open = false,
                },
            }
        }
    }

    fn fire_if_active(
        &mut self,
        trigger: CaptureTrigger,
        stop: &watch::Receiver<bool>,
    ) -> Option<CaptureTrigger> {
        if *stop.borrow() {
            return None;
        }
        self.fire(trigger)
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn stopped(stop: &mut watch::Receiver<bool>) {
    if stop.wait_for(|stopped| *stopped).await.is_err() {
        // Sender gone: nobody can stop this run any more
        std::future::pending::<()>().await;
    }
}
