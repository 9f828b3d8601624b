//! Run summary counters and their console rendering

use crate::crawler::{CaptureOutcome, CaptureReport};
use crate::queue::TargetQueue;
use std::time::Duration;

/// Per-run counters, returned by a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Targets in the queue the run was created with
    pub total: usize,

    /// Records written with a snapshot
    pub succeeded: usize,

    /// Records written without a snapshot
    pub failed: usize,

    /// Targets for which no record was written
    pub skipped: usize,

    /// Captures triggered by the forced deadline
    pub forced: usize,

    /// Records the sink refused
    pub sink_errors: usize,

    pub elapsed: Duration,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Accounts for one processed target
    pub fn record(&mut self, was_forced: bool, report: CaptureReport) {
        if was_forced {
            self.forced += 1;
        }

        match report {
            CaptureReport::Recorded(CaptureOutcome::Success) => self.succeeded += 1,
            CaptureReport::Recorded(CaptureOutcome::Failed) => self.failed += 1,
            CaptureReport::SinkFailed(_) => self.sink_errors += 1,
            CaptureReport::Skipped => self.skipped += 1,
        }
    }

    /// Targets the run got through before finishing or being stopped
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed + self.skipped + self.sink_errors
    }

    /// Share of processed targets archived with a snapshot, in percent
    pub fn success_rate(&self) -> f64 {
        let processed = self.processed();
        if processed == 0 {
            0.0
        } else {
            (self.succeeded as f64 / processed as f64) * 100.0
        }
    }
}

/// Prints a finished run's counters to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("=== Crawl Summary ===\n");

    println!("Overview:");
    println!("  Targets: {}", summary.total);
    println!("  Processed: {}", summary.processed());
    println!("  Elapsed: {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    println!("Outcomes:");
    println!("  Success: {}", summary.succeeded);
    println!("  Failed: {}", summary.failed);
    println!("  Skipped: {}", summary.skipped);
    println!("  Forced captures: {}", summary.forced);
    println!();

    if summary.sink_errors > 0 {
        println!("Backend rejected {} record(s)", summary.sink_errors);
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} targets archived)",
        summary.success_rate(),
        summary.succeeded,
        summary.processed()
    );
}

/// Prints the targets a run would visit, in order
pub fn print_targets(queue: &TargetQueue) {
    println!("=== {} target(s) ===\n", queue.len());
    for (index, target) in queue.iter().enumerate() {
        match &target.path_hint {
            Some(path) => println!("{:>4}  {}  {}  ({})", index, target.id, target.origin_url, path),
            None => println!("{:>4}  {}  {}", index, target.id, target.origin_url),
        }
    }
}
