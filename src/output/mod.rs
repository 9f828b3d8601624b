//! Console output for crawl runs
//!
//! This module handles:
//! - Counting per-target outcomes into a [`RunSummary`]
//! - Printing the summary at the end of a run
//! - Listing targets for dry runs

mod summary;

pub use summary::{print_summary, print_targets, RunSummary};
