//! State module for tracking crawl progress
//!
//! This module provides the explicit states a crawl run and each of its targets move through.
//!
//! # Components
//!
//! - `RunStatus`: Lifecycle of one crawl run (idle, running, done)
//! - `CaptureState`: Per-target readiness state used to enforce a single capture per target

mod capture_state;
mod run_status;

// Re-export main types
pub use capture_state::{CaptureState, CaptureTrigger};
pub use run_status::RunStatus;
