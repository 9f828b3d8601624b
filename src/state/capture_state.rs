/// Per-target capture state
///
/// Each target starts in `Loading` when its navigation is issued, moves to `Armed`
/// once the page reports load-complete, and ends in `Captured` the instant a capture
/// trigger is honored. `Captured` is the latch: every later trigger is a no-op.
use std::fmt;

/// Readiness state of the target currently loaded in the tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CaptureState {
    /// Navigation issued, waiting for commit / load-complete
    #[default]
    Loading,

    /// Load-complete seen, preprocessing delay running
    Armed,

    /// A capture trigger has been honored for this target
    Captured,
}

/// Which path started a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTrigger {
    /// Preprocessing delay elapsed after load-complete
    Normal,

    /// Forced-capture timeout elapsed first
    Forced,
}

impl CaptureTrigger {
    pub fn was_forced(&self) -> bool {
        matches!(self, Self::Forced)
    }
}

impl CaptureState {
    /// Returns true while a capture may still be triggered
    pub fn is_armed_for_capture(&self) -> bool {
        !matches!(self, Self::Captured)
    }

    /// Applies a load-complete signal; only the first one moves `Loading -> Armed`
    ///
    /// Returns true if this call performed the transition.
    pub fn on_load_complete(&mut self) -> bool {
        if *self == Self::Loading {
            *self = Self::Armed;
            true
        } else {
            false
        }
    }

    /// Sets the latch
    ///
    /// Returns true only for the first caller; every later call leaves the state
    /// untouched and returns false.
    pub fn try_latch(&mut self) -> bool {
        if self.is_armed_for_capture() {
            *self = Self::Captured;
            true
        } else {
            false
        }
    }

    /// Resets the state for the next target
    pub fn reset(&mut self) {
        *self = Self::Loading;
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Armed => "armed",
            Self::Captured => "captured",
        }
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
