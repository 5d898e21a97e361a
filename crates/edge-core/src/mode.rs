//! Execution mode and the safety hold gate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide execution mode.
///
/// Dry-run exercises every code path identically to live mode except that
/// no venue-mutating call is ever issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Dryrun,
    Live,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dryrun => write!(f, "dryrun"),
            Self::Live => write!(f, "live"),
        }
    }
}

/// Immutable view of mode + hold, captured at claim time.
///
/// Claim-time decisions must be deterministic: the engine reads one snapshot
/// per command and never re-reads the shared flags mid-execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeSnapshot {
    pub mode: ExecutionMode,
    pub hold: bool,
}

impl ModeSnapshot {
    pub fn is_live(&self) -> bool {
        self.mode == ExecutionMode::Live
    }
}

/// Process-wide mode/hold control.
///
/// Read-mostly; mutated only via an explicit operator-facing control path.
/// HOLD=true suppresses all venue-mutating calls even in live mode.
#[derive(Debug)]
pub struct ModeControl {
    live: AtomicBool,
    hold: AtomicBool,
}

impl ModeControl {
    pub fn new(mode: ExecutionMode, hold: bool) -> Self {
        Self {
            live: AtomicBool::new(mode == ExecutionMode::Live),
            hold: AtomicBool::new(hold),
        }
    }

    /// Capture the current mode and hold flag.
    ///
    /// Read at the moment of claim, not cached earlier.
    pub fn snapshot(&self) -> ModeSnapshot {
        ModeSnapshot {
            mode: if self.live.load(Ordering::Acquire) {
                ExecutionMode::Live
            } else {
                ExecutionMode::Dryrun
            },
            hold: self.hold.load(Ordering::Acquire),
        }
    }

    /// Operator control path: switch mode.
    pub fn set_mode(&self, mode: ExecutionMode) {
        self.live
            .store(mode == ExecutionMode::Live, Ordering::Release);
    }

    /// Operator control path: set or clear the hold gate.
    pub fn set_hold(&self, hold: bool) {
        self.hold.store(hold, Ordering::Release);
    }
}

impl Default for ModeControl {
    fn default() -> Self {
        Self::new(ExecutionMode::Dryrun, false)
    }
}
