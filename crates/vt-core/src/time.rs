//! Virtual time and tie-break priority.
//!
//! # Design
//!
//! Time is represented as a monotonically increasing `VirtualTime` counter.
//! Nothing in the kernel maps it to wall-clock time; only the executive ever
//! advances it.  Using an integer as the canonical unit means all schedule
//! arithmetic is exact (no floating-point drift) and comparisons are O(1).
//!
//! `Priority` breaks ties among events due at the same instant: the
//! executive dispatches higher values first.  The exchange leans on this to
//! order reader/taker/poster resumptions (see `vt-exchange`).

use std::fmt;

// ── VirtualTime ───────────────────────────────────────────────────────────────

/// An absolute virtual timestamp.
///
/// Stored as `u64` to avoid overflow: at one unit per simulated microsecond
/// a u64 covers ~585,000 years of virtual time, far beyond any conceivable
/// run.  The unit's physical meaning is the application's business.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualTime(pub u64);

impl VirtualTime {
    pub const ZERO: VirtualTime = VirtualTime(0);

    /// Return the instant `n` units after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> VirtualTime {
        VirtualTime(self.0 + n)
    }

    /// Units elapsed from `earlier` to `self`.
    ///
    /// # Panics
    /// Panics in debug mode if `earlier > self`.
    #[inline]
    pub fn since(self, earlier: VirtualTime) -> u64 {
        self.0 - earlier.0
    }
}

impl std::ops::Add<u64> for VirtualTime {
    type Output = VirtualTime;
    #[inline]
    fn add(self, rhs: u64) -> VirtualTime {
        VirtualTime(self.0 + rhs)
    }
}

impl std::ops::Sub for VirtualTime {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: VirtualTime) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── Priority ──────────────────────────────────────────────────────────────────

/// Tie-break rank among events due at the same virtual instant.
///
/// Higher values fire first.  Priority carries no meaning across distinct
/// instants; time always dominates.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Priority(pub i32);

impl Priority {
    pub const ZERO: Priority = Priority(0);
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}
