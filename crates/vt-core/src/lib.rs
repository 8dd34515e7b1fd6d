//! `vt-core` — foundational types for the `rust_vt` simulation kernel.
//!
//! This crate is a dependency of every other `vt-*` crate.  It intentionally
//! has no `vt-*` dependencies and minimal external ones (only `rand` and
//! `rand_mt`, plus optional `serde` and the `test-helpers` executive).
//!
//! # What lives here
//!
//! | Module           | Contents                                             |
//! |------------------|------------------------------------------------------|
//! | [`time`]         | `VirtualTime`, `Priority`                            |
//! | [`exec`]         | `Executive`, `EventController`, `EventKind`          |
//! | [`rng`]          | `SimRng` (MT19937-64)                                |
//! | [`test_helpers`] | `TestExecutive` (feature `test-helpers`)             |
//!
//! # Feature flags
//!
//! | Flag           | Effect                                                  |
//! |----------------|---------------------------------------------------------|
//! | `serde`        | Adds `Serialize`/`Deserialize` to public value types.   |
//! | `test-helpers` | Reference executive with thread-backed virtual threads. |
//!                  | On by default so dependent crates can test against it.  |

pub mod exec;
pub mod rng;
pub mod time;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use exec::{EventAction, EventController, EventKind, Executive, FiringHook};
pub use rng::SimRng;
pub use time::{Priority, VirtualTime};

#[cfg(feature = "test-helpers")]
pub use test_helpers::TestExecutive;
