//! `vt-sched` — time-ordered event storage for the rust_vt simulation
//! kernel.
//!
//! # Crate layout
//!
//! | Module             | Contents                                          |
//! |--------------------|---------------------------------------------------|
//! | [`heap`]           | `PriorityQueue`, `HeapDirection`                  |
//! | [`local_schedule`] | `LocalEventSchedule`                              |
//! | [`error`]          | `ScheduleError`, `ScheduleResult<T>`              |
//!
//! # Registration model (summary)
//!
//! A [`LocalEventSchedule`] keeps an owner's pending callbacks in a locally
//! time-ordered ring and registers only the earliest one with the
//! executive:
//!
//! ```text
//! enqueue(p, t)   → insert into ring; register head if unregistered
//! head fires      → clear slot, advance head, register new head,
//!                   then deliver(p, t)
//! ```
//!
//! [`PriorityQueue`] is the general-purpose heap for anything that must be
//! served in time (or any comparator) order.

pub mod error;
pub mod heap;
pub mod local_schedule;


pub use error::{ScheduleError, ScheduleResult};
pub use heap::{HeapDirection, PriorityQueue};
pub use local_schedule::LocalEventSchedule;
