//! The executive contract — the boundary between the kernel and whatever
//! drives virtual time.
//!
//! # Design
//!
//! The kernel never advances time itself.  It asks an [`Executive`] for
//! "now", requests one-shot callbacks at future instants, and — from inside
//! a detachable event — parks and un-parks virtual threads through an
//! [`EventController`].  Any event loop honouring this contract can host the
//! kernel; `vt-core` ships a reference implementation behind the
//! `test-helpers` feature.
//!
//! # Suspension model
//!
//! A detachable event is a virtual thread: its body may call
//! `controller.suspend()` to yield control back to the executive mid-
//! execution.  Resumption is always initiated by a *different* virtual
//! thread calling `controller.resume(priority)`, which schedules the
//! continuation as a fresh event at the current instant, ordered among ties
//! by `priority`.  Synchronous events must run to completion.

use std::sync::Arc;

use crate::{Priority, VirtualTime};

/// A one-shot event body.  Closure capture carries any per-event state.
pub type EventAction = Box<dyn FnOnce(&dyn Executive) + Send>;

/// Diagnostics hook invoked just before an event fires.
pub type FiringHook = Box<dyn Fn(VirtualTime, Priority) + Send>;

/// How an event body is allowed to behave while running.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum EventKind {
    /// Plain callback on the executive's dispatch thread; must not suspend.
    Synchronous,
    /// Runs as a virtual thread that may suspend mid-execution and be
    /// resumed later at a chosen priority.
    Detachable,
}

/// Handle to a running detachable event.
///
/// `suspend` may only be called by the virtual thread the controller
/// belongs to; `resume` is always called by another party.
pub trait EventController: Send + Sync {
    /// Park the calling virtual thread until another party calls `resume`.
    fn suspend(&self);

    /// Schedule the parked thread's continuation as an event at the
    /// executive's current instant, ordered among ties by `priority`.
    fn resume(&self, priority: Priority);
}

/// The virtual-time executive consumed by the kernel.
pub trait Executive: Send + Sync {
    /// The current virtual instant.
    fn now(&self) -> VirtualTime;

    /// Register a one-shot event of the given kind at `when`, tie-broken
    /// among same-instant events by `priority` (higher fires first).
    fn request_event(
        &self,
        when: VirtualTime,
        priority: Priority,
        kind: EventKind,
        action: EventAction,
    );

    /// Like `request_event`, but the event does not keep the run alive:
    /// the executive may stop once only daemon events remain.
    fn request_daemon_event(
        &self,
        when: VirtualTime,
        priority: Priority,
        kind: EventKind,
        action: EventAction,
    );

    /// Kind of the event currently being dispatched, or `None` outside any
    /// dispatch.  Blocking kernel calls use this to reject non-detachable
    /// contexts.
    fn current_event_kind(&self) -> Option<EventKind>;

    /// Controller of the detachable event currently executing, or `None`
    /// when the running event is synchronous or no event is running.
    fn current_controller(&self) -> Option<Arc<dyn EventController>>;

    /// Register a diagnostics hook called just before each event fires.
    /// Hooks must not call back into the executive.
    fn on_event_about_to_fire(&self, hook: FiringHook);
}
