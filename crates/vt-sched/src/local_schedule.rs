//! `LocalEventSchedule` — a per-owner, lazily synchronised view over the
//! executive.
//!
//! # Why this exists
//!
//! An owner with many pending self-timers (a machine with a maintenance
//! calendar, a source emitting on a fixed cadence) would otherwise register
//! every future callback with the executive up front.  The schedule keeps
//! that backlog local and time-ordered, and registers only the single
//! earliest entry; each dispatch re-registers the next one.  The
//! executive's global queue holds one entry per schedule instead of one per
//! pending callback.
//!
//! # Ordering precondition
//!
//! Callers are expected to enqueue in non-decreasing `when` order most of
//! the time.  Insertion is a backward insertion sort from the tail, so a
//! mildly late entry costs O(k) shifts where k is the number of slots it
//! must pass; badly out-of-order insertion degrades accordingly, and an
//! entry earlier than the already-registered head is outside the
//! precondition.

use std::sync::{Arc, Mutex};

use vt_core::{EventKind, Executive, Priority, VirtualTime};

use crate::{ScheduleError, ScheduleResult};

// ── Slots and the ring ────────────────────────────────────────────────────────

/// One pending callback.  Slot positions are reused across dispatches; only
/// the contents are cleared.
struct Slot<P> {
    what:      Option<P>,
    when:      VirtualTime,
    scheduled: bool,
}

impl<P> Slot<P> {
    fn vacant() -> Self {
        Slot {
            what:      None,
            when:      VirtualTime::ZERO,
            scheduled: false,
        }
    }
}

/// Growable circular buffer of slots.  Entries between `head` (inclusive)
/// and `tail` (exclusive) are kept in non-decreasing `when` order.
struct Ring<P> {
    slots: Vec<Slot<P>>,
    head:  usize,
    tail:  usize,
}

impl<P> Ring<P> {
    fn with_capacity(capacity: usize) -> Self {
        Ring {
            slots: (0..capacity).map(|_| Slot::vacant()).collect(),
            head:  0,
            tail:  0,
        }
    }

    fn next(&self, i: usize) -> usize {
        (i + 1) % self.slots.len()
    }

    fn prev(&self, i: usize) -> usize {
        (i + self.slots.len() - 1) % self.slots.len()
    }

    fn len(&self) -> usize {
        let cap = self.slots.len();
        (self.tail + cap - self.head) % cap
    }

    /// Backward insertion sort from the tail: shift strictly-later entries
    /// down one slot, then drop the new entry into the gap.
    fn insert(&mut self, payload: P, when: VirtualTime) {
        let mut i = self.tail;
        while i != self.head {
            let prev = self.prev(i);
            if self.slots[prev].when <= when {
                break;
            }
            self.slots[i] = Slot {
                what:      self.slots[prev].what.take(),
                when:      self.slots[prev].when,
                scheduled: self.slots[prev].scheduled,
            };
            self.slots[prev].scheduled = false;
            i = prev;
        }
        self.slots[i] = Slot {
            what:      Some(payload),
            when,
            scheduled: false,
        };
        self.tail = self.next(self.tail);
        if self.tail == self.head {
            self.grow();
        }
    }

    /// Mark the head entry as registered if it is not already.  Returns the
    /// head's instant when a fresh registration is needed.
    fn claim_head(&mut self) -> Option<VirtualTime> {
        if self.head == self.tail || self.slots[self.head].scheduled {
            return None;
        }
        self.slots[self.head].scheduled = true;
        Some(self.slots[self.head].when)
    }

    /// Double capacity and relinearise: occupied entries are copied to the
    /// start of a fresh buffer, head reset to 0.
    fn grow(&mut self) {
        let old_capacity = self.slots.len();
        // tail caught head, so every slot is occupied
        let mut slots: Vec<Slot<P>> = Vec::with_capacity(old_capacity * 2);
        for k in 0..old_capacity {
            let i = (self.head + k) % old_capacity;
            slots.push(Slot {
                what:      self.slots[i].what.take(),
                when:      self.slots[i].when,
                scheduled: self.slots[i].scheduled,
            });
        }
        slots.extend((old_capacity..old_capacity * 2).map(|_| Slot::vacant()));
        self.slots = slots;
        self.head = 0;
        self.tail = old_capacity;
    }
}

// ── LocalEventSchedule ────────────────────────────────────────────────────────

type Deliver<P> = Box<dyn Fn(P, VirtualTime) + Send + Sync>;

struct Core<P> {
    exec:    Arc<dyn Executive>,
    deliver: Deliver<P>,
    ring:    Mutex<Ring<P>>,
}

/// A per-owner backlog of pending callbacks, synchronised lazily with the
/// executive: at most one entry is registered at a time, and each dispatch
/// registers the next.
///
/// Cloning yields another handle to the same schedule.
pub struct LocalEventSchedule<P: Send + 'static> {
    core: Arc<Core<P>>,
}

impl<P: Send + 'static> Clone for LocalEventSchedule<P> {
    fn clone(&self) -> Self {
        LocalEventSchedule { core: Arc::clone(&self.core) }
    }
}

impl<P: Send + 'static> LocalEventSchedule<P> {
    /// Create a schedule delivering payloads to `deliver`.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new<F>(exec: Arc<dyn Executive>, capacity: usize, deliver: F) -> Self
    where
        F: Fn(P, VirtualTime) + Send + Sync + 'static,
    {
        assert!(capacity >= 1, "local event schedule capacity must be at least 1");
        LocalEventSchedule {
            core: Arc::new(Core {
                exec,
                deliver: Box::new(deliver),
                ring: Mutex::new(Ring::with_capacity(capacity)),
            }),
        }
    }

    /// Queue `payload` for delivery at `when`, registering the head entry
    /// with the executive when it is not already registered.
    pub fn enqueue(&self, payload: P, when: VirtualTime) {
        let registration = {
            let mut ring = self.core.ring.lock().unwrap();
            ring.insert(payload, when);
            ring.claim_head()
        };
        if let Some(head_when) = registration {
            request_dispatch(&self.core, head_when);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.core.ring.lock().unwrap().len() == 0
    }

    pub fn len(&self) -> usize {
        self.core.ring.lock().unwrap().len()
    }

    /// Instant of the next pending entry.
    ///
    /// # Panics
    /// Panics on an empty schedule: asking for the earliest time of nothing
    /// is a caller bug, not a recoverable condition.
    pub fn earliest_time(&self) -> VirtualTime {
        let ring = self.core.ring.lock().unwrap();
        assert!(ring.len() > 0, "earliest_time on an empty schedule");
        ring.slots[ring.head].when
    }

    /// Instant of the last pending entry.
    ///
    /// # Panics
    /// Panics on an empty schedule.
    pub fn latest_time(&self) -> VirtualTime {
        let ring = self.core.ring.lock().unwrap();
        assert!(ring.len() > 0, "latest_time on an empty schedule");
        ring.slots[ring.prev(ring.tail)].when
    }

    /// Instant of the `i`-th pending entry (0 = head).  Asking past the end
    /// is reported, never truncated.
    pub fn time_at(&self, i: usize) -> ScheduleResult<VirtualTime> {
        let ring = self.core.ring.lock().unwrap();
        let count = ring.len();
        if i >= count {
            return Err(ScheduleError::IndexBeyondCount { index: i, count });
        }
        Ok(ring.slots[(ring.head + i) % ring.slots.len()].when)
    }

    /// How many slots currently carry the registered flag.  0 or 1 under
    /// the in-order enqueue precondition.
    pub(crate) fn registered_slot_count(&self) -> usize {
        let ring = self.core.ring.lock().unwrap();
        ring.slots.iter().filter(|s| s.scheduled).count()
    }
}

/// Register a dispatch of the schedule's head with the executive.
fn request_dispatch<P: Send + 'static>(core: &Arc<Core<P>>, when: VirtualTime) {
    let dispatch_core = Arc::clone(core);
    core.exec.request_event(
        when,
        Priority::ZERO,
        EventKind::Synchronous,
        Box::new(move |exec| dispatch(&dispatch_core, exec)),
    );
}

/// Fired by the executive when the head entry's instant arrives: clear the
/// head slot, advance, register the new head if one is pending, and only
/// then hand the payload to the owner.  Registering before invoking keeps
/// reentrant enqueues from the deliver callback correct.
fn dispatch<P: Send + 'static>(core: &Arc<Core<P>>, exec: &dyn Executive) {
    let (payload, when, registration) = {
        let mut ring = core.ring.lock().unwrap();
        let head = ring.head;
        debug_assert_eq!(ring.slots[head].when, exec.now(), "head dispatched off-schedule");
        let payload = ring.slots[head].what.take().expect("dispatching a vacant head slot");
        let when = ring.slots[head].when;
        ring.slots[head].scheduled = false;
        ring.head = ring.next(head);
        (payload, when, ring.claim_head())
    };
    if let Some(next_when) = registration {
        request_dispatch(core, next_when);
    }
    (core.deliver)(payload, when);
}
