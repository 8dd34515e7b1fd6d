//! Reference executive for tests and demos.
//!
//! # Scope
//!
//! [`TestExecutive`] is a complete, deterministic implementation of the
//! [`Executive`] contract meant for exercising kernel code, not for
//! production workloads.  Events live in a `BTreeMap` keyed by
//! (instant, priority rank, insertion sequence), so dispatch order is:
//! earliest instant first, then highest priority, then FIFO.
//!
//! # Detachable events
//!
//! Each detachable event runs on its own OS thread, gated by a pair of
//! channels.  The run loop never executes two virtual threads at once:
//! after starting or waking a thread it blocks until that thread reports
//! `Suspended` or `Completed`.  `suspend()` sends the report and parks on
//! the wake channel; `resume(priority)` enqueues a wakeup event that
//! re-opens the gate when it fires.
//!
//! A virtual thread that is never resumed stays parked until the process
//! exits; the contract has no cancellation path.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::{EventAction, EventController, EventKind, Executive, FiringHook, Priority, VirtualTime};

// ── Queue keys and entries ────────────────────────────────────────────────────

/// Dispatch-order key: instant, then descending priority, then FIFO.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
struct EventKey {
    when: VirtualTime,
    /// Negated priority so higher priorities sort first.
    rank: i64,
    seq:  u64,
}

impl EventKey {
    fn priority(&self) -> Priority {
        Priority((-self.rank) as i32)
    }
}

enum Queued {
    Fresh {
        kind:   EventKind,
        daemon: bool,
        action: EventAction,
    },
    /// Continuation of a suspended virtual thread.  Never a daemon: a
    /// parked thread with a pending wakeup must get to run.
    Wakeup { gate: Arc<Gate> },
}

impl Queued {
    fn is_daemon(&self) -> bool {
        match self {
            Queued::Fresh { daemon, .. } => *daemon,
            Queued::Wakeup { .. } => false,
        }
    }
}

// ── Virtual-thread gate ───────────────────────────────────────────────────────

enum Report {
    Suspended,
    Completed,
}

/// Channel pair gating one virtual thread; doubles as its controller.
struct Gate {
    me:        Weak<Gate>,
    exec:      Weak<Core>,
    wake_tx:   Sender<()>,
    wake_rx:   Receiver<()>,
    report_tx: Sender<Report>,
    report_rx: Receiver<Report>,
    finished:  AtomicBool,
}

impl Gate {
    fn new(exec: Weak<Core>) -> Arc<Gate> {
        let (wake_tx, wake_rx) = unbounded();
        let (report_tx, report_rx) = unbounded();
        Arc::new_cyclic(|me| Gate {
            me: me.clone(),
            exec,
            wake_tx,
            wake_rx,
            report_tx,
            report_rx,
            finished: AtomicBool::new(false),
        })
    }
}

impl EventController for Gate {
    fn suspend(&self) {
        self.report_tx
            .send(Report::Suspended)
            .expect("executive gone while a virtual thread suspends");
        self.wake_rx
            .recv()
            .expect("executive dropped a parked virtual thread");
    }

    fn resume(&self, priority: Priority) {
        let core = self.exec.upgrade().expect("resume after executive shutdown");
        let gate = self.me.upgrade().expect("resume on a dropped controller");
        let mut st = core.state.lock().unwrap();
        let key = EventKey {
            when: st.now,
            rank: -(priority.0 as i64),
            seq:  st.next_seq(),
        };
        st.queue.insert(key, Queued::Wakeup { gate });
    }
}

// ── Executive core ────────────────────────────────────────────────────────────

struct Current {
    kind: EventKind,
    gate: Option<Arc<Gate>>,
}

struct State {
    queue:   BTreeMap<EventKey, Queued>,
    now:     VirtualTime,
    seq:     u64,
    current: Option<Current>,
}

impl State {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }
}

struct Core {
    state: Mutex<State>,
    hooks: Mutex<Vec<FiringHook>>,
}

/// Deterministic single-instance executive.
///
/// Cheap to clone; all clones share the same event queue and clock.
#[derive(Clone)]
pub struct TestExecutive {
    core: Arc<Core>,
}

impl Default for TestExecutive {
    fn default() -> Self {
        Self::new()
    }
}

impl TestExecutive {
    pub fn new() -> Self {
        TestExecutive {
            core: Arc::new(Core {
                state: Mutex::new(State {
                    queue:   BTreeMap::new(),
                    now:     VirtualTime::ZERO,
                    seq:     0,
                    current: None,
                }),
                hooks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Number of events still queued, daemon events included.
    pub fn pending(&self) -> usize {
        self.core.state.lock().unwrap().queue.len()
    }

    /// Drain the queue in (time, priority, FIFO) order, advancing virtual
    /// time, until no non-daemon events remain.
    ///
    /// Must be called from outside any event; reentrant `run` calls from an
    /// event body are not supported.
    pub fn run(&self) {
        loop {
            let (key, entry) = {
                let mut st = self.core.state.lock().unwrap();
                if st.queue.values().all(Queued::is_daemon) {
                    break;
                }
                let (key, entry) = st.queue.pop_first().expect("a non-daemon event exists");
                // The clock never regresses, even for events requested in the past.
                st.now = st.now.max(key.when);
                (key, entry)
            };

            self.fire_hooks(key.when, key.priority());

            match entry {
                Queued::Fresh { kind: EventKind::Synchronous, action, .. } => {
                    self.set_current(EventKind::Synchronous, None);
                    action(self);
                    self.clear_current();
                }
                Queued::Fresh { kind: EventKind::Detachable, action, .. } => {
                    self.launch(action);
                }
                Queued::Wakeup { gate } => {
                    self.wake(gate);
                }
            }
        }
    }

    // ── Detachable dispatch ───────────────────────────────────────────────

    /// Start a fresh virtual thread and block until it suspends or completes.
    fn launch(&self, action: EventAction) {
        let gate = Gate::new(Arc::downgrade(&self.core));
        self.set_current(EventKind::Detachable, Some(Arc::clone(&gate)));

        let exec = self.clone();
        let report_tx = gate.report_tx.clone();
        thread::Builder::new()
            .name("vt-detachable".into())
            .spawn(move || {
                action(&exec);
                let _ = report_tx.send(Report::Completed);
            })
            .expect("spawn virtual thread");

        self.await_report(&gate);
    }

    /// Re-open a parked virtual thread's gate and block until it suspends
    /// again or completes.
    fn wake(&self, gate: Arc<Gate>) {
        if gate.finished.load(Ordering::Acquire) {
            return; // stale wakeup for a thread that already completed
        }
        self.set_current(EventKind::Detachable, Some(Arc::clone(&gate)));
        gate.wake_tx.send(()).expect("waking a vanished virtual thread");
        self.await_report(&gate);
    }

    fn await_report(&self, gate: &Gate) {
        match gate
            .report_rx
            .recv()
            .expect("virtual thread vanished without reporting")
        {
            Report::Suspended => {}
            Report::Completed => gate.finished.store(true, Ordering::Release),
        }
        self.clear_current();
    }

    // ── Bookkeeping ───────────────────────────────────────────────────────

    fn set_current(&self, kind: EventKind, gate: Option<Arc<Gate>>) {
        self.core.state.lock().unwrap().current = Some(Current { kind, gate });
    }

    fn clear_current(&self) {
        self.core.state.lock().unwrap().current = None;
    }

    fn fire_hooks(&self, when: VirtualTime, priority: Priority) {
        let hooks = self.core.hooks.lock().unwrap();
        for hook in hooks.iter() {
            hook(when, priority);
        }
    }

    fn insert(
        &self,
        when: VirtualTime,
        priority: Priority,
        kind: EventKind,
        daemon: bool,
        action: EventAction,
    ) {
        let mut st = self.core.state.lock().unwrap();
        let key = EventKey {
            when,
            rank: -(priority.0 as i64),
            seq:  st.next_seq(),
        };
        st.queue.insert(key, Queued::Fresh { kind, daemon, action });
    }
}

impl Executive for TestExecutive {
    fn now(&self) -> VirtualTime {
        self.core.state.lock().unwrap().now
    }

    fn request_event(
        &self,
        when: VirtualTime,
        priority: Priority,
        kind: EventKind,
        action: EventAction,
    ) {
        self.insert(when, priority, kind, false, action);
    }

    fn request_daemon_event(
        &self,
        when: VirtualTime,
        priority: Priority,
        kind: EventKind,
        action: EventAction,
    ) {
        self.insert(when, priority, kind, true, action);
    }

    fn current_event_kind(&self) -> Option<EventKind> {
        self.core.state.lock().unwrap().current.as_ref().map(|c| c.kind)
    }

    fn current_controller(&self) -> Option<Arc<dyn EventController>> {
        let st = self.core.state.lock().unwrap();
        st.current
            .as_ref()
            .and_then(|c| c.gate.clone())
            .map(|g| g as Arc<dyn EventController>)
    }

    fn on_event_about_to_fire(&self, hook: FiringHook) {
        self.core.hooks.lock().unwrap().push(hook);
    }
}
