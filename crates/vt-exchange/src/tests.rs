//! Unit and scenario tests for vt-exchange.

use std::sync::{Arc, Mutex};

use vt_core::{EventKind, Executive, Priority, TestExecutive, VirtualTime};

use crate::{ExchangeError, ExchangeObserver, SynchronizedExchange, Tuple};

// ── Helpers ───────────────────────────────────────────────────────────────────

type Xchg = Arc<SynchronizedExchange<&'static str, u32>>;
type Log = Arc<Mutex<Vec<(&'static str, VirtualTime)>>>;

fn setup() -> (TestExecutive, Xchg, Log) {
    let exec = TestExecutive::new();
    let xchg = Arc::new(SynchronizedExchange::new(
        Arc::new(exec.clone()) as Arc<dyn Executive>
    ));
    (exec, xchg, Arc::new(Mutex::new(Vec::new())))
}

/// Schedule a detachable entity at `when`.
fn entity<F>(exec: &TestExecutive, when: u64, body: F)
where
    F: FnOnce(&dyn Executive) + Send + 'static,
{
    exec.request_event(
        VirtualTime(when),
        Priority::ZERO,
        EventKind::Detachable,
        Box::new(body),
    );
}

/// Schedule a plain synchronous event at `when`.
fn at<F>(exec: &TestExecutive, when: u64, body: F)
where
    F: FnOnce(&dyn Executive) + Send + 'static,
{
    exec.request_event(
        VirtualTime(when),
        Priority::ZERO,
        EventKind::Synchronous,
        Box::new(body),
    );
}

fn names(log: &Log) -> Vec<&'static str> {
    log.lock().unwrap().iter().map(|(n, _)| *n).collect()
}

// ── Non-blocking paths ────────────────────────────────────────────────────────

#[cfg(test)]
mod non_blocking {
    use super::*;

    #[test]
    fn round_trip_returns_the_same_tuple() {
        let (_exec, xchg, _log) = setup();
        let posted = xchg.post("part", 7, false).unwrap();
        let taken = xchg.take(&"part", false).unwrap().unwrap();
        assert!(Arc::ptr_eq(&posted, &taken));
        assert_eq!(taken.data, 7);
        assert_eq!(taken.key, "part");

        // Gone after the take.
        assert!(xchg.read(&"part", false).unwrap().is_none());
        assert!(xchg.take(&"part", false).unwrap().is_none());
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let (_exec, xchg, _log) = setup();
        xchg.post("slot", 1, false).unwrap();
        let err = xchg.post("slot", 2, false).unwrap_err();
        assert_eq!(err, ExchangeError::KeyOccupied { key: "\"slot\"".into() });

        // The original tuple is untouched, and the key is reusable after a
        // take.
        assert_eq!(xchg.read(&"slot", false).unwrap().unwrap().data, 1);
        xchg.take(&"slot", false).unwrap().unwrap();
        xchg.post("slot", 2, false).unwrap();
    }

    #[test]
    fn read_does_not_consume() {
        let (_exec, xchg, _log) = setup();
        let posted = xchg.post("k", 9, false).unwrap();
        let first = xchg.read(&"k", false).unwrap().unwrap();
        let second = xchg.read(&"k", false).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &posted));
        assert_eq!(xchg.take(&"k", false).unwrap().unwrap().data, 9);
    }

    #[test]
    fn absent_key_is_a_normal_outcome() {
        let (_exec, xchg, _log) = setup();
        assert!(xchg.read(&"nothing", false).unwrap().is_none());
        assert!(xchg.take(&"nothing", false).unwrap().is_none());
    }

    #[test]
    fn duplicate_keys_never_permitted() {
        let (_exec, xchg, _log) = setup();
        assert!(!xchg.permits_duplicate_keys());
    }
}

// ── Contract violations ───────────────────────────────────────────────────────

#[cfg(test)]
mod contract {
    use super::*;

    #[test]
    fn blocking_calls_outside_any_event_are_rejected() {
        let (_exec, xchg, _log) = setup();
        assert_eq!(xchg.read(&"k", true).unwrap_err(), ExchangeError::NotDetachable);
        assert_eq!(xchg.take(&"k", true).unwrap_err(), ExchangeError::NotDetachable);
        assert_eq!(
            xchg.post("k", 0, true).unwrap_err(),
            ExchangeError::NotDetachable
        );
        assert_eq!(
            xchg.block_while_present(&"k").unwrap_err(),
            ExchangeError::NotDetachable
        );
    }

    #[test]
    fn blocking_calls_from_synchronous_events_are_rejected() {
        let (exec, xchg, _log) = setup();
        let result = Arc::new(Mutex::new(None));
        {
            let xchg = Arc::clone(&xchg);
            let result = Arc::clone(&result);
            at(&exec, 1, move |_| {
                *result.lock().unwrap() = Some(xchg.read(&"k", true));
            });
        }
        exec.run();
        let got = result.lock().unwrap().clone().unwrap();
        assert_eq!(got.unwrap_err(), ExchangeError::NotDetachable);
    }

    #[test]
    fn blocking_calls_rejected_even_when_data_is_present() {
        let (_exec, xchg, _log) = setup();
        xchg.post("k", 1, false).unwrap();
        assert_eq!(xchg.read(&"k", true).unwrap_err(), ExchangeError::NotDetachable);
        assert_eq!(xchg.take(&"k", true).unwrap_err(), ExchangeError::NotDetachable);
    }

    #[test]
    fn non_blocking_calls_need_no_event_context() {
        let (_exec, xchg, _log) = setup();
        xchg.post("k", 1, false).unwrap();
        xchg.read(&"k", false).unwrap().unwrap();
        xchg.take(&"k", false).unwrap().unwrap();
    }
}

// ── Observers ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod observers {
    use super::*;

    struct Recorder {
        events: Arc<Mutex<Vec<(&'static str, u32)>>>,
    }

    impl ExchangeObserver<&'static str, u32> for Recorder {
        fn on_posted(&mut self, tuple: &Arc<Tuple<&'static str, u32>>) {
            self.events.lock().unwrap().push(("posted", tuple.data));
        }
        fn on_read(&mut self, tuple: &Arc<Tuple<&'static str, u32>>) {
            self.events.lock().unwrap().push(("read", tuple.data));
        }
        fn on_taken(&mut self, tuple: &Arc<Tuple<&'static str, u32>>) {
            self.events.lock().unwrap().push(("taken", tuple.data));
        }
    }

    #[test]
    fn lifecycle_callbacks_fire_synchronously() {
        let (_exec, xchg, _log) = setup();
        let events = Arc::new(Mutex::new(Vec::new()));
        xchg.subscribe(Box::new(Recorder { events: Arc::clone(&events) }));

        xchg.post("k", 5, false).unwrap();
        assert_eq!(*events.lock().unwrap(), vec![("posted", 5)]);

        xchg.read(&"k", false).unwrap().unwrap();
        xchg.take(&"k", false).unwrap().unwrap();
        assert_eq!(
            *events.lock().unwrap(),
            vec![("posted", 5), ("read", 5), ("taken", 5)]
        );
    }

    #[test]
    fn absent_reads_and_takes_notify_nothing() {
        let (_exec, xchg, _log) = setup();
        let events = Arc::new(Mutex::new(Vec::new()));
        xchg.subscribe(Box::new(Recorder { events: Arc::clone(&events) }));

        xchg.read(&"k", false).unwrap();
        xchg.take(&"k", false).unwrap();
        assert!(events.lock().unwrap().is_empty());
    }
}

// ── Blocking scenarios ────────────────────────────────────────────────────────

#[cfg(test)]
mod scenarios {
    use super::*;

    fn log_to(log: &Log, name: &'static str, exec: &dyn Executive) {
        log.lock().unwrap().push((name, exec.now()));
    }

    #[test]
    fn blocking_read_waits_for_post() {
        let (exec, xchg, log) = setup();
        {
            let xchg = Arc::clone(&xchg);
            let log = Arc::clone(&log);
            entity(&exec, 1, move |e| {
                log_to(&log, "reader-parked", e);
                let tuple = xchg.read(&"k", true).unwrap().unwrap();
                assert_eq!(tuple.data, 11);
                log_to(&log, "reader-woke", e);
            });
        }
        {
            let xchg = Arc::clone(&xchg);
            at(&exec, 5, move |_| {
                xchg.post("k", 11, false).unwrap();
            });
        }
        exec.run();

        assert_eq!(
            log.lock().unwrap().clone(),
            vec![
                ("reader-parked", VirtualTime(1)),
                ("reader-woke", VirtualTime(5)),
            ]
        );
    }

    #[test]
    fn readers_wake_before_takers_and_both_are_served() {
        let (exec, xchg, log) = setup();
        {
            let xchg = Arc::clone(&xchg);
            let log = Arc::clone(&log);
            entity(&exec, 1, move |e| {
                log_to(&log, "reader-parked", e);
                let tuple = xchg.read(&"k", true).unwrap().unwrap();
                assert_eq!(tuple.data, 3);
                log_to(&log, "reader-woke", e);
            });
        }
        {
            let xchg = Arc::clone(&xchg);
            let log = Arc::clone(&log);
            entity(&exec, 1, move |e| {
                log_to(&log, "taker-parked", e);
                let tuple = xchg.take(&"k", true).unwrap().unwrap();
                assert_eq!(tuple.data, 3, "read must not have consumed the tuple");
                log_to(&log, "taker-woke", e);
            });
        }
        {
            let xchg = Arc::clone(&xchg);
            at(&exec, 2, move |_| {
                xchg.post("k", 3, false).unwrap();
            });
        }
        exec.run();

        assert_eq!(
            names(&log),
            vec!["reader-parked", "taker-parked", "reader-woke", "taker-woke"]
        );
    }

    #[test]
    fn blocking_post_returns_only_after_a_take() {
        let (exec, xchg, log) = setup();
        {
            let xchg = Arc::clone(&xchg);
            let log = Arc::clone(&log);
            entity(&exec, 1, move |e| {
                log_to(&log, "poster-parked", e);
                xchg.post("job", 42, true).unwrap();
                log_to(&log, "poster-released", e);
            });
        }
        {
            let xchg = Arc::clone(&xchg);
            let log = Arc::clone(&log);
            at(&exec, 6, move |e| {
                let tuple = xchg.take(&"job", false).unwrap().unwrap();
                assert_eq!(tuple.data, 42);
                log_to(&log, "taken", e);
            });
        }
        exec.run();

        assert_eq!(
            log.lock().unwrap().clone(),
            vec![
                ("poster-parked", VirtualTime(1)),
                ("taken", VirtualTime(6)),
                ("poster-released", VirtualTime(6)),
            ]
        );
    }

    #[test]
    fn full_wake_chain_orders_reader_taker_poster() {
        let (exec, xchg, log) = setup();
        {
            let xchg = Arc::clone(&xchg);
            let log = Arc::clone(&log);
            entity(&exec, 1, move |e| {
                xchg.read(&"k", true).unwrap().unwrap();
                log_to(&log, "reader-woke", e);
            });
        }
        {
            let xchg = Arc::clone(&xchg);
            let log = Arc::clone(&log);
            entity(&exec, 1, move |e| {
                xchg.take(&"k", true).unwrap().unwrap();
                log_to(&log, "taker-woke", e);
            });
        }
        {
            let xchg = Arc::clone(&xchg);
            let log = Arc::clone(&log);
            entity(&exec, 2, move |e| {
                xchg.post("k", 1, true).unwrap();
                log_to(&log, "poster-released", e);
            });
        }
        exec.run();

        // All three resolve at T2, strictly in priority order.
        assert_eq!(
            log.lock().unwrap().clone(),
            vec![
                ("reader-woke", VirtualTime(2)),
                ("taker-woke", VirtualTime(2)),
                ("poster-released", VirtualTime(2)),
            ]
        );
    }

    #[test]
    fn block_while_present_released_by_that_specific_take() {
        let (exec, xchg, log) = setup();
        {
            let xchg = Arc::clone(&xchg);
            at(&exec, 1, move |_| {
                xchg.post("k", 1, false).unwrap();
            });
        }
        {
            let xchg = Arc::clone(&xchg);
            let log = Arc::clone(&log);
            entity(&exec, 2, move |e| {
                log_to(&log, "detainee-parked", e);
                xchg.block_while_present(&"k").unwrap();
                log_to(&log, "detainee-released", e);
            });
        }
        {
            let xchg = Arc::clone(&xchg);
            let log = Arc::clone(&log);
            at(&exec, 3, move |e| {
                xchg.take(&"k", false).unwrap().unwrap();
                // Recycle the key immediately: the detainee watched the
                // instance, not the key, so this must not keep it parked.
                xchg.post("k", 2, false).unwrap();
                log_to(&log, "recycled", e);
            });
        }
        exec.run();

        assert_eq!(
            log.lock().unwrap().clone(),
            vec![
                ("detainee-parked", VirtualTime(2)),
                ("recycled", VirtualTime(3)),
                ("detainee-released", VirtualTime(3)),
            ]
        );
        // The re-posted tuple is still there.
        assert_eq!(xchg.read(&"k", false).unwrap().unwrap().data, 2);
    }

    #[test]
    fn block_while_present_on_vacant_key_returns_immediately() {
        let (exec, xchg, log) = setup();
        {
            let xchg = Arc::clone(&xchg);
            let log = Arc::clone(&log);
            entity(&exec, 1, move |e| {
                xchg.block_while_present(&"nothing").unwrap();
                log_to(&log, "returned", e);
            });
        }
        exec.run();
        assert_eq!(log.lock().unwrap().clone(), vec![("returned", VirtualTime(1))]);
    }

    #[test]
    fn waiting_counts_track_parked_entities() {
        let (exec, xchg, _log) = setup();
        {
            let xchg = Arc::clone(&xchg);
            entity(&exec, 1, move |_| {
                let _ = xchg.read(&"k", true);
            });
        }
        {
            let xchg = Arc::clone(&xchg);
            entity(&exec, 1, move |_| {
                let _ = xchg.take(&"k", true);
            });
        }
        exec.run();

        // Nobody ever posts: both entities stay parked, and no cancellation
        // path exists that would withdraw them.
        assert_eq!(xchg.waiting_readers(&"k"), 1);
        assert_eq!(xchg.waiting_takers(&"k"), 1);
        assert_eq!(xchg.waited_keys(), vec!["k"]);
        assert_eq!(xchg.waiting_readers(&"other"), 0);
    }

    #[test]
    fn second_taker_loops_back_to_sleep_until_the_next_post() {
        let (exec, xchg, log) = setup();
        for name in ["first-taker", "second-taker"] {
            let xchg = Arc::clone(&xchg);
            let log = Arc::clone(&log);
            entity(&exec, 1, move |e| {
                let tuple = xchg.take(&"k", true).unwrap().unwrap();
                assert_eq!(u64::from(tuple.data), e.now().0);
                log_to(&log, name, e);
            });
        }
        {
            let xchg = Arc::clone(&xchg);
            at(&exec, 10, move |_| {
                xchg.post("k", 10, false).unwrap();
            });
        }
        {
            let xchg = Arc::clone(&xchg);
            at(&exec, 20, move |_| {
                xchg.post("k", 20, false).unwrap();
            });
        }
        exec.run();

        // The first post serves the first taker; the second taker retries,
        // finds the key bare, and sleeps until the second post.
        assert_eq!(
            log.lock().unwrap().clone(),
            vec![
                ("first-taker", VirtualTime(10)),
                ("second-taker", VirtualTime(20)),
            ]
        );
    }
}

// ── WaiterRegistry ────────────────────────────────────────────────────────────

#[cfg(test)]
mod waiters {
    use super::*;

    use vt_core::EventController;

    use crate::waiters::{Waiter, WaiterRegistry};

    struct NullController;

    impl EventController for NullController {
        fn suspend(&self) {}
        fn resume(&self, _priority: Priority) {}
    }

    fn ctl() -> Waiter {
        Arc::new(NullController)
    }

    #[test]
    fn waiters_are_ordered_and_absent_keys_are_empty() {
        let mut reg: WaiterRegistry<&'static str> = WaiterRegistry::new();
        assert!(reg.waiters(&"k").is_empty());

        let (a, b) = (ctl(), ctl());
        reg.add("k", Arc::clone(&a));
        reg.add("k", Arc::clone(&b));
        let listed = reg.waiters(&"k");
        assert_eq!(listed.len(), 2);
        assert!(Arc::ptr_eq(&listed[0], &a));
        assert!(Arc::ptr_eq(&listed[1], &b));
    }

    #[test]
    fn remove_waiter_matches_by_identity() {
        let mut reg: WaiterRegistry<&'static str> = WaiterRegistry::new();
        let (a, b) = (ctl(), ctl());
        reg.add("k", Arc::clone(&a));
        reg.add("k", Arc::clone(&b));

        reg.remove_waiter(&"k", &a);
        let listed = reg.waiters(&"k");
        assert_eq!(listed.len(), 1);
        assert!(Arc::ptr_eq(&listed[0], &b));

        // Unknown key and already-removed waiter are no-ops.
        reg.remove_waiter(&"missing", &a);
        reg.remove_waiter(&"k", &a);
        assert_eq!(reg.waiters(&"k").len(), 1);
    }

    #[test]
    fn remove_all_detaches_the_whole_list() {
        let mut reg: WaiterRegistry<&'static str> = WaiterRegistry::new();
        reg.add("k", ctl());
        reg.add("k", ctl());
        reg.add("other", ctl());

        let drained = reg.remove_all(&"k");
        assert_eq!(drained.len(), 2);
        assert!(reg.waiters(&"k").is_empty());
        assert_eq!(reg.waiters(&"other").len(), 1);
        assert!(reg.remove_all(&"k").is_empty());
    }

    #[test]
    fn keys_prunes_emptied_lists() {
        let mut reg: WaiterRegistry<&'static str> = WaiterRegistry::new();
        let a = ctl();
        reg.add("emptied", Arc::clone(&a));
        reg.add("kept", ctl());
        reg.remove_waiter(&"emptied", &a);

        let keys: Vec<&&str> = reg.keys().collect();
        assert_eq!(keys, vec![&"kept"]);
    }
}
