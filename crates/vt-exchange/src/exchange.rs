//! `SynchronizedExchange` — the blocking keyed coordination primitive.
//!
//! # Model
//!
//! A keyed store holding at most one live tuple per key.  Producers `post`,
//! consumers `read` (non-destructive) or `take` (removing); each operation
//! has a non-blocking form returning `Option` and a blocking form that
//! suspends the calling virtual thread until the request can be satisfied.
//! `block_while_present` parks the caller until one specific tuple
//! *instance* is taken.
//!
//! # Wake order
//!
//! A post resumes every reader waiting on the key at [`READ_RESUME`] and
//! every taker at [`TAKE_RESUME`]; a take releases a blocked poster at
//! [`POSTER_RELEASE`].  With all of them due at the same instant the
//! executive dispatches in descending priority, so readers observe the
//! tuple, then takers compete for it, and only then is a blocked poster
//! released.  The exchange relies purely on these priorities; it never
//! dispatches anything itself.
//!
//! # Locking
//!
//! All mutable state (store, waiter registries, blocked posters, detainees)
//! lives behind a single mutex, and virtual threads suspend only after the
//! guard is dropped.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;
use vt_core::{EventController, EventKind, Executive, Priority};

use crate::waiters::WaiterRegistry;
use crate::{ExchangeError, ExchangeObserver, ExchangeResult};

// ── Resumption priorities ─────────────────────────────────────────────────────

/// Readers woken by a post resume first among same-instant events.
pub const READ_RESUME: Priority = Priority(30);
/// Takers woken by a post resume after the readers.
pub const TAKE_RESUME: Priority = Priority(20);
/// A poster blocked on its own tuple is released last.
pub const POSTER_RELEASE: Priority = Priority(10);

// ── Tuple ─────────────────────────────────────────────────────────────────────

/// A keyed datum owned by the exchange once posted.
///
/// Tuples are shared as `Arc` so reads are non-destructive without cloning
/// the payload, and so [`SynchronizedExchange::block_while_present`] can
/// match the exact instance rather than the key.
#[derive(Debug)]
pub struct Tuple<K, V> {
    pub key:  K,
    pub data: V,
}

// ── Exchange ──────────────────────────────────────────────────────────────────

struct State<K, V> {
    store:           FxHashMap<K, Arc<Tuple<K, V>>>,
    readers:         WaiterRegistry<K>,
    takers:          WaiterRegistry<K>,
    blocked_posters: FxHashMap<K, Arc<dyn EventController>>,
    detainees:       Vec<(Arc<Tuple<K, V>>, Arc<dyn EventController>)>,
}

/// Blocking/non-blocking Post/Read/Take coordination between virtual
/// threads, keyed by `K`.
pub struct SynchronizedExchange<K, V> {
    exec:      Arc<dyn Executive>,
    state:     Mutex<State<K, V>>,
    observers: Mutex<Vec<Box<dyn ExchangeObserver<K, V>>>>,
}

impl<K, V> SynchronizedExchange<K, V>
where
    K: Eq + Hash + Clone + Debug,
{
    pub fn new(exec: Arc<dyn Executive>) -> Self {
        SynchronizedExchange {
            exec,
            state: Mutex::new(State {
                store:           FxHashMap::default(),
                readers:         WaiterRegistry::new(),
                takers:          WaiterRegistry::new(),
                blocked_posters: FxHashMap::default(),
                detainees:       Vec::new(),
            }),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Always `false`: at most one live tuple may exist per key.
    pub fn permits_duplicate_keys(&self) -> bool {
        false
    }

    /// Register a lifecycle observer.  Callbacks run synchronously inside
    /// the triggering call.
    pub fn subscribe(&self, observer: Box<dyn ExchangeObserver<K, V>>) {
        self.observers.lock().unwrap().push(observer);
    }

    /// Store `data` under `key` and wake everything waiting on that key:
    /// readers at [`READ_RESUME`], then takers at [`TAKE_RESUME`].
    ///
    /// With `blocking`, the calling virtual thread then parks as the key's
    /// blocked poster and only returns once a take removes the tuple.
    ///
    /// An occupied key is rejected with [`ExchangeError::KeyOccupied`]; the
    /// store never silently overwrites.
    pub fn post(&self, key: K, data: V, blocking: bool) -> ExchangeResult<Arc<Tuple<K, V>>> {
        let controller = if blocking {
            Some(self.detachable_controller()?)
        } else {
            None
        };

        let tuple = Arc::new(Tuple { key: key.clone(), data });
        let (readers, takers) = {
            let mut st = self.state.lock().unwrap();
            if st.store.contains_key(&key) {
                return Err(ExchangeError::KeyOccupied { key: format!("{key:?}") });
            }
            if st.blocked_posters.contains_key(&key) {
                // A pending poster always coexists with its live tuple, so
                // the occupied-key check above normally fires first.
                return Err(ExchangeError::PosterStillBlocked { key: format!("{key:?}") });
            }
            st.store.insert(key.clone(), Arc::clone(&tuple));
            if let Some(ctl) = &controller {
                st.blocked_posters.insert(key.clone(), Arc::clone(ctl));
            }
            (st.readers.remove_all(&key), st.takers.remove_all(&key))
        };

        self.notify(&tuple, |obs, t| obs.on_posted(t));
        for reader in readers {
            reader.resume(READ_RESUME);
        }
        for taker in takers {
            taker.resume(TAKE_RESUME);
        }

        if let Some(ctl) = controller {
            ctl.suspend();
        }
        Ok(tuple)
    }

    /// Return the tuple under `key` without removing it, or `Ok(None)` when
    /// absent (a normal outcome, never an error).
    ///
    /// With `blocking`, an absent key parks the caller as a read-waiter; on
    /// wakeup the lookup is retried, so a racing take that empties the key
    /// again simply puts the caller back to sleep.
    pub fn read(&self, key: &K, blocking: bool) -> ExchangeResult<Option<Arc<Tuple<K, V>>>> {
        let controller = if blocking {
            Some(self.detachable_controller()?)
        } else {
            None
        };

        loop {
            let found = self.state.lock().unwrap().store.get(key).cloned();
            if let Some(tuple) = found {
                self.notify(&tuple, |obs, t| obs.on_read(t));
                return Ok(Some(tuple));
            }
            let Some(ctl) = &controller else {
                return Ok(None);
            };
            self.state.lock().unwrap().readers.add(key.clone(), Arc::clone(ctl));
            ctl.suspend();
        }
    }

    /// Atomically remove and return the tuple under `key`, or `Ok(None)`
    /// when absent.  A successful take wakes any `block_while_present`
    /// detainees of that tuple instance and releases a blocked poster at
    /// [`POSTER_RELEASE`].
    ///
    /// With `blocking`, an absent key parks the caller as a take-waiter and
    /// retries on wakeup, exactly like `read`.
    pub fn take(&self, key: &K, blocking: bool) -> ExchangeResult<Option<Arc<Tuple<K, V>>>> {
        let controller = if blocking {
            Some(self.detachable_controller()?)
        } else {
            None
        };

        loop {
            let removed = {
                let mut st = self.state.lock().unwrap();
                match st.store.remove(key) {
                    None => None,
                    Some(tuple) => {
                        let poster = st.blocked_posters.remove(key);
                        let mut released = Vec::new();
                        st.detainees.retain(|(held, ctl)| {
                            if Arc::ptr_eq(held, &tuple) {
                                released.push(Arc::clone(ctl));
                                false
                            } else {
                                true
                            }
                        });
                        Some((tuple, poster, released))
                    }
                }
            };

            if let Some((tuple, poster, released)) = removed {
                self.notify(&tuple, |obs, t| obs.on_taken(t));
                for detainee in released {
                    detainee.resume(READ_RESUME);
                }
                if let Some(poster) = poster {
                    poster.resume(POSTER_RELEASE);
                }
                return Ok(Some(tuple));
            }
            let Some(ctl) = &controller else {
                return Ok(None);
            };
            self.state.lock().unwrap().takers.add(key.clone(), Arc::clone(ctl));
            ctl.suspend();
        }
    }

    /// Park the caller while the tuple currently under `key` remains in the
    /// store.  The caller is resumed by the take of that same instance —
    /// a re-post under the key after removal does not keep it parked, and
    /// an earlier take of some *other* tuple under the key never wakes it.
    ///
    /// Returns immediately when the key is vacant.
    pub fn block_while_present(&self, key: &K) -> ExchangeResult<()> {
        let ctl = self.detachable_controller()?;
        let parked = {
            let mut st = self.state.lock().unwrap();
            match st.store.get(key) {
                None => false,
                Some(tuple) => {
                    let held = Arc::clone(tuple);
                    st.detainees.push((held, Arc::clone(&ctl)));
                    true
                }
            }
        };
        if parked {
            ctl.suspend();
        }
        Ok(())
    }

    // ── Introspection ─────────────────────────────────────────────────────

    /// Number of virtual threads currently waiting to read `key`.
    pub fn waiting_readers(&self, key: &K) -> usize {
        self.state.lock().unwrap().readers.waiters(key).len()
    }

    /// Number of virtual threads currently waiting to take `key`.
    pub fn waiting_takers(&self, key: &K) -> usize {
        self.state.lock().unwrap().takers.waiters(key).len()
    }

    /// Keys with at least one waiting reader or taker.
    pub fn waited_keys(&self) -> Vec<K> {
        let mut st = self.state.lock().unwrap();
        let mut keys: Vec<K> = st.readers.keys().cloned().collect();
        for key in st.takers.keys() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// The controller of the calling virtual thread, or `NotDetachable`
    /// when the caller is not running as a detachable event.
    fn detachable_controller(&self) -> ExchangeResult<Arc<dyn EventController>> {
        if self.exec.current_event_kind() != Some(EventKind::Detachable) {
            return Err(ExchangeError::NotDetachable);
        }
        self.exec
            .current_controller()
            .ok_or(ExchangeError::NotDetachable)
    }

    /// Deliver one lifecycle notification to every observer, synchronously.
    fn notify<F>(&self, tuple: &Arc<Tuple<K, V>>, f: F)
    where
        F: Fn(&mut dyn ExchangeObserver<K, V>, &Arc<Tuple<K, V>>),
    {
        let mut observers = self.observers.lock().unwrap();
        for obs in observers.iter_mut() {
            f(obs.as_mut(), tuple);
        }
    }
}
