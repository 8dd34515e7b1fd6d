//! Key-indexed lists of suspended virtual threads.

use std::hash::Hash;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use vt_core::EventController;

pub(crate) type Waiter = Arc<dyn EventController>;

/// Multimap from key to the virtual threads waiting on it, oldest first.
pub(crate) struct WaiterRegistry<K> {
    inner: FxHashMap<K, Vec<Waiter>>,
}

impl<K: Eq + Hash + Clone> WaiterRegistry<K> {
    pub(crate) fn new() -> Self {
        WaiterRegistry { inner: FxHashMap::default() }
    }

    /// Append `waiter` to the key's list.
    pub(crate) fn add(&mut self, key: K, waiter: Waiter) {
        self.inner.entry(key).or_default().push(waiter);
    }

    /// Drop one waiter by controller identity.  Unknown keys and absent
    /// waiters are a no-op.
    pub(crate) fn remove_waiter(&mut self, key: &K, waiter: &Waiter) {
        if let Some(list) = self.inner.get_mut(key) {
            list.retain(|w| !Arc::ptr_eq(w, waiter));
        }
    }

    /// Detach and return every waiter registered under `key`, oldest first.
    pub(crate) fn remove_all(&mut self, key: &K) -> Vec<Waiter> {
        self.inner.remove(key).unwrap_or_default()
    }

    /// Waiters under `key`, oldest first; empty when none.
    pub(crate) fn waiters(&self, key: &K) -> &[Waiter] {
        self.inner.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Keys with at least one waiter.  Lists emptied by `remove_waiter`
    /// are pruned before iterating.
    pub(crate) fn keys(&mut self) -> impl Iterator<Item = &K> {
        self.inner.retain(|_, list| !list.is_empty());
        self.inner.keys()
    }
}
