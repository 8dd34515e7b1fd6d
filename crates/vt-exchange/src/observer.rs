//! Lifecycle observers for exchange traffic.

use std::sync::Arc;

use crate::Tuple;

/// Callbacks fired synchronously inside `post`/`read`/`take`, before
/// control returns to the caller.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.  Observers must not subscribe further
/// observers from inside a callback.
///
/// # Example — traffic counter
///
/// ```rust,ignore
/// #[derive(Default)]
/// struct Counter { posted: usize, taken: usize }
///
/// impl ExchangeObserver<&'static str, u32> for Counter {
///     fn on_posted(&mut self, _t: &Arc<Tuple<&'static str, u32>>) { self.posted += 1; }
///     fn on_taken(&mut self, _t: &Arc<Tuple<&'static str, u32>>) { self.taken += 1; }
/// }
/// ```
pub trait ExchangeObserver<K, V>: Send {
    /// A tuple was stored under its key.
    fn on_posted(&mut self, _tuple: &Arc<Tuple<K, V>>) {}

    /// A tuple was read non-destructively.
    fn on_read(&mut self, _tuple: &Arc<Tuple<K, V>>) {}

    /// A tuple was removed by a take.
    fn on_taken(&mut self, _tuple: &Arc<Tuple<K, V>>) {}
}
