//! `vt-exchange` — blocking keyed coordination ("tuple space") for the
//! rust_vt simulation kernel.
//!
//! # Crate layout
//!
//! | Module       | Contents                                               |
//! |--------------|--------------------------------------------------------|
//! | [`exchange`] | `SynchronizedExchange`, `Tuple`, resumption priorities |
//! | [`observer`] | `ExchangeObserver` lifecycle callbacks                 |
//! | [`error`]    | `ExchangeError`, `ExchangeResult<T>`                   |
//!
//! # Coordination model (summary)
//!
//! Entities run as detachable events dispatched by the executive.  An
//! entity needing data it cannot get yet calls a blocking `read`/`take`
//! (or a blocking `post`, or `block_while_present`) and suspends; a later
//! `post`/`take` by another entity resumes it through the executive at a
//! priority that fixes the wake order among same-instant events:
//!
//! ```text
//! post(k)  → readers of k resume at READ_RESUME
//!          → takers  of k resume at TAKE_RESUME
//! take(k)  → detainees of that tuple resume at READ_RESUME
//!          → the blocked poster of k resumes at POSTER_RELEASE
//! ```

pub mod error;
pub mod exchange;
pub mod observer;
mod waiters;

#[cfg(test)]
mod tests;

pub use error::{ExchangeError, ExchangeResult};
pub use exchange::{POSTER_RELEASE, READ_RESUME, SynchronizedExchange, TAKE_RESUME, Tuple};
pub use observer::ExchangeObserver;
