#![forbid(unsafe_code)]

//! Reactive primitives the search-param bindings are built on.
//!
//! - [`Observable`]: a shared, version-tracked value with change
//!   notification via subscriber callbacks.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`Scope`]: owning scope that holds subscriptions and disposal hooks,
//!   and is discoverable through [`Scope::current`] while it runs.
//!
//! # Architecture
//!
//! `Observable<T>` uses `Rc<RefCell<..>>` for single-threaded shared
//! ownership. Subscribers are stored as `Weak` callbacks and cleaned up
//! lazily during notification. Notification is synchronous: by the time
//! `set()` returns, every subscriber has run.
//!
//! `Scope` uses a thread-local stack so that nested `run()` calls see the
//! innermost scope.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per applied mutation.
//! 2. Subscribers are notified in registration order.
//! 3. `set()` with a value equal to the current value is a no-op.
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.
//! 5. Disposing a [`Scope`] releases its subscriptions, then runs its hooks.

pub mod observable;
pub mod scope;

pub use observable::{Observable, Subscription};
pub use scope::Scope;
