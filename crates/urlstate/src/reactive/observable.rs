#![forbid(unsafe_code)]

//! Shared, version-tracked values with synchronous change notification.
//!
//! An [`Observable<T>`] is a cheaply cloneable handle (`Rc`) to a value plus
//! a subscriber list. Clones share the same value: setting through one
//! handle is visible through all of them.
//!
//! # Invariants
//!
//! 1. `set()` with a value equal to the current one is a no-op (no version
//!    bump, no notifications).
//! 2. `set_always()` bumps the version and notifies exactly once, even when
//!    the value compares equal.
//! 3. Subscribers are notified synchronously, in registration order.
//! 4. No `RefCell` borrow is held while a subscriber runs, so callbacks may
//!    read or write any observable (including this one) re-entrantly.
//! 5. Dropping a [`Subscription`] removes its callback before the next
//!    notification cycle.
//!
//! # Failure Modes
//!
//! - Subscriber panic: propagates to the caller of `set*()`/`notify()`.
//!   Subscribers registered after the panicking one are not called.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

struct Callback<T>(Box<dyn Fn(&T)>);

struct Shared<T> {
    value: T,
    version: u64,
    subscribers: Vec<Weak<Callback<T>>>,
}

/// A shared value that notifies subscribers when it changes.
pub struct Observable<T> {
    inner: Rc<RefCell<Shared<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &shared.value)
            .field("version", &shared.version)
            .finish()
    }
}

impl<T: Default + Clone + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + 'static> Observable<T> {
    /// Create an observable holding `value` at version 0.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Shared {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Clone out the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value for the duration of `f`.
    ///
    /// `f` must not write to this observable.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Number of mutations applied so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Replace the value and notify unconditionally.
    pub fn set_always(&self, value: T) {
        self.set_silent(value);
        self.notify();
    }

    /// Replace the value and bump the version without notifying.
    ///
    /// Pair with [`notify`](Self::notify) when other state must be updated
    /// between the write and the notification.
    pub fn set_silent(&self, value: T) {
        let mut shared = self.inner.borrow_mut();
        shared.value = value;
        shared.version += 1;
    }

    /// Notify every live subscriber with the current value.
    pub fn notify(&self) {
        let (value, callbacks) = {
            let mut shared = self.inner.borrow_mut();
            shared.subscribers.retain(|w| w.strong_count() > 0);
            let callbacks: Vec<Rc<Callback<T>>> =
                shared.subscribers.iter().filter_map(Weak::upgrade).collect();
            (shared.value.clone(), callbacks)
        };
        for cb in callbacks {
            (cb.0)(&value);
        }
    }

    /// Register `callback` to run after every notification.
    ///
    /// The callback stays registered until the returned [`Subscription`]
    /// is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let cb: Rc<Callback<T>> = Rc::new(Callback(Box::new(callback)));
        self.inner.borrow_mut().subscribers.push(Rc::downgrade(&cb));
        Subscription { _guard: cb }
    }

    /// Number of subscribers that have not been dropped.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Replace the value, notifying only when it differs from the current one.
    pub fn set(&self, value: T) {
        if self.inner.borrow().value == value {
            return;
        }
        self.set_always(value);
    }

    /// Mutate the value in place, notifying only when it changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut next = self.get();
        f(&mut next);
        self.set(next);
    }
}

/// RAII guard for an [`Observable`] callback. Dropping it unsubscribes.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    _guard: Rc<dyn Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
