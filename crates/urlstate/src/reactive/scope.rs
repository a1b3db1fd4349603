#![forbid(unsafe_code)]

//! Owning reactive scopes.
//!
//! A [`Scope`] collects subscriptions and disposal hooks for a logical
//! owner (an app root, a component, a test). Code executed through
//! [`Scope::run`] sees that scope as [`Scope::current`], which lets
//! factories hand lifetimes to their caller's scope without threading a
//! parameter through every call.
//!
//! # Usage
//!
//! ```
//! use urlstate::reactive::{Observable, Scope};
//!
//! let obs = Observable::new(1);
//! let scope = Scope::new();
//! scope.run(|| {
//!     let current = Scope::current().expect("inside run");
//!     current.hold(obs.subscribe(|v| println!("value: {v}")));
//! });
//! assert_eq!(obs.subscriber_count(), 1);
//!
//! scope.dispose();
//! assert_eq!(obs.subscriber_count(), 0);
//! ```
//!
//! # Invariants
//!
//! 1. Subscriptions are released in reverse registration order on dispose.
//! 2. Disposal hooks run exactly once, in reverse registration order, after
//!    the subscriptions are released.
//! 3. A hook registered on an already-disposed scope runs immediately.
//! 4. Dropping the last handle to a scope disposes it.
//! 5. `run` restores the previous current scope even if the closure panics.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::observable::Subscription;

thread_local! {
    static SCOPE_STACK: RefCell<Vec<Weak<ScopeInner>>> = const { RefCell::new(Vec::new()) };
    static NEXT_SCOPE_ID: Cell<u64> = const { Cell::new(1) };
}

type DisposeHook = Box<dyn FnOnce()>;

struct ScopeInner {
    id: u64,
    disposed: Cell<bool>,
    subscriptions: RefCell<Vec<Subscription>>,
    hooks: RefCell<Vec<DisposeHook>>,
}

impl ScopeInner {
    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        let subs = std::mem::take(&mut *self.subscriptions.borrow_mut());
        for sub in subs.into_iter().rev() {
            drop(sub);
        }
        // Hooks may register further hooks; those run immediately.
        let hooks = std::mem::take(&mut *self.hooks.borrow_mut());
        for hook in hooks.into_iter().rev() {
            hook();
        }
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Handle to an owning reactive scope. Clones share the same scope.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

impl Scope {
    /// Create an empty, live scope.
    #[must_use]
    pub fn new() -> Self {
        let id = NEXT_SCOPE_ID.with(|n| {
            let id = n.get();
            n.set(id + 1);
            id
        });
        Self {
            inner: Rc::new(ScopeInner {
                id,
                disposed: Cell::new(false),
                subscriptions: RefCell::new(Vec::new()),
                hooks: RefCell::new(Vec::new()),
            }),
        }
    }

    /// The innermost scope currently executing [`run`](Self::run), if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        SCOPE_STACK.with(|stack| {
            stack
                .borrow()
                .iter()
                .rev()
                .find_map(Weak::upgrade)
                .map(|inner| Self { inner })
        })
    }

    /// Run `f` with this scope as the current scope.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        struct PopOnExit;
        impl Drop for PopOnExit {
            fn drop(&mut self) {
                SCOPE_STACK.with(|stack| {
                    stack.borrow_mut().pop();
                });
            }
        }

        SCOPE_STACK.with(|stack| stack.borrow_mut().push(Rc::downgrade(&self.inner)));
        let _pop = PopOnExit;
        f()
    }

    /// Process-unique identifier of this scope.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Keep `sub` alive until the scope is disposed.
    ///
    /// On a disposed scope the subscription is dropped immediately.
    pub fn hold(&self, sub: Subscription) {
        if self.is_disposed() {
            return;
        }
        self.inner.subscriptions.borrow_mut().push(sub);
    }

    /// Register a hook to run when the scope is disposed.
    pub fn on_dispose(&self, hook: impl FnOnce() + 'static) {
        if self.is_disposed() {
            hook();
            return;
        }
        self.inner.hooks.borrow_mut().push(Box::new(hook));
    }

    /// Release every held subscription and run the disposal hooks.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Whether [`dispose`](Self::dispose) already ran.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Number of subscriptions currently held.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.borrow().len()
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Scope {}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.inner.id)
            .field("disposed", &self.inner.disposed.get())
            .field("subscription_count", &self.inner.subscriptions.borrow().len())
            .field("hook_count", &self.inner.hooks.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Observable;

    #[test]
    fn current_is_none_outside_run() {
        assert!(Scope::current().is_none());
    }

    #[test]
    fn run_sets_and_restores_current() {
        let outer = Scope::new();
        let inner = Scope::new();
        outer.run(|| {
            assert_eq!(Scope::current(), Some(outer.clone()));
            inner.run(|| assert_eq!(Scope::current(), Some(inner.clone())));
            assert_eq!(Scope::current(), Some(outer.clone()));
        });
        assert!(Scope::current().is_none());
    }

    #[test]
    fn run_restores_current_after_panic() {
        let scope = Scope::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            scope.run(|| panic!("boom"));
        }));
        assert!(result.is_err());
        assert!(Scope::current().is_none());
    }

    #[test]
    fn dispose_releases_subscriptions() {
        let obs = Observable::new(0);
        let seen = Rc::new(Cell::new(0));
        let scope = Scope::new();
        let s = Rc::clone(&seen);
        scope.hold(obs.subscribe(move |v| s.set(*v)));
        assert_eq!(scope.subscription_count(), 1);

        obs.set(1);
        scope.dispose();
        obs.set(2);
        assert_eq!(seen.get(), 1);
        assert_eq!(scope.subscription_count(), 0);
    }

    #[test]
    fn hooks_run_once_in_reverse_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let scope = Scope::new();
        for i in 0..3 {
            let log = Rc::clone(&log);
            scope.on_dispose(move || log.borrow_mut().push(i));
        }
        scope.dispose();
        scope.dispose();
        assert_eq!(*log.borrow(), vec![2, 1, 0]);
    }

    #[test]
    fn hook_on_disposed_scope_runs_immediately() {
        let scope = Scope::new();
        scope.dispose();
        let ran = Rc::new(Cell::new(false));
        let r = Rc::clone(&ran);
        scope.on_dispose(move || r.set(true));
        assert!(ran.get());
    }

    #[test]
    fn dropping_last_handle_disposes() {
        let ran = Rc::new(Cell::new(false));
        {
            let scope = Scope::new();
            let r = Rc::clone(&ran);
            scope.on_dispose(move || r.set(true));
            let clone = scope.clone();
            drop(scope);
            assert!(!ran.get());
            drop(clone);
        }
        assert!(ran.get());
    }

    #[test]
    fn ids_are_unique() {
        let a = Scope::new();
        let b = Scope::new();
        assert_ne!(a.id(), b.id());
    }
}
