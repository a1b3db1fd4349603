#![forbid(unsafe_code)]

//! Shared query state and the navigation listener.
//!
//! A [`UrlContext`] owns the authoritative parse of the current query
//! string. Every binding created from the same context reads and writes
//! this one value; no binding mutates it in place. Writers build a new
//! [`QueryParams`] and call [`replace`](UrlContext::replace), which swaps
//! the snapshot and notifies every subscriber synchronously, exactly once.
//!
//! The context also owns the navigation listener: at most one host
//! listener per context, installed lazily by
//! [`ensure_listening`](UrlContext::ensure_listening) and removed once no
//! interested [`Scope`] remains.
//!
//! # Global context
//!
//! Each thread has a global context, detached by default. Hosts install
//! themselves with [`UrlContext::set_global`]; the `use_search_param*`
//! factories read [`UrlContext::global`].
//!
//! # Invariants
//!
//! 1. `replace()` notifies every subscriber exactly once, in subscription
//!    order, before returning.
//! 2. At most one navigation listener is registered with the host.
//! 3. `is_listening()` is true iff a listener is registered.
//! 4. A navigator scheduled several times before the next microtask
//!    checkpoint runs once, against the state current at that time.
//! 5. A detached context never touches a host: no listener, no scheduling.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::host::{Host, ListenerId};
use crate::navigate::{self, Navigate, NavigationConfig};
use crate::query::QueryParams;
use crate::reactive::{Observable, Scope, Subscription};

thread_local! {
    static GLOBAL_CONTEXT: RefCell<UrlContext> = RefCell::new(UrlContext::detached());
}

struct ContextInner {
    state: Observable<QueryParams>,
    host: Option<Rc<dyn Host>>,
    config: NavigationConfig,
    default_navigate: Navigate,
    listener: Cell<Option<ListenerId>>,
    interested_scopes: RefCell<HashSet<u64>>,
    pinned: Cell<bool>,
    pending: RefCell<Vec<Navigate>>,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        if let (Some(host), Some(id)) = (&self.host, self.listener.take()) {
            host.remove_navigation_listener(id);
        }
    }
}

/// Handle to a shared query state. Clones share the same state.
#[derive(Clone)]
pub struct UrlContext {
    inner: Rc<ContextInner>,
}

impl UrlContext {
    /// Client-side context bound to `host`, seeded from its current URL.
    #[must_use]
    pub fn new(host: Rc<dyn Host>) -> Self {
        Self::new_with_config(host, NavigationConfig::default())
    }

    /// Client-side context whose default navigator follows `config`.
    #[must_use]
    pub fn new_with_config(host: Rc<dyn Host>, config: NavigationConfig) -> Self {
        let initial = navigate::params_from_href(&host.href());
        Self::build(Some(host), initial, config)
    }

    /// Context without a navigable host (server rendering). Empty state.
    #[must_use]
    pub fn detached() -> Self {
        Self::detached_with(QueryParams::new())
    }

    /// Context without a host, seeded with `params` (e.g. a request query).
    #[must_use]
    pub fn detached_with(params: QueryParams) -> Self {
        Self::build(None, params, NavigationConfig::default())
    }

    fn build(host: Option<Rc<dyn Host>>, initial: QueryParams, config: NavigationConfig) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                state: Observable::new(initial),
                host,
                config,
                default_navigate: Navigate::default_for(config),
                listener: Cell::new(None),
                interested_scopes: RefCell::new(HashSet::new()),
                pinned: Cell::new(false),
                pending: RefCell::new(Vec::new()),
            }),
        }
    }

    /// The calling thread's global context.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL_CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    /// Make `ctx` the calling thread's global context, returning the old one.
    pub fn set_global(ctx: Self) -> Self {
        GLOBAL_CONTEXT.with(|cell| cell.replace(ctx))
    }

    /// Snapshot of the current query state.
    #[must_use]
    pub fn params(&self) -> QueryParams {
        self.inner.state.get()
    }

    /// Borrow the current query state for the duration of `f`.
    pub fn with_params<R>(&self, f: impl FnOnce(&QueryParams) -> R) -> R {
        self.inner.state.with(f)
    }

    /// Swap in `params` and notify every subscriber once.
    pub fn replace(&self, params: QueryParams) {
        tracing::trace!(query = %params, "query state replaced");
        self.inner.state.set_always(params);
    }

    /// Run `callback` synchronously after every [`replace`](Self::replace).
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&QueryParams) + 'static) -> Subscription {
        self.inner.state.subscribe(callback)
    }

    /// Number of replacements so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.state.version()
    }

    /// Whether this context is bound to a navigable host.
    #[must_use]
    pub fn is_client(&self) -> bool {
        self.inner.host.is_some()
    }

    #[must_use]
    pub fn host(&self) -> Option<Rc<dyn Host>> {
        self.inner.host.clone()
    }

    #[must_use]
    pub fn config(&self) -> NavigationConfig {
        self.inner.config
    }

    /// The navigator bindings use when no override is given.
    #[must_use]
    pub fn default_navigate(&self) -> Navigate {
        self.inner.default_navigate.clone()
    }

    /// Whether the navigation listener is currently installed.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.inner.listener.get().is_some()
    }

    /// Install the navigation listener if it is not installed yet.
    ///
    /// Inside a [`Scope`], the scope is recorded as interested and the
    /// listener is removed once every interested scope has been disposed.
    /// Outside any scope the listener stays for the context's lifetime.
    /// No-op on a detached context.
    pub fn ensure_listening(&self) {
        let Some(host) = &self.inner.host else {
            return;
        };

        match Scope::current() {
            Some(scope) => self.register_scope_interest(&scope),
            None => self.inner.pinned.set(true),
        }

        if self.inner.listener.get().is_some() {
            return;
        }

        let weak: Weak<ContextInner> = Rc::downgrade(&self.inner);
        let id = host.add_navigation_listener(Rc::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let ctx = UrlContext { inner };
            let Some(host) = &ctx.inner.host else {
                return;
            };
            let params = navigate::params_from_href(&host.href());
            tracing::trace!(query = %params, "navigation event");
            ctx.replace(params);
        }));
        self.inner.listener.set(Some(id));
        tracing::debug!(listener = id.0, "navigation listener installed");
    }

    fn register_scope_interest(&self, scope: &Scope) {
        let scope_id = scope.id();
        if !self.inner.interested_scopes.borrow_mut().insert(scope_id) {
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        scope.on_dispose(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.interested_scopes.borrow_mut().remove(&scope_id);
            UrlContext { inner }.release_listener_if_unused();
        });
    }

    fn release_listener_if_unused(&self) {
        if self.inner.pinned.get() || !self.inner.interested_scopes.borrow().is_empty() {
            return;
        }
        if let (Some(host), Some(id)) = (&self.inner.host, self.inner.listener.take()) {
            host.remove_navigation_listener(id);
            tracing::debug!(listener = id.0, "navigation listener removed");
        }
    }

    /// Run `navigate` at the next microtask checkpoint with the state
    /// current at that time.
    ///
    /// Requests for a navigator already pending are merged. Failures are
    /// logged and dropped. No-op on a detached context.
    pub fn schedule_navigation(&self, navigate: &Navigate) {
        let Some(host) = &self.inner.host else {
            return;
        };

        let first_in_cycle = {
            let mut pending = self.inner.pending.borrow_mut();
            if pending.iter().any(|n| n.ptr_eq(navigate)) {
                return;
            }
            pending.push(navigate.clone());
            pending.len() == 1
        };
        if !first_in_cycle {
            return;
        }

        let weak = Rc::downgrade(&self.inner);
        host.queue_microtask(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                UrlContext { inner }.flush_navigation();
            }
        }));
    }

    /// Whether a navigation is waiting for the next microtask checkpoint.
    #[must_use]
    pub fn has_pending_navigation(&self) -> bool {
        !self.inner.pending.borrow().is_empty()
    }

    fn flush_navigation(&self) {
        let Some(host) = &self.inner.host else {
            return;
        };
        let navigators = std::mem::take(&mut *self.inner.pending.borrow_mut());
        let params = self.params();
        for navigate in navigators {
            tracing::trace!(query = %params, "propagating query state to url");
            if let Err(err) = navigate.call(host.as_ref(), &params) {
                tracing::warn!(error = %err, "failed to propagate query state");
            }
        }
    }
}

impl fmt::Debug for UrlContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlContext")
            .field("params", &self.inner.state.with(ToString::to_string))
            .field("client", &self.inner.host.is_some())
            .field("listening", &self.inner.listener.get().is_some())
            .field("config", &self.inner.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HistoryOp, MemoryHost};
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::{self, Layer, SubscriberExt};

    fn client(href: &str) -> (Rc<MemoryHost>, UrlContext) {
        let host = Rc::new(MemoryHost::new(href));
        let ctx = UrlContext::new(host.clone());
        (host, ctx)
    }

    #[test]
    fn seeded_from_host_location() {
        let (_host, ctx) = client("https://x.test/p?a=1&a=2");
        assert_eq!(ctx.params().get_all("a"), vec!["1", "2"]);
        assert!(ctx.is_client());
    }

    #[test]
    fn detached_is_empty_and_inert() {
        let ctx = UrlContext::detached();
        assert!(ctx.params().is_empty());
        ctx.ensure_listening();
        assert!(!ctx.is_listening());
        ctx.schedule_navigation(&ctx.default_navigate());
        assert!(!ctx.has_pending_navigation());
    }

    #[test]
    fn replace_notifies_once_even_when_equal() {
        let (_host, ctx) = client("https://x.test/p?a=1");
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let _sub = ctx.subscribe(move |_| h.set(h.get() + 1));

        ctx.replace(ctx.params());
        assert_eq!(hits.get(), 1);
        assert_eq!(ctx.version(), 1);
    }

    #[test]
    fn ensure_listening_is_idempotent() {
        let (host, ctx) = client("https://x.test/p");
        ctx.ensure_listening();
        ctx.ensure_listening();
        assert!(ctx.is_listening());
        assert_eq!(host.listener_count(), 1);
    }

    #[test]
    fn navigation_event_replaces_state() {
        let (host, ctx) = client("https://x.test/p?a=1");
        ctx.ensure_listening();
        host.navigate_to("https://x.test/p?a=2&b=3");
        assert_eq!(ctx.params().get("a"), Some("2"));
        host.back();
        assert_eq!(ctx.params().to_string(), "a=1");
    }

    #[test]
    fn listener_follows_scope_lifetime() {
        let (host, ctx) = client("https://x.test/p");
        let first = Scope::new();
        let second = Scope::new();
        first.run(|| ctx.ensure_listening());
        second.run(|| ctx.ensure_listening());
        assert_eq!(host.listener_count(), 1);

        first.dispose();
        assert!(ctx.is_listening());
        second.dispose();
        assert!(!ctx.is_listening());
        assert_eq!(host.listener_count(), 0);

        let third = Scope::new();
        third.run(|| ctx.ensure_listening());
        assert!(ctx.is_listening());
        assert_eq!(host.listener_count(), 1);
    }

    #[test]
    fn unscoped_interest_pins_listener() {
        let (_host, ctx) = client("https://x.test/p");
        let scope = Scope::new();
        scope.run(|| ctx.ensure_listening());
        ctx.ensure_listening();
        scope.dispose();
        assert!(ctx.is_listening());
    }

    #[test]
    fn dropping_context_removes_listener() {
        let (host, ctx) = client("https://x.test/p");
        ctx.ensure_listening();
        drop(ctx);
        assert_eq!(host.listener_count(), 0);
    }

    #[test]
    fn scheduled_navigation_coalesces_and_reads_latest_state() {
        let (host, ctx) = client("https://x.test/p");
        let nav = ctx.default_navigate();

        ctx.replace(QueryParams::parse("a=1"));
        ctx.schedule_navigation(&nav);
        ctx.replace(QueryParams::parse("a=2"));
        ctx.schedule_navigation(&nav);
        assert!(host.history_log().is_empty());
        assert_eq!(host.pending_microtasks(), 1);

        host.flush();
        assert_eq!(
            host.history_log(),
            vec![(HistoryOp::Replace, "https://x.test/p?a=2".to_string())]
        );
        assert!(!ctx.has_pending_navigation());
    }

    #[test]
    fn distinct_navigators_each_run_once() {
        let (host, ctx) = client("https://x.test/p");
        ctx.replace(QueryParams::parse("a=1"));
        ctx.schedule_navigation(&ctx.default_navigate());
        ctx.schedule_navigation(&Navigate::replace_fragment());
        host.flush();
        assert_eq!(host.history_log().len(), 2);
        assert_eq!(host.href(), "https://x.test/p?a=1#a=1");
    }

    /// Collects `WARN` events as `field=value` lines.
    #[derive(Clone, Default)]
    struct WarnLog(Arc<Mutex<Vec<String>>>);

    impl WarnLog {
        fn lines(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct FieldWriter<'a>(&'a mut Vec<String>);

    impl Visit for FieldWriter<'_> {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.push(format!("{}={value:?}", field.name()));
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for WarnLog {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: layer::Context<'_, S>) {
            if *event.metadata().level() != tracing::Level::WARN {
                return;
            }
            let mut fields = Vec::new();
            event.record(&mut FieldWriter(&mut fields));
            self.0.lock().unwrap().push(fields.join(" "));
        }
    }

    #[test]
    fn failed_navigation_is_dropped_with_warning() {
        let log = WarnLog::default();
        let subscriber = tracing_subscriber::registry().with(log.clone());

        tracing::subscriber::with_default(subscriber, || {
            let (host, ctx) = client("https://x.test/p");
            host.set_reject_writes(true);
            ctx.replace(QueryParams::parse("a=1"));
            ctx.schedule_navigation(&ctx.default_navigate());
            host.flush();
            assert!(!ctx.has_pending_navigation());
            assert_eq!(host.href(), "https://x.test/p");
        });

        let lines = log.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("message=failed to propagate query state"));
        assert!(lines[0].contains("error=navigation host rejected the update"));
    }

    #[test]
    fn global_defaults_to_detached_and_can_be_swapped() {
        assert!(!UrlContext::global().is_client());
        let (_host, ctx) = client("https://x.test/p?g=1");
        let previous = UrlContext::set_global(ctx);
        assert_eq!(UrlContext::global().params().get("g"), Some("1"));
        UrlContext::set_global(previous);
        assert!(!UrlContext::global().is_client());
    }
}
