#![forbid(unsafe_code)]

//! Single-valued search-param binding.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::context::UrlContext;
use crate::navigate::Navigate;
use crate::reactive::{Observable, Scope, Subscription};
use crate::serializer::Serializer;

struct ScalarInner<T> {
    name: String,
    ctx: UrlContext,
    serializer: Box<dyn Serializer<T>>,
    navigate: Navigate,
    raw: RefCell<Option<String>>,
    typed: Observable<T>,
    // Held here only when created outside a scope.
    _subscription: Option<Subscription>,
}

impl<T: Clone + 'static> ScalarInner<T> {
    // Reads the live state rather than the notified snapshot: an observer
    // earlier in the same notification may already have replaced it.
    fn refresh(&self) {
        let candidate = self
            .ctx
            .with_params(|params| params.get(&self.name).map(str::to_owned));
        if *self.raw.borrow() == candidate {
            return;
        }
        let typed = self.serializer.read(candidate.as_deref());
        *self.raw.borrow_mut() = candidate;
        self.typed.set_always(typed);
    }

    fn write(&self, value: &T) {
        let next_raw = self.serializer.write(value);
        if *self.raw.borrow() == next_raw {
            return;
        }
        let typed = self.serializer.read(next_raw.as_deref());
        *self.raw.borrow_mut() = next_raw.clone();
        self.typed.set_silent(typed);

        let mut params = self.ctx.params();
        match next_raw {
            Some(raw) => params.set(&self.name, raw),
            None => params.delete(&self.name),
        }
        self.ctx.replace(params);
        self.typed.notify();
        self.ctx.schedule_navigation(&self.navigate);
    }
}

/// A reactive value bound to the first value of one query parameter.
///
/// Clones share the same caches and observers.
pub struct SearchParam<T> {
    inner: Rc<ScalarInner<T>>,
}

impl<T> Clone for SearchParam<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> SearchParam<T> {
    pub(crate) fn create(
        ctx: &UrlContext,
        name: &str,
        serializer: impl Serializer<T> + 'static,
        navigate: Navigate,
    ) -> Self {
        let raw = ctx.with_params(|params| params.get(name).map(str::to_owned));
        let typed = serializer.read(raw.as_deref());
        let scope = Scope::current();

        let inner = Rc::new_cyclic(|weak: &Weak<ScalarInner<T>>| {
            let subscription = ctx.is_client().then(|| {
                let weak = weak.clone();
                ctx.subscribe(move |_| {
                    if let Some(inner) = weak.upgrade() {
                        inner.refresh();
                    }
                })
            });
            let subscription = match (&scope, subscription) {
                (Some(scope), Some(sub)) => {
                    scope.hold(sub);
                    None
                }
                (_, sub) => sub,
            };
            ScalarInner {
                name: name.to_owned(),
                ctx: ctx.clone(),
                serializer: Box::new(serializer),
                navigate,
                raw: RefCell::new(raw),
                typed: Observable::new(typed),
                _subscription: subscription,
            }
        });

        ctx.ensure_listening();
        tracing::debug!(name, scoped = scope.is_some(), "search param bound");
        Self { inner }
    }

    /// Current typed value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.typed.get()
    }

    /// Borrow the current typed value for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.typed.with(f)
    }

    /// Write `value` to the parameter.
    ///
    /// The parameter is removed when the serializer writes `None`; an
    /// empty string keeps it present with an empty value.
    pub fn set(&self, value: T) {
        self.inner.write(&value);
    }

    /// Modify a copy of the current value and write it back.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut value = self.get();
        f(&mut value);
        self.set(value);
    }

    /// Cached raw value: `None` when the parameter is absent.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.inner.raw.borrow().clone()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Number of times the bound value changed.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.typed.version()
    }

    /// Run `callback` whenever the bound value changes.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.inner.typed.subscribe(callback)
    }
}

impl<T: fmt::Debug> fmt::Debug for SearchParam<T>
where
    T: Clone + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchParam")
            .field("name", &self.inner.name)
            .field("raw", &*self.inner.raw.borrow())
            .field("value", &self.inner.typed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SearchParamOptions;
    use crate::host::{HistoryOp, Host, MemoryHost};
    use crate::query::QueryParams;
    use crate::serializer::{FnSerializer, Parsed};
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    fn client(href: &str) -> (Rc<MemoryHost>, UrlContext) {
        let host = Rc::new(MemoryHost::new(href));
        let ctx = UrlContext::new(host.clone());
        (host, ctx)
    }

    fn counter(param: &SearchParam<Option<String>>) -> (Rc<Cell<u32>>, Subscription) {
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let sub = param.subscribe(move |_| h.set(h.get() + 1));
        (hits, sub)
    }

    #[test]
    fn reads_initial_value() {
        let (_host, ctx) = client("https://x.test/?q=rust&q=ignored");
        let q = ctx.search_param("q", SearchParamOptions::new());
        assert_eq!(q.get(), Some("rust".to_string()));
        assert_eq!(q.name(), "q");
        assert!(ctx.is_listening());

        let missing = ctx.search_param("nope", SearchParamOptions::new());
        assert_eq!(missing.get(), None);
    }

    #[test]
    fn set_updates_state_and_navigates_once() {
        let (host, ctx) = client("https://x.test/p?other=1");
        let q = ctx.search_param("q", SearchParamOptions::new());

        q.set(Some("a".into()));
        q.set(Some("b".into()));
        assert_eq!(ctx.params().get("q"), Some("b"));
        assert!(host.history_log().is_empty());

        host.flush();
        assert_eq!(
            host.history_log(),
            vec![(HistoryOp::Replace, "https://x.test/p?other=1&q=b".to_string())]
        );
    }

    #[test]
    fn equal_write_is_noop() {
        let (host, ctx) = client("https://x.test/p?q=a");
        let q = ctx.search_param("q", SearchParamOptions::new());
        let (hits, _sub) = counter(&q);
        let version = ctx.version();

        q.set(Some("a".into()));
        assert_eq!(hits.get(), 0);
        assert_eq!(ctx.version(), version);
        assert_eq!(host.pending_microtasks(), 0);
    }

    #[test]
    fn empty_string_is_present_null_is_absent() {
        let (host, ctx) = client("https://x.test/p");
        let foo = ctx.search_param("foo", SearchParamOptions::new());

        foo.set(Some(String::new()));
        host.flush();
        assert_eq!(host.href(), "https://x.test/p?foo=");

        foo.set(None);
        host.flush();
        assert_eq!(host.href(), "https://x.test/p");
    }

    #[test]
    fn unrelated_change_does_not_notify() {
        let (_host, ctx) = client("https://x.test/p?a=1&b=1");
        let a = ctx.search_param("a", SearchParamOptions::new());
        let b = ctx.search_param("b", SearchParamOptions::new());
        let (a_hits, _a_sub) = counter(&a);
        let (b_hits, _b_sub) = counter(&b);

        b.set(Some("2".into()));
        assert_eq!(a_hits.get(), 0);
        assert_eq!(b_hits.get(), 1);
    }

    #[test]
    fn typed_cache_is_read_of_written_raw() {
        let (_host, ctx) = client("https://x.test/p");
        let clamp = FnSerializer::new(
            |raw: Option<&str>| raw.and_then(|s| s.parse::<i32>().ok()).unwrap_or(0).min(10),
            |v: &i32| Some(v.to_string()),
        );
        let n = ctx.search_param("n", SearchParamOptions::new().with_serializer(clamp));
        n.set(42);
        assert_eq!(n.raw(), Some("42".to_string()));
        assert_eq!(n.get(), 10);
    }

    #[test]
    fn counter_increments_through_url() {
        let (host, ctx) = client("https://x.test/p?count=1");
        let count = ctx.search_param(
            "count",
            SearchParamOptions::new().with_serializer(Parsed::<i64>::new()),
        );
        count.update(|c| *c = Some(c.unwrap_or(0) + 1));
        count.update(|c| *c = Some(c.unwrap_or(0) + 1));
        host.flush();
        assert_eq!(count.get(), Some(3));
        assert_eq!(host.href(), "https://x.test/p?count=3");
    }

    #[test]
    fn scoped_binding_stops_tracking_after_dispose() {
        let (_host, ctx) = client("https://x.test/p?a=1");
        let scope = Scope::new();
        let a = scope.run(|| ctx.search_param("a", SearchParamOptions::new()));
        assert_eq!(scope.subscription_count(), 1);

        scope.dispose();
        ctx.replace(QueryParams::parse("a=2"));
        assert_eq!(a.get(), Some("1".to_string()));
        assert!(!ctx.is_listening());
    }

    #[test]
    fn detached_binding_reads_seed_and_never_navigates() {
        let ctx = UrlContext::detached_with(QueryParams::parse("q=ssr"));
        let q = ctx.search_param("q", SearchParamOptions::new());
        assert_eq!(q.get(), Some("ssr".to_string()));
        q.set(Some("x".into()));
        assert_eq!(ctx.params().get("q"), Some("x"));
        assert!(!ctx.has_pending_navigation());
    }
}
