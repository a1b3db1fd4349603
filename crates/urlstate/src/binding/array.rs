#![forbid(unsafe_code)]

//! Repeated search-param binding (`?tag=a&tag=b`).
//!
//! The raw cache is the ordered list of every value for the name; change
//! detection compares lists element-wise, order-sensitive. Writing replaces
//! every occurrence: all pairs for the name are removed, then the new
//! values are appended in order. An empty list removes the name entirely.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::context::UrlContext;
use crate::navigate::Navigate;
use crate::reactive::{Observable, Scope, Subscription};
use crate::serializer::ElementSerializer;

struct ArrayInner<T> {
    name: String,
    ctx: UrlContext,
    serializer: Box<dyn ElementSerializer<T>>,
    navigate: Navigate,
    raw: RefCell<Vec<String>>,
    typed: Observable<Vec<T>>,
    _subscription: Option<Subscription>,
}

impl<T: Clone + 'static> ArrayInner<T> {
    fn read_all(&self, raw: &[String]) -> Vec<T> {
        raw.iter().map(|v| self.serializer.read(v)).collect()
    }

    fn refresh(&self) {
        let candidate: Vec<String> = self.ctx.with_params(|params| {
            params
                .get_all(&self.name)
                .into_iter()
                .map(str::to_owned)
                .collect()
        });
        if *self.raw.borrow() == candidate {
            return;
        }
        let typed = self.read_all(&candidate);
        *self.raw.borrow_mut() = candidate;
        self.typed.set_always(typed);
    }

    fn write(&self, values: &[T]) {
        let next_raw: Vec<String> = values.iter().map(|v| self.serializer.write(v)).collect();
        if *self.raw.borrow() == next_raw {
            return;
        }
        let typed = self.read_all(&next_raw);
        *self.raw.borrow_mut() = next_raw.clone();
        self.typed.set_silent(typed);

        let mut params = self.ctx.params();
        params.delete(&self.name);
        params.extend(next_raw.into_iter().map(|v| (self.name.clone(), v)));
        self.ctx.replace(params);
        self.typed.notify();
        self.ctx.schedule_navigation(&self.navigate);
    }
}

/// A reactive list bound to every value of one repeated query parameter.
///
/// Clones share the same caches and observers.
pub struct SearchParamArray<T> {
    inner: Rc<ArrayInner<T>>,
}

impl<T> Clone for SearchParamArray<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> SearchParamArray<T> {
    pub(crate) fn create(
        ctx: &UrlContext,
        name: &str,
        serializer: impl ElementSerializer<T> + 'static,
        navigate: Navigate,
    ) -> Self {
        let raw: Vec<String> = ctx.with_params(|params| {
            params
                .get_all(name)
                .into_iter()
                .map(str::to_owned)
                .collect()
        });
        let typed: Vec<T> = raw.iter().map(|v| serializer.read(v)).collect();
        let scope = Scope::current();

        let inner = Rc::new_cyclic(|weak: &Weak<ArrayInner<T>>| {
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
            ArrayInner {
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
        tracing::debug!(name, scoped = scope.is_some(), "search param array bound");
        Self { inner }
    }

    #[must_use]
    pub fn get(&self) -> Vec<T> {
        self.inner.typed.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        self.inner.typed.with(|values| f(values.as_slice()))
    }

    /// Replace every value of the parameter with `values`, in order.
    pub fn set(&self, values: Vec<T>) {
        self.inner.write(&values);
    }

    /// Modify a copy of the current list and write it back.
    pub fn update(&self, f: impl FnOnce(&mut Vec<T>)) {
        let mut values = self.get();
        f(&mut values);
        self.inner.write(&values);
    }

    /// Append one value at the end.
    pub fn push(&self, value: T) {
        self.update(|values| values.push(value));
    }

    /// Remove the parameter entirely.
    pub fn clear(&self) {
        self.inner.write(&[]);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.raw.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.raw.borrow().is_empty()
    }

    /// Cached raw values, in URL order.
    #[must_use]
    pub fn raw(&self) -> Vec<String> {
        self.inner.raw.borrow().clone()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.typed.version()
    }

    /// Run `callback` whenever the bound list changes.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&Vec<T>) + 'static) -> Subscription {
        self.inner.typed.subscribe(callback)
    }
}

impl<T> fmt::Debug for SearchParamArray<T>
where
    T: fmt::Debug + Clone + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchParamArray")
            .field("name", &self.inner.name)
            .field("raw", &*self.inner.raw.borrow())
            .field("values", &self.inner.typed)
            .finish()
    }
}
