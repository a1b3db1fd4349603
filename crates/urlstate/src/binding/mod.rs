#![forbid(unsafe_code)]

//! Reactive values bound to URL query parameters.
//!
//! - [`SearchParam<T>`]: one parameter, first value wins.
//! - [`SearchParamArray<T>`]: every value of a repeated parameter, in order.
//!
//! Both read their slice out of the context's shared query state when
//! created, cache the raw string(s) and the converted value, and subscribe
//! to the shared state. On every state replacement each binding compares
//! its own slice with its raw cache and notifies its observers only when
//! that slice changed. Bindings therefore never need to know about each
//! other: two bindings for the same name converge because they read and
//! write the same keys.
//!
//! # Usage
//!
//! ```
//! use std::rc::Rc;
//! use urlstate::{Host, MemoryHost, SearchParamOptions, UrlContext};
//! use urlstate::serializer::Parsed;
//!
//! let host = Rc::new(MemoryHost::new("https://example.com/items?page=2"));
//! let ctx = UrlContext::new(host.clone());
//!
//! let page = ctx.search_param("page", SearchParamOptions::new().with_serializer(Parsed::<u32>::new()));
//! assert_eq!(page.get(), Some(2));
//!
//! page.update(|p| *p = p.map(|n| n + 1));
//! host.flush();
//! assert_eq!(host.href(), "https://example.com/items?page=3");
//! ```
//!
//! # Invariants
//!
//! 1. A binding's typed value always equals `read(raw)`.
//! 2. Writing a value whose serialized form equals the cached raw form is
//!    a no-op: no state replacement, no notification, no navigation.
//! 3. A replacement that leaves a binding's slice unchanged does not
//!    notify that binding's observers.
//! 4. After `set()` returns, every binding of the same context reads the
//!    new value.
//! 5. Each settled write produces one navigation per navigator.
//!
//! # Failure Modes
//!
//! - Serializer panic: propagates to the caller of the factory, of `set()`,
//!   or of whatever triggered the state replacement.
//! - Detached context: bindings read the seeded state and accept writes,
//!   but do not subscribe and never navigate.

pub mod array;
pub mod options;
pub mod scalar;

pub use array::SearchParamArray;
pub use options::SearchParamOptions;
pub use scalar::SearchParam;

use crate::context::UrlContext;
use crate::serializer::{ElementSerializer, Identity, Serializer};

/// Bind `name` on the global context with the identity serializer.
#[must_use]
pub fn use_search_param(name: &str) -> SearchParam<Option<String>> {
    UrlContext::global().search_param(name, SearchParamOptions::new())
}

/// Bind `name` on the global context with custom options.
pub fn use_search_param_with<T, S>(name: &str, options: SearchParamOptions<S>) -> SearchParam<T>
where
    T: Clone + 'static,
    S: Serializer<T> + 'static,
{
    UrlContext::global().search_param(name, options)
}

/// Bind every value of `name` on the global context as strings.
#[must_use]
pub fn use_search_param_array(name: &str) -> SearchParamArray<String> {
    UrlContext::global().search_param_array(name, SearchParamOptions::<Identity>::new())
}

/// Bind every value of `name` on the global context with custom options.
pub fn use_search_param_array_with<T, S>(
    name: &str,
    options: SearchParamOptions<S>,
) -> SearchParamArray<T>
where
    T: Clone + 'static,
    S: ElementSerializer<T> + 'static,
{
    UrlContext::global().search_param_array(name, options)
}

impl UrlContext {
    /// Bind the single-valued parameter `name` on this context.
    pub fn search_param<T, S>(&self, name: &str, options: SearchParamOptions<S>) -> SearchParam<T>
    where
        T: Clone + 'static,
        S: Serializer<T> + 'static,
    {
        let navigate = options
            .navigate
            .unwrap_or_else(|| self.default_navigate());
        SearchParam::create(self, name, options.serializer, navigate)
    }

    /// Bind every value of the repeated parameter `name` on this context.
    pub fn search_param_array<T, S>(
        &self,
        name: &str,
        options: SearchParamOptions<S>,
    ) -> SearchParamArray<T>
    where
        T: Clone + 'static,
        S: ElementSerializer<T> + 'static,
    {
        let navigate = options
            .navigate
            .unwrap_or_else(|| self.default_navigate());
        SearchParamArray::create(self, name, options.serializer, navigate)
    }
}
