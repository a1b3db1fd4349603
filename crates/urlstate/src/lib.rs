#![forbid(unsafe_code)]

//! Two-way binding between URL query parameters and reactive state.
//!
//! Reading a [`SearchParam`] reads the query parameter; writing it writes
//! the parameter back into the URL. Back/forward navigation updates every
//! binding whose parameter changed, and nothing else.
//!
//! # Layers
//!
//! - [`query`]: the ordered query multimap and its form-urlencoded codec.
//! - [`reactive`]: observables, subscriptions and owning scopes.
//! - [`host`]: the navigable client context (browser window, or the
//!   in-memory [`MemoryHost`]).
//! - [`context`]: the shared query state plus the navigation listener.
//! - [`navigate`]: how state flows back into the URL.
//! - [`serializer`]: string/typed-value conversions.
//! - [`binding`]: the scalar and array bindings themselves.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use urlstate::{Host, MemoryHost, SearchParamOptions, UrlContext};
//!
//! let host = Rc::new(MemoryHost::new("https://example.com/search?q=rust"));
//! let ctx = UrlContext::new(host.clone());
//!
//! let q = ctx.search_param("q", SearchParamOptions::new());
//! let also_q = ctx.search_param("q", SearchParamOptions::new());
//! assert_eq!(q.get().as_deref(), Some("rust"));
//!
//! q.set(Some("tokio".to_string()));
//! assert_eq!(also_q.get().as_deref(), Some("tokio"));
//!
//! // The URL is written at the next microtask checkpoint.
//! host.flush();
//! assert_eq!(host.href(), "https://example.com/search?q=tokio");
//! ```

pub mod binding;
pub mod context;
pub mod error;
pub mod host;
pub mod navigate;
pub mod query;
pub mod reactive;
pub mod serializer;

pub use binding::{
    SearchParam, SearchParamArray, SearchParamOptions, use_search_param,
    use_search_param_array, use_search_param_array_with, use_search_param_with,
};
pub use context::UrlContext;
pub use error::{HostError, NavigateError};
pub use host::{Host, ListenerId, MemoryHost};
pub use navigate::{HistoryMode, Navigate, NavigationConfig, UrlTarget};
pub use query::QueryParams;
pub use reactive::{Observable, Scope, Subscription};
pub use serializer::{ElementSerializer, Identity, Serializer};
