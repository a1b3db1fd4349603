#![forbid(unsafe_code)]

//! Browser host for `urlstate`.
//!
//! Call [`install`] once at startup, before creating any binding. In a
//! browser it binds the thread's global [`UrlContext`] to `window`; outside
//! a navigable document it leaves the detached (server-rendering) context
//! in place and returns `None`, so the same application code runs on both
//! sides.
//!
//! ```
//! use urlstate::use_search_param;
//!
//! let _ctx = urlstate_web::install();
//! let query = use_search_param("q");
//! if let Some(q) = query.get() {
//!     println!("searching for {q}");
//! }
//! ```

#[cfg(target_arch = "wasm32")]
mod browser;

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserHost;

use std::rc::Rc;

use urlstate::{Host, NavigationConfig, UrlContext};

/// Bind the global context to the browser window with default navigation
/// (replace the history entry, write the query).
pub fn install() -> Option<UrlContext> {
    install_with_config(NavigationConfig::default())
}

/// Bind the global context to the browser window with `config`.
///
/// Returns the installed context, or `None` when no window is available.
pub fn install_with_config(config: NavigationConfig) -> Option<UrlContext> {
    let Some(host) = detect_host() else {
        tracing::debug!("no navigable window; keeping detached url context");
        return None;
    };
    let ctx = UrlContext::new_with_config(host, config);
    UrlContext::set_global(ctx.clone());
    tracing::debug!(?config, "browser url context installed");
    Some(ctx)
}

#[cfg(target_arch = "wasm32")]
fn detect_host() -> Option<Rc<dyn Host>> {
    BrowserHost::detect().map(|host| Rc::new(host) as Rc<dyn Host>)
}

#[cfg(not(target_arch = "wasm32"))]
fn detect_host() -> Option<Rc<dyn Host>> {
    None
}
