#![forbid(unsafe_code)]

//! Propagation of query state back into the visible URL.
//!
//! A [`Navigate`] receives the host and the *current* query state and
//! writes a history entry. The default rebuilds the host's `href` with its
//! query replaced by the serialized state and calls `replace_url`, keeping
//! path and fragment untouched. [`NavigationConfig`] selects the variants
//! (push instead of replace, fragment instead of query); anything else can
//! be expressed with [`Navigate::from_fn`].
//!
//! Bindings never call a navigator directly: they ask the context to
//! schedule it (see [`UrlContext::schedule_navigation`]), which coalesces
//! every request made before the next microtask checkpoint.
//!
//! [`UrlContext::schedule_navigation`]: crate::context::UrlContext::schedule_navigation

use std::fmt;
use std::rc::Rc;

use url::Url;

use crate::error::NavigateError;
use crate::host::Host;
use crate::query::QueryParams;

/// Whether a navigation replaces the current history entry or adds one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum HistoryMode {
    #[default]
    Replace,
    Push,
}

/// Which URL component carries the serialized query state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum UrlTarget {
    #[default]
    Query,
    Fragment,
}

/// Configuration of a context's default navigator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NavigationConfig {
    pub mode: HistoryMode,
    pub target: UrlTarget,
}

type NavigateFn = dyn Fn(&dyn Host, &QueryParams) -> Result<(), NavigateError>;

/// A history-writing strategy with identity.
///
/// Clones share identity; two navigators are the same for coalescing
/// purposes only when [`ptr_eq`](Self::ptr_eq) holds.
#[derive(Clone)]
pub struct Navigate {
    f: Rc<NavigateFn>,
}

impl Navigate {
    /// Wrap a custom navigation function.
    pub fn from_fn(
        f: impl Fn(&dyn Host, &QueryParams) -> Result<(), NavigateError> + 'static,
    ) -> Self {
        Self { f: Rc::new(f) }
    }

    /// Navigator implementing `config`.
    #[must_use]
    pub fn default_for(config: NavigationConfig) -> Self {
        Self::from_fn(move |host, params| {
            let url = build_url(&host.href(), params, config.target)?;
            match config.mode {
                HistoryMode::Replace => host.replace_url(&url)?,
                HistoryMode::Push => host.push_url(&url)?,
            }
            Ok(())
        })
    }

    /// Replace the current entry, serializing into the query.
    #[must_use]
    pub fn replace_query() -> Self {
        Self::default_for(NavigationConfig::default())
    }

    /// Push a new entry, serializing into the query.
    #[must_use]
    pub fn push_query() -> Self {
        Self::default_for(NavigationConfig {
            mode: HistoryMode::Push,
            target: UrlTarget::Query,
        })
    }

    /// Replace the current entry, serializing into the fragment.
    #[must_use]
    pub fn replace_fragment() -> Self {
        Self::default_for(NavigationConfig {
            mode: HistoryMode::Replace,
            target: UrlTarget::Fragment,
        })
    }

    /// Run the navigator against `host` with `params`.
    pub fn call(&self, host: &dyn Host, params: &QueryParams) -> Result<(), NavigateError> {
        (self.f)(host, params)
    }

    /// Whether both handles refer to the same navigator.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.f, &other.f)
    }
}

impl fmt::Debug for Navigate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigate")
            .field("ptr", &Rc::as_ptr(&self.f).cast::<()>())
            .finish()
    }
}

/// Rebuild `href` with `target` replaced by the serialized `params`.
///
/// An empty multimap removes the component entirely (no dangling `?`/`#`).
///
/// # Errors
///
/// [`NavigateError::InvalidLocation`] when `href` is not an absolute URL.
pub fn build_url(
    href: &str,
    params: &QueryParams,
    target: UrlTarget,
) -> Result<String, NavigateError> {
    let mut url = Url::parse(href).map_err(|source| NavigateError::InvalidLocation {
        href: href.to_owned(),
        source,
    })?;
    let encoded = params.to_query_string();
    let component = (!encoded.is_empty()).then_some(encoded.as_str());
    match target {
        UrlTarget::Query => url.set_query(component),
        UrlTarget::Fragment => url.set_fragment(component),
    }
    Ok(url.into())
}

/// Query component of `href`, parsed. Unparsable locations read as empty.
#[must_use]
pub fn params_from_href(href: &str) -> QueryParams {
    match Url::parse(href) {
        Ok(url) => url.query().map(QueryParams::parse).unwrap_or_default(),
        Err(err) => {
            tracing::warn!(href, error = %err, "location is not an absolute url");
            QueryParams::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostError;
    use crate::host::{HistoryOp, MemoryHost};
    use pretty_assertions::assert_eq;

    #[test]
    fn build_url_preserves_path_and_fragment() {
        let params = QueryParams::parse("a=1&b=two+words");
        let url = build_url("https://x.test/p/q?old=1#frag", &params, UrlTarget::Query).unwrap();
        assert_eq!(url, "https://x.test/p/q?a=1&b=two+words#frag");
    }

    #[test]
    fn build_url_empty_state_drops_question_mark() {
        let url = build_url("https://x.test/p?old=1", &QueryParams::new(), UrlTarget::Query)
            .unwrap();
        assert_eq!(url, "https://x.test/p");
    }

    #[test]
    fn build_url_fragment_target_keeps_query() {
        let params = QueryParams::parse("tab=2");
        let url = build_url("https://x.test/p?keep=1", &params, UrlTarget::Fragment).unwrap();
        assert_eq!(url, "https://x.test/p?keep=1#tab=2");
    }

    #[test]
    fn build_url_rejects_relative_href() {
        let err = build_url("/relative", &QueryParams::new(), UrlTarget::Query).unwrap_err();
        assert!(matches!(err, NavigateError::InvalidLocation { .. }));
    }

    #[test]
    fn params_from_href_reads_query_only() {
        let p = params_from_href("https://x.test/p?a=1&a=2#b=3");
        assert_eq!(p.get_all("a"), vec!["1", "2"]);
        assert!(!p.contains("b"));
        assert!(params_from_href("not a url").is_empty());
    }

    #[test]
    fn default_navigators_write_history() {
        let host = MemoryHost::new("https://x.test/p");
        let params = QueryParams::parse("a=1");

        Navigate::replace_query().call(&host, &params).unwrap();
        Navigate::push_query().call(&host, &params).unwrap();
        assert_eq!(
            host.history_log(),
            vec![
                (HistoryOp::Replace, "https://x.test/p?a=1".to_string()),
                (HistoryOp::Push, "https://x.test/p?a=1".to_string()),
            ]
        );
        assert_eq!(host.history_len(), 2);
    }

    #[test]
    fn host_failure_surfaces_as_navigate_error() {
        let host = MemoryHost::new("https://x.test/p");
        host.set_reject_writes(true);
        let err = Navigate::replace_query()
            .call(&host, &QueryParams::new())
            .unwrap_err();
        assert!(matches!(err, NavigateError::Host(HostError::Rejected(_))));
    }

    #[test]
    fn identity_follows_clones() {
        let a = Navigate::replace_query();
        let b = a.clone();
        let c = Navigate::replace_query();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
    }
}
