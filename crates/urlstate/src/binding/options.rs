#![forbid(unsafe_code)]

//! Per-binding configuration.

use crate::navigate::Navigate;
use crate::serializer::Identity;

/// Serializer and navigation override for one binding.
///
/// ```
/// use urlstate::{Navigate, SearchParamOptions};
/// use urlstate::serializer::Parsed;
///
/// let options = SearchParamOptions::new()
///     .with_serializer(Parsed::<i32>::new())
///     .with_navigate(Navigate::push_query());
/// assert!(options.navigate.is_some());
/// ```
#[derive(Clone, Debug)]
pub struct SearchParamOptions<S = Identity> {
    pub serializer: S,
    /// `None` uses the context's default navigator.
    pub navigate: Option<Navigate>,
}

impl SearchParamOptions<Identity> {
    /// Identity serializer, default navigator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            serializer: Identity,
            navigate: None,
        }
    }
}

impl Default for SearchParamOptions<Identity> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> SearchParamOptions<S> {
    /// Swap the serializer, keeping the navigation override.
    #[must_use]
    pub fn with_serializer<S2>(self, serializer: S2) -> SearchParamOptions<S2> {
        SearchParamOptions {
            serializer,
            navigate: self.navigate,
        }
    }

    /// Override how writes reach the URL.
    #[must_use]
    pub fn with_navigate(mut self, navigate: Navigate) -> Self {
        self.navigate = Some(navigate);
        self
    }
}
