#![forbid(unsafe_code)]

//! Error types for host and navigation operations.
//!
//! Serializer failures are deliberately absent: conversion belongs to the
//! caller, and a panicking serializer propagates to whoever triggered the
//! read or write.

/// A host refused or failed a history operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The host has no navigable location (e.g. the page is being torn down).
    Unavailable,
    /// The host rejected the operation; the message comes from the host.
    Rejected(String),
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "navigation host is unavailable"),
            Self::Rejected(msg) => write!(f, "navigation host rejected the update: {msg}"),
        }
    }
}

impl std::error::Error for HostError {}

/// Failure while propagating query state back into the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigateError {
    /// The host's current location could not be parsed as an absolute URL.
    InvalidLocation {
        href: String,
        source: url::ParseError,
    },
    /// The host failed to apply the history update.
    Host(HostError),
}

impl std::fmt::Display for NavigateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLocation { href, source } => {
                write!(f, "invalid location '{href}': {source}")
            }
            Self::Host(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for NavigateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidLocation { source, .. } => Some(source),
            Self::Host(err) => Some(err),
        }
    }
}

impl From<HostError> for NavigateError {
    fn from(err: HostError) -> Self {
        Self::Host(err)
    }
}
