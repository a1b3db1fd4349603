#![forbid(unsafe_code)]

//! Conversion between the string wire form and typed binding values.
//!
//! Scalar bindings use [`Serializer`], where `None` stands for an absent
//! parameter. Array bindings use [`ElementSerializer`], applied to each
//! value of a repeated parameter; absence is an empty list.
//!
//! Serializers must be deterministic and side-effect free. A serializer
//! that panics propagates the panic to whoever triggered the conversion:
//! the binding factory, `set()`, or the state-change callback.

use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

/// Conversion pair for a single-valued parameter.
pub trait Serializer<T> {
    /// Convert the raw value (`None` when the parameter is absent).
    fn read(&self, raw: Option<&str>) -> T;

    /// Convert back. `None` removes the parameter; `Some("")` keeps it
    /// present with an empty value.
    fn write(&self, value: &T) -> Option<String>;
}

/// Conversion pair for each value of a repeated parameter.
pub trait ElementSerializer<T> {
    fn read(&self, raw: &str) -> T;
    fn write(&self, value: &T) -> String;
}

/// The identity conversion: `Option<String>` for scalars, `String` for
/// array elements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Identity;

impl Serializer<Option<String>> for Identity {
    fn read(&self, raw: Option<&str>) -> Option<String> {
        raw.map(str::to_owned)
    }

    fn write(&self, value: &Option<String>) -> Option<String> {
        value.clone()
    }
}

impl ElementSerializer<String> for Identity {
    fn read(&self, raw: &str) -> String {
        raw.to_owned()
    }

    fn write(&self, value: &String) -> String {
        value.clone()
    }
}

/// Serializer built from a `read`/`write` closure pair.
///
/// ```
/// use urlstate::serializer::{FnSerializer, Serializer};
///
/// let flag = FnSerializer::new(
///     |raw: Option<&str>| raw == Some("1"),
///     |on: &bool| on.then(|| "1".to_string()),
/// );
/// assert!(flag.read(Some("1")));
/// assert_eq!(flag.write(&false), None);
/// ```
#[derive(Clone, Copy)]
pub struct FnSerializer<R, W> {
    read: R,
    write: W,
}

impl<R, W> FnSerializer<R, W> {
    pub fn new(read: R, write: W) -> Self {
        Self { read, write }
    }
}

impl<T, R, W> Serializer<T> for FnSerializer<R, W>
where
    R: Fn(Option<&str>) -> T,
    W: Fn(&T) -> Option<String>,
{
    fn read(&self, raw: Option<&str>) -> T {
        (self.read)(raw)
    }

    fn write(&self, value: &T) -> Option<String> {
        (self.write)(value)
    }
}

/// Element serializer built from a `read`/`write` closure pair.
#[derive(Clone, Copy)]
pub struct FnElementSerializer<R, W> {
    read: R,
    write: W,
}

impl<R, W> FnElementSerializer<R, W> {
    pub fn new(read: R, write: W) -> Self {
        Self { read, write }
    }
}

impl<T, R, W> ElementSerializer<T> for FnElementSerializer<R, W>
where
    R: Fn(&str) -> T,
    W: Fn(&T) -> String,
{
    fn read(&self, raw: &str) -> T {
        (self.read)(raw)
    }

    fn write(&self, value: &T) -> String {
        (self.write)(value)
    }
}

/// [`FromStr`]/[`Display`] conversion, e.g. for numeric parameters.
///
/// The typed value is `Option<N>`: absent or unparsable raw values read as
/// `None`, and writing `None` removes the parameter.
pub struct Parsed<N>(PhantomData<fn() -> N>);

impl<N> Parsed<N> {
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<N> Default for Parsed<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> Clone for Parsed<N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N> Copy for Parsed<N> {}

impl<N> std::fmt::Debug for Parsed<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Parsed")
    }
}

impl<N: FromStr + Display> Serializer<Option<N>> for Parsed<N> {
    fn read(&self, raw: Option<&str>) -> Option<N> {
        raw.and_then(|s| s.parse().ok())
    }

    fn write(&self, value: &Option<N>) -> Option<String> {
        value.as_ref().map(ToString::to_string)
    }
}

impl<N: FromStr + Display> ElementSerializer<Option<N>> for Parsed<N> {
    fn read(&self, raw: &str) -> Option<N> {
        raw.parse().ok()
    }

    fn write(&self, value: &Option<N>) -> String {
        value.as_ref().map(ToString::to_string).unwrap_or_default()
    }
}

/// JSON-encoded values via `serde_json`.
///
/// As a scalar serializer the typed value is `Option<T>`: absent or
/// malformed JSON reads as `None`. As an element serializer the typed value
/// is `T`, and malformed JSON panics. Values that `serde_json` cannot encode
/// panic in both shapes rather than removing the parameter.
#[cfg(feature = "json")]
pub struct Json<T>(PhantomData<fn() -> T>);

#[cfg(feature = "json")]
impl<T> Json<T> {
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

#[cfg(feature = "json")]
impl<T> Default for Json<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "json")]
impl<T> Clone for Json<T> {
    fn clone(&self) -> Self {
        *self
    }
}

#[cfg(feature = "json")]
impl<T> Copy for Json<T> {}

#[cfg(feature = "json")]
impl<T> std::fmt::Debug for Json<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Json")
    }
}

#[cfg(feature = "json")]
impl<T> Serializer<Option<T>> for Json<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    fn read(&self, raw: Option<&str>) -> Option<T> {
        raw.and_then(|s| serde_json::from_str(s).ok())
    }

    fn write(&self, value: &Option<T>) -> Option<String> {
        value.as_ref().map(|v| match serde_json::to_string(v) {
            Ok(encoded) => encoded,
            Err(err) => panic!("search param cannot be encoded as JSON: {err}"),
        })
    }
}

#[cfg(feature = "json")]
impl<T> ElementSerializer<T> for Json<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    fn read(&self, raw: &str) -> T {
        match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(err) => panic!("search param element is not valid JSON: {err}"),
        }
    }

    fn write(&self, value: &T) -> String {
        match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(err) => panic!("search param element cannot be encoded as JSON: {err}"),
        }
    }
}
