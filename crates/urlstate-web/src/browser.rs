#![forbid(unsafe_code)]

//! [`Host`] backed by the page's `window`.
//!
//! Only `js-sys` reflection is used: `location.href`,
//! `history.replaceState`/`pushState`, `addEventListener("popstate")` and
//! `queueMicrotask` are looked up on the global object at call time.

use std::cell::{Cell, RefCell};
use std::fmt;

use js_sys::{Array, Function, Reflect};
use urlstate::host::NavigationCallback;
use urlstate::{Host, HostError, ListenerId};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

const POPSTATE: &str = "popstate";

/// Browser window host.
pub struct BrowserHost {
    window: JsValue,
    listeners: RefCell<Vec<(ListenerId, Closure<dyn FnMut()>)>>,
    next_listener: Cell<u64>,
}

impl BrowserHost {
    /// The current window, or `None` outside a navigable document
    /// (workers, server-side runtimes).
    #[must_use]
    pub fn detect() -> Option<Self> {
        let global: JsValue = js_sys::global().into();
        let location = Reflect::get(&global, &JsValue::from_str("location")).ok()?;
        let history = Reflect::get(&global, &JsValue::from_str("history")).ok()?;
        if location.is_undefined() || history.is_undefined() {
            return None;
        }
        Some(Self {
            window: global,
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(1),
        })
    }

    fn prop(target: &JsValue, name: &str) -> Result<JsValue, HostError> {
        Reflect::get(target, &JsValue::from_str(name)).map_err(rejected)
    }

    fn call(target: &JsValue, name: &str, args: &Array) -> Result<JsValue, HostError> {
        let method: Function = Self::prop(target, name)?
            .dyn_into()
            .map_err(|_| HostError::Rejected(format!("{name} is not a function")))?;
        Reflect::apply(&method, target, args).map_err(rejected)
    }

    fn write_history(&self, method: &str, url: &str, keep_state: bool) -> Result<(), HostError> {
        let history = Self::prop(&self.window, "history")?;
        if history.is_undefined() {
            return Err(HostError::Unavailable);
        }
        let state = if keep_state {
            Self::prop(&history, "state")?
        } else {
            JsValue::NULL
        };
        let args = Array::of3(&state, &JsValue::from_str(""), &JsValue::from_str(url));
        Self::call(&history, method, &args).map(drop)
    }
}

fn rejected(err: JsValue) -> HostError {
    let message = err
        .as_string()
        .or_else(|| {
            Reflect::get(&err, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{err:?}"));
    HostError::Rejected(message)
}

impl Host for BrowserHost {
    fn href(&self) -> String {
        Self::prop(&self.window, "location")
            .and_then(|location| Self::prop(&location, "href"))
            .ok()
            .and_then(|href| href.as_string())
            .unwrap_or_default()
    }

    fn replace_url(&self, url: &str) -> Result<(), HostError> {
        self.write_history("replaceState", url, true)
    }

    fn push_url(&self, url: &str) -> Result<(), HostError> {
        self.write_history("pushState", url, false)
    }

    fn add_navigation_listener(&self, callback: NavigationCallback) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);

        let closure = Closure::<dyn FnMut()>::new(move || callback());
        let args = Array::of2(&JsValue::from_str(POPSTATE), closure.as_ref());
        if let Err(err) = Self::call(&self.window, "addEventListener", &args) {
            tracing::warn!(error = %err, "failed to add popstate listener");
        }
        self.listeners.borrow_mut().push((id, closure));
        id
    }

    fn remove_navigation_listener(&self, id: ListenerId) {
        let removed = {
            let mut listeners = self.listeners.borrow_mut();
            listeners
                .iter()
                .position(|(lid, _)| *lid == id)
                .map(|idx| listeners.remove(idx).1)
        };
        let Some(closure) = removed else {
            return;
        };
        let args = Array::of2(&JsValue::from_str(POPSTATE), closure.as_ref());
        if let Err(err) = Self::call(&self.window, "removeEventListener", &args) {
            tracing::warn!(error = %err, "failed to remove popstate listener");
        }
        // Removal can happen from inside the listener itself; the closure
        // must outlive the current invocation.
        self.queue_microtask(Box::new(move || drop(closure)));
    }

    fn queue_microtask(&self, task: Box<dyn FnOnce()>) {
        let callback = Closure::once_into_js(move || task());
        let args = Array::of1(&callback);
        if let Err(err) = Self::call(&self.window, "queueMicrotask", &args) {
            tracing::warn!(error = %err, "queueMicrotask unavailable; task dropped");
        }
    }
}

impl fmt::Debug for BrowserHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserHost")
            .field("href", &self.href())
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}
