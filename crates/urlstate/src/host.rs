#![forbid(unsafe_code)]

//! Navigable client context.
//!
//! A [`Host`] is whatever owns the visible URL: a browser window (see the
//! `urlstate-web` crate), or the deterministic [`MemoryHost`] used by tests
//! and headless embeddings. Server rendering has no host at all; the
//! context degrades to a read-only parse of the request query.
//!
//! # Host contract
//!
//! - `replace_url`/`push_url` never dispatch navigation listeners
//!   (mirrors `history.replaceState`/`pushState`, which do not fire
//!   `popstate`).
//! - Navigation listeners fire on history traversal and on externally
//!   driven location changes.
//! - `queue_microtask` runs the task after the current synchronous work,
//!   before the host yields to the next event.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::error::HostError;

/// Callback invoked when the host's location changes through navigation.
pub type NavigationCallback = Rc<dyn Fn()>;

/// Handle for a registered navigation listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Owner of the visible URL and the navigation history.
pub trait Host {
    /// Absolute URL of the current location.
    fn href(&self) -> String;

    /// Replace the current history entry with `url`.
    fn replace_url(&self, url: &str) -> Result<(), HostError>;

    /// Push a new history entry for `url`.
    fn push_url(&self, url: &str) -> Result<(), HostError>;

    /// Register a listener for history navigation events.
    fn add_navigation_listener(&self, callback: NavigationCallback) -> ListenerId;

    /// Remove a previously registered listener. Unknown ids are ignored.
    fn remove_navigation_listener(&self, id: ListenerId);

    /// Defer `task` to the next microtask checkpoint.
    fn queue_microtask(&self, task: Box<dyn FnOnce()>);
}

/// Kind of history write recorded by [`MemoryHost`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryOp {
    Replace,
    Push,
}

/// In-memory [`Host`] with a history stack and a manual microtask queue.
///
/// Nothing runs on its own: call [`flush`](Self::flush) to drain deferred
/// tasks, and [`back`](Self::back)/[`forward`](Self::forward)/
/// [`navigate_to`](Self::navigate_to) to simulate navigation events.
///
/// ```
/// use urlstate::host::{Host, MemoryHost};
///
/// let host = MemoryHost::new("https://example.com/list?page=1");
/// host.push_url("https://example.com/list?page=2").unwrap();
/// host.back();
/// assert_eq!(host.href(), "https://example.com/list?page=1");
/// ```
pub struct MemoryHost {
    entries: RefCell<Vec<String>>,
    cursor: Cell<usize>,
    listeners: RefCell<Vec<(ListenerId, NavigationCallback)>>,
    next_listener: Cell<u64>,
    microtasks: RefCell<VecDeque<Box<dyn FnOnce()>>>,
    log: RefCell<Vec<(HistoryOp, String)>>,
    reject_writes: Cell<bool>,
}

impl MemoryHost {
    /// Create a host whose only history entry is `href`.
    #[must_use]
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            entries: RefCell::new(vec![href.into()]),
            cursor: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(1),
            microtasks: RefCell::new(VecDeque::new()),
            log: RefCell::new(Vec::new()),
            reject_writes: Cell::new(false),
        }
    }

    /// Run queued microtasks until the queue is empty.
    ///
    /// Tasks queued while flushing run in the same call. Returns the number
    /// of tasks executed.
    pub fn flush(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.microtasks.borrow_mut().pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Number of microtasks waiting for [`flush`](Self::flush).
    #[must_use]
    pub fn pending_microtasks(&self) -> usize {
        self.microtasks.borrow().len()
    }

    /// Move one entry back and dispatch a navigation event.
    ///
    /// Returns `false` (and dispatches nothing) at the start of history.
    pub fn back(&self) -> bool {
        self.go(-1)
    }

    /// Move one entry forward and dispatch a navigation event.
    pub fn forward(&self) -> bool {
        self.go(1)
    }

    /// Move `delta` entries through history and dispatch a navigation event.
    pub fn go(&self, delta: isize) -> bool {
        let len = self.entries.borrow().len();
        let target = self.cursor.get().checked_add_signed(delta);
        match target {
            Some(target) if target < len && delta != 0 => {
                self.cursor.set(target);
                self.dispatch();
                true
            }
            _ => false,
        }
    }

    /// Simulate an externally driven navigation to `href`.
    ///
    /// Pushes a new entry and dispatches a navigation event, as a
    /// same-document navigation initiated outside the bindings would.
    pub fn navigate_to(&self, href: impl Into<String>) {
        self.push_entry(href.into());
        self.dispatch();
    }

    /// Every history write performed through the [`Host`] trait, in order.
    #[must_use]
    pub fn history_log(&self) -> Vec<(HistoryOp, String)> {
        self.log.borrow().clone()
    }

    /// Number of history entries.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Number of live navigation listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Make subsequent history writes fail with [`HostError::Rejected`].
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.set(reject);
    }

    fn push_entry(&self, href: String) {
        let mut entries = self.entries.borrow_mut();
        let cursor = self.cursor.get();
        entries.truncate(cursor + 1);
        entries.push(href);
        self.cursor.set(entries.len() - 1);
    }

    fn dispatch(&self) {
        let listeners: Vec<NavigationCallback> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        for cb in listeners {
            cb();
        }
    }

    fn check_writable(&self) -> Result<(), HostError> {
        if self.reject_writes.get() {
            return Err(HostError::Rejected("writes disabled".into()));
        }
        Ok(())
    }
}

impl Host for MemoryHost {
    fn href(&self) -> String {
        self.entries.borrow()[self.cursor.get()].clone()
    }

    fn replace_url(&self, url: &str) -> Result<(), HostError> {
        self.check_writable()?;
        self.entries.borrow_mut()[self.cursor.get()] = url.to_owned();
        self.log
            .borrow_mut()
            .push((HistoryOp::Replace, url.to_owned()));
        Ok(())
    }

    fn push_url(&self, url: &str) -> Result<(), HostError> {
        self.check_writable()?;
        self.push_entry(url.to_owned());
        self.log.borrow_mut().push((HistoryOp::Push, url.to_owned()));
        Ok(())
    }

    fn add_navigation_listener(&self, callback: NavigationCallback) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, callback));
        id
    }

    fn remove_navigation_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
    }

    fn queue_microtask(&self, task: Box<dyn FnOnce()>) {
        self.microtasks.borrow_mut().push_back(task);
    }
}

impl fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHost")
            .field("href", &self.href())
            .field("history_len", &self.entries.borrow().len())
            .field("cursor", &self.cursor.get())
            .field("listeners", &self.listeners.borrow().len())
            .field("pending_microtasks", &self.microtasks.borrow().len())
            .finish()
    }
}
