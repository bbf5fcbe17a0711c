//! The interest matrix — the engine's dependency registry.
//!
//! Maps each [`PropertyPath`] to the ordered-insertion list of subscribers
//! (bindings or plain callbacks) depending on it. Entries are created on
//! first tracked read and never pruned individually; removal happens only
//! on full reset. Subscriber identity is `Rc` pointer identity.

use std::collections::BTreeMap;
use std::rc::Rc;
use tether_types::{PropertyPath, Value};

use crate::binding::Binding;

/// A plain-callback subscriber, invoked with `(new_value, path)`.
pub struct ChangeHandler {
    callback: Box<dyn Fn(&Value, &str)>,
}

impl ChangeHandler {
    pub fn new(callback: impl Fn(&Value, &str) + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    pub fn call(&self, value: &Value, path: &str) {
        (self.callback)(value, path)
    }
}

/// Something interested in a path's changes.
#[derive(Clone)]
pub enum Subscriber {
    Binding(Rc<Binding>),
    Handler(Rc<ChangeHandler>),
}

impl Subscriber {
    /// Pointer identity — the equality idempotent subscription uses.
    pub fn same(&self, other: &Subscriber) -> bool {
        match (self, other) {
            (Self::Binding(a), Self::Binding(b)) => Rc::ptr_eq(a, b),
            (Self::Handler(a), Self::Handler(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binding(b) => write!(f, "Subscriber::Binding({:?})", b.source()),
            Self::Handler(_) => write!(f, "Subscriber::Handler"),
        }
    }
}

/// Property path → insertion-ordered subscribers.
#[derive(Debug, Default)]
pub struct InterestMatrix {
    entries: BTreeMap<PropertyPath, Vec<Subscriber>>,
}

impl InterestMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `subscriber` for `path`. Idempotent: returns `false` when
    /// the subscriber is already registered for that exact path.
    pub fn subscribe(&mut self, path: PropertyPath, subscriber: Subscriber) -> bool {
        let list = self.entries.entry(path).or_default();
        if list.iter().any(|s| s.same(&subscriber)) {
            return false;
        }
        list.push(subscriber);
        true
    }

    /// Snapshot of the subscribers registered for `path`, in insertion
    /// order. Notification iterates this snapshot, so subscribers added
    /// mid-propagation are picked up from the next write onward.
    pub fn subscribers(&self, path: &PropertyPath) -> Vec<Subscriber> {
        self.entries.get(path).cloned().unwrap_or_default()
    }

    /// Whether `subscriber` is registered for `path`.
    pub fn is_registered(&self, path: &PropertyPath, subscriber: &Subscriber) -> bool {
        self.entries
            .get(path)
            .is_some_and(|list| list.iter().any(|s| s.same(subscriber)))
    }

    /// All paths with at least one subscriber.
    pub fn paths(&self) -> Vec<PropertyPath> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry. Full-reset only.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
