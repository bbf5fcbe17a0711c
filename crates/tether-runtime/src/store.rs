//! The reactive store.
//!
//! The explicit-interface rendition of intercepting proxies: container
//! member access goes through [`StoreContext`], which lazily wraps nested
//! containers with their path prefix, registers the current evaluation
//! context as a subscriber on reads, and notifies subscribers on writes.
//!
//! Wrapping is *marking*: the container keeps its identity, the marker
//! records the path prefix it was first reached under, and re-wrapping is
//! idempotent. Containers without a marker (utility tables, event
//! objects) read and write plainly — no tracking, no notification.

use tether_expr::eval::{plain_get_member, plain_set_member};
use tether_expr::ModelContext;
use tether_types::{EvalResult, PropertyPath, Value};

use crate::engine::EngineInner;
use crate::error::{to_eval_error, EngineError};

impl EngineInner {
    /// Apply the reactive marker to a plain container. Lazily invoked at
    /// first access of a nested container, not eagerly at registration.
    pub(crate) fn wrap(&self, value: &Value, prefix: PropertyPath) {
        if value.mark_reactive(prefix.clone()) {
            if prefix.is_root() {
                self.logger().debug("Registering wrapper for the model root");
            } else {
                self.logger()
                    .debug(&format!("Registering wrapper at \"{prefix}\""));
            }
        }
    }
}

/// [`ModelContext`] implementation backed by the engine.
pub(crate) struct StoreContext<'a> {
    pub engine: &'a EngineInner,
}

impl StoreContext<'_> {
    /// Tracked member read, with lazy wrapping of nested containers.
    fn reactive_get(&self, container: &Value, key: &str) -> EvalResult<Value> {
        let value = plain_get_member(container, key)?;

        let Some(prefix) = container.reactive_prefix() else {
            return Ok(value);
        };
        let path = prefix.join(key);

        if value.is_container() && value.reactive_prefix().is_none() {
            self.engine.wrap(&value, path.clone());
        }

        // Register the innermost evaluating subscriber — unless it is
        // already registered for this exact path.
        let current = self.engine.eval_stack.borrow().last().cloned();
        if let Some(subscriber) = current {
            let added = self
                .engine
                .interest
                .borrow_mut()
                .subscribe(path.clone(), subscriber);
            if added {
                self.engine
                    .logger()
                    .log(&format!("Property \"{path}\" is interesting for a binding"));
            }
        }
        Ok(value)
    }

    /// Tracked member write: wrap, store, then synchronously notify every
    /// subscriber registered for the path. Depth-first — a write triggered
    /// inside a subscriber propagates completely before this one returns.
    fn reactive_set(&self, container: &Value, key: &str, value: Value) -> EvalResult<()> {
        let Some(prefix) = container.reactive_prefix() else {
            return plain_set_member(container, key, value);
        };
        let path = prefix.join(key);

        if value.is_container() && value.reactive_prefix().is_none() {
            self.engine.wrap(&value, path.clone());
        }
        plain_set_member(container, key, value.clone())?;
        self.engine.logger().log(&format!(
            "Property \"{path}\" was set to {}",
            value.display_string()
        ));

        self.engine.notify(&path, &value).map_err(to_eval_error)
    }

    /// Path-navigation read, for the host-facing `get(path)`.
    pub(crate) fn read_segment(
        &self,
        container: &Value,
        segment: &str,
    ) -> Result<Value, EngineError> {
        if !container.is_container() {
            return Err(EngineError::Evaluation(tether_types::EvalError::TypeMismatch(
                format!("cannot read `{segment}` of {}", container.type_name()),
            )));
        }
        self.reactive_get(container, segment)
            .map_err(EngineError::Evaluation)
    }

    /// Path-navigation write, for the host-facing `set(path, value)`.
    pub(crate) fn write_segment(
        &self,
        container: &Value,
        segment: &str,
        value: Value,
    ) -> Result<(), EngineError> {
        if !container.is_container() {
            return Err(EngineError::Evaluation(tether_types::EvalError::TypeMismatch(
                format!("cannot assign `{segment}` of {}", container.type_name()),
            )));
        }
        self.reactive_set(container, segment, value)
            .map_err(EngineError::Evaluation)
    }
}

impl ModelContext for StoreContext<'_> {
    fn get_member(&self, container: &Value, key: &str) -> EvalResult<Value> {
        self.reactive_get(container, key)
    }

    fn set_member(&self, container: &Value, key: &str, value: Value) -> EvalResult<()> {
        self.reactive_set(container, key, value)
    }
}
