//! Fine-grained reactive data binding for HTML documents.
//!
//! Given a plain data object and a document subtree annotated with
//! embedded expressions, the engine keeps element attributes, properties,
//! and rendered text synchronized with the object's current values,
//! re-evaluating only the expressions affected by each mutation.
//!
//! ```text
//! register(data) → reactive store wraps the root
//! start()        → tracker scans the document, compiles markup into bindings
//! first eval     → tracked reads fill the interest matrix
//! writes         → interest matrix → affected bindings re-evaluate → DOM
//! insertions     → mutation watcher feeds new elements back to the tracker
//! ```
//!
//! Propagation is synchronous and depth-first within the triggering
//! write's call stack; the mutation log drained by [`Engine::flush`] is
//! the only deferred work. Everything is single-threaded (`Rc`-based).
//!
//! ```no_run
//! use std::rc::Rc;
//! use tether_runtime::{Document, Engine, EngineConfig};
//!
//! let doc = Rc::new(Document::from_body_html(
//!     r#"<div interactive><span class="{{ model.value }}">{{ model.value }}</span></div>"#,
//! ));
//! let engine = Engine::new();
//! engine.configure(EngineConfig {
//!     document: Some(doc.clone()),
//!     ..EngineConfig::default()
//! });
//! let model = engine.register(serde_json::json!({ "value": "abc" }));
//! engine.start()?;
//! model.set("value", "bcd")?; // re-renders synchronously
//! # Ok::<(), tether_runtime::EngineError>(())
//! ```

pub mod binding;
pub mod engine;
pub mod error;
pub mod interest;
pub mod logger;
mod store;
mod tracker;
mod watcher;

pub use binding::{Binding, BindingTarget};
pub use engine::{Engine, EngineConfig, Model};
pub use error::EngineError;
pub use interest::{ChangeHandler, InterestMatrix, Subscriber};
pub use logger::{Logger, NullLogger, TracingLogger};
pub use tracker::{INTERACTIVE_ATTRIBUTE, REGISTERED_ATTRIBUTE};

// The pieces hosts touch alongside the engine.
pub use tether_dom::{Document, Event, NodeId};
pub use tether_expr::{AstCompiler, CompiledExpression, ExpressionCompiler};
pub use tether_types::{CompileError, EvalError, PropertyPath, Value};
