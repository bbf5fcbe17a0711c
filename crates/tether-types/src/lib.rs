//! Shared types for the tether binding engine.
//!
//! Everything the other crates agree on lives here: the dynamic [`Value`]
//! model, canonical [`PropertyPath`] keys, the binding-expression AST,
//! source [`Span`]s, and the compile/evaluation error types.

pub mod ast;
pub mod error;
pub mod path;
pub mod span;
pub mod value;

pub use error::{CompileError, EvalError, EvalResult};
pub use path::PropertyPath;
pub use span::Span;
pub use value::{FunctionData, ListData, ObjectData, Value};
