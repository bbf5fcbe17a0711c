//! Engine-level error taxonomy.

use thiserror::Error;
use tether_types::{CompileError, EvalError};

/// Errors surfaced by the binding engine.
///
/// Policy: compile errors abort the enclosing track pass for template
/// bindings and are isolated per element for attribute/event bindings;
/// evaluation errors propagate uncaught to whatever write or track pass
/// triggered them — isolating failures is the host's responsibility.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed expression source, surfaced at track time.
    #[error("expression compilation failed: {0}")]
    Compile(#[from] CompileError),

    /// A compiled expression failed at call time.
    #[error("expression evaluation failed: {0}")]
    Evaluation(#[from] EvalError),

    /// A binding was evaluated before any model was registered. Fatal.
    #[error("no model has been registered")]
    UnregisteredModel,

    /// `start`/`flush` before a document was configured.
    #[error("no document has been configured")]
    MissingDocument,
}

/// Flatten an engine error into an evaluation error, for call sites with
/// an [`EvalError`] signature (the model-context seam, event dispatch).
pub(crate) fn to_eval_error(err: EngineError) -> EvalError {
    match err {
        EngineError::Evaluation(e) => e,
        other => EvalError::Runtime(other.to_string()),
    }
}
