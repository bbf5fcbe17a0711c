//! Compile-time and run-time error types for binding expressions.

use crate::Span;
use serde::Serialize;
use std::fmt;

/// Compilation failure — malformed expression source.
///
/// Carries the offending snippet so track-time diagnostics can name the
/// exact markup that failed.
#[derive(Debug, Clone, Serialize)]
pub struct CompileError {
    /// Human-readable error message.
    pub message: String,
    /// Location inside the snippet.
    pub span: Span,
    /// The source snippet that failed to compile.
    pub snippet: String,
}

impl CompileError {
    /// Create a new compile error.
    pub fn new(message: impl Into<String>, span: Span, snippet: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span,
            snippet: snippet.into(),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} in `{}`", self.span, self.message, self.snippet)
    }
}

impl std::error::Error for CompileError {}

/// Evaluation error — raised while a compiled expression runs.
///
/// These propagate uncaught to whatever triggered the evaluation (a write,
/// a track pass, or an event dispatch); the engine performs no per-binding
/// containment.
#[derive(Debug, Clone)]
pub enum EvalError {
    /// Unknown identifier — not a declared parameter of the expression.
    UndefinedVariable(String),
    /// Member access or method call on `null`.
    NullAccess(String),
    /// Operand or receiver of the wrong type.
    TypeMismatch(String),
    /// Call target is not a function.
    NotCallable(String),
    /// No built-in method with this name on the receiver's type.
    UnknownFunction(String),
    /// Assignment to something that is not a member or index place.
    InvalidAssignment(String),
    /// A host-registered utility function failed.
    Native(String),
    /// Generic runtime error.
    Runtime(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndefinedVariable(name) => write!(f, "undefined variable: {name}"),
            Self::NullAccess(msg) => write!(f, "null access: {msg}"),
            Self::TypeMismatch(msg) => write!(f, "type mismatch: {msg}"),
            Self::NotCallable(msg) => write!(f, "not callable: {msg}"),
            Self::UnknownFunction(msg) => write!(f, "unknown function: {msg}"),
            Self::InvalidAssignment(msg) => write!(f, "invalid assignment: {msg}"),
            Self::Native(msg) => write!(f, "utility function error: {msg}"),
            Self::Runtime(msg) => write!(f, "runtime error: {msg}"),
        }
    }
}

impl std::error::Error for EvalError {}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_display() {
        let err = CompileError::new("unexpected token ')'", Span::point(1, 14), "model.value +)");
        assert_eq!(
            format!("{err}"),
            "1:14: unexpected token ')' in `model.value +)`"
        );
    }

    #[test]
    fn test_compile_error_serializes() {
        let err = CompileError::new("unexpected end of input", Span::point(1, 6), "model.");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"message\""));
        assert!(json.contains("\"snippet\""));
    }

    #[test]
    fn test_eval_error_display() {
        assert_eq!(
            format!("{}", EvalError::UndefinedVariable("mdoel".into())),
            "undefined variable: mdoel"
        );
        assert_eq!(
            format!("{}", EvalError::NullAccess("cannot read `name`".into())),
            "null access: cannot read `name`"
        );
    }
}
