//! The binding-expression language.
//!
//! Converts trusted expression snippets found in markup (`{{ … }}` bodies,
//! `[attr]` and `@event` values) into callable expressions:
//!
//! ```text
//! source text → Lexer → Parser → AST → Evaluator
//! ```
//!
//! Compilation is an explicit, swappable capability — see
//! [`ExpressionCompiler`] — so the host controls the trust boundary.
//! Container reads and writes go through the [`ModelContext`] seam, which
//! is where the runtime hooks in dependency tracking and write
//! notification.

pub mod compile;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod token;

pub use compile::{AstCompiler, CompiledExpression, ExpressionCompiler};
pub use eval::{Evaluator, ModelContext, PlainContext, Scope};
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{Token, TokenKind};
