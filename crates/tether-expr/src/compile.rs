//! The expression-compilation capability.
//!
//! "Compile snippet text to a callable" is an injected, swappable seam so
//! the host controls the trust boundary. The default [`AstCompiler`]
//! parses the snippet into an AST and evaluates it on call; a host that
//! wants stricter validation (or a different language entirely) swaps in
//! its own [`ExpressionCompiler`].

use std::rc::Rc;
use tether_types::ast::Expr;
use tether_types::{CompileError, EvalResult, Value};

use crate::eval::{Evaluator, ModelContext, Scope};
use crate::parser::Parser;

/// A compiled expression, callable against a model context.
pub trait CompiledExpression {
    /// The snippet this expression was compiled from.
    fn source(&self) -> &str;

    /// Evaluate with `args` bound positionally to the declared parameters.
    /// Missing arguments read as `null`.
    fn call(&self, ctx: &dyn ModelContext, args: &[Value]) -> EvalResult<Value>;
}

/// Compiles snippet text into callable expressions.
pub trait ExpressionCompiler {
    /// Compile `source` with the given parameter names.
    fn compile(
        &self,
        source: &str,
        params: &[&str],
    ) -> Result<Rc<dyn CompiledExpression>, CompileError>;
}

/// The default compiler: lex + parse into an AST, evaluate on call.
#[derive(Debug, Default)]
pub struct AstCompiler;

impl AstCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl ExpressionCompiler for AstCompiler {
    fn compile(
        &self,
        source: &str,
        params: &[&str],
    ) -> Result<Rc<dyn CompiledExpression>, CompileError> {
        let ast = Parser::parse(source)?;
        Ok(Rc::new(AstExpression {
            source: source.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            ast,
        }))
    }
}

/// An expression compiled by [`AstCompiler`].
struct AstExpression {
    source: String,
    params: Vec<String>,
    ast: Expr,
}

impl CompiledExpression for AstExpression {
    fn source(&self) -> &str {
        &self.source
    }

    fn call(&self, ctx: &dyn ModelContext, args: &[Value]) -> EvalResult<Value> {
        let mut scope = Scope::new();
        for (i, name) in self.params.iter().enumerate() {
            scope.define(name, args.get(i).cloned().unwrap_or(Value::Null));
        }
        Evaluator::new(ctx, &scope).eval(&self.ast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::PlainContext;
    use tether_types::Value;

    #[test]
    fn test_compile_and_call() {
        let compiler = AstCompiler::new();
        let expr = compiler.compile("a + b", &["a", "b"]).unwrap();
        let result = expr
            .call(&PlainContext, &[Value::from(2.0), Value::from(3.0)])
            .unwrap();
        assert_eq!(result, Value::from(5.0));
    }

    #[test]
    fn test_missing_args_read_as_null() {
        let compiler = AstCompiler::new();
        let expr = compiler.compile("a == null", &["a", "b"]).unwrap();
        let result = expr.call(&PlainContext, &[]).unwrap();
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn test_compile_error_names_snippet() {
        let compiler = AstCompiler::new();
        let err = compiler.compile("model.value +", &["model"]).err().unwrap();
        assert_eq!(err.snippet, "model.value +");
    }
}
