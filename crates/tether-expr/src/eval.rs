//! Tree-walking evaluator for binding expressions.
//!
//! Container member reads and writes go through the [`ModelContext`] seam:
//! the runtime's reactive store implements it with dependency tracking and
//! write notification, while [`PlainContext`] gives direct access for
//! evaluating expressions outside the engine.
//!
//! Semantics are JS-flavored, because the markup this engine consumes was
//! written against a JS host: `+` concatenates when either operand is a
//! string, `&&`/`||` return operand values under truthiness, `==`/`!=`
//! coerce between numbers and numeric strings while `===`/`!==` are strict.

use tether_types::ast::*;
use tether_types::{EvalError, EvalResult, Value};

/// Container access seam.
///
/// `container` is always an object or list value. Implementations decide
/// whether access is plain or tracked.
pub trait ModelContext {
    /// Read member `key` of a container. Missing members read as `null`.
    fn get_member(&self, container: &Value, key: &str) -> EvalResult<Value>;
    /// Write member `key` of a container.
    fn set_member(&self, container: &Value, key: &str, value: Value) -> EvalResult<()>;
}

/// Direct, untracked container access.
pub struct PlainContext;

impl ModelContext for PlainContext {
    fn get_member(&self, container: &Value, key: &str) -> EvalResult<Value> {
        plain_get_member(container, key)
    }

    fn set_member(&self, container: &Value, key: &str, value: Value) -> EvalResult<()> {
        plain_set_member(container, key, value)
    }
}

/// Untracked member read shared by every context implementation.
pub fn plain_get_member(container: &Value, key: &str) -> EvalResult<Value> {
    match container {
        Value::Object(o) => Ok(o.borrow().entries.get(key).cloned().unwrap_or(Value::Null)),
        Value::List(l) => {
            if key == "length" {
                return Ok(Value::Number(l.borrow().items.len() as f64));
            }
            match key.parse::<usize>() {
                Ok(index) => Ok(l.borrow().items.get(index).cloned().unwrap_or(Value::Null)),
                Err(_) => Ok(Value::Null),
            }
        }
        other => Err(EvalError::TypeMismatch(format!(
            "cannot read member `{key}` of {}",
            other.type_name()
        ))),
    }
}

/// Untracked member write shared by every context implementation.
pub fn plain_set_member(container: &Value, key: &str, value: Value) -> EvalResult<()> {
    match container {
        Value::Object(o) => {
            o.borrow_mut().entries.insert(key.to_string(), value);
            Ok(())
        }
        Value::List(l) => {
            let index: usize = key.parse().map_err(|_| {
                EvalError::TypeMismatch(format!("cannot assign list member `{key}`"))
            })?;
            let mut data = l.borrow_mut();
            if index >= data.items.len() {
                data.items.resize(index + 1, Value::Null);
            }
            data.items[index] = value;
            Ok(())
        }
        other => Err(EvalError::TypeMismatch(format!(
            "cannot assign member `{key}` of {}",
            other.type_name()
        ))),
    }
}

/// Flat parameter scope: the expression's declared parameters bound to the
/// call's arguments.
#[derive(Default)]
pub struct Scope {
    params: Vec<(String, Value)>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a parameter name to a value.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.params.push((name.into(), value));
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

/// The expression evaluator — walks AST nodes and produces values.
pub struct Evaluator<'a> {
    ctx: &'a dyn ModelContext,
    scope: &'a Scope,
}

impl<'a> Evaluator<'a> {
    pub fn new(ctx: &'a dyn ModelContext, scope: &'a Scope) -> Self {
        Self { ctx, scope }
    }

    /// Evaluate an expression to a value.
    pub fn eval(&self, expr: &Expr) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::NumberLit(n) => Ok(Value::Number(*n)),
            ExprKind::StringLit(s) => Ok(Value::String(s.clone())),
            ExprKind::BoolLit(b) => Ok(Value::Bool(*b)),
            ExprKind::NullLit => Ok(Value::Null),

            ExprKind::Identifier(name) => self.eval_identifier(name),
            ExprKind::Member { object, name } => {
                let obj = self.eval(object)?;
                self.member_of(&obj, &name.name)
            }
            ExprKind::Index { object, index } => {
                let obj = self.eval(object)?;
                let key = self.index_key(index)?;
                self.member_of(&obj, &key)
            }
            ExprKind::Call { callee, args } => self.eval_call(callee, args),

            ExprKind::Binary { left, op, right } => self.eval_binary(left, *op, right),
            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand),
            ExprKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition)?.truthy() {
                    self.eval(then_branch)
                } else {
                    self.eval(else_branch)
                }
            }

            ExprKind::Assign { target, op, value } => self.eval_assign(target, *op, value),
            ExprKind::Step { target, op } => self.eval_step(target, *op),

            ExprKind::Paren(inner) => self.eval(inner),
        }
    }

    // ── Identifiers & member access ───────────────────────────────────────

    fn eval_identifier(&self, name: &str) -> EvalResult<Value> {
        self.scope
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))
    }

    /// Read a member off a value. Containers go through the context (where
    /// tracking lives); scalars answer the few members they have; missing
    /// members read as `null`, JS-style; member access on `null` is an
    /// error.
    fn member_of(&self, value: &Value, key: &str) -> EvalResult<Value> {
        match value {
            Value::Object(_) | Value::List(_) => self.ctx.get_member(value, key),
            Value::String(s) => {
                if key == "length" {
                    Ok(Value::Number(s.chars().count() as f64))
                } else {
                    Ok(Value::Null)
                }
            }
            Value::Null => Err(EvalError::NullAccess(format!(
                "cannot read member `{key}` of null"
            ))),
            _ => Ok(Value::Null),
        }
    }

    /// Render an index expression into a member key.
    fn index_key(&self, index: &Expr) -> EvalResult<String> {
        let value = self.eval(index)?;
        match &value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(_) => Ok(value.display_string()),
            other => Err(EvalError::TypeMismatch(format!(
                "index must be a string or number, got {}",
                other.type_name()
            ))),
        }
    }

    // ── Calls ─────────────────────────────────────────────────────────────

    fn eval_call(&self, callee: &Expr, args: &[Expr]) -> EvalResult<Value> {
        // Method-shaped call: `receiver.name(args)`.
        if let ExprKind::Member { object, name } = &callee.kind {
            let receiver = self.eval(object)?;
            // A member holding a function value wins over built-ins, so a
            // model can carry host-registered callables.
            let member = match &receiver {
                Value::Object(_) | Value::List(_) => self.ctx.get_member(&receiver, &name.name)?,
                Value::Null => {
                    return Err(EvalError::NullAccess(format!(
                        "cannot call `{}` on null",
                        name.name
                    )))
                }
                _ => Value::Null,
            };
            if let Value::Function(f) = member {
                let arg_values = self.eval_args(args)?;
                return f.call(arg_values);
            }
            let arg_values = self.eval_args(args)?;
            return self.builtin_method(&receiver, &name.name, arg_values);
        }

        // Anything else must evaluate to a function value.
        let target = self.eval(callee)?;
        match target {
            Value::Function(f) => {
                let arg_values = self.eval_args(args)?;
                f.call(arg_values)
            }
            other => Err(EvalError::NotCallable(format!(
                "{} is not a function",
                other.type_name()
            ))),
        }
    }

    fn eval_args(&self, args: &[Expr]) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg)?);
        }
        Ok(values)
    }

    /// Built-in methods, dispatched by receiver type.
    fn builtin_method(&self, receiver: &Value, name: &str, args: Vec<Value>) -> EvalResult<Value> {
        match (receiver, name) {
            (Value::String(s), "toUpperCase") => Ok(Value::String(s.to_uppercase())),
            (Value::String(s), "toLowerCase") => Ok(Value::String(s.to_lowercase())),
            (Value::String(s), "trim") => Ok(Value::String(s.trim().to_string())),
            (Value::String(s), "includes") => {
                let needle = string_arg(&args, 0, "includes")?;
                Ok(Value::Bool(s.contains(&needle)))
            }
            (Value::String(s), "startsWith") => {
                let needle = string_arg(&args, 0, "startsWith")?;
                Ok(Value::Bool(s.starts_with(&needle)))
            }
            (Value::String(s), "endsWith") => {
                let needle = string_arg(&args, 0, "endsWith")?;
                Ok(Value::Bool(s.ends_with(&needle)))
            }
            (Value::String(_), "toString") => Ok(receiver.clone()),

            (Value::Number(n), "toFixed") => {
                let digits = args
                    .first()
                    .map(|v| v.coerce_number())
                    .transpose()?
                    .unwrap_or(0.0) as usize;
                Ok(Value::String(format!("{n:.digits$}")))
            }
            (Value::Number(_), "toString") => Ok(Value::String(receiver.display_string())),

            (Value::List(l), "includes") => {
                let needle = args.first().cloned().unwrap_or(Value::Null);
                Ok(Value::Bool(l.borrow().items.iter().any(|v| *v == needle)))
            }
            (Value::List(l), "indexOf") => {
                let needle = args.first().cloned().unwrap_or(Value::Null);
                let index = l
                    .borrow()
                    .items
                    .iter()
                    .position(|v| *v == needle)
                    .map(|i| i as f64)
                    .unwrap_or(-1.0);
                Ok(Value::Number(index))
            }
            (Value::List(l), "join") => {
                let separator = args
                    .first()
                    .map(|v| v.display_string())
                    .unwrap_or_else(|| ",".to_string());
                let joined = l
                    .borrow()
                    .items
                    .iter()
                    .map(|v| v.display_string())
                    .collect::<Vec<_>>()
                    .join(&separator);
                Ok(Value::String(joined))
            }

            _ => Err(EvalError::UnknownFunction(format!(
                "no method `{name}` on {}",
                receiver.type_name()
            ))),
        }
    }

    // ── Operators ─────────────────────────────────────────────────────────

    fn eval_binary(&self, left: &Expr, op: BinOp, right: &Expr) -> EvalResult<Value> {
        // Logical operators short-circuit and return operand values.
        match op {
            BinOp::Or => {
                let l = self.eval(left)?;
                if l.truthy() {
                    return Ok(l);
                }
                return self.eval(right);
            }
            BinOp::And => {
                let l = self.eval(left)?;
                if !l.truthy() {
                    return Ok(l);
                }
                return self.eval(right);
            }
            _ => {}
        }
        let l = self.eval(left)?;
        let r = self.eval(right)?;
        apply_binary(&l, op, &r)
    }

    fn eval_unary(&self, op: UnaryOp, operand: &Expr) -> EvalResult<Value> {
        let value = self.eval(operand)?;
        match op {
            UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
            UnaryOp::Neg => Ok(Value::Number(-value.coerce_number()?)),
        }
    }

    // ── Assignment ────────────────────────────────────────────────────────

    /// Resolve an assignment target to its `(container, key)` place.
    fn resolve_place(&self, target: &Expr) -> EvalResult<(Value, String)> {
        match &target.kind {
            ExprKind::Member { object, name } => {
                let container = self.eval(object)?;
                self.require_container(&container, &name.name)?;
                Ok((container, name.name.clone()))
            }
            ExprKind::Index { object, index } => {
                let container = self.eval(object)?;
                let key = self.index_key(index)?;
                self.require_container(&container, &key)?;
                Ok((container, key))
            }
            _ => Err(EvalError::InvalidAssignment(
                "assignment target must be a member or index".to_string(),
            )),
        }
    }

    fn require_container(&self, value: &Value, key: &str) -> EvalResult<()> {
        match value {
            Value::Object(_) | Value::List(_) => Ok(()),
            Value::Null => Err(EvalError::NullAccess(format!(
                "cannot assign member `{key}` of null"
            ))),
            other => Err(EvalError::TypeMismatch(format!(
                "cannot assign member `{key}` of {}",
                other.type_name()
            ))),
        }
    }

    fn eval_assign(&self, target: &Expr, op: AssignOp, value: &Expr) -> EvalResult<Value> {
        let (container, key) = self.resolve_place(target)?;
        let new = match op.binary() {
            None => self.eval(value)?,
            Some(binop) => {
                let current = self.ctx.get_member(&container, &key)?;
                let operand = self.eval(value)?;
                apply_binary(&current, binop, &operand)?
            }
        };
        self.ctx.set_member(&container, &key, new.clone())?;
        Ok(new)
    }

    fn eval_step(&self, target: &Expr, op: StepOp) -> EvalResult<Value> {
        let (container, key) = self.resolve_place(target)?;
        let current = self.ctx.get_member(&container, &key)?;
        let n = current.coerce_number()?;
        self.ctx
            .set_member(&container, &key, Value::Number(n + op.delta()))?;
        // Postfix: the expression's value is the pre-step value.
        Ok(Value::Number(n))
    }
}

fn string_arg(args: &[Value], index: usize, method: &str) -> EvalResult<String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Ok(other.display_string()),
        None => Err(EvalError::TypeMismatch(format!(
            "`{method}` expects an argument"
        ))),
    }
}

/// Apply a non-logical binary operator to two values.
pub fn apply_binary(l: &Value, op: BinOp, r: &Value) -> EvalResult<Value> {
    match op {
        BinOp::Add => {
            // String concatenation wins when either side is a string.
            if matches!(l, Value::String(_)) || matches!(r, Value::String(_)) {
                Ok(Value::String(format!(
                    "{}{}",
                    l.display_string(),
                    r.display_string()
                )))
            } else {
                Ok(Value::Number(l.coerce_number()? + r.coerce_number()?))
            }
        }
        BinOp::Sub => Ok(Value::Number(l.coerce_number()? - r.coerce_number()?)),
        BinOp::Mul => Ok(Value::Number(l.coerce_number()? * r.coerce_number()?)),
        BinOp::Div => Ok(Value::Number(l.coerce_number()? / r.coerce_number()?)),
        BinOp::Mod => Ok(Value::Number(l.coerce_number()? % r.coerce_number()?)),

        BinOp::Eq => Ok(Value::Bool(loose_eq(l, r))),
        BinOp::NotEq => Ok(Value::Bool(!loose_eq(l, r))),
        BinOp::StrictEq => Ok(Value::Bool(l == r)),
        BinOp::StrictNotEq => Ok(Value::Bool(l != r)),

        BinOp::Less | BinOp::Greater | BinOp::LessEq | BinOp::GreaterEq => compare(l, op, r),

        BinOp::Or | BinOp::And => unreachable!("logical operators short-circuit in eval_binary"),
    }
}

/// Loose equality: strict equality, plus numeric coercion between numbers,
/// booleans, and numeric strings.
fn loose_eq(l: &Value, r: &Value) -> bool {
    if l == r {
        return true;
    }
    match (l, r) {
        (Value::Number(_) | Value::Bool(_), Value::Number(_) | Value::Bool(_) | Value::String(_))
        | (Value::String(_), Value::Number(_) | Value::Bool(_)) => {
            match (l.coerce_number(), r.coerce_number()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            }
        }
        _ => false,
    }
}

fn compare(l: &Value, op: BinOp, r: &Value) -> EvalResult<Value> {
    // Strings compare lexicographically; everything else numerically.
    let ordering = match (l, r) {
        (Value::String(a), Value::String(b)) => a.partial_cmp(b),
        _ => l.coerce_number()?.partial_cmp(&r.coerce_number()?),
    };
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };
    let result = match op {
        BinOp::Less => ordering.is_lt(),
        BinOp::Greater => ordering.is_gt(),
        BinOp::LessEq => ordering.is_le(),
        BinOp::GreaterEq => ordering.is_ge(),
        _ => unreachable!("compare only handles comparison operators"),
    };
    Ok(Value::Bool(result))
}
