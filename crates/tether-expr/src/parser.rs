//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 8. `=`, `+=`, `-=`, `*=`, `/=` (right-associative, member/index targets only)
//! 7. `?:` (conditional)
//! 6. `||`
//! 5. `&&`
//! 4. `==`, `!=`, `===`, `!==`
//! 3. `<`, `>`, `<=`, `>=` (no chaining)
//! 2. `+`, `-` then `*`, `/`, `%`
//! 1. unary `!`, `-`
//! 0. postfix `.` member, `[]` index, `()` call, `++`, `--`
//!
//! A snippet is one expression; parsing is fail-fast — there is nothing to
//! resynchronize to after an error.

use tether_types::ast::*;
use tether_types::{CompileError, Span};

use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

/// The expression parser.
///
/// Consumes a token stream produced by the lexer and builds an AST.
pub struct Parser<'src> {
    /// The token stream, always ending with `Eof`.
    tokens: Vec<Token>,
    /// Current index into `tokens`.
    pos: usize,
    /// The snippet text, for error context.
    text: &'src str,
}

impl<'src> Parser<'src> {
    /// Lex and parse a complete snippet into an expression.
    pub fn parse(source: &'src str) -> Result<Expr, CompileError> {
        let tokens = Lexer::new(source).lex()?;
        let mut parser = Self {
            tokens,
            pos: 0,
            text: source,
        };
        let expr = parser.parse_expression()?;
        parser.expect_eof()?;
        Ok(expr)
    }

    // ── Token cursor ──────────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or_else(|| {
            self.tokens
                .last()
                .expect("token stream should end with Eof")
        })
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            Span::point(1, 1)
        }
    }

    fn current_span(&self) -> Span {
        self.peek().span
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &TokenKind) -> Result<Token, CompileError> {
        if self.check(expected) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(format!(
                "expected '{expected}', got '{}'",
                self.peek_kind()
            )))
        }
    }

    fn expect_eof(&mut self) -> Result<(), CompileError> {
        if self.check(&TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.error_at_current(format!(
                "expected end of expression, got '{}'",
                self.peek_kind()
            )))
        }
    }

    fn error_at_current(&self, message: impl Into<String>) -> CompileError {
        CompileError::new(message, self.current_span(), self.text)
    }

    // ── Precedence chain ──────────────────────────────────────────────────

    /// Parse a full expression (assignment level).
    pub fn parse_expression(&mut self) -> Result<Expr, CompileError> {
        self.parse_assignment()
    }

    /// `Assignment = Conditional [ AssignOp Assignment ]`
    fn parse_assignment(&mut self) -> Result<Expr, CompileError> {
        let left = self.parse_conditional()?;
        let op = match self.peek_kind() {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::AddAssign,
            TokenKind::MinusEq => AssignOp::SubAssign,
            TokenKind::StarEq => AssignOp::MulAssign,
            TokenKind::SlashEq => AssignOp::DivAssign,
            _ => return Ok(left),
        };
        self.check_assign_target(&left, op.as_str())?;
        self.advance(); // consume operator
        let value = self.parse_assignment()?;
        let span = left.span.merge(value.span);
        Ok(Expr::new(
            ExprKind::Assign {
                target: Box::new(left),
                op,
                value: Box::new(value),
            },
            span,
        ))
    }

    /// Assignment and step targets must be member or index places.
    fn check_assign_target(&self, target: &Expr, op: &str) -> Result<(), CompileError> {
        match &target.kind {
            ExprKind::Member { .. } | ExprKind::Index { .. } => Ok(()),
            ExprKind::Identifier(name) => Err(CompileError::new(
                format!("cannot apply '{op}' to parameter `{name}`"),
                target.span,
                self.text,
            )),
            _ => Err(CompileError::new(
                format!("invalid target for '{op}'"),
                target.span,
                self.text,
            )),
        }
    }

    /// `Conditional = Or [ "?" Expression ":" Conditional ]`
    fn parse_conditional(&mut self) -> Result<Expr, CompileError> {
        let condition = self.parse_or()?;
        if !self.eat(&TokenKind::Question) {
            return Ok(condition);
        }
        let then_branch = self.parse_expression()?;
        self.expect(&TokenKind::Colon)?;
        let else_branch = self.parse_conditional()?;
        let span = condition.span.merge(else_branch.span);
        Ok(Expr::new(
            ExprKind::Conditional {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            span,
        ))
    }

    /// `Or = And { "||" And }`
    fn parse_or(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::PipePipe) {
            let right = self.parse_and()?;
            left = binary(left, BinOp::Or, right);
        }
        Ok(left)
    }

    /// `And = Equality { "&&" Equality }`
    fn parse_and(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_equality()?;
        while self.eat(&TokenKind::AmpAmp) {
            let right = self.parse_equality()?;
            left = binary(left, BinOp::And, right);
        }
        Ok(left)
    }

    /// `Equality = Comparison { ("==" | "!=" | "===" | "!==") Comparison }`
    fn parse_equality(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::BangEq => BinOp::NotEq,
                TokenKind::EqEqEq => BinOp::StrictEq,
                TokenKind::BangEqEq => BinOp::StrictNotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    /// `Comparison = Additive [ CompOp Additive ]`
    ///
    /// Comparison operators do not chain: `a < b < c` is a parse error.
    fn parse_comparison(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_additive()?;
        if let Some(op) = self.comparison_op() {
            self.advance();
            let right = self.parse_additive()?;
            left = binary(left, op, right);
            if self.comparison_op().is_some() {
                return Err(self.error_at_current(
                    "comparison operators cannot be chained; use '&&' to combine",
                ));
            }
        }
        Ok(left)
    }

    fn comparison_op(&self) -> Option<BinOp> {
        match self.peek_kind() {
            TokenKind::Less => Some(BinOp::Less),
            TokenKind::Greater => Some(BinOp::Greater),
            TokenKind::LessEq => Some(BinOp::LessEq),
            TokenKind::GreaterEq => Some(BinOp::GreaterEq),
            _ => None,
        }
    }

    /// `Additive = Multiplicative { ("+" | "-") Multiplicative }`
    fn parse_additive(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    /// `Multiplicative = Unary { ("*" | "/" | "%") Unary }`
    fn parse_multiplicative(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    /// `Unary = ("!" | "-") Unary | Postfix`
    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        let start = self.current_span();
        let op = match self.peek_kind() {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            let span = start.merge(operand.span);
            Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            ))
        } else {
            self.parse_postfix()
        }
    }

    /// `Postfix = Primary { "." Ident | "[" Expression "]" | "(" Args ")" | "++" | "--" }`
    fn parse_postfix(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_member_name()?;
                    let span = expr.span.merge(name.span);
                    expr = Expr::new(
                        ExprKind::Member {
                            object: Box::new(expr),
                            name,
                        },
                        span,
                    );
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(&TokenKind::RBracket)?;
                    let span = expr.span.merge(self.previous_span());
                    expr = Expr::new(
                        ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_arg_list()?;
                    self.expect(&TokenKind::RParen)?;
                    let span = expr.span.merge(self.previous_span());
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let op = if *self.peek_kind() == TokenKind::PlusPlus {
                        StepOp::Increment
                    } else {
                        StepOp::Decrement
                    };
                    self.check_assign_target(&expr, if op == StepOp::Increment { "++" } else { "--" })?;
                    self.advance();
                    let span = expr.span.merge(self.previous_span());
                    expr = Expr::new(
                        ExprKind::Step {
                            target: Box::new(expr),
                            op,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// A member name after `.` — an identifier, or a keyword used as a
    /// field name (`model.null` is legal markup, if unwise).
    fn expect_member_name(&mut self) -> Result<Ident, CompileError> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Ok(Ident::new(name, span))
            }
            TokenKind::True => {
                let span = self.advance().span;
                Ok(Ident::new("true", span))
            }
            TokenKind::False => {
                let span = self.advance().span;
                Ok(Ident::new("false", span))
            }
            TokenKind::Null => {
                let span = self.advance().span;
                Ok(Ident::new("null", span))
            }
            other => Err(self.error_at_current(format!("expected member name, got '{other}'"))),
        }
    }

    /// Parse a comma-separated argument list (inside parens).
    fn parse_arg_list(&mut self) -> Result<Vec<Expr>, CompileError> {
        let mut args = Vec::new();
        if self.check(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            // Allow trailing comma before `)`
            if self.check(&TokenKind::RParen) {
                break;
            }
        }
        Ok(args)
    }

    // ── Primary expressions ───────────────────────────────────────────────

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        let start = self.current_span();
        match self.peek_kind().clone() {
            TokenKind::NumberLit(n) => {
                self.advance();
                Ok(Expr::new(ExprKind::NumberLit(n), start))
            }
            TokenKind::StringLit(s) => {
                self.advance();
                Ok(Expr::new(ExprKind::StringLit(s), start))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::new(ExprKind::BoolLit(true), start))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::new(ExprKind::BoolLit(false), start))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::new(ExprKind::NullLit, start))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::new(ExprKind::Identifier(name), start))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RParen)?;
                let span = start.merge(self.previous_span());
                Ok(Expr::new(ExprKind::Paren(Box::new(inner)), span))
            }
            other => Err(self.error_at_current(format!("expected expression, got '{other}'"))),
        }
    }
}

fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}
