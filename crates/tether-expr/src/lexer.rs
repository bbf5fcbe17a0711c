//! Binding-expression lexer — converts snippet source to a token stream.
//!
//! Expression snippets are short and trusted, so lexing is fail-fast: the
//! first bad character aborts with a [`CompileError`] naming the snippet.
//! Newlines are plain whitespace — `{{ }}` bodies may span several lines.

use tether_types::{CompileError, Span};

use crate::token::{Token, TokenKind};

/// The expression lexer.
pub struct Lexer<'src> {
    /// The full snippet as bytes.
    source: &'src [u8],
    /// The snippet as text, for error context.
    text: &'src str,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based).
    col: u32,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given snippet.
    pub fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            text: source,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Lex the entire snippet into a token stream ending with `Eof`.
    pub fn lex(mut self) -> Result<Vec<Token>, CompileError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.scan_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn error(&self, message: impl Into<String>, span: Span) -> CompileError {
        CompileError::new(message, span, self.text)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == b' ' || ch == b'\t' || ch == b'\r' || ch == b'\n' {
                self.advance();
            } else {
                break;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Scanning
    // ─────────────────────────────────────────────────────────────

    fn scan_token(&mut self) -> Result<Token, CompileError> {
        self.skip_whitespace();

        if self.at_end() {
            return Ok(Token::new(TokenKind::Eof, self.current_span()));
        }

        let start_line = self.line;
        let start_col = self.col;
        let ch = self.advance().expect("not at end");

        let token = match ch {
            b'"' | b'\'' => return self.scan_string(ch, start_line, start_col),
            b'0'..=b'9' => return self.scan_number(start_line, start_col),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'$' => {
                return Ok(self.scan_identifier(start_line, start_col));
            }

            b'+' => match self.peek() {
                Some(b'+') => {
                    self.advance();
                    TokenKind::PlusPlus
                }
                Some(b'=') => {
                    self.advance();
                    TokenKind::PlusEq
                }
                _ => TokenKind::Plus,
            },
            b'-' => match self.peek() {
                Some(b'-') => {
                    self.advance();
                    TokenKind::MinusMinus
                }
                Some(b'=') => {
                    self.advance();
                    TokenKind::MinusEq
                }
                _ => TokenKind::Minus,
            },
            b'*' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::StarEq
                } else {
                    TokenKind::Star
                }
            }
            b'/' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::SlashEq
                } else {
                    TokenKind::Slash
                }
            }
            b'%' => TokenKind::Percent,

            b'=' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    if self.peek() == Some(b'=') {
                        self.advance();
                        TokenKind::EqEqEq
                    } else {
                        TokenKind::EqEq
                    }
                } else {
                    TokenKind::Eq
                }
            }
            b'!' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    if self.peek() == Some(b'=') {
                        self.advance();
                        TokenKind::BangEqEq
                    } else {
                        TokenKind::BangEq
                    }
                } else {
                    TokenKind::Bang
                }
            }
            b'<' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::LessEq
                } else {
                    TokenKind::Less
                }
            }
            b'>' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::GreaterEq
                } else {
                    TokenKind::Greater
                }
            }

            b'&' => {
                if self.peek() == Some(b'&') {
                    self.advance();
                    TokenKind::AmpAmp
                } else {
                    let span = self.span_from(start_line, start_col);
                    return Err(self.error("unexpected character '&'", span));
                }
            }
            b'|' => {
                if self.peek() == Some(b'|') {
                    self.advance();
                    TokenKind::PipePipe
                } else {
                    let span = self.span_from(start_line, start_col);
                    return Err(self.error("unexpected character '|'", span));
                }
            }

            b'?' => TokenKind::Question,
            b':' => TokenKind::Colon,
            b'.' => TokenKind::Dot,
            b',' => TokenKind::Comma,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,

            _ => {
                let span = self.span_from(start_line, start_col);
                return Err(self.error(
                    format!("unexpected character '{}'", ch as char),
                    span,
                ));
            }
        };

        Ok(Token::new(token, self.span_from(start_line, start_col)))
    }

    /// Scan a number literal: digits, optional fraction.
    fn scan_number(&mut self, start_line: u32, start_col: u32) -> Result<Token, CompileError> {
        let start = self.pos - 1;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.advance();
        }
        // Fraction — only if a digit follows the dot, so `1.toFixed` lexes
        // as number, dot, identifier.
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            self.advance();
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.advance();
            }
        }
        let span = self.span_from(start_line, start_col);
        let literal = &self.text[start..self.pos];
        let value: f64 = literal
            .parse()
            .map_err(|_| self.error(format!("invalid number literal `{literal}`"), span))?;
        Ok(Token::new(TokenKind::NumberLit(value), span))
    }

    /// Scan a string literal delimited by `quote`, with `\` escapes.
    fn scan_string(
        &mut self,
        quote: u8,
        start_line: u32,
        start_col: u32,
    ) -> Result<Token, CompileError> {
        // Accumulate raw bytes so multi-byte UTF-8 sequences pass through.
        let mut bytes = Vec::new();
        loop {
            let Some(ch) = self.advance() else {
                let span = self.span_from(start_line, start_col);
                return Err(self.error("unterminated string literal", span));
            };
            if ch == quote {
                break;
            }
            if ch == b'\\' {
                let Some(escaped) = self.advance() else {
                    let span = self.span_from(start_line, start_col);
                    return Err(self.error("unterminated string literal", span));
                };
                match escaped {
                    b'n' => bytes.push(b'\n'),
                    b't' => bytes.push(b'\t'),
                    b'r' => bytes.push(b'\r'),
                    other => bytes.push(other),
                }
            } else {
                bytes.push(ch);
            }
        }
        let span = self.span_from(start_line, start_col);
        let value = String::from_utf8_lossy(&bytes).into_owned();
        Ok(Token::new(TokenKind::StringLit(value), span))
    }

    /// Scan an identifier or keyword.
    fn scan_identifier(&mut self, start_line: u32, start_col: u32) -> Token {
        let start = self.pos - 1;
        while matches!(
            self.peek(),
            Some(b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'$')
        ) {
            self.advance();
        }
        let span = self.span_from(start_line, start_col);
        let name = &self.text[start..self.pos];
        let kind = match name {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => TokenKind::Identifier(name.to_string()),
        };
        Token::new(kind, span)
    }
}
