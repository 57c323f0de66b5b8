//! One-token-lookahead cursor over the scanner's output.
//!
//! The compilation engine never backtracks: it inspects the current token
//! through `classify` and the typed accessors, then consumes it with
//! `advance` (or one of the `expect_*` helpers).

use crate::error::CompileError;
use crate::token::{Keyword, Span, SpannedToken, Token, TokenKind};
use std::collections::VecDeque;

/// Ordered stream of tokens, each handed out exactly once.
pub struct TokenStream {
    tokens: VecDeque<SpannedToken>,
    /// Span of the most recently consumed token, used for end-of-input errors.
    last_span: Span,
}

impl TokenStream {
    pub fn new(tokens: Vec<SpannedToken>) -> Self {
        Self {
            tokens: tokens.into(),
            last_span: Span::default(),
        }
    }

    /// Whether any token remains to be consumed.
    pub fn has_more(&self) -> bool {
        !self.tokens.is_empty()
    }

    /// Consume and return the current token.
    pub fn advance(&mut self) -> Result<SpannedToken, CompileError> {
        let token = self
            .tokens
            .pop_front()
            .ok_or_else(|| self.end_of_input("a token"))?;
        self.last_span = token.span.clone();
        Ok(token)
    }

    /// Lexical class of the current, not yet consumed token.
    pub fn classify(&self) -> Option<TokenKind> {
        self.peek().map(Token::kind)
    }

    /// The current token, if any.
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.front().map(|t| &t.token)
    }

    /// Span of the current token, or of the last consumed one at end of input.
    pub fn current_span(&self) -> Span {
        self.tokens
            .front()
            .map_or_else(|| self.last_span.clone(), |t| t.span.clone())
    }

    pub fn as_keyword(&self) -> Result<Keyword, CompileError> {
        match self.current("keyword")? {
            Token::Keyword(k) => Ok(*k),
            _ => Err(self.mismatch("keyword")),
        }
    }

    pub fn as_symbol(&self) -> Result<char, CompileError> {
        match self.current("symbol")? {
            Token::Symbol(c) => Ok(*c),
            _ => Err(self.mismatch("symbol")),
        }
    }

    pub fn as_identifier(&self) -> Result<&str, CompileError> {
        match self.current("identifier")? {
            Token::Identifier(name) => Ok(name),
            _ => Err(self.mismatch("identifier")),
        }
    }

    pub fn as_int(&self) -> Result<u16, CompileError> {
        match self.current("integer constant")? {
            Token::IntegerConstant(n) => Ok(*n),
            _ => Err(self.mismatch("integer constant")),
        }
    }

    pub fn as_string(&self) -> Result<&str, CompileError> {
        match self.current("string constant")? {
            Token::StringConstant(s) => Ok(s),
            _ => Err(self.mismatch("string constant")),
        }
    }

    /// Whether the current token is the given symbol.
    pub fn check_symbol(&self, symbol: char) -> bool {
        self.peek() == Some(&Token::Symbol(symbol))
    }

    /// Whether the current token is the given keyword.
    pub fn check_keyword(&self, keyword: Keyword) -> bool {
        self.peek() == Some(&Token::Keyword(keyword))
    }

    /// The current token's character if it is a symbol.
    pub fn peek_symbol(&self) -> Option<char> {
        match self.peek() {
            Some(Token::Symbol(c)) => Some(*c),
            _ => None,
        }
    }

    /// Consume the given symbol or fail.
    pub fn expect_symbol(&mut self, symbol: char) -> Result<Span, CompileError> {
        let expected = format!("'{}'", symbol);
        if !self.check_symbol(symbol) {
            return Err(match self.peek() {
                Some(_) => self.mismatch(expected),
                None => self.end_of_input(&expected),
            });
        }
        Ok(self.advance()?.span)
    }

    /// Consume the given keyword or fail.
    pub fn expect_keyword(&mut self, keyword: Keyword) -> Result<Span, CompileError> {
        let expected = format!("keyword '{}'", keyword.as_str());
        if !self.check_keyword(keyword) {
            return Err(match self.peek() {
                Some(_) => self.mismatch(expected),
                None => self.end_of_input(&expected),
            });
        }
        Ok(self.advance()?.span)
    }

    /// Consume an identifier and return its name and span.
    pub fn expect_identifier(&mut self) -> Result<(String, Span), CompileError> {
        self.as_identifier()?;
        let token = self.advance()?;
        match token.token {
            Token::Identifier(name) => Ok((name, token.span)),
            other => Err(CompileError::unexpected(
                token.span,
                "identifier",
                other.to_string(),
            )),
        }
    }

    /// Build an `UnexpectedToken` error describing the current token.
    pub fn mismatch(&self, expected: impl Into<String>) -> CompileError {
        let found = self
            .peek()
            .map_or_else(|| "end of file".to_string(), Token::to_string);
        CompileError::unexpected(self.current_span(), expected, found)
    }

    fn current(&self, expected: &str) -> Result<&Token, CompileError> {
        self.peek().ok_or_else(|| self.end_of_input(expected))
    }

    /// Build a `Lexical` error for running out of tokens.
    pub fn end_of_input(&self, expected: &str) -> CompileError {
        CompileError::lexical(
            self.last_span.clone(),
            format!("unexpected end of input, expected {}", expected),
        )
    }
}
