//! Lexical analyzer (tokenizer) for the Jack language.
//!
//! Scanning stops at the first malformed character; the compiler performs no
//! error recovery, so a partial token list would never be used.

use crate::error::CompileError;
use crate::token::{Keyword, Span, SpannedToken, Token, is_symbol};

/// Largest value a Jack integer constant may take.
pub const MAX_INT_CONSTANT: u32 = 32767;

/// Jack language tokenizer.
pub struct JackTokenizer {
    chars: Vec<char>,
    pos: usize,
    byte_offset: usize,
    line: usize,
    column: usize,
}

impl JackTokenizer {
    /// Create a new tokenizer for the given input.
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            byte_offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the whole input.
    pub fn tokenize(mut self) -> Result<Vec<SpannedToken>, CompileError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments()?;
            if self.is_at_end() {
                break;
            }
            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    /// Advance to the next character, updating byte offset incrementally.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        self.byte_offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn span_from(&self, start_pos: usize, start_line: usize, start_column: usize) -> Span {
        Span::new(start_pos, self.byte_offset, start_line, start_column)
    }

    /// Skip whitespace and comments.
    fn skip_whitespace_and_comments(&mut self) -> Result<(), CompileError> {
        loop {
            while let Some(c) = self.peek() {
                if c.is_whitespace() {
                    self.advance();
                } else {
                    break;
                }
            }

            if self.peek() != Some('/') {
                return Ok(());
            }

            match self.peek_next() {
                Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('*') => {
                    let (start_pos, start_line, start_column) =
                        (self.byte_offset, self.line, self.column);
                    self.advance(); // /
                    self.advance(); // *
                    loop {
                        if self.is_at_end() {
                            return Err(CompileError::lexical(
                                self.span_from(start_pos, start_line, start_column),
                                "unterminated block comment",
                            ));
                        }
                        if self.peek() == Some('*') && self.peek_next() == Some('/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Scan the next token; the cursor sits on a non-whitespace character.
    fn next_token(&mut self) -> Result<SpannedToken, CompileError> {
        let start_pos = self.byte_offset;
        let start_line = self.line;
        let start_column = self.column;

        let Some(c) = self.peek() else {
            return Err(CompileError::lexical(
                self.span_from(start_pos, start_line, start_column),
                "unexpected end of input",
            ));
        };

        if is_symbol(c) {
            self.advance();
            let span = self.span_from(start_pos, start_line, start_column);
            return Ok(SpannedToken::new(Token::Symbol(c), span));
        }

        if c.is_ascii_digit() {
            return self.read_integer(start_pos, start_line, start_column);
        }

        if c == '"' {
            return self.read_string(start_pos, start_line, start_column);
        }

        if c.is_ascii_alphabetic() || c == '_' {
            return Ok(self.read_identifier(start_pos, start_line, start_column));
        }

        self.advance();
        Err(CompileError::lexical(
            self.span_from(start_pos, start_line, start_column),
            format!("unexpected character '{}'", c),
        ))
    }

    fn read_integer(
        &mut self,
        start_pos: usize,
        start_line: usize,
        start_column: usize,
    ) -> Result<SpannedToken, CompileError> {
        let mut value: u32 = 0;

        while let Some(digit) = self.peek().and_then(|c| c.to_digit(10)) {
            self.advance();
            value = value.saturating_mul(10).saturating_add(digit);
        }

        let span = self.span_from(start_pos, start_line, start_column);

        match u16::try_from(value) {
            Ok(n) if value <= MAX_INT_CONSTANT => {
                Ok(SpannedToken::new(Token::IntegerConstant(n), span))
            }
            _ => Err(CompileError::lexical(
                span,
                format!(
                    "integer constant {} exceeds maximum value {}",
                    value, MAX_INT_CONSTANT
                ),
            )),
        }
    }

    fn read_string(
        &mut self,
        start_pos: usize,
        start_line: usize,
        start_column: usize,
    ) -> Result<SpannedToken, CompileError> {
        self.advance(); // Opening quote

        let mut value = String::new();

        loop {
            match self.peek() {
                Some('"') => {
                    self.advance();
                    let span = self.span_from(start_pos, start_line, start_column);
                    return Ok(SpannedToken::new(Token::StringConstant(value), span));
                }
                None | Some('\n') => {
                    return Err(CompileError::lexical(
                        self.span_from(start_pos, start_line, start_column),
                        "unterminated string constant",
                    ));
                }
                Some(c) if !c.is_ascii() => {
                    return Err(CompileError::lexical(
                        self.span_from(start_pos, start_line, start_column),
                        format!("non-ASCII character '{}' in string constant", c),
                    ));
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
    }

    fn read_identifier(
        &mut self,
        start_pos: usize,
        start_line: usize,
        start_column: usize,
    ) -> SpannedToken {
        let mut value = String::new();

        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                value.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let span = self.span_from(start_pos, start_line, start_column);

        let token = match Keyword::parse_keyword(&value) {
            Some(keyword) => Token::Keyword(keyword),
            None => Token::Identifier(value),
        };

        SpannedToken::new(token, span)
    }
}
