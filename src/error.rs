//! Error types and diagnostics for the Jack compiler.
//!
//! Every error except `Io` is fatal for the unit being compiled: the first
//! one raised aborts that unit and no VM code is produced for it.

use crate::token::Span;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while compiling a Jack class.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Malformed input text, or the token stream ran out.
    #[error("Lexical error at {span}: {message}")]
    Lexical { span: Span, message: String },

    /// The current token is not what the active grammar rule requires.
    #[error("Syntax error at {span}: expected {expected}, got {found}")]
    UnexpectedToken {
        span: Span,
        expected: String,
        found: String,
    },

    /// A grammar rule has no alternative for the current token.
    #[error("Parse error at {span}: {message}")]
    Parse { span: Span, message: String },

    /// Tokens remain after the class's closing brace.
    #[error("Trailing tokens at {span}: {found} after end of class")]
    TrailingTokens { span: Span, found: String },

    /// Variable declared twice in the same scope.
    #[error("Duplicate definition of '{name}' at {span}")]
    DuplicateDefinition { name: String, span: Span },

    /// Variable read or assigned without a declaration.
    #[error("Undefined variable '{name}' at {span}")]
    UndefinedVariable { name: String, span: Span },

    /// File I/O error.
    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    /// Create a lexical error.
    pub fn lexical(span: Span, message: impl Into<String>) -> Self {
        Self::Lexical {
            span,
            message: message.into(),
        }
    }

    /// Create an unexpected-token error.
    pub fn unexpected(span: Span, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            span,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(span: Span, message: impl Into<String>) -> Self {
        Self::Parse {
            span,
            message: message.into(),
        }
    }

    /// Create a trailing-tokens error.
    pub fn trailing(span: Span, found: impl Into<String>) -> Self {
        Self::TrailingTokens {
            span,
            found: found.into(),
        }
    }

    /// Create a duplicate definition error.
    pub fn duplicate_definition(name: impl Into<String>, span: Span) -> Self {
        Self::DuplicateDefinition {
            name: name.into(),
            span,
        }
    }

    /// Create an undefined variable error.
    pub fn undefined_variable(name: impl Into<String>, span: Span) -> Self {
        Self::UndefinedVariable {
            name: name.into(),
            span,
        }
    }

    /// Create an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Get the span of this error, if any.
    pub fn span(&self) -> Option<&Span> {
        match self {
            Self::Lexical { span, .. }
            | Self::UnexpectedToken { span, .. }
            | Self::Parse { span, .. }
            | Self::TrailingTokens { span, .. }
            | Self::DuplicateDefinition { span, .. }
            | Self::UndefinedVariable { span, .. } => Some(span),
            Self::Io { .. } => None,
        }
    }
}

/// Diagnostic formatter for rich error output.
pub struct Diagnostic<'a> {
    error: &'a CompileError,
    source: Option<&'a str>,
    filename: Option<&'a str>,
}

impl<'a> Diagnostic<'a> {
    pub fn new(error: &'a CompileError) -> Self {
        Self {
            error,
            source: None,
            filename: None,
        }
    }

    pub fn with_source(mut self, source: &'a str) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_filename(mut self, filename: &'a str) -> Self {
        self.filename = Some(filename);
        self
    }
}

impl fmt::Display for Diagnostic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filename = self.filename.unwrap_or("<input>");

        writeln!(f, "error: {}", self.error)?;

        let Some(span) = self.error.span() else {
            return Ok(());
        };
        writeln!(f, "  --> {}:{}:{}", filename, span.line, span.column)?;

        if let Some(source) = self.source
            && span.line > 0
            && let Some(line) = source.lines().nth(span.line - 1)
        {
            writeln!(f, "   |")?;
            writeln!(f, "{:3} | {}", span.line, line)?;
            writeln!(
                f,
                "   | {:>width$}^",
                "",
                width = span.column.saturating_sub(1)
            )?;
        }

        Ok(())
    }
}
