//! Jack One-Pass - single-pass Jack to VM code compiler.
//!
//! Jack source is scanned into tokens and then compiled by a recursive
//! descent engine that emits VM instructions as it recognizes each construct.
//! No syntax tree is built. It supports:
//!
//! - Complete Jack language compilation
//! - Fail-fast error reporting with source locations
//! - Parallel file processing
//!
//! # Usage
//!
//! ```no_run
//! use jack_onepass::{compile_file, compile_directory, compile_file_with_options, CompileOptions, Layout};
//! use std::path::Path;
//!
//! // Compile a single file
//! let result = compile_file(Path::new("Main.jack"));
//!
//! // Compile every .jack file in a directory
//! let results = compile_directory(Path::new("Square/"));
//!
//! // Compile without indentation
//! let options = CompileOptions { layout: Layout::Flat };
//! let result = compile_file_with_options(Path::new("Main.jack"), options);
//! ```

pub mod engine;
pub mod error;
pub mod instruction;
pub mod labels;
pub mod symbol_table;
pub mod token;
pub mod token_stream;
pub mod tokenizer;
pub mod vm_writer;

use rayon::prelude::*;
use std::fs;
use std::path::Path;

// Re-export key types
pub use engine::CompiledClass;
pub use error::{CompileError, Diagnostic};
pub use instruction::{ArithmeticOp, Instruction, Segment};
pub use symbol_table::{Symbol, SymbolKind, SymbolTable, Type};
pub use token::{Keyword, Span, SpannedToken, Token, TokenKind};
pub use token_stream::TokenStream;
pub use tokenizer::JackTokenizer;
pub use vm_writer::{Layout, VMWriter};

/// Result of compiling a single Jack file.
#[derive(Debug)]
pub struct CompileResult {
    /// The filename that was compiled, without extension.
    pub filename: String,
    /// The Jack source, kept for diagnostics.
    pub source: String,
    /// The generated VM code (empty if compilation failed).
    pub vm_code: String,
    /// The error that stopped compilation, if any.
    pub error: Option<CompileError>,
}

impl CompileResult {
    /// Check if the compilation was successful.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Render the error, if any, with the offending source line.
    pub fn diagnostic(&self) -> Option<String> {
        self.error.as_ref().map(|err| {
            Diagnostic::new(err)
                .with_source(&self.source)
                .with_filename(&self.filename)
                .to_string()
        })
    }
}

/// Compilation options.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// Layout of the rendered VM code (default: indented).
    pub layout: Layout,
}

/// Compile a token sequence holding exactly one class.
pub fn compile_tokens(tokens: Vec<SpannedToken>) -> Result<CompiledClass, CompileError> {
    engine::compile(TokenStream::new(tokens))
}

/// Compile a single Jack file.
pub fn compile_file(path: &Path) -> CompileResult {
    compile_file_with_options(path, CompileOptions::default())
}

/// Compile a single Jack file with custom options.
pub fn compile_file_with_options(path: &Path, options: CompileOptions) -> CompileResult {
    let filename = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();

    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            return CompileResult {
                filename,
                source: String::new(),
                vm_code: String::new(),
                error: Some(CompileError::io(path, e)),
            };
        }
    };

    compile_owned_source(source, filename, options)
}

/// Compile Jack source code directly.
pub fn compile_source(source: &str, filename: &str) -> CompileResult {
    compile_source_with_options(source, filename, CompileOptions::default())
}

/// Compile Jack source code with custom options.
pub fn compile_source_with_options(
    source: &str,
    filename: &str,
    options: CompileOptions,
) -> CompileResult {
    compile_owned_source(source.to_string(), filename.to_string(), options)
}

fn compile_owned_source(source: String, filename: String, options: CompileOptions) -> CompileResult {
    let compiled = JackTokenizer::new(&source)
        .tokenize()
        .and_then(compile_tokens);

    match compiled {
        Ok(class) => {
            log::debug!(
                "compiled {} (class {}): {} instructions",
                filename,
                class.name,
                class.instructions.len()
            );
            CompileResult {
                vm_code: class.to_vm_code(options.layout),
                filename,
                source,
                error: None,
            }
        }
        Err(err) => {
            log::debug!("failed to compile {}: {}", filename, err);
            CompileResult {
                filename,
                source,
                vm_code: String::new(),
                error: Some(err),
            }
        }
    }
}

/// Compile all Jack files in a directory.
pub fn compile_directory(dir: &Path) -> Vec<CompileResult> {
    compile_directory_with_options(dir, CompileOptions::default())
}

/// Compile all Jack files in a directory with custom options.
///
/// Files are independent units, so they compile in parallel. Results come
/// back sorted by filename.
pub fn compile_directory_with_options(dir: &Path, options: CompileOptions) -> Vec<CompileResult> {
    let jack_files: Vec<_> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "jack"))
            .collect(),
        Err(e) => {
            return vec![CompileResult {
                filename: dir.to_string_lossy().to_string(),
                source: String::new(),
                vm_code: String::new(),
                error: Some(CompileError::io(dir, e)),
            }];
        }
    };

    log::debug!("found {} .jack files in {}", jack_files.len(), dir.display());

    let mut results: Vec<CompileResult> = jack_files
        .par_iter()
        .map(|path| compile_file_with_options(path, options))
        .collect();
    results.sort_by(|a, b| a.filename.cmp(&b.filename));
    results
}

/// Write a compile result to `<output_dir>/<filename>.vm`.
pub fn write_result(result: &CompileResult, output_dir: &Path) -> Result<(), CompileError> {
    let vm_path = output_dir.join(format!("{}.vm", result.filename));
    fs::write(&vm_path, &result.vm_code).map_err(|e| CompileError::io(&vm_path, e))
}
