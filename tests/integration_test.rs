//! Integration tests for the single-pass Jack compiler.
//!
//! Exercises the public API end to end: exact instruction sequences for the
//! calling convention, literals and expressions, whole programs, directory
//! batches and error reporting.

use jack_onepass::{
    CompileError, CompileOptions, Layout, compile_directory, compile_file, compile_source,
    compile_source_with_options, compile_tokens, write_result, JackTokenizer,
};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

/// Compile source that must succeed and return its flat VM lines.
fn compile_ok(source: &str) -> Vec<String> {
    let result = compile_source_with_options(
        source,
        "Test",
        CompileOptions {
            layout: Layout::Flat,
        },
    );
    assert!(
        result.is_ok(),
        "Compilation failed: {:?}",
        result.error
    );
    result.vm_code.lines().map(str::to_string).collect()
}

/// Compile source that must fail and return the error.
fn compile_err(source: &str) -> CompileError {
    let result = compile_source(source, "Test");
    assert!(result.vm_code.is_empty(), "Failed unit must not produce code");
    result.error.expect("compilation should fail")
}

/// Wrap statements in a `Main.main` function with the given locals.
fn main_with(locals: &str, statements: &str) -> String {
    format!(
        "class Main {{\n    function void main() {{\n        {}\n        {}\n        return;\n    }}\n}}\n",
        locals, statements
    )
}

// =============================================================================
// Calling convention
// =============================================================================

#[test]
fn test_method_getter() {
    let source = r#"
class Point {
    field int x, y;

    method int getX() {
        return x;
    }
}
"#;
    assert_eq!(
        compile_ok(source),
        vec![
            "function Point.getX 0",
            "push argument 0",
            "pop pointer 0",
            "push this 0",
            "return",
        ]
    );
}

#[test]
fn test_constructor_allocates_every_field() {
    let source = r#"
class Square {
    field int x, y;
    field int size;
    static boolean drawn;

    constructor Square new(int ax, int ay, int asize) {
        let x = ax;
        let y = ay;
        let size = asize;
        return this;
    }
}
"#;
    let lines = compile_ok(source);
    assert_eq!(
        lines[..4],
        [
            "function Square.new 0",
            "push constant 3",
            "call Memory.alloc 1",
            "pop pointer 0",
        ]
    );
    assert_eq!(lines[lines.len() - 2..], ["push pointer 0", "return"]);
}

#[test]
fn test_function_counts_locals() {
    let source = main_with("var int a, b; var Array c;", "let c = a;");
    let lines = compile_ok(&source);
    assert_eq!(lines[0], "function Main.main 3");
}

// =============================================================================
// Literals and expressions
// =============================================================================

#[test]
fn test_string_literal_statement() {
    let lines = compile_ok(&main_with("", "do Output.printString(\"Hi\");"));
    assert_eq!(
        lines[1..lines.len() - 2],
        [
            "push constant 2",
            "call String.new 1",
            "push constant 72",
            "call String.appendChar 2",
            "push constant 105",
            "call String.appendChar 2",
            "call Output.printString 1",
            "pop temp 0",
        ]
    );
}

#[test]
fn test_empty_string_literal() {
    let lines = compile_ok(&main_with("", "do Output.printString(\"\");"));
    assert_eq!(
        lines[1..4],
        ["push constant 0", "call String.new 1", "call Output.printString 1"]
    );
}

#[test]
fn test_expression_associativity() {
    let lines = compile_ok(&main_with("var int x;", "let x = 1 + 2 - 3;"));
    assert_eq!(
        lines[1..lines.len() - 2],
        [
            "push constant 1",
            "push constant 2",
            "add",
            "push constant 3",
            "sub",
            "pop local 0",
        ]
    );
}

#[test]
fn test_boolean_constants() {
    let lines = compile_ok(&main_with("var boolean b;", "let b = true;"));
    assert_eq!(
        lines[1..lines.len() - 2],
        ["push constant 0", "not", "pop local 0"]
    );

    let lines = compile_ok(&main_with("var boolean b;", "let b = false;"));
    assert_eq!(lines[1..lines.len() - 2], ["push constant 0", "pop local 0"]);
}

#[test]
fn test_array_read_and_write() {
    let lines = compile_ok(&main_with(
        "var Array a; var int i, v;",
        "let a[i] = v; let v = a[i];",
    ));
    assert_eq!(
        lines[1..lines.len() - 2],
        [
            // write
            "push local 1",
            "push local 0",
            "add",
            "push local 2",
            "pop temp 0",
            "pop pointer 1",
            "push temp 0",
            "pop that 0",
            // read
            "push local 0",
            "push local 1",
            "add",
            "pop pointer 1",
            "push that 0",
            "pop local 2",
        ]
    );
}

// =============================================================================
// Whole programs
// =============================================================================

#[test]
fn test_seven() {
    let source = r#"
class Main {
    function void main() {
        do Output.printInt(1 + (2 * 3));
        return;
    }
}
"#;
    assert_eq!(
        compile_ok(source),
        vec![
            "function Main.main 0",
            "push constant 1",
            "push constant 2",
            "push constant 3",
            "call Math.multiply 2",
            "add",
            "call Output.printInt 1",
            "pop temp 0",
            "push constant 0",
            "return",
        ]
    );
}

#[test]
fn test_convert_to_bin_control_flow() {
    let source = r#"
class Main {
    function void fillMemory(int address, int length, int value) {
        while (length > 0) {
            do Memory.poke(address, value);
            let length = length - 1;
            let address = address + 1;
        }
        return;
    }

    function int nextMask(int mask) {
        if (mask = 0) {
            return 1;
        } else {
            return mask * 2;
        }
    }
}
"#;
    assert_eq!(
        compile_ok(source),
        vec![
            "function Main.fillMemory 0",
            "label Main_0.start",
            "push argument 1",
            "push constant 0",
            "gt",
            "not",
            "if-goto Main_0.end",
            "push argument 0",
            "push argument 2",
            "call Memory.poke 2",
            "pop temp 0",
            "push argument 1",
            "push constant 1",
            "sub",
            "pop argument 1",
            "push argument 0",
            "push constant 1",
            "add",
            "pop argument 0",
            "goto Main_0.start",
            "label Main_0.end",
            "push constant 0",
            "return",
            "function Main.nextMask 0",
            "push argument 0",
            "push constant 0",
            "eq",
            "if-goto Main_1.true",
            "goto Main_1.end",
            "label Main_1.true",
            "push constant 1",
            "return",
            "goto Main_1.join",
            "label Main_1.end",
            "push argument 0",
            "push constant 2",
            "call Math.multiply 2",
            "return",
            "label Main_1.join",
        ]
    );
}

#[test]
fn test_square_game_dispatch() {
    let source = r#"
class SquareGame {
    field Square square;
    field int direction;

    constructor SquareGame new() {
        let square = Square.new(0, 0, 30);
        let direction = 0;
        return this;
    }

    method void dispose() {
        do square.dispose();
        do Memory.deAlloc(this);
        return;
    }

    method void moveSquare() {
        if (direction = 1) { do square.moveUp(); }
        do Sys.wait(5);
        return;
    }

    method void run() {
        do moveSquare();
        return;
    }
}
"#;
    let lines = compile_ok(source);
    let text = lines.join("\n");

    assert!(text.contains("push constant 2\ncall Memory.alloc 1\npop pointer 0"));
    assert!(text.contains(
        "push constant 0\npush constant 0\npush constant 30\ncall Square.new 3\npop this 0"
    ));
    assert!(text.contains("push this 0\ncall Square.dispose 1\npop temp 0"));
    assert!(text.contains("push pointer 0\ncall Memory.deAlloc 1\npop temp 0"));
    assert!(text.contains("push this 0\ncall Square.moveUp 1\npop temp 0"));
    assert!(text.contains("push constant 5\ncall Sys.wait 1\npop temp 0"));
    assert!(text.contains("push pointer 0\ncall SquareGame.moveSquare 1\npop temp 0"));
    assert_eq!(
        lines.iter().filter(|l| l.starts_with("function ")).count(),
        4
    );
}

#[test]
fn test_indented_output() {
    let source = main_with("var int i;", "while (i) { let i = i - 1; }");
    let vm = compile_source(&source, "Main").vm_code;
    for line in vm.lines() {
        let flush_left = line.starts_with("function ") || line.starts_with("label ");
        assert_eq!(flush_left, !line.starts_with('\t'), "line: {:?}", line);
    }
}

#[test]
fn test_idempotence() {
    let source = r#"
class Counter {
    static int total;
    field int n;

    method void bump(int by) {
        while (by > 0) {
            if (n < 100) { let n = n + 1; } else { let total = total + 1; }
            let by = by - 1;
        }
        return;
    }
}
"#;
    let first = compile_source(source, "Counter");
    let second = compile_source(source, "Counter");
    assert!(first.is_ok());
    assert_eq!(first.vm_code, second.vm_code);
}

#[test]
fn test_compile_tokens_matches_source_driver() {
    let source = main_with("var int x;", "let x = 7;");
    let tokens = JackTokenizer::new(&source).tokenize().unwrap();
    let class = compile_tokens(tokens).unwrap();
    assert_eq!(
        class.to_vm_code(Layout::Indented),
        compile_source(&source, "Main").vm_code
    );
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_error_kinds() {
    assert!(matches!(
        compile_err("class Main { function void f() { let x = \"open; } }"),
        CompileError::Lexical { .. }
    ));
    assert!(matches!(
        compile_err("class Main { function void f() { return 1 } }"),
        CompileError::UnexpectedToken { .. }
    ));
    assert!(matches!(
        compile_err("class Main { function void f() { class x; } }"),
        CompileError::Parse { .. }
    ));
    assert!(matches!(
        compile_err("class Main { } }"),
        CompileError::TrailingTokens { .. }
    ));
    assert!(matches!(
        compile_err("class Main { field int a, a; }"),
        CompileError::DuplicateDefinition { .. }
    ));
    assert!(matches!(
        compile_err(&main_with("", "let nothing = 1;")),
        CompileError::UndefinedVariable { .. }
    ));
}

#[test]
fn test_unresolved_qualifier_is_not_an_error() {
    let lines = compile_ok(&main_with("", "do Undeclared.thing();"));
    assert_eq!(lines[1], "call Undeclared.thing 0");
}

#[test]
fn test_error_location() {
    let err = compile_err("class Main {\n  function void f() {\n    return ]\n  }\n}\n");
    let span = err.span().unwrap();
    assert_eq!((span.line, span.column), (3, 12));
}

// =============================================================================
// Files and directories
// =============================================================================

#[test]
fn test_compile_directory_and_write() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("Main.jack"),
        "class Main { function void main() { do Ball.new(); return; } }",
    )
    .unwrap();
    fs::write(
        dir.path().join("Ball.jack"),
        "class Ball { constructor Ball new() { return this; } }",
    )
    .unwrap();
    fs::write(dir.path().join("notes.txt"), "not jack").unwrap();

    let results = compile_directory(dir.path());
    let names: Vec<&str> = results.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(names, vec!["Ball", "Main"]);

    for result in &results {
        assert!(result.is_ok(), "{}: {:?}", result.filename, result.error);
        write_result(result, dir.path()).unwrap();
    }

    let ball = fs::read_to_string(dir.path().join("Ball.vm")).unwrap();
    assert_eq!(
        ball,
        "function Ball.new 0\n\tpush constant 0\n\tcall Memory.alloc 1\n\tpop pointer 0\n\tpush pointer 0\n\treturn\n"
    );
    assert!(dir.path().join("Main.vm").exists());
}

#[test]
fn test_failed_unit_does_not_affect_batch() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("Good.jack"),
        "class Good { function int one() { return 1; } }",
    )
    .unwrap();
    fs::write(
        dir.path().join("Bad.jack"),
        "class Bad { function int one() { return 1 } }",
    )
    .unwrap();

    let results = compile_directory(dir.path());
    assert_eq!(results.len(), 2);
    assert!(!results[0].is_ok());
    assert_eq!(results[0].filename, "Bad");
    assert!(results[1].is_ok());
    assert!(results[1].vm_code.contains("function Good.one 0"));

    let report = results[0].diagnostic().unwrap();
    assert!(report.contains("--> Bad:1:"));
    assert!(report.contains('^'));
}

#[test]
fn test_deep_nesting_fails_only_its_unit() {
    let dir = TempDir::new().unwrap();
    let depth = 5000;
    fs::write(
        dir.path().join("Deep.jack"),
        format!(
            "class Deep {{ function void f() {{ var int i; {}{} return; }} }}",
            "while (i) { ".repeat(depth),
            "} ".repeat(depth)
        ),
    )
    .unwrap();
    fs::write(
        dir.path().join("Good.jack"),
        "class Good { function int one() { return 1; } }",
    )
    .unwrap();

    let results = compile_directory(dir.path());
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].filename, "Deep");
    assert!(matches!(results[0].error, Some(CompileError::Parse { .. })));
    assert!(results[1].is_ok());
}

#[test]
fn test_empty_directory() {
    let dir = TempDir::new().unwrap();
    assert!(compile_directory(dir.path()).is_empty());
}

#[test]
fn test_compile_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Main.jack");
    fs::write(&path, main_with("", "")).unwrap();

    let result = compile_file(&path);
    assert_eq!(result.filename, "Main");
    assert_eq!(
        result.vm_code,
        "function Main.main 0\n\tpush constant 0\n\treturn\n"
    );
}
