//! Single-pass compilation engine.
//!
//! Each grammar rule is one `compile_*` method that consumes tokens, records
//! declarations in the symbol table and emits VM instructions as soon as the
//! construct is recognized. There is no syntax tree and no second pass.
//!
//! Binary operators have no precedence: `a + b * c` is `(a + b) * c`.

use crate::error::CompileError;
use crate::instruction::{ArithmeticOp, Instruction, Segment};
use crate::labels::{LabelAllocator, LabelContext};
use crate::symbol_table::{Symbol, SymbolKind, SymbolTable, Type};
use crate::token::{Keyword, Span, TokenKind};
use crate::token_stream::TokenStream;
use crate::vm_writer::{Layout, VMWriter, render};

/// Maximum nesting of blocks and terms before compilation bails out.
/// Prevents stack overflow on pathological input (e.g., `(((((...)))))` or
/// hundreds of nested `while` blocks). Each `{...}` block, parenthesis, unary
/// operator or call argument list costs one level.
const MAX_DEPTH: usize = 64;

/// VM code for one compiled class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledClass {
    pub name: String,
    pub instructions: Vec<Instruction>,
}

impl CompiledClass {
    pub fn to_vm_code(&self, layout: Layout) -> String {
        render(&self.instructions, layout)
    }
}

/// What an identifier occurrence denotes, resolved once from the symbol
/// table and the token that follows it.
#[derive(Debug, Clone, PartialEq)]
enum IdentifierRole {
    /// Argument or local variable.
    LocalVar(Symbol),
    /// Static or field variable.
    FieldVar(Symbol),
    /// Undeclared name in front of `.`: a class whose function is called.
    ClassQualifier,
    /// `name(...)`: a method invoked on the current object.
    ImplicitReceiverCall,
}

impl IdentifierRole {
    fn into_variable(self) -> Option<Symbol> {
        match self {
            IdentifierRole::LocalVar(symbol) | IdentifierRole::FieldVar(symbol) => Some(symbol),
            IdentifierRole::ClassQualifier | IdentifierRole::ImplicitReceiverCall => None,
        }
    }
}

/// Binary operators and the code each one compiles to.
#[derive(Debug, Clone, Copy)]
enum BinaryOp {
    Arithmetic(ArithmeticOp),
    Call(&'static str, &'static str),
}

impl BinaryOp {
    fn from_symbol(symbol: char) -> Option<Self> {
        let op = match symbol {
            '+' => BinaryOp::Arithmetic(ArithmeticOp::Add),
            '-' => BinaryOp::Arithmetic(ArithmeticOp::Sub),
            '*' => BinaryOp::Call("Math", "multiply"),
            '/' => BinaryOp::Call("Math", "divide"),
            '&' => BinaryOp::Arithmetic(ArithmeticOp::And),
            '|' => BinaryOp::Arithmetic(ArithmeticOp::Or),
            '<' => BinaryOp::Arithmetic(ArithmeticOp::Lt),
            '>' => BinaryOp::Arithmetic(ArithmeticOp::Gt),
            '=' => BinaryOp::Arithmetic(ArithmeticOp::Eq),
            _ => return None,
        };
        Some(op)
    }
}

/// Compile the tokens of one class into VM instructions.
///
/// Fails on the first malformed token; no partial output is returned.
pub fn compile(mut tokens: TokenStream) -> Result<CompiledClass, CompileError> {
    tokens.expect_keyword(Keyword::Class)?;
    let (class_name, _) = tokens.expect_identifier()?;

    let mut engine = CompilationEngine {
        tokens,
        symbols: SymbolTable::new(),
        labels: LabelAllocator::new(&class_name),
        vm: VMWriter::new(),
        class_name,
        depth: 0,
    };
    engine.compile_class_body()?;

    Ok(CompiledClass {
        name: engine.class_name,
        instructions: engine.vm.into_instructions(),
    })
}

/// Recursive descent compiler for one class.
///
/// Owns the per-class symbol table, label allocator and writer; none of
/// them outlive the class.
struct CompilationEngine {
    tokens: TokenStream,
    symbols: SymbolTable,
    labels: LabelAllocator,
    vm: VMWriter,
    class_name: String,
    depth: usize,
}

impl CompilationEngine {
    // ========================================================================
    // Program structure
    // ========================================================================

    /// '{' classVarDec* subroutineDec* '}', with nothing after it.
    fn compile_class_body(&mut self) -> Result<(), CompileError> {
        self.tokens.expect_symbol('{')?;

        while self.tokens.check_keyword(Keyword::Static) || self.tokens.check_keyword(Keyword::Field)
        {
            self.compile_class_var_dec()?;
        }

        while self.tokens.check_keyword(Keyword::Constructor)
            || self.tokens.check_keyword(Keyword::Function)
            || self.tokens.check_keyword(Keyword::Method)
        {
            self.compile_subroutine()?;
        }

        self.tokens.expect_symbol('}')?;

        if let Some(token) = self.tokens.peek() {
            return Err(CompileError::trailing(
                self.tokens.current_span(),
                token.to_string(),
            ));
        }
        Ok(())
    }

    /// ('static' | 'field') type varName (',' varName)* ';'
    fn compile_class_var_dec(&mut self) -> Result<(), CompileError> {
        let kind = match self.tokens.as_keyword()? {
            Keyword::Static => SymbolKind::Static,
            Keyword::Field => SymbolKind::Field,
            _ => return Err(self.tokens.mismatch("'static' or 'field'")),
        };
        self.tokens.advance()?;

        let var_type = self.compile_type()?;
        self.compile_var_names(var_type, kind)?;
        self.tokens.expect_symbol(';')?;
        Ok(())
    }

    /// 'int' | 'char' | 'boolean' | className
    fn compile_type(&mut self) -> Result<Type, CompileError> {
        match self.tokens.classify() {
            Some(TokenKind::Keyword) => {
                let var_type = match self.tokens.as_keyword()? {
                    Keyword::Int => Type::Int,
                    Keyword::Char => Type::Char,
                    Keyword::Boolean => Type::Boolean,
                    _ => return Err(self.tokens.mismatch("type")),
                };
                self.tokens.advance()?;
                Ok(var_type)
            }
            Some(TokenKind::Identifier) => {
                let (name, _) = self.tokens.expect_identifier()?;
                Ok(Type::ClassName(name))
            }
            Some(_) => Err(self.tokens.mismatch("type")),
            None => Err(self.tokens.end_of_input("type")),
        }
    }

    /// varName (',' varName)*, each defined with the same type and kind.
    fn compile_var_names(&mut self, var_type: Type, kind: SymbolKind) -> Result<(), CompileError> {
        loop {
            let (name, span) = self.tokens.expect_identifier()?;
            self.symbols.define(&name, var_type.clone(), kind, span)?;

            if !self.tokens.check_symbol(',') {
                return Ok(());
            }
            self.tokens.advance()?;
        }
    }

    /// ('constructor' | 'function' | 'method') ('void' | type) subroutineName
    /// '(' parameterList ')' subroutineBody
    fn compile_subroutine(&mut self) -> Result<(), CompileError> {
        let kind = self.tokens.as_keyword()?;
        self.tokens.advance()?;

        if self.tokens.check_keyword(Keyword::Void) {
            self.tokens.advance()?;
        } else {
            self.compile_type()?;
        }

        let (name, name_span) = self.tokens.expect_identifier()?;
        log::trace!("compiling {} {}.{}", kind.as_str(), self.class_name, name);

        self.symbols.start_subroutine();
        if kind == Keyword::Method {
            self.symbols.define(
                "this",
                Type::ClassName(self.class_name.clone()),
                SymbolKind::Argument,
                name_span,
            )?;
        }

        self.tokens.expect_symbol('(')?;
        self.compile_parameter_list()?;
        self.tokens.expect_symbol(')')?;

        self.tokens.expect_symbol('{')?;
        while self.tokens.check_keyword(Keyword::Var) {
            self.compile_var_dec()?;
        }

        let n_locals = self.symbols.var_count(SymbolKind::Local);
        self.vm.write_function(&self.class_name, &name, n_locals);

        match kind {
            Keyword::Constructor => {
                // One word per field, bound to `this`.
                let field_count = self.symbols.var_count(SymbolKind::Field);
                self.vm.write_push(Segment::Constant, field_count);
                self.vm.write_call("Memory", "alloc", 1);
                self.vm.write_pop(Segment::Pointer, 0);
            }
            Keyword::Method => {
                self.vm.write_push(Segment::Argument, 0);
                self.vm.write_pop(Segment::Pointer, 0);
            }
            _ => {}
        }

        self.compile_statements()?;
        self.tokens.expect_symbol('}')?;
        Ok(())
    }

    /// ((type varName) (',' type varName)*)?
    fn compile_parameter_list(&mut self) -> Result<(), CompileError> {
        if self.tokens.check_symbol(')') {
            return Ok(());
        }

        loop {
            let var_type = self.compile_type()?;
            let (name, span) = self.tokens.expect_identifier()?;
            self.symbols
                .define(&name, var_type, SymbolKind::Argument, span)?;

            if !self.tokens.check_symbol(',') {
                return Ok(());
            }
            self.tokens.advance()?;
        }
    }

    /// 'var' type varName (',' varName)* ';'
    fn compile_var_dec(&mut self) -> Result<(), CompileError> {
        self.tokens.expect_keyword(Keyword::Var)?;
        let var_type = self.compile_type()?;
        self.compile_var_names(var_type, SymbolKind::Local)?;
        self.tokens.expect_symbol(';')?;
        Ok(())
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// statement*, up to (not including) the closing '}'.
    fn compile_statements(&mut self) -> Result<(), CompileError> {
        loop {
            match self.tokens.classify() {
                Some(TokenKind::Symbol) if self.tokens.check_symbol('}') => return Ok(()),
                Some(TokenKind::Keyword) => match self.tokens.as_keyword()? {
                    Keyword::Let => self.compile_let()?,
                    Keyword::If => self.compile_if()?,
                    Keyword::While => self.compile_while()?,
                    Keyword::Do => self.compile_do()?,
                    Keyword::Return => self.compile_return()?,
                    other => {
                        return Err(CompileError::parse(
                            self.tokens.current_span(),
                            format!("'{}' cannot start a statement", other.as_str()),
                        ));
                    }
                },
                Some(_) => return Err(self.tokens.mismatch("statement or '}'")),
                None => return Err(self.tokens.end_of_input("statement or '}'")),
            }
        }
    }

    /// 'let' varName ('[' expression ']')? '=' expression ';'
    fn compile_let(&mut self) -> Result<(), CompileError> {
        self.tokens.expect_keyword(Keyword::Let)?;
        let (name, span) = self.tokens.expect_identifier()?;
        let symbol = self.resolve_variable(&name, span)?;

        if self.tokens.check_symbol('[') {
            self.tokens.advance()?;
            self.compile_expression()?;
            self.tokens.expect_symbol(']')?;
            self.push_symbol(&symbol);
            self.vm.write_arithmetic(ArithmeticOp::Add);

            self.tokens.expect_symbol('=')?;
            self.compile_expression()?;
            self.tokens.expect_symbol(';')?;

            // Value to temp 0 so the element address beneath it lands in THAT.
            self.vm.write_pop(Segment::Temp, 0);
            self.vm.write_pop(Segment::Pointer, 1);
            self.vm.write_push(Segment::Temp, 0);
            self.vm.write_pop(Segment::That, 0);
        } else {
            self.tokens.expect_symbol('=')?;
            self.compile_expression()?;
            self.tokens.expect_symbol(';')?;
            self.vm.write_pop(symbol.segment(), symbol.index);
        }
        Ok(())
    }

    /// 'if' '(' expression ')' '{' statements '}' ('else' '{' statements '}')?
    fn compile_if(&mut self) -> Result<(), CompileError> {
        self.tokens.expect_keyword(Keyword::If)?;
        let labels = self.labels.new_label_pair(LabelContext::Branch);

        self.tokens.expect_symbol('(')?;
        self.compile_expression()?;
        self.tokens.expect_symbol(')')?;

        self.vm.write_if_goto(&labels.start);
        self.vm.write_goto(&labels.end);
        self.vm.write_label(&labels.start);

        self.compile_block()?;

        if self.tokens.check_keyword(Keyword::Else) {
            self.tokens.advance()?;
            let join = labels.join();
            self.vm.write_goto(&join);
            self.vm.write_label(&labels.end);
            self.compile_block()?;
            self.vm.write_label(&join);
        } else {
            self.vm.write_label(&labels.end);
        }
        Ok(())
    }

    /// 'while' '(' expression ')' '{' statements '}'
    fn compile_while(&mut self) -> Result<(), CompileError> {
        self.tokens.expect_keyword(Keyword::While)?;
        let labels = self.labels.new_label_pair(LabelContext::Loop);

        self.vm.write_label(&labels.start);
        self.tokens.expect_symbol('(')?;
        self.compile_expression()?;
        self.tokens.expect_symbol(')')?;
        self.vm.write_arithmetic(ArithmeticOp::Not);
        self.vm.write_if_goto(&labels.end);

        self.compile_block()?;

        self.vm.write_goto(&labels.start);
        self.vm.write_label(&labels.end);
        Ok(())
    }

    /// 'do' subroutineCall ';'
    fn compile_do(&mut self) -> Result<(), CompileError> {
        self.tokens.expect_keyword(Keyword::Do)?;
        let (name, span) = self.tokens.expect_identifier()?;
        let role = self.resolve_identifier(&name);
        self.compile_call(name, span, role)?;
        self.tokens.expect_symbol(';')?;

        // Every call leaves a value; a statement call discards it.
        self.vm.write_pop(Segment::Temp, 0);
        Ok(())
    }

    /// 'return' expression? ';'
    fn compile_return(&mut self) -> Result<(), CompileError> {
        self.tokens.expect_keyword(Keyword::Return)?;

        if self.tokens.check_symbol(';') {
            self.vm.write_push(Segment::Constant, 0);
        } else {
            self.compile_expression()?;
        }
        self.tokens.expect_symbol(';')?;

        self.vm.write_return();
        Ok(())
    }

    /// '{' statements '}'
    fn compile_block(&mut self) -> Result<(), CompileError> {
        self.descend()?;
        let result = self.compile_block_inner();
        self.depth -= 1;
        result
    }

    fn compile_block_inner(&mut self) -> Result<(), CompileError> {
        self.tokens.expect_symbol('{')?;
        self.compile_statements()?;
        self.tokens.expect_symbol('}')?;
        Ok(())
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// term (op term)*, folded strictly left to right.
    fn compile_expression(&mut self) -> Result<(), CompileError> {
        self.compile_term()?;

        while let Some(op) = self.tokens.peek_symbol().and_then(BinaryOp::from_symbol) {
            self.tokens.advance()?;
            self.compile_term()?;
            match op {
                BinaryOp::Arithmetic(op) => self.vm.write_arithmetic(op),
                BinaryOp::Call(class, function) => self.vm.write_call(class, function, 2),
            }
        }
        Ok(())
    }

    fn compile_term(&mut self) -> Result<(), CompileError> {
        self.descend()?;
        let result = self.compile_term_inner();
        self.depth -= 1;
        result
    }

    fn compile_term_inner(&mut self) -> Result<(), CompileError> {
        match self.tokens.classify() {
            Some(TokenKind::IntLiteral) => {
                let value = self.tokens.as_int()?;
                self.tokens.advance()?;
                self.vm.write_push(Segment::Constant, value);
            }

            Some(TokenKind::StringLiteral) => {
                let value = self.tokens.as_string()?.to_string();
                let span = self.tokens.advance()?.span;
                self.compile_string_constant(&value, span)?;
            }

            Some(TokenKind::Keyword) => {
                match self.tokens.as_keyword()? {
                    Keyword::This => self.vm.write_push(Segment::Pointer, 0),
                    Keyword::True => {
                        // true is all bits set: ~0
                        self.vm.write_push(Segment::Constant, 0);
                        self.vm.write_arithmetic(ArithmeticOp::Not);
                    }
                    Keyword::False | Keyword::Null => self.vm.write_push(Segment::Constant, 0),
                    _ => return Err(self.tokens.mismatch("term")),
                }
                self.tokens.advance()?;
            }

            Some(TokenKind::Symbol) => match self.tokens.as_symbol()? {
                '(' => {
                    self.tokens.advance()?;
                    self.compile_expression()?;
                    self.tokens.expect_symbol(')')?;
                }
                '-' => {
                    self.tokens.advance()?;
                    self.compile_term()?;
                    self.vm.write_arithmetic(ArithmeticOp::Neg);
                }
                '~' => {
                    self.tokens.advance()?;
                    self.compile_term()?;
                    self.vm.write_arithmetic(ArithmeticOp::Not);
                }
                _ => return Err(self.tokens.mismatch("term")),
            },

            Some(TokenKind::Identifier) => {
                let (name, span) = self.tokens.expect_identifier()?;
                self.compile_identifier_term(name, span)?;
            }

            None => return Err(self.tokens.end_of_input("term")),
        }
        Ok(())
    }

    /// varName | varName '[' expression ']' | subroutineCall
    fn compile_identifier_term(&mut self, name: String, span: Span) -> Result<(), CompileError> {
        let role = self.resolve_identifier(&name);

        match self.tokens.peek_symbol() {
            Some('.' | '(') => self.compile_call(name, span, role),
            Some('[') => {
                let symbol = role
                    .into_variable()
                    .ok_or_else(|| CompileError::undefined_variable(&name, span))?;
                self.tokens.advance()?;
                self.push_symbol(&symbol);
                self.compile_expression()?;
                self.tokens.expect_symbol(']')?;
                self.vm.write_arithmetic(ArithmeticOp::Add);
                self.vm.write_pop(Segment::Pointer, 1);
                self.vm.write_push(Segment::That, 0);
                Ok(())
            }
            _ => {
                let symbol = role
                    .into_variable()
                    .ok_or_else(|| CompileError::undefined_variable(&name, span))?;
                self.push_symbol(&symbol);
                Ok(())
            }
        }
    }

    /// subroutineName '(' expressionList ')'
    /// | (className | varName) '.' subroutineName '(' expressionList ')'
    ///
    /// `name` has been consumed; `role` says how it resolved.
    fn compile_call(
        &mut self,
        name: String,
        span: Span,
        role: IdentifierRole,
    ) -> Result<(), CompileError> {
        let (class, function, receivers) = match role {
            IdentifierRole::ImplicitReceiverCall => {
                self.vm.write_push(Segment::Pointer, 0);
                (self.class_name.clone(), name, 1)
            }
            IdentifierRole::LocalVar(symbol) | IdentifierRole::FieldVar(symbol) => {
                self.tokens.expect_symbol('.')?;
                let (function, _) = self.tokens.expect_identifier()?;
                self.push_symbol(&symbol);
                (symbol.symbol_type.name().to_string(), function, 1)
            }
            IdentifierRole::ClassQualifier => {
                if !self.tokens.check_symbol('.') {
                    // A bare undeclared name where a call must start.
                    return Err(match self.tokens.peek() {
                        Some(_) => self.tokens.mismatch("'.' or '('"),
                        None => self.tokens.end_of_input("'.' or '('"),
                    });
                }
                self.tokens.advance()?;
                let (function, _) = self.tokens.expect_identifier()?;
                (name, function, 0)
            }
        };

        self.tokens.expect_symbol('(')?;
        let n_args = self.compile_expression_list()?;
        self.tokens.expect_symbol(')')?;

        let n_args = n_args
            .checked_add(receivers)
            .ok_or_else(|| CompileError::parse(span, "too many arguments in call"))?;
        self.vm.write_call(&class, &function, n_args);
        Ok(())
    }

    /// (expression (',' expression)*)?, returning how many were compiled.
    fn compile_expression_list(&mut self) -> Result<u16, CompileError> {
        if self.tokens.check_symbol(')') {
            return Ok(0);
        }

        let mut count: u16 = 0;
        loop {
            let span = self.tokens.current_span();
            self.compile_expression()?;
            count = count
                .checked_add(1)
                .ok_or_else(|| CompileError::parse(span, "too many arguments in call"))?;

            if !self.tokens.check_symbol(',') {
                return Ok(count);
            }
            self.tokens.advance()?;
        }
    }

    fn compile_string_constant(&mut self, value: &str, span: Span) -> Result<(), CompileError> {
        let len = u16::try_from(value.len())
            .map_err(|_| CompileError::parse(span, "string constant is too long"))?;
        self.vm.write_push(Segment::Constant, len);
        self.vm.write_call("String", "new", 1);

        // The scanner only admits ASCII, so each byte is one character.
        for byte in value.bytes() {
            self.vm.write_push(Segment::Constant, u16::from(byte));
            self.vm.write_call("String", "appendChar", 2);
        }
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Decide the role of an identifier that was just consumed.
    fn resolve_identifier(&self, name: &str) -> IdentifierRole {
        if self.tokens.check_symbol('(') {
            return IdentifierRole::ImplicitReceiverCall;
        }
        match self.symbols.lookup(name) {
            Some(symbol) if symbol.kind.is_class_level() => IdentifierRole::FieldVar(symbol.clone()),
            Some(symbol) => IdentifierRole::LocalVar(symbol.clone()),
            None => IdentifierRole::ClassQualifier,
        }
    }

    fn resolve_variable(&self, name: &str, span: Span) -> Result<Symbol, CompileError> {
        self.symbols
            .lookup(name)
            .cloned()
            .ok_or_else(|| CompileError::undefined_variable(name, span))
    }

    #[inline]
    fn push_symbol(&mut self, symbol: &Symbol) {
        self.vm.write_push(symbol.segment(), symbol.index);
    }

    fn descend(&mut self) -> Result<(), CompileError> {
        if self.depth >= MAX_DEPTH {
            return Err(CompileError::parse(
                self.tokens.current_span(),
                format!("nesting exceeds {} levels", MAX_DEPTH),
            ));
        }
        self.depth += 1;
        Ok(())
    }
}
