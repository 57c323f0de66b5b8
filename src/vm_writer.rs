//! Append-only VM instruction sink.
//!
//! The writer only records instructions in emission order; it never inspects
//! or rewrites what was already written. Rendering to text is a separate step.

use crate::instruction::{ArithmeticOp, Instruction, Segment};
use std::fmt::Write as _;

/// How rendered VM code is laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Layout {
    /// One tab before every line except `label` and `function`.
    #[default]
    Indented,
    /// No indentation at all.
    Flat,
}

/// VM command writer.
#[derive(Debug, Default)]
pub struct VMWriter {
    instructions: Vec<Instruction>,
}

impl VMWriter {
    /// Default initial capacity, in instructions.
    const DEFAULT_CAPACITY: usize = 512;

    /// Create a new VM writer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a new VM writer with specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            instructions: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn write_push(&mut self, segment: Segment, index: u16) {
        self.instructions.push(Instruction::Push(segment, index));
    }

    #[inline]
    pub fn write_pop(&mut self, segment: Segment, index: u16) {
        self.instructions.push(Instruction::Pop(segment, index));
    }

    #[inline]
    pub fn write_arithmetic(&mut self, op: ArithmeticOp) {
        self.instructions.push(Instruction::Arithmetic(op));
    }

    #[inline]
    pub fn write_label(&mut self, label: &str) {
        self.instructions.push(Instruction::Label(label.to_string()));
    }

    #[inline]
    pub fn write_goto(&mut self, label: &str) {
        self.instructions.push(Instruction::Goto(label.to_string()));
    }

    #[inline]
    pub fn write_if_goto(&mut self, label: &str) {
        self.instructions.push(Instruction::IfGoto(label.to_string()));
    }

    /// Write a call to `class.function` with `n_args` arguments on the stack.
    #[inline]
    pub fn write_call(&mut self, class: &str, function: &str, n_args: u16) {
        self.instructions.push(Instruction::Call {
            class: class.to_string(),
            function: function.to_string(),
            n_args,
        });
    }

    /// Write a function declaration.
    #[inline]
    pub fn write_function(&mut self, class: &str, function: &str, n_locals: u16) {
        self.instructions.push(Instruction::Function {
            class: class.to_string(),
            function: function.to_string(),
            n_locals,
        });
    }

    #[inline]
    pub fn write_return(&mut self) {
        self.instructions.push(Instruction::Return);
    }

    /// Instructions written so far, in emission order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Consume the writer and return the recorded instructions.
    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }

    /// Render everything written so far.
    pub fn to_vm_code(&self, layout: Layout) -> String {
        render(&self.instructions, layout)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Render instructions as VM text, one per line.
pub fn render(instructions: &[Instruction], layout: Layout) -> String {
    // Most lines fit in 24 bytes.
    let mut out = String::with_capacity(instructions.len() * 24);
    for instruction in instructions {
        if layout == Layout::Indented && !instruction.is_flush_left() {
            out.push('\t');
        }
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{}", instruction);
    }
    out
}
