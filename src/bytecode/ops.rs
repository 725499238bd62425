//! Bytecode opcodes and instructions
//!
//! The intermediate representation the expression compiler emits: a small
//! stack machine with a single per-evaluation is-null flag. Jump targets in
//! unlinked blocks are label references (see `block`); linking rewrites them
//! to absolute addresses.

use std::fmt;

use crate::types::SqlType;

// ============================================================================
// Opcode Definitions
// ============================================================================

/// Expression VM opcode
///
/// The machine is stack-based: value-producing opcodes push onto the operand
/// stack, branch opcodes pop their condition. `P2` of a jump opcode holds the
/// target (a label id before linking, an absolute address after).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // ========================================================================
    // Control Flow
    // ========================================================================
    /// Do nothing (placeholder)
    Noop = 0,

    /// End of program
    Halt,

    /// Unconditional jump to P2
    Goto,

    /// Pop a boolean; jump to P2 if it is true
    If,

    /// Pop a boolean; jump to P2 if it is false
    IfNot,

    /// Jump to P2 if the is-null flag is set (the value stays on the stack)
    IfNull,

    /// Jump to P2 if the is-null flag is clear (the value stays on the stack)
    NotNull,

    // ========================================================================
    // Stack Operations
    // ========================================================================
    // Pushing a constant never touches the is-null flag; operand generators
    // maintain the flag explicitly via SetFlag/StoreFlag/Null.

    /// Push boolean constant P1 (0 or 1)
    Bool,

    /// Push 64-bit integer constant P4
    Int64,

    /// Push real constant P4
    Real,

    /// Push string constant P4
    String8,

    /// Push blob constant P4
    Blob,

    /// Push a NULL placeholder and set the is-null flag
    Null,

    /// Push the value bound to parameter P1 and set the is-null flag from
    /// the binding
    Variable,

    /// Discard the top of the stack
    Pop,

    /// Pop a boolean, push its negation
    Not,

    // ========================================================================
    // Is-Null Flag
    // ========================================================================
    /// Set the is-null flag to P1 (0 or 1)
    SetFlag,

    /// Pop a boolean into the is-null flag
    StoreFlag,

    // ========================================================================
    // Output
    // ========================================================================
    /// Pop the result value and write the (value, flag) pair into output
    /// slot P1, typed per P4
    Write,

    // ========================================================================
    // Instrumentation
    // ========================================================================
    /// Increment trace counter P1 (debugging and test instrumentation)
    Trace,
}

impl Opcode {
    /// Check if this opcode is a jump instruction
    pub fn is_jump(&self) -> bool {
        matches!(
            self,
            Opcode::Goto | Opcode::If | Opcode::IfNot | Opcode::IfNull | Opcode::NotNull
        )
    }

    /// Get opcode name as string
    pub fn name(&self) -> &'static str {
        match self {
            Opcode::Noop => "Noop",
            Opcode::Halt => "Halt",
            Opcode::Goto => "Goto",
            Opcode::If => "If",
            Opcode::IfNot => "IfNot",
            Opcode::IfNull => "IfNull",
            Opcode::NotNull => "NotNull",
            Opcode::Bool => "Bool",
            Opcode::Int64 => "Int64",
            Opcode::Real => "Real",
            Opcode::String8 => "String8",
            Opcode::Blob => "Blob",
            Opcode::Null => "Null",
            Opcode::Variable => "Variable",
            Opcode::Pop => "Pop",
            Opcode::Not => "Not",
            Opcode::SetFlag => "SetFlag",
            Opcode::StoreFlag => "StoreFlag",
            Opcode::Write => "Write",
            Opcode::Trace => "Trace",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// P4 Operand
// ============================================================================

/// P4 operand - payload data too large for the numeric operands
#[derive(Debug, Clone, PartialEq, Default)]
pub enum P4 {
    /// Not used
    #[default]
    Unused,
    /// 64-bit integer
    Int64(i64),
    /// Real number
    Real(f64),
    /// Text string
    Text(String),
    /// Binary blob
    Blob(Vec<u8>),
    /// Declared SQL type (for Write)
    Type(SqlType),
}

impl P4 {
    /// Check if P4 is unused
    pub fn is_unused(&self) -> bool {
        matches!(self, P4::Unused)
    }
}

// ============================================================================
// Instruction
// ============================================================================

/// A single expression VM instruction
#[derive(Debug, Clone, PartialEq)]
pub struct Op {
    /// Operation code
    pub opcode: Opcode,
    /// First operand (constant, counter index, or output slot)
    pub p1: i32,
    /// Second operand (jump target for branch opcodes)
    pub p2: i32,
    /// Payload operand (type varies by opcode)
    pub p4: P4,
    /// Comment for debugging/explain
    pub comment: Option<String>,
}

impl Op {
    /// Create a new instruction with numeric operands only
    pub fn new(opcode: Opcode, p1: i32, p2: i32) -> Self {
        Self {
            opcode,
            p1,
            p2,
            p4: P4::Unused,
            comment: None,
        }
    }

    /// Create an instruction with P4
    pub fn with_p4(opcode: Opcode, p1: i32, p2: i32, p4: P4) -> Self {
        Self {
            opcode,
            p1,
            p2,
            p4,
            comment: None,
        }
    }

    /// Set comment for debugging
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<10} {:>4} {:>4}", self.opcode.name(), self.p1, self.p2)?;

        match &self.p4 {
            P4::Unused => {}
            P4::Int64(i) => write!(f, "  {}", i)?,
            P4::Real(r) => write!(f, "  {}", r)?,
            P4::Text(s) => write!(f, "  \"{}\"", s)?,
            P4::Blob(b) => write!(f, "  x'{}'", hex::encode(b))?,
            P4::Type(t) => write!(f, "  {}", t)?,
        }

        if let Some(ref comment) = self.comment {
            write!(f, "  ; {}", comment)?;
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
