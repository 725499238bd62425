//! Instruction blocks, labels, and program linking
//!
//! Generators emit self-contained `Block`s whose jump targets are label
//! references. Label ids are allocated per compilation (never reused across
//! sibling or parent blocks), so blocks compose by plain concatenation:
//! `append` rebases the child's resolved label offsets and merges them into
//! the parent. `link` turns the fully assembled block into an executable
//! `Program` by patching every jump to an absolute address.

use std::fmt;
use std::fmt::Write as _;

use log::{debug, trace};

use crate::bytecode::ops::{Op, Opcode, P4};
use crate::error::{Error, ErrorCode, Result};

// ============================================================================
// Labels
// ============================================================================

/// Jump target reference
///
/// Stored in an instruction's P2 as a negative value until linking, so a
/// label id is always distinguishable from an absolute address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(i32);

impl Label {
    /// Create a label from an allocator-issued id
    pub fn new(id: i32) -> Self {
        Label(-id - 1)
    }

    /// Get the encoded P2 value (negative)
    pub fn value(&self) -> i32 {
        self.0
    }

    /// Recover the allocator id from the encoded value
    pub fn id(&self) -> i32 {
        -self.0 - 1
    }
}

// ============================================================================
// Instruction Blocks
// ============================================================================

/// An ordered, self-contained sequence of instructions
///
/// A block owns the labels it resolves. It is built up by one generator
/// call, returned immutably, and consumed exactly once by `append` in the
/// caller or by `link` at the top of the tree.
#[derive(Debug, Clone, Default)]
pub struct Block {
    /// Accumulated instructions
    ops: Vec<Op>,
    /// Labels resolved in this block: (label id, offset within block)
    resolved: Vec<(i32, i32)>,
    /// Optional description shown in EXPLAIN output
    description: Option<String>,
}

impl Block {
    /// Create an empty block
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty block with a description
    pub fn with_description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    /// Get the block description
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Number of instructions in the block
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check if the block is empty
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Get the instructions
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Add an instruction
    pub fn add_op(&mut self, opcode: Opcode, p1: i32) -> usize {
        let idx = self.ops.len();
        self.ops.push(Op::new(opcode, p1, 0));
        idx
    }

    /// Add an instruction with P4
    pub fn add_op4(&mut self, opcode: Opcode, p1: i32, p4: P4) -> usize {
        let idx = self.ops.len();
        self.ops.push(Op::with_p4(opcode, p1, 0, p4));
        idx
    }

    /// Add a jump instruction targeting a label
    pub fn add_op_label(&mut self, opcode: Opcode, p1: i32, label: Label) -> usize {
        let idx = self.ops.len();
        self.ops.push(Op::new(opcode, p1, label.value()));
        idx
    }

    /// Resolve a label to the current end of the block
    pub fn resolve_label(&mut self, label: Label) {
        self.resolved.push((label.id(), self.ops.len() as i32));
    }

    /// Set comment on the instruction at the given index
    pub fn set_comment(&mut self, idx: usize, comment: impl Into<String>) {
        if let Some(op) = self.ops.get_mut(idx) {
            op.comment = Some(comment.into());
        }
    }

    /// Append another block, consuming it
    ///
    /// The child's resolved label offsets are rebased to this block's
    /// current length. Label ids are compilation-unique, so the merge
    /// cannot collide.
    pub fn append(&mut self, other: Block) {
        let base = self.ops.len() as i32;
        self.ops.extend(other.ops);
        self.resolved
            .extend(other.resolved.into_iter().map(|(id, off)| (id, off + base)));
    }

    /// Link the block into an executable program
    ///
    /// Patches every jump target from a label reference to an absolute
    /// address and terminates the program with `Halt`. An unresolved label
    /// is a compiler defect and fails with `ErrorCode::Internal`.
    pub fn link(mut self) -> Result<Program> {
        self.ops.push(Op::new(Opcode::Halt, 0, 0));

        for op in &mut self.ops {
            if op.opcode.is_jump() && op.p2 < 0 {
                let id = Label(op.p2).id();
                let addr = self
                    .resolved
                    .iter()
                    .find(|(l, _)| *l == id)
                    .map(|(_, addr)| *addr)
                    .ok_or_else(|| {
                        Error::with_message(
                            ErrorCode::Internal,
                            format!("unresolved label {} at link time", id),
                        )
                    })?;
                trace!("link: label {} -> addr {}", id, addr);
                op.p2 = addr;
            }
        }

        debug!("linked program: {} ops", self.ops.len());
        Ok(Program { ops: self.ops })
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(desc) = &self.description {
            writeln!(f, "; {}", desc)?;
        }
        for (i, op) in self.ops.iter().enumerate() {
            writeln!(f, "{:<4}  {}", i, op)?;
        }
        Ok(())
    }
}

// ============================================================================
// Programs
// ============================================================================

/// A linked, executable instruction sequence
///
/// All jump targets are absolute addresses; the last instruction is `Halt`.
/// Programs are immutable and may be shared across threads.
#[derive(Debug, Clone)]
pub struct Program {
    ops: Vec<Op>,
}

impl Program {
    /// Get the instructions
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Number of instructions
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check if the program is empty
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Format the program as EXPLAIN output
    pub fn explain(&self) -> String {
        let mut output = String::new();
        output.push_str("addr  opcode      p1    p2  p4\n");
        output.push_str("----  ----------  ----  ----  -------------\n");
        for (i, op) in self.ops.iter().enumerate() {
            // writeln! to a String cannot fail
            let _ = writeln!(output, "{:<4}  {}", i, op);
        }
        output
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.explain())
    }
}

// ============================================================================
// Tests
// ============================================================================
