//! Expression VM
//!
//! A small stack machine executing linked programs. Every `Vm` owns its own
//! operand stack and is-null flag, so concurrent evaluations of a shared
//! `Program` never observe each other's state.

use log::trace;

use crate::bytecode::block::Program;
use crate::bytecode::ops::{Opcode, P4};
use crate::error::{Error, ErrorCode, Result};
use crate::types::{Datum, Value};

// ============================================================================
// Virtual Machine
// ============================================================================

/// One evaluation frame: operand stack, is-null flag, outputs, counters
///
/// The machine has no runtime error path of its own for well-typed
/// programs; every error it can raise indicates a compiler defect.
#[derive(Debug, Default)]
pub struct Vm {
    /// Operand stack
    stack: Vec<Value>,
    /// The shared is-null flag for this evaluation frame
    was_null: bool,
    /// Parameter bindings for this evaluation (one per row)
    bindings: Vec<Datum>,
    /// Output slots written by Write instructions
    outputs: Vec<Option<Datum>>,
    /// Trace counters incremented by Trace instructions
    trace_counts: Vec<u64>,
}

impl Vm {
    /// Create a new evaluation frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an evaluation frame with parameter bindings
    pub fn with_bindings(bindings: Vec<Datum>) -> Self {
        Self {
            bindings,
            ..Self::default()
        }
    }

    /// Bind a parameter value, growing the binding table as needed
    pub fn bind(&mut self, index: usize, datum: Datum) {
        if index >= self.bindings.len() {
            self.bindings.resize(index + 1, Datum::null());
        }
        self.bindings[index] = datum;
    }

    /// Get the (value, is-null) pair written to an output slot, if any
    pub fn output(&self, slot: usize) -> Option<&Datum> {
        self.outputs.get(slot).and_then(|d| d.as_ref())
    }

    /// Get the value of a trace counter
    pub fn trace_count(&self, counter: usize) -> u64 {
        self.trace_counts.get(counter).copied().unwrap_or(0)
    }

    /// Execute a linked program
    ///
    /// Returns the implicit result — the last produced value paired with
    /// the is-null flag — or `None` when the program consumed its result
    /// into an output slot.
    pub fn run(&mut self, program: &Program) -> Result<Option<Datum>> {
        let ops = program.ops();
        let mut pc = 0usize;

        while pc < ops.len() {
            let op = &ops[pc];
            trace!("pc={:<3} {}", pc, op);
            let mut next = pc + 1;

            match op.opcode {
                Opcode::Noop => {}

                Opcode::Halt => break,

                Opcode::Goto => {
                    next = self.jump_target(op.p2)?;
                }

                Opcode::If => {
                    if self.pop_bool()? {
                        next = self.jump_target(op.p2)?;
                    }
                }

                Opcode::IfNot => {
                    if !self.pop_bool()? {
                        next = self.jump_target(op.p2)?;
                    }
                }

                Opcode::IfNull => {
                    if self.was_null {
                        next = self.jump_target(op.p2)?;
                    }
                }

                Opcode::NotNull => {
                    if !self.was_null {
                        next = self.jump_target(op.p2)?;
                    }
                }

                Opcode::Bool => {
                    self.stack.push(Value::Boolean(op.p1 != 0));
                }

                Opcode::Int64 => {
                    let v = match &op.p4 {
                        P4::Int64(i) => *i,
                        _ => return Err(self.defect(pc, "Int64 without integer operand")),
                    };
                    self.stack.push(Value::BigInt(v));
                }

                Opcode::Real => {
                    let v = match &op.p4 {
                        P4::Real(r) => *r,
                        _ => return Err(self.defect(pc, "Real without real operand")),
                    };
                    self.stack.push(Value::Double(v));
                }

                Opcode::String8 => {
                    let v = match &op.p4 {
                        P4::Text(s) => s.clone(),
                        _ => return Err(self.defect(pc, "String8 without text operand")),
                    };
                    self.stack.push(Value::Varchar(v));
                }

                Opcode::Blob => {
                    let v = match &op.p4 {
                        P4::Blob(b) => b.clone(),
                        _ => return Err(self.defect(pc, "Blob without blob operand")),
                    };
                    self.stack.push(Value::Varbinary(v));
                }

                Opcode::Null => {
                    self.stack.push(Value::Null);
                    self.was_null = true;
                }

                Opcode::Variable => {
                    let index = op.p1 as usize;
                    let datum = self
                        .bindings
                        .get(index)
                        .ok_or_else(|| self.defect(pc, "unbound parameter"))?
                        .clone();
                    self.was_null = datum.is_null;
                    self.stack.push(datum.value);
                }

                Opcode::Pop => {
                    self.pop(pc)?;
                }

                Opcode::Not => {
                    let b = self.pop_bool()?;
                    self.stack.push(Value::Boolean(!b));
                }

                Opcode::SetFlag => {
                    self.was_null = op.p1 != 0;
                }

                Opcode::StoreFlag => {
                    self.was_null = self.pop_bool()?;
                }

                Opcode::Write => {
                    let value = self.pop(pc)?;
                    let datum = if self.was_null {
                        Datum::null()
                    } else {
                        Datum::of(value)
                    };
                    let slot = op.p1 as usize;
                    if slot >= self.outputs.len() {
                        self.outputs.resize(slot + 1, None);
                    }
                    self.outputs[slot] = Some(datum);
                    // the write consumes the live value/flag pair
                    self.was_null = false;
                }

                Opcode::Trace => {
                    let counter = op.p1 as usize;
                    if counter >= self.trace_counts.len() {
                        self.trace_counts.resize(counter + 1, 0);
                    }
                    self.trace_counts[counter] += 1;
                }
            }

            pc = next;
        }

        match self.stack.pop() {
            Some(value) => {
                let datum = if self.was_null {
                    Datum::null()
                } else {
                    Datum::of(value)
                };
                Ok(Some(datum))
            }
            None => Ok(None),
        }
    }

    fn jump_target(&self, p2: i32) -> Result<usize> {
        if p2 < 0 {
            return Err(Error::with_message(
                ErrorCode::Internal,
                "jump to unlinked label",
            ));
        }
        Ok(p2 as usize)
    }

    fn pop(&mut self, pc: usize) -> Result<Value> {
        self.stack
            .pop()
            .ok_or_else(|| self.defect(pc, "operand stack underflow"))
    }

    fn pop_bool(&mut self) -> Result<bool> {
        match self.stack.pop() {
            Some(Value::Boolean(b)) => Ok(b),
            Some(other) => Err(Error::with_message(
                ErrorCode::Internal,
                format!("expected boolean on stack, found {}", other),
            )),
            None => Err(Error::with_message(
                ErrorCode::Internal,
                "operand stack underflow",
            )),
        }
    }

    fn defect(&self, pc: usize, msg: &str) -> Error {
        Error::with_message(ErrorCode::Internal, format!("at pc {}: {}", pc, msg))
    }
}

// ============================================================================
// Tests
// ============================================================================
