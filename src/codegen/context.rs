//! Generation context
//!
//! The shared services available to every operator generator during one
//! compilation: recursive sub-expression generation, fresh label
//! allocation, and result materialization. Label ids come from a single
//! per-compilation counter, so no label is ever reused across sibling or
//! parent blocks.

use log::trace;

use crate::bytecode::block::{Block, Label};
use crate::bytecode::ops::{Opcode, P4};
use crate::codegen::registry::{GenFlags, GeneratorRegistry};
use crate::codegen::OutputSlot;
use crate::error::{Error, ErrorCode, Result};
use crate::expr::{Constant, Expr};
use crate::types::{SqlType, Value};

/// Per-compilation state threaded through recursive generator calls
pub struct GenContext<'a> {
    registry: &'a GeneratorRegistry,
    next_label: i32,
    deterministic: bool,
}

impl<'a> GenContext<'a> {
    /// Create a fresh context for one compilation
    pub fn new(registry: &'a GeneratorRegistry) -> Self {
        Self {
            registry,
            next_label: 0,
            deterministic: true,
        }
    }

    /// Allocate a label unique within this compilation
    pub fn fresh_label(&mut self) -> Label {
        let label = Label::new(self.next_label);
        self.next_label += 1;
        label
    }

    /// Whether every generator invoked so far was registered deterministic
    pub fn is_deterministic(&self) -> bool {
        self.deterministic
    }

    /// Generate the instruction block for an expression
    ///
    /// After the returned block runs, exactly one value is live and the
    /// is-null flag reflects it — or, when `output` is given, the pair has
    /// been materialized into the slot instead.
    pub fn generate(&mut self, expr: &Expr, output: Option<OutputSlot>) -> Result<Block> {
        match expr {
            Expr::Constant(constant) => Ok(self.generate_constant(constant, output)),

            Expr::Parameter(param) => {
                let mut block = Block::new();
                block.add_op(Opcode::Variable, param.index as i32);
                if let Some(slot) = output {
                    block.append(self.write(param.ty, slot));
                }
                Ok(block)
            }

            Expr::Call(call) => {
                trace!("dispatching generator for {}", call.signature);
                let generator = self.registry.lookup(&call.signature).ok_or_else(|| {
                    Error::with_message(
                        ErrorCode::NotFound,
                        format!("no such operator: {}", call.signature),
                    )
                })?;

                if let Some(flags) = self.registry.flags(&call.signature) {
                    if !flags.contains(GenFlags::DETERMINISTIC) {
                        self.deterministic = false;
                    }
                }

                generator.generate(self, call.return_type, &call.args, output)
            }
        }
    }

    /// Emit the materialization code for the current (value, flag) pair
    ///
    /// The returned block consumes the live value and the flag, writing
    /// them into the destination slot per the declared type.
    pub fn write(&self, ty: SqlType, output: OutputSlot) -> Block {
        let mut block = Block::new();
        block.add_op4(Opcode::Write, output.0 as i32, P4::Type(ty));
        block
    }

    fn generate_constant(&self, constant: &Constant, output: Option<OutputSlot>) -> Block {
        let mut block = Block::new();

        match &constant.value {
            Value::Null => {
                // Null pushes a placeholder and sets the flag in one op
                block.add_op(Opcode::Null, 0);
            }
            Value::Boolean(b) => {
                block.add_op(Opcode::Bool, if *b { 1 } else { 0 });
                block.add_op(Opcode::SetFlag, 0);
            }
            Value::BigInt(i) => {
                block.add_op4(Opcode::Int64, 0, P4::Int64(*i));
                block.add_op(Opcode::SetFlag, 0);
            }
            Value::Double(r) => {
                block.add_op4(Opcode::Real, 0, P4::Real(*r));
                block.add_op(Opcode::SetFlag, 0);
            }
            Value::Varchar(s) => {
                block.add_op4(Opcode::String8, 0, P4::Text(s.clone()));
                block.add_op(Opcode::SetFlag, 0);
            }
            Value::Varbinary(b) => {
                block.add_op4(Opcode::Blob, 0, P4::Blob(b.clone()));
                block.add_op(Opcode::SetFlag, 0);
            }
        }

        if let Some(slot) = output {
            block.append(self.write(constant.ty, slot));
        }
        block
    }
}
