//! exprgen - SQL scalar expression compiler core
//!
//! Compiles typed scalar expressions into stack-machine bytecode evaluated
//! once per row, with SQL three-valued logic (TRUE / FALSE / NULL) encoded
//! through a single per-evaluation is-null flag. The logical operators
//! short-circuit: a left operand that decides the result skips the right
//! operand's code entirely.

pub mod bytecode;
pub mod codegen;
pub mod error;
pub mod expr;
pub mod types;

// Re-export main public types
pub use error::{Error, ErrorCode, Result};

pub use bytecode::{Block, Label, Op, Opcode, Program, Vm, P4};
pub use codegen::{
    compile, compile_into, AndGenerator, CodeGenerator, CompiledExpr, GenContext, GenFlags,
    GeneratorRegistry, NotGenerator, OrGenerator, OutputSlot,
};
pub use expr::{CallExpr, Constant, Expr, Parameter, Signature};
pub use types::{Datum, SqlType, Value};
