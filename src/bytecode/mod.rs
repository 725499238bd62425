//! Expression bytecode: instructions, composable blocks, and the VM

pub mod block;
pub mod ops;
pub mod vm;

pub use block::{Block, Label, Program};
pub use ops::{Op, Opcode, P4};
pub use vm::Vm;
