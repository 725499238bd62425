//! Expression code generation
//!
//! Operator generators translate expression nodes into instruction blocks.
//! Each generator receives the shared generation context for recursive
//! operand compilation and emits a self-contained block honoring the
//! stack/flag contract: when its code runs, exactly one value is live and
//! the is-null flag reflects it.

pub mod context;
pub mod logical;
pub mod registry;

use log::debug;

use crate::bytecode::block::{Block, Program};
use crate::error::Result;
use crate::expr::Expr;
use crate::types::SqlType;

pub use context::GenContext;
pub use logical::{AndGenerator, NotGenerator, OrGenerator};
pub use registry::{GenFlags, GeneratorRegistry};

// ============================================================================
// Output Destinations
// ============================================================================

/// A caller-supplied destination for a generated result
///
/// When present, the generator materializes the final (value, is-null) pair
/// into the slot instead of leaving it as the implicit result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSlot(pub usize);

// ============================================================================
// Generator Interface
// ============================================================================

/// An operator code generator
///
/// Implementations emit the instruction block for one operator given its
/// argument expressions. They may allocate fresh labels through the context
/// and must not mutate anything outside the returned block.
pub trait CodeGenerator: Send + Sync {
    /// Generate the instruction block for this operator
    ///
    /// `args` carries the operand expressions in order; an argument count
    /// that does not match the operator's arity fails with
    /// `ErrorCode::Arity` before any code is emitted.
    fn generate(
        &self,
        ctx: &mut GenContext,
        return_type: SqlType,
        args: &[Expr],
        output: Option<OutputSlot>,
    ) -> Result<Block>;
}

// ============================================================================
// Compilation Entry Points
// ============================================================================

/// A compiled expression: the linked program plus cache metadata
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    program: Program,
    deterministic: bool,
}

impl CompiledExpr {
    /// Get the linked program
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Whether every generator that contributed code was registered as
    /// deterministic, making the program safe to memoize and share
    pub fn deterministic(&self) -> bool {
        self.deterministic
    }

    /// Consume self, returning the program
    pub fn into_program(self) -> Program {
        self.program
    }
}

/// Compile an expression; the result is left as the implicit last value
pub fn compile(expr: &Expr, registry: &GeneratorRegistry) -> Result<CompiledExpr> {
    compile_inner(expr, registry, None)
}

/// Compile an expression, materializing the result into an output slot
pub fn compile_into(
    expr: &Expr,
    registry: &GeneratorRegistry,
    output: OutputSlot,
) -> Result<CompiledExpr> {
    compile_inner(expr, registry, Some(output))
}

fn compile_inner(
    expr: &Expr,
    registry: &GeneratorRegistry,
    output: Option<OutputSlot>,
) -> Result<CompiledExpr> {
    debug!("compiling expression: {}", expr);
    let mut ctx = GenContext::new(registry);
    let block = ctx.generate(expr, output)?;
    let deterministic = ctx.is_deterministic();
    let program = block.link()?;
    Ok(CompiledExpr {
        program,
        deterministic,
    })
}
