//! Logical operator generators
//!
//! AND, OR, and NOT under SQL three-valued logic, lowered to binary
//! branches over the single per-evaluation is-null flag. AND and OR
//! short-circuit: the right operand's code is skipped entirely when the
//! left operand already decides the result.

use crate::bytecode::block::Block;
use crate::bytecode::ops::Opcode;
use crate::codegen::context::GenContext;
use crate::codegen::{CodeGenerator, OutputSlot};
use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::types::SqlType;

// ============================================================================
// AND
// ============================================================================

/// Short-circuit three-valued AND
///
/// Truth table: FALSE if either operand is FALSE regardless of the other's
/// nullity, NULL if neither is FALSE but at least one is NULL, TRUE only
/// if both are TRUE. A FALSE left operand skips the right operand.
///
/// While the right operand evaluates, a pending marker sits beneath its
/// value on the stack: true when the left operand was NULL (result is NULL
/// unless the right forces FALSE), false when the left was TRUE.
pub struct AndGenerator;

impl CodeGenerator for AndGenerator {
    fn generate(
        &self,
        ctx: &mut GenContext,
        return_type: SqlType,
        args: &[Expr],
        output: Option<OutputSlot>,
    ) -> Result<Block> {
        if args.len() != 2 {
            return Err(Error::arity("and", 2, args.len()));
        }

        let left_not_null = ctx.fresh_label();
        let left_true = ctx.fresh_label();
        let eval_right = ctx.fresh_label();
        let right_not_null = ctx.fresh_label();
        let right_true = ctx.fresh_label();
        let end = ctx.fresh_label();

        let mut block = Block::with_description("AND");
        block.append(ctx.generate(&args[0], None)?);

        block.add_op_label(Opcode::NotNull, 0, left_not_null);
        // left is NULL: clear the flag, discard the value, push a pending
        // null marker, and defer the decision to the right operand
        let idx = block.add_op(Opcode::SetFlag, 0);
        block.set_comment(idx, "left was null");
        block.add_op(Opcode::Pop, 0);
        block.add_op(Opcode::Bool, 1);
        block.add_op_label(Opcode::Goto, 0, eval_right);

        block.resolve_label(left_not_null);
        block.add_op_label(Opcode::If, 0, left_true);
        // left is FALSE: produce FALSE without evaluating the right operand
        let idx = block.add_op(Opcode::Bool, 0);
        block.set_comment(idx, "left was false: short-circuit");
        block.add_op_label(Opcode::Goto, 0, end);

        block.resolve_label(left_true);
        // left is TRUE: the result is whatever the right operand says
        block.add_op(Opcode::Bool, 0);

        block.resolve_label(eval_right);
        block.append(ctx.generate(&args[1], None)?);

        block.add_op_label(Opcode::NotNull, 0, right_not_null);
        // right is NULL: the left was TRUE or NULL, so the result is NULL;
        // the marker left on the stack is the ignored result value
        let idx = block.add_op(Opcode::Pop, 0);
        block.set_comment(idx, "right was null");
        block.add_op_label(Opcode::Goto, 0, end);

        block.resolve_label(right_not_null);
        block.add_op_label(Opcode::If, 0, right_true);
        // right is FALSE: overrides a pending left null
        block.add_op(Opcode::Pop, 0);
        block.add_op(Opcode::Bool, 0);
        block.add_op_label(Opcode::Goto, 0, end);

        block.resolve_label(right_true);
        // right is TRUE: restore the flag from the pending marker
        let idx = block.add_op(Opcode::StoreFlag, 0);
        block.set_comment(idx, "result is null iff left was null");
        block.add_op(Opcode::Bool, 1);

        block.resolve_label(end);

        if let Some(slot) = output {
            block.append(ctx.write(return_type, slot));
        }
        Ok(block)
    }
}

// ============================================================================
// OR
// ============================================================================

/// Short-circuit three-valued OR
///
/// The dual of AND: TRUE if either operand is TRUE regardless of the
/// other's nullity, NULL if neither is TRUE but at least one is NULL,
/// FALSE only if both are FALSE. A TRUE left operand skips the right.
pub struct OrGenerator;

impl CodeGenerator for OrGenerator {
    fn generate(
        &self,
        ctx: &mut GenContext,
        return_type: SqlType,
        args: &[Expr],
        output: Option<OutputSlot>,
    ) -> Result<Block> {
        if args.len() != 2 {
            return Err(Error::arity("or", 2, args.len()));
        }

        let left_not_null = ctx.fresh_label();
        let left_false = ctx.fresh_label();
        let eval_right = ctx.fresh_label();
        let right_not_null = ctx.fresh_label();
        let right_false = ctx.fresh_label();
        let end = ctx.fresh_label();

        let mut block = Block::with_description("OR");
        block.append(ctx.generate(&args[0], None)?);

        block.add_op_label(Opcode::NotNull, 0, left_not_null);
        // left is NULL: defer, marking that a NULL is pending
        let idx = block.add_op(Opcode::SetFlag, 0);
        block.set_comment(idx, "left was null");
        block.add_op(Opcode::Pop, 0);
        block.add_op(Opcode::Bool, 1);
        block.add_op_label(Opcode::Goto, 0, eval_right);

        block.resolve_label(left_not_null);
        block.add_op_label(Opcode::IfNot, 0, left_false);
        // left is TRUE: produce TRUE without evaluating the right operand
        let idx = block.add_op(Opcode::Bool, 1);
        block.set_comment(idx, "left was true: short-circuit");
        block.add_op_label(Opcode::Goto, 0, end);

        block.resolve_label(left_false);
        block.add_op(Opcode::Bool, 0);

        block.resolve_label(eval_right);
        block.append(ctx.generate(&args[1], None)?);

        block.add_op_label(Opcode::NotNull, 0, right_not_null);
        // right is NULL: the left was FALSE or NULL, so the result is NULL
        let idx = block.add_op(Opcode::Pop, 0);
        block.set_comment(idx, "right was null");
        block.add_op_label(Opcode::Goto, 0, end);

        block.resolve_label(right_not_null);
        block.add_op_label(Opcode::IfNot, 0, right_false);
        // right is TRUE: overrides a pending left null
        block.add_op(Opcode::Pop, 0);
        block.add_op(Opcode::Bool, 1);
        block.add_op_label(Opcode::Goto, 0, end);

        block.resolve_label(right_false);
        // right is FALSE: restore the flag from the pending marker
        let idx = block.add_op(Opcode::StoreFlag, 0);
        block.set_comment(idx, "result is null iff left was null");
        block.add_op(Opcode::Bool, 0);

        block.resolve_label(end);

        if let Some(slot) = output {
            block.append(ctx.write(return_type, slot));
        }
        Ok(block)
    }
}

// ============================================================================
// NOT
// ============================================================================

/// Three-valued NOT: NULL propagates, otherwise the boolean is negated
pub struct NotGenerator;

impl CodeGenerator for NotGenerator {
    fn generate(
        &self,
        ctx: &mut GenContext,
        return_type: SqlType,
        args: &[Expr],
        output: Option<OutputSlot>,
    ) -> Result<Block> {
        if args.len() != 1 {
            return Err(Error::arity("not", 1, args.len()));
        }

        let not_null = ctx.fresh_label();
        let end = ctx.fresh_label();

        let mut block = Block::with_description("NOT");
        block.append(ctx.generate(&args[0], None)?);

        block.add_op_label(Opcode::NotNull, 0, not_null);
        // operand is NULL: the flag is already set, the placeholder value
        // stands in for the result
        block.add_op_label(Opcode::Goto, 0, end);

        block.resolve_label(not_null);
        block.add_op(Opcode::Not, 0);

        block.resolve_label(end);

        if let Some(slot) = output {
            block.append(ctx.write(return_type, slot));
        }
        Ok(block)
    }
}

// ============================================================================
// Tests
// ============================================================================
