use std::sync::Arc;
use std::thread;

use exprgen::{
    compile, compile_into, Block, CodeGenerator, Datum, Expr, GenContext, GenFlags,
    GeneratorRegistry, Opcode, OutputSlot, Program, Result, Signature, SqlType, Vm,
};

fn lit(value: Option<bool>) -> Expr {
    match value {
        Some(b) => Expr::boolean(b),
        None => Expr::null_of(SqlType::Boolean),
    }
}

fn datum(value: Option<bool>) -> Datum {
    match value {
        Some(b) => Datum::boolean(b),
        None => Datum::null(),
    }
}

fn eval(expr: &Expr) -> Datum {
    let compiled = compile(expr, GeneratorRegistry::global()).unwrap();
    Vm::new().run(compiled.program()).unwrap().unwrap()
}

// ============================================================================
// Truth Tables
// ============================================================================

#[test]
fn test_and_truth_table() {
    let cases = [
        (Some(true), Some(true), Some(true)),
        (Some(true), Some(false), Some(false)),
        (Some(true), None, None),
        (Some(false), Some(true), Some(false)),
        (Some(false), Some(false), Some(false)),
        (Some(false), None, Some(false)),
        (None, Some(true), None),
        (None, Some(false), Some(false)),
        (None, None, None),
    ];

    for (left, right, expected) in cases {
        let expr = Expr::and(lit(left), lit(right));
        assert_eq!(
            eval(&expr),
            datum(expected),
            "and({:?}, {:?})",
            left,
            right
        );
    }
}

#[test]
fn test_or_truth_table() {
    let cases = [
        (Some(true), Some(true), Some(true)),
        (Some(true), Some(false), Some(true)),
        (Some(true), None, Some(true)),
        (Some(false), Some(true), Some(true)),
        (Some(false), Some(false), Some(false)),
        (Some(false), None, None),
        (None, Some(true), Some(true)),
        (None, Some(false), None),
        (None, None, None),
    ];

    for (left, right, expected) in cases {
        let expr = Expr::or(lit(left), lit(right));
        assert_eq!(eval(&expr), datum(expected), "or({:?}, {:?})", left, right);
    }
}

#[test]
fn test_not_truth_table() {
    let cases = [
        (Some(true), Some(false)),
        (Some(false), Some(true)),
        (None, None),
    ];

    for (operand, expected) in cases {
        let expr = Expr::not(lit(operand));
        assert_eq!(eval(&expr), datum(expected), "not({:?})", operand);
    }
}

#[test]
fn test_nested_expressions() {
    // not(null and false) = not(false) = true
    let expr = Expr::not(Expr::and(lit(None), lit(Some(false))));
    assert_eq!(eval(&expr), Datum::boolean(true));

    // (true and null) or false = null or false = null
    let expr = Expr::or(Expr::and(lit(Some(true)), lit(None)), lit(Some(false)));
    assert_eq!(eval(&expr), Datum::null());

    // (false or null) and true = null and true = null
    let expr = Expr::and(Expr::or(lit(Some(false)), lit(None)), lit(Some(true)));
    assert_eq!(eval(&expr), Datum::null());
}

// ============================================================================
// Short-Circuit Evaluation
// ============================================================================

/// Wraps its single operand with a trace counter increment, so tests can
/// observe whether the operand's code actually ran.
struct ProbeGenerator {
    counter: usize,
}

impl CodeGenerator for ProbeGenerator {
    fn generate(
        &self,
        ctx: &mut GenContext,
        _return_type: SqlType,
        args: &[Expr],
        output: Option<OutputSlot>,
    ) -> Result<Block> {
        let mut block = Block::new();
        block.add_op(Opcode::Trace, self.counter as i32);
        block.append(ctx.generate(&args[0], output)?);
        Ok(block)
    }
}

fn probed_registry() -> GeneratorRegistry {
    let mut registry = GeneratorRegistry::with_builtins();
    registry.register(
        Signature::new("probe0", 1),
        Box::new(ProbeGenerator { counter: 0 }),
        GenFlags::empty(),
    );
    registry.register(
        Signature::new("probe1", 1),
        Box::new(ProbeGenerator { counter: 1 }),
        GenFlags::empty(),
    );
    registry
}

fn eval_probed(expr: &Expr) -> (Datum, u64, u64) {
    let registry = probed_registry();
    let compiled = compile(expr, &registry).unwrap();
    let mut vm = Vm::new();
    let result = vm.run(compiled.program()).unwrap().unwrap();
    (result, vm.trace_count(0), vm.trace_count(1))
}

fn probed_and(left: Option<bool>, right: Option<bool>) -> Expr {
    Expr::and(
        Expr::call("probe0", SqlType::Boolean, vec![lit(left)]),
        Expr::call("probe1", SqlType::Boolean, vec![lit(right)]),
    )
}

#[test]
fn test_and_false_left_skips_right() {
    let (result, left_runs, right_runs) = eval_probed(&probed_and(Some(false), Some(true)));
    assert_eq!(result, Datum::boolean(false));
    assert_eq!(left_runs, 1);
    assert_eq!(right_runs, 0);
}

#[test]
fn test_and_true_left_evaluates_right() {
    let (result, left_runs, right_runs) = eval_probed(&probed_and(Some(true), Some(false)));
    assert_eq!(result, Datum::boolean(false));
    assert_eq!(left_runs, 1);
    assert_eq!(right_runs, 1);
}

#[test]
fn test_and_null_left_evaluates_right() {
    // NULL on the left cannot decide the result by itself
    let (result, left_runs, right_runs) = eval_probed(&probed_and(None, Some(true)));
    assert_eq!(result, Datum::null());
    assert_eq!(left_runs, 1);
    assert_eq!(right_runs, 1);

    let (result, _, right_runs) = eval_probed(&probed_and(None, Some(false)));
    assert_eq!(result, Datum::boolean(false));
    assert_eq!(right_runs, 1);
}

#[test]
fn test_or_true_left_skips_right() {
    let expr = Expr::or(
        Expr::call("probe0", SqlType::Boolean, vec![lit(Some(true))]),
        Expr::call("probe1", SqlType::Boolean, vec![lit(None)]),
    );
    let (result, left_runs, right_runs) = eval_probed(&expr);
    assert_eq!(result, Datum::boolean(true));
    assert_eq!(left_runs, 1);
    assert_eq!(right_runs, 0);
}

#[test]
fn test_or_false_left_evaluates_right() {
    let expr = Expr::or(
        Expr::call("probe0", SqlType::Boolean, vec![lit(Some(false))]),
        Expr::call("probe1", SqlType::Boolean, vec![lit(None)]),
    );
    let (result, _, right_runs) = eval_probed(&expr);
    assert_eq!(result, Datum::null());
    assert_eq!(right_runs, 1);
}

// ============================================================================
// Arity Enforcement
// ============================================================================

#[test]
fn test_wrong_argument_count_is_rejected() {
    // Signature lookup keys on arity, so a mismatched call never reaches a
    // generator built for a different argument count.
    let registry = GeneratorRegistry::global();

    let expr = Expr::call("and", SqlType::Boolean, vec![Expr::boolean(true)]);
    assert!(compile(&expr, registry).is_err());

    let expr = Expr::call(
        "and",
        SqlType::Boolean,
        vec![Expr::boolean(true), Expr::boolean(true), Expr::boolean(true)],
    );
    assert!(compile(&expr, registry).is_err());

    let expr = Expr::call(
        "not",
        SqlType::Boolean,
        vec![Expr::boolean(true), Expr::boolean(false)],
    );
    assert!(compile(&expr, registry).is_err());
}

// ============================================================================
// Compilation Properties
// ============================================================================

fn shape(program: &Program) -> Vec<(Opcode, i32, i32)> {
    program
        .ops()
        .iter()
        .map(|op| (op.opcode, op.p1, op.p2))
        .collect()
}

#[test]
fn test_recompilation_is_stable() {
    // Compiling the same tree twice yields the same instruction sequence
    let expr = Expr::or(
        Expr::and(lit(None), Expr::param(0, SqlType::Boolean)),
        Expr::not(lit(Some(false))),
    );

    let first = compile(&expr, GeneratorRegistry::global()).unwrap();
    let second = compile(&expr, GeneratorRegistry::global()).unwrap();
    assert_eq!(shape(first.program()), shape(second.program()));
}

#[test]
fn test_deterministic_metadata() {
    let expr = Expr::and(lit(Some(true)), lit(None));
    let compiled = compile(&expr, GeneratorRegistry::global()).unwrap();
    assert!(compiled.deterministic());

    // A generator registered without DETERMINISTIC taints the whole program
    let registry = probed_registry();
    let expr = Expr::and(
        Expr::call("probe0", SqlType::Boolean, vec![lit(Some(true))]),
        lit(Some(true)),
    );
    let compiled = compile(&expr, &registry).unwrap();
    assert!(!compiled.deterministic());
}

#[test]
fn test_compile_into_output_slot() {
    let expr = Expr::and(lit(Some(true)), lit(None));
    let compiled = compile_into(&expr, GeneratorRegistry::global(), OutputSlot(2)).unwrap();

    let mut vm = Vm::new();
    let result = vm.run(compiled.program()).unwrap();
    assert_eq!(result, None);
    assert_eq!(vm.output(2), Some(&Datum::null()));
}

// ============================================================================
// Parameterized Evaluation
// ============================================================================

#[test]
fn test_parameters_follow_truth_table() {
    let expr = Expr::and(
        Expr::param(0, SqlType::Boolean),
        Expr::param(1, SqlType::Boolean),
    );
    let compiled = compile(&expr, GeneratorRegistry::global()).unwrap();

    let cases = [
        (Some(true), None, None),
        (Some(false), None, Some(false)),
        (None, Some(false), Some(false)),
        (Some(true), Some(true), Some(true)),
    ];

    for (left, right, expected) in cases {
        let mut vm = Vm::with_bindings(vec![datum(left), datum(right)]);
        let result = vm.run(compiled.program()).unwrap().unwrap();
        assert_eq!(result, datum(expected), "and({:?}, {:?})", left, right);
    }
}

#[test]
fn test_shared_program_across_threads() {
    // One compiled program, many evaluations with their own flag state
    let expr = Expr::and(
        Expr::param(0, SqlType::Boolean),
        Expr::param(1, SqlType::Boolean),
    );
    let compiled = compile(&expr, GeneratorRegistry::global()).unwrap();
    let program = Arc::new(compiled.into_program());

    let inputs = [
        (Some(true), None, None),
        (Some(false), None, Some(false)),
        (None, None, None),
        (Some(true), Some(false), Some(false)),
    ];

    let mut handles = Vec::new();
    for (left, right, expected) in inputs {
        let program = Arc::clone(&program);
        handles.push(thread::spawn(move || {
            for _ in 0..100 {
                let mut vm = Vm::with_bindings(vec![datum(left), datum(right)]);
                let result = vm.run(&program).unwrap().unwrap();
                assert_eq!(result, datum(expected));
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
}
