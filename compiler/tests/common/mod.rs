//! Shared helpers for the shrink-wrap integration tests

#![allow(dead_code)]

use shrinkwrap::hlir::{
    BinaryOp, BlockId, FunctionBuilder, FunctionId, HlirConstant, HlirFunction, HlirTerminator,
    HlirType, InstId, Op, ValueId,
};
use shrinkwrap::{ShrinkWrapConfig, ShrinkWrapPass, ShrinkWrapStats, TargetLibraryInfo};
use std::collections::HashMap;

/// A function with a single block calling `name(x)` and discarding the result
pub fn unused_unary_call(name: &str, ty: HlirType) -> (HlirFunction, InstId, ValueId) {
    let mut b = FunctionBuilder::new(FunctionId(0), "f", HlirType::Void);
    let x = b.add_param("x", ty.clone());
    let entry = b.create_block("entry");
    b.switch_to_block(entry);
    let (call, _) = b.build_call(name, vec![x], ty);
    b.build_return(None);
    (b.build(), call, x)
}

/// Run the pass with every class enabled on the default target
pub fn shrink_wrap(func: &mut HlirFunction) -> ShrinkWrapStats {
    shrink_wrap_with(func, ShrinkWrapConfig::default())
}

pub fn shrink_wrap_with(func: &mut HlirFunction, config: ShrinkWrapConfig) -> ShrinkWrapStats {
    let tli = TargetLibraryInfo::new();
    let pass = ShrinkWrapPass::new(&tli, config);
    let mut stats = ShrinkWrapStats::new();
    pass.run_on_function(func, &mut stats).expect("shrink-wrap failed");
    stats
}

/// The guard branch that leads into the block holding `call`
pub fn guard_branch(func: &HlirFunction, call: InstId) -> Option<(ValueId, BlockId, BlockId)> {
    let call_block = func.inst_block(call)?;
    func.blocks.iter().find_map(|b| match b.terminator {
        HlirTerminator::CondBranch {
            condition,
            then_block,
            else_block,
            ..
        } if then_block == call_block => Some((condition, then_block, else_block)),
        _ => None,
    })
}

/// Evaluate a materialized guard. `env` supplies the values of the call's
/// operands; comparisons follow IEEE ordered semantics.
pub fn evaluate(func: &HlirFunction, value: ValueId, env: &HashMap<ValueId, f64>) -> f64 {
    if let Some(v) = env.get(&value) {
        return *v;
    }
    let instr = func
        .value_def(value)
        .unwrap_or_else(|| panic!("no definition for {:?}", value));
    match &instr.op {
        Op::Const(HlirConstant::Float(c, _)) => *c,
        Op::Const(HlirConstant::Int(c, _)) => *c as f64,
        Op::Cast { value, .. } => evaluate(func, *value, env),
        Op::Binary { op, left, right } => {
            let l = evaluate(func, *left, env);
            let r = evaluate(func, *right, env);
            let holds = match op {
                BinaryOp::FOEq => l == r,
                BinaryOp::FOLt => l < r,
                BinaryOp::FOLe => l <= r,
                BinaryOp::FOGt => l > r,
                BinaryOp::FOGe => l >= r,
                BinaryOp::Or => l != 0.0 || r != 0.0,
                other => panic!("unexpected guard operator {:?}", other),
            };
            if holds { 1.0 } else { 0.0 }
        }
        other => panic!("unexpected guard instruction {:?}", other),
    }
}

pub fn guard_holds(func: &HlirFunction, condition: ValueId, env: &[(ValueId, f64)]) -> bool {
    let env: HashMap<_, _> = env.iter().copied().collect();
    evaluate(func, condition, &env) != 0.0
}

/// Boundary-heavy sample of doubles
pub fn sample_points() -> Vec<f64> {
    let mut points = vec![
        f64::NAN,
        f64::NEG_INFINITY,
        f64::INFINITY,
        f64::MAX,
        f64::MIN,
        -0.0,
        0.0,
        f64::MIN_POSITIVE,
        -f64::MIN_POSITIVE,
    ];
    for edge in [1.0, 32.0, 64.0, 127.0, 128.0, 308.0, 709.0, 745.0, 1023.0, 1074.0] {
        for v in [edge, -edge] {
            points.extend([v - 0.5, v, v + 0.5]);
        }
    }
    points
}
