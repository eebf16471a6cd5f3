//! End-to-end tests for the shrink-wrap pass

mod common;

use common::*;
use shrinkwrap::hlir::{
    BlockId, FunctionBuilder, FunctionId, HlirFunction, HlirModule, HlirTerminator, HlirType,
    InstId, ModuleBuilder, Op, ValueId,
};
use shrinkwrap::optimizer::shrinkwrap::collect_candidates;
use shrinkwrap::{
    PreservedAnalyses, ShrinkWrapConfig, ShrinkWrapPass, ShrinkWrapStats, TargetLibraryInfo,
};
use std::collections::{HashSet, VecDeque};

// ============================================================================
// Threshold correctness
// ============================================================================

fn assert_guard_equivalent(name: &str, reference: impl Fn(f64) -> bool) {
    let (mut func, call, x) = unused_unary_call(name, HlirType::F64);
    shrink_wrap(&mut func);
    let (condition, _, _) =
        guard_branch(&func, call).unwrap_or_else(|| panic!("{} was not wrapped", name));

    for v in sample_points() {
        assert_eq!(
            guard_holds(&func, condition, &[(x, v)]),
            reference(v),
            "{}({}) guard mismatch",
            name,
            v
        );
    }
}

#[test]
fn test_sqrt_guard() {
    assert_guard_equivalent("sqrt", |x| x < 0.0);
}

#[test]
fn test_acos_asin_guard() {
    assert_guard_equivalent("acos", |x| x < -1.0 || x > 1.0);
    assert_guard_equivalent("asin", |x| x < -1.0 || x > 1.0);
}

#[test]
fn test_log_guard() {
    assert_guard_equivalent("log", |x| x <= 0.0);
}

#[test]
fn test_expm1_guard() {
    assert_guard_equivalent("expm1", |x| x > 709.0);
}

#[test]
fn test_exp_guard() {
    assert_guard_equivalent("exp", |x| x < -745.0 || x > 709.0);
}

#[test]
fn test_cos_guard_only_fires_on_infinity() {
    assert_guard_equivalent("cos", |x| x.is_infinite());
}

#[test]
fn test_float_guard_keeps_operand_precision() {
    let (mut func, call, _) = unused_unary_call("expf", HlirType::F32);
    shrink_wrap(&mut func);
    let (condition, _, _) = guard_branch(&func, call).unwrap();

    let Some(Op::Binary { left, .. }) = func.value_def(condition).map(|i| &i.op) else {
        panic!("expected an or of two comparisons");
    };
    let compare = func.value_def(*left).unwrap();
    let Op::Binary { right, .. } = compare.op else {
        panic!("expected a comparison");
    };
    assert_eq!(func.value_type(right), Some(&HlirType::F32));
}

// ============================================================================
// pow
// ============================================================================

fn pow_with_constant_base(base: f64) -> (HlirFunction, InstId, ValueId) {
    let mut b = FunctionBuilder::new(FunctionId(0), "f", HlirType::Void);
    let y = b.add_param("y", HlirType::F64);
    let entry = b.create_block("entry");
    b.switch_to_block(entry);
    let c = b.build_f64(base);
    let (call, _) = b.build_call("pow", vec![c, y], HlirType::F64);
    b.build_return(None);
    (b.build(), call, y)
}

#[test]
fn test_pow_constant_base() {
    let (mut func, call, y) = pow_with_constant_base(2.0);
    let stats = shrink_wrap(&mut func);
    assert_eq!(stats.wrapped_one_cond, 1);

    let (condition, _, _) = guard_branch(&func, call).unwrap();
    for v in sample_points() {
        assert_eq!(guard_holds(&func, condition, &[(y, v)]), v > 127.0);
    }
}

#[test]
fn test_pow_constant_base_out_of_range() {
    for base in [300.0, 0.5, -2.0, f64::NAN] {
        let (mut func, _, _) = pow_with_constant_base(base);
        let before = func.to_string();
        let stats = shrink_wrap(&mut func);
        assert_eq!(stats.total(), 0, "pow({}, y) was wrapped", base);
        assert_eq!(func.to_string(), before);
    }
}

#[test]
fn test_pow_integer_derived_base() {
    for (source, limit) in [
        (HlirType::I8, 128.0),
        (HlirType::U16, 64.0),
        (HlirType::I32, 32.0),
    ] {
        let mut b = FunctionBuilder::new(FunctionId(0), "f", HlirType::Void);
        let n = b.add_param("n", source.clone());
        let y = b.add_param("y", HlirType::F64);
        let entry = b.create_block("entry");
        b.switch_to_block(entry);
        let base = b.build_cast(n, source, HlirType::F64);
        let (call, _) = b.build_call("pow", vec![base, y], HlirType::F64);
        b.build_return(None);
        let mut func = b.build();

        let stats = shrink_wrap(&mut func);
        assert_eq!(stats.wrapped_two_cond, 1);
        let (condition, _, _) = guard_branch(&func, call).unwrap();
        for nv in [-5.0, 0.0, 1.0, 100.0] {
            for yv in sample_points() {
                assert_eq!(
                    guard_holds(&func, condition, &[(n, nv), (y, yv)]),
                    nv <= 0.0 || yv > limit,
                    "pow(n = {}, y = {})",
                    nv,
                    yv
                );
            }
        }
    }
}

#[test]
fn test_pow_wide_integer_base_untouched() {
    let mut b = FunctionBuilder::new(FunctionId(0), "f", HlirType::Void);
    let n = b.add_param("n", HlirType::I64);
    let y = b.add_param("y", HlirType::F64);
    let entry = b.create_block("entry");
    b.switch_to_block(entry);
    let base = b.build_cast(n, HlirType::I64, HlirType::F64);
    b.build_call("pow", vec![base, y], HlirType::F64);
    b.build_return(None);
    let mut func = b.build();

    assert_eq!(shrink_wrap(&mut func).total(), 0);
    assert_eq!(func.blocks.len(), 1);
}

#[test]
fn test_powf_untouched() {
    let mut b = FunctionBuilder::new(FunctionId(0), "f", HlirType::Void);
    let y = b.add_param("y", HlirType::F32);
    let entry = b.create_block("entry");
    b.switch_to_block(entry);
    let c = b.build_float(2.0, HlirType::F32);
    b.build_call("powf", vec![c, y], HlirType::F32);
    b.build_return(None);
    let mut func = b.build();

    assert_eq!(shrink_wrap(&mut func).total(), 0);
}

// ============================================================================
// Safety and gating
// ============================================================================

#[test]
fn test_result_stays_unused() {
    let (mut func, call, _) = unused_unary_call("acosh", HlirType::F64);
    let result = func.get_inst(call).unwrap().result.unwrap();
    assert_eq!(func.use_count(result), 0);
    shrink_wrap(&mut func);
    assert_eq!(func.use_count(result), 0);
}

#[test]
fn test_used_calls_unchanged() {
    let mut b = FunctionBuilder::new(FunctionId(0), "f", HlirType::F64);
    let x = b.add_param("x", HlirType::F64);
    let entry = b.create_block("entry");
    b.switch_to_block(entry);
    let (_, a) = b.build_call("sqrt", vec![x], HlirType::F64);
    let (_, c) = b.build_call("exp", vec![a], HlirType::F64);
    b.build_return(Some(c));
    let mut func = b.build();
    let before = func.to_string();

    assert_eq!(shrink_wrap(&mut func).total(), 0);
    assert_eq!(func.to_string(), before);
}

#[test]
fn test_flag_gating() {
    let (mut sqrt, _, _) = unused_unary_call("sqrt", HlirType::F64);
    let stats = shrink_wrap_with(&mut sqrt, ShrinkWrapConfig::with_classes(false, true, true));
    assert_eq!(stats.total(), 0);
    assert_eq!(sqrt.blocks.len(), 1);

    let (mut atanh, _, _) = unused_unary_call("atanh", HlirType::F64);
    let stats = shrink_wrap_with(&mut atanh, ShrinkWrapConfig::with_classes(true, true, false));
    assert_eq!(stats.total(), 0);
    assert_eq!(atanh.blocks.len(), 1);

    let (mut pow, _, _) = pow_with_constant_base(2.0);
    let stats = shrink_wrap_with(&mut pow, ShrinkWrapConfig::with_classes(true, false, true));
    assert_eq!(stats.total(), 0);
}

#[test]
fn test_unavailable_routine_untouched() {
    let (mut func, _, _) = unused_unary_call("exp10", HlirType::F64);
    let tli = TargetLibraryInfo::for_triple("x86_64-apple-darwin");
    let pass = ShrinkWrapPass::new(&tli, ShrinkWrapConfig::default());
    let mut stats = ShrinkWrapStats::new();
    assert!(!pass.run_on_function(&mut func, &mut stats).unwrap());

    let tli = TargetLibraryInfo::for_triple("x86_64-unknown-linux-gnu");
    let pass = ShrinkWrapPass::new(&tli, ShrinkWrapConfig::default());
    assert!(pass.run_on_function(&mut func, &mut stats).unwrap());
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn test_selection_is_idempotent() {
    let mut b = FunctionBuilder::new(FunctionId(0), "f", HlirType::Void);
    let x = b.add_param("x", HlirType::F64);
    let entry = b.create_block("entry");
    b.switch_to_block(entry);
    for name in ["sqrt", "fabs", "exp", "log", "cbrt", "tan", "asin"] {
        b.build_call(name, vec![x], HlirType::F64);
    }
    b.build_return(None);
    let func = b.build();

    let tli = TargetLibraryInfo::new();
    let first = collect_candidates(&func, &tli);
    let second = collect_candidates(&func, &tli);
    assert_eq!(first, second);
    assert_eq!(first.len(), 7);
}

// ============================================================================
// CFG shape
// ============================================================================

/// entry -> (left | right) -> join, with `sqrt` in `left` and a phi in `join`
fn diamond() -> (HlirFunction, InstId, BlockId, BlockId) {
    let mut b = FunctionBuilder::new(FunctionId(0), "f", HlirType::F64);
    let x = b.add_param("x", HlirType::F64);
    let entry = b.create_block("entry");
    let left = b.create_block("left");
    let right = b.create_block("right");
    let join = b.create_block("join");

    b.switch_to_block(entry);
    let zero = b.build_f64(0.0);
    let c = b.build_fogt(x, zero);
    b.build_cond_branch(c, left, right);

    b.switch_to_block(left);
    let l = b.build_fadd(x, x, HlirType::F64);
    let (call, _) = b.build_call("sqrt", vec![l], HlirType::F64);
    b.build_branch(join);

    b.switch_to_block(right);
    let r = b.build_fmul(x, x, HlirType::F64);
    b.build_branch(join);

    b.switch_to_block(join);
    let p = b.build_phi(vec![(left, l), (right, r)], HlirType::F64);
    b.build_return(Some(p));

    (b.build(), call, left, join)
}

fn reachable(func: &HlirFunction, from: BlockId, to: BlockId) -> bool {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([from]);
    while let Some(block) = queue.pop_front() {
        if !seen.insert(block) {
            continue;
        }
        for (s, t) in func.edges() {
            if s == block {
                if t == to {
                    return true;
                }
                queue.push_back(t);
            }
        }
    }
    false
}

fn cond_branch_count(func: &HlirFunction) -> usize {
    func.blocks
        .iter()
        .filter(|b| matches!(b.terminator, HlirTerminator::CondBranch { .. }))
        .count()
}

#[test]
fn test_cfg_shape() {
    let (mut func, call, left, join) = diamond();
    let original_edges = func.edges();
    let blocks_before = func.blocks.len();
    let branches_before = cond_branch_count(&func);

    let stats = shrink_wrap(&mut func);
    assert_eq!(stats.total(), 1);
    assert_eq!(func.blocks.len(), blocks_before + 2);
    assert_eq!(cond_branch_count(&func), branches_before + 1);

    let holders: Vec<_> = func
        .blocks
        .iter()
        .filter(|b| b.instructions.iter().any(|i| i.id == call))
        .collect();
    assert_eq!(holders.len(), 1);
    assert_eq!(holders[0].instructions.len(), 1);

    for (s, t) in original_edges {
        assert!(reachable(&func, s, t), "edge {} -> {} lost", s, t);
    }

    // The phi now receives `left`'s value from the tail of the split block
    let (_, _, end) = guard_branch(&func, call).unwrap();
    let join_block = func.get_block(join).unwrap();
    let Op::Phi { incoming } = &join_block.instructions[0].op else {
        panic!("expected phi");
    };
    assert!(incoming.iter().any(|(b, _)| *b == end));
    assert!(incoming.iter().all(|(b, _)| *b != left));
}

#[test]
fn test_branch_weights() {
    let (mut func, call, _) = unused_unary_call("sqrt", HlirType::F64);
    shrink_wrap(&mut func);
    let call_block = func.inst_block(call).unwrap();

    let weights = func
        .blocks
        .iter()
        .find_map(|b| match b.terminator {
            HlirTerminator::CondBranch {
                then_block,
                weights,
                ..
            } if then_block == call_block => weights,
            _ => None,
        })
        .unwrap();
    assert_eq!(weights.else_weight, 2000 * weights.then_weight);
    assert!(weights.then_probability() < 0.001);
}

#[test]
fn test_long_block_of_calls() {
    let mut b = FunctionBuilder::new(FunctionId(0), "many", HlirType::Void);
    let x = b.add_param("x", HlirType::F64);
    let entry = b.create_block("entry");
    b.switch_to_block(entry);
    let calls: Vec<InstId> = (0..300)
        .map(|i| {
            let name = if i % 2 == 0 { "sqrt" } else { "acos" };
            b.build_call(name, vec![x], HlirType::F64).0
        })
        .collect();
    b.build_return(None);
    let mut func = b.build();

    let stats = shrink_wrap(&mut func);
    assert_eq!(stats.total(), 300);
    assert_eq!(func.blocks.len(), 1 + 2 * 300);

    for call in &calls {
        let (index, position) = func.inst_position(*call).unwrap();
        assert_eq!(position, 0);
        assert_eq!(func.blocks[index].instructions.len(), 1);
        assert!(guard_branch(&func, *call).is_some());
    }

    let again = shrink_wrap(&mut func);
    assert_eq!(again.total(), 0);
}

// ============================================================================
// Module driver and JSON interface
// ============================================================================

#[test]
fn test_module_json_roundtrip_then_run() {
    let mut m = ModuleBuilder::new("m");
    m.add_function(unused_unary_call("log1pl", HlirType::F80).0);
    m.add_function(unused_unary_call("coshf", HlirType::F32).0);
    let json = serde_json::to_string(&m.build()).unwrap();

    let mut module: HlirModule = serde_json::from_str(&json).unwrap();
    module.sync_id_counters();

    let tli = TargetLibraryInfo::new();
    let pass = ShrinkWrapPass::new(&tli, ShrinkWrapConfig::default());
    let mut stats = ShrinkWrapStats::new();
    let preserved = pass.run_on_module(&mut module, &mut stats).unwrap();

    assert_eq!(preserved, PreservedAnalyses::None);
    assert_eq!(stats.wrapped_one_cond, 1);
    assert_eq!(stats.wrapped_two_cond, 1);
    for func in &module.functions {
        assert_eq!(func.blocks.len(), 3);
    }
}
