//! Guard synthesis
//!
//! Builds the boolean condition under which a library call may set `errno`.
//! Guards are small expression trees over ordered float comparisons; the
//! rewriter lowers them to HLIR in front of the call. A guard must cover every
//! input that raises an error. It may cover more.

use super::catalog::{Bound, Bounds, ErrorProfile, FloatPredicate};
use super::select::CallSite;
use crate::hlir::{HlirConstant, HlirFunction, HlirType, Op, ValueId};
use crate::libfunc::LibFunc;
use tracing::debug;

/// Largest constant `pow` base handled; the maximum of an 8-bit unsigned integer.
const POW_MAX_CONSTANT_BASE: f64 = u8::MAX as f64;

/// With a constant base in `[1, 255]`, `pow` can only overflow past this exponent.
///
/// The bound is a heuristic tuned for glibc's `pow` and is not exact for other
/// C libraries; it is kept as is because it is conservative there too.
const POW_CONSTANT_BASE_EXPONENT_LIMIT: f32 = 127.0;

/// Condition under which a call may raise an error
#[derive(Debug, Clone, PartialEq)]
pub enum Guard {
    /// `operand <pred> threshold`, with the threshold widened to `ty`
    Compare {
        pred: FloatPredicate,
        operand: ValueId,
        ty: HlirType,
        threshold: f32,
    },
    Or(Box<Guard>, Box<Guard>),
}

impl Guard {
    pub fn compare(operand: ValueId, ty: &HlirType, bound: Bound) -> Self {
        Guard::Compare {
            pred: bound.pred,
            operand,
            ty: ty.clone(),
            threshold: bound.value,
        }
    }

    pub fn or(lhs: Guard, rhs: Guard) -> Self {
        Guard::Or(Box::new(lhs), Box::new(rhs))
    }

    /// Number of comparisons in the guard
    pub fn condition_count(&self) -> usize {
        match self {
            Guard::Compare { .. } => 1,
            Guard::Or(lhs, rhs) => lhs.condition_count() + rhs.condition_count(),
        }
    }

    /// Evaluate the guard for concrete operand values
    pub fn evaluate(&self, value_of: &impl Fn(ValueId) -> f64) -> bool {
        match self {
            Guard::Compare {
                pred,
                operand,
                threshold,
                ..
            } => pred.holds(value_of(*operand), f64::from(*threshold)),
            Guard::Or(lhs, rhs) => lhs.evaluate(value_of) || rhs.evaluate(value_of),
        }
    }
}

/// Threshold constant at the operand's precision. The threshold is widened,
/// the operand is never narrowed.
pub fn widened_threshold(threshold: f32, ty: &HlirType) -> HlirConstant {
    HlirConstant::Float(f64::from(threshold), ty.clone())
}

fn threshold_guard(site: &CallSite<'_>, bounds: Bounds) -> Guard {
    let arg = site.arg();
    match bounds {
        Bounds::One(bound) => Guard::compare(arg, site.arg_ty, bound),
        Bounds::Two(first, second) => Guard::or(
            Guard::compare(arg, site.arg_ty, first),
            Guard::compare(arg, site.arg_ty, second),
        ),
    }
}

/// Guard for routines that only raise domain errors
pub fn domain_error_guard(site: &CallSite<'_>, profile: ErrorProfile) -> Option<Guard> {
    match profile {
        ErrorProfile::OneBoundDomain(_) | ErrorProfile::TwoBoundDomain(..) => {
            Some(threshold_guard(site, profile.bounds()?))
        }
        _ => None,
    }
}

/// Guard for routines that only raise range errors
pub fn range_error_guard(site: &CallSite<'_>, profile: ErrorProfile) -> Option<Guard> {
    match profile {
        ErrorProfile::OneBoundRangeUpper(_) | ErrorProfile::TwoBoundRange { .. } => {
            Some(threshold_guard(site, profile.bounds()?))
        }
        _ => None,
    }
}

/// Guard for routines raising a combination of domain, pole and range errors
pub fn compound_error_guard(
    function: &HlirFunction,
    site: &CallSite<'_>,
    profile: ErrorProfile,
) -> Option<Guard> {
    match profile {
        ErrorProfile::CompoundSimple(bounds) => Some(threshold_guard(site, bounds)),
        ErrorProfile::CompoundPowArgShape => pow_guard(function, site),
        _ => None,
    }
}

/// Guard for `pow(x, y)`. Two shapes are handled:
///
/// 1. `x` is a constant in `[1, 255]`: `y > 127`
/// 2. `x` converts an integer to float:
///    - 8-bit source: `x <= 0 || y > 128`
///    - 16-bit source: `x <= 0 || y > 64`
///    - 32-bit source: `x <= 0 || y > 32`
///
/// The condition may hold for inputs that never set `errno`.
pub fn pow_guard(function: &HlirFunction, site: &CallSite<'_>) -> Option<Guard> {
    // TODO: powf and powl need their own exponent limits
    if site.func != LibFunc::Pow {
        debug!("Not handled {}()", site.func);
        return None;
    }

    let &[base, exponent] = site.args else {
        return None;
    };
    let base_ty = function.value_type(base)?;
    let exp_ty = function.value_type(exponent)?;
    if !base_ty.is_float() || !exp_ty.is_float() {
        debug!("Not handled pow(): non-float operands");
        return None;
    }

    match function.value_def(base).map(|instr| &instr.op) {
        Some(Op::Const(HlirConstant::Float(d, _))) => {
            if !(1.0..=POW_MAX_CONSTANT_BASE).contains(d) {
                debug!("Not handled pow(): constant base out of range");
                return None;
            }
            Some(Guard::compare(
                exponent,
                exp_ty,
                Bound::new(FloatPredicate::Ogt, POW_CONSTANT_BASE_EXPONENT_LIMIT),
            ))
        }
        Some(Op::Cast { source, target, .. }) if source.is_integer() && target.is_float() => {
            let upper = match source.size_bits() {
                8 => 128.0,
                16 => 64.0,
                32 => 32.0,
                _ => {
                    debug!("Not handled pow(): type too wide");
                    return None;
                }
            };
            Some(Guard::or(
                Guard::compare(base, base_ty, Bound::new(FloatPredicate::Ole, 0.0)),
                Guard::compare(exponent, exp_ty, Bound::new(FloatPredicate::Ogt, upper)),
            ))
        }
        Some(Op::Const(_)) => {
            debug!("Not handled pow(): non-float constant base");
            None
        }
        _ => {
            debug!("Not handled pow(): base not from integer convert");
            None
        }
    }
}
