//! Candidate selection
//!
//! One forward scan over the function collects the calls that could be
//! shrink-wrapped: direct calls to a known, available library routine whose
//! result is never used and whose first argument is a float of a recognized
//! precision.

use crate::hlir::{HlirFunction, HlirInstr, HlirType, InstId, Op, ValueId};
use crate::libfunc::{LibFunc, LibraryOracle};

/// A worklist entry: a call instruction and the routine it calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub inst: InstId,
    pub func: LibFunc,
}

/// Read-only view of a candidate call
#[derive(Debug, Clone)]
pub struct CallSite<'a> {
    pub inst: InstId,
    pub func: LibFunc,
    pub args: &'a [ValueId],
    /// Type of the first argument
    pub arg_ty: &'a HlirType,
}

impl<'a> CallSite<'a> {
    /// Re-read a candidate from the function. `None` if the handle went stale.
    pub fn resolve(function: &'a HlirFunction, candidate: Candidate) -> Option<Self> {
        let instr = function.get_inst(candidate.inst)?;
        let Op::CallDirect { args, .. } = &instr.op else {
            return None;
        };
        let arg_ty = function.value_type(*args.first()?)?;
        Some(Self {
            inst: candidate.inst,
            func: candidate.func,
            args,
            arg_ty,
        })
    }

    /// First argument
    pub fn arg(&self) -> ValueId {
        self.args[0]
    }
}

/// Collect shrink-wrap candidates in order of appearance
pub fn collect_candidates<O: LibraryOracle + ?Sized>(
    function: &HlirFunction,
    oracle: &O,
) -> Vec<Candidate> {
    let uses = function.use_counts();
    function
        .instructions()
        .filter_map(|(_, instr)| {
            let unused = instr
                .result
                .is_none_or(|r| uses.get(&r).copied().unwrap_or(0) == 0);
            if !unused {
                return None;
            }
            check_candidate(function, instr, oracle)
        })
        .collect()
}

fn check_candidate<O: LibraryOracle + ?Sized>(
    function: &HlirFunction,
    instr: &HlirInstr,
    oracle: &O,
) -> Option<Candidate> {
    let Op::CallDirect {
        name,
        args,
        no_builtin,
    } = &instr.op
    else {
        return None;
    };
    if *no_builtin {
        return None;
    }

    let func = oracle.resolve(name)?;
    if !oracle.is_available(func) || args.len() != func.arity() {
        return None;
    }

    // TODO: accept IEEE quad and PPC double-double `long double` once HlirType models them
    let arg_ty = function.value_type(*args.first()?)?;
    arg_ty.float_precision()?;

    Some(Candidate {
        inst: instr.id,
        func,
    })
}
