//! Guarded region rewriting
//!
//! Moves a call behind its guard:
//!
//! ```text
//! head:                         head:
//!   ...                           ...
//!   call @sqrt(%x)      ==>       %c = fcmp olt %x, 0.0
//!   rest                          br %c, cdce.call, cdce.end !weights(1, 2000)
//!   <term>                      cdce.call:
//!                                 call @sqrt(%x)
//!                                 br cdce.end
//!                               cdce.end:
//!                                 rest
//!                                 <term>
//! ```

use super::condition::{Guard, widened_threshold};
use crate::hlir::{
    BinaryOp, BlockId, BranchWeights, CfgError, HlirFunction, HlirTerminator, HlirType, InstId,
    Op, ValueId,
};
use tracing::trace;

/// The call block is expected to run once per 2001 executions.
pub const SHRINK_WRAP_WEIGHTS: BranchWeights = BranchWeights::new(1, 2000);

pub const CALL_BLOCK_LABEL: &str = "cdce.call";
pub const END_BLOCK_LABEL: &str = "cdce.end";

/// Blocks produced by wrapping one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardedRegion {
    /// Original block; now ends with the guard branch
    pub head: BlockId,
    /// New block holding only the call
    pub call_block: BlockId,
    /// New block holding everything that followed the call
    pub end_block: BlockId,
    /// The materialized guard
    pub condition: ValueId,
}

/// Lower a guard to instructions appended at the end of `block`
pub fn materialize_guard(
    func: &mut HlirFunction,
    block: BlockId,
    guard: &Guard,
) -> Result<ValueId, CfgError> {
    match guard {
        Guard::Compare {
            pred,
            operand,
            ty,
            threshold,
        } => {
            let constant = func.append_inst(
                block,
                Op::Const(widened_threshold(*threshold, ty)),
                ty.clone(),
            )?;
            func.append_inst(
                block,
                Op::Binary {
                    op: pred.binary_op(),
                    left: *operand,
                    right: constant,
                },
                HlirType::Bool,
            )
        }
        Guard::Or(lhs, rhs) => {
            let left = materialize_guard(func, block, lhs)?;
            let right = materialize_guard(func, block, rhs)?;
            func.append_inst(
                block,
                Op::Binary {
                    op: BinaryOp::Or,
                    left,
                    right,
                },
                HlirType::Bool,
            )
        }
    }
}

/// Whether `call` already sits in a shrink-wrap region.
///
/// This is a shape test only: `call` is the sole instruction of a block that
/// branches to some `end`, and the block laid out just before it ends in a
/// 1:2000 conditional branch whose then edge enters that block and whose else
/// edge enters `end`. The guard condition is not compared, so a hand-built
/// block of the same shape counts as wrapped.
fn is_already_wrapped(func: &HlirFunction, call: InstId) -> bool {
    let Some((index, _)) = func.inst_position(call) else {
        return false;
    };
    let block = &func.blocks[index];
    let HlirTerminator::Branch(end) = block.terminator else {
        return false;
    };
    if block.instructions.len() != 1 || index == 0 {
        return false;
    }

    matches!(
        &func.blocks[index - 1].terminator,
        HlirTerminator::CondBranch {
            then_block,
            else_block,
            weights: Some(weights),
            ..
        } if *then_block == block.id && *else_block == end && *weights == SHRINK_WRAP_WEIGHTS
    )
}

/// Put `call` behind `guard`.
///
/// Returns `Ok(None)` without touching the function if the call is already
/// wrapped. The call instruction is moved, never copied or removed.
pub fn shrink_wrap_call(
    func: &mut HlirFunction,
    call: InstId,
    guard: Guard,
) -> Result<Option<GuardedRegion>, CfgError> {
    if is_already_wrapped(func, call) {
        trace!("call {:?} is already shrink-wrapped", call);
        return Ok(None);
    }

    let head = func
        .inst_block(call)
        .ok_or_else(|| CfgError::UnknownInst(call, func.name.clone()))?;
    let end_block = func.split_block_before(call, END_BLOCK_LABEL)?;

    let condition = materialize_guard(func, head, &guard)?;
    let call_block = func.insert_block_after(head, CALL_BLOCK_LABEL)?;
    func.set_terminator(call_block, HlirTerminator::Branch(end_block))?;
    func.set_terminator(
        head,
        HlirTerminator::CondBranch {
            condition,
            then_block: call_block,
            else_block: end_block,
            weights: Some(SHRINK_WRAP_WEIGHTS),
        },
    )?;
    func.move_inst_to_block_start(call, call_block)?;

    if tracing::enabled!(tracing::Level::TRACE) {
        for id in [head, call_block, end_block] {
            if let Some(block) = func.get_block(id) {
                trace!("== Basic Block After ==\n{}", block);
            }
        }
    }

    Ok(Some(GuardedRegion {
        head,
        call_block,
        end_block,
        condition,
    }))
}
