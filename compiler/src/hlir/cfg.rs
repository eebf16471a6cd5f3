//! Control-flow graph mutation primitives
//!
//! Block splitting, block insertion and instruction relocation on an
//! [`HlirFunction`]. Every operation keeps the function in SSA form: when a
//! block is split the tail inherits the original successors and the phi nodes
//! of those successors are retargeted to the tail.

use super::ir::*;
use miette::Diagnostic;
use thiserror::Error;

/// Misuse of the CFG mutation API (stale or foreign handles)
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum CfgError {
    #[error("block {0:?} does not exist in function `{1}`")]
    #[diagnostic(code(hlir::cfg::unknown_block))]
    UnknownBlock(BlockId, String),

    #[error("instruction {0:?} does not exist in function `{1}`")]
    #[diagnostic(
        code(hlir::cfg::unknown_inst),
        help("the instruction may have been removed after its handle was taken")
    )]
    UnknownInst(InstId, String),
}

impl HlirFunction {
    fn unknown_block(&self, block: BlockId) -> CfgError {
        CfgError::UnknownBlock(block, self.name.clone())
    }

    fn unknown_inst(&self, inst: InstId) -> CfgError {
        CfgError::UnknownInst(inst, self.name.clone())
    }

    /// Insert a new, empty block immediately after `after` in the layout.
    ///
    /// The new block ends in `unreachable` until a terminator is set.
    pub fn insert_block_after(
        &mut self,
        after: BlockId,
        label: impl Into<String>,
    ) -> Result<BlockId, CfgError> {
        let index = self
            .block_index(after)
            .ok_or_else(|| self.unknown_block(after))?;
        let id = self.fresh_block_id();
        self.blocks.insert(index + 1, HlirBlock::new(id, label));
        self.reindex_blocks_from(index + 1);
        Ok(id)
    }

    /// Split the block holding `inst` immediately before it.
    ///
    /// `inst` and everything after it, including the terminator, move to a new
    /// block placed right after the original one in the layout. The original
    /// block keeps its identity (and therefore its predecessors) and ends in an
    /// unconditional branch to the new block. Returns the new block.
    pub fn split_block_before(
        &mut self,
        inst: InstId,
        label: impl Into<String>,
    ) -> Result<BlockId, CfgError> {
        let (block_index, inst_index) = self
            .inst_position(inst)
            .ok_or_else(|| self.unknown_inst(inst))?;
        let head_id = self.blocks[block_index].id;
        let tail_id = self.fresh_block_id();

        let head = &mut self.blocks[block_index];
        let moved = head.instructions.split_off(inst_index);
        let terminator = std::mem::replace(&mut head.terminator, HlirTerminator::Branch(tail_id));

        let successors = terminator.successors();
        for instr in &moved {
            self.index.insts.insert(instr.id, tail_id);
        }
        let mut tail = HlirBlock::new(tail_id, label);
        tail.instructions = moved;
        tail.terminator = terminator;
        self.blocks.insert(block_index + 1, tail);
        self.reindex_blocks_from(block_index + 1);

        for succ in successors {
            self.replace_phi_incoming_block(succ, head_id, tail_id)?;
        }

        Ok(tail_id)
    }

    /// Rewrite phi nodes in `block` so incoming edges from `old` come from `new`
    pub fn replace_phi_incoming_block(
        &mut self,
        block: BlockId,
        old: BlockId,
        new: BlockId,
    ) -> Result<(), CfgError> {
        let index = self
            .block_index(block)
            .ok_or_else(|| self.unknown_block(block))?;
        for instr in &mut self.blocks[index].instructions {
            if let Op::Phi { incoming } = &mut instr.op {
                for (pred, _) in incoming.iter_mut() {
                    if *pred == old {
                        *pred = new;
                    }
                }
            }
        }
        Ok(())
    }

    /// Detach `inst` from its block and insert it as the first instruction of `dest`
    pub fn move_inst_to_block_start(
        &mut self,
        inst: InstId,
        dest: BlockId,
    ) -> Result<(), CfgError> {
        let dest_index = self
            .block_index(dest)
            .ok_or_else(|| self.unknown_block(dest))?;
        let (block_index, inst_index) = self
            .inst_position(inst)
            .ok_or_else(|| self.unknown_inst(inst))?;

        let instr = self.blocks[block_index].instructions.remove(inst_index);
        let dest_block = &mut self.blocks[dest_index];
        let insert_at = dest_block
            .instructions
            .iter()
            .take_while(|i| matches!(i.op, Op::Phi { .. }))
            .count();
        dest_block.instructions.insert(insert_at, instr);
        self.index.insts.insert(inst, dest);
        Ok(())
    }

    /// Append a value-producing instruction at the end of `block`
    pub fn append_inst(
        &mut self,
        block: BlockId,
        op: Op,
        ty: HlirType,
    ) -> Result<ValueId, CfgError> {
        let index = self
            .block_index(block)
            .ok_or_else(|| self.unknown_block(block))?;
        let result = self.fresh_value();
        let instr = HlirInstr {
            id: self.fresh_inst_id(),
            result: Some(result),
            op,
            ty,
        };
        self.index.record_inst(block, &instr);
        self.blocks[index].instructions.push(instr);
        Ok(result)
    }

    /// Replace the terminator of `block`
    pub fn set_terminator(
        &mut self,
        block: BlockId,
        terminator: HlirTerminator,
    ) -> Result<(), CfgError> {
        let index = self
            .block_index(block)
            .ok_or_else(|| self.unknown_block(block))?;
        self.blocks[index].terminator = terminator;
        Ok(())
    }
}
