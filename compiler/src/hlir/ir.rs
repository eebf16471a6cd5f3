//! HLIR IR definitions - SSA-based intermediate representation
//!
//! This module defines the core IR types for HLIR, which uses SSA form
//! with explicit basic blocks and control flow. Blocks live in layout order
//! inside their function and are addressed by [`BlockId`]; instructions carry
//! a stable [`InstId`] so that passes can hold on to them while the
//! surrounding blocks are split and rewired.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// HLIR module - top-level compilation unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HlirModule {
    pub name: String,
    pub functions: Vec<HlirFunction>,
}

impl HlirModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
        }
    }

    /// Re-derive every function's id counters. Required after deserializing.
    pub fn sync_id_counters(&mut self) {
        for func in &mut self.functions {
            func.sync_id_counters();
        }
    }
}

/// HLIR function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HlirFunction {
    pub id: FunctionId,
    pub name: String,
    pub params: Vec<HlirParam>,
    pub return_type: HlirType,
    /// Basic blocks in layout order. The first block is the entry.
    pub blocks: Vec<HlirBlock>,
    /// Function is optimized for size; code-growing transforms must skip it.
    #[serde(default)]
    pub opt_size: bool,
    #[serde(skip)]
    pub(crate) next_block: u32,
    #[serde(skip)]
    pub(crate) next_value: u32,
    #[serde(skip)]
    pub(crate) next_inst: u32,
    #[serde(skip)]
    pub(crate) index: LayoutIndex,
}

/// Lookup hints from ids to positions.
///
/// Entries may go stale when `blocks` is edited directly. Every hit is checked
/// against the body, and a failed check falls back to a scan.
#[derive(Debug, Clone, Default)]
pub(crate) struct LayoutIndex {
    pub(crate) blocks: FxHashMap<BlockId, usize>,
    pub(crate) insts: FxHashMap<InstId, BlockId>,
    pub(crate) defs: FxHashMap<ValueId, InstId>,
}

impl LayoutIndex {
    pub(crate) fn record_inst(&mut self, block: BlockId, instr: &HlirInstr) {
        self.insts.insert(instr.id, block);
        if let Some(result) = instr.result {
            self.defs.insert(result, instr.id);
        }
    }
}

impl HlirFunction {
    pub fn new(id: FunctionId, name: impl Into<String>, return_type: HlirType) -> Self {
        Self {
            id,
            name: name.into(),
            params: Vec::new(),
            return_type,
            blocks: Vec::new(),
            opt_size: false,
            next_block: 0,
            next_value: 0,
            next_inst: 0,
            index: LayoutIndex::default(),
        }
    }

    pub fn get_block(&self, id: BlockId) -> Option<&HlirBlock> {
        self.block_index(id).map(|i| &self.blocks[i])
    }

    pub fn get_block_mut(&mut self, id: BlockId) -> Option<&mut HlirBlock> {
        self.block_index(id).map(|i| &mut self.blocks[i])
    }

    /// Position of a block in the layout
    pub fn block_index(&self, id: BlockId) -> Option<usize> {
        if let Some(&i) = self.index.blocks.get(&id)
            && self.blocks.get(i).is_some_and(|b| b.id == id)
        {
            return Some(i);
        }
        self.blocks.iter().position(|b| b.id == id)
    }

    /// Rebuild the lookup index from the body
    pub fn reindex(&mut self) {
        let mut index = LayoutIndex::default();
        for (i, block) in self.blocks.iter().enumerate() {
            index.blocks.insert(block.id, i);
            for instr in &block.instructions {
                index.record_inst(block.id, instr);
            }
        }
        self.index = index;
    }

    /// Refresh the layout positions of `blocks[from..]`
    pub(crate) fn reindex_blocks_from(&mut self, from: usize) {
        for (i, block) in self.blocks.iter().enumerate().skip(from) {
            self.index.blocks.insert(block.id, i);
        }
    }

    /// Create a fresh SSA value
    pub fn fresh_value(&mut self) -> ValueId {
        let id = ValueId(self.next_value);
        self.next_value += 1;
        id
    }

    pub fn fresh_block_id(&mut self) -> BlockId {
        let id = BlockId(self.next_block);
        self.next_block += 1;
        id
    }

    pub fn fresh_inst_id(&mut self) -> InstId {
        let id = InstId(self.next_inst);
        self.next_inst += 1;
        id
    }

    /// Bring the id counters past every id already present in the body, and
    /// rebuild the lookup index.
    ///
    /// Counters are not serialized, so a function read back from JSON must be
    /// synced before anything allocates new blocks, values or instructions.
    pub fn sync_id_counters(&mut self) {
        let mut next_block = self.next_block;
        let mut next_value = self.next_value;
        let mut next_inst = self.next_inst;

        let mut see_value = |v: ValueId| {
            if v != ValueId::UNIT {
                next_value = next_value.max(v.0 + 1);
            }
        };

        for param in &self.params {
            see_value(param.value);
        }
        for block in &self.blocks {
            next_block = next_block.max(block.id.0 + 1);
            for (value, _) in &block.params {
                see_value(*value);
            }
            for instr in &block.instructions {
                next_inst = next_inst.max(instr.id.0 + 1);
                if let Some(result) = instr.result {
                    see_value(result);
                }
            }
        }

        self.next_block = next_block;
        self.next_value = next_value;
        self.next_inst = next_inst;
        self.reindex();
    }

    /// Iterate over all instructions in layout order
    pub fn instructions(&self) -> impl Iterator<Item = (BlockId, &HlirInstr)> {
        self.blocks
            .iter()
            .flat_map(|b| b.instructions.iter().map(move |i| (b.id, i)))
    }

    /// Locate an instruction: (block index in layout, index within block)
    pub fn inst_position(&self, inst: InstId) -> Option<(usize, usize)> {
        if let Some(&block) = self.index.insts.get(&inst)
            && let Some(bi) = self.block_index(block)
            && let Some(ii) = self.blocks[bi].instructions.iter().position(|i| i.id == inst)
        {
            return Some((bi, ii));
        }
        self.blocks.iter().enumerate().find_map(|(bi, block)| {
            block
                .instructions
                .iter()
                .position(|i| i.id == inst)
                .map(|ii| (bi, ii))
        })
    }

    pub fn get_inst(&self, inst: InstId) -> Option<&HlirInstr> {
        let (bi, ii) = self.inst_position(inst)?;
        self.blocks.get(bi)?.instructions.get(ii)
    }

    /// Block currently holding an instruction
    pub fn inst_block(&self, inst: InstId) -> Option<BlockId> {
        self.inst_position(inst).map(|(bi, _)| self.blocks[bi].id)
    }

    /// The instruction defining an SSA value, if it is an instruction result
    pub fn value_def(&self, value: ValueId) -> Option<&HlirInstr> {
        if let Some(instr) = self.indexed_def(value) {
            return Some(instr);
        }
        self.instructions()
            .map(|(_, instr)| instr)
            .find(|instr| instr.result == Some(value))
    }

    fn indexed_def(&self, value: ValueId) -> Option<&HlirInstr> {
        let inst = *self.index.defs.get(&value)?;
        self.get_inst(inst).filter(|instr| instr.result == Some(value))
    }

    /// Type of an SSA value (parameter, block parameter or instruction result)
    pub fn value_type(&self, value: ValueId) -> Option<&HlirType> {
        if let Some(param) = self.params.iter().find(|p| p.value == value) {
            return Some(&param.ty);
        }
        if let Some(instr) = self.indexed_def(value) {
            return Some(&instr.ty);
        }
        for block in &self.blocks {
            if let Some((_, ty)) = block.params.iter().find(|(v, _)| *v == value) {
                return Some(ty);
            }
        }
        self.value_def(value).map(|instr| &instr.ty)
    }

    /// Count the uses of every value in the function
    pub fn use_counts(&self) -> FxHashMap<ValueId, usize> {
        let mut counts: FxHashMap<ValueId, usize> = FxHashMap::default();
        for block in &self.blocks {
            for instr in &block.instructions {
                for operand in instr.op.operands() {
                    *counts.entry(operand).or_default() += 1;
                }
            }
            for operand in block.terminator.operands() {
                *counts.entry(operand).or_default() += 1;
            }
        }
        counts
    }

    pub fn use_count(&self, value: ValueId) -> usize {
        self.use_counts().get(&value).copied().unwrap_or(0)
    }

    /// Blocks whose terminator may transfer control to `block`
    pub fn predecessors(&self, block: BlockId) -> Vec<BlockId> {
        self.blocks
            .iter()
            .filter(|b| b.terminator.successors().contains(&block))
            .map(|b| b.id)
            .collect()
    }

    /// All control-flow edges, in layout order
    pub fn edges(&self) -> Vec<(BlockId, BlockId)> {
        self.blocks
            .iter()
            .flat_map(|b| b.terminator.successors().into_iter().map(move |s| (b.id, s)))
            .collect()
    }
}

/// Function identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionId(pub u32);

/// Block identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

/// Value identifier (SSA value)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId(pub u32);

impl ValueId {
    pub const UNIT: ValueId = ValueId(u32::MAX);
}

/// Instruction identifier, stable across block splits and moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstId(pub u32);

/// HLIR parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HlirParam {
    pub value: ValueId,
    pub name: String,
    pub ty: HlirType,
}

/// HLIR type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HlirType {
    Void,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// x87 80-bit extended precision (`long double` on x86)
    F80,
    Ptr(Box<HlirType>),
}

/// Floating-point precision of a float type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatPrecision {
    Single,
    Double,
    Extended,
}

impl HlirType {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            HlirType::I8
                | HlirType::I16
                | HlirType::I32
                | HlirType::I64
                | HlirType::U8
                | HlirType::U16
                | HlirType::U32
                | HlirType::U64
        )
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            HlirType::I8 | HlirType::I16 | HlirType::I32 | HlirType::I64
        )
    }

    pub fn is_float(&self) -> bool {
        self.float_precision().is_some()
    }

    pub fn float_precision(&self) -> Option<FloatPrecision> {
        match self {
            HlirType::F32 => Some(FloatPrecision::Single),
            HlirType::F64 => Some(FloatPrecision::Double),
            HlirType::F80 => Some(FloatPrecision::Extended),
            _ => None,
        }
    }

    pub fn size_bits(&self) -> usize {
        match self {
            HlirType::Void => 0,
            HlirType::Bool => 8,
            HlirType::I8 | HlirType::U8 => 8,
            HlirType::I16 | HlirType::U16 => 16,
            HlirType::I32 | HlirType::U32 | HlirType::F32 => 32,
            HlirType::I64 | HlirType::U64 | HlirType::F64 => 64,
            HlirType::F80 => 80,
            HlirType::Ptr(_) => 64,
        }
    }
}

/// HLIR basic block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HlirBlock {
    pub id: BlockId,
    pub label: String,
    #[serde(default)]
    pub params: Vec<(ValueId, HlirType)>,
    pub instructions: Vec<HlirInstr>,
    pub terminator: HlirTerminator,
}

impl HlirBlock {
    pub fn new(id: BlockId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            params: Vec::new(),
            instructions: Vec::new(),
            terminator: HlirTerminator::Unreachable,
        }
    }
}

/// HLIR instruction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HlirInstr {
    pub id: InstId,
    pub result: Option<ValueId>,
    pub op: Op,
    pub ty: HlirType,
}

/// HLIR operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Op {
    /// Constant value
    Const(HlirConstant),
    /// Copy a value
    Copy(ValueId),
    /// Binary operation
    Binary {
        op: BinaryOp,
        left: ValueId,
        right: ValueId,
    },
    /// Unary operation
    Unary { op: UnaryOp, operand: ValueId },
    /// Indirect function call
    Call { func: ValueId, args: Vec<ValueId> },
    /// Direct function call by name
    CallDirect {
        name: String,
        args: Vec<ValueId>,
        /// Call site carries `nobuiltin`: never treat the callee as a library routine
        #[serde(default)]
        no_builtin: bool,
    },
    /// Load from memory
    Load { ptr: ValueId },
    /// Store to memory
    Store { ptr: ValueId, value: ValueId },
    /// Type cast
    Cast {
        value: ValueId,
        source: HlirType,
        target: HlirType,
    },
    /// Phi node (SSA)
    Phi { incoming: Vec<(BlockId, ValueId)> },
}

impl Op {
    /// Values read by this operation
    pub fn operands(&self) -> Vec<ValueId> {
        match self {
            Op::Const(_) => Vec::new(),
            Op::Copy(v) => vec![*v],
            Op::Binary { left, right, .. } => vec![*left, *right],
            Op::Unary { operand, .. } => vec![*operand],
            Op::Call { func, args } => std::iter::once(*func).chain(args.iter().copied()).collect(),
            Op::CallDirect { args, .. } => args.clone(),
            Op::Load { ptr } => vec![*ptr],
            Op::Store { ptr, value } => vec![*ptr, *value],
            Op::Cast { value, .. } => vec![*value],
            Op::Phi { incoming } => incoming.iter().map(|(_, v)| *v).collect(),
        }
    }
}

/// HLIR constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HlirConstant {
    Unit,
    Bool(bool),
    Int(i64, HlirType),
    Float(f64, HlirType),
    Null(HlirType),
    Undef(HlirType),
    FunctionRef(String),
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Integer arithmetic
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    // Float arithmetic
    FAdd,
    FSub,
    FMul,
    FDiv,
    // Bitwise
    And,
    Or,
    Xor,
    // Integer comparison
    Eq,
    Ne,
    SLt,
    SLe,
    SGt,
    SGe,
    // Float comparison
    FOEq,
    FONe,
    FOLt,
    FOLe,
    FOGt,
    FOGe,
}

impl BinaryOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::UDiv => "udiv",
            BinaryOp::FAdd => "fadd",
            BinaryOp::FSub => "fsub",
            BinaryOp::FMul => "fmul",
            BinaryOp::FDiv => "fdiv",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Eq => "icmp eq",
            BinaryOp::Ne => "icmp ne",
            BinaryOp::SLt => "icmp slt",
            BinaryOp::SLe => "icmp sle",
            BinaryOp::SGt => "icmp sgt",
            BinaryOp::SGe => "icmp sge",
            BinaryOp::FOEq => "fcmp oeq",
            BinaryOp::FONe => "fcmp one",
            BinaryOp::FOLt => "fcmp olt",
            BinaryOp::FOLe => "fcmp ole",
            BinaryOp::FOGt => "fcmp ogt",
            BinaryOp::FOGe => "fcmp oge",
        }
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    FNeg,
    Not,
}

/// Relative branch probabilities of a conditional branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchWeights {
    pub then_weight: u32,
    pub else_weight: u32,
}

impl BranchWeights {
    pub const fn new(then_weight: u32, else_weight: u32) -> Self {
        Self {
            then_weight,
            else_weight,
        }
    }

    /// Probability of taking the `then` edge
    pub fn then_probability(&self) -> f64 {
        let total = u64::from(self.then_weight) + u64::from(self.else_weight);
        if total == 0 {
            return 0.5;
        }
        f64::from(self.then_weight) / total as f64
    }
}

/// Block terminator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HlirTerminator {
    /// Return from function
    Return(Option<ValueId>),
    /// Unconditional branch
    Branch(BlockId),
    /// Conditional branch
    CondBranch {
        condition: ValueId,
        then_block: BlockId,
        else_block: BlockId,
        #[serde(default)]
        weights: Option<BranchWeights>,
    },
    /// Switch on integer value
    Switch {
        value: ValueId,
        default: BlockId,
        cases: Vec<(i64, BlockId)>,
    },
    /// Unreachable code
    Unreachable,
}

impl HlirTerminator {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            HlirTerminator::Return(_) | HlirTerminator::Unreachable => Vec::new(),
            HlirTerminator::Branch(target) => vec![*target],
            HlirTerminator::CondBranch {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
            HlirTerminator::Switch { default, cases, .. } => std::iter::once(*default)
                .chain(cases.iter().map(|(_, b)| *b))
                .collect(),
        }
    }

    pub fn operands(&self) -> Vec<ValueId> {
        match self {
            HlirTerminator::Return(Some(v)) => vec![*v],
            HlirTerminator::CondBranch { condition, .. } => vec![*condition],
            HlirTerminator::Switch { value, .. } => vec![*value],
            _ => Vec::new(),
        }
    }
}
