//! HLIR Builder - convenient API for constructing HLIR
//!
//! The builder provides a high-level API for constructing HLIR functions
//! and basic blocks, managing SSA value and instruction numbering
//! automatically.

use super::ir::*;

/// Builder for constructing HLIR modules
pub struct ModuleBuilder {
    module: HlirModule,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            module: HlirModule::new(name),
        }
    }

    pub fn add_function(&mut self, func: HlirFunction) {
        self.module.functions.push(func);
    }

    pub fn build(self) -> HlirModule {
        self.module
    }
}

/// Builder for constructing HLIR functions
pub struct FunctionBuilder {
    pub func: HlirFunction,
    current_block: Option<BlockId>,
}

impl FunctionBuilder {
    pub fn new(id: FunctionId, name: impl Into<String>, return_type: HlirType) -> Self {
        Self {
            func: HlirFunction::new(id, name, return_type),
            current_block: None,
        }
    }

    /// Mark the function as optimized for size
    pub fn set_opt_size(&mut self, opt_size: bool) {
        self.func.opt_size = opt_size;
    }

    /// Add a parameter to the function
    pub fn add_param(&mut self, name: impl Into<String>, ty: HlirType) -> ValueId {
        let value = self.func.fresh_value();
        self.func.params.push(HlirParam {
            value,
            name: name.into(),
            ty,
        });
        value
    }

    /// Create a new basic block
    pub fn create_block(&mut self, label: impl Into<String>) -> BlockId {
        let id = self.func.fresh_block_id();
        self.func.index.blocks.insert(id, self.func.blocks.len());
        self.func.blocks.push(HlirBlock::new(id, label));
        id
    }

    /// Add a parameter to a block
    pub fn add_block_param(&mut self, block: BlockId, ty: HlirType) -> ValueId {
        let value = self.func.fresh_value();
        if let Some(b) = self.func.get_block_mut(block) {
            b.params.push((value, ty));
        }
        value
    }

    /// Switch to building a different block
    pub fn switch_to_block(&mut self, block: BlockId) {
        self.current_block = Some(block);
    }

    /// Get the current block ID
    pub fn current_block(&self) -> Option<BlockId> {
        self.current_block
    }

    /// Get mutable reference to current block
    fn current_block_mut(&mut self) -> &mut HlirBlock {
        let id = self.current_block.expect("No current block");
        self.func.get_block_mut(id).expect("Block not found")
    }

    // ==================== Instruction Builders ====================

    fn push(&mut self, result: Option<ValueId>, op: Op, ty: HlirType) -> InstId {
        let id = self.func.fresh_inst_id();
        self.current_block_mut()
            .instructions
            .push(HlirInstr { id, result, op, ty });
        id
    }

    fn emit(&mut self, op: Op, ty: HlirType) -> ValueId {
        let result = self.func.fresh_value();
        self.push(Some(result), op, ty);
        result
    }

    fn emit_void(&mut self, op: Op) -> InstId {
        self.push(None, op, HlirType::Void)
    }

    /// Build a constant instruction
    pub fn build_const(&mut self, constant: HlirConstant, ty: HlirType) -> ValueId {
        self.emit(Op::Const(constant), ty)
    }

    /// Build a float constant of the given float type
    pub fn build_float(&mut self, value: f64, ty: HlirType) -> ValueId {
        self.build_const(HlirConstant::Float(value, ty.clone()), ty)
    }

    /// Build a double-precision float constant
    pub fn build_f64(&mut self, value: f64) -> ValueId {
        self.build_float(value, HlirType::F64)
    }

    /// Build a binary operation
    pub fn build_binary(
        &mut self,
        op: BinaryOp,
        left: ValueId,
        right: ValueId,
        ty: HlirType,
    ) -> ValueId {
        self.emit(Op::Binary { op, left, right }, ty)
    }

    /// Build an integer add
    pub fn build_add(&mut self, left: ValueId, right: ValueId, ty: HlirType) -> ValueId {
        self.build_binary(BinaryOp::Add, left, right, ty)
    }

    /// Build a float add
    pub fn build_fadd(&mut self, left: ValueId, right: ValueId, ty: HlirType) -> ValueId {
        self.build_binary(BinaryOp::FAdd, left, right, ty)
    }

    /// Build a float multiply
    pub fn build_fmul(&mut self, left: ValueId, right: ValueId, ty: HlirType) -> ValueId {
        self.build_binary(BinaryOp::FMul, left, right, ty)
    }

    /// Build a float ordered less-than comparison
    pub fn build_folt(&mut self, left: ValueId, right: ValueId) -> ValueId {
        self.build_binary(BinaryOp::FOLt, left, right, HlirType::Bool)
    }

    /// Build a float ordered greater-than comparison
    pub fn build_fogt(&mut self, left: ValueId, right: ValueId) -> ValueId {
        self.build_binary(BinaryOp::FOGt, left, right, HlirType::Bool)
    }

    /// Build a direct function call. Returns the call instruction and its result.
    pub fn build_call(
        &mut self,
        name: impl Into<String>,
        args: Vec<ValueId>,
        ret_ty: HlirType,
    ) -> (InstId, ValueId) {
        self.build_call_with(name, args, ret_ty, false)
    }

    /// Build a direct call marked `nobuiltin`
    pub fn build_call_nobuiltin(
        &mut self,
        name: impl Into<String>,
        args: Vec<ValueId>,
        ret_ty: HlirType,
    ) -> (InstId, ValueId) {
        self.build_call_with(name, args, ret_ty, true)
    }

    fn build_call_with(
        &mut self,
        name: impl Into<String>,
        args: Vec<ValueId>,
        ret_ty: HlirType,
        no_builtin: bool,
    ) -> (InstId, ValueId) {
        let result = self.func.fresh_value();
        let inst = self.push(
            Some(result),
            Op::CallDirect {
                name: name.into(),
                args,
                no_builtin,
            },
            ret_ty,
        );
        (inst, result)
    }

    /// Build an indirect function call
    pub fn build_call_indirect(
        &mut self,
        func: ValueId,
        args: Vec<ValueId>,
        ret_ty: HlirType,
    ) -> (InstId, ValueId) {
        let result = self.func.fresh_value();
        let inst = self.push(Some(result), Op::Call { func, args }, ret_ty);
        (inst, result)
    }

    /// Build a load from memory
    pub fn build_load(&mut self, ptr: ValueId, ty: HlirType) -> ValueId {
        self.emit(Op::Load { ptr }, ty)
    }

    /// Build a store to memory
    pub fn build_store(&mut self, ptr: ValueId, value: ValueId) -> InstId {
        self.emit_void(Op::Store { ptr, value })
    }

    /// Build a type cast
    pub fn build_cast(&mut self, value: ValueId, source: HlirType, target: HlirType) -> ValueId {
        self.emit(
            Op::Cast {
                value,
                source,
                target: target.clone(),
            },
            target,
        )
    }

    /// Build a phi node
    pub fn build_phi(&mut self, incoming: Vec<(BlockId, ValueId)>, ty: HlirType) -> ValueId {
        self.emit(Op::Phi { incoming }, ty)
    }

    // ==================== Terminator Builders ====================

    /// Set the terminator for the current block
    fn set_terminator(&mut self, term: HlirTerminator) {
        self.current_block_mut().terminator = term;
    }

    /// Build a return
    pub fn build_return(&mut self, value: Option<ValueId>) {
        self.set_terminator(HlirTerminator::Return(value));
    }

    /// Build an unconditional branch
    pub fn build_branch(&mut self, target: BlockId) {
        self.set_terminator(HlirTerminator::Branch(target));
    }

    /// Build a conditional branch
    pub fn build_cond_branch(
        &mut self,
        condition: ValueId,
        then_block: BlockId,
        else_block: BlockId,
    ) {
        self.set_terminator(HlirTerminator::CondBranch {
            condition,
            then_block,
            else_block,
            weights: None,
        });
    }

    /// Build a switch
    pub fn build_switch(&mut self, value: ValueId, default: BlockId, cases: Vec<(i64, BlockId)>) {
        self.set_terminator(HlirTerminator::Switch {
            value,
            default,
            cases,
        });
    }

    /// Mark block as unreachable
    pub fn build_unreachable(&mut self) {
        self.set_terminator(HlirTerminator::Unreachable);
    }

    /// Finish building the function
    pub fn build(self) -> HlirFunction {
        let mut func = self.func;
        func.reindex();
        func
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_simple_function() {
        let mut builder = FunctionBuilder::new(FunctionId(0), "add", HlirType::I64);
        let a = builder.add_param("a", HlirType::I64);
        let b = builder.add_param("b", HlirType::I64);

        let entry = builder.create_block("entry");
        builder.switch_to_block(entry);

        let sum = builder.build_add(a, b, HlirType::I64);
        builder.build_return(Some(sum));

        let func = builder.build();
        assert_eq!(func.name, "add");
        assert_eq!(func.params.len(), 2);
        assert_eq!(func.blocks.len(), 1);
        assert_eq!(func.value_type(sum), Some(&HlirType::I64));
    }

    #[test]
    fn test_build_conditional() {
        let mut builder = FunctionBuilder::new(FunctionId(0), "clamp", HlirType::F64);
        let x = builder.add_param("x", HlirType::F64);

        let entry = builder.create_block("entry");
        let then_block = builder.create_block("then");
        let else_block = builder.create_block("else");

        builder.switch_to_block(entry);
        let zero = builder.build_f64(0.0);
        let is_neg = builder.build_folt(x, zero);
        builder.build_cond_branch(is_neg, then_block, else_block);

        builder.switch_to_block(then_block);
        builder.build_return(Some(zero));

        builder.switch_to_block(else_block);
        builder.build_return(Some(x));

        let func = builder.build();
        assert_eq!(func.blocks.len(), 3);
        assert_eq!(func.predecessors(then_block), vec![entry]);
        assert_eq!(func.use_count(x), 2);
    }

    #[test]
    fn test_call_ids_are_stable() {
        let mut builder = FunctionBuilder::new(FunctionId(0), "f", HlirType::Void);
        let x = builder.add_param("x", HlirType::F64);
        let entry = builder.create_block("entry");
        builder.switch_to_block(entry);
        let (first, _) = builder.build_call("sqrt", vec![x], HlirType::F64);
        let (second, _) = builder.build_call("sqrt", vec![x], HlirType::F64);
        builder.build_return(None);

        let func = builder.build();
        assert_ne!(first, second);
        assert_eq!(func.inst_position(second), Some((0, 1)));
        assert_eq!(func.inst_block(first), Some(entry));
    }

    #[test]
    fn test_block_params_and_memory() {
        let ptr_ty = HlirType::Ptr(Box::new(HlirType::F64));
        let mut builder = FunctionBuilder::new(FunctionId(0), "select", HlirType::Void);
        builder.set_opt_size(true);
        let slot = builder.add_param("slot", ptr_ty);
        let tag = builder.add_param("tag", HlirType::I32);

        let entry = builder.create_block("entry");
        let store = builder.create_block("store");
        let trap = builder.create_block("trap");
        let carried = builder.add_block_param(store, HlirType::F64);

        builder.switch_to_block(entry);
        builder.build_switch(tag, trap, vec![(0, store), (1, store)]);

        builder.switch_to_block(store);
        let old = builder.build_load(slot, HlirType::F64);
        let sum = builder.build_fadd(old, carried, HlirType::F64);
        let write = builder.build_store(slot, sum);
        builder.build_return(None);

        builder.switch_to_block(trap);
        builder.build_unreachable();

        let func = builder.build();
        assert!(func.opt_size);
        assert_eq!(func.value_type(carried), Some(&HlirType::F64));
        assert_eq!(func.value_type(old), Some(&HlirType::F64));
        assert_eq!(func.use_count(slot), 2);
        assert_eq!(func.get_inst(write).unwrap().result, None);
        assert_eq!(func.predecessors(store), vec![entry]);
        assert!(matches!(
            func.get_block(trap).unwrap().terminator,
            HlirTerminator::Unreachable
        ));
    }

    #[test]
    fn test_sync_id_counters_after_clone_roundtrip() {
        let mut builder = FunctionBuilder::new(FunctionId(0), "f", HlirType::Void);
        let x = builder.add_param("x", HlirType::F64);
        let entry = builder.create_block("entry");
        builder.switch_to_block(entry);
        builder.build_call("sin", vec![x], HlirType::F64);
        builder.build_return(None);
        let func = builder.build();

        let json = serde_json::to_string(&func).unwrap();
        let mut restored: HlirFunction = serde_json::from_str(&json).unwrap();
        restored.sync_id_counters();
        assert_eq!(restored.fresh_value(), ValueId(2));
        assert_eq!(restored.fresh_block_id(), BlockId(1));
        assert_eq!(restored.fresh_inst_id(), InstId(1));
    }
}
