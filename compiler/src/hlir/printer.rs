//! Textual form of HLIR, used by `--emit hlir` and trace logging

use super::ir::*;
use std::fmt;

impl fmt::Display for HlirType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HlirType::Void => write!(f, "void"),
            HlirType::Bool => write!(f, "bool"),
            HlirType::I8 => write!(f, "i8"),
            HlirType::I16 => write!(f, "i16"),
            HlirType::I32 => write!(f, "i32"),
            HlirType::I64 => write!(f, "i64"),
            HlirType::U8 => write!(f, "u8"),
            HlirType::U16 => write!(f, "u16"),
            HlirType::U32 => write!(f, "u32"),
            HlirType::U64 => write!(f, "u64"),
            HlirType::F32 => write!(f, "f32"),
            HlirType::F64 => write!(f, "f64"),
            HlirType::F80 => write!(f, "f80"),
            HlirType::Ptr(inner) => write!(f, "*{}", inner),
        }
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == ValueId::UNIT {
            write!(f, "()")
        } else {
            write!(f, "%{}", self.0)
        }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

impl fmt::Display for HlirConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HlirConstant::Unit => write!(f, "()"),
            HlirConstant::Bool(b) => write!(f, "{}", b),
            HlirConstant::Int(v, _) => write!(f, "{}", v),
            HlirConstant::Float(v, _) => write!(f, "{:?}", v),
            HlirConstant::Null(_) => write!(f, "null"),
            HlirConstant::Undef(_) => write!(f, "undef"),
            HlirConstant::FunctionRef(name) => write!(f, "@{}", name),
        }
    }
}

fn join(values: &[ValueId]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Const(c) => write!(f, "const {}", c),
            Op::Copy(v) => write!(f, "copy {}", v),
            Op::Binary { op, left, right } => write!(f, "{} {}, {}", op.mnemonic(), left, right),
            Op::Unary { op, operand } => {
                let name = match op {
                    UnaryOp::Neg => "neg",
                    UnaryOp::FNeg => "fneg",
                    UnaryOp::Not => "not",
                };
                write!(f, "{} {}", name, operand)
            }
            Op::Call { func, args } => write!(f, "call {}({})", func, join(args)),
            Op::CallDirect {
                name,
                args,
                no_builtin,
            } => {
                write!(f, "call @{}({})", name, join(args))?;
                if *no_builtin {
                    write!(f, " nobuiltin")?;
                }
                Ok(())
            }
            Op::Load { ptr } => write!(f, "load {}", ptr),
            Op::Store { ptr, value } => write!(f, "store {}, {}", value, ptr),
            Op::Cast {
                value,
                source,
                target,
            } => write!(f, "cast {} : {} -> {}", value, source, target),
            Op::Phi { incoming } => {
                let arms = incoming
                    .iter()
                    .map(|(b, v)| format!("[{}: {}]", b, v))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "phi {}", arms)
            }
        }
    }
}

impl fmt::Display for HlirInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.result {
            Some(result) => write!(f, "{} = {} : {}", result, self.op, self.ty),
            None => write!(f, "{}", self.op),
        }
    }
}

impl fmt::Display for HlirTerminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HlirTerminator::Return(Some(v)) => write!(f, "ret {}", v),
            HlirTerminator::Return(None) => write!(f, "ret"),
            HlirTerminator::Branch(target) => write!(f, "br {}", target),
            HlirTerminator::CondBranch {
                condition,
                then_block,
                else_block,
                weights,
            } => {
                write!(f, "br {}, {}, {}", condition, then_block, else_block)?;
                if let Some(w) = weights {
                    write!(f, " !weights({}, {})", w.then_weight, w.else_weight)?;
                }
                Ok(())
            }
            HlirTerminator::Switch {
                value,
                default,
                cases,
            } => {
                write!(f, "switch {}, default {}", value, default)?;
                for (case, target) in cases {
                    write!(f, ", {} => {}", case, target)?;
                }
                Ok(())
            }
            HlirTerminator::Unreachable => write!(f, "unreachable"),
        }
    }
}

impl fmt::Display for HlirBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.label)?;
        if !self.params.is_empty() {
            let params = self
                .params
                .iter()
                .map(|(v, ty)| format!("{}: {}", v, ty))
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, "[{}]", params)?;
        }
        writeln!(f, ":")?;
        for instr in &self.instructions {
            writeln!(f, "    {}", instr)?;
        }
        writeln!(f, "    {}", self.terminator)
    }
}

impl fmt::Display for HlirFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .params
            .iter()
            .map(|p| format!("{} {}: {}", p.value, p.name, p.ty))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "fn @{}({}) -> {}", self.name, params, self.return_type)?;
        if self.opt_size {
            write!(f, " optsize")?;
        }
        writeln!(f, " {{")?;
        for block in &self.blocks {
            write!(f, "{}", block)?;
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for HlirModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module {}", self.name)?;
        for func in &self.functions {
            writeln!(f)?;
            write!(f, "{}", func)?;
        }
        Ok(())
    }
}
