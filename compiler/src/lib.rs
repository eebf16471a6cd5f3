//! Shrink-wrapping of dead math library calls
//!
//! Calls like `sqrt(x)` whose result is discarded survive dead code
//! elimination because the routine may set `errno`. This crate rewrites them
//! so they only execute when their argument could raise an error.
//!
//! # Architecture
//!
//! ```text
//! HLIR (JSON) → candidate selection → guard synthesis → CFG rewrite → HLIR
//! ```
//!
//! # Example
//!
//! ```
//! use shrinkwrap::hlir::{FunctionBuilder, FunctionId, HlirType};
//! use shrinkwrap::libfunc::TargetLibraryInfo;
//! use shrinkwrap::optimizer::{ShrinkWrapConfig, ShrinkWrapPass, ShrinkWrapStats};
//!
//! let mut b = FunctionBuilder::new(FunctionId(0), "f", HlirType::Void);
//! let x = b.add_param("x", HlirType::F64);
//! let entry = b.create_block("entry");
//! b.switch_to_block(entry);
//! b.build_call("sqrt", vec![x], HlirType::F64);
//! b.build_return(None);
//! let mut func = b.build();
//!
//! let tli = TargetLibraryInfo::new();
//! let pass = ShrinkWrapPass::new(&tli, ShrinkWrapConfig::default());
//! let mut stats = ShrinkWrapStats::new();
//! assert!(pass.run_on_function(&mut func, &mut stats).unwrap());
//! assert_eq!(func.blocks.len(), 3);
//! ```

pub mod hlir;
pub mod libfunc;
pub mod optimizer;

pub use hlir::{HlirFunction, HlirModule};
pub use libfunc::{LibFunc, LibraryOracle, TargetLibraryInfo};
pub use optimizer::{PreservedAnalyses, ShrinkWrapConfig, ShrinkWrapPass, ShrinkWrapStats};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
