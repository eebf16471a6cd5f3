//! High-Level IR (HLIR) - SSA-based intermediate representation
//!
//! HLIR is the representation the shrink-wrap pass reads and rewrites. It
//! features:
//! - Static Single Assignment (SSA) form
//! - Basic blocks with explicit control flow and optional branch weights
//! - Stable instruction handles that survive block splitting
//! - JSON serialization for the command-line driver

pub mod builder;
pub mod cfg;
pub mod ir;
mod printer;

// Re-export main types
pub use builder::{FunctionBuilder, ModuleBuilder};
pub use cfg::CfgError;
pub use ir::*;
