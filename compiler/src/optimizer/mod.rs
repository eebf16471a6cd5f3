//! Optimization passes over HLIR

pub mod shrinkwrap;

pub use shrinkwrap::{PreservedAnalyses, ShrinkWrapConfig, ShrinkWrapPass, ShrinkWrapStats};
