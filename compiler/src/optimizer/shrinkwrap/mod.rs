//! Library call shrink-wrapping
//!
//! A call to a math routine such as `sqrt` whose result is never used is
//! still live: the routine may write `errno`. Most inputs never raise an
//! error, though, so the call can be moved behind a cheap check of its
//! arguments:
//!
//! ```text
//! sqrt(x);    ==>    if (x < 0) sqrt(x);
//! ```
//!
//! The check is branch-weighted as very unlikely, so the common path skips the
//! call entirely.
//!
//! # Pipeline
//!
//! 1. [`select`] scans the function for unused calls to known routines.
//! 2. [`condition`] builds the guard from the routine's [`catalog`] profile.
//! 3. [`rewrite`] splits the block and moves the call behind the guard.

pub mod catalog;
pub mod condition;
pub mod config;
pub mod rewrite;
pub mod select;
pub mod stats;

pub use catalog::{ErrorClasses, ErrorProfile};
pub use condition::Guard;
pub use config::{ConfigError, ShrinkWrapConfig, TargetConfig};
pub use rewrite::{GuardedRegion, SHRINK_WRAP_WEIGHTS, shrink_wrap_call};
pub use select::{Candidate, CallSite, collect_candidates};
pub use stats::ShrinkWrapStats;

use crate::hlir::{CfgError, HlirFunction, HlirModule};
use crate::libfunc::LibraryOracle;
use condition::{compound_error_guard, domain_error_guard, range_error_guard};
use tracing::{debug, info};

/// What the caller may keep after the pass ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreservedAnalyses {
    /// Nothing changed
    All,
    /// The CFG changed; recompute everything
    None,
}

impl PreservedAnalyses {
    pub fn from_changed(changed: bool) -> Self {
        if changed {
            PreservedAnalyses::None
        } else {
            PreservedAnalyses::All
        }
    }
}

/// The shrink-wrap pass
pub struct ShrinkWrapPass<'o, O: LibraryOracle + ?Sized> {
    oracle: &'o O,
    config: ShrinkWrapConfig,
}

impl<'o, O: LibraryOracle + ?Sized> ShrinkWrapPass<'o, O> {
    pub fn new(oracle: &'o O, config: ShrinkWrapConfig) -> Self {
        Self { oracle, config }
    }

    pub fn config(&self) -> &ShrinkWrapConfig {
        &self.config
    }

    /// Shrink-wrap every eligible call in `func`. Returns whether the function
    /// changed.
    ///
    /// Functions optimized for size are left alone; the guard costs more bytes
    /// than the call.
    pub fn run_on_function(
        &self,
        func: &mut HlirFunction,
        stats: &mut ShrinkWrapStats,
    ) -> Result<bool, CfgError> {
        if func.opt_size {
            debug!("skipping `{}`: optimized for size", func.name);
            return Ok(false);
        }

        func.sync_id_counters();
        let worklist = collect_candidates(func, self.oracle);
        let mut changed = false;

        for candidate in worklist {
            debug!("CDCE calls: {}", candidate.func);
            let Some(guard) = self.guard_for(func, candidate)? else {
                continue;
            };
            let conditions = guard.condition_count();
            if shrink_wrap_call(func, candidate.inst, guard)?.is_some() {
                debug!("Transformed");
                stats.record(conditions);
                changed = true;
            }
        }

        Ok(changed)
    }

    /// Run over every function of `module`
    pub fn run_on_module(
        &self,
        module: &mut HlirModule,
        stats: &mut ShrinkWrapStats,
    ) -> Result<PreservedAnalyses, CfgError> {
        let mut changed = false;
        for func in &mut module.functions {
            changed |= self.run_on_function(func, stats)?;
        }
        info!(
            "shrink-wrapped {} call(s) in module `{}`",
            stats.total(),
            module.name
        );
        Ok(PreservedAnalyses::from_changed(changed))
    }

    /// Domain errors first, then range errors, then compound profiles.
    /// A compound profile needs every class it raises enabled.
    fn guard_for(
        &self,
        func: &HlirFunction,
        candidate: Candidate,
    ) -> Result<Option<Guard>, CfgError> {
        let site = CallSite::resolve(func, candidate)
            .ok_or_else(|| CfgError::UnknownInst(candidate.inst, func.name.clone()))?;
        let Some(profile) = catalog::profile(candidate.func) else {
            return Ok(None);
        };

        if self.config.domain_error
            && let Some(guard) = domain_error_guard(&site, profile)
        {
            return Ok(Some(guard));
        }
        if self.config.range_error
            && let Some(guard) = range_error_guard(&site, profile)
        {
            return Ok(Some(guard));
        }
        if !self.config.allows(profile.classes()) {
            return Ok(None);
        }
        Ok(compound_error_guard(func, &site, profile))
    }
}
