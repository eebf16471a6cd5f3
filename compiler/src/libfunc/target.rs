//! Target library information
//!
//! Records which [`LibFunc`]s the target's C library provides. Everything is
//! available by default; `exp10` is a GNU extension and is only assumed
//! present for GNU environments.

use super::{LibFunc, LibraryOracle};
use rustc_hash::{FxHashMap, FxHashSet};

/// Default [`LibraryOracle`] backed by a symbol table and an availability set
#[derive(Debug, Clone)]
pub struct TargetLibraryInfo {
    symbols: FxHashMap<&'static str, LibFunc>,
    unavailable: FxHashSet<LibFunc>,
}

impl Default for TargetLibraryInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetLibraryInfo {
    /// All known routines available
    pub fn new() -> Self {
        Self {
            symbols: LibFunc::ALL.iter().map(|f| (f.name(), *f)).collect(),
            unavailable: FxHashSet::default(),
        }
    }

    /// Availability for a target triple such as `x86_64-unknown-linux-gnu`
    pub fn for_triple(triple: &str) -> Self {
        let mut info = Self::new();
        let environment = triple.rsplit('-').next().unwrap_or_default();
        if !environment.starts_with("gnu") {
            for func in [LibFunc::Exp10, LibFunc::Exp10F, LibFunc::Exp10L] {
                info.set_unavailable(func);
            }
        }
        info
    }

    pub fn set_unavailable(&mut self, func: LibFunc) {
        self.unavailable.insert(func);
    }

    pub fn set_available(&mut self, func: LibFunc) {
        self.unavailable.remove(&func);
    }

    /// Routines marked unavailable, sorted
    pub fn unavailable(&self) -> Vec<LibFunc> {
        let mut funcs: Vec<_> = self.unavailable.iter().copied().collect();
        funcs.sort();
        funcs
    }
}

impl LibraryOracle for TargetLibraryInfo {
    fn resolve(&self, symbol: &str) -> Option<LibFunc> {
        self.symbols.get(symbol).copied()
    }

    fn is_available(&self, func: LibFunc) -> bool {
        !self.unavailable.contains(&func)
    }
}
