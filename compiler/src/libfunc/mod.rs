//! Library function identities
//!
//! [`LibFunc`] names the C math routines the optimizer knows about, one
//! variant per precision (`sqrtf`, `sqrt`, `sqrtl`). A [`LibraryOracle`] maps a
//! callee symbol to its identity and says whether the target provides it.

pub mod target;

pub use target::TargetLibraryInfo;

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! lib_funcs {
    ($($variant:ident => $name:literal / $arity:literal),* $(,)?) => {
        /// A recognized math library routine
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum LibFunc {
            $($variant,)*
        }

        impl LibFunc {
            /// Every known identity, in declaration order
            pub const ALL: &'static [LibFunc] = &[$(LibFunc::$variant,)*];

            /// C symbol name
            pub fn name(self) -> &'static str {
                match self {
                    $(LibFunc::$variant => $name,)*
                }
            }

            /// Number of arguments in the C prototype
            pub fn arity(self) -> usize {
                match self {
                    $(LibFunc::$variant => $arity,)*
                }
            }
        }
    };
}

lib_funcs! {
    Acos => "acos" / 1, AcosF => "acosf" / 1, AcosL => "acosl" / 1,
    Acosh => "acosh" / 1, AcoshF => "acoshf" / 1, AcoshL => "acoshl" / 1,
    Asin => "asin" / 1, AsinF => "asinf" / 1, AsinL => "asinl" / 1,
    Atan => "atan" / 1, AtanF => "atanf" / 1, AtanL => "atanl" / 1,
    Atanh => "atanh" / 1, AtanhF => "atanhf" / 1, AtanhL => "atanhl" / 1,
    Cbrt => "cbrt" / 1, CbrtF => "cbrtf" / 1, CbrtL => "cbrtl" / 1,
    Cos => "cos" / 1, CosF => "cosf" / 1, CosL => "cosl" / 1,
    Cosh => "cosh" / 1, CoshF => "coshf" / 1, CoshL => "coshl" / 1,
    Exp => "exp" / 1, ExpF => "expf" / 1, ExpL => "expl" / 1,
    Exp10 => "exp10" / 1, Exp10F => "exp10f" / 1, Exp10L => "exp10l" / 1,
    Exp2 => "exp2" / 1, Exp2F => "exp2f" / 1, Exp2L => "exp2l" / 1,
    Expm1 => "expm1" / 1, Expm1F => "expm1f" / 1, Expm1L => "expm1l" / 1,
    Fabs => "fabs" / 1, FabsF => "fabsf" / 1, FabsL => "fabsl" / 1,
    Log => "log" / 1, LogF => "logf" / 1, LogL => "logl" / 1,
    Log10 => "log10" / 1, Log10F => "log10f" / 1, Log10L => "log10l" / 1,
    Log1p => "log1p" / 1, Log1pF => "log1pf" / 1, Log1pL => "log1pl" / 1,
    Log2 => "log2" / 1, Log2F => "log2f" / 1, Log2L => "log2l" / 1,
    Logb => "logb" / 1, LogbF => "logbf" / 1, LogbL => "logbl" / 1,
    Pow => "pow" / 2, PowF => "powf" / 2, PowL => "powl" / 2,
    Sin => "sin" / 1, SinF => "sinf" / 1, SinL => "sinl" / 1,
    Sinh => "sinh" / 1, SinhF => "sinhf" / 1, SinhL => "sinhl" / 1,
    Sqrt => "sqrt" / 1, SqrtF => "sqrtf" / 1, SqrtL => "sqrtl" / 1,
    Tan => "tan" / 1, TanF => "tanf" / 1, TanL => "tanl" / 1,
}

impl LibFunc {
    /// Look up an identity by its C symbol name
    pub fn from_name(name: &str) -> Option<LibFunc> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }
}

impl fmt::Display for LibFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps callee symbols to library identities for a given target
pub trait LibraryOracle {
    /// Identity of the routine named `symbol`, if it is a known library function
    fn resolve(&self, symbol: &str) -> Option<LibFunc>;

    /// Whether the target's C library provides `func`
    fn is_available(&self, func: LibFunc) -> bool;
}
