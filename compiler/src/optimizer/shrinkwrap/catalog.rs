//! Error profiles of the C math routines
//!
//! For every routine whose `errno` behavior depends only on its arguments, the
//! catalog records which class of error it can raise (domain, pole, range)
//! and the argument thresholds that trigger it. Thresholds are conservative
//! single-precision magnitudes taken from the glibc documentation and observed
//! behavior; callers widen them to the argument's precision.

use crate::hlir::BinaryOp;
use crate::libfunc::LibFunc;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::LazyLock;

/// Ordered floating-point comparison. False whenever either operand is NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatPredicate {
    Oeq,
    Olt,
    Ole,
    Ogt,
    Oge,
}

impl FloatPredicate {
    pub fn binary_op(self) -> BinaryOp {
        match self {
            FloatPredicate::Oeq => BinaryOp::FOEq,
            FloatPredicate::Olt => BinaryOp::FOLt,
            FloatPredicate::Ole => BinaryOp::FOLe,
            FloatPredicate::Ogt => BinaryOp::FOGt,
            FloatPredicate::Oge => BinaryOp::FOGe,
        }
    }

    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            FloatPredicate::Oeq => lhs == rhs,
            FloatPredicate::Olt => lhs < rhs,
            FloatPredicate::Ole => lhs <= rhs,
            FloatPredicate::Ogt => lhs > rhs,
            FloatPredicate::Oge => lhs >= rhs,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            FloatPredicate::Oeq => "==",
            FloatPredicate::Olt => "<",
            FloatPredicate::Ole => "<=",
            FloatPredicate::Ogt => ">",
            FloatPredicate::Oge => ">=",
        }
    }
}

/// `arg <pred> value`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub pred: FloatPredicate,
    pub value: f32,
}

impl Bound {
    pub const fn new(pred: FloatPredicate, value: f32) -> Self {
        Self { pred, value }
    }
}

pub(crate) const fn lt(value: f32) -> Bound {
    Bound::new(FloatPredicate::Olt, value)
}

pub(crate) const fn le(value: f32) -> Bound {
    Bound::new(FloatPredicate::Ole, value)
}

pub(crate) const fn gt(value: f32) -> Bound {
    Bound::new(FloatPredicate::Ogt, value)
}

const fn ge(value: f32) -> Bound {
    Bound::new(FloatPredicate::Oge, value)
}

const fn eq(value: f32) -> Bound {
    Bound::new(FloatPredicate::Oeq, value)
}

/// One bound, or the disjunction of two
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bounds {
    One(Bound),
    Two(Bound, Bound),
}

/// Classes of error a routine can raise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ErrorClasses {
    pub domain: bool,
    pub range: bool,
    pub pole: bool,
}

impl ErrorClasses {
    pub const DOMAIN: ErrorClasses = ErrorClasses {
        domain: true,
        range: false,
        pole: false,
    };
    pub const RANGE: ErrorClasses = ErrorClasses {
        domain: false,
        range: true,
        pole: false,
    };
    pub const DOMAIN_POLE: ErrorClasses = ErrorClasses {
        domain: true,
        range: false,
        pole: true,
    };
    pub const ALL: ErrorClasses = ErrorClasses {
        domain: true,
        range: true,
        pole: true,
    };
}

/// How a routine's error condition is described
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorProfile {
    /// Domain error on one side: `x < 0` for `sqrt`
    OneBoundDomain(Bound),
    /// Domain error on either side: `x < -1 || x > 1` for `acos`
    TwoBoundDomain(Bound, Bound),
    /// Overflow only: `x > 709` for `expm1`
    OneBoundRangeUpper(Bound),
    /// Overflow or underflow: `x > 709 || x < -745` for `exp`
    TwoBoundRange { upper: Bound, lower: Bound },
    /// Domain and pole errors folded into one condition
    CompoundSimple(Bounds),
    /// `pow`: domain, pole and range errors, decided by argument shape
    CompoundPowArgShape,
}

impl ErrorProfile {
    /// Error classes that must all be enabled before the routine may be wrapped
    pub fn classes(&self) -> ErrorClasses {
        match self {
            ErrorProfile::OneBoundDomain(_) | ErrorProfile::TwoBoundDomain(..) => {
                ErrorClasses::DOMAIN
            }
            ErrorProfile::OneBoundRangeUpper(_) | ErrorProfile::TwoBoundRange { .. } => {
                ErrorClasses::RANGE
            }
            ErrorProfile::CompoundSimple(_) => ErrorClasses::DOMAIN_POLE,
            ErrorProfile::CompoundPowArgShape => ErrorClasses::ALL,
        }
    }

    /// Argument thresholds, for every profile that is threshold-only
    pub fn bounds(&self) -> Option<Bounds> {
        match *self {
            ErrorProfile::OneBoundDomain(b) | ErrorProfile::OneBoundRangeUpper(b) => {
                Some(Bounds::One(b))
            }
            ErrorProfile::TwoBoundDomain(first, second) => Some(Bounds::Two(first, second)),
            ErrorProfile::TwoBoundRange { upper, lower } => Some(Bounds::Two(upper, lower)),
            ErrorProfile::CompoundSimple(bounds) => Some(bounds),
            ErrorProfile::CompoundPowArgShape => None,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x {} {}", self.pred.symbol(), self.value)
    }
}

impl fmt::Display for ErrorProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ErrorProfile::OneBoundDomain(_) | ErrorProfile::TwoBoundDomain(..) => "domain",
            ErrorProfile::OneBoundRangeUpper(_) | ErrorProfile::TwoBoundRange { .. } => "range",
            ErrorProfile::CompoundSimple(_) => "domain+pole",
            ErrorProfile::CompoundPowArgShape => "domain+pole+range",
        };
        match self.bounds() {
            Some(Bounds::One(b)) => write!(f, "{}: {}", kind, b),
            Some(Bounds::Two(a, b)) => write!(f, "{}: {} || {}", kind, a, b),
            None => write!(f, "{}: depends on argument shape", kind),
        }
    }
}

/// A catalog row
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub func: LibFunc,
    pub profile: ErrorProfile,
}

const fn entry(func: LibFunc, profile: ErrorProfile) -> CatalogEntry {
    CatalogEntry { func, profile }
}

const fn range(lower: f32, upper: f32) -> ErrorProfile {
    ErrorProfile::TwoBoundRange {
        upper: gt(upper),
        lower: lt(lower),
    }
}

const UNIT_INTERVAL: ErrorProfile = ErrorProfile::TwoBoundDomain(lt(-1.0), gt(1.0));
const INFINITE: ErrorProfile =
    ErrorProfile::TwoBoundDomain(eq(f32::INFINITY), eq(f32::NEG_INFINITY));
const NON_POSITIVE: ErrorProfile = ErrorProfile::CompoundSimple(Bounds::One(le(0.0)));

static CATALOG: &[CatalogEntry] = &[
    // DomainError: x < -1 || x > 1
    entry(LibFunc::Acos, UNIT_INTERVAL),
    entry(LibFunc::AcosF, UNIT_INTERVAL),
    entry(LibFunc::AcosL, UNIT_INTERVAL),
    entry(LibFunc::Asin, UNIT_INTERVAL),
    entry(LibFunc::AsinF, UNIT_INTERVAL),
    entry(LibFunc::AsinL, UNIT_INTERVAL),
    // DomainError: x == +inf || x == -inf
    entry(LibFunc::Cos, INFINITE),
    entry(LibFunc::CosF, INFINITE),
    entry(LibFunc::CosL, INFINITE),
    entry(LibFunc::Sin, INFINITE),
    entry(LibFunc::SinF, INFINITE),
    entry(LibFunc::SinL, INFINITE),
    // DomainError: x < 1
    entry(LibFunc::Acosh, ErrorProfile::OneBoundDomain(lt(1.0))),
    entry(LibFunc::AcoshF, ErrorProfile::OneBoundDomain(lt(1.0))),
    entry(LibFunc::AcoshL, ErrorProfile::OneBoundDomain(lt(1.0))),
    // DomainError: x < 0
    entry(LibFunc::Sqrt, ErrorProfile::OneBoundDomain(lt(0.0))),
    entry(LibFunc::SqrtF, ErrorProfile::OneBoundDomain(lt(0.0))),
    entry(LibFunc::SqrtL, ErrorProfile::OneBoundDomain(lt(0.0))),
    // RangeError, symmetric
    entry(LibFunc::Cosh, range(-710.0, 710.0)),
    entry(LibFunc::CoshF, range(-89.0, 89.0)),
    entry(LibFunc::CoshL, range(-11357.0, 11357.0)),
    entry(LibFunc::Sinh, range(-710.0, 710.0)),
    entry(LibFunc::SinhF, range(-89.0, 89.0)),
    entry(LibFunc::SinhL, range(-11357.0, 11357.0)),
    // RangeError: underflow below, overflow above
    entry(LibFunc::Exp, range(-745.0, 709.0)),
    entry(LibFunc::ExpF, range(-103.0, 88.0)),
    entry(LibFunc::ExpL, range(-11399.0, 11356.0)),
    entry(LibFunc::Exp10, range(-323.0, 308.0)),
    entry(LibFunc::Exp10F, range(-45.0, 38.0)),
    entry(LibFunc::Exp10L, range(-4950.0, 4932.0)),
    entry(LibFunc::Exp2, range(-1074.0, 1023.0)),
    entry(LibFunc::Exp2F, range(-149.0, 127.0)),
    entry(LibFunc::Exp2L, range(-16445.0, 11383.0)),
    // RangeError: overflow only
    entry(LibFunc::Expm1, ErrorProfile::OneBoundRangeUpper(gt(709.0))),
    entry(LibFunc::Expm1F, ErrorProfile::OneBoundRangeUpper(gt(88.0))),
    entry(LibFunc::Expm1L, ErrorProfile::OneBoundRangeUpper(gt(11356.0))),
    // DomainError: x < -1 || x > 1, PoleError: x == -1 || x == 1
    entry(LibFunc::Atanh, ErrorProfile::CompoundSimple(Bounds::Two(le(-1.0), ge(1.0)))),
    entry(LibFunc::AtanhF, ErrorProfile::CompoundSimple(Bounds::Two(le(-1.0), ge(1.0)))),
    entry(LibFunc::AtanhL, ErrorProfile::CompoundSimple(Bounds::Two(le(-1.0), ge(1.0)))),
    // DomainError: x < 0, PoleError: x == 0
    entry(LibFunc::Log, NON_POSITIVE),
    entry(LibFunc::LogF, NON_POSITIVE),
    entry(LibFunc::LogL, NON_POSITIVE),
    entry(LibFunc::Log10, NON_POSITIVE),
    entry(LibFunc::Log10F, NON_POSITIVE),
    entry(LibFunc::Log10L, NON_POSITIVE),
    entry(LibFunc::Log2, NON_POSITIVE),
    entry(LibFunc::Log2F, NON_POSITIVE),
    entry(LibFunc::Log2L, NON_POSITIVE),
    entry(LibFunc::Logb, NON_POSITIVE),
    entry(LibFunc::LogbF, NON_POSITIVE),
    entry(LibFunc::LogbL, NON_POSITIVE),
    // DomainError: x < -1, PoleError: x == -1
    entry(LibFunc::Log1p, ErrorProfile::CompoundSimple(Bounds::One(le(-1.0)))),
    entry(LibFunc::Log1pF, ErrorProfile::CompoundSimple(Bounds::One(le(-1.0)))),
    entry(LibFunc::Log1pL, ErrorProfile::CompoundSimple(Bounds::One(le(-1.0)))),
    // DomainError: x < 0 and y non-integer, PoleError: x == 0 and y < 0,
    // RangeError: overflow or underflow
    entry(LibFunc::Pow, ErrorProfile::CompoundPowArgShape),
    entry(LibFunc::PowF, ErrorProfile::CompoundPowArgShape),
    entry(LibFunc::PowL, ErrorProfile::CompoundPowArgShape),
];

static INDEX: LazyLock<FxHashMap<LibFunc, ErrorProfile>> =
    LazyLock::new(|| CATALOG.iter().map(|e| (e.func, e.profile)).collect());

/// Error profile of `func`, or `None` if its errno behavior is not characterized
pub fn profile(func: LibFunc) -> Option<ErrorProfile> {
    INDEX.get(&func).copied()
}

/// All catalog rows, grouped by family
pub fn entries() -> &'static [CatalogEntry] {
    CATALOG
}
