//! CP backend interface.

use std::fmt;
use std::ops::Not;

use crate::error::BackendError;

/// A boolean literal of the CP backend.
///
/// Encodes a boolean variable and a polarity; `!lit` is the opposite
/// literal of the same variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Literal(u32);

impl Literal {
    pub fn new(var: u32, positive: bool) -> Self {
        Literal((var << 1) | u32::from(!positive))
    }

    /// Index of the underlying boolean variable.
    pub fn var(self) -> u32 {
        self.0 >> 1
    }

    pub fn is_positive(self) -> bool {
        self.0 & 1 == 0
    }
}

impl Not for Literal {
    type Output = Literal;

    fn not(self) -> Literal {
        Literal(self.0 ^ 1)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_positive() {
            write!(f, "p{}", self.var())
        } else {
            write!(f, "~p{}", self.var())
        }
    }
}

/// Handle to an integer variable of the CP backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DomainVar(pub(crate) u32);

impl DomainVar {
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DomainVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// A domain-propagation engine.
///
/// Unlike the IP backend, CP handles are plain values: nothing is reference
/// counted and nothing needs releasing.
pub trait CpBackend {
    /// The predefined literal that is always false.
    fn false_literal(&self) -> Literal;

    /// The predefined literal that is always true. Equals `!false_literal()`.
    fn true_literal(&self) -> Literal;

    /// Creates a fresh boolean and returns its positive literal.
    fn new_bool(&mut self) -> Literal;

    /// Creates an integer variable with domain `[lb, ub]`.
    fn new_int(&mut self, lb: i64, ub: i64) -> Result<DomainVar, BackendError>;

    /// Literal standing for `var == value`.
    fn eq_literal(&mut self, var: DomainVar, value: i64) -> Result<Literal, BackendError>;

    /// Current bounds of `var`.
    fn bounds(&self, var: DomainVar) -> Option<(i64, i64)>;

    fn num_bools(&self) -> usize;

    fn num_ints(&self) -> usize;
}
