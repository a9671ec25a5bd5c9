//! Variable identifiers and slots.

use std::fmt;

use crate::backend::{DomainVar, Literal, VarHandle};

/// Index of a boolean variable slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoolVar(pub(crate) usize);

impl BoolVar {
    /// The constant `false`, always slot 0.
    pub const FALSE: BoolVar = BoolVar(0);
    /// The constant `true`, always slot 1 and the negation of [`BoolVar::FALSE`].
    pub const TRUE: BoolVar = BoolVar(1);

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BoolVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// Index of an integer variable slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntVar(pub(crate) usize);

impl IntVar {
    /// The constant `0`, always slot 0.
    pub const ZERO: IntVar = IntVar(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for IntVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

/// Whether a boolean slot owns its handles or aliases the negation of an
/// earlier slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Owns its IP handle. Remembers its negation partner once created.
    Positive { negation: Option<BoolVar> },
    /// Negation alias of `positive`, which always has a lower index.
    Negated { positive: BoolVar },
}

/// A boolean variable materialized in both backends.
#[derive(Debug, Clone)]
pub struct BoolSlot {
    pub(crate) ip: VarHandle,
    pub(crate) cp: Literal,
    pub(crate) kind: SlotKind,
    pub(crate) name: String,
}

impl BoolSlot {
    pub fn ip(&self) -> VarHandle {
        self.ip
    }

    pub fn cp(&self) -> Literal {
        self.cp
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_positive(&self) -> bool {
        matches!(self.kind, SlotKind::Positive { .. })
    }

    /// The positive slot this one negates, `None` for positive slots.
    pub fn back_reference(&self) -> Option<BoolVar> {
        match self.kind {
            SlotKind::Positive { .. } => None,
            SlotKind::Negated { positive } => Some(positive),
        }
    }
}

/// An integer variable materialized in the CP backend and, unless virtual,
/// in the IP backend.
#[derive(Debug, Clone)]
pub struct IntSlot {
    pub(crate) ip: Option<VarHandle>,
    pub(crate) cp: DomainVar,
    pub(crate) lb: i64,
    pub(crate) ub: i64,
    pub(crate) name: String,
    pub(crate) indicators: Option<usize>,
}

impl IntSlot {
    pub fn ip(&self) -> Option<VarHandle> {
        self.ip
    }

    pub fn cp(&self) -> DomainVar {
        self.cp
    }

    pub fn lb(&self) -> i64 {
        self.lb
    }

    pub fn ub(&self) -> i64 {
        self.ub
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_virtual(&self) -> bool {
        self.ip.is_none()
    }

    pub fn is_fixed(&self) -> bool {
        self.lb == self.ub
    }

    /// Index of this variable's table in the indicator tables, if any
    /// indicator was ever requested.
    pub fn indicator_table(&self) -> Option<usize> {
        self.indicators
    }
}
