//! Variable registry.
//!
//! Every decision variable of a hybrid model exists twice: as an IP handle
//! and as a CP handle. The registry owns the canonical record pairing the two,
//! so no code path can update one materialization without the other.
//!
//! # Layout
//!
//! - Boolean slots: slot 0 is the constant `false`, slot 1 its negation
//!   `true`. Negations are aliases of an earlier positive slot and are created
//!   at most once per positive slot.
//! - Integer slots: slot 0 is the constant `0` and the objective placeholder.
//!   Integer slots may be virtual (no IP handle) and may own a table of
//!   value indicators `[x == v]`.

mod types;
mod variables;

pub use types::{BoolSlot, BoolVar, IntSlot, IntVar, SlotKind};
pub use variables::VariableRegistry;
