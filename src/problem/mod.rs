//! Problem data and its transformation lifecycle.
//!
//! [`ProblemData`] is the unit the IP backend duplicates whenever it forks
//! the problem for a search node. [`TransformLifecycle`] implements the two
//! callbacks the backend invokes for this: `on_fork` builds a copy with every
//! handle re-resolved, `on_discard` releases the copy's handles exactly once.

mod data;
pub mod lifecycle;

pub use data::{ProblemData, BRIDGE_HANDLER};
pub use lifecycle::TransformLifecycle;
