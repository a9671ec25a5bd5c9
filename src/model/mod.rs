//! The hybrid model shell.
//!
//! A [`Model`] wires the two backend sessions, the variable registry and the
//! transformation lifecycle together. Its [`Method`] is fixed at
//! construction and decides how the IP problem is set up:
//!
//! | Method | Bridge constraint | Solved by |
//! |--------|-------------------|-----------|
//! | `BranchAndCheck` | yes | IP search checking CP feasibility |
//! | `Lbbd` | no | master IP with CP subproblems |
//! | `Mip` | no | IP only |
//! | `Cp` | no | CP only |
//!
//! The search procedures themselves plug in as [`Strategy`] implementations.
//! [`Model::minimize`] runs the one registered for the model's method inside
//! a [`SolveContext`] and records status, incumbent and bound.

mod config;
mod hybrid;
mod strategy;
mod timer;
mod types;

pub use config::{Method, ModelConfig};
pub use hybrid::Model;
pub use strategy::{SolveContext, Strategies, Strategy};
pub use timer::Timer;
pub use types::{Outcome, Solution, Status};
