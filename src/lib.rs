//! Representation and lifecycle layer of a hybrid MIP/CP solver.
//!
//! A hybrid model keeps every decision variable in two engines at once: an
//! IP backend doing branch-and-bound and a CP backend doing domain
//! propagation. This crate owns the bookkeeping in between:
//!
//! - **Registry** ([`registry`]): boolean and integer slots pairing an IP
//!   handle with a CP handle, negation aliases and value indicators.
//! - **Problem data** ([`problem`]): the container the IP backend duplicates
//!   when it forks the problem, and the fork/discard lifecycle that keeps
//!   every copy's handles valid and releases each one exactly once.
//! - **Model** ([`model`]): construction, method dispatch, timer and
//!   teardown.
//! - **Backends** ([`backend`]): the traits both engines are driven through,
//!   with in-memory reference implementations.
//!
//! # Example
//!
//! ```
//! use u_hybrid::{Method, Model, ModelConfig};
//!
//! let mut model = Model::new(ModelConfig::default().with_method(Method::BranchAndCheck))?;
//! let open = model.add_bool_var("open")?;
//! let load = model.add_int_var(0, 5, "load")?;
//! let full = model.indicator(load, 5)?;
//! assert_ne!(open, full);
//! assert!(model.data().bridge().is_some());
//! # Ok::<(), u_hybrid::ModelError>(())
//! ```

pub mod backend;
pub mod error;
pub mod model;
pub mod problem;
pub mod registry;

pub use error::{BackendError, ModelError};
pub use model::{Method, Model, ModelConfig, Solution, Status};
pub use registry::{BoolVar, IntVar};
