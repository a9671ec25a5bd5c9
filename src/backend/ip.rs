//! IP backend interface.

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use crate::error::BackendError;
use crate::problem::ProblemData;

/// Handle to a variable owned by an IP backend.
///
/// Handles are only meaningful to the backend that issued them. A handle
/// obtained from [`IpBackend::negated_var`] is an alias owned by its positive
/// variable and must never be released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VarHandle(pub(crate) u32);

impl VarHandle {
    /// Raw index of the handle inside its backend.
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for VarHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Handle to a constraint owned by an IP backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsHandle(pub(crate) u32);

impl ConsHandle {
    /// Raw index of the handle inside its backend.
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConsHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Type of an IP variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Binary,
    Integer,
    Continuous,
}

/// Optimization direction of the IP problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjSense {
    Minimize,
    Maximize,
}

/// A backend setting the model layer needs to control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    /// Maximum number of threads for the overall search.
    MaxThreads(u32),
    /// Number of threads for solving the LP relaxation.
    LpThreads(u32),
    /// Whether presolve may replace a variable by a linear combination
    /// of other variables.
    MultiAggregation(bool),
    /// Maximum number of presolve restarts. Negative means unlimited.
    MaxRestarts(i32),
}

/// Callbacks the IP backend invokes when it forks or discards a copy of
/// the problem during search.
///
/// Implementations are called from inside the backend's own call stack and
/// receive the backend back as `ip` so they can re-resolve or release
/// handles.
pub trait TransformHooks {
    /// Builds the problem data of a new copy from `source`.
    fn on_fork(
        &self,
        ip: &mut dyn IpBackend,
        source: &ProblemData,
    ) -> Result<ProblemData, BackendError>;

    /// Releases the handles held by a copy that is being discarded.
    fn on_discard(&self, ip: &mut dyn IpBackend, data: ProblemData) -> Result<(), BackendError>;
}

/// An LP/IP engine session.
///
/// One value of this trait corresponds to one native solver session with a
/// single problem. All variable and constraint handles are reference
/// counted: `create_*` and `transform_*` return a captured handle the caller
/// must eventually release, `add_*` makes the problem capture its own
/// reference, and [`IpBackend::free`] drops everything the session still
/// holds.
pub trait IpBackend {
    /// Changes a session setting.
    fn apply(&mut self, setting: Setting) -> Result<(), BackendError>;

    /// Creates the (single) problem of this session.
    fn create_problem(&mut self, name: &str) -> Result<(), BackendError>;

    fn set_objective_sense(&mut self, sense: ObjSense) -> Result<(), BackendError>;

    /// Declares that every feasible objective value is integral.
    fn set_objective_integral(&mut self) -> Result<(), BackendError>;

    /// Creates a variable with one captured reference held by the caller.
    fn create_var(
        &mut self,
        name: &str,
        lb: f64,
        ub: f64,
        obj: f64,
        kind: VarKind,
    ) -> Result<VarHandle, BackendError>;

    /// Adds a variable to the problem; the problem captures a reference.
    fn add_var(&mut self, var: VarHandle) -> Result<(), BackendError>;

    /// Returns the negation alias of `var`, creating it if needed.
    ///
    /// The alias is owned by the positive variable and is not captured.
    /// The negation of an alias is its positive variable.
    fn negated_var(&mut self, var: VarHandle) -> Result<VarHandle, BackendError>;

    /// Resolves `var` into the address space of the copy being built and
    /// captures the result.
    fn transform_var(&mut self, var: VarHandle) -> Result<VarHandle, BackendError>;

    /// Drops one captured reference of `var`.
    fn release_var(&mut self, var: VarHandle) -> Result<(), BackendError>;

    /// Registers a constraint handler by name.
    fn include_handler(&mut self, name: &str) -> Result<(), BackendError>;

    /// Creates a constraint of an included handler with one captured
    /// reference held by the caller.
    fn create_cons(&mut self, handler: &str, name: &str) -> Result<ConsHandle, BackendError>;

    /// Adds a constraint to the problem; the problem captures a reference.
    fn add_cons(&mut self, cons: ConsHandle) -> Result<(), BackendError>;

    /// Resolves `cons` into the address space of the copy being built and
    /// captures the result.
    fn transform_cons(&mut self, cons: ConsHandle) -> Result<ConsHandle, BackendError>;

    /// Drops one captured reference of `cons`.
    fn release_cons(&mut self, cons: ConsHandle) -> Result<(), BackendError>;

    /// Installs the fork/discard callbacks.
    fn set_transform_hooks(&mut self, hooks: Rc<dyn TransformHooks>) -> Result<(), BackendError>;

    /// Forks a new working copy of the problem.
    ///
    /// The copy is derived from the innermost live copy, or from `source`
    /// when no copy exists. Returns the number of live copies.
    fn transform_problem(&mut self, source: &ProblemData) -> Result<usize, BackendError>;

    /// Discards the innermost working copy. Returns `false` if there was none.
    fn free_transformed(&mut self) -> Result<bool, BackendError>;

    /// Number of live working copies.
    fn transformed_depth(&self) -> usize;

    /// Problem data of the innermost live working copy.
    fn transformed_data(&self) -> Option<&ProblemData>;

    /// Writes the original problem in LP format.
    fn write_original_problem(&self, path: &Path) -> Result<(), BackendError>;

    /// Tears the session down: discards all working copies and drops the
    /// references held by the problem.
    fn free(&mut self) -> Result<(), BackendError>;

    /// Number of backend-owned blocks still alive.
    fn leaked_blocks(&self) -> usize;
}
