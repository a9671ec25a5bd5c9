//! Solve strategies and the context they run in.

use std::fmt;

use super::config::Method;
use super::timer::Timer;
use super::types::{Outcome, Solution, Status};
use crate::backend::{CpBackend, IpBackend};
use crate::error::BackendError;
use crate::problem::ProblemData;
use crate::registry::IntVar;

/// A solving procedure for one [`Method`].
///
/// The model hands over a [`SolveContext`] with mutable access to the CP
/// backend and the run outcome. Implementations poll
/// [`SolveContext::time_remaining`] and return once it reaches zero.
pub trait Strategy {
    /// Minimizes `objective` within `time_limit` seconds.
    fn solve(&mut self, ctx: &mut SolveContext<'_>, objective: IntVar, time_limit: f64);
}

/// Everything a [`Strategy`] may touch while it runs.
///
/// The IP session is only reachable read-only. Working copies are forked
/// from the primary problem data through [`SolveContext::fork`], and the
/// session itself cannot be torn down or rewired from inside a solve:
///
/// ```compile_fail
/// use u_hybrid::model::SolveContext;
///
/// fn teardown(ctx: &mut SolveContext<'_>) {
///     ctx.ip().free().unwrap();
/// }
/// ```
pub struct SolveContext<'a> {
    pub(crate) method: Method,
    pub(crate) ip: &'a mut dyn IpBackend,
    pub(crate) cp: &'a mut dyn CpBackend,
    pub(crate) data: &'a ProblemData,
    pub(crate) timer: &'a Timer,
    pub(crate) outcome: &'a mut Outcome,
}

impl SolveContext<'_> {
    pub fn method(&self) -> Method {
        self.method
    }

    /// The primary problem data.
    pub fn data(&self) -> &ProblemData {
        self.data
    }

    pub fn ip(&self) -> &dyn IpBackend {
        &*self.ip
    }

    pub fn cp(&mut self) -> &mut dyn CpBackend {
        &mut *self.cp
    }

    /// Forks a working copy of the problem. Returns the new copy depth.
    pub fn fork(&mut self) -> Result<usize, BackendError> {
        self.ip.transform_problem(self.data)
    }

    /// Discards the innermost working copy. Returns `false` if there was none.
    pub fn discard(&mut self) -> Result<bool, BackendError> {
        self.ip.free_transformed()
    }

    /// The innermost working copy, if any.
    pub fn working_copy(&self) -> Option<&ProblemData> {
        self.ip.transformed_data()
    }

    pub fn time_remaining(&self) -> f64 {
        self.timer.time_remaining()
    }

    pub fn outcome(&self) -> &Outcome {
        self.outcome
    }

    pub fn set_status(&mut self, status: Status) {
        self.outcome.set_status(status);
    }

    /// See [`Outcome::record_solution`].
    pub fn record_solution(&mut self, objective: f64, solution: Solution) -> bool {
        self.outcome.record_solution(objective, solution)
    }

    /// See [`Outcome::raise_bound`].
    pub fn raise_bound(&mut self, bound: f64) -> bool {
        self.outcome.raise_bound(bound)
    }
}

impl fmt::Debug for SolveContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolveContext")
            .field("method", &self.method)
            .field("data", &self.data)
            .field("timer", &self.timer)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

/// One optional strategy slot per [`Method`].
#[derive(Default)]
pub struct Strategies {
    bc: Option<Box<dyn Strategy>>,
    lbbd: Option<Box<dyn Strategy>>,
    mip: Option<Box<dyn Strategy>>,
    cp: Option<Box<dyn Strategy>>,
}

impl Strategies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `strategy` for `method`, replacing any previous one.
    pub fn set(&mut self, method: Method, strategy: Box<dyn Strategy>) {
        *self.slot_mut(method) = Some(strategy);
    }

    pub fn contains(&self, method: Method) -> bool {
        match method {
            Method::BranchAndCheck => self.bc.is_some(),
            Method::Lbbd => self.lbbd.is_some(),
            Method::Mip => self.mip.is_some(),
            Method::Cp => self.cp.is_some(),
        }
    }

    pub(crate) fn slot_mut(&mut self, method: Method) -> &mut Option<Box<dyn Strategy>> {
        match method {
            Method::BranchAndCheck => &mut self.bc,
            Method::Lbbd => &mut self.lbbd,
            Method::Mip => &mut self.mip,
            Method::Cp => &mut self.cp,
        }
    }
}

impl fmt::Debug for Strategies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered: Vec<_> = Method::ALL
            .into_iter()
            .filter(|&m| self.contains(m))
            .collect();
        f.debug_struct("Strategies")
            .field("registered", &registered)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl Strategy for Noop {
        fn solve(&mut self, _: &mut SolveContext<'_>, _: IntVar, _: f64) {}
    }

    #[test]
    fn test_registration() {
        let mut strategies = Strategies::new();
        strategies.set(Method::Mip, Box::new(Noop));
        assert!(strategies.contains(Method::Mip));
        assert!(!strategies.contains(Method::BranchAndCheck));

        strategies.set(Method::Cp, Box::new(Noop));
        assert!(strategies.contains(Method::Cp));
        assert!(strategies.slot_mut(Method::Lbbd).is_none());
        assert_eq!(
            format!("{strategies:?}"),
            "Strategies { registered: [Mip, Cp] }"
        );
    }
}
