//! Run status and solution record.

use std::fmt;

/// Status of a model after (or during) a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Status {
    /// Nothing is known yet.
    #[default]
    Unknown,
    /// A solution was found but not proven optimal.
    Feasible,
    /// Proven optimal solution found.
    Optimal,
    /// No feasible solution exists.
    Infeasible,
    /// The time budget ran out before the search finished.
    TimeLimitReached,
}

impl Status {
    pub fn is_solution_found(self) -> bool {
        matches!(self, Status::Feasible | Status::Optimal)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Unknown => "unknown",
            Status::Feasible => "feasible",
            Status::Optimal => "optimal",
            Status::Infeasible => "infeasible",
            Status::TimeLimitReached => "time limit reached",
        };
        f.write_str(s)
    }
}

/// Values of every boolean and integer slot, indexed like the registry.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solution {
    pub bools: Vec<bool>,
    pub ints: Vec<i64>,
}

impl Solution {
    pub fn new(bools: Vec<bool>, ints: Vec<i64>) -> Self {
        Self { bools, ints }
    }

    pub fn is_empty(&self) -> bool {
        self.bools.is_empty() && self.ints.is_empty()
    }
}

/// What a strategy reports back: status, incumbent and bound.
#[derive(Debug, Clone)]
pub struct Outcome {
    status: Status,
    objective: f64,
    bound: f64,
    solution: Solution,
}

impl Default for Outcome {
    fn default() -> Self {
        Self {
            status: Status::Unknown,
            objective: f64::INFINITY,
            bound: f64::NEG_INFINITY,
            solution: Solution::default(),
        }
    }
}

impl Outcome {
    pub fn status(&self) -> Status {
        self.status
    }

    /// Objective value of the best solution, `+inf` if none.
    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// Best known lower bound, `-inf` if none.
    pub fn bound(&self) -> f64 {
        self.bound
    }

    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    /// Stores `solution` if it improves on the incumbent.
    ///
    /// A `NaN` objective is never kept. An unknown status becomes feasible.
    /// Returns whether the solution was kept.
    pub fn record_solution(&mut self, objective: f64, solution: Solution) -> bool {
        if objective.is_nan() || objective >= self.objective {
            return false;
        }
        self.objective = objective;
        self.solution = solution;
        if self.status == Status::Unknown {
            self.status = Status::Feasible;
        }
        true
    }

    /// Raises the lower bound. Returns whether it moved.
    pub fn raise_bound(&mut self, bound: f64) -> bool {
        if bound <= self.bound {
            return false;
        }
        self.bound = bound;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_outcome() {
        let outcome = Outcome::default();
        assert_eq!(outcome.status(), Status::Unknown);
        assert_eq!(outcome.objective(), f64::INFINITY);
        assert_eq!(outcome.bound(), f64::NEG_INFINITY);
        assert!(outcome.solution().is_empty());
    }

    #[test]
    fn test_record_solution_keeps_best() {
        let mut outcome = Outcome::default();
        assert!(outcome.record_solution(10.0, Solution::new(vec![false, true], vec![10])));
        assert_eq!(outcome.status(), Status::Feasible);
        assert!(!outcome.record_solution(12.0, Solution::new(vec![false, true], vec![12])));
        assert_eq!(outcome.objective(), 10.0);
        assert!(outcome.record_solution(7.0, Solution::new(vec![false, true], vec![7])));
        assert_eq!(outcome.solution().ints, vec![7]);
    }

    #[test]
    fn test_record_solution_rejects_nan() {
        let mut outcome = Outcome::default();
        assert!(!outcome.record_solution(f64::NAN, Solution::new(vec![false], vec![1])));
        assert_eq!(outcome.status(), Status::Unknown);
        assert!(outcome.solution().is_empty());

        assert!(outcome.record_solution(5.0, Solution::new(vec![false], vec![5])));
        assert!(!outcome.record_solution(f64::NAN, Solution::new(vec![false], vec![0])));
        assert!(!outcome.record_solution(9.0, Solution::new(vec![false], vec![9])));
        assert_eq!(outcome.objective(), 5.0);
        assert_eq!(outcome.solution().ints, vec![5]);
    }

    #[test]
    fn test_record_solution_keeps_status() {
        let mut outcome = Outcome::default();
        outcome.set_status(Status::Optimal);
        outcome.record_solution(3.0, Solution::default());
        assert_eq!(outcome.status(), Status::Optimal);
    }

    #[test]
    fn test_raise_bound_is_monotone() {
        let mut outcome = Outcome::default();
        assert!(outcome.raise_bound(2.0));
        assert!(!outcome.raise_bound(1.0));
        assert_eq!(outcome.bound(), 2.0);
    }

    #[test]
    fn test_status_solution_found() {
        assert!(Status::Optimal.is_solution_found());
        assert!(Status::Feasible.is_solution_found());
        assert!(!Status::Infeasible.is_solution_found());
        assert!(!Status::TimeLimitReached.is_solution_found());
        assert_eq!(Status::TimeLimitReached.to_string(), "time limit reached");
    }
}
