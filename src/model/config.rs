//! Model configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ModelError;

/// Solving method of a model. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Method {
    /// Branch-and-check: MIP branch-and-bound with CP checking through the
    /// bridge constraint.
    BranchAndCheck,
    /// Logic-based Benders decomposition.
    Lbbd,
    /// Pure mixed-integer programming.
    Mip,
    /// Pure constraint programming.
    Cp,
}

impl Method {
    pub const ALL: [Method; 4] = [
        Method::BranchAndCheck,
        Method::Lbbd,
        Method::Mip,
        Method::Cp,
    ];

    /// Whether the IP problem carries the CP bridge constraint.
    pub fn needs_bridge(self) -> bool {
        matches!(self, Method::BranchAndCheck)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::BranchAndCheck => "bc",
            Method::Lbbd => "lbbd",
            Method::Mip => "mip",
            Method::Cp => "cp",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ModelError::UnknownMethod(s.to_string()))
    }
}

impl TryFrom<i32> for Method {
    type Error = ModelError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|idx| Method::ALL.get(idx).copied())
            .ok_or_else(|| ModelError::UnknownMethod(value.to_string()))
    }
}

/// Configuration of a [`Model`](super::Model).
///
/// # Examples
///
/// ```
/// use u_hybrid::model::{Method, ModelConfig};
///
/// let config = ModelConfig::default()
///     .with_method(Method::Lbbd)
///     .with_problem_name("scheduling")
///     .with_lp_path("debug.lp");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelConfig {
    /// Solving method.
    pub method: Method,

    /// Name of the IP problem.
    pub problem_name: String,

    /// Where [`Model::write_lp`](super::Model::write_lp) writes the problem.
    pub lp_path: PathBuf,

    /// Tell the IP backend the objective only takes integral values.
    pub integral_objective: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            method: Method::BranchAndCheck,
            problem_name: "hybrid".into(),
            lp_path: PathBuf::from("model.lp"),
            integral_objective: true,
        }
    }
}

impl ModelConfig {
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_problem_name(mut self, name: impl Into<String>) -> Self {
        self.problem_name = name.into();
        self
    }

    pub fn with_lp_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lp_path = path.into();
        self
    }

    pub fn with_integral_objective(mut self, integral: bool) -> Self {
        self.integral_objective = integral;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.problem_name.trim().is_empty() {
            return Err("problem_name must not be empty".into());
        }
        if self.lp_path.as_os_str().is_empty() {
            return Err("lp_path must not be empty".into());
        }
        Ok(())
    }
}
