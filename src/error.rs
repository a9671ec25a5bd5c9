//! Error types shared by the backends and the model layer.

use thiserror::Error;

/// Failure reported by an IP or CP backend.
///
/// Backends report these for calls that can fail under correct usage
/// (allocation) and for calls that indicate misuse (unknown handles,
/// releasing an alias). The model layer decides which of them are fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("allocation failed: {0}")]
    Allocation(String),

    #[error("no problem has been created")]
    NoProblem,

    #[error("a problem has already been created")]
    ProblemExists,

    #[error("invalid variable handle {0}")]
    InvalidVar(u32),

    #[error("invalid constraint handle {0}")]
    InvalidCons(u32),

    #[error("variable {0} is a negation alias and cannot be released")]
    AliasRelease(u32),

    #[error("invalid domain variable {0}")]
    InvalidDomainVar(u32),

    #[error("empty domain [{lb}, {ub}]")]
    EmptyDomain { lb: i64, ub: i64 },

    #[error("constraint handler '{0}' is not included")]
    UnknownHandler(String),

    #[error("constraint handler '{0}' is already included")]
    DuplicateHandler(String),

    #[error("transform hooks are not installed")]
    NoHooks,

    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    #[error("failed to write problem: {0}")]
    Io(String),
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Io(err.to_string())
    }
}

/// Errors surfaced while building a [`Model`](crate::model::Model).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("invalid domain [{lb}, {ub}]")]
    InvalidDomain { lb: i64, ub: i64 },

    #[error("unknown solving method '{0}'")]
    UnknownMethod(String),

    #[error("boolean variable {0} does not exist")]
    UnknownBool(usize),

    #[error("integer variable {0} does not exist")]
    UnknownInt(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_converts() {
        let err: ModelError = BackendError::NoProblem.into();
        assert_eq!(err, ModelError::Backend(BackendError::NoProblem));
        assert_eq!(err.to_string(), "backend error: no problem has been created");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = BackendError::from(io);
        assert!(matches!(err, BackendError::Io(ref msg) if msg.contains("gone")));
    }
}
