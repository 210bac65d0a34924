//! Error type shared by the compiler, the query engine and the solver seam.

use thiserror::Error;

/// Every failure carries the offending id, operand or value verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A variable id was the empty string.
    #[error("variable id must not be empty")]
    Empty,

    /// An operand list or cardinality that a constraint cannot be built from.
    #[error("invalid operand {operand:?}: {reason}")]
    InvalidOperand { operand: String, reason: String },

    /// A primitive was declared twice.
    #[error("variable {0:?} already exists")]
    AlreadyExists(String),

    /// An id was used that was never declared.
    #[error("variable {0:?} not found")]
    NotFound(String),

    /// Malformed input outside the model itself (periods, selections, rows).
    #[error("invalid argument {value:?}: {reason}")]
    InvalidArgument { value: String, reason: String },

    /// The solver reported that the problem could not be solved.
    #[error("solver failed: {0}")]
    SolverFailed(String),

    /// The solver answered with something we cannot interpret.
    #[error("invalid solver response: {0}")]
    InvalidResponse(String),

    /// A weight magnitude passed the configured threshold.
    ///
    /// Attached to a [`Solution`][crate::query::Solution] as a warning; only
    /// returned as an error when the weight no longer fits in an `i64`.
    #[error("weight of {id:?} is {weight}, beyond the threshold {threshold}")]
    WeightSaturated { id: String, weight: i64, threshold: i64 },

    /// A persisted ruleset or wire message could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub(crate) fn invalid_operand(operand: impl ToString, reason: impl Into<String>) -> Self {
        Error::InvalidOperand {
            operand: operand.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_argument(value: impl ToString, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias for ruleset operations.
pub type Result<T> = std::result::Result<T, Error>;
