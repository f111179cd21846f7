//! Exploration error types.
//!
//! Only configuration problems are errors here. Solver-level failures
//! (unsat, timeout, backend trouble) are ordinary outcomes of a pending
//! branch and never surface through this type; the engine skips the
//! branch and moves on.

use std::fmt;

/// Result type for exploration operations.
pub type ExploreResult<T = ()> = Result<T, ExploreError>;

#[derive(Debug)]
pub enum ExploreError {
    /// No registered subject has this name.
    UnknownSubject { name: String },

    /// The solver name is not one of the supported backends.
    UnknownSolver { name: String },

    /// The log folder or one of its files could not be written.
    Io(std::io::Error),
}

impl ExploreError {
    pub fn unknown_subject(name: impl Into<String>) -> Self {
        ExploreError::UnknownSubject { name: name.into() }
    }

    pub fn unknown_solver(name: impl Into<String>) -> Self {
        ExploreError::UnknownSolver { name: name.into() }
    }
}

impl fmt::Display for ExploreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExploreError::UnknownSubject { name } => {
                write!(f, "no registered subject named '{}'", name)
            }
            ExploreError::UnknownSolver { name } => {
                write!(f, "unknown solver '{}' (expected 'z3' or 'cvc')", name)
            }
            ExploreError::Io(e) => write!(f, "i/o error: {}", e),
        }
    }
}

impl std::error::Error for ExploreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExploreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ExploreError {
    fn from(e: std::io::Error) -> Self {
        ExploreError::Io(e)
    }
}
