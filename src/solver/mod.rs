//! SMT backend adapters.
//!
//! Both backends expose a single operation: given the assertions along a
//! path prefix and the query predicate at the selected branch, produce a
//! variable-to-integer model that satisfies all of them, or nothing.
//! `unsat`, timeouts and backend failures are deliberately
//! indistinguishable to the caller; the engine skips the branch either
//! way.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ExploreError;
use crate::tree::Predicate;

pub mod cvc_wrap;
pub mod z3_wrap;

pub use cvc_wrap::CvcWrapper;
pub use z3_wrap::Z3Wrapper;

/// A satisfying assignment: input variable name to signed integer.
pub type Model = BTreeMap<String, i64>;

/// Per-query solver timeout.
pub const SOLVER_TIMEOUT_MS: u32 = 10_000;

/// The interface the exploration engine drives.
pub trait SmtBackend {
    fn name(&self) -> &'static str;

    /// Solve `asserts ∧ query` and extract integer assignments for every
    /// variable mentioned in them. `None` covers unsat, unknown, and
    /// backend failure alike.
    fn find_counterexample(&self, asserts: &[Predicate], query: &Predicate) -> Option<Model>;
}

/// Backend selection, decided at engine construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    Z3,
    Cvc,
}

impl SolverKind {
    pub fn backend(self) -> Box<dyn SmtBackend> {
        match self {
            SolverKind::Z3 => Box::new(Z3Wrapper::new()),
            SolverKind::Cvc => Box::new(CvcWrapper::new()),
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverKind::Z3 => write!(f, "z3"),
            SolverKind::Cvc => write!(f, "cvc"),
        }
    }
}

impl FromStr for SolverKind {
    type Err = ExploreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "z3" => Ok(SolverKind::Z3),
            "cvc" => Ok(SolverKind::Cvc),
            other => Err(ExploreError::unknown_solver(other)),
        }
    }
}
