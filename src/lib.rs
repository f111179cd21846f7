//! elenchus — concolic test-input generation
//!
//! Runs a subject function on concrete inputs while shadowing every
//! scalar it touches with a symbolic expression, records the predicate
//! behind each boolean decision in a prefix tree, and drives the subject
//! down unexplored branches by solving the negated path conditions with
//! an SMT backend. The result is a set of input vectors that together
//! exercise every feasible branch, the corresponding return values, and
//! a condition-coverage measurement.
//!
//! # Architecture
//!
//! - [`value::SymValue`] carries a concrete `i64` and an expression DAG
//!   ([`expr::Expr`]); every operator on it extends the DAG while
//!   preserving native concrete semantics.
//! - [`recorder::PathRecorder`] observes each boolean coercion, grows
//!   the constraint tree ([`tree::ConstraintNode`]) and queues the
//!   opposite branch of every decision for later.
//! - [`explore::ExplorationEngine`] pops pending branches FIFO, asks an
//!   SMT backend ([`solver::SmtBackend`]: Z3 or CVC) for inputs that
//!   flip them, and reruns the subject.
//! - [`invocation::FunctionInvocation`] and [`subjects`] stand in for
//!   the original's subject loader: a registry of functions with named,
//!   seeded symbolic parameters.

pub mod cli;
pub mod error;
pub mod explore;
pub mod expr;
pub mod invocation;
pub mod recorder;
pub mod solver;
pub mod subjects;
pub mod tree;
pub mod value;

pub use error::{ExploreError, ExploreResult};
pub use explore::{ExplorationEngine, ExplorationReport};
pub use expr::{Expr, ExprRef, OpKind};
pub use invocation::{FunctionInvocation, Subject, SubjectOutcome, SubjectValue, SymArgs};
pub use recorder::PathRecorder;
pub use solver::{Model, SmtBackend, SolverKind};
pub use tree::{ConstraintNode, NodeRef, Predicate};
pub use value::SymValue;
