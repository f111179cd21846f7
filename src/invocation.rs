//! The invocation adapter: the engine's narrow interface to subjects.
//!
//! A `Subject` is the registry-side record of a function under test:
//! its name, its symbolic parameters with default concrete seeds, the
//! function itself, and optionally the set of return values a complete
//! exploration is expected to produce. This is the systems-language
//! rendering of the original loader's `@symbolic(arg=seed, …)`
//! decoration.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;

use crate::value::SymValue;

/// What a subject returns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum SubjectValue {
    Int(i64),
    Str(String),
    Bool(bool),
    Unit,
}

impl fmt::Display for SubjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectValue::Int(v) => write!(f, "{}", v),
            SubjectValue::Str(s) => write!(f, "{}", s),
            SubjectValue::Bool(b) => write!(f, "{}", b),
            SubjectValue::Unit => write!(f, "()"),
        }
    }
}

impl From<&str> for SubjectValue {
    fn from(s: &str) -> Self {
        SubjectValue::Str(s.to_string())
    }
}

impl From<String> for SubjectValue {
    fn from(s: String) -> Self {
        SubjectValue::Str(s)
    }
}

impl From<i64> for SubjectValue {
    fn from(v: i64) -> Self {
        SubjectValue::Int(v)
    }
}

impl From<bool> for SubjectValue {
    fn from(b: bool) -> Self {
        SubjectValue::Bool(b)
    }
}

/// The outcome of one execution. A panicking subject is a legitimate
/// result, recorded and carried in the report like any return value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum SubjectOutcome {
    Return(SubjectValue),
    Panic(String),
}

impl SubjectOutcome {
    pub fn returned(&self) -> Option<&SubjectValue> {
        match self {
            SubjectOutcome::Return(v) => Some(v),
            SubjectOutcome::Panic(_) => None,
        }
    }
}

impl fmt::Display for SubjectOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectOutcome::Return(v) => write!(f, "{}", v),
            SubjectOutcome::Panic(msg) => write!(f, "panic: {}", msg),
        }
    }
}

/// The named symbolic arguments passed to a subject.
pub struct SymArgs<'a> {
    inner: &'a BTreeMap<String, SymValue>,
}

impl SymArgs<'_> {
    /// Fetch an argument by name. Asking for a name that is not in the
    /// subject's parameter list is a bug in the subject and panics,
    /// which the invocation layer records as a subject panic.
    pub fn get(&self, name: &str) -> SymValue {
        match self.inner.get(name) {
            Some(value) => value.clone(),
            None => panic!("subject requested unknown argument '{}'", name),
        }
    }
}

pub type SubjectFn = fn(&SymArgs) -> SubjectValue;

/// A registered function under test.
#[derive(Clone)]
pub struct Subject {
    pub name: &'static str,
    /// Parameter names with their default concrete seeds, in call order.
    pub params: &'static [(&'static str, i64)],
    pub body: SubjectFn,
    /// The return values a complete exploration should produce, when the
    /// subject declares them.
    pub expected: Option<fn() -> Vec<SubjectValue>>,
}

/// Runs one subject on behalf of the engine.
pub struct FunctionInvocation {
    subject: Subject,
}

impl FunctionInvocation {
    pub fn new(subject: Subject) -> Self {
        FunctionInvocation { subject }
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// The subject's input names, in declaration order.
    pub fn get_names(&self) -> Vec<String> {
        self.subject
            .params
            .iter()
            .map(|(name, _)| (*name).to_string())
            .collect()
    }

    /// A fresh symbolic variable for `name`, seeded from the subject's
    /// declaration unless `concrete` overrides it.
    pub fn create_argument_value(&self, name: &str, concrete: Option<i64>) -> SymValue {
        let seed = self
            .subject
            .params
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, seed)| *seed)
            .unwrap_or(0);
        SymValue::new_var(name, concrete.unwrap_or(seed))
    }

    /// Run the subject once on the given inputs. Panics raised by the
    /// subject are caught and recorded as the outcome of the execution.
    pub fn call_function(&self, inputs: &BTreeMap<String, SymValue>) -> SubjectOutcome {
        let args = SymArgs { inner: inputs };
        match panic::catch_unwind(AssertUnwindSafe(|| (self.subject.body)(&args))) {
            Ok(value) => SubjectOutcome::Return(value),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "subject panicked".to_string());
                SubjectOutcome::Panic(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double_or_die(args: &SymArgs) -> SubjectValue {
        let x = args.get("x");
        SubjectValue::Int((&x / (&x - 1)).concrete())
    }

    const DIVIDER: Subject = Subject {
        name: "double_or_die",
        params: &[("x", 2)],
        body: double_or_die,
        expected: None,
    };

    #[test]
    fn names_and_seeds_come_from_the_declaration() {
        let inv = FunctionInvocation::new(DIVIDER);
        assert_eq!(inv.get_names(), vec!["x"]);
        assert_eq!(inv.create_argument_value("x", None).concrete(), 2);
        assert_eq!(inv.create_argument_value("x", Some(9)).concrete(), 9);
    }

    #[test]
    fn call_returns_the_subject_value() {
        let inv = FunctionInvocation::new(DIVIDER);
        let mut inputs = BTreeMap::new();
        inputs.insert("x".to_string(), inv.create_argument_value("x", None));

        assert_eq!(
            inv.call_function(&inputs),
            SubjectOutcome::Return(SubjectValue::Int(2))
        );
    }

    #[test]
    fn subject_panic_is_a_recorded_outcome() {
        let inv = FunctionInvocation::new(DIVIDER);
        let mut inputs = BTreeMap::new();
        inputs.insert("x".to_string(), inv.create_argument_value("x", Some(1)));

        match inv.call_function(&inputs) {
            SubjectOutcome::Panic(msg) => assert!(msg.contains("division by zero")),
            other => panic!("expected a panic outcome, got {}", other),
        }
    }
}
