//! Built-in subject functions.
//!
//! The stand-in for the original's loadable test corpus: each entry
//! declares its symbolic parameters with seeds and can be selected by
//! name from the command line or from tests.

use crate::invocation::{Subject, SubjectValue, SymArgs};
use crate::value::SymValue;

/// The fixed array probed by `binary_search`.
pub const BSEARCH_ARRAY: [i64; 7] = [0, 4, 6, 95, 430, 4944, 119101];

fn compare(args: &SymArgs) -> SubjectValue {
    let a = args.get("a");
    let b = args.get("b");
    if a.gt(&b).truthy() {
        "a > b".into()
    } else if a._eq(&b).truthy() {
        "a == b".into()
    } else {
        "a < b".into()
    }
}

fn bsearch(array: &[i64], k: &SymValue) -> i64 {
    let mut lo = 0i64;
    let mut hi = array.len() as i64 - 1;
    while lo <= hi {
        let mid = (lo + hi) / 2;
        if k.lt(array[mid as usize]).truthy() {
            hi = mid - 1;
        } else if k.gt(array[mid as usize]).truthy() {
            lo = mid + 1;
        } else {
            return mid;
        }
    }
    -1
}

fn binary_search(args: &SymArgs) -> SubjectValue {
    let k = args.get("k");
    let i = bsearch(&BSEARCH_ARRAY, &k);
    if i >= 0 {
        if !k._eq(BSEARCH_ARRAY[i as usize]).truthy() {
            "ERROR".into()
        } else {
            SubjectValue::Str(k.concrete().to_string())
        }
    } else if BSEARCH_ARRAY.iter().any(|&v| k._eq(v).truthy()) {
        "ERROR".into()
    } else {
        "NOT_FOUND".into()
    }
}

fn binary_search_expected() -> Vec<SubjectValue> {
    BSEARCH_ARRAY
        .iter()
        .map(|v| SubjectValue::Str(v.to_string()))
        .chain(std::iter::once("NOT_FOUND".into()))
        .collect()
}

fn mod_five(args: &SymArgs) -> SubjectValue {
    let x = args.get("x");
    if ((&x * 2 + 1) % 5)._eq(0).truthy() {
        "hit".into()
    } else {
        "miss".into()
    }
}

fn sign(args: &SymArgs) -> SubjectValue {
    let x = args.get("x");
    if x.truthy() {
        if x.gt(0).truthy() {
            "positive".into()
        } else {
            "negative".into()
        }
    } else {
        "zero".into()
    }
}

const REGISTRY: &[Subject] = &[
    Subject {
        name: "compare",
        params: &[("a", 2), ("b", 3)],
        body: compare,
        expected: None,
    },
    Subject {
        name: "binary_search",
        params: &[("k", 0)],
        body: binary_search,
        expected: Some(binary_search_expected),
    },
    Subject {
        name: "mod_five",
        params: &[("x", 0)],
        body: mod_five,
        expected: None,
    },
    Subject {
        name: "sign",
        params: &[("x", 0)],
        body: sign,
        expected: None,
    },
];

/// Look up a registered subject by name.
pub fn builtin(name: &str) -> Option<Subject> {
    REGISTRY.iter().find(|s| s.name == name).cloned()
}

/// Names of every registered subject.
pub fn names() -> Vec<&'static str> {
    REGISTRY.iter().map(|s| s.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::{FunctionInvocation, SubjectOutcome};
    use std::collections::BTreeMap;

    fn run_with(subject: &str, overrides: &[(&str, i64)]) -> SubjectOutcome {
        let inv = FunctionInvocation::new(builtin(subject).unwrap());
        let mut inputs = BTreeMap::new();
        for name in inv.get_names() {
            let concrete = overrides
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| *v);
            inputs.insert(name.clone(), inv.create_argument_value(&name, concrete));
        }
        inv.call_function(&inputs)
    }

    #[test]
    fn compare_orders_concretely() {
        assert_eq!(run_with("compare", &[]), SubjectOutcome::Return("a < b".into()));
        assert_eq!(
            run_with("compare", &[("a", 9)]),
            SubjectOutcome::Return("a > b".into())
        );
        assert_eq!(
            run_with("compare", &[("a", 3)]),
            SubjectOutcome::Return("a == b".into())
        );
    }

    #[test]
    fn binary_search_finds_members_and_rejects_others() {
        for v in BSEARCH_ARRAY {
            assert_eq!(
                run_with("binary_search", &[("k", v)]),
                SubjectOutcome::Return(SubjectValue::Str(v.to_string()))
            );
        }
        assert_eq!(
            run_with("binary_search", &[("k", 7)]),
            SubjectOutcome::Return("NOT_FOUND".into())
        );
    }

    #[test]
    fn mod_five_hits_on_solved_inputs() {
        assert_eq!(run_with("mod_five", &[]), SubjectOutcome::Return("miss".into()));
        assert_eq!(
            run_with("mod_five", &[("x", 2)]),
            SubjectOutcome::Return("hit".into())
        );
        assert_eq!(
            run_with("mod_five", &[("x", -3)]),
            SubjectOutcome::Return("hit".into())
        );
    }

    #[test]
    fn sign_classifies_all_three_ways() {
        assert_eq!(run_with("sign", &[]), SubjectOutcome::Return("zero".into()));
        assert_eq!(
            run_with("sign", &[("x", 5)]),
            SubjectOutcome::Return("positive".into())
        );
        assert_eq!(
            run_with("sign", &[("x", -5)]),
            SubjectOutcome::Return("negative".into())
        );
    }

    #[test]
    fn registry_lookup() {
        assert!(builtin("compare").is_some());
        assert!(builtin("nope").is_none());
        assert_eq!(names().len(), 4);
    }
}
