//! Expression DAG for symbolic values.
//!
//! A lightweight operator tree that records the computation a subject
//! performed on its symbolic inputs. Nodes are built once, shared through
//! `Rc`, and never mutated; structural equality deliberately ignores node
//! identity so that replaying a path with fresh value instances matches
//! the nodes recorded on an earlier run.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

/// A shared handle to an expression node.
pub type ExprRef = Rc<Expr>;

/// The closed operator set understood by the engine and both solver
/// backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,

    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl OpKind {
    /// The string tag used in the textual form of expressions.
    pub fn symbol(self) -> &'static str {
        match self {
            OpKind::Add => "+",
            OpKind::Sub => "-",
            OpKind::Mul => "*",
            OpKind::Div => "//",
            OpKind::Rem => "%",
            OpKind::BitAnd => "&",
            OpKind::BitOr => "|",
            OpKind::BitXor => "^",
            OpKind::Shl => "<<",
            OpKind::Shr => ">>",
            OpKind::Eq => "==",
            OpKind::Ne => "!=",
            OpKind::Lt => "<",
            OpKind::Le => "<=",
            OpKind::Gt => ">",
            OpKind::Ge => ">=",
        }
    }

    /// Comparison operators produce boolean-valued expressions.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            OpKind::Eq | OpKind::Ne | OpKind::Lt | OpKind::Le | OpKind::Gt | OpKind::Ge
        )
    }

    /// Concrete evaluation on `i64`, in two's-complement wrapping
    /// semantics. Shifts treat the right operand as unsigned and
    /// zero-/sign-fill for amounts of 64 or more, which is exactly what
    /// the 64-bit bitvector lowering in the solver backends computes, so
    /// a model re-evaluated here reproduces the branch the solver
    /// predicted. Comparisons yield `1`/`0`.
    ///
    /// Division or remainder by zero panics; the invocation layer turns
    /// that into a recorded subject panic.
    pub fn apply(self, lhs: i64, rhs: i64) -> i64 {
        match self {
            OpKind::Add => lhs.wrapping_add(rhs),
            OpKind::Sub => lhs.wrapping_sub(rhs),
            OpKind::Mul => lhs.wrapping_mul(rhs),
            OpKind::Div => {
                if rhs == 0 {
                    panic!("division by zero");
                }
                lhs.wrapping_div(rhs)
            }
            OpKind::Rem => {
                if rhs == 0 {
                    panic!("remainder by zero");
                }
                lhs.wrapping_rem(rhs)
            }
            OpKind::BitAnd => lhs & rhs,
            OpKind::BitOr => lhs | rhs,
            OpKind::BitXor => lhs ^ rhs,
            OpKind::Shl => {
                let amount = rhs as u64;
                if amount >= 64 {
                    0
                } else {
                    ((lhs as u64) << amount) as i64
                }
            }
            OpKind::Shr => {
                let amount = rhs as u64;
                if amount >= 64 {
                    if lhs < 0 {
                        -1
                    } else {
                        0
                    }
                } else {
                    lhs >> amount
                }
            }
            OpKind::Eq => (lhs == rhs) as i64,
            OpKind::Ne => (lhs != rhs) as i64,
            OpKind::Lt => (lhs < rhs) as i64,
            OpKind::Le => (lhs <= rhs) as i64,
            OpKind::Gt => (lhs > rhs) as i64,
            OpKind::Ge => (lhs >= rhs) as i64,
        }
    }
}

/// One node of the expression DAG.
#[derive(Debug)]
pub enum Expr {
    /// An input variable. The concrete value is the one the variable
    /// carried when this node was built; it appears in the textual form
    /// but is ignored by structural equality.
    Var { name: String, concrete: i64 },

    /// A literal operand.
    Const(i64),

    /// An operator applied to ordered children.
    Op { op: OpKind, children: Vec<ExprRef> },
}

impl Expr {
    pub fn var(name: impl Into<String>, concrete: i64) -> ExprRef {
        Rc::new(Expr::Var {
            name: name.into(),
            concrete,
        })
    }

    pub fn constant(value: i64) -> ExprRef {
        Rc::new(Expr::Const(value))
    }

    pub fn op(op: OpKind, children: Vec<ExprRef>) -> ExprRef {
        Rc::new(Expr::Op { op, children })
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Expr::Var { .. })
    }

    /// Structural equality: operator, arity and child structure,
    /// recursively. Variables compare by name, constants by value.
    /// Never relies on node identity.
    pub fn structurally_eq(&self, other: &Expr) -> bool {
        match (self, other) {
            (Expr::Var { name: a, .. }, Expr::Var { name: b, .. }) => a == b,
            (Expr::Const(a), Expr::Const(b)) => a == b,
            (
                Expr::Op {
                    op: a,
                    children: ca,
                },
                Expr::Op {
                    op: b,
                    children: cb,
                },
            ) => {
                a == b
                    && ca.len() == cb.len()
                    && ca.iter().zip(cb.iter()).all(|(x, y)| x.structurally_eq(y))
            }
            _ => false,
        }
    }

    /// Collect the names of every variable reachable from this node.
    pub fn collect_vars(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Var { name, .. } => {
                out.insert(name.clone());
            }
            Expr::Const(_) => {}
            Expr::Op { children, .. } => {
                for child in children {
                    child.collect_vars(out);
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    /// `(op child1, child2)` for operators, `name#concrete` for
    /// variables, the plain value for constants.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var { name, concrete } => write!(f, "{}#{}", name, concrete),
            Expr::Const(v) => write!(f, "{}", v),
            Expr::Op { op, children } => {
                write!(f, "({} ", op.symbol())?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality_ignores_identity_and_concretes() {
        let a = Expr::op(
            OpKind::Gt,
            vec![Expr::var("x", 1), Expr::constant(5)],
        );
        let b = Expr::op(
            OpKind::Gt,
            vec![Expr::var("x", 99), Expr::constant(5)],
        );
        assert!(a.structurally_eq(&b));
        assert!(!Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn structural_equality_distinguishes_ops_and_operands() {
        let gt = Expr::op(OpKind::Gt, vec![Expr::var("x", 0), Expr::constant(5)]);
        let ge = Expr::op(OpKind::Ge, vec![Expr::var("x", 0), Expr::constant(5)]);
        let gt6 = Expr::op(OpKind::Gt, vec![Expr::var("x", 0), Expr::constant(6)]);
        let var_y = Expr::op(OpKind::Gt, vec![Expr::var("y", 0), Expr::constant(5)]);
        assert!(!gt.structurally_eq(&ge));
        assert!(!gt.structurally_eq(&gt6));
        assert!(!gt.structurally_eq(&var_y));
    }

    #[test]
    fn display_matches_textual_form() {
        let e = Expr::op(
            OpKind::Eq,
            vec![
                Expr::op(
                    OpKind::Rem,
                    vec![
                        Expr::op(OpKind::Mul, vec![Expr::var("x", 0), Expr::constant(2)]),
                        Expr::constant(5),
                    ],
                ),
                Expr::constant(0),
            ],
        );
        assert_eq!(e.to_string(), "(== (% (* x#0, 2), 5), 0)");
    }

    #[test]
    fn concrete_semantics_are_wrapping() {
        assert_eq!(OpKind::Add.apply(i64::MAX, 1), i64::MIN);
        assert_eq!(OpKind::Div.apply(i64::MIN, -1), i64::MIN);
        assert_eq!(OpKind::Rem.apply(-7, 5), -2);
        assert_eq!(OpKind::Shl.apply(1, 64), 0);
        assert_eq!(OpKind::Shr.apply(-8, 64), -1);
        assert_eq!(OpKind::Shr.apply(-8, 1), -4);
        assert_eq!(OpKind::Gt.apply(3, 2), 1);
        assert_eq!(OpKind::Gt.apply(2, 3), 0);
    }

    #[test]
    fn collect_vars_finds_every_leaf() {
        let e = Expr::op(
            OpKind::Add,
            vec![
                Expr::var("a", 0),
                Expr::op(OpKind::Mul, vec![Expr::var("b", 0), Expr::var("a", 0)]),
            ],
        );
        let mut vars = BTreeSet::new();
        e.collect_vars(&mut vars);
        assert_eq!(vars.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
