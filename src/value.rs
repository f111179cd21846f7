//! Symbolic values: the shadow scalars a subject computes on.
//!
//! A `SymValue` pairs the concrete `i64` an uninstrumented run would see
//! at this program point with the expression DAG describing how it was
//! derived from the inputs. Arithmetic and bitwise operators are
//! available both as explicit combinators and as `std::ops` sugar for
//! every mix of `SymValue`, `&SymValue` and `i64` operands; either way
//! the concrete part is computed in native semantics and the operands
//! keep their written order inside the DAG. Comparisons are inherent
//! methods because the comparison traits of the standard library return
//! a native `bool`.
//!
//! `truthy()` is the boolean coercion: it yields the concrete truth and
//! reports the decision to the recorder installed for the current
//! session, which is the only way the engine observes control flow.

use std::rc::Rc;

use crate::expr::{Expr, ExprRef, OpKind};
use crate::recorder;

/// A shadow integer: concrete value plus expression DAG.
#[derive(Debug, Clone)]
pub struct SymValue {
    concrete: i64,
    expr: ExprRef,
}

impl SymValue {
    /// A raw input variable.
    pub fn new_var(name: impl Into<String>, concrete: i64) -> Self {
        let name = name.into();
        let expr = Expr::var(name, concrete);
        SymValue { concrete, expr }
    }

    pub(crate) fn derived(concrete: i64, expr: ExprRef) -> Self {
        SymValue { concrete, expr }
    }

    pub fn concrete(&self) -> i64 {
        self.concrete
    }

    pub fn expr(&self) -> ExprRef {
        Rc::clone(&self.expr)
    }

    /// True when this value is an untouched input variable.
    pub fn is_variable(&self) -> bool {
        self.expr.is_var()
    }

    pub fn name(&self) -> Option<&str> {
        match &*self.expr {
            Expr::Var { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Boolean coercion. Reports the taken polarity and the governing
    /// value to the session recorder, if one is installed.
    pub fn truthy(&self) -> bool {
        let branch = self.concrete != 0;
        recorder::observe(branch, self);
        branch
    }

    pub fn lt<R: IntoOperand>(&self, rhs: R) -> SymValue {
        binop(OpKind::Lt, self, rhs)
    }

    pub fn le<R: IntoOperand>(&self, rhs: R) -> SymValue {
        binop(OpKind::Le, self, rhs)
    }

    pub fn gt<R: IntoOperand>(&self, rhs: R) -> SymValue {
        binop(OpKind::Gt, self, rhs)
    }

    pub fn ge<R: IntoOperand>(&self, rhs: R) -> SymValue {
        binop(OpKind::Ge, self, rhs)
    }

    /// Symbolic equality test. Distinct from the structural equality of
    /// expression DAGs (`Expr::structurally_eq`), which the engine uses
    /// internally.
    pub fn _eq<R: IntoOperand>(&self, rhs: R) -> SymValue {
        binop(OpKind::Eq, self, rhs)
    }

    pub fn _ne<R: IntoOperand>(&self, rhs: R) -> SymValue {
        binop(OpKind::Ne, self, rhs)
    }
}

/// One side of a binary operation: either a symbolic value or a literal
/// that will appear as a `Const` leaf.
pub enum Operand {
    Sym(SymValue),
    Lit(i64),
}

impl Operand {
    fn concrete(&self) -> i64 {
        match self {
            Operand::Sym(v) => v.concrete,
            Operand::Lit(v) => *v,
        }
    }

    fn expr(&self) -> ExprRef {
        match self {
            Operand::Sym(v) => v.expr(),
            Operand::Lit(v) => Expr::constant(*v),
        }
    }
}

pub trait IntoOperand {
    fn into_operand(self) -> Operand;
}

impl IntoOperand for SymValue {
    fn into_operand(self) -> Operand {
        Operand::Sym(self)
    }
}

impl IntoOperand for &SymValue {
    fn into_operand(self) -> Operand {
        Operand::Sym(self.clone())
    }
}

impl IntoOperand for i64 {
    fn into_operand(self) -> Operand {
        Operand::Lit(self)
    }
}

/// The single combinator every operator routes through: concrete part in
/// native semantics, expression part `Op(op, [lhs, rhs])` in written
/// order.
pub fn binop(op: OpKind, lhs: impl IntoOperand, rhs: impl IntoOperand) -> SymValue {
    let (lhs, rhs) = (lhs.into_operand(), rhs.into_operand());
    let concrete = op.apply(lhs.concrete(), rhs.concrete());
    SymValue::derived(concrete, Expr::op(op, vec![lhs.expr(), rhs.expr()]))
}

// Order-preserving comparison builders, usable with a literal on either
// side.

pub fn lt(lhs: impl IntoOperand, rhs: impl IntoOperand) -> SymValue {
    binop(OpKind::Lt, lhs, rhs)
}

pub fn le(lhs: impl IntoOperand, rhs: impl IntoOperand) -> SymValue {
    binop(OpKind::Le, lhs, rhs)
}

pub fn gt(lhs: impl IntoOperand, rhs: impl IntoOperand) -> SymValue {
    binop(OpKind::Gt, lhs, rhs)
}

pub fn ge(lhs: impl IntoOperand, rhs: impl IntoOperand) -> SymValue {
    binop(OpKind::Ge, lhs, rhs)
}

pub fn eq(lhs: impl IntoOperand, rhs: impl IntoOperand) -> SymValue {
    binop(OpKind::Eq, lhs, rhs)
}

pub fn ne(lhs: impl IntoOperand, rhs: impl IntoOperand) -> SymValue {
    binop(OpKind::Ne, lhs, rhs)
}

macro_rules! symvalue_binop {
    ($trait:ident, $method:ident, $op:expr) => {
        impl std::ops::$trait<&SymValue> for &SymValue {
            type Output = SymValue;
            fn $method(self, rhs: &SymValue) -> SymValue {
                binop($op, self, rhs)
            }
        }

        impl std::ops::$trait<SymValue> for &SymValue {
            type Output = SymValue;
            fn $method(self, rhs: SymValue) -> SymValue {
                binop($op, self, rhs)
            }
        }

        impl std::ops::$trait<&SymValue> for SymValue {
            type Output = SymValue;
            fn $method(self, rhs: &SymValue) -> SymValue {
                binop($op, self, rhs)
            }
        }

        impl std::ops::$trait<SymValue> for SymValue {
            type Output = SymValue;
            fn $method(self, rhs: SymValue) -> SymValue {
                binop($op, self, rhs)
            }
        }

        impl std::ops::$trait<i64> for &SymValue {
            type Output = SymValue;
            fn $method(self, rhs: i64) -> SymValue {
                binop($op, self, rhs)
            }
        }

        impl std::ops::$trait<i64> for SymValue {
            type Output = SymValue;
            fn $method(self, rhs: i64) -> SymValue {
                binop($op, self, rhs)
            }
        }

        impl std::ops::$trait<&SymValue> for i64 {
            type Output = SymValue;
            fn $method(self, rhs: &SymValue) -> SymValue {
                binop($op, self, rhs)
            }
        }

        impl std::ops::$trait<SymValue> for i64 {
            type Output = SymValue;
            fn $method(self, rhs: SymValue) -> SymValue {
                binop($op, self, rhs)
            }
        }
    };
}

symvalue_binop!(Add, add, OpKind::Add);
symvalue_binop!(Sub, sub, OpKind::Sub);
symvalue_binop!(Mul, mul, OpKind::Mul);
symvalue_binop!(Div, div, OpKind::Div);
symvalue_binop!(Rem, rem, OpKind::Rem);
symvalue_binop!(BitAnd, bitand, OpKind::BitAnd);
symvalue_binop!(BitOr, bitor, OpKind::BitOr);
symvalue_binop!(BitXor, bitxor, OpKind::BitXor);
symvalue_binop!(Shl, shl, OpKind::Shl);
symvalue_binop!(Shr, shr, OpKind::Shr);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concrete_fidelity_over_compound_expression() {
        let x = SymValue::new_var("x", 7);
        let v = (&x * 2 + 1) % 5;
        assert_eq!(v.concrete(), (7 * 2 + 1) % 5);
        assert_eq!(v.expr().to_string(), "(% (+ (* x#7, 2), 1), 5)");
    }

    #[test]
    fn reversed_operands_keep_written_order() {
        let x = SymValue::new_var("x", 5);
        let v = 2 - &x;
        assert_eq!(v.concrete(), -3);
        assert_eq!(v.expr().to_string(), "(- 2, x#5)");
    }

    #[test]
    fn comparison_builders_preserve_literal_side() {
        let x = SymValue::new_var("x", 5);
        let left_lit = lt(2, &x);
        assert_eq!(left_lit.concrete(), 1);
        assert_eq!(left_lit.expr().to_string(), "(< 2, x#5)");

        let right_lit = x.gt(2);
        assert_eq!(right_lit.concrete(), 1);
        assert_eq!(right_lit.expr().to_string(), "(> x#5, 2)");
    }

    #[test]
    fn variable_and_derived_classification() {
        let x = SymValue::new_var("x", 0);
        assert!(x.is_variable());
        assert_eq!(x.name(), Some("x"));

        let d = &x + 1;
        assert!(!d.is_variable());
        assert_eq!(d.name(), None);
    }

    #[test]
    fn truthy_without_session_is_plain_coercion() {
        let x = SymValue::new_var("x", 3);
        assert!(x.truthy());
        assert!(!x._eq(4).truthy());
        assert!(x._eq(3).truthy());
    }

    #[test]
    fn bitwise_and_shift_sugar() {
        let x = SymValue::new_var("x", 0b1100);
        assert_eq!((&x & 0b1010).concrete(), 0b1000);
        assert_eq!((&x | 1).concrete(), 0b1101);
        assert_eq!((&x ^ 0b1111).concrete(), 0b0011);
        assert_eq!((&x << 2).concrete(), 0b110000);
        assert_eq!((&x >> 2).concrete(), 0b11);
        assert_eq!((&x >> 2).expr().to_string(), "(>> x#12, 2)");
    }
}
