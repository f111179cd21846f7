//! Z3 adapter.
//!
//! Expressions lower to 64-bit bitvector terms, whose wrapping
//! two's-complement semantics coincide with the concrete `i64`
//! evaluation in [`crate::expr::OpKind::apply`]. A comparison used where
//! an integer is expected becomes `ite(cond, 1, 0)`; an integer used
//! where a boolean is expected becomes `term != 0`.

use std::collections::HashMap;

use z3::ast::{Ast, Bool, BV};
use z3::{Config, Context, SatResult, Solver};

use super::{Model, SmtBackend, SOLVER_TIMEOUT_MS};
use crate::expr::{Expr, OpKind};
use crate::tree::Predicate;

pub struct Z3Wrapper {
    timeout_ms: u32,
}

impl Z3Wrapper {
    pub fn new() -> Self {
        Z3Wrapper {
            timeout_ms: SOLVER_TIMEOUT_MS,
        }
    }
}

impl Default for Z3Wrapper {
    fn default() -> Self {
        Self::new()
    }
}

impl SmtBackend for Z3Wrapper {
    fn name(&self) -> &'static str {
        "z3"
    }

    fn find_counterexample(&self, asserts: &[Predicate], query: &Predicate) -> Option<Model> {
        let mut cfg = Config::new();
        cfg.set_param_value("timeout", &self.timeout_ms.to_string());
        let ctx = Context::new(&cfg);
        let solver = Solver::new(&ctx);

        let mut vars: HashMap<String, BV> = HashMap::new();
        for predicate in asserts.iter().chain(std::iter::once(query)) {
            solver.assert(&lower_predicate(&ctx, &mut vars, predicate));
        }

        match solver.check() {
            SatResult::Sat => {
                let model = solver.get_model()?;
                let mut assignment = Model::new();
                for (name, term) in &vars {
                    let value = model.eval(term, true).and_then(|v| v.as_i64())?;
                    assignment.insert(name.clone(), value);
                }
                Some(assignment)
            }
            SatResult::Unsat => {
                log::debug!("z3: unsat");
                None
            }
            SatResult::Unknown => {
                log::debug!("z3: unknown (timeout or undecidable)");
                None
            }
        }
    }
}

fn lower_predicate<'ctx>(
    ctx: &'ctx Context,
    vars: &mut HashMap<String, BV<'ctx>>,
    predicate: &Predicate,
) -> Bool<'ctx> {
    let cond = lower_bool(ctx, vars, &predicate.expr);
    if predicate.polarity {
        cond
    } else {
        cond.not()
    }
}

fn lower_bool<'ctx>(
    ctx: &'ctx Context,
    vars: &mut HashMap<String, BV<'ctx>>,
    expr: &Expr,
) -> Bool<'ctx> {
    match expr {
        Expr::Op { op, children } if op.is_comparison() => {
            let lhs = lower_bv(ctx, vars, &children[0]);
            let rhs = lower_bv(ctx, vars, &children[1]);
            match op {
                OpKind::Eq => lhs._eq(&rhs),
                OpKind::Ne => lhs._eq(&rhs).not(),
                OpKind::Lt => lhs.bvslt(&rhs),
                OpKind::Le => lhs.bvsle(&rhs),
                OpKind::Gt => lhs.bvsgt(&rhs),
                OpKind::Ge => lhs.bvsge(&rhs),
                _ => unreachable!("comparison operator expected"),
            }
        }
        other => {
            // Truthiness of an integer-valued expression.
            lower_bv(ctx, vars, other)
                ._eq(&BV::from_i64(ctx, 0, 64))
                .not()
        }
    }
}

fn lower_bv<'ctx>(
    ctx: &'ctx Context,
    vars: &mut HashMap<String, BV<'ctx>>,
    expr: &Expr,
) -> BV<'ctx> {
    match expr {
        Expr::Var { name, .. } => vars
            .entry(name.clone())
            .or_insert_with(|| BV::new_const(ctx, name.as_str(), 64))
            .clone(),
        Expr::Const(v) => BV::from_i64(ctx, *v, 64),
        Expr::Op { op, .. } if op.is_comparison() => {
            let cond = lower_bool(ctx, vars, expr);
            cond.ite(&BV::from_i64(ctx, 1, 64), &BV::from_i64(ctx, 0, 64))
        }
        Expr::Op { op, children } => {
            let lhs = lower_bv(ctx, vars, &children[0]);
            let rhs = lower_bv(ctx, vars, &children[1]);
            match op {
                OpKind::Add => lhs.bvadd(&rhs),
                OpKind::Sub => lhs.bvsub(&rhs),
                OpKind::Mul => lhs.bvmul(&rhs),
                OpKind::Div => lhs.bvsdiv(&rhs),
                OpKind::Rem => lhs.bvsrem(&rhs),
                OpKind::BitAnd => lhs.bvand(&rhs),
                OpKind::BitOr => lhs.bvor(&rhs),
                OpKind::BitXor => lhs.bvxor(&rhs),
                OpKind::Shl => lhs.bvshl(&rhs),
                OpKind::Shr => lhs.bvashr(&rhs),
                _ => unreachable!("arithmetic operator expected"),
            }
        }
    }
}
