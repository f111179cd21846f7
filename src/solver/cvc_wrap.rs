//! CVC adapter.
//!
//! Drives a `cvc5` binary over SMT-LIB2 text on stdin/stdout, with the
//! same 64-bit bitvector lowering as the Z3 adapter. Every failure mode
//! (missing binary, malformed output, unsat, timeout) surfaces as
//! "no model".

use std::collections::BTreeSet;
use std::io::Write;
use std::process::{Command, Stdio};

use super::{Model, SmtBackend, SOLVER_TIMEOUT_MS};
use crate::expr::{Expr, OpKind};
use crate::tree::Predicate;

pub struct CvcWrapper {
    binary: String,
    timeout_ms: u32,
}

impl CvcWrapper {
    pub fn new() -> Self {
        CvcWrapper {
            binary: "cvc5".to_string(),
            timeout_ms: SOLVER_TIMEOUT_MS,
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        CvcWrapper {
            binary: binary.into(),
            timeout_ms: SOLVER_TIMEOUT_MS,
        }
    }

    fn run_script(&self, script: &str) -> Option<String> {
        let mut child = Command::new(&self.binary)
            .arg("--lang")
            .arg("smt2")
            .arg(format!("--tlimit={}", self.timeout_ms))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| log::warn!("cvc: failed to spawn '{}': {}", self.binary, e))
            .ok()?;

        if let Some(stdin) = child.stdin.take() {
            let mut stdin = stdin;
            stdin
                .write_all(script.as_bytes())
                .map_err(|e| log::warn!("cvc: failed to write script: {}", e))
                .ok()?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| log::warn!("cvc: failed to read output: {}", e))
            .ok()?;
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for CvcWrapper {
    fn default() -> Self {
        Self::new()
    }
}

impl SmtBackend for CvcWrapper {
    fn name(&self) -> &'static str {
        "cvc"
    }

    fn find_counterexample(&self, asserts: &[Predicate], query: &Predicate) -> Option<Model> {
        let mut vars = BTreeSet::new();
        for predicate in asserts.iter().chain(std::iter::once(query)) {
            predicate.expr.collect_vars(&mut vars);
        }

        let script = build_script(asserts, query, &vars);
        let output = self.run_script(&script)?;

        let mut lines = output.lines().map(str::trim).filter(|l| !l.is_empty());
        match lines.next() {
            Some("sat") => {}
            Some("unsat") => {
                log::debug!("cvc: unsat");
                return None;
            }
            other => {
                log::debug!("cvc: no answer ({:?})", other);
                return None;
            }
        }

        let values: String = lines.collect::<Vec<_>>().join(" ");
        let mut model = Model::new();
        for name in &vars {
            let token = extract_binding(&values, name)?;
            model.insert(name.clone(), parse_bv_value(&token)?);
        }
        Some(model)
    }
}

fn build_script(asserts: &[Predicate], query: &Predicate, vars: &BTreeSet<String>) -> String {
    let mut script = String::new();
    script.push_str("(set-option :produce-models true)\n");
    script.push_str("(set-logic QF_BV)\n");
    for name in vars {
        script.push_str(&format!("(declare-const {} (_ BitVec 64))\n", name));
    }
    for predicate in asserts.iter().chain(std::iter::once(query)) {
        script.push_str(&format!("(assert {})\n", smt_pred(predicate)));
    }
    script.push_str("(check-sat)\n");
    if !vars.is_empty() {
        let names: Vec<&str> = vars.iter().map(String::as_str).collect();
        script.push_str(&format!("(get-value ({}))\n", names.join(" ")));
    }
    script
}

fn smt_pred(predicate: &Predicate) -> String {
    let cond = smt_bool(&predicate.expr);
    if predicate.polarity {
        cond
    } else {
        format!("(not {})", cond)
    }
}

fn smt_bool(expr: &Expr) -> String {
    match expr {
        Expr::Op { op, children } if op.is_comparison() => {
            let lhs = smt_bv(&children[0]);
            let rhs = smt_bv(&children[1]);
            match op {
                OpKind::Eq => format!("(= {} {})", lhs, rhs),
                OpKind::Ne => format!("(not (= {} {}))", lhs, rhs),
                OpKind::Lt => format!("(bvslt {} {})", lhs, rhs),
                OpKind::Le => format!("(bvsle {} {})", lhs, rhs),
                OpKind::Gt => format!("(bvsgt {} {})", lhs, rhs),
                OpKind::Ge => format!("(bvsge {} {})", lhs, rhs),
                _ => unreachable!("comparison operator expected"),
            }
        }
        other => format!("(not (= {} {}))", smt_bv(other), smt_const(0)),
    }
}

fn smt_bv(expr: &Expr) -> String {
    match expr {
        Expr::Var { name, .. } => name.clone(),
        Expr::Const(v) => smt_const(*v),
        Expr::Op { op, .. } if op.is_comparison() => {
            format!("(ite {} {} {})", smt_bool(expr), smt_const(1), smt_const(0))
        }
        Expr::Op { op, children } => {
            let fun = match op {
                OpKind::Add => "bvadd",
                OpKind::Sub => "bvsub",
                OpKind::Mul => "bvmul",
                OpKind::Div => "bvsdiv",
                OpKind::Rem => "bvsrem",
                OpKind::BitAnd => "bvand",
                OpKind::BitOr => "bvor",
                OpKind::BitXor => "bvxor",
                OpKind::Shl => "bvshl",
                OpKind::Shr => "bvashr",
                _ => unreachable!("arithmetic operator expected"),
            };
            format!("({} {} {})", fun, smt_bv(&children[0]), smt_bv(&children[1]))
        }
    }
}

fn smt_const(v: i64) -> String {
    format!("#x{:016x}", v as u64)
}

/// Pull the value token bound to `name` out of a `(get-value …)` answer
/// such as `((x #b0…01) (y (_ bv5 64)))`.
fn extract_binding(answer: &str, name: &str) -> Option<String> {
    let needle = format!("({} ", name);
    let start = answer.find(&needle)? + needle.len();
    let rest = &answer[start..];
    let mut depth = 0usize;
    for (i, c) in rest.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return Some(rest[..i].trim().to_string());
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    None
}

fn parse_bv_value(token: &str) -> Option<i64> {
    if let Some(bits) = token.strip_prefix("#b") {
        return u64::from_str_radix(bits, 2).ok().map(|v| v as i64);
    }
    if let Some(hex) = token.strip_prefix("#x") {
        return u64::from_str_radix(hex, 16).ok().map(|v| v as i64);
    }
    // (_ bvN 64)
    let inner = token.strip_prefix("(_ bv")?;
    let digits: String = inner.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<u64>().ok().map(|v| v as i64)
}
