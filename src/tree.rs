//! The constraint tree: one node per observed branch predicate.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::expr::ExprRef;
use crate::value::SymValue;

/// A branch decision: the governing expression evaluated to `polarity`.
#[derive(Clone)]
pub struct Predicate {
    pub expr: ExprRef,
    pub polarity: bool,
}

impl Predicate {
    pub fn new(expr: ExprRef, polarity: bool) -> Self {
        Predicate { expr, polarity }
    }

    /// The same governing expression with the opposite polarity.
    pub fn negated(&self) -> Predicate {
        Predicate {
            expr: Rc::clone(&self.expr),
            polarity: !self.polarity,
        }
    }

    /// Polarity plus structural equality of the governing expressions.
    /// Object identity plays no part, so a replay with fresh value
    /// instances matches the recorded predicate.
    pub fn structurally_eq(&self, other: &Predicate) -> bool {
        self.polarity == other.polarity && self.expr.structurally_eq(&other.expr)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.polarity {
            write!(f, "{}", self.expr)
        } else {
            write!(f, "Not({})", self.expr)
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// A shared handle to a tree node.
pub type NodeRef = Rc<RefCell<ConstraintNode>>;

/// One observed branch in the prefix tree of path conditions.
///
/// `processed` means a concrete execution has been shown to traverse the
/// node; only the recorder sets it. `attempted` means the engine has
/// dequeued the node and spent its single solver call on it; it is never
/// enqueued again. `inputs` is the snapshot of the input mapping taken
/// when the node was enqueued.
pub struct ConstraintNode {
    pub id: u64,
    pub parent: Option<Weak<RefCell<ConstraintNode>>>,
    pub predicate: Option<Predicate>,
    pub children: Vec<NodeRef>,
    pub processed: bool,
    pub attempted: bool,
    pub inputs: Option<BTreeMap<String, SymValue>>,
}

impl ConstraintNode {
    /// The root: no parent, no predicate, id 0.
    pub fn root() -> NodeRef {
        Rc::new(RefCell::new(ConstraintNode {
            id: 0,
            parent: None,
            predicate: None,
            children: Vec::new(),
            processed: true,
            attempted: false,
            inputs: None,
        }))
    }

    pub fn child(parent: &NodeRef, id: u64, predicate: Predicate) -> NodeRef {
        let node = Rc::new(RefCell::new(ConstraintNode {
            id,
            parent: Some(Rc::downgrade(parent)),
            predicate: Some(predicate),
            children: Vec::new(),
            processed: false,
            attempted: false,
            inputs: None,
        }));
        parent.borrow_mut().children.push(Rc::clone(&node));
        node
    }

    /// Find an existing child whose predicate is structurally equal.
    pub fn find_child(&self, predicate: &Predicate) -> Option<NodeRef> {
        self.children
            .iter()
            .find(|c| {
                c.borrow()
                    .predicate
                    .as_ref()
                    .is_some_and(|p| p.structurally_eq(predicate))
            })
            .cloned()
    }

    /// The predicates on the path from the root down to `node`,
    /// inclusive, in root-first order.
    pub fn path_from_root(node: &NodeRef) -> Vec<Predicate> {
        let mut path = Vec::new();
        let mut cursor = Some(Rc::clone(node));
        while let Some(current) = cursor {
            let borrowed = current.borrow();
            if let Some(p) = &borrowed.predicate {
                path.push(p.clone());
            }
            cursor = borrowed
                .parent
                .as_ref()
                .and_then(|w| w.upgrade());
        }
        path.reverse();
        path
    }

    /// Split the path condition of `node` into the ancestor assertions
    /// and the predicate at the node itself. Returns `None` on the root.
    pub fn asserts_and_query(node: &NodeRef) -> Option<(Vec<Predicate>, Predicate)> {
        let query = node.borrow().predicate.clone()?;
        let mut asserts = Self::path_from_root(node);
        asserts.pop();
        Some((asserts, query))
    }
}

impl fmt::Display for ConstraintNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.predicate {
            Some(p) => write!(f, "C{}: {}", self.id, p),
            None => write!(f, "C{}: root", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Expr, OpKind};

    fn pred(polarity: bool) -> Predicate {
        Predicate::new(
            Expr::op(OpKind::Gt, vec![Expr::var("x", 0), Expr::constant(5)]),
            polarity,
        )
    }

    #[test]
    fn negation_flips_polarity_only() {
        let p = pred(true);
        let n = p.negated();
        assert!(!n.polarity);
        assert!(Rc::ptr_eq(&p.expr, &n.expr));
        assert!(!p.structurally_eq(&n));
    }

    #[test]
    fn asserts_and_query_walks_ancestors_in_order() {
        let root = ConstraintNode::root();
        let a = ConstraintNode::child(&root, 1, pred(false));
        let b = ConstraintNode::child(
            &a,
            2,
            Predicate::new(
                Expr::op(OpKind::Eq, vec![Expr::var("x", 0), Expr::constant(3)]),
                true,
            ),
        );

        let (asserts, query) = ConstraintNode::asserts_and_query(&b).unwrap();
        assert_eq!(asserts.len(), 1);
        assert_eq!(asserts[0].to_string(), "Not((> x#0, 5))");
        assert_eq!(query.to_string(), "(== x#0, 3)");

        assert!(ConstraintNode::asserts_and_query(&root).is_none());
    }

    #[test]
    fn find_child_matches_structurally() {
        let root = ConstraintNode::root();
        ConstraintNode::child(&root, 1, pred(true));

        let fresh = Predicate::new(
            Expr::op(OpKind::Gt, vec![Expr::var("x", 42), Expr::constant(5)]),
            true,
        );
        assert!(root.borrow().find_child(&fresh).is_some());
        assert!(root.borrow().find_child(&fresh.negated()).is_none());
    }
}
