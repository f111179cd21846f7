//! Path recorder: observes branch decisions, grows the constraint tree,
//! and queues unexplored siblings.
//!
//! The recorder for the active exploration session lives in a
//! thread-local slot; `SymValue::truthy` reports every boolean coercion
//! to it. One session per thread.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use crate::expr::ExprRef;
use crate::tree::{ConstraintNode, NodeRef, Predicate};
use crate::value::SymValue;

thread_local! {
    static SESSION: RefCell<Option<Rc<RefCell<PathRecorder>>>> = const { RefCell::new(None) };
}

/// Install `recorder` as this thread's branch observer. Dropping the
/// guard tears the session down.
pub fn install(recorder: Rc<RefCell<PathRecorder>>) -> SessionGuard {
    SESSION.with(|slot| *slot.borrow_mut() = Some(recorder));
    SessionGuard { _priv: () }
}

/// Clears the session slot on drop.
pub struct SessionGuard {
    _priv: (),
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        SESSION.with(|slot| slot.borrow_mut().take());
    }
}

/// Report a coerced branch to the installed recorder, if any.
pub(crate) fn observe(branch: bool, value: &SymValue) {
    SESSION.with(|slot| {
        if let Some(recorder) = slot.borrow().as_ref() {
            recorder.borrow_mut().which_branch(branch, value);
        }
    });
}

/// Walks and extends the constraint tree as one execution unfolds.
pub struct PathRecorder {
    root: NodeRef,
    current: NodeRef,
    expected_path: Option<Vec<Predicate>>,
    pending: Rc<RefCell<VecDeque<NodeRef>>>,
    inputs: BTreeMap<String, SymValue>,
    next_id: u64,
}

impl PathRecorder {
    /// `pending` is the engine's worklist; the recorder publishes
    /// unexplored siblings into it.
    pub fn new(pending: Rc<RefCell<VecDeque<NodeRef>>>) -> Self {
        let root = ConstraintNode::root();
        PathRecorder {
            current: Rc::clone(&root),
            root,
            expected_path: None,
            pending,
            inputs: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub fn root(&self) -> NodeRef {
        Rc::clone(&self.root)
    }

    /// Rewind to the root before an execution. `expected` is the node
    /// the engine is replaying toward, kept as metadata only; `inputs`
    /// is the mapping for the coming run, snapshotted onto any node
    /// enqueued during it.
    pub fn reset(&mut self, expected: Option<&NodeRef>, inputs: BTreeMap<String, SymValue>) {
        self.current = Rc::clone(&self.root);
        self.inputs = inputs;
        self.expected_path = expected.map(ConstraintNode::path_from_root);
        if let Some(path) = &self.expected_path {
            log::debug!(
                "replaying toward: [{}]",
                path.iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }

    /// One observed branch: materialize both polarities under the
    /// current node, queue the opposite side if it is still unexplored,
    /// mark the taken side processed, and step into it.
    pub fn which_branch(&mut self, branch: bool, value: &SymValue) {
        let taken_pred = Predicate::new(value.expr(), branch);
        let opp_pred = taken_pred.negated();

        let taken = self.find_or_add_child(&taken_pred);
        let opp = self.find_or_add_child(&opp_pred);
        log::debug!("stepping into: {}", taken.borrow());

        let unexplored = {
            let o = opp.borrow();
            !o.processed && !o.attempted
        };
        if unexplored && !self.queued(&opp) {
            log::debug!("queuing opposite branch for later: {}", opp.borrow());
            opp.borrow_mut().inputs = Some(self.inputs.clone());
            self.pending.borrow_mut().push_back(Rc::clone(&opp));
        }

        taken.borrow_mut().processed = true;
        self.current = taken;
    }

    fn find_or_add_child(&mut self, predicate: &Predicate) -> NodeRef {
        let existing = self.current.borrow().find_child(predicate);
        match existing {
            Some(node) => node,
            None => {
                self.next_id += 1;
                ConstraintNode::child(&self.current, self.next_id, predicate.clone())
            }
        }
    }

    fn queued(&self, node: &NodeRef) -> bool {
        self.pending.borrow().iter().any(|n| Rc::ptr_eq(n, node))
    }

    /// Condition coverage over the whole tree: each child contributes
    /// one condition keyed by its governing expression and polarity,
    /// deduplicated structurally across the tree. Returns
    /// `(covered, total)`.
    pub fn condition_coverage(&self) -> (usize, usize) {
        let mut visited: Vec<(ExprRef, bool)> = Vec::new();
        let mut covered = 0;
        let mut total = 0;
        Self::coverage_walk(&self.root, &mut visited, &mut covered, &mut total);
        (covered, total)
    }

    fn coverage_walk(
        node: &NodeRef,
        visited: &mut Vec<(ExprRef, bool)>,
        covered: &mut usize,
        total: &mut usize,
    ) {
        for child in &node.borrow().children {
            {
                let c = child.borrow();
                if let Some(pred) = &c.predicate {
                    let seen = visited
                        .iter()
                        .any(|(e, pol)| *pol == pred.polarity && e.structurally_eq(&pred.expr));
                    if !seen {
                        visited.push((Rc::clone(&pred.expr), pred.polarity));
                        *total += 1;
                        if c.processed {
                            *covered += 1;
                        }
                    }
                }
            }
            Self::coverage_walk(child, visited, covered, total);
        }
    }

    /// Render the tree in DOT format: `C{id}` nodes labelled with the
    /// predicate (`Not(expr)` for the false polarity, `root` at the
    /// root), and an edge from every parent to each child.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph {\n");
        Self::dot_walk(&self.root, &mut out);
        out.push_str("\n}\n");
        out
    }

    fn dot_walk(node: &NodeRef, out: &mut String) {
        let label = {
            let n = node.borrow();
            match &n.predicate {
                Some(p) => p.to_string(),
                None => "root".to_string(),
            }
        };
        let id = node.borrow().id;
        out.push_str(&format!("C{} [ label=\"{}\" ];\n", id, label));
        for child in &node.borrow().children {
            out.push_str(&format!("C{} -> C{};\n", id, child.borrow().id));
        }
        for child in &node.borrow().children {
            Self::dot_walk(child, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;

    fn fresh() -> (PathRecorder, Rc<RefCell<VecDeque<NodeRef>>>) {
        let pending = Rc::new(RefCell::new(VecDeque::new()));
        (PathRecorder::new(Rc::clone(&pending)), pending)
    }

    #[test]
    fn both_polarities_materialize_and_opposite_is_queued() {
        let (mut rec, pending) = fresh();
        rec.reset(None, BTreeMap::new());

        let x = SymValue::new_var("x", 1);
        rec.which_branch(true, &x.gt(0));

        let root = rec.root();
        assert_eq!(root.borrow().children.len(), 2);
        assert!(root.borrow().children[0].borrow().processed);
        assert!(!root.borrow().children[1].borrow().processed);
        assert_eq!(pending.borrow().len(), 1);
        assert!(pending.borrow()[0].borrow().inputs.is_some());
    }

    #[test]
    fn replay_with_fresh_instances_visits_the_same_nodes() {
        let (mut rec, pending) = fresh();

        rec.reset(None, BTreeMap::new());
        let x = SymValue::new_var("x", 1);
        rec.which_branch(true, &x.gt(0));

        rec.reset(None, BTreeMap::new());
        let x2 = SymValue::new_var("x", 7);
        rec.which_branch(true, &x2.gt(0));

        assert_eq!(rec.root().borrow().children.len(), 2);
        assert_eq!(pending.borrow().len(), 1);
    }

    #[test]
    fn attempted_nodes_are_never_requeued() {
        let (mut rec, pending) = fresh();

        rec.reset(None, BTreeMap::new());
        let x = SymValue::new_var("x", 1);
        rec.which_branch(true, &x.gt(0));

        let node = pending.borrow_mut().pop_front().unwrap();
        node.borrow_mut().attempted = true;

        rec.reset(None, BTreeMap::new());
        let x2 = SymValue::new_var("x", 2);
        rec.which_branch(true, &x2.gt(0));

        assert!(pending.borrow().is_empty());
    }

    #[test]
    fn coverage_counts_distinct_conditions_structurally() {
        let (mut rec, _pending) = fresh();

        rec.reset(None, BTreeMap::new());
        let x = SymValue::new_var("x", 1);
        rec.which_branch(true, &x.gt(0));

        let (covered, total) = rec.condition_coverage();
        assert_eq!((covered, total), (1, 2));

        // A second run down the other side covers the sibling without
        // adding conditions.
        rec.reset(None, BTreeMap::new());
        let x2 = SymValue::new_var("x", -1);
        rec.which_branch(false, &x2.gt(0));

        let (covered, total) = rec.condition_coverage();
        assert_eq!((covered, total), (2, 2));
    }

    #[test]
    fn empty_tree_has_no_conditions() {
        let (rec, _pending) = fresh();
        assert_eq!(rec.condition_coverage(), (0, 0));
    }

    #[test]
    fn dot_output_is_exact() {
        let (mut rec, _pending) = fresh();
        rec.reset(None, BTreeMap::new());
        let x = SymValue::new_var("x", 1);
        rec.which_branch(true, &value::gt(&x, 0));

        assert_eq!(
            rec.to_dot(),
            "digraph {\n\
             C0 [ label=\"root\" ];\n\
             C0 -> C1;\n\
             C0 -> C2;\n\
             C1 [ label=\"(> x#1, 0)\" ];\n\
             C2 [ label=\"Not((> x#1, 0))\" ];\n\
             \n}\n"
        );
    }
}
