//! The exploration engine.
//!
//! Seeds symbolic inputs from the invocation adapter, runs the subject,
//! and then drains a FIFO worklist of unexplored branches: for each
//! pending branch it asks the SMT backend for an input vector that flips
//! the branch relative to the snapshot taken when the branch was
//! enqueued, swaps the affected inputs, and reruns. Exploration ends
//! when the worklist drains or the iteration budget is spent.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use serde::Serialize;

use crate::invocation::{FunctionInvocation, SubjectOutcome};
use crate::recorder::{self, PathRecorder, SessionGuard};
use crate::solver::{SmtBackend, SolverKind};
use crate::tree::{ConstraintNode, NodeRef};
use crate::value::SymValue;

/// Everything one exploration produced.
#[derive(Debug, Serialize)]
pub struct ExplorationReport {
    /// One entry per execution: the concrete inputs it ran on, in
    /// declaration order.
    pub generated_inputs: Vec<Vec<(String, i64)>>,
    /// One entry per execution: what the subject returned (or the panic
    /// it raised).
    pub execution_return_values: Vec<SubjectOutcome>,
    pub covered_conditions: usize,
    pub total_conditions: usize,
    /// DOT rendering of the final constraint tree.
    pub dot: String,
    /// DOT snapshots taken after each execution, when capture was
    /// requested.
    pub dot_snapshots: Vec<String>,
    /// Pending branches left behind on budget exhaustion.
    pub worklist_remaining: usize,
}

impl ExplorationReport {
    /// `covered / total × 100`, with an empty tree counting as fully
    /// covered.
    pub fn coverage_percent(&self) -> f64 {
        if self.total_conditions == 0 {
            100.0
        } else {
            self.covered_conditions as f64 / self.total_conditions as f64 * 100.0
        }
    }
}

/// Orchestrates runs, solving and input mutation for one subject.
pub struct ExplorationEngine {
    invocation: FunctionInvocation,
    names: Vec<String>,
    inputs: BTreeMap<String, SymValue>,
    worklist: Rc<RefCell<VecDeque<NodeRef>>>,
    recorder: Rc<RefCell<PathRecorder>>,
    backend: Box<dyn SmtBackend>,
    num_processed: usize,
    capture_dot: bool,
    _session: SessionGuard,
}

impl ExplorationEngine {
    pub fn new(invocation: FunctionInvocation, solver: SolverKind) -> Self {
        Self::with_backend(invocation, solver.backend())
    }

    /// Build an engine around any backend; the seam used by tests to
    /// inject deterministic solvers.
    pub fn with_backend(invocation: FunctionInvocation, backend: Box<dyn SmtBackend>) -> Self {
        let worklist = Rc::new(RefCell::new(VecDeque::new()));
        let recorder = Rc::new(RefCell::new(PathRecorder::new(Rc::clone(&worklist))));
        let session = recorder::install(Rc::clone(&recorder));

        let names = invocation.get_names();
        let mut inputs = BTreeMap::new();
        for name in &names {
            inputs.insert(name.clone(), invocation.create_argument_value(name, None));
        }

        ExplorationEngine {
            invocation,
            names,
            inputs,
            worklist,
            recorder,
            backend,
            num_processed: 0,
            capture_dot: false,
            _session: session,
        }
    }

    /// Capture a DOT snapshot of the tree after every execution.
    pub fn capture_dot(mut self, capture: bool) -> Self {
        self.capture_dot = capture;
        self
    }

    /// Run the exploration loop. `max_iterations` bounds the number of
    /// concrete executions; 0 means run until the worklist drains.
    pub fn explore(&mut self, max_iterations: u32) -> ExplorationReport {
        let mut generated_inputs = Vec::new();
        let mut return_values = Vec::new();
        let mut dot_snapshots = Vec::new();

        self.one_execution(None, &mut generated_inputs, &mut return_values, &mut dot_snapshots);
        let mut executions: u32 = 1;

        loop {
            if max_iterations != 0 && executions >= max_iterations {
                log::info!("maximum number of iterations reached, terminating");
                break;
            }

            let selected = {
                let mut worklist = self.worklist.borrow_mut();
                match worklist.pop_front() {
                    Some(node) => node,
                    None => {
                        log::info!("exploration complete");
                        break;
                    }
                }
            };
            log::info!(
                "{} constraints yet to solve (already solved: {})",
                self.worklist.borrow().len() + 1,
                self.num_processed
            );

            if selected.borrow().processed {
                // Satisfied as a side effect of an earlier run.
                continue;
            }
            selected.borrow_mut().attempted = true;

            let snapshot = match selected.borrow().inputs.clone() {
                Some(snapshot) => snapshot,
                None => continue,
            };
            self.inputs = snapshot;

            let (asserts, query) = match ConstraintNode::asserts_and_query(&selected) {
                Some(parts) => parts,
                None => continue,
            };
            log::info!("selected constraint {}", selected.borrow());
            log::debug!(
                "solving [{}] with query {}",
                asserts
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                query
            );

            let model = match self.backend.find_counterexample(&asserts, &query) {
                Some(model) => model,
                None => {
                    log::debug!("no model for {}", selected.borrow());
                    continue;
                }
            };

            let stale = model.iter().all(|(name, value)| {
                self.inputs
                    .get(name)
                    .is_some_and(|input| input.concrete() == *value)
            });
            if stale {
                log::debug!("model did not produce new inputs, skipping");
                continue;
            }

            for (name, value) in &model {
                log::debug!("  {} = {}", name, value);
                self.inputs.insert(
                    name.clone(),
                    self.invocation.create_argument_value(name, Some(*value)),
                );
            }

            self.one_execution(
                Some(&selected),
                &mut generated_inputs,
                &mut return_values,
                &mut dot_snapshots,
            );
            executions += 1;
            self.num_processed += 1;
        }

        let (covered, total) = self.recorder.borrow().condition_coverage();
        let percent = if total == 0 {
            100.0
        } else {
            covered as f64 / total as f64 * 100.0
        };
        log::info!(
            "Condition Coverage using DSE: {}/{} ({:.2}%)",
            covered,
            total,
            percent
        );

        ExplorationReport {
            generated_inputs,
            execution_return_values: return_values,
            covered_conditions: covered,
            total_conditions: total,
            dot: self.recorder.borrow().to_dot(),
            dot_snapshots,
            worklist_remaining: self.worklist.borrow().len(),
        }
    }

    fn one_execution(
        &mut self,
        expected: Option<&NodeRef>,
        generated_inputs: &mut Vec<Vec<(String, i64)>>,
        return_values: &mut Vec<SubjectOutcome>,
        dot_snapshots: &mut Vec<String>,
    ) {
        let record: Vec<(String, i64)> = self
            .names
            .iter()
            .filter_map(|name| self.inputs.get(name).map(|v| (name.clone(), v.concrete())))
            .collect();
        log::info!("executing with inputs {:?}", record);
        generated_inputs.push(record);

        self.recorder.borrow_mut().reset(expected, self.inputs.clone());
        let outcome = self.invocation.call_function(&self.inputs);
        log::info!("subject returned {}", outcome);
        return_values.push(outcome);

        if self.capture_dot {
            dot_snapshots.push(self.recorder.borrow().to_dot());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::{Subject, SubjectValue, SymArgs};
    use crate::solver::Model;
    use crate::tree::Predicate;

    fn above_ten(args: &SymArgs) -> SubjectValue {
        let x = args.get("x");
        if x.gt(10).truthy() {
            "big".into()
        } else {
            "small".into()
        }
    }

    const ABOVE_TEN: Subject = Subject {
        name: "above_ten",
        params: &[("x", 0)],
        body: above_ten,
        expected: None,
    };

    /// A backend that always parrots the seed assignment back.
    struct StaleBackend;

    impl SmtBackend for StaleBackend {
        fn name(&self) -> &'static str {
            "stale"
        }

        fn find_counterexample(&self, _: &[Predicate], _: &Predicate) -> Option<Model> {
            let mut model = Model::new();
            model.insert("x".to_string(), 0);
            Some(model)
        }
    }

    /// A backend that answers "no model" to everything.
    struct UnsatBackend;

    impl SmtBackend for UnsatBackend {
        fn name(&self) -> &'static str {
            "unsat"
        }

        fn find_counterexample(&self, _: &[Predicate], _: &Predicate) -> Option<Model> {
            None
        }
    }

    #[test]
    fn stale_model_skips_without_rerunning() {
        let mut engine =
            ExplorationEngine::with_backend(FunctionInvocation::new(ABOVE_TEN), Box::new(StaleBackend));
        let report = engine.explore(5);

        assert_eq!(report.generated_inputs.len(), 1);
        assert_eq!(
            report.execution_return_values,
            vec![SubjectOutcome::Return("small".into())]
        );
        // The flipped branch was never shown to be traversed.
        assert_eq!(report.covered_conditions, 1);
        assert_eq!(report.total_conditions, 2);
    }

    #[test]
    fn unsat_branches_drain_the_worklist_without_executions() {
        let mut engine =
            ExplorationEngine::with_backend(FunctionInvocation::new(ABOVE_TEN), Box::new(UnsatBackend));
        let report = engine.explore(0);

        assert_eq!(report.generated_inputs.len(), 1);
        assert_eq!(report.worklist_remaining, 0);
    }
}
