/*!
Initialization of a solve: initial vulnerability examples, and necessary-constant
recovery.

Initial examples seed the literal lattice with realistic variables and constants before
any candidate is evaluated.
Each is drawn by re-querying goal reachability with every known example rejected, so
the collected witnesses are pairwise distinct.

Necessary-constant recovery tests, binding by binding, whether a fresh example is the
only way to force the goal: a binding whose rejection makes the goal unreachable is a
necessary equality.
*/

use crate::context::GenericContext;
use crate::misc::log::targets::{self};
use crate::oracle::{ReachStatus, ReachabilityOracle};
use crate::structures::candidate::{self, Candidate};
use crate::structures::model::PartialModel;
use crate::structures::term::Relation;
use crate::types::err::ErrorKind;

impl<O: ReachabilityOracle> GenericContext<O> {
    pub(crate) fn add_example(&mut self, model: PartialModel) {
        self.counters.note_timer("example");
        self.counters.examples += 1;
        self.examples.add(model);
    }

    pub(crate) fn add_counter_example(&mut self, model: PartialModel) {
        self.counters.note_timer("counterex");
        self.counters.counter_examples += 1;
        self.counter_examples.add(model);
    }

    pub(crate) fn add_necessary_unit(&mut self, unit: Candidate) {
        self.counters.note_timer("necessaryc");
        self.counters.necessary_literals += 1;
        self.necessary.store(&self.arena, unit);
    }

    pub(crate) fn store_solution(&mut self, core: Candidate) {
        self.counters.note_timer("solution");
        self.counters.solutions += 1;
        self.storage.store(&self.arena, core);
    }

    pub(crate) fn store_unsolution(&mut self, core: Candidate) {
        self.counters.note_timer("unsolution");
        self.counters.unsolutions += 1;
        self.storage_unsol.store(&self.arena, core);
    }

    /// Collects the configured number of pairwise distinct vulnerability examples.
    pub(crate) fn collect_initial_examples(&mut self) -> Result<(), ErrorKind> {
        let wanted = self
            .config
            .vexamples_init_count
            .max(self.config.const_detection as usize);

        for found in 0..wanted {
            let known: Vec<PartialModel> = self.examples.iter().cloned().collect();
            let outcome = self.check_vulnerability(Vec::new(), &known, false)?;
            match outcome.model {
                Some(model) => {
                    log::info!(target: targets::SOLVE, "initialization vulnerability example: {model}");
                    self.add_example(model);
                }
                None => {
                    log::warn!(
                        target: targets::SOLVE,
                        "could not recover as many vulnerability models as requested ({found} only)",
                    );
                }
            }
        }
        Ok(())
    }

    /// Tests each binding of a fresh example for individual necessity.
    ///
    /// When rejecting the whole example leaves the goal reachable there is no
    /// necessary constant, and the new witness joins the example set instead.
    pub(crate) fn recover_necessary_constants(&mut self) -> Result<(), ErrorKind> {
        log::debug!(target: targets::SOLVE, "recovering necessary constants");
        let Some(example) = self.examples.get_any().cloned() else {
            log::warn!(target: targets::SOLVE, "no initial examples; skip necessary constant recovery");
            return Ok(());
        };

        let mut filtered = PartialModel::default();
        for (key, value) in example.bindings() {
            if !self.oracle.fully_assumed(key) {
                filtered.bind(key.clone(), value.clone());
            }
        }

        let outcome = self.check_vulnerability(Vec::new(), &[filtered.clone()], true)?;
        if outcome.status == ReachStatus::Reachable {
            log::info!(target: targets::SOLVE, "no necessary constant detected");
            if let Some(model) = outcome.model {
                self.add_example(model);
            }
            return Ok(());
        }

        log::debug!(target: targets::SOLVE, "necessary constants to recover");
        let bindings: Vec<(String, String)> = filtered
            .bindings()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, value) in bindings {
            log::debug!(target: targets::SOLVE, "checking necessary constant for {key}");
            self.counters.note_solver_oracle("constant-test");
            let mut single = PartialModel::default();
            single.bind(key.clone(), value.clone());
            let outcome = self.check_vulnerability(Vec::new(), &[single], true)?;
            if outcome.status == ReachStatus::Unreachable {
                let literal = self
                    .arena
                    .var_assignment(Relation::Equal, &key, &value)?;
                let unit: Candidate = std::iter::once(literal).collect();
                log::info!(
                    target: targets::RESULT,
                    "necessary constraint: {}",
                    candidate::set_string(&self.arena, &unit),
                );
                self.add_necessary_unit(unit);
            }
        }
        Ok(())
    }
}
