/*!
The candidate pipeline: composition with the necessary core, and pruning.

Candidates drawn from the generator pass, in order:
1. a consistency check (SMT);
2. the counter-example filter, skipping vacuous models;
3. consequence checks against stored solutions, unsolutions, and the necessary core.

Surviving candidates are handed to the solve loop as a pair: the composed candidate
(necessary core included) and the bare core from the generator.
*/

use crate::context::GenericContext;
use crate::misc::log::targets::{self};
use crate::oracle::ReachabilityOracle;
use crate::smt;
use crate::structures::candidate::{self, Candidate};

impl<O: ReachabilityOracle> GenericContext<O> {
    /// The union of the necessary units.
    pub fn necessary_component(&self) -> Candidate {
        let mut component = Candidate::new();
        for unit in self.necessary.iter() {
            component.extend(unit.iter().copied());
        }
        component
    }

    /// Requests a generation restart and refreshes the excluded literal set.
    pub fn restart_local_generation(&mut self) {
        let component = self.necessary_component();
        self.generator.request_restart();
        self.generator.set_excluded(component);
    }

    /// The next candidate surviving the pruning pipeline, as (composed, core).
    ///
    /// The first yield is the necessary component alone, so the solve loop re-examines
    /// the context whenever the core grew.
    pub fn next_surviving_candidate(&mut self) -> Option<(Candidate, Candidate)> {
        if !self.seeded {
            self.seeded = true;
            self.restart_local_generation();
            return Some((self.necessary_component(), Candidate::new()));
        }

        'generation: loop {
            let oracle = &self.oracle;
            let assumed = |key: &str| oracle.fully_assumed(key);
            let candidate = self.generator.next(
                &self.config,
                &mut self.arena,
                &self.examples,
                &self.counter_examples,
                &assumed,
                &mut self.counters.generation,
            )?;

            log::debug!(
                target: targets::SOLVE,
                "pre-checking candidate: {}",
                candidate::set_string(&self.arena, &candidate),
            );
            self.counters.generation.considered += 1;

            let composed: Candidate = self
                .necessary_component()
                .union(&candidate)
                .copied()
                .collect();

            self.counters.note_smt("consistency");
            if !smt::candidate_consistent(&self.arena, &candidate) {
                log::debug!(target: targets::SOLVE, "candidate is inconsistent");
                self.counters.generation.prune("consistency");
                continue 'generation;
            }

            if self.config.prune_counterex {
                for cex in self.counter_examples.iter() {
                    // An empty model makes every candidate appear satisfied and would
                    // prune the entire space.
                    if cex.is_vacuous() {
                        continue;
                    }
                    self.counters.note_smt("satisfied");
                    if smt::model_satisfies(&self.arena, &composed, cex) {
                        log::debug!(target: targets::SOLVE, "satisfied by {cex}");
                        self.counters.generation.prune("counterex");
                        continue 'generation;
                    }
                }
            }

            if self.config.prune_necessary {
                let mode = self.config.consequence_mode;
                let stages: [(&'static str, &crate::db::StorageDB, bool); 3] = [
                    ("solution", &self.storage, true),
                    ("unsolution", &self.storage_unsol, true),
                    ("necessary", &self.necessary, false),
                ];
                for (stage, storage, direct) in stages {
                    for stored in storage.iter() {
                        self.counters.note_smt("consequence");
                        let entailed = if direct {
                            smt::consequence(&self.arena, &composed, stored, mode)
                        } else {
                            smt::consequence(&self.arena, stored, &composed, mode)
                        };
                        if entailed {
                            log::debug!(
                                target: targets::SOLVE,
                                "has for consequence {}",
                                candidate::set_string(&self.arena, stored),
                            );
                            self.counters.generation.prune(stage);
                            continue 'generation;
                        }
                    }
                }
            }

            return Some((composed, candidate));
        }
    }
}
