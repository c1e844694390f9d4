/*!
The CEGAR solve loop.

Each surviving candidate is evaluated against the goal pair, and the verdict drives
exactly one of four updates:

| negative | positive | action |
|---|---|---|
| unreachable | reachable | store the core as sufficient, keep the witness, test necessity |
| unreachable | otherwise | store the core as locally inconsistent |
| reachable (with witness) | --- | keep the counter-example; singleton cores are tested for atom necessity |
| unknown | --- | no update |

On detection of necessity the loop finalizes, unless collection until the solver
timeout was requested, in which case enumeration continues and finalization runs once
at the end.

Roughly:

```none
          +-----------+
  +-------| generator |<---------------- restart on a necessary unit
  |       +-----------+
  |             |
  |       prune: consistency, counter-examples, consequence
  |             |
  |             ⌄
  |       +-------------+      sufficient      +------------------+
  +-------| check goals |--------------------->| necessity of S⁺? |----> finalize
          +-------------+                      +------------------+
```
*/

use std::time::Instant;

use crate::context::GenericContext;
use crate::misc::log::targets::{self};
use crate::oracle::{CtStatus, GoalsOutcome, ReachStatus, ReachabilityOracle};
use crate::reports::{ResultSummary, StatsSummary};
use crate::structures::candidate::{self, Candidate};
use crate::structures::model::PartialModel;
use crate::types::err::ErrorKind;

impl<O: ReachabilityOracle> GenericContext<O> {
    /// Evaluates the goal pair for a candidate.
    ///
    /// In constant-time mode both goals are decided by one leakage evaluation: a
    /// secure program under the candidate is a blocked goal with a consistent context.
    fn check_goals(&mut self, candidate: &Candidate) -> Result<GoalsOutcome, ErrorKind> {
        let assumptions = self.assumptions_of(candidate);
        if self.config.ct_mode {
            let outcome = self.oracle.ct_evaluate(&self.arena, &assumptions)?;
            return Ok(match outcome.status {
                CtStatus::Secure => GoalsOutcome {
                    negative: ReachStatus::Unreachable,
                    positive: ReachStatus::Reachable,
                    negative_model: Some(PartialModel::default()),
                    positive_model: Some(PartialModel::default()),
                },
                CtStatus::Insecure => GoalsOutcome {
                    negative: ReachStatus::Reachable,
                    positive: ReachStatus::Unreachable,
                    negative_model: Some(PartialModel::default()),
                    positive_model: None,
                },
                CtStatus::Unknown => GoalsOutcome {
                    negative: ReachStatus::Unknown,
                    positive: ReachStatus::Unknown,
                    negative_model: None,
                    positive_model: None,
                },
            });
        }
        self.oracle.check_goals(&self.arena, &assumptions)
    }

    /// Tests a singleton core for atom necessity: the atom is necessary when its
    /// negation makes the goal unforcible.
    fn check_atom_necessity(&mut self, core: &Candidate) -> Result<(), ErrorKind> {
        log::debug!(target: targets::SOLVE, "check candidate necessity");
        let negation = self.arena.negation(core.iter().copied());
        let rendered = self.arena.render(negation);
        let outcome = self.check_vulnerability(vec![rendered], &[], false)?;

        match outcome.status {
            ReachStatus::Unreachable => {
                log::info!(
                    target: targets::RESULT,
                    "necessary constraint: {}",
                    candidate::set_string(&self.arena, core),
                );
                self.add_necessary_unit(core.clone());
                self.restart_local_generation();
            }
            ReachStatus::Reachable if self.config.force_on_model_resorting => {
                if let Some(model) = outcome.model {
                    self.add_example(model);
                }
                self.restart_local_generation();
            }
            _ => {}
        }
        Ok(())
    }

    /// Runs the abduction loop to completion and returns the result summary.
    pub fn solve(&mut self) -> Result<ResultSummary, ErrorKind> {
        self.counters.start_timers(&[
            "solution",
            "unsolution",
            "counterex",
            "example",
            "necessaryc",
        ]);
        let started = Instant::now();
        let collect_until_timeout = self.config.collect_until_timeout;
        let solver_timeout = self.config.solver_timeout.filter(|t| *t > 0);
        let mut nas_found = false;
        let mut summary: Option<ResultSummary> = None;

        self.collect_initial_examples()?;
        if self.config.const_detection {
            self.recover_necessary_constants()?;
        }

        'candidate_loop: while let Some((composed, core)) = self.next_surviving_candidate() {
            if collect_until_timeout {
                if let Some(timeout) = solver_timeout {
                    if started.elapsed().as_secs() >= timeout {
                        log::warn!(
                            target: targets::SOLVE,
                            "solver timeout reached ({timeout}s), stopping search",
                        );
                        break 'candidate_loop;
                    }
                }
            }

            log::info!(
                target: targets::SOLVE,
                "evaluating candidate: {}",
                candidate::set_string(&self.arena, &composed),
            );
            self.counters.generation.evaluated += 1;

            let goals = self.check_goals(&composed)?;
            let blocked = goals.negative == ReachStatus::Unreachable;
            let consistent = goals.positive == ReachStatus::Reachable;

            if blocked && consistent {
                log::info!(
                    target: targets::RESULT,
                    "satisfying solution: {}",
                    candidate::set_string(&self.arena, &composed),
                );
                self.store_solution(core);
                if let Some(model) = goals.positive_model {
                    self.add_example(model);
                }
                let solutions = self.storage.solutions().to_vec();
                if self.check_necessity(&solutions)? {
                    nas_found = true;
                    if !collect_until_timeout {
                        summary = Some(self.finalize()?);
                        break 'candidate_loop;
                    }
                    log::info!(
                        target: targets::SOLVE,
                        "necessary set found; continuing search until timeout",
                    );
                }
                let rendered: Vec<String> = self
                    .storage
                    .solutions()
                    .iter()
                    .map(|sol| candidate::set_string(&self.arena, sol))
                    .collect();
                log::info!(
                    target: targets::RESULT,
                    "updated sufficient condition: {rendered:?}",
                );
            } else if blocked {
                log::debug!(target: targets::SOLVE, "locally inconsistent candidate");
                self.store_unsolution(core);
            } else if let Some(model) = goals.negative_model {
                log::info!(target: targets::RESULT, "counter-example: {model}");
                self.add_counter_example(model);
                if core.len() == 1 {
                    self.check_atom_necessity(&core)?;
                }
            } else {
                log::debug!(target: targets::SOLVE, "unsatisfying example with no counter-example");
            }
        }

        if nas_found && summary.is_none() {
            summary = Some(self.finalize()?);
        }

        let mut summary = summary.unwrap_or_default();
        summary.stats = StatsSummary::build(&self.counters, self.oracle.statistics());
        Ok(summary)
    }
}
