/*!
Oracle-backed necessity and vulnerability checks.

A set of sufficient conjunctions is necessary when no input outside their disjunction
still forces the goal:
- classically, the goal is unreachable under the negated disjunction;
- in constant-time mode, the complement of the policy leaks.

The negated disjunction is injected as one `!(…)` assumption per stored conjunction.
*/

use crate::context::GenericContext;
use crate::misc::log::targets::{self};
use crate::oracle::{CtStatus, ReachOutcome, ReachStatus, ReachabilityOracle};
use crate::structures::candidate::Candidate;
use crate::structures::model::PartialModel;
use crate::structures::term::{Junction, Relation};
use crate::types::err::ErrorKind;

impl<O: ReachabilityOracle> GenericContext<O> {
    /// Renders the literals of a candidate as assumption expressions.
    pub(crate) fn assumptions_of(&self, candidate: &Candidate) -> Vec<String> {
        candidate.iter().map(|lit| self.arena.render(*lit)).collect()
    }

    /// Renders the negation of each conjunction as an assumption expression.
    fn negated_assumptions(&mut self, solutions: &[Candidate]) -> Vec<String> {
        solutions
            .iter()
            .map(|sol| {
                let negation = self.arena.negation(sol.iter().copied());
                self.arena.render(negation)
            })
            .collect()
    }

    /// Renders the rejection of a model: a junction of disequalities over its
    /// bindings, filtered to registered variables.
    ///
    /// `complete` rejections conjoin (the model must differ everywhere); the default
    /// disjoins (the model must differ somewhere).
    pub(crate) fn rejection_of(
        &mut self,
        model: &PartialModel,
        complete: bool,
    ) -> Result<Option<String>, ErrorKind> {
        let mut atoms = Vec::new();
        let bound: Vec<(String, String)> = model
            .bindings()
            .filter(|(key, _)| self.arena.is_registered(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        for (key, value) in bound {
            atoms.push(self.arena.var_assignment(Relation::Distinct, &key, &value)?);
        }
        if atoms.is_empty() {
            return Ok(None);
        }
        let junction = if complete { Junction::And } else { Junction::Or };
        let term = self.arena.junction(junction, atoms)?;
        Ok(Some(self.arena.render(term)))
    }

    /// Whether the goal remains forcible, under assumptions and rejected models.
    ///
    /// In constant-time mode the program is vulnerable when it leaks; a leak carries
    /// no model, so an empty witness is returned.
    pub(crate) fn check_vulnerability(
        &mut self,
        mut assumptions: Vec<String>,
        reject: &[PartialModel],
        complete: bool,
    ) -> Result<ReachOutcome, ErrorKind> {
        for model in reject {
            if let Some(expr) = self.rejection_of(model, complete)? {
                assumptions.push(expr);
            }
        }

        if self.config.ct_mode {
            log::debug!(target: targets::SOLVE, "vulnerability check (constant-time mode)");
            let outcome = self.oracle.ct_evaluate(&self.arena, &assumptions)?;
            return Ok(match outcome.status {
                CtStatus::Insecure => ReachOutcome {
                    status: ReachStatus::Reachable,
                    model: Some(PartialModel::default()),
                },
                CtStatus::Secure => ReachOutcome {
                    status: ReachStatus::Unreachable,
                    model: None,
                },
                CtStatus::Unknown => {
                    log::warn!(target: targets::SOLVE, "constant-time vulnerability check returned unknown");
                    ReachOutcome {
                        status: ReachStatus::Unknown,
                        model: None,
                    }
                }
            });
        }

        log::debug!(target: targets::SOLVE, "vulnerability check");
        self.oracle.reach_positive(&self.arena, &assumptions)
    }

    /// Whether the stored conjunctions form a necessary set.
    ///
    /// Trivially true when the trivially-true conjunction is among them.
    /// Inconclusive oracle verdicts count against necessity, so the search continues.
    pub fn check_necessity(&mut self, solutions: &[Candidate]) -> Result<bool, ErrorKind> {
        if solutions.iter().any(Candidate::is_empty) {
            // The "true" policy already covers all inputs.
            return Ok(true);
        }
        let assumptions = self.negated_assumptions(solutions);

        if self.config.ct_mode {
            log::debug!(target: targets::SOLVE, "necessity check (constant-time mode)");
            let outcome = self.oracle.ct_evaluate(&self.arena, &assumptions)?;
            if outcome.status == CtStatus::Unknown {
                log::warn!(
                    target: targets::SOLVE,
                    "constant-time necessity check is unknown; treating as non-necessary",
                );
                return Ok(false);
            }
            // Necessary when the complement of the current policy leaks.
            return Ok(outcome.status == CtStatus::Insecure);
        }

        log::debug!(target: targets::SOLVE, "necessity check");
        let outcome = self.oracle.reach_positive(&self.arena, &assumptions)?;
        match outcome.status {
            ReachStatus::Reachable => Ok(false),
            ReachStatus::Unreachable => Ok(true),
            ReachStatus::Unknown => {
                log::warn!(
                    target: targets::SOLVE,
                    "necessity check is unknown; treating as non-necessary",
                );
                Ok(false)
            }
        }
    }
}
