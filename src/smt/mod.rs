/*!
The SMT backend: consistency, model-satisfaction, and consequence queries.

Candidates are conjunctions of bit-vector atoms, so every query reduces to a
satisfiability check over the quantifier-free bit-vector encoding of the involved
terms.

A fresh [z3] context is created per query.
Queries are small --- the cost of a solve dwarfs the cost of re-encoding a candidate ---
and per-query contexts keep the arena free of solver lifetimes.

An unknown from the solver surfaces as [SmtError](crate::types::err::SmtError); the
pruning wrappers below translate unknowns conservatively, so a candidate is never
discarded on inconclusive evidence.
*/

use std::collections::{BTreeSet, HashMap};

use z3::ast::{Ast, Bool, BV};
use z3::{Config as Z3Config, Context as Z3Context, SatResult, Solver};

use crate::config::ConsequenceMode;
use crate::misc::log::targets::{self};
use crate::structures::candidate::Candidate;
use crate::structures::model::PartialModel;
use crate::structures::term::{parse_int_token, Junction, Relation, Term, TermArena, TermId};
use crate::types::err::{ErrorKind, SmtError};

/// Per-query solver timeout, in milliseconds.
const QUERY_TIMEOUT_MS: &str = "10000";

fn fresh_context() -> Z3Context {
    let mut cfg = Z3Config::new();
    cfg.set_param_value("timeout", QUERY_TIMEOUT_MS);
    Z3Context::new(&cfg)
}

/// An encoder from interned terms to z3 asts, caching variable constants.
struct Encoder<'a, 'ctx> {
    arena: &'a TermArena,
    ctx: &'ctx Z3Context,
    vars: HashMap<TermId, BV<'ctx>>,
}

impl<'a, 'ctx> Encoder<'a, 'ctx> {
    fn new(arena: &'a TermArena, ctx: &'ctx Z3Context) -> Self {
        Encoder {
            arena,
            ctx,
            vars: HashMap::default(),
        }
    }

    fn constant(&self, value: u128, width: u32) -> BV<'ctx> {
        if width <= 64 {
            BV::from_u64(self.ctx, value as u64, width)
        } else {
            // Wide constants are split at the 64-bit boundary.
            let high = BV::from_u64(self.ctx, (value >> 64) as u64, width - 64);
            let low = BV::from_u64(self.ctx, value as u64, 64);
            high.concat(&low)
        }
    }

    fn bitvector(&mut self, id: TermId) -> BV<'ctx> {
        if let Some(bv) = self.vars.get(&id) {
            return bv.clone();
        }
        let bv = match self.arena.term(id) {
            Term::Variable(_) => {
                BV::new_const(self.ctx, self.arena.render(id), self.arena.width(id))
            }
            Term::Constant { value, width } => self.constant(*value, *width),
            Term::ByteSlice { base, index } => {
                self.bitvector(*base).extract(8 * index + 7, 8 * index)
            }
            Term::BitSlice { base, index } => self.bitvector(*base).extract(*index, *index),
            Term::ZeroExtend { term, extra } => self.bitvector(*term).zero_ext(*extra),
            Term::Binary { .. } | Term::Connective { .. } | Term::Negation { .. } => {
                unreachable!("boolean term in bit-vector position")
            }
        };
        self.vars.insert(id, bv.clone());
        bv
    }

    fn boolean(&mut self, id: TermId) -> Bool<'ctx> {
        match self.arena.term(id) {
            Term::Binary { op, lhs, rhs } => {
                let (lhs, rhs) = (self.bitvector(*lhs), self.bitvector(*rhs));
                match op {
                    Relation::Equal => lhs._eq(&rhs),
                    Relation::Distinct => lhs._eq(&rhs).not(),
                    Relation::SignedLess => lhs.bvslt(&rhs),
                }
            }

            Term::Connective { op, terms } => {
                let parts: Vec<Bool> = terms.iter().map(|t| self.boolean(*t)).collect();
                let refs: Vec<&Bool> = parts.iter().collect();
                match op {
                    Junction::And => Bool::and(self.ctx, &refs),
                    Junction::Or => Bool::or(self.ctx, &refs),
                }
            }

            Term::Negation { terms } => {
                let parts: Vec<Bool> = terms.iter().map(|t| self.boolean(*t)).collect();
                let refs: Vec<&Bool> = parts.iter().collect();
                Bool::and(self.ctx, &refs).not()
            }

            // A bare bit-vector in boolean position is read as non-zero.
            _ => {
                let bv = self.bitvector(id);
                let width = self.arena.width(id);
                bv._eq(&self.constant(0, width)).not()
            }
        }
    }
}

/// Decides the satisfiability of a candidate conjunction.
pub fn check_sat(arena: &TermArena, candidate: &Candidate) -> Result<bool, ErrorKind> {
    let ctx = fresh_context();
    let solver = Solver::new(&ctx);
    let mut encoder = Encoder::new(arena, &ctx);
    for literal in candidate {
        let encoded = encoder.boolean(*literal);
        solver.assert(&encoded);
    }
    interpret(solver.check())
}

/// Decides the satisfiability of a candidate under the equality assignments of a model.
///
/// Variables of the candidate without a binding take the model's `default` value when
/// one is present, and are left free otherwise.
pub fn check_sat_model(
    arena: &TermArena,
    candidate: &Candidate,
    model: &PartialModel,
) -> Result<bool, ErrorKind> {
    let ctx = fresh_context();
    let solver = Solver::new(&ctx);
    let mut encoder = Encoder::new(arena, &ctx);
    for literal in candidate {
        let encoded = encoder.boolean(*literal);
        solver.assert(&encoded);
    }

    let mut variables = BTreeSet::new();
    for literal in candidate {
        arena.collect_base_vars(*literal, &mut variables);
    }
    for var in variables {
        let name = match arena.var_canonical_name(var) {
            Some(name) => name,
            None => continue,
        };
        let spelling = model
            .value_of(&name)
            .or(model.default.as_deref())
            .and_then(parse_int_token);
        if let Some(value) = spelling {
            let width = arena.width(var);
            let var_bv = encoder.bitvector(var);
            let val_bv = encoder.constant(value, width);
            solver.assert(&var_bv._eq(&val_bv));
        }
    }
    interpret(solver.check())
}

/// Decides `A ⇒ B` via unsatisfiability of `A ∧ ¬B`, both sides conjunctions.
pub fn check_consequence(
    arena: &TermArena,
    implicant: &Candidate,
    implicate: &Candidate,
) -> Result<bool, ErrorKind> {
    if implicate.is_empty() {
        return Ok(true);
    }
    let ctx = fresh_context();
    let solver = Solver::new(&ctx);
    let mut encoder = Encoder::new(arena, &ctx);
    for literal in implicant {
        let encoded = encoder.boolean(*literal);
        solver.assert(&encoded);
    }
    let parts: Vec<Bool> = implicate.iter().map(|t| encoder.boolean(*t)).collect();
    let refs: Vec<&Bool> = parts.iter().collect();
    solver.assert(&Bool::and(&ctx, &refs).not());
    match solver.check() {
        SatResult::Unsat => Ok(true),
        SatResult::Sat => Ok(false),
        SatResult::Unknown => Err(SmtError::Unknown.into()),
    }
}

fn interpret(result: SatResult) -> Result<bool, ErrorKind> {
    match result {
        SatResult::Sat => Ok(true),
        SatResult::Unsat => Ok(false),
        SatResult::Unknown => Err(SmtError::Unknown.into()),
    }
}

// Pruning wrappers: unknowns never discard a candidate.

/// Whether a candidate is consistent; inconclusive queries count as consistent.
pub fn candidate_consistent(arena: &TermArena, candidate: &Candidate) -> bool {
    match check_sat(arena, candidate) {
        Ok(status) => status,
        Err(_) => {
            log::warn!(target: targets::SMT, "consistency query unknown; candidate kept");
            true
        }
    }
}

/// Whether a model satisfies a candidate, for counter-example pruning.
///
/// Bindings are filtered to registered variables.
/// Models which bind no variable of the candidate are not considered satisfying, to
/// avoid vacuous pruning of the entire space; a `default` binding counts as total.
pub fn model_satisfies(arena: &TermArena, candidate: &Candidate, model: &PartialModel) -> bool {
    if model.binding_count() == 0 && model.default.is_none() {
        return false;
    }

    let mut filtered = PartialModel::default();
    filtered.default = model.default.clone();
    for (key, value) in model.bindings() {
        if arena.is_registered(key) {
            filtered.bind(key.clone(), value.clone());
        }
    }
    if filtered.binding_count() == 0 && filtered.default.is_none() {
        return false;
    }

    if filtered.default.is_none() {
        let mut variables = BTreeSet::new();
        for literal in candidate {
            arena.collect_base_vars(*literal, &mut variables);
        }
        let covered = variables.iter().all(|var| {
            arena
                .var_canonical_name(*var)
                .map_or(true, |name| filtered.binds(&name))
        });
        if !variables.is_empty() && !covered {
            return false;
        }
    }

    match check_sat_model(arena, candidate, &filtered) {
        Ok(status) => status,
        Err(_) => {
            log::warn!(target: targets::SMT, "model satisfaction query unknown; candidate kept");
            false
        }
    }
}

/// Whether the implicant entails the implicate.
///
/// The syntactic subset check decides most instances; `exact` mode refines the rest by
/// SMT. Inconclusive queries count as non-consequence.
pub fn consequence(
    arena: &TermArena,
    implicant: &Candidate,
    implicate: &Candidate,
    mode: ConsequenceMode,
) -> bool {
    if implicate.is_subset(implicant) {
        return true;
    }
    match mode {
        ConsequenceMode::Fast => false,
        ConsequenceMode::Exact => match check_consequence(arena, implicant, implicate) {
            Ok(status) => status,
            Err(_) => {
                log::warn!(target: targets::SMT, "consequence query unknown; treated as non-consequence");
                false
            }
        },
    }
}
