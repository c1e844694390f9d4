/*!
The candidate generator: a literal lattice enumerated by cardinality, with restart
semantics.

The variable set is seeded from the literals file (or, failing an explicit variable,
from the canonical input regions), and grows dynamically from the bindings of recovered
models.
Literals are binary atoms over the variable set; candidates are k-element subsets of
the literal list.

Enumeration proceeds in two phases:
- *bootstrap* rounds re-read the variable set and yield cardinalities 0 and 1, so
  necessity checks can re-detect variables; rounds repeat while the variable set grows
  or a restart was requested;
- the *deep* phase enumerates cardinalities 2 up to the depth cap over the literal list
  of the final round.

A restart may be requested externally between yields (e.g. on discovery of a necessary
unit); the generator then re-reads variables and begins again at small cardinalities.
State is held in the generator object, not on the stack.
*/

use std::collections::{BTreeMap, BTreeSet};

use crate::config::Config;
use crate::context::GenerationCounters;
use crate::db::ModelDB;
use crate::generic::combinations::Combinations;
use crate::misc::log::targets::{self};
use crate::smt;
use crate::structures::candidate::Candidate;
use crate::structures::term::{Relation, TermArena, TermId};
use crate::types::err::{ConfigError, ErrorKind};

mod literals;

/// The enumeration state.
enum Phase {
    /// Nothing yielded yet; the empty candidate comes first.
    Start,

    /// A bootstrap round begins: recompute variables and literals, or stop.
    Round,

    /// Yielding bootstrap candidates of cardinality 0 and 1.
    Bootstrap { depth: usize, combo: Combinations },

    /// Yielding candidates of cardinality 2 and up over the final literal list.
    Deep { depth: usize, combo: Combinations },

    /// Enumeration is exhausted.
    Exhausted,
}

/// The candidate generator.
pub struct CandidateGenerator {
    /// The active variable and constant set.
    vars: BTreeSet<TermId>,

    /// Variables declared controlled by the literals file.
    controlled: BTreeSet<TermId>,

    /// Seed variables and constants: literals file, input regions, base constants.
    seed_vars: BTreeSet<TermId>,

    /// Dynamic constants learnt per variable, by spelling.
    dynamic_consts: BTreeMap<TermId, BTreeSet<String>>,

    /// Necessary-core literals excluded from generation.
    excluded: Candidate,

    /// An externally requested restart, honored between yields.
    restart: bool,

    /// The operator set of the current round.
    operators: Vec<Relation>,

    /// The literal list of the current round.
    lits: Vec<TermId>,

    /// The variable count of the previous round, for growth detection.
    previous_var_count: usize,

    phase: Phase,
}

impl CandidateGenerator {
    /// Builds the generator: parses the literals file, derives fallback variables from
    /// the input regions, and seeds the base constant bank.
    pub fn from_config(
        config: &Config,
        arena: &mut TermArena,
        input_regions: &[(u64, u32)],
    ) -> Result<Self, ErrorKind> {
        let mut generator = CandidateGenerator {
            vars: BTreeSet::new(),
            controlled: BTreeSet::new(),
            seed_vars: BTreeSet::new(),
            dynamic_consts: BTreeMap::new(),
            excluded: Candidate::new(),
            restart: false,
            operators: Vec::new(),
            lits: Vec::new(),
            previous_var_count: 0,
            phase: Phase::Start,
        };
        generator.load_literals_file(config, arena)?;
        if !generator.has_explicit_var(arena) {
            for (base, size) in input_regions {
                let id = arena.declare_var(&format!("0x{base:08x}:{size}"))?;
                generator.seed_vars.insert(id);
                generator.vars.insert(id);
            }
        }
        generator.seed_base_constants(arena);
        if config.with_auto_constants {
            for token in ["0x00", "0x01"] {
                let id = arena.declare_const(token)?;
                generator.vars.insert(id);
            }
        }
        Ok(generator)
    }

    fn has_explicit_var(&self, arena: &TermArena) -> bool {
        self.seed_vars.iter().any(|v| arena.is_variable(*v))
    }

    fn load_literals_file(
        &mut self,
        config: &Config,
        arena: &mut TermArena,
    ) -> Result<(), ErrorKind> {
        let text = std::fs::read_to_string(&config.literals)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", config.literals.display())))?;

        for line in text.lines() {
            let ldata = line.trim();
            if ldata.is_empty() || ldata.starts_with('#') {
                continue;
            }
            let Some((kind, value)) = ldata.split_once(':') else {
                return Err(ConfigError::Literals(ldata.to_owned()).into());
            };
            match kind {
                "constant" => {
                    let id = arena.declare_const(value.trim())?;
                    self.seed_vars.insert(id);
                    self.vars.insert(id);
                }
                "variable" => {
                    let id = arena.declare_var(value.trim())?;
                    self.seed_vars.insert(id);
                    self.vars.insert(id);
                }
                "word" => {
                    let addr = value.trim();
                    if !addr.is_empty() {
                        let id = arena.declare_var(&format!("{addr}:4"))?;
                        self.seed_vars.insert(id);
                        self.vars.insert(id);
                    }
                }
                "controlled" => {
                    if config.robust {
                        let id = arena.declare_var(value.trim())?;
                        self.controlled.insert(id);
                    }
                }
                _ => return Err(ConfigError::Literals(ldata.to_owned()).into()),
            }
        }
        Ok(())
    }

    /// Seeds 0, 1, -1, signed max, and signed min at every width observed among the
    /// seed variables.
    fn seed_base_constants(&mut self, arena: &mut TermArena) {
        let mut widths = BTreeSet::new();
        for var in &self.seed_vars {
            if !arena.is_const(*var) {
                widths.insert(arena.width(*var));
            }
        }
        for bits in widths {
            if bits == 0 {
                continue;
            }
            // Values are masked to the width on interning, so -1 is all ones.
            let mut values: Vec<u128> = vec![0, 1, u128::MAX];
            if bits > 1 {
                values.push((1_u128 << (bits - 1)) - 1);
                values.push(1_u128 << (bits - 1));
            }
            for value in values {
                let id = arena.declare_const_value(value, bits);
                self.vars.insert(id);
                self.seed_vars.insert(id);
            }
        }
    }

    /// The controlled cells as (canonical identifier, width) pairs, for the robust
    /// overlay.
    pub fn controlled_cells(&self, arena: &TermArena) -> Vec<(String, u32)> {
        self.controlled
            .iter()
            .filter_map(|id| {
                arena
                    .var_canonical_name(*id)
                    .map(|name| (name, arena.width(*id)))
            })
            .collect()
    }

    /// Whether a variable is controlled.
    pub fn is_controlled(&self, id: TermId) -> bool {
        self.controlled.contains(&id)
    }

    /// Requests a restart; honored before the next yield.
    pub fn request_restart(&mut self) {
        self.restart = true;
    }

    /// Sets the literals excluded from generation (the proven necessary core).
    pub fn set_excluded(&mut self, excluded: Candidate) {
        self.excluded = excluded;
    }

    /// Learns variables and dynamic constants from the recovered models.
    fn update_vars(
        &mut self,
        config: &Config,
        arena: &mut TermArena,
        examples: &ModelDB,
        counter_examples: &ModelDB,
        assumed: &dyn Fn(&str) -> bool,
    ) {
        if config.input_variables_only {
            self.vars = self.seed_vars.clone();
            return;
        }
        let mut bindings: Vec<(String, String)> = Vec::new();
        for model in examples.iter().chain(counter_examples.iter()) {
            for (key, value) in model.bindings() {
                bindings.push((key.clone(), value.clone()));
            }
        }
        for (key, value) in bindings {
            // Engine-internal symbols never become variables.
            if key.contains('!') || key == "from_file" {
                continue;
            }
            if !assumed(&key) {
                // Byte variables covered by an input word would only blow up the
                // search space.
                if self.covered_by_input_word(arena, &key) {
                    continue;
                }
                if let Ok(id) = arena.declare_var(&key) {
                    self.vars.insert(id);
                }
            }
            if let Some(id) = arena.var_id(&key) {
                self.learn_dynamic_const(config, arena, id, &value);
            }
        }
    }

    /// Whether a bare byte address falls inside a seeded multi-byte memory variable.
    fn covered_by_input_word(&self, arena: &TermArena, key: &str) -> bool {
        let Some(address) = key
            .strip_prefix("0x")
            .and_then(|hex| u64::from_str_radix(hex, 16).ok())
        else {
            return false;
        };
        if key.contains(':') || key.contains('/') {
            return false;
        }
        self.seed_vars.iter().any(|var| {
            arena
                .memory_origin(*var)
                .is_some_and(|(base, size)| size > 1 && base <= address && address < base + size as u64)
        })
    }

    /// Learns up to the configured number of per-variable constants from a binding.
    fn learn_dynamic_const(
        &mut self,
        config: &Config,
        arena: &mut TermArena,
        var: TermId,
        value: &str,
    ) {
        if arena.is_const(var) {
            return;
        }
        let Some(parsed) = crate::structures::term::parse_int_token(value) else {
            return;
        };
        let bits = arena.width(var);
        if bits == 0 {
            return;
        }
        let spelling = TermArena::const_spelling(parsed, bits);
        let seen = self.dynamic_consts.entry(var).or_default();
        if seen.contains(&spelling) || seen.len() >= config.dynamic_constants_per_var.max(1) {
            return;
        }
        seen.insert(spelling);
        let id = arena.declare_const_value(parsed, bits);
        self.vars.insert(id);
    }

    fn update_operators(&mut self, config: &Config) {
        self.operators.clear();
        self.operators.push(Relation::Equal);
        if config.with_disequalities {
            self.operators.push(Relation::Distinct);
        }
        if config.with_inequalities {
            self.operators.push(Relation::SignedLess);
        }
    }

    /// The next candidate, or None when enumeration is exhausted.
    ///
    /// Candidates are sets of literal identifiers; the caller composes them with the
    /// necessary core and applies the pruning pipeline.
    pub fn next(
        &mut self,
        config: &Config,
        arena: &mut TermArena,
        examples: &ModelDB,
        counter_examples: &ModelDB,
        assumed: &dyn Fn(&str) -> bool,
        counters: &mut GenerationCounters,
    ) -> Option<Candidate> {
        loop {
            let phase = std::mem::replace(&mut self.phase, Phase::Exhausted);
            match phase {
                Phase::Start => {
                    self.restart = false;
                    self.update_vars(config, arena, examples, counter_examples, assumed);
                    self.previous_var_count = 0;
                    self.phase = Phase::Round;
                    // The initial try carries no constraint.
                    return Some(Candidate::new());
                }

                Phase::Round => {
                    self.update_vars(config, arena, examples, counter_examples, assumed);
                    log::debug!(target: targets::GENERATOR, "loaded {} variables", self.vars.len());
                    let var_count = self.vars.len();
                    counters.restarts += 1;
                    counters.vars = var_count;
                    if !self.restart && var_count == self.previous_var_count {
                        // No growth and no external request: move to the deep phase.
                        let limit = config.max_depth.unwrap_or(self.lits.len());
                        if limit < 2 {
                            self.phase = Phase::Exhausted;
                        } else {
                            self.phase = Phase::Deep {
                                depth: 2,
                                combo: Combinations::new(self.lits.len(), 2),
                            };
                        }
                        continue;
                    }
                    if self.restart {
                        log::debug!(target: targets::GENERATOR, "externally triggered restart");
                        self.restart = false;
                    }
                    log::info!(target: targets::GENERATOR, "restart of variable and literal generation");
                    self.previous_var_count = var_count;
                    self.update_operators(config);
                    self.lits = self.generate_literals(config, arena);
                    counters.literals = self.lits.len();
                    if config.literal_ordering {
                        self.order_literals(arena, examples);
                    }
                    self.phase = Phase::Bootstrap {
                        depth: 0,
                        combo: Combinations::new(self.lits.len(), 0),
                    };
                }

                Phase::Bootstrap { depth, mut combo } => {
                    if self.restart {
                        // Honor the request by starting a fresh round.
                        self.phase = Phase::Round;
                        continue;
                    }
                    match combo.next() {
                        Some(indices) => {
                            let candidate: Candidate =
                                indices.iter().map(|i| self.lits[*i]).collect();
                            self.phase = Phase::Bootstrap { depth, combo };
                            return Some(candidate);
                        }
                        None => {
                            if depth == 0 {
                                self.phase = Phase::Bootstrap {
                                    depth: 1,
                                    combo: Combinations::new(self.lits.len(), 1),
                                };
                            } else {
                                self.phase = Phase::Round;
                            }
                        }
                    }
                }

                Phase::Deep { depth, mut combo } => match combo.next() {
                    Some(indices) => {
                        let candidate: Candidate = indices.iter().map(|i| self.lits[*i]).collect();
                        self.phase = Phase::Deep { depth, combo };
                        return Some(candidate);
                    }
                    None => {
                        let limit = config.max_depth.unwrap_or(self.lits.len());
                        if depth < limit {
                            self.phase = Phase::Deep {
                                depth: depth + 1,
                                combo: Combinations::new(self.lits.len(), depth + 1),
                            };
                        }
                    }
                },

                Phase::Exhausted => return None,
            }
        }
    }

    /// Ranks literals by example satisfaction count, then complexity.
    fn order_literals(&mut self, arena: &TermArena, examples: &ModelDB) {
        let mut table: BTreeMap<TermId, (i64, usize)> = BTreeMap::new();
        for lit in &self.lits {
            let singleton: Candidate = std::iter::once(*lit).collect();
            let satisfied = examples
                .iter()
                .filter(|model| smt::model_satisfies(arena, &singleton, model))
                .count() as i64;
            table.insert(*lit, (-satisfied, arena.complexity(*lit)));
        }
        log::debug!(target: targets::GENERATOR, "literal ordering table: {table:?}");
        self.lits.sort_by_key(|lit| table[lit]);
    }
}
