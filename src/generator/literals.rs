/*!
Literal generation over the variable set.

For each operator and each pair of variables --- combinations for symmetric operators,
permutations for signed less-than --- the binary atom is emitted after width
normalization.
Constant-constant pairs, width-unsafe pairs, and (optionally) variable-variable pairs
are skipped; proven-necessary literals are excluded.
*/

use std::collections::HashSet;

use crate::config::Config;
use crate::structures::term::{Relation, Term, TermArena, TermId};

use super::CandidateGenerator;

impl CandidateGenerator {
    /// The variable set available to literal generation.
    ///
    /// In robust mode controlled variables participate; otherwise relational literals
    /// over attacker-chosen cells would be the only ones available.
    fn reduce_auto(&self, config: &Config) -> Vec<TermId> {
        self.vars
            .iter()
            .copied()
            .filter(|v| config.robust || !self.is_controlled(*v))
            .collect()
    }

    /// A stable ordering key: word-sized variables first, then narrower variables,
    /// then constants; wider before narrower within a class.
    fn var_sort_key(arena: &TermArena, id: TermId) -> (u8, i64, String) {
        let width = arena.width(id) as i64;
        let class = if arena.is_const(id) {
            2
        } else if width >= 32 {
            0
        } else {
            1
        };
        (class, -width, arena.render(id))
    }

    /// Re-interns a constant at a target width, keeping it available to later rounds.
    fn resized_const(&mut self, arena: &mut TermArena, id: TermId, target: u32) -> Option<TermId> {
        if target == 0 {
            return None;
        }
        let value = match *arena.term(id) {
            Term::Constant { value, .. } => value,
            _ => return None,
        };
        let resized = arena.declare_const_value(value, target);
        self.vars.insert(resized);
        Some(resized)
    }

    /// Width-normalizes a pair by re-interning a constant side at the width of the
    /// other side. Mixed-width pairs without a constant cannot be reconciled here.
    fn normalize_pair(
        &mut self,
        arena: &mut TermArena,
        v1: TermId,
        v2: TermId,
    ) -> Option<(TermId, TermId)> {
        let (s1, s2) = (arena.width(v1), arena.width(v2));
        if s1 == s2 {
            return Some((v1, v2));
        }
        let (c1, c2) = (arena.is_const(v1), arena.is_const(v2));
        if c1 && !c2 {
            return self.resized_const(arena, v1, s2).map(|nv1| (nv1, v2));
        }
        if c2 && !c1 {
            return self.resized_const(arena, v2, s1).map(|nv2| (v1, nv2));
        }
        None
    }

    /// Literals of the current round, in generation order.
    pub(super) fn generate_literals(
        &mut self,
        config: &Config,
        arena: &mut TermArena,
    ) -> Vec<TermId> {
        let mut ordered = self.reduce_auto(config);
        ordered.sort_by_key(|id| Self::var_sort_key(arena, *id));

        let mut lits = Vec::new();
        let mut seen: HashSet<TermId> = HashSet::new();
        let mut push = |lits: &mut Vec<TermId>, excluded: &crate::structures::candidate::Candidate, lit: TermId| {
            if !excluded.contains(&lit) && seen.insert(lit) {
                lits.push(lit);
            }
        };

        for op in self.operators.clone() {
            let pairs: Vec<(TermId, TermId)> = if op.symmetric() {
                let mut pairs = Vec::new();
                for i in 0..ordered.len() {
                    for j in i + 1..ordered.len() {
                        pairs.push((ordered[i], ordered[j]));
                    }
                }
                pairs
            } else {
                let mut pairs = Vec::new();
                for i in 0..ordered.len() {
                    for j in 0..ordered.len() {
                        if i != j {
                            pairs.push((ordered[i], ordered[j]));
                        }
                    }
                }
                pairs
            };

            for (raw1, raw2) in pairs {
                let Some((v1, v2)) = self.normalize_pair(arena, raw1, raw2) else {
                    continue;
                };
                if arena.is_const(v1) && arena.is_const(v2) {
                    continue;
                }
                // Keep only width-safe comparisons after normalization.
                if arena.width(v1) != arena.width(v2) {
                    continue;
                }
                if config.no_variables_binop && !arena.is_const(v1) && !arena.is_const(v2) {
                    continue;
                }
                if config.core_literals {
                    if let Ok(lit) = arena.binary(op, v1, v2) {
                        push(&mut lits, &self.excluded, lit);
                    }
                }
                if config.separate_bytes && op.symmetric() {
                    for lit in self.byte_literals(arena, op, v1, v2) {
                        push(&mut lits, &self.excluded, lit);
                    }
                }
                if config.separate_bits && op.symmetric() {
                    for lit in self.bit_literals(arena, op, v1, v2) {
                        push(&mut lits, &self.excluded, lit);
                    }
                }
            }
        }
        lits
    }

    /// Byte-sliced variants of a mixed-width pair.
    fn byte_literals(
        &mut self,
        arena: &mut TermArena,
        op: Relation,
        v1: TermId,
        v2: TermId,
    ) -> Vec<TermId> {
        let mut lits = Vec::new();
        if arena.width(v1) == arena.width(v2) {
            return lits;
        }
        let mut bytes1 = if arena.width(v1) > 8 && !arena.is_const(v1) {
            arena.bytes_of(v1).unwrap_or_default()
        } else {
            Vec::new()
        };
        let mut bytes2 = if arena.width(v2) > 8 && !arena.is_const(v2) {
            arena.bytes_of(v2).unwrap_or_default()
        } else {
            Vec::new()
        };
        if bytes1.is_empty() && !bytes2.is_empty() {
            bytes1 = vec![v1];
        }
        if !bytes1.is_empty() && bytes2.is_empty() {
            bytes2 = vec![v2];
        }
        for b1 in &bytes1 {
            for b2 in &bytes2 {
                if let Ok(lit) = arena.binary(op, *b1, *b2) {
                    lits.push(lit);
                }
            }
        }
        lits
    }

    /// Bit-sliced variants of a mixed-width pair.
    fn bit_literals(
        &mut self,
        arena: &mut TermArena,
        op: Relation,
        v1: TermId,
        v2: TermId,
    ) -> Vec<TermId> {
        let mut lits = Vec::new();
        if arena.width(v1) == arena.width(v2) {
            return lits;
        }
        let mut bits1 = if !arena.is_const(v1) {
            arena.bits_of(v1).unwrap_or_default()
        } else {
            Vec::new()
        };
        let mut bits2 = if !arena.is_const(v2) {
            arena.bits_of(v2).unwrap_or_default()
        } else {
            Vec::new()
        };
        if bits1.is_empty() && !bits2.is_empty() {
            bits1 = vec![v1];
        }
        if !bits1.is_empty() && bits2.is_empty() {
            bits2 = vec![v2];
        }
        for b1 in &bits1 {
            for b2 in &bits2 {
                if let Ok(lit) = arena.binary(op, *b1, *b2) {
                    lits.push(lit);
                }
            }
        }
        lits
    }
}
