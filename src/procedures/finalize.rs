/*!
Finalization: the semantic post-filter, policy ranking, branch-guided derivation, and
assembly of the result summary.

The post-filter drops conjunctions whose removal preserves necessity, so the reported
policy is free of semantically redundant alternatives; the storage is then rewritten
into the ranked list.

Ranking is either by size and complexity, or --- in constant-time mode --- branch-first:
policies touching the dominant `(variable, constant)` pivot come before collateral
relations.
For each pivot, explicit true-branch and false-branch policies are derived and
validated, and the pair is recommended when both are secure.
*/

use std::collections::{BTreeMap, BTreeSet};

use crate::config::SelectionMode;
use crate::context::GenericContext;
use crate::misc::log::targets::{self};
use crate::oracle::{CtStatus, ReachabilityOracle};
use crate::reports::{
    BranchGuidedPolicy, BranchKey, BranchPartition, BranchSide, CtReport, CtValidation,
    PairwiseCompatibility, PolicyEntry, PolicySemantics, ResultSummary, SelectionReason,
};
use crate::smt;
use crate::structures::candidate::{self, Candidate};
use crate::structures::term::{Junction, Relation, Term, TermArena, TermId};
use crate::types::err::ErrorKind;

/// A simple relation over a memory variable and a constant: the shape of a branch
/// condition.
#[derive(Clone, Copy, PartialEq, Eq)]
enum BranchRel {
    Less,
    Equal,
    Greater,
}

/// Extracts the branch atom of a literal: `(variable, constant, relation)` for signed
/// comparisons and equalities between a memory variable and a constant.
fn branch_atom(arena: &TermArena, lit: TermId) -> Option<(String, String, BranchRel)> {
    let Term::Binary { op, lhs, rhs } = arena.term(lit) else {
        return None;
    };
    let (lhs, rhs) = (*lhs, *rhs);
    let memory = |id: TermId| arena.memory_origin(id).is_some();
    match op {
        Relation::Equal => {
            if memory(lhs) && arena.is_const(rhs) {
                Some((arena.render(lhs), arena.render(rhs), BranchRel::Equal))
            } else if arena.is_const(lhs) && memory(rhs) {
                Some((arena.render(rhs), arena.render(lhs), BranchRel::Equal))
            } else {
                None
            }
        }
        Relation::SignedLess => {
            if memory(lhs) && arena.is_const(rhs) {
                Some((arena.render(lhs), arena.render(rhs), BranchRel::Less))
            } else if arena.is_const(lhs) && memory(rhs) {
                Some((arena.render(rhs), arena.render(lhs), BranchRel::Greater))
            } else {
                None
            }
        }
        Relation::Distinct => None,
    }
}

/// The operands of a simple `=` or `<s` literal, for compaction.
fn simple_relation(arena: &TermArena, lit: TermId) -> Option<(String, Relation, String)> {
    let Term::Binary { op, lhs, rhs } = arena.term(lit) else {
        return None;
    };
    match op {
        Relation::Distinct => None,
        _ => Some((arena.render(*lhs), *op, arena.render(*rhs))),
    }
}

/// The size-complexity ranking key.
fn solution_score(arena: &TermArena, solution: &Candidate) -> (usize, usize, String) {
    (
        solution.len(),
        candidate::complexity(arena, solution),
        candidate::stable_literals(arena, solution).join(" & "),
    )
}

/// The branch-first ranking key: pivot policies first, fewer collateral literals, then
/// size and complexity.
fn branch_first_score(
    arena: &TermArena,
    solution: &Candidate,
    key: &BranchKey,
) -> (usize, usize, usize, usize, String) {
    let mut branch_hits = 0;
    let mut collateral = 0;
    for lit in solution {
        match branch_atom(arena, *lit) {
            Some((var, constant, _))
                if var == key.variable && constant == key.pivot_constant =>
            {
                branch_hits += 1
            }
            _ => collateral += 1,
        }
    }
    (
        usize::from(branch_hits == 0),
        collateral,
        solution.len(),
        candidate::complexity(arena, solution),
        candidate::stable_literals(arena, solution).join(" & "),
    )
}

/// Picks the dominant `(variable, constant)` pair across the solutions.
///
/// Pairs covering more relations win, then pairs supported by more solutions; at least
/// two supporting solutions are required for robustness.
fn detect_primary_branch_key(arena: &TermArena, solutions: &[Candidate]) -> Option<BranchKey> {
    struct PivotData {
        rels: BTreeSet<u8>,
        sols: usize,
        atoms: usize,
    }
    let mut pivots: BTreeMap<(String, String), PivotData> = BTreeMap::new();

    for solution in solutions {
        let mut seen: BTreeSet<(String, String)> = BTreeSet::new();
        for lit in solution {
            let Some((var, constant, rel)) = branch_atom(arena, *lit) else {
                continue;
            };
            let key = (var, constant);
            let data = pivots.entry(key.clone()).or_insert(PivotData {
                rels: BTreeSet::new(),
                sols: 0,
                atoms: 0,
            });
            data.rels.insert(rel as u8);
            data.atoms += 1;
            if seen.insert(key) {
                data.sols += 1;
            }
        }
    }

    let best = pivots.into_iter().min_by_key(|((var, constant), data)| {
        (
            std::cmp::Reverse(data.rels.len()),
            std::cmp::Reverse(data.sols),
            std::cmp::Reverse(data.atoms),
            var.clone(),
            constant.clone(),
        )
    })?;
    let ((variable, pivot_constant), data) = best;
    if data.sols < 2 {
        return None;
    }
    Some(BranchKey {
        variable,
        pivot_constant,
    })
}

impl<O: ReachabilityOracle> GenericContext<O> {
    /// Repeatedly drops conjunctions whose removal preserves necessity.
    ///
    /// If a single conjunction alone is already necessary, that conjunction is kept by
    /// itself.
    fn semantic_post_filter(
        &mut self,
        mut solutions: Vec<Candidate>,
    ) -> Result<Vec<Candidate>, ErrorKind> {
        if solutions.len() <= 1 {
            return Ok(solutions);
        }

        let mut changed = true;
        while changed && solutions.len() > 1 {
            changed = false;
            for index in 0..solutions.len() {
                let mut trial = solutions.clone();
                let dropped = trial.remove(index);
                if trial.is_empty() {
                    continue;
                }
                if self.check_necessity(&trial)? {
                    log::debug!(
                        target: targets::POLICY,
                        "semantic post-filter removed: {}",
                        candidate::set_string(&self.arena, &dropped),
                    );
                    solutions = trial;
                    changed = true;
                    break;
                }
            }
        }

        if solutions.len() > 1 {
            let mut singletons = Vec::new();
            for solution in &solutions {
                if self.check_necessity(std::slice::from_ref(solution))? {
                    singletons.push(solution.clone());
                }
            }
            if let Some(best) = singletons.into_iter().min_by_key(|sol| {
                (
                    sol.len(),
                    candidate::set_string(&self.arena, sol).len(),
                    candidate::set_string(&self.arena, sol),
                )
            }) {
                log::debug!(
                    target: targets::POLICY,
                    "semantic post-filter selected singleton: {}",
                    candidate::set_string(&self.arena, &best),
                );
                solutions = vec![best];
            }
        }

        Ok(solutions)
    }

    /// Deduplicates and ranks the solutions, reporting the mode applied.
    fn ordered_unique_solutions(
        &mut self,
        solutions: Vec<Candidate>,
    ) -> (Vec<Candidate>, SelectionReason) {
        let mut unique: Vec<Candidate> = Vec::new();
        let mut seen: BTreeSet<Vec<String>> = BTreeSet::new();
        for solution in solutions {
            if seen.insert(candidate::stable_literals(&self.arena, &solution)) {
                unique.push(solution);
            }
        }

        if self.config.effective_selection_mode() == SelectionMode::BranchFirst {
            let branch_key = if self.config.ct_mode {
                detect_primary_branch_key(&self.arena, &unique)
            } else {
                None
            };
            if let Some(key) = branch_key {
                unique.sort_by_key(|sol| branch_first_score(&self.arena, sol, &key));
                let reason = format!(
                    "prioritized policies matching branch pivot {} against {}",
                    key.variable, key.pivot_constant,
                );
                return (
                    unique,
                    SelectionReason {
                        mode: "branch-first".to_owned(),
                        reason,
                        branch_key: Some(key),
                    },
                );
            }
            unique.sort_by_key(|sol| solution_score(&self.arena, sol));
            return (
                unique,
                SelectionReason {
                    mode: "size-complexity".to_owned(),
                    reason: "fallback ranking by literals count and complexity \
                             (branch pivot not robustly identified)"
                        .to_owned(),
                    branch_key: None,
                },
            );
        }

        unique.sort_by_key(|sol| solution_score(&self.arena, sol));
        (
            unique,
            SelectionReason {
                mode: "size-complexity".to_owned(),
                reason: "fallback ranking by literals count and complexity".to_owned(),
                branch_key: None,
            },
        )
    }

    /// Builds the policy semantics: identifiers, pairwise compatibility, and branch
    /// partitions.
    fn build_policy_semantics(&mut self, ordered: &[Candidate]) -> PolicySemantics {
        let note = "Each policy is an alternative path constraint. \
                    Do not AND all policies together.";
        if ordered.is_empty() {
            return PolicySemantics {
                operator_between_policies: "OR",
                note,
                ..PolicySemantics::default()
            };
        }

        let ids: Vec<String> = (1..=ordered.len()).map(|i| format!("P{i}")).collect();

        let policies = ordered
            .iter()
            .zip(&ids)
            .map(|(solution, id)| PolicyEntry {
                id: id.clone(),
                formula: candidate::set_string(&self.arena, solution),
                literals: candidate::stable_literals(&self.arena, solution),
                literals_count: solution.len(),
                complexity: candidate::complexity(&self.arena, solution),
            })
            .collect();

        let mut pairwise = Vec::new();
        for i in 0..ordered.len() {
            for j in i + 1..ordered.len() {
                let both: Candidate = ordered[i].union(&ordered[j]).copied().collect();
                self.counters.note_smt("consistency");
                let compatible = smt::candidate_consistent(&self.arena, &both);
                pairwise.push(PairwiseCompatibility {
                    left: ids[i].clone(),
                    right: ids[j].clone(),
                    compatible_with_and: compatible,
                    relation: if compatible {
                        "can_coexist"
                    } else {
                        "mutually_exclusive"
                    },
                });
            }
        }

        // Branch-style partitions: x<k, x=k, x>k spread across alternative policies.
        let mut families: BTreeMap<(String, String), [BTreeSet<String>; 3]> = BTreeMap::new();
        for (solution, id) in ordered.iter().zip(&ids) {
            for lit in solution {
                let Some((var, constant, rel)) = branch_atom(&self.arena, *lit) else {
                    continue;
                };
                let family = families.entry((var, constant)).or_default();
                family[rel as usize].insert(id.clone());
            }
        }

        let partitions = families
            .into_iter()
            .map(|((variable, pivot_constant), family)| {
                let [less, equal, greater] = family;
                BranchPartition {
                    variable,
                    pivot_constant,
                    can_merge_to_leq: !less.is_empty() && !equal.is_empty(),
                    can_merge_to_geq: !greater.is_empty() && !equal.is_empty(),
                    less_than: less.into_iter().collect(),
                    equal: equal.into_iter().collect(),
                    greater_than: greater.into_iter().collect(),
                }
            })
            .collect();

        PolicySemantics {
            operator_between_policies: "OR",
            selected_policy_id: ids.first().cloned(),
            or_expression: ids.join(" OR "),
            policy_ids: ids,
            note,
            policies,
            pairwise_compatibility: pairwise,
            branch_partitions: partitions,
        }
    }

    fn evaluate_ct_policy(&mut self, candidate: &Candidate) -> Result<CtReport, ErrorKind> {
        let assumptions = self.assumptions_of(candidate);
        let outcome = self.oracle.ct_evaluate(&self.arena, &assumptions)?;
        Ok(CtReport {
            status: outcome.status,
            leaks: outcome.leaks,
        })
    }

    /// Derives explicit per-branch policies for each detected partition.
    ///
    /// For a pivot `v ? c`: the true branch is `{(c <s v)}` (meaning `v >s c`), the
    /// false branch `{(v <s c) | (v = c)}` (meaning `v <=s c`); the pair is
    /// recommended when both validate as secure.
    fn derive_branch_guided(
        &mut self,
        semantics: &PolicySemantics,
    ) -> Result<Vec<BranchGuidedPolicy>, ErrorKind> {
        if !self.config.ct_mode {
            return Ok(Vec::new());
        }
        let mut guided = Vec::new();
        for partition in &semantics.branch_partitions {
            let Some(identifier) = parse_memory_token(&partition.variable) else {
                continue;
            };
            let var = self.arena.declare_var(&identifier)?;
            let constant = self.arena.declare_const(&partition.pivot_constant)?;
            if self.arena.width(var) != self.arena.width(constant) {
                continue;
            }

            let gt = self.arena.binary(Relation::SignedLess, constant, var)?;
            let lt = self.arena.binary(Relation::SignedLess, var, constant)?;
            let eq = self.arena.binary(Relation::Equal, var, constant)?;
            let leq = self.arena.junction(Junction::Or, [lt, eq])?;

            let true_terms: Candidate = std::iter::once(gt).collect();
            let false_terms: Candidate = std::iter::once(leq).collect();
            let ct_true = self.evaluate_ct_policy(&true_terms)?;
            let ct_false = self.evaluate_ct_policy(&false_terms)?;
            let recommended =
                ct_true.status == CtStatus::Secure && ct_false.status == CtStatus::Secure;

            guided.push(BranchGuidedPolicy {
                variable: partition.variable.clone(),
                pivot_constant: partition.pivot_constant.clone(),
                true_branch: BranchSide {
                    formula: candidate::set_string(&self.arena, &true_terms),
                    meaning: format!("{} >s {}", partition.variable, partition.pivot_constant),
                    ct: Some(ct_true),
                },
                false_branch: BranchSide {
                    formula: candidate::set_string(&self.arena, &false_terms),
                    meaning: format!("{} <=s {}", partition.variable, partition.pivot_constant),
                    ct: Some(ct_false),
                },
                recommended_split: recommended,
            });
        }
        Ok(guided)
    }

    /// Validates the selected policy against the unconstrained baseline.
    fn validate_ct_policy(&mut self, selected: &Candidate) -> Result<Option<CtValidation>, ErrorKind> {
        if !self.config.ct_mode {
            return Ok(None);
        }
        let baseline = self.evaluate_ct_policy(&Candidate::new())?;
        let selected = self.evaluate_ct_policy(selected)?;
        Ok(Some(CtValidation { baseline, selected }))
    }

    /// The compact single-formula view of a classic partition:
    /// `{(x <s y)}, {(x = y)}` compacts to `{(x <=s y)}`.
    fn compact_policy_condition(&self, ordered: &[Candidate]) -> Option<String> {
        if ordered.len() != 2 || ordered.iter().any(|sol| sol.len() != 1) {
            return None;
        }
        let first = simple_relation(&self.arena, *ordered[0].iter().next()?)?;
        let second = simple_relation(&self.arena, *ordered[1].iter().next()?)?;

        let unordered = |lhs: &String, rhs: &String| -> (String, String) {
            if lhs <= rhs {
                (lhs.clone(), rhs.clone())
            } else {
                (rhs.clone(), lhs.clone())
            }
        };

        for (less, equal) in [(&first, &second), (&second, &first)] {
            if less.1 == Relation::SignedLess
                && equal.1 == Relation::Equal
                && unordered(&less.0, &less.2) == unordered(&equal.0, &equal.2)
            {
                return Some(format!("{{({} <=s {})}}", less.0, less.2));
            }
        }
        None
    }

    /// Finalizes a necessary result set into the summary.
    pub fn finalize(&mut self) -> Result<ResultSummary, ErrorKind> {
        let original = self.storage.solutions().to_vec();
        let mut general = self.semantic_post_filter(original.clone())?;
        if !self.check_necessity(&general)? {
            log::warn!(
                target: targets::POLICY,
                "semantic post-filter broke necessity; restoring original result set",
            );
            general = original;
        }

        let (ordered, selection) = self.ordered_unique_solutions(general);
        self.storage.replace(ordered.clone());

        let selected = ordered.first().cloned();
        let alternatives: Vec<String> = ordered
            .iter()
            .skip(1)
            .map(|sol| candidate::set_string(&self.arena, sol))
            .collect();
        let general_expr = candidate::or_string(&self.arena, &ordered);
        let unified_expr = candidate::unified_string(&self.arena, &ordered);
        let compact_expr = self.compact_policy_condition(&ordered);
        let final_condition = compact_expr.clone().unwrap_or_else(|| general_expr.clone());

        log::info!(target: targets::POLICY, "obtained a necessary result set");
        log::info!(target: targets::RESULT, "nas conditions (all): {unified_expr}");
        match &selected {
            Some(_) => log::info!(
                target: targets::RESULT,
                "selected constraint (necessary & sufficient): {final_condition}",
            ),
            None => log::info!(target: targets::RESULT, "general nas condition: {general_expr}"),
        }

        let semantics = self.build_policy_semantics(&ordered);
        let guided = self.derive_branch_guided(&semantics)?;
        for policy in &guided {
            if policy.recommended_split {
                log::info!(target: targets::RESULT, "branch-guided split:");
                log::info!(target: targets::RESULT, "  true : {}", policy.true_branch.formula);
                log::info!(target: targets::RESULT, "  false: {}", policy.false_branch.formula);
            }
        }

        // End-user aggregate counters: one final constraint composed of OR-clauses.
        self.counters.solution_clauses = ordered.len();
        self.counters.final_constraints = usize::from(selected.is_some());

        let ct_validation = match &selected {
            Some(selected) => self.validate_ct_policy(selected)?,
            None => None,
        };

        Ok(ResultSummary {
            selected_policy: selected.as_ref().map(|_| final_condition.clone()),
            selected_policy_representative: selected
                .as_ref()
                .map(|sol| candidate::set_string(&self.arena, sol)),
            policy_condition: general_expr,
            policy_condition_unified: unified_expr,
            policy_condition_compact: compact_expr,
            alternatives,
            nas_conditions_all: ordered
                .iter()
                .map(|sol| candidate::set_string(&self.arena, sol))
                .collect(),
            ct_validation,
            policy_semantics: Some(semantics),
            branch_guided_policies: guided,
            selection_mode: Some(selection.mode.clone()),
            selection_reason: Some(selection),
            stats: Default::default(),
        })
    }
}

/// Parses a `@[0xADDR,N]` token back to the `0xADDR:N` identifier.
fn parse_memory_token(token: &str) -> Option<String> {
    let rest = token.trim().strip_prefix("@[")?;
    let (addr, rest) = rest.split_once(',')?;
    let size = rest.strip_suffix(']')?;
    let addr = addr.trim();
    if !addr.starts_with("0x") || size.trim().parse::<u32>().is_err() {
        return None;
    }
    Some(format!("{addr}:{}", size.trim()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::config::Config;
    use crate::oracle::{CtOutcome, ReachOutcome, ReachStatus};

    struct InertOracle;

    impl ReachabilityOracle for InertOracle {
        fn reach_negative(
            &mut self,
            _arena: &TermArena,
            _assumptions: &[String],
        ) -> Result<ReachOutcome, ErrorKind> {
            Ok(ReachOutcome {
                status: ReachStatus::Unknown,
                model: None,
            })
        }

        fn reach_positive(
            &mut self,
            _arena: &TermArena,
            _assumptions: &[String],
        ) -> Result<ReachOutcome, ErrorKind> {
            Ok(ReachOutcome {
                status: ReachStatus::Unknown,
                model: None,
            })
        }

        fn check_goals(
            &mut self,
            _arena: &TermArena,
            _assumptions: &[String],
        ) -> Result<crate::oracle::GoalsOutcome, ErrorKind> {
            Ok(crate::oracle::GoalsOutcome {
                negative: ReachStatus::Unknown,
                positive: ReachStatus::Unknown,
                negative_model: None,
                positive_model: None,
            })
        }

        fn ct_evaluate(
            &mut self,
            _arena: &TermArena,
            _assumptions: &[String],
        ) -> Result<CtOutcome, ErrorKind> {
            Ok(CtOutcome {
                status: CtStatus::Unknown,
                leaks: Vec::new(),
            })
        }
    }

    fn context(ct_mode: bool) -> (tempfile::TempDir, GenericContext<InertOracle>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.literals");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "variable:0x080e3f4c:4").unwrap();
        let mut config = Config::default();
        config.literals = path;
        config.ct_mode = ct_mode;
        let ctx = GenericContext::with_oracle(config, InertOracle).unwrap();
        (dir, ctx)
    }

    fn collateral(ctx: &mut GenericContext<InertOracle>) -> Candidate {
        let left = ctx.arena.declare_var("0x080e3f48:4").unwrap();
        let right = ctx.arena.declare_var("0x080e3f4c:4").unwrap();
        let atom = ctx.arena.binary(Relation::Equal, left, right).unwrap();
        std::iter::once(atom).collect()
    }

    fn pivot_greater(ctx: &mut GenericContext<InertOracle>) -> Candidate {
        let word = ctx.arena.declare_var("0x080e3f4c:4").unwrap();
        let seven = ctx.arena.declare_const("0x00000007").unwrap();
        let atom = ctx
            .arena
            .binary(Relation::SignedLess, seven, word)
            .unwrap();
        std::iter::once(atom).collect()
    }

    fn pivot_equal(ctx: &mut GenericContext<InertOracle>) -> Candidate {
        let word = ctx.arena.declare_var("0x080e3f4c:4").unwrap();
        let seven = ctx.arena.declare_const("0x00000007").unwrap();
        let atom = ctx.arena.binary(Relation::Equal, word, seven).unwrap();
        std::iter::once(atom).collect()
    }

    fn pivot_less(ctx: &mut GenericContext<InertOracle>) -> Candidate {
        let word = ctx.arena.declare_var("0x080e3f4c:4").unwrap();
        let seven = ctx.arena.declare_const("0x00000007").unwrap();
        let atom = ctx
            .arena
            .binary(Relation::SignedLess, word, seven)
            .unwrap();
        std::iter::once(atom).collect()
    }

    #[test]
    fn branch_first_prefers_branch_policies() {
        let (_dir, mut ctx) = context(true);
        let solutions = vec![
            collateral(&mut ctx),
            pivot_greater(&mut ctx),
            pivot_equal(&mut ctx),
        ];

        let (ordered, reason) = ctx.ordered_unique_solutions(solutions);
        assert_eq!(reason.mode, "branch-first");
        let head = ctx.arena.render(*ordered[0].iter().next().unwrap());
        assert!(head.contains("@[0x080e3f4c,4]"));
        assert!(!head.contains("@[0x080e3f48,4]"));
    }

    #[test]
    fn branch_first_falls_back_without_two_supporting_solutions() {
        let (_dir, mut ctx) = context(true);
        let solutions = vec![collateral(&mut ctx), pivot_greater(&mut ctx)];

        let (_ordered, reason) = ctx.ordered_unique_solutions(solutions);
        assert_eq!(reason.mode, "size-complexity");
        assert!(reason.reason.contains("fallback"));
        assert!(reason.branch_key.is_none());
    }

    #[test]
    fn size_complexity_mode_is_selectable() {
        let (_dir, mut ctx) = context(true);
        ctx.config.selection_mode = Some(SelectionMode::SizeComplexity);

        let mut pair = pivot_equal(&mut ctx);
        pair.extend(collateral(&mut ctx));
        let solutions = vec![pair, pivot_greater(&mut ctx)];

        let (ordered, reason) = ctx.ordered_unique_solutions(solutions);
        assert_eq!(reason.mode, "size-complexity");
        assert_eq!(ordered[0].len(), 1);
    }

    #[test]
    fn duplicate_solutions_collapse() {
        let (_dir, mut ctx) = context(true);
        let solutions = vec![
            pivot_equal(&mut ctx),
            pivot_equal(&mut ctx),
            pivot_greater(&mut ctx),
        ];

        let (ordered, _reason) = ctx.ordered_unique_solutions(solutions);
        assert_eq!(ordered.len(), 2);
    }

    #[test]
    fn classic_partitions_compact() {
        let (_dir, mut ctx) = context(true);
        let ordered = vec![pivot_less(&mut ctx), pivot_equal(&mut ctx)];
        assert_eq!(
            ctx.compact_policy_condition(&ordered).as_deref(),
            Some("{(@[0x080e3f4c,4] <=s 0x00000007)}")
        );
    }

    #[test]
    fn compaction_requires_matching_operands() {
        let (_dir, mut ctx) = context(true);
        let ordered = vec![pivot_less(&mut ctx), collateral(&mut ctx)];
        assert_eq!(ctx.compact_policy_condition(&ordered), None);

        let three = vec![
            pivot_less(&mut ctx),
            pivot_equal(&mut ctx),
            pivot_greater(&mut ctx),
        ];
        assert_eq!(ctx.compact_policy_condition(&three), None);
    }

    #[test]
    fn compaction_accepts_either_orientation() {
        let (_dir, mut ctx) = context(true);
        let ordered = vec![pivot_equal(&mut ctx), pivot_less(&mut ctx)];
        assert_eq!(
            ctx.compact_policy_condition(&ordered).as_deref(),
            Some("{(@[0x080e3f4c,4] <=s 0x00000007)}")
        );
    }
}
