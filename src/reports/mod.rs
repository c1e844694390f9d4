/*!
Reports for the context: the structured result summary and its statistics payload.

The summary is the machine-readable outcome of a solve.
It is serialized as JSON by the CLI and mirrored, line by line, into the event log
during finalization.
*/

use std::collections::BTreeMap;

use serde::Serialize;

use crate::context::Counters;
use crate::oracle::{CtStatus, LeakRecord, OracleCounters, OracleStatistics};

/// The outcome of one constant-time evaluation, for reporting.
#[derive(Clone, Debug, Serialize)]
pub struct CtReport {
    pub status: CtStatus,
    pub leaks: Vec<LeakRecord>,
}

/// Constant-time validation of the final policy: the unconstrained baseline and the
/// selected policy.
#[derive(Clone, Debug, Serialize)]
pub struct CtValidation {
    pub baseline: CtReport,
    pub selected: CtReport,
}

/// The branch pivot backing a ranking or a partition.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct BranchKey {
    pub variable: String,
    pub pivot_constant: String,
}

/// Why a ranking mode was selected.
#[derive(Clone, Debug, Serialize)]
pub struct SelectionReason {
    pub mode: String,
    pub reason: String,
    pub branch_key: Option<BranchKey>,
}

/// One policy of the final ordered set.
#[derive(Clone, Debug, Serialize)]
pub struct PolicyEntry {
    pub id: String,
    pub formula: String,
    pub literals: Vec<String>,
    pub literals_count: usize,
    pub complexity: usize,
}

/// Pairwise consistency of two policies under conjunction.
#[derive(Clone, Debug, Serialize)]
pub struct PairwiseCompatibility {
    pub left: String,
    pub right: String,
    pub compatible_with_and: bool,
    pub relation: &'static str,
}

/// A `(variable, constant)` family partitioning the policies across `<`, `=`, `>`.
#[derive(Clone, Debug, Serialize)]
pub struct BranchPartition {
    pub variable: String,
    pub pivot_constant: String,
    pub less_than: Vec<String>,
    pub equal: Vec<String>,
    pub greater_than: Vec<String>,
    pub can_merge_to_leq: bool,
    pub can_merge_to_geq: bool,
}

/// The semantics of the final policy set.
#[derive(Clone, Debug, Serialize, Default)]
pub struct PolicySemantics {
    pub operator_between_policies: &'static str,
    pub policy_ids: Vec<String>,
    pub selected_policy_id: Option<String>,
    pub or_expression: String,
    pub note: &'static str,
    pub policies: Vec<PolicyEntry>,
    pub pairwise_compatibility: Vec<PairwiseCompatibility>,
    pub branch_partitions: Vec<BranchPartition>,
}

/// One side of a branch-guided policy pair.
#[derive(Clone, Debug, Serialize)]
pub struct BranchSide {
    pub formula: String,
    pub meaning: String,
    pub ct: Option<CtReport>,
}

/// An explicit per-branch policy pair derived from a branch pivot.
#[derive(Clone, Debug, Serialize)]
pub struct BranchGuidedPolicy {
    pub variable: String,
    pub pivot_constant: String,
    pub true_branch: BranchSide,
    pub false_branch: BranchSide,
    pub recommended_split: bool,
}

/// Core counters of a solve.
#[derive(Clone, Debug, Serialize, Default)]
pub struct CoreStats {
    pub solutions: usize,
    pub solution_clauses: usize,
    pub final_constraints: usize,
    pub unsolutions: usize,
    pub examples: usize,
    pub counterexamples: usize,
    pub necessary_literals: usize,
}

/// Generation pipeline counters of a solve.
#[derive(Clone, Debug, Serialize, Default)]
pub struct GenerationStats {
    pub restarts: usize,
    pub variables: usize,
    pub literals: usize,
    pub evaluated: usize,
    pub considered: usize,
    pub pruned: BTreeMap<String, usize>,
}

/// First/last seconds of a transition timer.
#[derive(Clone, Debug, Serialize, Default)]
pub struct TimerStats {
    pub first: f64,
    pub last: f64,
}

/// The aggregated statistics of a solve.
#[derive(Clone, Debug, Serialize, Default)]
pub struct StatsSummary {
    pub core: CoreStats,
    pub generation: GenerationStats,
    pub oracles: OracleStatistics,
    pub timers: BTreeMap<String, TimerStats>,
}

impl StatsSummary {
    /// Builds the payload from the context counters and the oracle statistics.
    pub fn build(counters: &Counters, oracle: OracleStatistics) -> Self {
        let clause_count = if counters.solution_clauses > 0 {
            counters.solution_clauses
        } else {
            counters.solutions
        };

        let mut oracles = oracle;
        let smt_entry: OracleCounters = OracleCounters {
            calls: counters.smt_calls.values().sum(),
            ..OracleCounters::default()
        };
        if smt_entry.calls > 0 {
            oracles.insert("smt".to_owned(), smt_entry);
        }
        for (kind, calls) in &counters.solver_oracle_calls {
            oracles.insert(
                (*kind).to_owned(),
                OracleCounters {
                    calls: *calls,
                    ..OracleCounters::default()
                },
            );
        }

        StatsSummary {
            core: CoreStats {
                solutions: counters.solutions,
                solution_clauses: clause_count,
                final_constraints: counters.final_constraints,
                unsolutions: counters.unsolutions,
                examples: counters.examples,
                counterexamples: counters.counter_examples,
                necessary_literals: counters.necessary_literals,
            },
            generation: GenerationStats {
                restarts: counters.generation.restarts,
                variables: counters.generation.vars,
                literals: counters.generation.literals,
                evaluated: counters.generation.evaluated,
                considered: counters.generation.considered,
                pruned: counters
                    .generation
                    .pruned
                    .iter()
                    .map(|(k, v)| ((*k).to_owned(), *v))
                    .collect(),
            },
            oracles,
            timers: counters
                .timers
                .iter()
                .map(|(k, t)| {
                    (
                        (*k).to_owned(),
                        TimerStats {
                            first: t.first,
                            last: t.last,
                        },
                    )
                })
                .collect(),
        }
    }
}

/// The structured result summary of a solve.
#[derive(Clone, Debug, Serialize, Default)]
pub struct ResultSummary {
    /// The selected policy, compacted when a compact form exists; None when no NAS
    /// condition was certified.
    pub selected_policy: Option<String>,

    /// The selected policy as a literal set, uncompacted.
    pub selected_policy_representative: Option<String>,

    /// The full ordered set as an OR of literal sets.
    pub policy_condition: String,

    /// The full ordered set as one `{clause₁ | clause₂ | …}` condition.
    pub policy_condition_unified: String,

    /// The compact single-formula view, when the set is a classic partition.
    pub policy_condition_compact: Option<String>,

    /// Alternatives to the selected policy, in ranking order.
    pub alternatives: Vec<String>,

    /// Every certified condition, in ranking order.
    pub nas_conditions_all: Vec<String>,

    /// Constant-time validation of the selected policy.
    pub ct_validation: Option<CtValidation>,

    /// The semantics of the policy set.
    pub policy_semantics: Option<PolicySemantics>,

    /// Explicit per-branch policies derived from branch pivots.
    pub branch_guided_policies: Vec<BranchGuidedPolicy>,

    /// The ranking mode applied.
    pub selection_mode: Option<String>,

    /// Why that ranking was applied.
    pub selection_reason: Option<SelectionReason>,

    /// Aggregated statistics.
    pub stats: StatsSummary,
}
