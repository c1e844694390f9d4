/*!
Candidates: finite sets of atoms interpreted as conjunctions.

The canonical representation of a candidate is an ordered set of interned term
identifiers, so set operations are cheap and iteration order is deterministic.

Stable renderings are derived by sorting the literal strings, so two candidates with the
same atoms render identically regardless of interning order.
*/

use std::collections::BTreeSet;

use super::term::{TermArena, TermId};

/// A candidate conjunction of atoms.
pub type Candidate = BTreeSet<TermId>;

/// The literals of a candidate, rendered and sorted.
pub fn stable_literals(arena: &TermArena, candidate: &Candidate) -> Vec<String> {
    let mut literals: Vec<String> = candidate.iter().map(|lit| arena.render(*lit)).collect();
    literals.sort();
    literals
}

/// The set rendering of a candidate: `{lit₁, lit₂, …}`.
pub fn set_string(arena: &TermArena, candidate: &Candidate) -> String {
    format!("{{{}}}", stable_literals(arena, candidate).join(", "))
}

/// The clause rendering of a candidate: `true`, a lone literal, or `(lit₁ & lit₂ & …)`.
pub fn clause_string(arena: &TermArena, candidate: &Candidate) -> String {
    let literals = stable_literals(arena, candidate);
    match literals.len() {
        0 => "true".to_owned(),
        1 => literals.into_iter().next().unwrap_or_default(),
        _ => format!("({})", literals.join(" & ")),
    }
}

/// The OR-of-sets rendering of a sequence of candidates.
pub fn or_string(arena: &TermArena, candidates: &[Candidate]) -> String {
    match candidates.len() {
        0 => "{}".to_owned(),
        1 => set_string(arena, &candidates[0]),
        _ => candidates
            .iter()
            .map(|c| set_string(arena, c))
            .collect::<Vec<_>>()
            .join(" OR "),
    }
}

/// One single set-like condition string for display and reporting:
/// `{(clause₁) | (clause₂) | …}`.
pub fn unified_string(arena: &TermArena, candidates: &[Candidate]) -> String {
    match candidates.len() {
        0 => "{}".to_owned(),
        1 => set_string(arena, &candidates[0]),
        _ => {
            let clauses = candidates
                .iter()
                .map(|c| format!("({})", clause_string(arena, c)))
                .collect::<Vec<_>>();
            format!("{{{}}}", clauses.join(" | "))
        }
    }
}

/// The summed syntactic complexity of a candidate.
pub fn complexity(arena: &TermArena, candidate: &Candidate) -> usize {
    candidate.iter().map(|lit| arena.complexity(*lit)).sum()
}
