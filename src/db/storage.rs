use crate::config::ConsequenceMode;
use crate::misc::log::targets::{self};
use crate::smt;
use crate::structures::candidate::{self, Candidate};
use crate::structures::term::TermArena;

/// An antichain of candidates.
///
/// Storing a candidate drops every stored consequence-stronger candidate and rejects
/// the addition when a stored candidate already entails it, so no element of the store
/// is a subset of another.
///
/// In [Fast](ConsequenceMode::Fast) mode entailment is the syntactic subset check; in
/// [Exact](ConsequenceMode::Exact) mode it is refined by SMT consequence.
pub struct StorageDB {
    /// Stored candidates, in insertion order.
    solutions: Vec<Candidate>,

    /// The entailment mode applied on store.
    mode: ConsequenceMode,
}

impl StorageDB {
    pub fn new(mode: ConsequenceMode) -> Self {
        StorageDB {
            solutions: Vec::default(),
            mode,
        }
    }

    /// Stores a candidate, maintaining the antichain.
    ///
    /// Returns true when the candidate was added.
    pub fn store(&mut self, arena: &TermArena, solution: Candidate) -> bool {
        self.solutions
            .retain(|stored| !smt::consequence(arena, stored, &solution, self.mode));

        let entailed = self
            .solutions
            .iter()
            .any(|stored| smt::consequence(arena, &solution, stored, self.mode));
        if entailed {
            log::debug!(
                target: targets::STORAGE,
                "rejected {}: a stored candidate entails it",
                candidate::set_string(arena, &solution),
            );
            return false;
        }

        self.solutions.push(solution);
        true
    }

    /// The stored candidates, in insertion order.
    pub fn solutions(&self) -> &[Candidate] {
        &self.solutions
    }

    /// Replaces the stored candidates with an ordered selection.
    ///
    /// Used by finalization, which rewrites the store into the ranked policy list.
    pub fn replace(&mut self, solutions: Vec<Candidate>) {
        self.solutions = solutions;
    }

    /// Whether the empty (trivially true) candidate is stored.
    pub fn holds_empty(&self) -> bool {
        self.solutions.iter().any(Candidate::is_empty)
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.solutions.iter()
    }
}
