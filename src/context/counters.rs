use std::collections::BTreeMap;
use std::time::Instant;

/// A first/last event timer, in seconds relative to its start.
#[derive(Clone, Debug, Default)]
pub struct EventTimer {
    started: Option<Instant>,

    /// Seconds from start to the first event, 0 when none occurred.
    pub first: f64,

    /// Seconds from start to the most recent event.
    pub last: f64,
}

impl EventTimer {
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Records an event.
    pub fn note(&mut self) {
        let Some(started) = self.started else {
            return;
        };
        let distance = started.elapsed().as_secs_f64();
        self.last = distance;
        if self.first == 0.0 {
            self.first = distance;
        }
    }
}

/// Counters of the candidate generation pipeline.
#[derive(Clone, Debug, Default)]
pub struct GenerationCounters {
    /// Generation rounds started (variable and literal recomputations).
    pub restarts: usize,

    /// The variable count of the most recent round.
    pub vars: usize,

    /// The literal count of the most recent round.
    pub literals: usize,

    /// Candidates which reached the oracle.
    pub evaluated: usize,

    /// Candidates drawn from the generator, before pruning.
    pub considered: usize,

    /// Pruned candidates, by pruning stage.
    pub pruned: BTreeMap<&'static str, usize>,
}

impl GenerationCounters {
    pub fn prune(&mut self, stage: &'static str) {
        *self.pruned.entry(stage).or_default() += 1;
    }
}

/// Counts for various things which count, roughly.
#[derive(Clone, Debug, Default)]
pub struct Counters {
    /// Sufficient conjunctions stored.
    pub solutions: usize,

    /// Clauses kept in the final condition (OR components).
    pub solution_clauses: usize,

    /// Final selected constraints; 1 when a NAS condition exists.
    pub final_constraints: usize,

    /// Locally inconsistent conjunctions stored.
    pub unsolutions: usize,

    /// Examples recovered.
    pub examples: usize,

    /// Counter-examples recovered.
    pub counter_examples: usize,

    /// Necessary units discovered.
    pub necessary_literals: usize,

    /// Generation pipeline counters.
    pub generation: GenerationCounters,

    /// SMT query counts, by kind.
    pub smt_calls: BTreeMap<&'static str, usize>,

    /// Oracle-shaped counters kept at the solver level (e.g. constant recovery tests).
    pub solver_oracle_calls: BTreeMap<&'static str, usize>,

    /// Event timers, by transition name.
    pub timers: BTreeMap<&'static str, EventTimer>,
}

impl Counters {
    /// Starts the named timers.
    pub fn start_timers(&mut self, keys: &[&'static str]) {
        for key in keys {
            self.timers.entry(key).or_default().start();
        }
    }

    /// Records an event on a named timer.
    pub fn note_timer(&mut self, key: &'static str) {
        self.timers.entry(key).or_default().note();
    }

    pub fn note_smt(&mut self, kind: &'static str) {
        *self.smt_calls.entry(kind).or_default() += 1;
    }

    pub fn note_solver_oracle(&mut self, kind: &'static str) {
        *self.solver_oracle_calls.entry(kind).or_default() += 1;
    }
}
