#![allow(dead_code)]

use std::io::Write;

use abduce::config::Config;
use abduce::context::GenericContext;
use abduce::oracle::{
    CtOutcome, CtStatus, GoalsOutcome, OracleCounters, OracleStatistics, ReachOutcome,
    ReachStatus, ReachabilityOracle,
};
use abduce::structures::model::PartialModel;
use abduce::structures::term::TermArena;
use abduce::types::err::ErrorKind;

pub type ReachRule = Box<dyn FnMut(&[String]) -> ReachOutcome>;
pub type CtRule = Box<dyn FnMut(&[String]) -> CtOutcome>;

/// A scripted oracle: each query is answered by a rule over the rendered assumptions,
/// and every call is recorded for inspection.
pub struct ScriptedOracle {
    pub negative: ReachRule,
    pub positive: ReachRule,
    pub ct: CtRule,

    /// Every query made, as (kind, assumptions).
    pub log: Vec<(&'static str, Vec<String>)>,
}

impl Default for ScriptedOracle {
    fn default() -> Self {
        ScriptedOracle {
            negative: Box::new(|_| unreachable_outcome()),
            positive: Box::new(|_| unreachable_outcome()),
            ct: Box::new(|_| CtOutcome {
                status: CtStatus::Unknown,
                leaks: Vec::new(),
            }),
            log: Vec::new(),
        }
    }
}

impl ScriptedOracle {
    pub fn calls(&self, kind: &str) -> usize {
        self.log.iter().filter(|(k, _)| *k == kind).count()
    }

    /// Whether any recorded query carried an assumption containing the needle.
    pub fn assumption_seen(&self, needle: &str) -> bool {
        self.log
            .iter()
            .any(|(_, assumptions)| assumptions.iter().any(|a| a.contains(needle)))
    }
}

impl ReachabilityOracle for ScriptedOracle {
    fn reach_negative(
        &mut self,
        _arena: &TermArena,
        assumptions: &[String],
    ) -> Result<ReachOutcome, ErrorKind> {
        self.log.push(("negative", assumptions.to_vec()));
        Ok((self.negative)(assumptions))
    }

    fn reach_positive(
        &mut self,
        _arena: &TermArena,
        assumptions: &[String],
    ) -> Result<ReachOutcome, ErrorKind> {
        self.log.push(("positive", assumptions.to_vec()));
        Ok((self.positive)(assumptions))
    }

    fn check_goals(
        &mut self,
        arena: &TermArena,
        assumptions: &[String],
    ) -> Result<GoalsOutcome, ErrorKind> {
        let negative = self.reach_negative(arena, assumptions)?;
        let mut outcome = GoalsOutcome {
            negative: negative.status,
            positive: ReachStatus::Reachable,
            negative_model: negative.model,
            positive_model: None,
        };
        if outcome.negative == ReachStatus::Unreachable {
            let positive = self.reach_positive(arena, assumptions)?;
            outcome.positive = positive.status;
            outcome.positive_model = positive.model;
        }
        Ok(outcome)
    }

    fn ct_evaluate(
        &mut self,
        _arena: &TermArena,
        assumptions: &[String],
    ) -> Result<CtOutcome, ErrorKind> {
        self.log.push(("ct", assumptions.to_vec()));
        Ok((self.ct)(assumptions))
    }

    fn statistics(&self) -> OracleStatistics {
        let mut statistics = OracleStatistics::default();
        statistics.insert(
            "engine".to_owned(),
            OracleCounters {
                calls: self.log.len(),
                ..OracleCounters::default()
            },
        );
        statistics
    }
}

pub fn reachable_outcome(bindings: &[(&str, &str)]) -> ReachOutcome {
    ReachOutcome {
        status: ReachStatus::Reachable,
        model: Some(model(bindings)),
    }
}

pub fn unreachable_outcome() -> ReachOutcome {
    ReachOutcome {
        status: ReachStatus::Unreachable,
        model: None,
    }
}

pub fn secure() -> CtOutcome {
    CtOutcome {
        status: CtStatus::Secure,
        leaks: Vec::new(),
    }
}

pub fn insecure() -> CtOutcome {
    CtOutcome {
        status: CtStatus::Insecure,
        leaks: Vec::new(),
    }
}

pub fn model(bindings: &[(&str, &str)]) -> PartialModel {
    let mut model = PartialModel::default();
    for (key, value) in bindings {
        model.bind(*key, *value);
    }
    model
}

/// Writes a literals file into a fresh temporary directory and returns a configuration
/// pointing at it.
pub fn config_with_literals(dir: &tempfile::TempDir, lines: &[&str]) -> Config {
    let path = dir.path().join("input.literals");
    let mut file = std::fs::File::create(&path).expect("literals file");
    for line in lines {
        writeln!(file, "{line}").expect("literals line");
    }
    let mut config = Config::default();
    config.literals = path;
    config
}

/// A context over a scripted oracle.
pub fn scripted_context(
    config: Config,
    oracle: ScriptedOracle,
) -> GenericContext<ScriptedOracle> {
    GenericContext::with_oracle(config, oracle).expect("context")
}
