/*!
The oracle adapter: the external symbolic-execution engine behind four queries.

The [ReachabilityOracle] trait is the seam between the solve procedure and the engine.
The canonical implementation, [BinsecOracle], drives the BINSEC engine: each query
composes a transient script from the base configuration, the memory overlay, the goal
directives, and the assumption conjunction; launches the engine; and normalizes the
resulting log into a verdict and an optional partial model.

Failure semantics: a timeout or a non-zero exit is recorded in the oracle statistics
and downgrades the verdict to unknown --- neither is fatal to a solve.
*/

use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::Config;
use crate::misc::log::targets::{self};
use crate::structures::model::PartialModel;
use crate::structures::term::TermArena;
use crate::types::err::{ConfigError, ErrorKind, OracleError};

pub mod parse;
pub mod regions;
pub mod script;

pub use parse::LeakRecord;

use parse::{parse_engine_log, LogParse};
use script::DirectiveSets;

/// The verdict of a reachability query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ReachStatus {
    Reachable,
    Unreachable,
    Unknown,
}

/// The outcome of a reachability query: a verdict, and a witness when reachable.
#[derive(Clone, Debug)]
pub struct ReachOutcome {
    pub status: ReachStatus,
    pub model: Option<PartialModel>,
}

impl ReachOutcome {
    fn unknown() -> Self {
        ReachOutcome {
            status: ReachStatus::Unknown,
            model: None,
        }
    }
}

/// The composed outcome of the goal pair.
///
/// A candidate is sufficient exactly when the negative goal is unreachable and the
/// positive goal is reachable.
#[derive(Clone, Debug)]
pub struct GoalsOutcome {
    pub negative: ReachStatus,
    pub positive: ReachStatus,
    pub negative_model: Option<PartialModel>,
    pub positive_model: Option<PartialModel>,
}

/// The verdict of a constant-time evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CtStatus {
    Secure,
    Insecure,
    Unknown,
}

impl std::fmt::Display for CtStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Secure => write!(f, "secure"),
            Self::Insecure => write!(f, "insecure"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// The outcome of a constant-time evaluation.
#[derive(Clone, Debug, Serialize)]
pub struct CtOutcome {
    pub status: CtStatus,
    pub leaks: Vec<LeakRecord>,
}

/// Counters for one oracle, as recorded over a solve.
#[derive(Clone, Debug, Default, Serialize)]
pub struct OracleCounters {
    pub calls: usize,
    pub timeouts: usize,
    pub crashes: usize,
    /// Wall-clock times of completed calls, in seconds.
    pub times: Vec<f64>,
}

/// Statistics over all oracles touched during a solve, by name.
pub type OracleStatistics = BTreeMap<String, OracleCounters>;

/// The reachability oracle seam.
///
/// Queries take assumption expressions already rendered in the concrete script syntax;
/// each is injected as an `assume` directive at the anchor.
/// Implementations normalize engine output into verdicts and partial models keyed by
/// in-context variables.
pub trait ReachabilityOracle {
    /// Reachability of the negative (bug) goal under the assumptions.
    fn reach_negative(
        &mut self,
        arena: &TermArena,
        assumptions: &[String],
    ) -> Result<ReachOutcome, ErrorKind>;

    /// Reachability of the positive goal under the assumptions.
    fn reach_positive(
        &mut self,
        arena: &TermArena,
        assumptions: &[String],
    ) -> Result<ReachOutcome, ErrorKind>;

    /// Both goals composed, as used by the solve loop.
    fn check_goals(
        &mut self,
        arena: &TermArena,
        assumptions: &[String],
    ) -> Result<GoalsOutcome, ErrorKind>;

    /// Constant-time evaluation of the assumptions, with leakage checking.
    fn ct_evaluate(
        &mut self,
        arena: &TermArena,
        assumptions: &[String],
    ) -> Result<CtOutcome, ErrorKind>;

    /// Whether an identifier is fixed by an equality assumption of the shared
    /// directives, making it useless as a learnt variable.
    fn fully_assumed(&self, _identifier: &str) -> bool {
        false
    }

    /// Canonical input regions derived from the adapter's inputs.
    fn input_regions(&self) -> Vec<(u64, u32)> {
        Vec::new()
    }

    /// Declares the controlled cells of robust queries, as (identifier, width) pairs.
    fn set_controlled(&mut self, _cells: Vec<(String, u32)>) {}

    /// The statistics recorded by the adapter.
    fn statistics(&self) -> OracleStatistics {
        OracleStatistics::default()
    }
}

/// One attempt of a constant-time evaluation, kept for reporting.
#[derive(Clone, Debug, Serialize)]
pub struct CtAttempt {
    pub status: CtStatus,
    pub leak_count: usize,
    pub timeout: Option<u64>,
    pub attempt: u32,
}

struct RobustMode {
    /// Base script of robust runs.
    base_script: String,

    /// Controlled cells as (canonical identifier, width in bits).
    controlled: Vec<(String, u32)>,
}

/// The BINSEC-backed oracle.
pub struct BinsecOracle {
    base_script: String,
    memory_rules: Vec<String>,
    directives: DirectiveSets,
    anchor: String,
    binary: PathBuf,
    timeout: Option<u64>,

    ct_unknown_retries: u32,
    ct_unknown_timeout_factor: f64,

    config_logdir: PathBuf,
    keep_configs: bool,

    robust: Option<RobustMode>,
    regions: Vec<(u64, u32)>,

    run_index: usize,
    counters: OracleStatistics,

    /// History of constant-time attempts, most recent last.
    pub ct_history: Vec<CtAttempt>,
}

/// The result of one engine run.
struct EngineRun {
    parse: LogParse,
    failed: bool,
}

impl BinsecOracle {
    /// Builds the adapter from the configuration, loading and normalizing its input
    /// files.
    pub fn from_config(config: &Config) -> Result<Self, ErrorKind> {
        let base_script = script::load_base_script(&config.engine_config)?;
        let memory_rules = script::load_memory_rules(&config.engine_memory)?;
        let directives = script::load_directives(config.engine_directives.as_deref())?;

        let robust = if config.robust {
            let path = config
                .robust_config
                .as_ref()
                .ok_or(ConfigError::MissingRobustConfig)?;
            Some(RobustMode {
                base_script: script::read_file(path)?,
                controlled: Vec::new(),
            })
        } else {
            None
        };

        let mut raw_regions = regions::symbol_input_regions(&config.engine_binary);
        raw_regions.extend(regions::memory_input_regions(&memory_rules));
        let regions = regions::chunk_input_regions(&raw_regions, config.input_region_max_bytes);
        if !regions.is_empty() {
            log::debug!(target: targets::ORACLE, "canonical input regions: {regions:x?}");
        }

        std::fs::create_dir_all(&config.config_logdir)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", config.config_logdir.display())))?;

        Ok(BinsecOracle {
            base_script,
            memory_rules,
            directives,
            anchor: config.anchor.clone(),
            binary: config.engine_binary.clone(),
            timeout: config.engine_timeout,
            ct_unknown_retries: config.ct_unknown_retries,
            ct_unknown_timeout_factor: config.ct_unknown_timeout_factor,
            config_logdir: config.config_logdir.clone(),
            keep_configs: config.keep_configs,
            robust,
            regions,
            run_index: 0,
            counters: OracleStatistics::default(),
            ct_history: Vec::new(),
        })
    }

    fn counter(&mut self, name: &str) -> &mut OracleCounters {
        self.counters.entry(name.to_owned()).or_default()
    }

    /// Appends an assumption to the directive list, normalizing full directives and
    /// anchoring bare expressions.
    fn append_assumption(&self, directives: &mut Vec<String>, expr: &str) {
        let expr = expr.trim();
        if expr.is_empty() {
            return;
        }
        if expr.starts_with("at ") || (expr.starts_with("0x") && expr.contains(" assume ")) {
            if let Some(norm) = script::normalize_directive(expr) {
                if norm.contains(" assume ") && !norm.trim_end().ends_with(" assume") {
                    directives.push(norm);
                }
            }
            return;
        }
        directives.push(format!("at {} assume {}", self.anchor, expr));
    }

    /// The overlay assignment target of a controlled cell.
    fn overlay_target(identifier: &str) -> String {
        if let Some((addr, size)) = identifier.split_once(':') {
            format!("@[{addr},{size}]")
        } else if identifier.starts_with("0x") {
            format!("@[{identifier},1]")
        } else {
            identifier.to_owned()
        }
    }

    /// The overlay lines and model key translation of a robust run.
    fn robust_overlay(&self) -> (Vec<String>, BTreeMap<String, String>) {
        let mut lines = Vec::new();
        let mut translation = BTreeMap::new();
        if let Some(robust) = &self.robust {
            for (index, (identifier, width)) in robust.controlled.iter().enumerate() {
                let nondet = format!("dvar{index}<{width}>");
                lines.push(format!("{nondet} := nondet"));
                lines.push(format!(
                    "{} := {nondet}",
                    Self::overlay_target(identifier)
                ));
                translation.insert(format!("dvar{index}"), identifier.clone());
            }
        }
        for rule in &self.memory_rules {
            lines.push(rule.clone());
        }
        (lines, translation)
    }

    /// Runs the engine once over the composed script and parses its log.
    fn run(
        &mut self,
        mut directives: Vec<String>,
        assumptions: &[String],
        checkct: bool,
        timeout_override: Option<u64>,
        robust: bool,
    ) -> Result<EngineRun, ErrorKind> {
        self.counter("engine").calls += 1;

        for expr in assumptions {
            self.append_assumption(&mut directives, expr);
        }

        let (memory, translation, base) = if robust {
            let (lines, translation) = self.robust_overlay();
            let base = match &self.robust {
                Some(robust) => robust.base_script.clone(),
                None => self.base_script.clone(),
            };
            (lines, translation, base)
        } else {
            (
                self.memory_rules.clone(),
                BTreeMap::new(),
                self.base_script.clone(),
            )
        };

        let text = script::build_script(&base, &memory, &directives);
        self.run_index += 1;
        let path = self
            .config_logdir
            .join(format!("temp.abduce.{:06}.script", self.run_index));
        std::fs::write(&path, &text)
            .map_err(|e| OracleError::Script(format!("{}: {e}", path.display())))?;

        let engine = std::env::var("BINSEC").unwrap_or_else(|_| "binsec".to_owned());
        let run_timeout = timeout_override.or(self.timeout);
        let mut command = Command::new(engine);
        command.arg("-sse");
        if checkct {
            command.arg("-checkct");
        }
        command.arg("-sse-script").arg(&path).arg(&self.binary);
        if let Some(t) = run_timeout {
            command.arg("-sse-timeout").arg(t.to_string());
        }

        let launched = Instant::now();
        let output = execute_command(command, run_timeout.map(Duration::from_secs))?;
        let elapsed = launched.elapsed().as_secs_f64();

        let failed = if output.timed_out {
            log::warn!(target: targets::ORACLE, "engine command timed out");
            self.counter("engine").timeouts += 1;
            true
        } else if output.exit_code != Some(0) {
            log::warn!(target: targets::ORACLE, "engine command failed (exit {:?})", output.exit_code);
            self.counter("engine").crashes += 1;
            true
        } else {
            self.counter("engine").times.push(elapsed);
            false
        };

        let parse = parse_engine_log(&output.log, &translation);

        if !self.keep_configs {
            let _ = std::fs::remove_file(&path);
        }

        Ok(EngineRun { parse, failed })
    }

    /// Normalizes a raw model into a partial model keyed by in-context variables.
    ///
    /// SSA-tagged and pseudo-source identifiers are dropped; byte-addressed bindings
    /// are re-aggregated into word-level values for registered word variables.
    fn sanitize_model(&self, arena: &TermArena, raw: &parse::RawModel) -> PartialModel {
        let mut model = PartialModel::default();
        for (key, value) in &raw.bindings {
            if key == "default" || key == "from_file" || key.contains('!') {
                continue;
            }
            model.bind(key.clone(), value.clone());
        }

        for (name, id) in arena.variables() {
            let Some((base, size)) = arena.memory_origin(*id) else {
                continue;
            };
            if size <= 1 || model.binds(name) {
                continue;
            }
            if let Some(word) = compose_word(&model, base, size) {
                model.bind(name.clone(), word);
            }
        }
        model
    }

    fn reach_query(
        &mut self,
        arena: &TermArena,
        assumptions: &[String],
        goal: &[String],
        robust: bool,
    ) -> Result<ReachOutcome, ErrorKind> {
        let mut directives = self.directives.all.clone();
        directives.extend(goal.iter().cloned());
        let directives = script::amend_print_model(directives);

        let run = self.run(directives, assumptions, false, None, robust)?;
        if run.failed {
            return Ok(ReachOutcome::unknown());
        }

        let model = run
            .parse
            .models
            .first()
            .map(|raw| self.sanitize_model(arena, raw));
        if run.parse.goal_unreachable || model.is_none() {
            return Ok(ReachOutcome {
                status: ReachStatus::Unreachable,
                model: None,
            });
        }
        Ok(ReachOutcome {
            status: ReachStatus::Reachable,
            model,
        })
    }

    /// Directives of a constant-time run: every shared directive except goals.
    fn ct_directives(&self) -> Vec<String> {
        self.directives
            .all
            .iter()
            .filter(|d| !d.starts_with("reach ") && !d.starts_with("cut "))
            .cloned()
            .collect()
    }
}

impl ReachabilityOracle for BinsecOracle {
    fn reach_negative(
        &mut self,
        arena: &TermArena,
        assumptions: &[String],
    ) -> Result<ReachOutcome, ErrorKind> {
        let goal = self.directives.negative.clone();
        let robust = self.robust.is_some();
        let mut outcome = self.reach_query(arena, assumptions, &goal, robust)?;
        if let (Some(robust), Some(model)) = (&self.robust, &mut outcome.model) {
            if !robust.controlled.is_empty() {
                model.controlled = Some(
                    robust
                        .controlled
                        .iter()
                        .map(|(identifier, _)| identifier.clone())
                        .collect(),
                );
            }
        }
        Ok(outcome)
    }

    fn reach_positive(
        &mut self,
        arena: &TermArena,
        assumptions: &[String],
    ) -> Result<ReachOutcome, ErrorKind> {
        // Positive reachability is checked without the robust overlay; robust
        // composition happens in check_goals.
        let goal = self.directives.positive.clone();
        self.reach_query(arena, assumptions, &goal, false)
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

        if outcome.negative != ReachStatus::Unreachable {
            return Ok(outcome);
        }
        self.counter("engine-unsat-consistent").calls += 1;

        let positive = self.reach_positive(arena, assumptions)?;
        outcome.positive = positive.status;
        outcome.positive_model = positive.model;

        if self.robust.is_some() && outcome.positive == ReachStatus::Reachable {
            // Robust composition: the final sufficiency verdict is the robust
            // reachability of the positive goal, overwriting the negative status.
            let goal = self.directives.positive.clone();
            let robust = self.reach_query(arena, assumptions, &goal, true)?;
            outcome.negative = match robust.status {
                ReachStatus::Reachable => ReachStatus::Unreachable,
                ReachStatus::Unreachable => ReachStatus::Reachable,
                ReachStatus::Unknown => ReachStatus::Unknown,
            };
        }

        Ok(outcome)
    }

    fn ct_evaluate(
        &mut self,
        _arena: &TermArena,
        assumptions: &[String],
    ) -> Result<CtOutcome, ErrorKind> {
        let directives = self.ct_directives();
        let factor = self.ct_unknown_timeout_factor.max(1.0);
        let retries = self.ct_unknown_retries;
        let mut timeout = self.timeout;

        let mut status = CtStatus::Unknown;
        let mut leaks = Vec::new();
        for attempt in 0..=retries {
            let run = self.run(directives.clone(), assumptions, true, timeout, false)?;
            status = match run.parse.ct_status.as_deref() {
                Some("secure") => CtStatus::Secure,
                Some("insecure") => CtStatus::Insecure,
                _ => CtStatus::Unknown,
            };
            leaks = run.parse.ct_leaks;
            self.ct_history.push(CtAttempt {
                status,
                leak_count: leaks.len(),
                timeout,
                attempt,
            });
            if status != CtStatus::Unknown || attempt >= retries {
                break;
            }
            if let Some(old) = timeout {
                timeout = Some((old + 1).max((old as f64 * factor).floor() as u64));
                log::warn!(
                    target: targets::ORACLE,
                    "constant-time status is unknown; retrying with timeout {timeout:?}",
                );
            }
        }

        log::info!(target: targets::ORACLE, "constant-time status: {status}");
        for leak in &leaks {
            log::info!(target: targets::RESULT, "constant-time leak: {}", leak.raw);
        }
        Ok(CtOutcome { status, leaks })
    }

    fn fully_assumed(&self, identifier: &str) -> bool {
        self.directives
            .all
            .iter()
            .any(|d| d.contains("assume") && d.contains(identifier) && d.contains(" = "))
    }

    fn input_regions(&self) -> Vec<(u64, u32)> {
        self.regions.clone()
    }

    fn set_controlled(&mut self, cells: Vec<(String, u32)>) {
        if let Some(robust) = &mut self.robust {
            robust.controlled = cells;
        }
    }

    fn statistics(&self) -> OracleStatistics {
        self.counters.clone()
    }
}

/// Recomposes a little-endian word value from byte-addressed bindings.
fn compose_word(model: &PartialModel, base: u64, size: u32) -> Option<String> {
    let mut acc: u128 = 0;
    for offset in 0..size {
        let key = format!("0x{:08x}", base + offset as u64);
        let value = model.value_of(&key)?;
        let byte = crate::structures::term::parse_int_token(value)? & 0xff;
        acc |= byte << (8 * offset);
    }
    let width = (size as usize * 2).max(1);
    Some(format!("0x{acc:0width$x}"))
}

/// The captured output of a scoped engine launch.
struct ProcessOutput {
    exit_code: Option<i32>,
    timed_out: bool,
    /// Standard output followed by standard error.
    log: String,
}

/// Launches a command, enforcing a deadline.
///
/// On both normal return and timeout the child is terminated and its streams drained;
/// reader threads keep the pipes moving so a verbose engine cannot stall on a full
/// buffer.
fn execute_command(
    mut command: Command,
    timeout: Option<Duration>,
) -> Result<ProcessOutput, ErrorKind> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    log::debug!(target: targets::ORACLE, "running: {command:?}");

    let mut child = command
        .spawn()
        .map_err(|e| OracleError::Spawn(e.to_string()))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let drain = |stream: Option<Box<dyn Read + Send>>| {
        std::thread::spawn(move || {
            let mut buffer = Vec::new();
            if let Some(mut stream) = stream {
                let _ = stream.read_to_end(&mut buffer);
            }
            buffer
        })
    };
    let out_reader = drain(stdout.map(|s| Box::new(s) as Box<dyn Read + Send>));
    let err_reader = drain(stderr.map(|s| Box::new(s) as Box<dyn Read + Send>));

    let deadline = timeout.map(|t| Instant::now() + t);
    let mut timed_out = false;
    let exit_code = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status.code(),
            Ok(None) => {}
            Err(e) => {
                let _ = child.kill();
                return Err(OracleError::Spawn(e.to_string()).into());
            }
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            timed_out = true;
            let _ = child.kill();
            let status = child.wait().ok();
            break status.and_then(|s| s.code());
        }
        std::thread::sleep(Duration::from_millis(25));
    };

    let mut log_text = String::from_utf8_lossy(&out_reader.join().unwrap_or_default()).into_owned();
    let err_text = String::from_utf8_lossy(&err_reader.join().unwrap_or_default()).into_owned();
    if !err_text.is_empty() {
        log_text.push('\n');
        log_text.push_str(&err_text);
    }

    Ok(ProcessOutput {
        exit_code,
        timed_out,
        log: log_text,
    })
}
