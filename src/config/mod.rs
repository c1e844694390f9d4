/*!
Configuration of a context.

All configuration for a context is contained within [Config].
The CLI fills the record once at startup; every default is explicit in
[Default::default].
*/

use std::path::PathBuf;

use serde::Serialize;

/// How consequence checks between stored conjunctions and candidates are decided.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ConsequenceMode {
    /// Syntactic subset checks only.
    #[default]
    Fast,

    /// Syntactic subset checks, refined by SMT consequence queries.
    Exact,
}

impl std::fmt::Display for ConsequenceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Exact => write!(f, "exact"),
        }
    }
}

/// The ranking applied to the final set of sufficient conjunctions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    /// Policies matching the detected branch pivot first, then size and complexity.
    BranchFirst,

    /// Rank by literal count, summed complexity, and the canonical string.
    SizeComplexity,
}

impl std::fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BranchFirst => write!(f, "branch-first"),
            Self::SizeComplexity => write!(f, "size-complexity"),
        }
    }
}

/// The primary configuration structure.
#[derive(Clone, Debug)]
pub struct Config {
    /// Path to the base engine script, stripped of goal directives on load.
    pub engine_config: PathBuf,

    /// Path to the memory overlay (address-range initializers).
    pub engine_memory: PathBuf,

    /// Path to the goal directives file, if any.
    pub engine_directives: Option<PathBuf>,

    /// Path to the literals file seeding variables and constants.
    pub literals: PathBuf,

    /// Path to the binary under analysis.
    pub engine_binary: PathBuf,

    /// The assumption anchor: the code address at which `assume` directives are injected.
    pub anchor: String,

    /// Per-query engine timeout, in seconds.
    pub engine_timeout: Option<u64>,

    /// Enable the robust oracle (controlled cells become universally quantified).
    pub robust: bool,

    /// Path to the robust configuration file, required when [robust](Config::robust) is set.
    pub robust_config: Option<PathBuf>,

    /// Cap on candidate cardinality.
    /// When unset, the literal count of the final generation round is used.
    pub max_depth: Option<usize>,

    /// Extend the operator set with disequalities.
    pub with_disequalities: bool,

    /// Extend the operator set with signed less-than.
    pub with_inequalities: bool,

    /// Emit byte-slice literal variants when operand widths differ.
    pub separate_bytes: bool,

    /// Emit bit-slice literal variants when operand widths differ.
    pub separate_bits: bool,

    /// Reject candidates satisfied by a stored counter-example.
    pub prune_counterex: bool,

    /// Reject candidates by consequence against storage and the necessary core.
    pub prune_necessary: bool,

    /// Rank literals by example satisfaction count and complexity.
    pub literal_ordering: bool,

    /// Run necessary-constant recovery on a fresh vulnerability example.
    pub const_detection: bool,

    /// Number of initial vulnerability examples to collect.
    pub vexamples_init_count: usize,

    /// Constant-time mode: necessity and policy validation via leakage checking.
    pub ct_mode: bool,

    /// Retries on an unknown constant-time verdict.
    pub ct_unknown_retries: u32,

    /// Engine timeout growth factor between constant-time retries.
    pub ct_unknown_timeout_factor: f64,

    /// Continue enumeration past the first NAS point, until the solver timeout.
    pub collect_until_timeout: bool,

    /// Solver-level timeout, in seconds, polled between candidates.
    pub solver_timeout: Option<u64>,

    /// Policy ranking mode.
    /// When unset, branch-first in constant-time mode and size-complexity otherwise.
    pub selection_mode: Option<SelectionMode>,

    /// Forbid learning variables from oracle models.
    pub input_variables_only: bool,

    /// Consequence check mode for pruning and storage refinement.
    pub consequence_mode: ConsequenceMode,

    /// Cap on dynamic constants learnt per variable from models.
    pub dynamic_constants_per_var: usize,

    /// Cap, in bytes, on each canonical input region derived from memory or symbols.
    pub input_region_max_bytes: usize,

    /// Seed the constants `0x00` and `0x01` regardless of the literals file.
    pub with_auto_constants: bool,

    /// Skip variable-variable pairs during literal generation.
    pub no_variables_binop: bool,

    /// Emit whole-width literals (as opposed to slice variants only).
    pub core_literals: bool,

    /// Directory for transient engine scripts.
    pub config_logdir: PathBuf,

    /// Keep transient engine scripts instead of deleting them after each query.
    pub keep_configs: bool,

    /// On a failed singleton necessity check, add the witness model as an example and
    /// restart generation.
    pub force_on_model_resorting: bool,
}

impl Default for Config {
    /// The default configuration mirrors the conservative command line: all prunes on,
    /// equality only, classical (non-robust, non-constant-time) goals.
    fn default() -> Self {
        Config {
            engine_config: PathBuf::new(),
            engine_memory: PathBuf::new(),
            engine_directives: None,
            literals: PathBuf::new(),

            engine_binary: PathBuf::new(),
            anchor: String::new(),
            engine_timeout: None,

            robust: false,
            robust_config: None,

            max_depth: None,

            with_disequalities: false,
            with_inequalities: false,
            separate_bytes: false,
            separate_bits: false,

            prune_counterex: true,
            prune_necessary: true,
            literal_ordering: true,

            const_detection: false,
            vexamples_init_count: 1,

            ct_mode: false,
            ct_unknown_retries: 1,
            ct_unknown_timeout_factor: 2.0,

            collect_until_timeout: false,
            solver_timeout: None,

            selection_mode: None,

            input_variables_only: false,

            consequence_mode: ConsequenceMode::Fast,

            dynamic_constants_per_var: 3,
            input_region_max_bytes: 32,

            with_auto_constants: false,
            no_variables_binop: false,
            core_literals: true,

            config_logdir: PathBuf::from("."),
            keep_configs: false,

            force_on_model_resorting: false,
        }
    }
}

impl Config {
    /// The effective selection mode, defaulting by [ct_mode](Config::ct_mode).
    pub fn effective_selection_mode(&self) -> SelectionMode {
        match self.selection_mode {
            Some(mode) => mode,
            None => {
                if self.ct_mode {
                    SelectionMode::BranchFirst
                } else {
                    SelectionMode::SizeComplexity
                }
            }
        }
    }
}
