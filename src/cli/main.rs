/*!
A simple CLI interface to the library.

# Use

```sh
abduce_cli --binsec-config cfg.script --binsec-memory mem.script \
           --binsec-binary target.bin --binsec-addr 0x08049000 \
           --literals input.literals [--option(=value)]*
```

The event log is controlled through `RUST_LOG` (e.g. `RUST_LOG=result=info`); the
result summary is printed to standard output as JSON.

Exit code is 0 on a clean run, regardless of whether a necessary-and-sufficient
condition was found, and non-zero on a configuration error.
*/

use std::path::PathBuf;

use clap::Parser;

use abduce::config::{Config, ConsequenceMode, SelectionMode};
use abduce::context::Context;
use abduce::types::err::ErrorKind;

/// Synthesizes a necessary-and-sufficient precondition on uncontrolled inputs by
/// abduction over a symbolic-execution oracle.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The base engine script, stripped of goal directives on load
    #[arg(long = "binsec-config")]
    binsec_config: PathBuf,

    /// The memory overlay file
    #[arg(long = "binsec-memory")]
    binsec_memory: PathBuf,

    /// The goal directives file
    #[arg(long = "binsec-directives")]
    binsec_directives: Option<PathBuf>,

    /// The literals file seeding variables and constants
    #[arg(long)]
    literals: PathBuf,

    /// The binary under analysis
    #[arg(long = "binsec-binary")]
    binsec_binary: PathBuf,

    /// The assumption anchor address
    #[arg(long = "binsec-addr")]
    binsec_addr: String,

    /// Per-query engine timeout, in seconds
    #[arg(long = "binsec-timeout")]
    binsec_timeout: Option<u64>,

    /// Enable the robust oracle
    #[arg(long = "binsec-robust", default_value_t = false)]
    binsec_robust: bool,

    /// The robust configuration file, required with --binsec-robust
    #[arg(long = "robust-config")]
    robust_config: Option<PathBuf>,

    /// Cap on candidate cardinality
    #[arg(long = "max-depth")]
    max_depth: Option<usize>,

    /// Extend the operator set with disequalities
    #[arg(long = "with-disequalities", default_value_t = false)]
    with_disequalities: bool,

    /// Extend the operator set with signed less-than
    #[arg(long = "with-inequalities", default_value_t = false)]
    with_inequalities: bool,

    /// Emit byte-slice literal variants
    #[arg(long = "separate-bytes", default_value_t = false)]
    separate_bytes: bool,

    /// Emit bit-slice literal variants
    #[arg(long = "separate-bits", default_value_t = false)]
    separate_bits: bool,

    /// Disable the counter-example filter
    #[arg(long = "no-prune-counterex", default_value_t = false)]
    no_prune_counterex: bool,

    /// Disable consequence pruning against storage and the necessary core
    #[arg(long = "no-prune-necessary", default_value_t = false)]
    no_prune_necessary: bool,

    /// Disable literal ordering
    #[arg(long = "no-literal-ordering", default_value_t = false)]
    no_literal_ordering: bool,

    /// Run necessary-constant recovery
    #[arg(long = "const-detection", default_value_t = false)]
    const_detection: bool,

    /// Initial vulnerability examples to collect
    #[arg(long = "vexamples-init-count", default_value_t = 1)]
    vexamples_init_count: usize,

    /// Enable constant-time necessity and policy mode
    #[arg(long = "ct-mode", default_value_t = false)]
    ct_mode: bool,

    /// Retries on an unknown constant-time verdict
    #[arg(long = "ct-unknown-retries", default_value_t = 1)]
    ct_unknown_retries: u32,

    /// Engine timeout growth factor between constant-time retries
    #[arg(long = "ct-unknown-timeout-factor", default_value_t = 2.0)]
    ct_unknown_timeout_factor: f64,

    /// Continue enumeration past the first NAS point, until the solver timeout
    #[arg(long = "collect-until-timeout", default_value_t = false)]
    collect_until_timeout: bool,

    /// Solver-level timeout, in seconds
    #[arg(long = "solver-timeout")]
    solver_timeout: Option<u64>,

    /// Policy ranking mode
    #[arg(long = "selection-mode", value_enum)]
    selection_mode: Option<SelectionMode>,

    /// Forbid learning variables from oracle models
    #[arg(long = "input-variables-only", default_value_t = false)]
    input_variables_only: bool,

    /// Consequence check mode
    #[arg(long = "consequence-mode", value_enum, default_value_t = ConsequenceMode::Fast)]
    consequence_mode: ConsequenceMode,

    /// Cap on dynamic constants learnt per variable
    #[arg(long = "dynamic-constants-per-var", default_value_t = 3)]
    dynamic_constants_per_var: usize,

    /// Cap, in bytes, on each canonical input region
    #[arg(long = "input-region-max-bytes", default_value_t = 32)]
    input_region_max_bytes: usize,

    /// Seed the constants 0x00 and 0x01 unconditionally
    #[arg(long = "with-auto-constants", default_value_t = false)]
    with_auto_constants: bool,

    /// Skip variable-variable pairs during literal generation
    #[arg(long = "no-variables-binop", default_value_t = false)]
    no_variables_binop: bool,

    /// Directory for transient engine scripts
    #[arg(long = "config-logdir", default_value = ".")]
    config_logdir: PathBuf,

    /// Keep transient engine scripts instead of deleting them
    #[arg(long = "keep-configs", default_value_t = false)]
    keep_configs: bool,

    /// On a failed singleton necessity check, add the witness as an example and
    /// restart generation
    #[arg(long = "force-on-model-resorting", default_value_t = false)]
    force_on_model_resorting: bool,
}

fn config_from_args(args: Args) -> Config {
    Config {
        engine_config: args.binsec_config,
        engine_memory: args.binsec_memory,
        engine_directives: args.binsec_directives,
        literals: args.literals,
        engine_binary: args.binsec_binary,
        anchor: args.binsec_addr,
        engine_timeout: args.binsec_timeout,
        robust: args.binsec_robust,
        robust_config: args.robust_config,
        max_depth: args.max_depth,
        with_disequalities: args.with_disequalities,
        with_inequalities: args.with_inequalities,
        separate_bytes: args.separate_bytes,
        separate_bits: args.separate_bits,
        prune_counterex: !args.no_prune_counterex,
        prune_necessary: !args.no_prune_necessary,
        literal_ordering: !args.no_literal_ordering,
        const_detection: args.const_detection,
        vexamples_init_count: args.vexamples_init_count,
        ct_mode: args.ct_mode,
        ct_unknown_retries: args.ct_unknown_retries,
        ct_unknown_timeout_factor: args.ct_unknown_timeout_factor,
        collect_until_timeout: args.collect_until_timeout,
        solver_timeout: args.solver_timeout,
        selection_mode: args.selection_mode,
        input_variables_only: args.input_variables_only,
        consequence_mode: args.consequence_mode,
        dynamic_constants_per_var: args.dynamic_constants_per_var,
        input_region_max_bytes: args.input_region_max_bytes,
        with_auto_constants: args.with_auto_constants,
        no_variables_binop: args.no_variables_binop,
        core_literals: true,
        config_logdir: args.config_logdir,
        keep_configs: args.keep_configs,
        force_on_model_resorting: args.force_on_model_resorting,
    }
}

/// Entrypoint to the CLI.
fn main() {
    env_logger::init();

    let args = Args::parse();
    let config = config_from_args(args);

    let mut ctx = match Context::from_config(config) {
        Ok(ctx) => ctx,
        Err(e @ ErrorKind::Config(_)) => {
            eprintln!("c {e}");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("c {e}");
            std::process::exit(2);
        }
    };

    let summary = match ctx.solve() {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("c Solve error: {e}");
            std::process::exit(2);
        }
    };

    match serde_json::to_string_pretty(&summary) {
        Ok(payload) => println!("{payload}"),
        Err(e) => {
            eprintln!("c Serialization error: {e}");
            std::process::exit(2);
        }
    }
}
