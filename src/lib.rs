/*!
A library for synthesizing necessary-and-sufficient preconditions on uncontrolled program inputs.

abduce treats an external symbolic-execution engine as a reachability oracle and runs a
CEGAR-style abduction loop: candidate conjunctions of bit-vector literals are enumerated,
evaluated against a pair of reachability goals, and accumulated into an antichain of
sufficient preconditions until the disjunction of the stored preconditions is also
necessary --- at which point the set is filtered, ranked, and reported as a policy.

# Orientation

The library is designed around the core structure of a [context].

A solve is viewed, at a high level, as the interplay of a handful of databases and two
oracles:

- Candidate conjunctions are drawn from a [generator] over a growing set of literals.
- An SMT backend ([smt]) prunes inconsistent or redundant candidates before any
  (expensive) engine invocation.
- The [oracle] answers reachability and constant-time queries by driving the external
  engine and normalizing its logs into verdicts and partial models.
- Sufficient conjunctions, locally inconsistent conjunctions, and necessary units are
  kept in antichain [storage](db::StorageDB); witnesses live in model tables.

Useful starting points:
- The high-level [solve procedure](crate::procedures) for the dynamics of a run.
- The [term structures](crate::structures::term) for the representation of literals.
- The [configuration](crate::config) for the supported options.

# Example

```rust,ignore
use abduce::{config::Config, context::Context};

let mut config = Config::default();
config.literals = "input.literals".into();
config.engine_binary = "target.bin".into();

let mut ctx = Context::from_config(config)?;
let summary = ctx.solve()?;
println!("{:?}", summary.selected_policy);
```

# Logs

Detailed calls to [log!](log) are made throughout the library, with a variety of targets
defined to help narrow output to relevant parts ([misc::log]).
Result-grade transitions (counter-examples, satisfying solutions, necessary constraints,
NAS detection) are logged at `info` under the `result` target.
*/

#![allow(clippy::collapsible_else_if)]
#![allow(clippy::single_match)]

pub mod config;
pub mod context;
pub mod structures;
pub mod types;

pub mod generic;

pub mod reports;

pub mod db;

pub mod generator;
pub mod oracle;
pub mod procedures;
pub mod smt;

pub mod misc;
