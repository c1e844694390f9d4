/*!
The context --- within which solves take place.

Strictly, a [GenericContext] and a [Context].

The generic context is generic over the oracle, which helps distinguish the solve
procedures from any particular engine: the canonical instantiation drives the external
BINSEC engine, while tests instantiate the context over a scripted oracle.

A context exclusively owns its term arena, storage, model tables, and generator state
for its lifetime; nothing is shared across instances.

# Example

```rust,ignore
use abduce::{config::Config, context::Context};

let mut ctx = Context::from_config(config)?;
let summary = ctx.solve()?;
```
*/

mod counters;
pub use counters::{Counters, EventTimer, GenerationCounters};

use crate::config::{Config, ConsequenceMode};
use crate::db::{ModelDB, StorageDB};
use crate::generator::CandidateGenerator;
use crate::oracle::{BinsecOracle, ReachabilityOracle};
use crate::structures::term::TermArena;
use crate::types::err::ErrorKind;

/// A generic context, parameterized by the reachability oracle.
pub struct GenericContext<O: ReachabilityOracle> {
    /// The configuration of a context.
    pub config: Config,

    /// The term arena.
    pub arena: TermArena,

    /// The reachability oracle.
    pub oracle: O,

    /// The candidate generator.
    pub generator: CandidateGenerator,

    /// Sufficient conjunctions, as an antichain.
    pub storage: StorageDB,

    /// Locally inconsistent conjunctions.
    pub storage_unsol: StorageDB,

    /// Necessary units.
    pub necessary: StorageDB,

    /// Witnesses of goal reachability.
    pub examples: ModelDB,

    /// Witnesses against candidate sufficiency.
    pub counter_examples: ModelDB,

    /// Counters related to a context/solve.
    pub counters: Counters,

    /// Whether the candidate pipeline has emitted the necessary-core seed.
    pub(crate) seeded: bool,
}

impl<O: ReachabilityOracle> GenericContext<O> {
    /// Creates a context over a given oracle.
    ///
    /// The literals file named by the configuration is read during construction.
    pub fn with_oracle(config: Config, mut oracle: O) -> Result<Self, ErrorKind> {
        let mut arena = TermArena::default();
        let regions = oracle.input_regions();
        let generator = CandidateGenerator::from_config(&config, &mut arena, &regions)?;
        oracle.set_controlled(generator.controlled_cells(&arena));

        let exact = ConsequenceMode::Exact;
        Ok(GenericContext {
            storage: StorageDB::new(exact),
            storage_unsol: StorageDB::new(config.consequence_mode),
            necessary: StorageDB::new(exact),
            examples: ModelDB::default(),
            counter_examples: ModelDB::default(),
            counters: Counters::default(),
            generator,
            arena,
            oracle,
            config,
            seeded: false,
        })
    }
}

/// A context which drives the external BINSEC engine.
pub type Context = GenericContext<BinsecOracle>;

impl Context {
    /// Creates a context from some given configuration.
    pub fn from_config(config: Config) -> Result<Self, ErrorKind> {
        let oracle = BinsecOracle::from_config(&config)?;
        Self::with_oracle(config, oracle)
    }
}
