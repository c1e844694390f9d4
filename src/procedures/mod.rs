/*!
The procedures of a solve.

The algorithm is factored into a collection of procedures over the
[context](crate::context::GenericContext):

- [Initialization](initialize): collection of initial vulnerability examples and
  necessary-constant recovery.
- [Candidates](candidates): the pre-checked candidate pipeline over the generator.
- [Necessity](necessity): the oracle-backed necessity checks.
- [The solve loop](solve): CEGAR orchestration over oracle verdicts.
- [Finalization](finalize): the semantic post-filter, ranking, branch-guided policy
  derivation, and assembly of the result summary.
*/

pub mod candidates;
pub mod finalize;
pub mod initialize;
pub mod necessity;
pub mod solve;
