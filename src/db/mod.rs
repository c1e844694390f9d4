/*!
Databases holding information relevant to a solve.

- [Storage](StorageDB) keeps candidates under subset-minimality (an antichain).
  Three instances exist per context: sufficient conjunctions, locally inconsistent
  conjunctions, and necessary units.
- [Model tables](ModelDB) keep the witnesses recovered from oracle calls: examples and
  counter-examples.
*/

mod models;
mod storage;

pub use models::ModelDB;
pub use storage::StorageDB;
