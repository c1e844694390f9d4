/*!
Structures, typically related to a solve.
*/

pub mod candidate;
pub mod model;
pub mod term;
