//! Update expressions: `$set`, `$unset` and `$inc` compiled into mutations.

mod compiler;
mod mutation;

pub use compiler::*;
pub use mutation::*;
