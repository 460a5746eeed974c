//! Query expressions: the operator set and the compiler that turns a
//! filter document into an executable plan.

mod compiler;
mod predicate;

pub use compiler::*;
pub use predicate::*;
