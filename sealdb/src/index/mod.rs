//! Secondary indexes: normalized definitions and the multi-level tree that
//! narrows query candidates by exact key set.

mod btree_index;
mod definition;

pub use btree_index::*;
pub use definition::*;
