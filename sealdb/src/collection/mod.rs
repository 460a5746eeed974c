//! Documents, references, result options and the collection handle that
//! ties the table, its indexes and persistence together.

mod collection_data;
mod dbref;
mod document;
mod find_options;
mod object_id;
mod seal_collection;

pub use collection_data::*;
pub use dbref::DbRef;
pub use document::*;
pub use find_options::*;
pub use object_id::*;
pub use seal_collection::*;
