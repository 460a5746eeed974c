#![allow(dead_code)]
//! # SealDB - Tamper-Evident Embedded Document Store
//!
//! SealDB keeps collections of JSON documents in memory and persists each
//! collection as one signed JSON file. A file altered outside SealDB, or
//! opened with the wrong secret, fails verification: the collection opens
//! empty and a `DataTampered` event is published.
//!
//! ## Key Features
//!
//! - **Queries**: NoSQL-style filter documents (`$eq`, `$gt`, `$in`, `$regex`, `$or`, ...)
//! - **Mutations**: `$set`, `$unset` and `$inc` update documents
//! - **Indexes**: single and compound B-tree indexes, ascending or descending
//! - **References**: `DbRef` links between collections, resolved on demand
//! - **Sync**: pluggable REST synchronization with a replayed deletion log
//! - **Events**: listeners for tampering and sync outcomes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sealdb::database::Database;
//! use sealdb::collection::FindOptions;
//! use sealdb::doc;
//!
//! let db = Database::builder()
//!     .storage_dir("./data")
//!     .open()?;
//!
//! let users = db.get_or_open("users", "s3cret", None)?;
//! users.save(doc! { name: "alice", age: 31 })?;
//!
//! let adults = users.find(&doc! { age: { "$gte": 18 } }, &FindOptions::new())?;
//! ```
//!
//! ## Module Organization
//!
//! - [`collection`] - Documents, collections, references and result options
//! - [`common`] - Values, field paths, constants and the event bus
//! - [`errors`] - Error types and result definitions
//! - [`filter`] - Query compilation and evaluation
//! - [`index`] - Index definitions and the B-tree index
//! - [`store`] - Storage backends, digests, signing and events
//! - [`sync`] - Remote synchronization
//! - [`update`] - Mutation compilation and application
//! - [`database`] - The collection registry
//! - [`database_builder`] - Database builder
//! - [`database_config`] - Database configuration

use crate::collection::ObjectIdGenerator;
use std::sync::LazyLock;

pub mod collection;
pub mod common;
pub mod database;
pub mod database_builder;
pub mod database_config;
pub mod errors;
pub mod filter;
pub mod index;
pub mod store;
pub mod sync;
pub mod update;

pub(crate) static ID_GENERATOR: LazyLock<ObjectIdGenerator> = LazyLock::new(ObjectIdGenerator::new);

#[cfg(test)]
#[ctor::ctor]
fn init() {
    colog::init();
}
