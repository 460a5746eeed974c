//! Remote synchronization of collections over an injected HTTP transport.

mod http;
mod rest_adapter;

pub use http::*;
pub use rest_adapter::*;

use crate::collection::Collection;
use crate::errors::SealResult;

/// Moves a collection's documents to and from a remote store.
///
/// Both operations report transport and remote failures as events and
/// return `Ok(false)`; an `Err` is reserved for local failures.
pub trait SyncAdapter: Send + Sync {
    /// Downloads the remote documents and saves them into `collection`.
    fn load(&self, collection: &Collection) -> SealResult<bool>;

    /// Uploads every document of `collection`, then replays the pending
    /// deletions recorded for it.
    fn save(&self, collection: &Collection) -> SealResult<bool>;
}
