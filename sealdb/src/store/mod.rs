//! Persistence: byte storage backends, the digest primitive, signed
//! collection files and the events they raise.

mod backend;
mod codec;
mod digest;
mod event;

pub use backend::*;
pub use codec::*;
pub use digest::*;
pub use event::*;
