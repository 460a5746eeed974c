mod constants;
mod event_bus;
mod path;
mod type_utils;
mod value;

pub use constants::*;
pub use event_bus::*;
pub use path::*;
pub use type_utils::*;
pub use value::*;
