//! Typed models

mod record;
mod reference;
mod value;

pub use record::*;
pub use reference::*;
pub use value::*;
