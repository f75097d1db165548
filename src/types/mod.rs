//! Data types shared across the crate.

mod evidence;
mod preview;
mod style;

pub use evidence::*;
pub use preview::*;
pub use style::*;
