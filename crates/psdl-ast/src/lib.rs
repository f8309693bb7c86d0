//! PSDL intermediate representation
//!
//! This crate defines the validated IR produced by the PSDL parser and
//! consumed by the evaluation engine: signals, trend expressions, logic
//! rules (with their boolean tree), the optional state machine, and the
//! scenario root that owns them.

mod logic;
mod scenario;
mod trend;
mod window;

pub use logic::*;
pub use scenario::*;
pub use trend::*;
pub use window::*;
