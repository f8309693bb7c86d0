//! PSDL diagnostics and error handling
//!
//! This crate provides the error handling infrastructure shared by the PSDL
//! parser and evaluator: numbered error codes, source locations, and the
//! diagnostic type used for non-fatal warnings.

mod error;
mod error_code;
mod span;

pub use error::*;
pub use error_code::*;
pub use span::*;

/// Result type for PSDL operations
pub type Result<T> = std::result::Result<T, PsdlError>;
