//! CLI functionality for the PSDL tool
//!
//! This module contains all CLI-related functionality including:
//! - Validation
//! - IR inspection
//! - Evaluation against a JSON data fixture
//! - Document emission
//! - Output formatting

pub mod emit;
pub mod evaluate;
pub mod inspect;
pub mod output;
pub mod validate;
