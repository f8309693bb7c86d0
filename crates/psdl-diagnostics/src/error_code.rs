//! PSDL error codes following a structured numbering system
//!
//! Error code ranges:
//! - PSDL0001-PSDL0099: Syntax errors (document and expression text)
//! - PSDL0100-PSDL0199: Semantic errors (resolution, cycles, state machine)
//! - PSDL0200-PSDL0299: Evaluation errors (runtime)
//! - PSDL0400-PSDL0499: System errors (I/O, configuration)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    /// Create a new error code
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Get the numeric code
    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Get error information for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }

    /// Check if this is a syntax error (0001-0099)
    pub const fn is_syntax_error(&self) -> bool {
        self.0 >= 1 && self.0 < 100
    }

    /// Check if this is a semantic error (0100-0199)
    pub const fn is_semantic_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    /// Check if this is an evaluation error (0200-0299)
    pub const fn is_evaluation_error(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Check if this is a system error (0400-0499)
    pub const fn is_system_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PSDL{:04}", self.0)
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Short description of the error
    pub description: &'static str,
    /// Detailed help text
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Syntax errors (0001-0099)
    map.insert(1, ErrorInfo::new("Unexpected token"));
    map.insert(2, ErrorInfo::new("Unexpected end of input"));
    map.insert(3, ErrorInfo::new("Invalid document"));
    map.insert(4, ErrorInfo::new("Document is not a mapping")
        .with_help("A PSDL document must be a keyed mapping at the top level"));
    map.insert(5, ErrorInfo::new("Missing required field"));
    map.insert(6, ErrorInfo::new("Invalid field type"));
    map.insert(7, ErrorInfo::new("Invalid window specification")
        .with_help("Windows are a positive integer followed by s, m, h or d (e.g. 6h)"));
    map.insert(8, ErrorInfo::new("Invalid trend expression"));
    map.insert(9, ErrorInfo::new("Invalid logic expression"));
    map.insert(10, ErrorInfo::new("Invalid number format"));
    map.insert(11, ErrorInfo::new("Invalid signal specification"));
    map.insert(12, ErrorInfo::new("Invalid trend specification"));
    map.insert(13, ErrorInfo::new("Invalid logic specification"));
    map.insert(14, ErrorInfo::new("Invalid audit block")
        .with_help("An audit block requires intent, rationale and provenance"));
    map.insert(15, ErrorInfo::new("Invalid state machine definition"));
    map.insert(16, ErrorInfo::new("Invalid population filter"));
    map.insert(20, ErrorInfo::new("Invalid operator usage"));

    // Semantic errors (0100-0199)
    map.insert(100, ErrorInfo::new("Undefined signal")
        .with_help("Declare the signal under 'signals' before referencing it in a trend"));
    map.insert(101, ErrorInfo::new("Undefined term")
        .with_help("Logic terms must name a trend or another logic rule"));
    map.insert(102, ErrorInfo::new("Undefined logic rule"));
    map.insert(103, ErrorInfo::new("Undefined state"));
    map.insert(104, ErrorInfo::new("Duplicate definition"));
    map.insert(105, ErrorInfo::new("Circular reference"));
    map.insert(106, ErrorInfo::new("Unknown domain"));
    map.insert(107, ErrorInfo::new("Unknown severity"));
    map.insert(108, ErrorInfo::new("Numeric trend used as logic term"));
    map.insert(109, ErrorInfo::new("Empty state set"));

    // Evaluation errors (0200-0299)
    map.insert(200, ErrorInfo::new("Evaluation failed"));
    map.insert(201, ErrorInfo::new("Unsupported operator"));
    map.insert(202, ErrorInfo::new("Undefined trend"));
    map.insert(203, ErrorInfo::new("Undefined logic rule"));
    map.insert(204, ErrorInfo::new("Unknown state"));
    map.insert(205, ErrorInfo::new("Data source failure"));
    map.insert(206, ErrorInfo::new("State store failure"));

    // System errors (0400-0499)
    map.insert(400, ErrorInfo::new("Internal error"));
    map.insert(401, ErrorInfo::new("I/O error"));
    map.insert(402, ErrorInfo::new("Configuration error"));
    map.insert(406, ErrorInfo::new("Invalid format"));

    map
});

// Syntax errors
pub const PSDL0001: ErrorCode = ErrorCode::new(1);
pub const PSDL0002: ErrorCode = ErrorCode::new(2);
pub const PSDL0003: ErrorCode = ErrorCode::new(3);
pub const PSDL0004: ErrorCode = ErrorCode::new(4);
pub const PSDL0005: ErrorCode = ErrorCode::new(5);
pub const PSDL0006: ErrorCode = ErrorCode::new(6);
pub const PSDL0007: ErrorCode = ErrorCode::new(7);
pub const PSDL0008: ErrorCode = ErrorCode::new(8);
pub const PSDL0009: ErrorCode = ErrorCode::new(9);
pub const PSDL0010: ErrorCode = ErrorCode::new(10);
pub const PSDL0011: ErrorCode = ErrorCode::new(11);
pub const PSDL0012: ErrorCode = ErrorCode::new(12);
pub const PSDL0013: ErrorCode = ErrorCode::new(13);
pub const PSDL0014: ErrorCode = ErrorCode::new(14);
pub const PSDL0015: ErrorCode = ErrorCode::new(15);
pub const PSDL0016: ErrorCode = ErrorCode::new(16);
pub const PSDL0020: ErrorCode = ErrorCode::new(20);

// Semantic errors
pub const PSDL0100: ErrorCode = ErrorCode::new(100);
pub const PSDL0101: ErrorCode = ErrorCode::new(101);
pub const PSDL0102: ErrorCode = ErrorCode::new(102);
pub const PSDL0103: ErrorCode = ErrorCode::new(103);
pub const PSDL0104: ErrorCode = ErrorCode::new(104);
pub const PSDL0105: ErrorCode = ErrorCode::new(105);
pub const PSDL0106: ErrorCode = ErrorCode::new(106);
pub const PSDL0107: ErrorCode = ErrorCode::new(107);
pub const PSDL0108: ErrorCode = ErrorCode::new(108);
pub const PSDL0109: ErrorCode = ErrorCode::new(109);

// Evaluation errors
pub const PSDL0200: ErrorCode = ErrorCode::new(200);
pub const PSDL0201: ErrorCode = ErrorCode::new(201);
pub const PSDL0202: ErrorCode = ErrorCode::new(202);
pub const PSDL0203: ErrorCode = ErrorCode::new(203);
pub const PSDL0204: ErrorCode = ErrorCode::new(204);
pub const PSDL0205: ErrorCode = ErrorCode::new(205);
pub const PSDL0206: ErrorCode = ErrorCode::new(206);

// System errors
pub const PSDL0400: ErrorCode = ErrorCode::new(400);
pub const PSDL0401: ErrorCode = ErrorCode::new(401);
pub const PSDL0402: ErrorCode = ErrorCode::new(402);
pub const PSDL0406: ErrorCode = ErrorCode::new(406);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(PSDL0001.to_string(), "PSDL0001");
        assert_eq!(PSDL0105.to_string(), "PSDL0105");
    }

    #[test]
    fn test_error_categories() {
        assert!(PSDL0007.is_syntax_error());
        assert!(!PSDL0007.is_semantic_error());

        assert!(PSDL0100.is_semantic_error());
        assert!(!PSDL0100.is_syntax_error());

        assert!(PSDL0201.is_evaluation_error());
        assert!(PSDL0401.is_system_error());
    }

    #[test]
    fn test_error_info() {
        assert_eq!(PSDL0007.info().description, "Invalid window specification");
        assert!(PSDL0014.info().help.is_some());
        assert_eq!(ErrorCode::new(999).info().description, "Unknown error");
    }
}
