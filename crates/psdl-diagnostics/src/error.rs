//! PSDL error types

use crate::{ErrorCode, SourceLocation, Span};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// Error - parsing or evaluation cannot proceed
    Error,
    /// Warning - potential issue but can continue
    Warning,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Error => write!(f, "error"),
            DiagnosticSeverity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with location and context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub severity: DiagnosticSeverity,
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Source location
    pub location: Option<SourceLocation>,
    /// Additional context or help
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            code,
            message: message.into(),
            location: None,
            help: None,
        }
    }

    /// Create a new warning diagnostic
    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            code,
            message: message.into(),
            location: None,
            help: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Set help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Check whether this is a warning
    pub fn is_warning(&self) -> bool {
        self.severity == DiagnosticSeverity::Warning
    }

    /// Render the diagnostic for a terminal, colored by severity
    #[cfg(feature = "colored")]
    pub fn render(&self) -> String {
        use colored::Colorize;

        let label = match self.severity {
            DiagnosticSeverity::Error => format!("{}[{}]", self.severity, self.code).red().bold(),
            DiagnosticSeverity::Warning => {
                format!("{}[{}]", self.severity, self.code).yellow().bold()
            }
        };
        let mut out = format!("{}: {}", label, self.message);
        if let Some(loc) = &self.location {
            out.push_str(&format!(" {} {}", "-->".cyan(), loc));
        }
        if let Some(help) = &self.help {
            out.push_str(&format!("\n  {} {}", "help:".green(), help));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.severity, self.code, self.message)?;
        if let Some(loc) = &self.location {
            write!(f, " at {}", loc)?;
        }
        Ok(())
    }
}

/// Main PSDL error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PsdlError {
    /// Syntax error in the document or in an expression
    #[error("{code}: {message}")]
    Parse {
        code: ErrorCode,
        message: String,
        /// The offending fragment of source text
        fragment: String,
        location: Option<SourceLocation>,
    },

    /// Semantic error (resolution, cycles, state machine consistency)
    #[error("{code}: {message}")]
    Semantic {
        code: ErrorCode,
        message: String,
        context: Option<String>,
    },

    /// Evaluation error
    #[error("{code}: {message}")]
    Evaluation {
        code: ErrorCode,
        message: String,
        context: Option<String>,
    },

    /// System error
    #[error("{code}: {message}")]
    System {
        code: ErrorCode,
        message: String,
        context: Option<String>,
    },

    /// Multiple errors collected
    #[error("{} errors: {}", .0.len(), join_messages(.0))]
    Multiple(Vec<PsdlError>),
}

fn join_messages(errors: &[PsdlError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl PsdlError {
    /// Create a parse error
    pub fn parse(code: ErrorCode, message: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self::Parse {
            code,
            message: message.into(),
            fragment: fragment.into(),
            location: None,
        }
    }

    /// Create a parse error pointing at a span of `source`
    pub fn parse_at(code: ErrorCode, message: impl Into<String>, source: &str, span: Span) -> Self {
        Self::Parse {
            code,
            message: message.into(),
            fragment: source.to_string(),
            location: Some(SourceLocation::from_span(span, source)),
        }
    }

    /// Create a semantic error
    pub fn semantic(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Semantic {
            code,
            message: message.into(),
            context: None,
        }
    }

    /// Create an evaluation error
    pub fn evaluation(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Evaluation {
            code,
            message: message.into(),
            context: None,
        }
    }

    /// Create a system error
    pub fn system(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::System {
            code,
            message: message.into(),
            context: None,
        }
    }

    /// Attach context to an error
    ///
    /// Parse errors keep their fragment, so the context is prefixed to the
    /// message instead. Collected errors are left alone.
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        match &mut self {
            Self::Semantic { context, .. }
            | Self::Evaluation { context, .. }
            | Self::System { context, .. } => *context = Some(ctx.into()),
            Self::Parse { message, .. } => *message = format!("{}: {}", ctx.into(), message),
            Self::Multiple(_) => {}
        }
        self
    }

    /// Collapse a list of errors: none is `Ok`, one is returned as-is, more become `Multiple`
    pub fn from_errors(mut errors: Vec<PsdlError>) -> std::result::Result<(), PsdlError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Multiple(errors)),
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Parse { code, .. } => *code,
            Self::Semantic { code, .. } => *code,
            Self::Evaluation { code, .. } => *code,
            Self::System { code, .. } => *code,
            Self::Multiple(errors) => errors.first().map(|e| e.code()).unwrap_or(ErrorCode::new(0)),
        }
    }

    /// Flatten into the individual errors
    pub fn errors(&self) -> Vec<&PsdlError> {
        match self {
            Self::Multiple(errors) => errors.iter().flat_map(|e| e.errors()).collect(),
            other => vec![other],
        }
    }

    /// Check if this error (or every collected error) is a syntax error
    pub fn is_syntax(&self) -> bool {
        self.errors().iter().all(|e| e.code().is_syntax_error())
    }

    /// Check if this error (or every collected error) is a semantic error
    pub fn is_semantic(&self) -> bool {
        self.errors().iter().all(|e| e.code().is_semantic_error())
    }

    /// Convert to diagnostics, one per collected error
    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        self.errors()
            .into_iter()
            .map(|e| match e {
                Self::Parse {
                    code,
                    message,
                    fragment,
                    location,
                } => {
                    let mut diag = Diagnostic::error(*code, message.clone());
                    if let Some(loc) = location {
                        diag = diag.with_location(loc.clone());
                    }
                    if !fragment.is_empty() {
                        diag = diag.with_help(format!("in `{}`", fragment));
                    }
                    diag
                }
                Self::Semantic {
                    code,
                    message,
                    context,
                }
                | Self::Evaluation {
                    code,
                    message,
                    context,
                }
                | Self::System {
                    code,
                    message,
                    context,
                } => {
                    let mut diag = Diagnostic::error(*code, message.clone());
                    if let Some(ctx) = context {
                        diag = diag.with_help(ctx.clone());
                    } else if let Some(help) = code.info().help {
                        diag = diag.with_help(help);
                    }
                    diag
                }
                Self::Multiple(_) => unreachable!("errors() flattens Multiple"),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PSDL0007, PSDL0100, PSDL0101};

    #[test]
    fn test_context_on_parse_error_prefixes_message() {
        let err = PsdlError::parse(PSDL0007, "Invalid window", "6x").with_context("aki.yaml");
        assert_eq!(err.to_string(), "PSDL0007: aki.yaml: Invalid window");
        assert_eq!(err.code(), PSDL0007);

        let err = PsdlError::semantic(PSDL0101, "Undefined term").with_context("aki.yaml");
        assert!(matches!(err, PsdlError::Semantic { context: Some(ref c), .. } if c == "aki.yaml"));
    }

    #[test]
    fn test_from_errors_collapses() {
        assert!(PsdlError::from_errors(vec![]).is_ok());

        let single = PsdlError::from_errors(vec![PsdlError::semantic(PSDL0100, "a")]);
        assert!(matches!(single, Err(PsdlError::Semantic { .. })));

        let many = PsdlError::from_errors(vec![
            PsdlError::semantic(PSDL0100, "a"),
            PsdlError::semantic(PSDL0101, "b"),
        ])
        .unwrap_err();
        assert_eq!(many.errors().len(), 2);
        assert!(many.is_semantic());
        assert_eq!(many.code(), PSDL0100);
    }

    #[test]
    fn test_multiple_display_lists_every_error() {
        let err = PsdlError::Multiple(vec![
            PsdlError::semantic(PSDL0100, "Trend 't' references unknown signal 'X'"),
            PsdlError::semantic(PSDL0101, "Logic 'l' references unknown term 'y'"),
        ]);
        let text = err.to_string();
        assert!(text.starts_with("2 errors"));
        assert!(text.contains("PSDL0100"));
        assert!(text.contains("unknown term 'y'"));
    }

    #[test]
    fn test_parse_at_locates_fragment() {
        let err = PsdlError::parse_at(PSDL0007, "Invalid window", "delta(Cr, 6x)", Span::new(10, 12));
        let diags = err.to_diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].location.as_ref().map(|l| l.column), Some(11));
        assert!(err.is_syntax());
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::warning(crate::PSDL0106, "Unknown domain 'lab'")
            .with_location(SourceLocation::new(4, 3, 40, 3));

        assert!(diag.is_warning());
        assert!(diag.to_string().contains("PSDL0106"));
        assert!(diag.to_string().contains("4:3"));
    }
}
