//! Evaluation errors for the PSDL engine

use psdl_diagnostics::{
    PsdlError, PSDL0100, PSDL0105, PSDL0200, PSDL0201, PSDL0202, PSDL0203, PSDL0204, PSDL0205,
    PSDL0206,
};
use thiserror::Error;

/// Result type for evaluation operations
pub type EvalResult<T> = Result<T, EvalError>;

/// Hard failures of an evaluation request
///
/// Missing clinical data is never an `EvalError`; it surfaces as an
/// unavailable trend value instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    /// The operator table has no implementation for an operator
    #[error("Unsupported temporal operator: {operator}")]
    UnsupportedOperator { operator: String },

    /// A trend cannot be computed as declared
    #[error("Invalid trend '{name}': {message}")]
    InvalidTrend { name: String, message: String },

    /// A trend references a signal the scenario does not declare
    #[error("Trend '{trend}' references undefined signal '{signal}'")]
    UndefinedSignal { trend: String, signal: String },

    /// A logic term names neither a trend nor a logic rule
    #[error("Undefined term '{term}' in logic '{rule}'")]
    UndefinedTerm { rule: String, term: String },

    /// A transition guard does not name a logic rule
    #[error("Undefined logic rule: {name}")]
    UndefinedLogic { name: String },

    /// Logic rules reference each other in a cycle
    #[error("Circular logic reference: {path}")]
    CircularLogic { path: String },

    /// The caller supplied a state the state machine does not declare
    #[error("Unknown state '{state}' for scenario '{scenario}'")]
    UnknownState { scenario: String, state: String },

    /// A data fetch failed while strict data handling is enabled
    #[error("Data source failure for signal '{signal}': {message}")]
    DataSource { signal: String, message: String },

    /// The data source could not list the patients of a population
    #[error("Population listing failed: {message}")]
    PopulationListing { message: String },

    /// The state store could not load or save
    #[error("State store failure: {message}")]
    StateStore { message: String },
}

impl EvalError {
    /// Create an unsupported operator error
    pub fn unsupported_operator(operator: impl Into<String>) -> Self {
        Self::UnsupportedOperator {
            operator: operator.into(),
        }
    }

    /// Create an invalid trend error
    pub fn invalid_trend(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTrend {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an undefined logic error
    pub fn undefined_logic(name: impl Into<String>) -> Self {
        Self::UndefinedLogic { name: name.into() }
    }

    /// Create a data source error
    pub fn data_source(signal: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataSource {
            signal: signal.into(),
            message: message.into(),
        }
    }

    /// Create a state store error
    pub fn state_store(message: impl Into<String>) -> Self {
        Self::StateStore {
            message: message.into(),
        }
    }
}

impl From<EvalError> for PsdlError {
    fn from(err: EvalError) -> Self {
        let code = match &err {
            EvalError::UnsupportedOperator { .. } => PSDL0201,
            EvalError::InvalidTrend { .. } => PSDL0200,
            EvalError::UndefinedSignal { .. } => PSDL0100,
            EvalError::UndefinedTerm { .. } => PSDL0202,
            EvalError::UndefinedLogic { .. } => PSDL0203,
            EvalError::CircularLogic { .. } => PSDL0105,
            EvalError::UnknownState { .. } => PSDL0204,
            EvalError::DataSource { .. } | EvalError::PopulationListing { .. } => PSDL0205,
            EvalError::StateStore { .. } => PSDL0206,
        };
        PsdlError::evaluation(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_keeps_message_and_code() {
        let err: PsdlError = EvalError::UnknownState {
            scenario: "AKI".into(),
            state: "limbo".into(),
        }
        .into();
        assert_eq!(err.code(), PSDL0204);
        assert!(err.to_string().contains("Unknown state 'limbo'"));
    }
}
