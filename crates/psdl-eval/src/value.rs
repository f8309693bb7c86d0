//! Computed trend values

use serde::{Deserialize, Serialize};
use std::fmt;

/// The outcome of computing one trend
///
/// `Unavailable` is a first-class outcome: not enough in-window data, or a
/// failed fetch. It is distinct from a numeric zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TrendValue {
    /// A bare numeric trend
    Numeric { value: f64 },
    /// A thresholded trend: the operator output and the comparison outcome
    Boolean { value: f64, result: bool },
    /// No value could be computed
    Unavailable,
}

impl TrendValue {
    pub fn numeric(value: f64) -> Self {
        Self::Numeric { value }
    }

    pub fn boolean(value: f64, result: bool) -> Self {
        Self::Boolean { value, result }
    }

    /// Truth value when used as a logic term
    ///
    /// Only boolean trends carry a truth value; numeric and unavailable
    /// trends are unknown.
    pub fn truth(&self) -> Option<bool> {
        match self {
            Self::Boolean { result, .. } => Some(*result),
            Self::Numeric { .. } | Self::Unavailable => None,
        }
    }

    /// The operator output, thresholded or not
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric { value } | Self::Boolean { value, .. } => Some(*value),
            Self::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }
}

impl fmt::Display for TrendValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric { value } => write!(f, "{}", value),
            Self::Boolean { value, result } => write!(f, "{} ({})", result, value),
            Self::Unavailable => f.write_str("no value"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_booleans_have_truth() {
        assert_eq!(TrendValue::boolean(0.8, true).truth(), Some(true));
        assert_eq!(TrendValue::numeric(1.0).truth(), None);
        assert_eq!(TrendValue::Unavailable.truth(), None);
        assert!(!TrendValue::Unavailable.is_available());
    }

    #[test]
    fn test_thresholded_value_keeps_number() {
        let value = TrendValue::boolean(0.8, true);
        assert_eq!(value.as_f64(), Some(0.8));
        assert_eq!(value.to_string(), "true (0.8)");
        assert_eq!(TrendValue::Unavailable.as_f64(), None);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(TrendValue::numeric(0.8)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "numeric", "value": 0.8}));
        let json = serde_json::to_value(TrendValue::boolean(0.8, true)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "boolean", "value": 0.8, "result": true}));
        let json = serde_json::to_value(TrendValue::Unavailable).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "unavailable"}));
    }
}
