//! Trend expressions: a temporal operator applied to a signal over a window

use crate::WindowSpec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of temporal operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporalOp {
    /// Last-in-window minus first-in-window
    Delta,
    /// Least-squares slope (units per second)
    Slope,
    /// Exponential moving average
    Ema,
    /// Simple moving average
    Sma,
    /// Minimum in window
    Min,
    /// Maximum in window
    Max,
    /// Number of observations in window
    Count,
    /// Most recent value
    Last,
    /// First value in window
    First,
    /// Sample standard deviation
    Std,
    /// Linear-interpolated percentile
    Percentile,
}

impl TemporalOp {
    /// Every operator, in declaration order
    pub const ALL: [TemporalOp; 11] = [
        Self::Delta,
        Self::Slope,
        Self::Ema,
        Self::Sma,
        Self::Min,
        Self::Max,
        Self::Count,
        Self::Last,
        Self::First,
        Self::Std,
        Self::Percentile,
    ];

    /// Look up an operator by its source keyword; `stddev` is an alias of `std`
    pub fn from_name(name: &str) -> Option<Self> {
        let op = match name {
            "delta" => Self::Delta,
            "slope" => Self::Slope,
            "ema" => Self::Ema,
            "sma" => Self::Sma,
            "min" => Self::Min,
            "max" => Self::Max,
            "count" => Self::Count,
            "last" => Self::Last,
            "first" => Self::First,
            "std" | "stddev" => Self::Std,
            "percentile" => Self::Percentile,
            _ => return None,
        };
        Some(op)
    }

    /// Canonical source keyword
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Delta => "delta",
            Self::Slope => "slope",
            Self::Ema => "ema",
            Self::Sma => "sma",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
            Self::Last => "last",
            Self::First => "first",
            Self::Std => "std",
            Self::Percentile => "percentile",
        }
    }

    /// Every operator except `last` needs a window
    pub const fn requires_window(&self) -> bool {
        !matches!(self, Self::Last)
    }

    /// Only `percentile` takes the extra percentile argument
    pub const fn takes_percentile(&self) -> bool {
        matches!(self, Self::Percentile)
    }
}

impl fmt::Display for TemporalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Comparison operators usable in a trend threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `<=`
    LessOrEqual,
    /// `>=`
    GreaterOrEqual,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
}

impl Comparator {
    /// Look up a comparator by its symbol
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "<" => Some(Self::Less),
            ">" => Some(Self::Greater),
            "<=" => Some(Self::LessOrEqual),
            ">=" => Some(Self::GreaterOrEqual),
            "==" => Some(Self::Equal),
            "!=" => Some(Self::NotEqual),
            _ => None,
        }
    }

    /// Source symbol
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessOrEqual => "<=",
            Self::GreaterOrEqual => ">=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
        }
    }

    /// Apply the comparison `lhs <op> rhs`
    pub fn compare(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Less => lhs < rhs,
            Self::Greater => lhs > rhs,
            Self::LessOrEqual => lhs <= rhs,
            Self::GreaterOrEqual => lhs >= rhs,
            Self::Equal => lhs == rhs,
            Self::NotEqual => lhs != rhs,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Comparator and threshold that turn a numeric trend into a boolean one
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub comparator: Comparator,
    pub value: f64,
}

impl Threshold {
    pub const fn new(comparator: Comparator, value: f64) -> Self {
        Self { comparator, value }
    }

    /// Test a computed trend value against the threshold
    pub fn test(&self, value: f64) -> bool {
        self.comparator.compare(value, self.value)
    }
}

/// A named trend: `op(signal[, window][, p]) [cmp threshold]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendExpr {
    /// Trend name (key in the scenario's `trends` section)
    pub name: String,
    /// Temporal operator
    pub operator: TemporalOp,
    /// Referenced signal name
    pub signal: String,
    /// Trailing window; absent only for `last`
    pub window: Option<WindowSpec>,
    /// Percentile argument (0-100), present only for `percentile`
    pub percentile: Option<f64>,
    /// Present iff this is a boolean trend
    pub threshold: Option<Threshold>,
    /// Free-text description
    pub description: Option<String>,
}

impl TrendExpr {
    /// Create a bare numeric trend
    pub fn new(
        name: impl Into<String>,
        operator: TemporalOp,
        signal: impl Into<String>,
        window: Option<WindowSpec>,
    ) -> Self {
        Self {
            name: name.into(),
            operator,
            signal: signal.into(),
            window,
            percentile: None,
            threshold: None,
            description: None,
        }
    }

    /// Attach a comparator and threshold
    pub fn with_threshold(mut self, comparator: Comparator, value: f64) -> Self {
        self.threshold = Some(Threshold::new(comparator, value));
        self
    }

    /// Attach a percentile argument
    pub fn with_percentile(mut self, p: f64) -> Self {
        self.percentile = Some(p);
        self
    }

    /// Whether this trend yields a boolean (has a threshold)
    pub fn is_boolean(&self) -> bool {
        self.threshold.is_some()
    }

    /// Window length in seconds, if windowed
    pub fn window_seconds(&self) -> Option<i64> {
        self.window.map(|w| w.total_seconds())
    }
}

/// Canonical source form, e.g. `delta(Cr, 6h) > 0.3`
impl fmt::Display for TrendExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.operator, self.signal)?;
        if let Some(window) = &self.window {
            write!(f, ", {}", window)?;
        }
        if let Some(p) = self.percentile {
            write!(f, ", {}", p)?;
        }
        f.write_str(")")?;
        if let Some(threshold) = &self.threshold {
            write!(f, " {} {}", threshold.comparator, threshold.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_names_round_trip() {
        for op in TemporalOp::ALL {
            assert_eq!(TemporalOp::from_name(op.name()), Some(op));
        }
        assert_eq!(TemporalOp::from_name("stddev"), Some(TemporalOp::Std));
        assert_eq!(TemporalOp::from_name("median"), None);
    }

    #[test]
    fn test_only_last_is_windowless() {
        let windowless: Vec<_> = TemporalOp::ALL
            .iter()
            .filter(|op| !op.requires_window())
            .collect();
        assert_eq!(windowless, vec![&TemporalOp::Last]);
    }

    #[test]
    fn test_comparator_semantics() {
        assert!(Comparator::Greater.compare(0.8, 0.3));
        assert!(!Comparator::Greater.compare(0.3, 0.3));
        assert!(Comparator::GreaterOrEqual.compare(0.3, 0.3));
        assert!(Comparator::NotEqual.compare(1.0, 2.0));
        assert_eq!(Comparator::from_symbol("=<"), None);
    }

    #[test]
    fn test_trend_display() {
        let trend = TrendExpr::new("cr_rise", TemporalOp::Delta, "Cr", Some(WindowSpec::hours(6)))
            .with_threshold(Comparator::Greater, 0.3);
        assert_eq!(trend.to_string(), "delta(Cr, 6h) > 0.3");

        let p90 = TrendExpr::new("p90", TemporalOp::Percentile, "HR", Some(WindowSpec::hours(1)))
            .with_percentile(90.0);
        assert_eq!(p90.to_string(), "percentile(HR, 1h, 90)");

        let last = TrendExpr::new("lac", TemporalOp::Last, "Lact", None)
            .with_threshold(Comparator::GreaterOrEqual, 4.0);
        assert_eq!(last.to_string(), "last(Lact) >= 4");
    }
}
