//! Operator table for the PSDL evaluation engine
//!
//! Maps each [`TemporalOp`] to its implementation. The standard table is
//! built by an exhaustive match, so adding an operator to the IR without an
//! implementation fails to compile. Individual entries can be replaced, for
//! example to mirror the semantics of a downstream execution target.

use crate::error::{EvalError, EvalResult};
use crate::operators::{self, DataPoint};
use chrono::{DateTime, Utc};
use psdl_ast::TemporalOp;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Arguments passed to every operator implementation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatorArgs {
    /// Window length; `None` only for window-less `last`
    pub window_seconds: Option<i64>,
    pub reference_time: DateTime<Utc>,
    /// Percentile argument for `percentile`
    pub percentile: Option<f64>,
}

/// Type alias for operator implementations
pub type OperatorFn = Arc<dyn Fn(&[DataPoint], &OperatorArgs) -> Option<f64> + Send + Sync>;

/// Operator tag to implementation
#[derive(Clone)]
pub struct OperatorTable {
    operators: HashMap<TemporalOp, OperatorFn>,
}

impl Default for OperatorTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for OperatorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ops: Vec<_> = self.operators.keys().collect();
        ops.sort();
        f.debug_struct("OperatorTable").field("operators", &ops).finish()
    }
}

impl OperatorTable {
    /// Create a table with no operators
    pub fn empty() -> Self {
        Self {
            operators: HashMap::new(),
        }
    }

    /// Create a table with the standard implementation of every operator
    pub fn standard() -> Self {
        let operators = TemporalOp::ALL
            .into_iter()
            .map(|op| (op, standard_operator(op)))
            .collect();
        Self { operators }
    }

    /// Replace or add an implementation
    pub fn with_operator(
        mut self,
        op: TemporalOp,
        implementation: impl Fn(&[DataPoint], &OperatorArgs) -> Option<f64> + Send + Sync + 'static,
    ) -> Self {
        self.operators.insert(op, Arc::new(implementation));
        self
    }

    /// Remove an implementation
    pub fn without_operator(mut self, op: TemporalOp) -> Self {
        self.operators.remove(&op);
        self
    }

    pub fn contains(&self, op: TemporalOp) -> bool {
        self.operators.contains_key(&op)
    }

    pub fn get(&self, op: TemporalOp) -> Option<&OperatorFn> {
        self.operators.get(&op)
    }

    /// Apply `op` to `points`
    pub fn apply(&self, op: TemporalOp, points: &[DataPoint], args: &OperatorArgs) -> EvalResult<Option<f64>> {
        let implementation = self
            .get(op)
            .ok_or_else(|| EvalError::unsupported_operator(op.name()))?;
        Ok(implementation(points, args))
    }
}

fn standard_operator(op: TemporalOp) -> OperatorFn {
    match op {
        TemporalOp::Last => Arc::new(|points: &[DataPoint], args: &OperatorArgs| match args.window_seconds {
            Some(w) => operators::filter_by_window(points, w, args.reference_time)
                .last()
                .map(|p| p.value),
            None => operators::last(points),
        }),
        TemporalOp::First => windowed(operators::first),
        TemporalOp::Delta => windowed(operators::delta),
        TemporalOp::Slope => windowed(operators::slope),
        TemporalOp::Sma => windowed(operators::sma),
        TemporalOp::Ema => windowed(operators::ema),
        TemporalOp::Min => windowed(operators::min),
        TemporalOp::Max => windowed(operators::max),
        TemporalOp::Std => windowed(operators::std),
        TemporalOp::Count => windowed(|points, w, t| Some(operators::count(points, w, t))),
        TemporalOp::Percentile => Arc::new(|points: &[DataPoint], args: &OperatorArgs| {
            let (w, p) = (args.window_seconds?, args.percentile?);
            operators::percentile(points, w, args.reference_time, p)
        }),
    }
}

fn windowed(
    f: impl Fn(&[DataPoint], i64, DateTime<Utc>) -> Option<f64> + Send + Sync + 'static,
) -> OperatorFn {
    Arc::new(move |points: &[DataPoint], args: &OperatorArgs| f(points, args.window_seconds?, args.reference_time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn args(window_seconds: Option<i64>) -> OperatorArgs {
        OperatorArgs {
            window_seconds,
            reference_time: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            percentile: None,
        }
    }

    fn points() -> Vec<DataPoint> {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        vec![
            DataPoint::new(t - chrono::TimeDelta::hours(10), 1.0),
            DataPoint::new(t - chrono::TimeDelta::hours(1), 2.0),
            DataPoint::new(t, 3.0),
        ]
    }

    #[test]
    fn test_standard_table_is_complete() {
        let table = OperatorTable::standard();
        for op in TemporalOp::ALL {
            assert!(table.contains(op), "missing {op}");
        }
    }

    #[test]
    fn test_last_with_and_without_window() {
        let table = OperatorTable::standard();
        let data = points();
        assert_eq!(table.apply(TemporalOp::Last, &data, &args(None)).unwrap(), Some(3.0));
        assert_eq!(table.apply(TemporalOp::Count, &data, &args(Some(7200))).unwrap(), Some(2.0));
        assert_eq!(table.apply(TemporalOp::First, &data, &args(Some(7200))).unwrap(), Some(2.0));
    }

    #[test]
    fn test_windowed_operator_without_window_is_no_value() {
        let table = OperatorTable::standard();
        assert_eq!(table.apply(TemporalOp::Delta, &points(), &args(None)).unwrap(), None);
    }

    #[test]
    fn test_override_and_removal() {
        let table = OperatorTable::standard()
            .with_operator(TemporalOp::Count, |points, _| Some(points.len() as f64 * 10.0))
            .without_operator(TemporalOp::Slope);

        assert_eq!(table.apply(TemporalOp::Count, &points(), &args(Some(60))).unwrap(), Some(30.0));
        assert_eq!(
            table.apply(TemporalOp::Slope, &points(), &args(Some(60))),
            Err(EvalError::unsupported_operator("slope"))
        );
    }
}
