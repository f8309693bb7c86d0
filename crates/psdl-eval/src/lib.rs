//! PSDL Evaluation Engine
//!
//! This crate turns a parsed PSDL [`Scenario`](psdl_ast::Scenario) and raw
//! patient time series into trigger decisions:
//!
//! - **Temporal operators**: `last`, `first`, `delta`, `slope`, `sma`, `ema`,
//!   `min`, `max`, `count`, `std` and `percentile` over a trailing window
//! - **Operator table**: an explicit tag-to-implementation table owned by
//!   each evaluator
//! - **Evaluation**: trends, logic rules in dependency order, and state
//!   machine transitions
//! - **Data access**: blocking and async data source traits plus an
//!   in-memory implementation
//! - **State persistence**: an optional per-patient state store
//!
//! # Example
//!
//! ```ignore
//! use psdl_eval::{Evaluator, InMemoryDataSource};
//!
//! let evaluator = Evaluator::new(scenario)?;
//! let result = evaluator.evaluate(&source, "patient-1", reference_time, None)?;
//! if result.is_triggered {
//!     println!("{:?}", result.triggered_logic);
//! }
//! ```
//!
//! # Three-Valued Logic
//!
//! A trend with no value makes every logic term that reads it unknown:
//!
//! - `AND`: false dominates (unknown and false = false)
//! - `OR`: true dominates (unknown or true = true)
//! - `NOT`: unknown stays unknown
//!
//! A rule triggers only when its formula is definitely true.

pub mod config;
pub mod engine;
pub mod error;
pub mod operators;
pub mod registry;
pub mod result;
pub mod source;
pub mod state;
pub mod value;

pub use config::{EvaluatorConfig, EvaluatorConfigBuilder};
pub use engine::Evaluator;
pub use error::{EvalError, EvalResult};
pub use operators::DataPoint;
pub use registry::{OperatorArgs, OperatorFn, OperatorTable};
pub use result::{DataIssue, EvaluationResult, StateChange};
pub use source::{AsyncDataSource, DataSource, DataSourceError, InMemoryDataSource};
pub use state::{InMemoryStateStore, StateStore};
pub use value::TrendValue;
