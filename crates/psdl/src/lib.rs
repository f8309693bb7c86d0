//! Patient Scenario Definition Language (PSDL) implementation for Rust
//!
//! This crate bundles the PSDL toolchain:
//! - Parsing scenario documents and trend/logic expressions
//! - Semantic validation with collected diagnostics
//! - Temporal operators over patient time series
//! - Point-in-time evaluation with state machine tracking
//!
//! # Example
//!
//! ```ignore
//! use psdl::{parse_scenario, Evaluator, InMemoryDataSource};
//!
//! let scenario = parse_scenario(r#"
//! scenario: AKI
//! version: "1.0"
//! signals:
//!   Cr: creatinine
//! trends:
//!   cr_rise: delta(Cr, 6h) > 0.3
//! logic:
//!   aki: cr_rise
//! "#)?;
//!
//! let evaluator = Evaluator::new(scenario)?;
//! let result = evaluator.evaluate(&source, "patient-1", now, None)?;
//! ```

// Re-export all public APIs from internal crates
pub use psdl_ast as ast;
pub use psdl_diagnostics as diagnostics;
pub use psdl_eval as eval;
pub use psdl_parser as parser;

// Convenience re-exports
pub use psdl_ast::{LogicExpr, Scenario, Signal, TrendExpr};
pub use psdl_diagnostics::{PsdlError, Result};
pub use psdl_eval::{
    DataPoint, DataSource, EvaluationResult, Evaluator, EvaluatorConfig, InMemoryDataSource,
    TrendValue,
};
pub use psdl_parser::{parse_scenario, parse_scenario_file, ScenarioParser};

// CLI module (only available with cli feature)
#[cfg(feature = "cli")]
pub mod cli;
