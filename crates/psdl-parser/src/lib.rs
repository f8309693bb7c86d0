//! PSDL parser using Winnow
//!
//! This crate turns PSDL scenario documents into the validated IR defined in
//! `psdl-ast`. Formula fields are parsed with a small winnow grammar: trend
//! expressions are operator applications with an optional comparison, and
//! logic expressions are built into a precedence-correct boolean tree.

mod combinators;
mod emit;
mod expression;
mod scenario;
mod validate;

pub use emit::{to_document, to_yaml_string};
pub use expression::{parse_logic_expression, parse_trend_expression, parse_window};
pub use scenario::{
    parse_scenario, parse_scenario_file, parse_source, ParseMode, ParsedScenario, ScenarioParser,
};
pub use validate::{validate_scenario, ValidationReport};
