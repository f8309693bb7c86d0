//! Scenario document decoding
//!
//! The document is decoded into a generic YAML value first and then walked
//! section by section, so every structural problem can be reported with the
//! field that caused it.

use crate::expression::{parse_logic_expression, parse_trend_expression};
use crate::validate::validate_scenario;
use psdl_ast::{
    AuditBlock, Domain, LogicExpr, PopulationFilter, Scenario, Severity, Signal, StateMachine,
    StateTransition, TrendExpr,
};
use psdl_diagnostics::{
    Diagnostic, ErrorCode, PsdlError, Result, SourceLocation, PSDL0003, PSDL0004, PSDL0005,
    PSDL0006, PSDL0011, PSDL0012, PSDL0013, PSDL0014, PSDL0015, PSDL0016, PSDL0106, PSDL0107,
    PSDL0401,
};
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// How non-fatal findings are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Warnings are returned next to the scenario
    #[default]
    Lenient,
    /// Warnings are promoted to semantic errors
    Strict,
}

/// A parsed scenario together with the warnings found while parsing it
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedScenario {
    pub scenario: Scenario,
    pub warnings: Vec<Diagnostic>,
}

impl ParsedScenario {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn into_scenario(self) -> Scenario {
        self.scenario
    }
}

/// Parser for PSDL scenario documents
#[derive(Debug, Clone, Default)]
pub struct ScenarioParser {
    mode: ParseMode,
}

impl ScenarioParser {
    /// Create a lenient parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser that rejects documents with warnings
    pub fn strict() -> Self {
        Self::with_mode(ParseMode::Strict)
    }

    pub fn with_mode(mode: ParseMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    /// Parse a scenario from a file
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<ParsedScenario> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PsdlError::system(PSDL0401, format!("Cannot read {}: {}", path.display(), e))
        })?;
        log::debug!("Parsing scenario file {}", path.display());
        self.parse_str(&content).map_err(|e| match e {
            PsdlError::Multiple(_) => e,
            other => other.with_context(path.display().to_string()),
        })
    }

    /// Parse a scenario from document text
    ///
    /// Malformed syntax fails on the first error. Semantic violations are
    /// all collected and returned together.
    pub fn parse_str(&self, content: &str) -> Result<ParsedScenario> {
        let root: Value = serde_yaml::from_str(content).map_err(yaml_error)?;
        let Value::Mapping(root) = root else {
            return Err(PsdlError::parse(
                PSDL0004,
                "PSDL document must be a mapping at the top level",
                "",
            ));
        };

        let mut reader = DocumentReader::default();
        let scenario = reader.scenario(&root)?;

        let report = validate_scenario(&scenario);
        let mut errors = report.errors;
        let mut warnings = reader.warnings;
        warnings.extend(report.warnings);

        if self.mode == ParseMode::Strict {
            errors.extend(
                warnings
                    .drain(..)
                    .map(|w| PsdlError::semantic(w.code, w.message)),
            );
        }
        PsdlError::from_errors(errors)?;

        for warning in &warnings {
            log::warn!("{}", warning);
        }
        log::debug!(
            "Parsed scenario '{}' v{}: {} signals, {} trends, {} logic rules",
            scenario.name,
            scenario.version,
            scenario.signals.len(),
            scenario.trends.len(),
            scenario.logic.len()
        );

        Ok(ParsedScenario { scenario, warnings })
    }
}

/// Parse a scenario from document text with the default parser
pub fn parse_scenario(content: &str) -> Result<Scenario> {
    ScenarioParser::new().parse_str(content).map(ParsedScenario::into_scenario)
}

/// Parse a scenario file with the default parser
pub fn parse_scenario_file(path: impl AsRef<Path>) -> Result<Scenario> {
    ScenarioParser::new().parse_file(path).map(ParsedScenario::into_scenario)
}

/// Treat `source` as a path when it ends in `.yaml` or `.yml`, otherwise as document text
pub fn parse_source(source: &str) -> Result<Scenario> {
    if source.ends_with(".yaml") || source.ends_with(".yml") {
        parse_scenario_file(source)
    } else {
        parse_scenario(source)
    }
}

fn yaml_error(e: serde_yaml::Error) -> PsdlError {
    let location = e
        .location()
        .map(|loc| SourceLocation::point(loc.line(), loc.column(), loc.index()));
    PsdlError::Parse {
        code: PSDL0003,
        message: format!("Invalid YAML: {}", e),
        fragment: String::new(),
        location,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn missing(field: &str) -> PsdlError {
    PsdlError::parse(PSDL0005, format!("Missing required field: '{}'", field), field)
}

fn wrong_type(field: &str, expected: &str, value: &Value) -> PsdlError {
    PsdlError::parse(
        PSDL0006,
        format!("Field '{}' must be a {}, got {}", field, expected, type_name(value)),
        field,
    )
}

/// Prefix an expression error with the entry it came from
fn in_entry(mut err: PsdlError, kind: &str, name: &str) -> PsdlError {
    if let PsdlError::Parse { message, .. } = &mut err {
        *message = format!("{} '{}': {}", kind, name, message);
    }
    err
}

fn require<'v>(map: &'v Mapping, field: &str) -> Result<&'v Value> {
    match map.get(field) {
        Some(value) if !value.is_null() => Ok(value),
        _ => Err(missing(field)),
    }
}

fn require_str(map: &Mapping, field: &str) -> Result<String> {
    let value = require(map, field)?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| wrong_type(field, "string", value))
}

fn require_mapping<'v>(map: &'v Mapping, field: &str) -> Result<&'v Mapping> {
    let value = require(map, field)?;
    value
        .as_mapping()
        .ok_or_else(|| wrong_type(field, "mapping", value))
}

fn optional_str(map: &Mapping, field: &str) -> Result<Option<String>> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(wrong_type(field, "string", other)),
    }
}

/// A non-empty string field of a nested entry, or `None`
fn nonempty_str<'v>(map: &'v Mapping, field: &str) -> Option<&'v str> {
    map.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn string_list(map: &Mapping, field: &str, code: ErrorCode, section: &str) -> Result<Vec<String>> {
    let Some(value) = map.get(field).filter(|v| !v.is_null()) else {
        return Ok(Vec::new());
    };
    let Some(items) = value.as_sequence() else {
        return Err(PsdlError::parse(
            code,
            format!("'{}.{}' must be a list, got {}", section, field, type_name(value)),
            field,
        ));
    };
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                PsdlError::parse(
                    code,
                    format!("'{}.{}' entries must be strings, got {}", section, field, type_name(item)),
                    field,
                )
            })
        })
        .collect()
}

/// Iterate `(name, entry)` pairs of a named-entry section
fn entries<'v>(
    section: &'v Mapping,
    code: ErrorCode,
    kind: &'static str,
) -> impl Iterator<Item = Result<(&'v str, &'v Value)>> + 'v {
    section.iter().map(move |(key, value)| {
        key.as_str().map(|name| (name, value)).ok_or_else(|| {
            PsdlError::parse(
                code,
                format!("{} names must be strings, got {}", kind, type_name(key)),
                "",
            )
        })
    })
}

#[derive(Default)]
struct DocumentReader {
    warnings: Vec<Diagnostic>,
}

impl DocumentReader {
    fn warn(&mut self, code: ErrorCode, message: String) {
        self.warnings.push(Diagnostic::warning(code, message));
    }

    fn scenario(&mut self, root: &Mapping) -> Result<Scenario> {
        let name = require_str(root, "scenario")?;
        let version = require_str(root, "version")?;

        let mut scenario = Scenario::new(name, version);
        scenario.description = optional_str(root, "description")?;
        scenario.population = self.population(root.get("population"))?;

        for signal in self.signals(require_mapping(root, "signals")?)? {
            scenario.add_signal(signal);
        }

        match root.get("trends") {
            None | Some(Value::Null) => {}
            Some(Value::Mapping(section)) => {
                for trend in self.trends(section)? {
                    scenario.add_trend(trend);
                }
            }
            Some(other) => return Err(wrong_type("trends", "mapping", other)),
        }

        for rule in self.logic(require_mapping(root, "logic")?)? {
            scenario.add_logic(rule);
        }

        scenario.audit = self.audit(root.get("audit"))?;
        scenario.state = self.state(root.get("state"))?;
        scenario.mapping = match root.get("mapping") {
            None | Some(Value::Null) => None,
            Some(value) => Some(serde_json::to_value(value).map_err(|e| {
                PsdlError::parse(PSDL0006, format!("Field 'mapping' cannot be represented: {}", e), "mapping")
            })?),
        };

        Ok(scenario)
    }

    fn population(&mut self, value: Option<&Value>) -> Result<Option<PopulationFilter>> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Mapping(map)) => Ok(Some(PopulationFilter {
                include: string_list(map, "include", PSDL0016, "population")?,
                exclude: string_list(map, "exclude", PSDL0016, "population")?,
            })),
            Some(other) => Err(PsdlError::parse(
                PSDL0016,
                format!("'population' must be a mapping, got {}", type_name(other)),
                "population",
            )),
        }
    }

    fn signals(&mut self, section: &Mapping) -> Result<Vec<Signal>> {
        let mut signals = Vec::with_capacity(section.len());
        for entry in entries(section, PSDL0011, "Signal") {
            let (name, spec) = entry?;
            let signal = match spec {
                Value::String(source) => Signal::new(name, source.as_str()),
                Value::Mapping(map) => self.signal_entry(name, map)?,
                other => {
                    return Err(PsdlError::parse(
                        PSDL0011,
                        format!(
                            "Invalid signal specification for '{}': expected a source string or mapping, got {}",
                            name,
                            type_name(other)
                        ),
                        name,
                    ));
                }
            };
            signals.push(signal);
        }
        Ok(signals)
    }

    fn signal_entry(&mut self, name: &str, map: &Mapping) -> Result<Signal> {
        let source = nonempty_str(map, "source").ok_or_else(|| {
            PsdlError::parse(PSDL0011, format!("Signal '{}' missing 'source'", name), name)
        })?;
        let mut signal = Signal::new(name, source);

        match map.get("concept_id") {
            None | Some(Value::Null) => {}
            Some(value) => {
                let id = value.as_i64().ok_or_else(|| {
                    PsdlError::parse(
                        PSDL0011,
                        format!("Signal '{}': 'concept_id' must be an integer, got {}", name, type_name(value)),
                        name,
                    )
                })?;
                signal = signal.with_concept_id(id);
            }
        }

        if let Some(unit) = map.get("unit").and_then(Value::as_str) {
            signal = signal.with_unit(unit);
        }

        match map.get("domain") {
            None | Some(Value::Null) => {}
            Some(value) => match value.as_str().and_then(Domain::from_name) {
                Some(domain) => signal = signal.with_domain(domain),
                None => self.warn(
                    PSDL0106,
                    format!("Unknown domain '{}' for signal '{}'", display_value(value), name),
                ),
            },
        }

        Ok(signal)
    }

    fn trends(&mut self, section: &Mapping) -> Result<Vec<TrendExpr>> {
        let mut trends = Vec::with_capacity(section.len());
        for entry in entries(section, PSDL0012, "Trend") {
            let (name, spec) = entry?;
            let trend = match spec {
                Value::String(expr) => {
                    parse_trend_expression(name, expr).map_err(|e| in_entry(e, "Trend", name))?
                }
                Value::Mapping(map) => {
                    let expr = nonempty_str(map, "expr").ok_or_else(|| {
                        PsdlError::parse(PSDL0012, format!("Trend '{}' missing 'expr'", name), name)
                    })?;
                    let mut trend =
                        parse_trend_expression(name, expr).map_err(|e| in_entry(e, "Trend", name))?;
                    trend.description = map.get("description").and_then(Value::as_str).map(str::to_string);
                    trend
                }
                other => {
                    return Err(PsdlError::parse(
                        PSDL0012,
                        format!("Invalid trend specification for '{}': got {}", name, type_name(other)),
                        name,
                    ));
                }
            };
            trends.push(trend);
        }
        Ok(trends)
    }

    fn logic(&mut self, section: &Mapping) -> Result<Vec<LogicExpr>> {
        let mut rules = Vec::with_capacity(section.len());
        for entry in entries(section, PSDL0013, "Logic") {
            let (name, spec) = entry?;
            let rule = match spec {
                Value::String(expr) => {
                    parse_logic_expression(name, expr).map_err(|e| in_entry(e, "Logic", name))?
                }
                Value::Mapping(map) => {
                    let expr = nonempty_str(map, "expr").ok_or_else(|| {
                        PsdlError::parse(PSDL0013, format!("Logic '{}' missing 'expr'", name), name)
                    })?;
                    let mut rule =
                        parse_logic_expression(name, expr).map_err(|e| in_entry(e, "Logic", name))?;
                    match map.get("severity") {
                        None | Some(Value::Null) => {}
                        Some(value) => match value.as_str().and_then(Severity::from_name) {
                            Some(severity) => rule = rule.with_severity(severity),
                            None => self.warn(
                                PSDL0107,
                                format!("Unknown severity '{}' for logic '{}'", display_value(value), name),
                            ),
                        },
                    }
                    if let Some(description) = map.get("description").and_then(Value::as_str) {
                        rule = rule.with_description(description);
                    }
                    rule
                }
                other => {
                    return Err(PsdlError::parse(
                        PSDL0013,
                        format!("Invalid logic specification for '{}': got {}", name, type_name(other)),
                        name,
                    ));
                }
            };
            rules.push(rule);
        }
        Ok(rules)
    }

    fn audit(&mut self, value: Option<&Value>) -> Result<Option<AuditBlock>> {
        let map = match value {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Mapping(map)) => map,
            Some(other) => return Err(wrong_type("audit", "mapping", other)),
        };
        match (
            nonempty_str(map, "intent"),
            nonempty_str(map, "rationale"),
            nonempty_str(map, "provenance"),
        ) {
            (Some(intent), Some(rationale), Some(provenance)) => Ok(Some(AuditBlock {
                intent: intent.to_string(),
                rationale: rationale.to_string(),
                provenance: provenance.to_string(),
            })),
            _ => Err(PsdlError::parse(
                PSDL0014,
                "Audit block requires 'intent', 'rationale', and 'provenance'",
                "audit",
            )),
        }
    }

    fn state(&mut self, value: Option<&Value>) -> Result<Option<StateMachine>> {
        let map = match value {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Mapping(map)) => map,
            Some(other) => return Err(wrong_type("state", "mapping", other)),
        };

        let initial = nonempty_str(map, "initial").ok_or_else(|| {
            PsdlError::parse(PSDL0015, "State machine requires an 'initial' state", "state")
        })?;
        let states = string_list(map, "states", PSDL0015, "state")?;

        let transitions = match map.get("transitions") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(items)) => items
                .iter()
                .map(transition)
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(PsdlError::parse(
                    PSDL0015,
                    format!("'state.transitions' must be a list, got {}", type_name(other)),
                    "transitions",
                ));
            }
        };

        Ok(Some(StateMachine {
            initial: initial.to_string(),
            states,
            transitions,
        }))
    }
}

fn transition(item: &Value) -> Result<StateTransition> {
    let fields = item
        .as_mapping()
        .map(|map| (nonempty_str(map, "from"), nonempty_str(map, "to"), nonempty_str(map, "when")));
    match fields {
        Some((Some(from), Some(to), Some(when))) => Ok(StateTransition::new(from, to, when)),
        _ => Err(PsdlError::parse(
            PSDL0015,
            "State transition requires 'from', 'to', and 'when'",
            "transitions",
        )),
    }
}

/// Render a scalar for a warning message
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => type_name(other).to_string(),
    }
}
