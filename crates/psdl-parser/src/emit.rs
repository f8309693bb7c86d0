//! IR to document serialization

use psdl_ast::{Domain, LogicExpr, Scenario, Signal, TrendExpr};
use psdl_diagnostics::{PsdlError, Result, PSDL0406};
use serde_yaml::{Mapping, Value};

fn key(name: &str) -> Value {
    Value::String(name.to_string())
}

fn string_seq(items: &[String]) -> Value {
    Value::Sequence(items.iter().map(|s| key(s)).collect())
}

fn signal_value(signal: &Signal) -> Value {
    if signal.concept_id.is_none() && signal.unit.is_none() && signal.domain == Domain::default() {
        return key(&signal.source);
    }
    let mut map = Mapping::new();
    map.insert(key("source"), key(&signal.source));
    if let Some(id) = signal.concept_id {
        map.insert(key("concept_id"), Value::Number(id.into()));
    }
    if let Some(unit) = &signal.unit {
        map.insert(key("unit"), key(unit));
    }
    if signal.domain != Domain::default() {
        map.insert(key("domain"), key(signal.domain.name()));
    }
    Value::Mapping(map)
}

fn trend_value(trend: &TrendExpr) -> Value {
    let expr = key(&trend.to_string());
    match &trend.description {
        None => expr,
        Some(description) => {
            let mut map = Mapping::new();
            map.insert(key("expr"), expr);
            map.insert(key("description"), key(description));
            Value::Mapping(map)
        }
    }
}

fn logic_value(rule: &LogicExpr) -> Value {
    let expr = key(rule.expr.trim());
    if rule.severity.is_none() && rule.description.is_none() {
        return expr;
    }
    let mut map = Mapping::new();
    map.insert(key("expr"), expr);
    if let Some(severity) = rule.severity {
        map.insert(key("severity"), key(severity.name()));
    }
    if let Some(description) = &rule.description {
        map.insert(key("description"), key(description));
    }
    Value::Mapping(map)
}

/// Convert a scenario back into its document form
///
/// Entries keep their declaration order and use the shorthand form whenever
/// no optional attribute is set.
pub fn to_document(scenario: &Scenario) -> Result<Value> {
    let mut root = Mapping::new();
    root.insert(key("scenario"), key(&scenario.name));
    root.insert(key("version"), key(&scenario.version));
    if let Some(description) = &scenario.description {
        root.insert(key("description"), key(description));
    }

    if let Some(population) = &scenario.population {
        let mut map = Mapping::new();
        map.insert(key("include"), string_seq(&population.include));
        map.insert(key("exclude"), string_seq(&population.exclude));
        root.insert(key("population"), Value::Mapping(map));
    }

    let signals = scenario
        .signals
        .iter()
        .map(|(name, signal)| (key(name), signal_value(signal)))
        .collect();
    root.insert(key("signals"), Value::Mapping(signals));

    if !scenario.trends.is_empty() {
        let trends = scenario
            .trends
            .iter()
            .map(|(name, trend)| (key(name), trend_value(trend)))
            .collect();
        root.insert(key("trends"), Value::Mapping(trends));
    }

    let logic = scenario
        .logic
        .iter()
        .map(|(name, rule)| (key(name), logic_value(rule)))
        .collect();
    root.insert(key("logic"), Value::Mapping(logic));

    if let Some(audit) = &scenario.audit {
        let mut map = Mapping::new();
        map.insert(key("intent"), key(&audit.intent));
        map.insert(key("rationale"), key(&audit.rationale));
        map.insert(key("provenance"), key(&audit.provenance));
        root.insert(key("audit"), Value::Mapping(map));
    }

    if let Some(state) = &scenario.state {
        let mut map = Mapping::new();
        map.insert(key("initial"), key(&state.initial));
        map.insert(key("states"), string_seq(&state.states));
        let transitions = state
            .transitions
            .iter()
            .map(|t| {
                let mut edge = Mapping::new();
                edge.insert(key("from"), key(&t.from));
                edge.insert(key("to"), key(&t.to));
                edge.insert(key("when"), key(&t.when));
                Value::Mapping(edge)
            })
            .collect();
        map.insert(key("transitions"), Value::Sequence(transitions));
        root.insert(key("state"), Value::Mapping(map));
    }

    if let Some(mapping) = &scenario.mapping {
        let value = serde_yaml::to_value(mapping)
            .map_err(|e| PsdlError::system(PSDL0406, format!("Cannot serialize mapping: {}", e)))?;
        root.insert(key("mapping"), value);
    }

    Ok(Value::Mapping(root))
}

/// Serialize a scenario as a YAML document
pub fn to_yaml_string(scenario: &Scenario) -> Result<String> {
    let document = to_document(scenario)?;
    serde_yaml::to_string(&document)
        .map_err(|e| PsdlError::system(PSDL0406, format!("Cannot serialize scenario: {}", e)))
}
