//! Semantic validation of a built scenario
//!
//! Every violation is collected; the caller decides how to surface them.

use psdl_ast::{Scenario, TermKind};
use psdl_diagnostics::{
    Diagnostic, PsdlError, PSDL0100, PSDL0101, PSDL0102, PSDL0103, PSDL0104, PSDL0105, PSDL0108,
    PSDL0109,
};
use std::collections::HashSet;

/// Outcome of semantic validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub errors: Vec<PsdlError>,
    pub warnings: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check references, name clashes, logic cycles and state machine consistency
pub fn validate_scenario(scenario: &Scenario) -> ValidationReport {
    let mut report = ValidationReport::default();
    check_trend_signals(scenario, &mut report);
    check_shared_namespace(scenario, &mut report);
    check_logic_terms(scenario, &mut report);
    check_logic_cycles(scenario, &mut report);
    check_state_machine(scenario, &mut report);
    report
}

fn check_trend_signals(scenario: &Scenario, report: &mut ValidationReport) {
    for trend in scenario.trends.values() {
        if scenario.signal(&trend.signal).is_none() {
            report.errors.push(
                PsdlError::semantic(
                    PSDL0100,
                    format!("Trend '{}' references unknown signal '{}'", trend.name, trend.signal),
                )
                .with_context(trend.to_string()),
            );
        }
    }
}

/// Trend and logic names are resolved through one namespace
fn check_shared_namespace(scenario: &Scenario, report: &mut ValidationReport) {
    for name in scenario.logic.keys() {
        if scenario.trends.contains_key(name) {
            report.errors.push(PsdlError::semantic(
                PSDL0104,
                format!("'{}' is declared both as a trend and as a logic rule", name),
            ));
        }
    }
}

fn check_logic_terms(scenario: &Scenario, report: &mut ValidationReport) {
    for rule in scenario.logic.values() {
        for term in rule.distinct_terms() {
            match scenario.term_kind(term) {
                Some(TermKind::Trend) => {
                    let is_numeric = scenario.trend(term).is_some_and(|t| !t.is_boolean());
                    if is_numeric {
                        report.warnings.push(
                            Diagnostic::warning(
                                PSDL0108,
                                format!(
                                    "Logic '{}' uses numeric trend '{}' as a boolean term",
                                    rule.name, term
                                ),
                            )
                            .with_help("add a comparison, e.g. `sma(HR, 1h) > 100`; the term never evaluates to true"),
                        );
                    }
                }
                Some(TermKind::Logic) => {}
                None => report.errors.push(
                    PsdlError::semantic(
                        PSDL0101,
                        format!("Logic '{}' references unknown term '{}'", rule.name, term),
                    )
                    .with_context(rule.expr.clone()),
                ),
            }
        }
    }
}

fn check_logic_cycles(scenario: &Scenario, report: &mut ValidationReport) {
    if let Err(cycle) = scenario.logic_evaluation_order() {
        report.errors.push(PsdlError::semantic(
            PSDL0105,
            format!("Circular logic reference: {}", cycle),
        ));
    }
}

fn check_state_machine(scenario: &Scenario, report: &mut ValidationReport) {
    let Some(state) = &scenario.state else {
        return;
    };

    if state.states.is_empty() {
        report.errors.push(PsdlError::semantic(
            PSDL0109,
            "State machine declares no states",
        ));
    }

    let mut seen = HashSet::new();
    for name in &state.states {
        if !seen.insert(name.as_str()) {
            report.errors.push(PsdlError::semantic(
                PSDL0104,
                format!("State '{}' is declared more than once", name),
            ));
        }
    }

    if !state.states.is_empty() && !state.has_state(&state.initial) {
        report.errors.push(PsdlError::semantic(
            PSDL0103,
            format!("Initial state '{}' is not a declared state", state.initial),
        ));
    }

    for (index, transition) in state.transitions.iter().enumerate() {
        for endpoint in [&transition.from, &transition.to] {
            if !state.has_state(endpoint) {
                report.errors.push(
                    PsdlError::semantic(
                        PSDL0103,
                        format!("Transition #{} references undeclared state '{}'", index + 1, endpoint),
                    )
                    .with_context(format!("{} -> {}", transition.from, transition.to)),
                );
            }
        }
        if scenario.logic_rule(&transition.when).is_none() {
            report.errors.push(
                PsdlError::semantic(
                    PSDL0102,
                    format!(
                        "Transition #{} guard '{}' is not a logic rule",
                        index + 1,
                        transition.when
                    ),
                )
                .with_context(format!("{} -> {}", transition.from, transition.to)),
            );
        }
    }
}
