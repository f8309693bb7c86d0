//! Scenario root and its declarative sections

use crate::{LogicExpr, TrendExpr};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Clinical data domain of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    #[default]
    Measurement,
    Observation,
    Condition,
    Drug,
    Procedure,
}

impl Domain {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "measurement" => Some(Self::Measurement),
            "observation" => Some(Self::Observation),
            "condition" => Some(Self::Condition),
            "drug" => Some(Self::Drug),
            "procedure" => Some(Self::Procedure),
            _ => None,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Measurement => "measurement",
            Self::Observation => "observation",
            Self::Condition => "condition",
            Self::Drug => "drug",
            Self::Procedure => "procedure",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named binding to an external clinical data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub name: String,
    /// External code or column identifier
    pub source: String,
    pub concept_id: Option<i64>,
    pub unit: Option<String>,
    pub domain: Domain,
}

impl Signal {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            concept_id: None,
            unit: None,
            domain: Domain::default(),
        }
    }

    pub fn with_concept_id(mut self, concept_id: i64) -> Self {
        self.concept_id = Some(concept_id);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }
}

/// Cohort include/exclude predicates, resolved by the data source
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PopulationFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

/// Audit metadata; all three fields are required together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditBlock {
    pub intent: String,
    pub rationale: String,
    pub provenance: String,
}

/// One guarded edge of the state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: String,
    pub to: String,
    /// Name of the guarding logic rule
    pub when: String,
}

impl StateTransition {
    pub fn new(from: impl Into<String>, to: impl Into<String>, when: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            when: when.into(),
        }
    }
}

/// Per-patient clinical state tracked across evaluations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMachine {
    pub initial: String,
    pub states: Vec<String>,
    /// Transitions in declaration order; the first matching one fires
    pub transitions: Vec<StateTransition>,
}

impl StateMachine {
    pub fn has_state(&self, state: &str) -> bool {
        self.states.iter().any(|s| s == state)
    }

    /// Transitions leaving `state`, in declaration order
    pub fn transitions_from<'a>(&'a self, state: &'a str) -> impl Iterator<Item = &'a StateTransition> + 'a {
        self.transitions.iter().filter(move |t| t.from == state)
    }
}

/// What a logic term name resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    Trend,
    Logic,
}

/// A cycle among logic rules, as the chain of names that closes it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicCycle {
    pub path: Vec<String>,
}

impl fmt::Display for LogicCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path.join(" -> "))
    }
}

/// The IR root for one parsed PSDL document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub population: Option<PopulationFilter>,
    pub signals: IndexMap<String, Signal>,
    pub trends: IndexMap<String, TrendExpr>,
    pub logic: IndexMap<String, LogicExpr>,
    pub audit: Option<AuditBlock>,
    pub state: Option<StateMachine>,
    /// Free-form output mapping, carried through untouched
    pub mapping: Option<serde_json::Value>,
}

impl Scenario {
    /// Create an empty scenario
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: None,
            population: None,
            signals: IndexMap::new(),
            trends: IndexMap::new(),
            logic: IndexMap::new(),
            audit: None,
            state: None,
            mapping: None,
        }
    }

    pub fn add_signal(&mut self, signal: Signal) {
        self.signals.insert(signal.name.clone(), signal);
    }

    pub fn add_trend(&mut self, trend: TrendExpr) {
        self.trends.insert(trend.name.clone(), trend);
    }

    pub fn add_logic(&mut self, rule: LogicExpr) {
        self.logic.insert(rule.name.clone(), rule);
    }

    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.signals.get(name)
    }

    pub fn trend(&self, name: &str) -> Option<&TrendExpr> {
        self.trends.get(name)
    }

    pub fn logic_rule(&self, name: &str) -> Option<&LogicExpr> {
        self.logic.get(name)
    }

    /// Resolve a logic term; trends take precedence over rules of the same name
    pub fn term_kind(&self, name: &str) -> Option<TermKind> {
        if self.trends.contains_key(name) {
            Some(TermKind::Trend)
        } else if self.logic.contains_key(name) {
            Some(TermKind::Logic)
        } else {
            None
        }
    }

    /// Order logic rules so every rule comes after the rules it references
    ///
    /// Rules with no logic dependencies keep their declaration order at the
    /// front. Unknown terms are ignored here; they are a validation concern.
    pub fn logic_evaluation_order(&self) -> Result<Vec<&str>, LogicCycle> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            scenario: &'a Scenario,
            name: &'a str,
            marks: &mut HashMap<&'a str, Mark>,
            stack: &mut Vec<&'a str>,
            order: &mut Vec<&'a str>,
        ) -> Result<(), LogicCycle> {
            match marks.get(name) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => {
                    let start = stack.iter().position(|n| *n == name).unwrap_or(0);
                    let mut path: Vec<String> = stack[start..].iter().map(|s| s.to_string()).collect();
                    path.push(name.to_string());
                    return Err(LogicCycle { path });
                }
                None => {}
            }

            let Some(rule) = scenario.logic.get(name) else {
                return Ok(());
            };

            marks.insert(name, Mark::Visiting);
            stack.push(name);
            for term in rule.distinct_terms() {
                if scenario.term_kind(term) == Some(TermKind::Logic) {
                    visit(scenario, term, marks, stack, order)?;
                }
            }
            stack.pop();
            marks.insert(name, Mark::Done);
            order.push(name);
            Ok(())
        }

        let mut marks = HashMap::new();
        let mut stack = Vec::new();
        let mut order = Vec::with_capacity(self.logic.len());

        // Leaf rules first, then the rest depth-first
        let (leaves, composites): (Vec<&String>, Vec<&String>) = self.logic.keys().partition(|name| {
            self.logic[name.as_str()]
                .terms
                .iter()
                .all(|t| self.term_kind(t) != Some(TermKind::Logic))
        });
        for name in leaves.into_iter().chain(composites) {
            visit(self, name, &mut marks, &mut stack, &mut order)?;
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LogicNode, LogicOp, TemporalOp, WindowSpec};
    use pretty_assertions::assert_eq;

    fn rule(name: &str, tree: LogicNode) -> LogicExpr {
        let expr = tree.to_string();
        LogicExpr::new(name, expr, tree, [LogicOp::And])
    }

    fn scenario_with_rules(rules: Vec<LogicExpr>) -> Scenario {
        let mut s = Scenario::new("Test", "1.0.0");
        s.add_signal(Signal::new("Cr", "creatinine"));
        s.add_trend(TrendExpr::new("rise", TemporalOp::Delta, "Cr", Some(WindowSpec::hours(6))));
        s.add_trend(TrendExpr::new("high", TemporalOp::Last, "Cr", None));
        for r in rules {
            s.add_logic(r);
        }
        s
    }

    #[test]
    fn test_dependency_order_puts_leaves_first() {
        let s = scenario_with_rules(vec![
            rule("escalate", LogicNode::and(LogicNode::term("aki"), LogicNode::term("high"))),
            rule("aki", LogicNode::term("rise")),
            rule("page", LogicNode::or(LogicNode::term("escalate"), LogicNode::term("aki"))),
        ]);

        let order = s.logic_evaluation_order().unwrap();
        assert_eq!(order, vec!["aki", "escalate", "page"]);
    }

    #[test]
    fn test_cycle_detected_with_path() {
        let s = scenario_with_rules(vec![
            rule("a", LogicNode::and(LogicNode::term("rise"), LogicNode::term("b"))),
            rule("b", LogicNode::term("c")),
            rule("c", LogicNode::not(LogicNode::term("a"))),
        ]);

        let cycle = s.logic_evaluation_order().unwrap_err();
        assert_eq!(cycle.path.first(), cycle.path.last());
        assert_eq!(cycle.path.len(), 4);
        assert_eq!(cycle.to_string().matches("->").count(), 3);
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let s = scenario_with_rules(vec![rule("loop", LogicNode::or(LogicNode::term("loop"), LogicNode::term("rise")))]);
        let cycle = s.logic_evaluation_order().unwrap_err();
        assert_eq!(cycle.path, vec!["loop".to_string(), "loop".to_string()]);
    }

    #[test]
    fn test_term_kind_resolution() {
        let s = scenario_with_rules(vec![rule("aki", LogicNode::term("rise"))]);
        assert_eq!(s.term_kind("rise"), Some(TermKind::Trend));
        assert_eq!(s.term_kind("aki"), Some(TermKind::Logic));
        assert_eq!(s.term_kind("nope"), None);
    }

    #[test]
    fn test_transitions_from_keeps_declaration_order() {
        let sm = StateMachine {
            initial: "normal".into(),
            states: vec!["normal".into(), "watch".into(), "alert".into()],
            transitions: vec![
                StateTransition::new("normal", "watch", "a"),
                StateTransition::new("watch", "alert", "b"),
                StateTransition::new("normal", "alert", "c"),
            ],
        };
        let guards: Vec<_> = sm.transitions_from("normal").map(|t| t.when.as_str()).collect();
        assert_eq!(guards, vec!["a", "c"]);
        assert!(sm.has_state("alert"));
        assert!(!sm.has_state("discharged"));
    }
}
