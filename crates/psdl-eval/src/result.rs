//! Evaluation results

use crate::TrendValue;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A state machine transition taken during one evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub from: String,
    pub to: String,
    /// Logic rule that guarded the transition
    pub guard: String,
}

/// A trend that could not be computed because its data fetch failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataIssue {
    pub trend: String,
    pub signal: String,
    pub message: String,
}

/// The outcome of evaluating one patient at one reference time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub patient_id: String,
    pub reference_time: DateTime<Utc>,
    /// True iff at least one logic rule is triggered
    pub is_triggered: bool,
    /// Every declared trend, in declaration order
    pub trend_values: IndexMap<String, TrendValue>,
    /// Three-valued outcome of every logic rule, in declaration order
    pub logic_values: IndexMap<String, Option<bool>>,
    /// Rules whose formula evaluated to true, in declaration order
    pub triggered_logic: Vec<String>,
    /// State after this evaluation, when a state machine is declared
    pub current_state: Option<String>,
    pub state_transition: Option<StateChange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_issues: Vec<DataIssue>,
}

impl EvaluationResult {
    pub fn trend(&self, name: &str) -> Option<&TrendValue> {
        self.trend_values.get(name)
    }

    pub fn is_logic_triggered(&self, name: &str) -> bool {
        self.triggered_logic.iter().any(|n| n == name)
    }

    /// Whether the state machine moved during this evaluation
    pub fn state_changed(&self) -> bool {
        self.state_transition.is_some()
    }
}
