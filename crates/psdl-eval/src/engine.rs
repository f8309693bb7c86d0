//! PSDL Evaluation Engine
//!
//! [`Evaluator`] owns one scenario and evaluates it for one patient at one
//! reference time. An evaluation runs in four steps:
//!
//! 1. fetch the points of every trend's signal from a data source;
//! 2. apply each trend's operator and threshold;
//! 3. evaluate logic rules in dependency order with three-valued logic;
//! 4. advance the state machine, if the scenario declares one.
//!
//! The evaluator holds no mutable state, so a single instance can serve
//! any number of threads.

use crate::config::EvaluatorConfig;
use crate::error::{EvalError, EvalResult};
use crate::operators::DataPoint;
use crate::registry::{OperatorArgs, OperatorTable};
use crate::result::{DataIssue, EvaluationResult, StateChange};
use crate::source::{AsyncDataSource, DataSource, DataSourceError};
use crate::state::StateStore;
use crate::value::TrendValue;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use indexmap::IndexMap;
use psdl_ast::{LogicNode, PopulationFilter, Scenario, Signal, TemporalOp, TrendExpr};
use std::collections::HashMap;

/// One signal fetch needed by a trend
struct FetchRequest<'a> {
    name: &'a str,
    trend: &'a TrendExpr,
    signal: &'a Signal,
    window_seconds: Option<i64>,
}

/// Evaluates a scenario against patient data
#[derive(Debug, Clone)]
pub struct Evaluator {
    scenario: Scenario,
    operators: OperatorTable,
    config: EvaluatorConfig,
    /// Logic rule names, dependencies first
    logic_order: Vec<String>,
}

impl Evaluator {
    /// Create an evaluator with the standard operator table
    ///
    /// The scenario is checked again here because it may have been built
    /// by hand rather than by the parser.
    pub fn new(scenario: Scenario) -> EvalResult<Self> {
        check_trends(&scenario)?;
        let logic_order = scenario
            .logic_evaluation_order()
            .map_err(|cycle| EvalError::CircularLogic {
                path: cycle.to_string(),
            })?
            .into_iter()
            .map(str::to_string)
            .collect();
        check_logic_terms(&scenario)?;
        check_state_machine(&scenario)?;

        Ok(Self {
            scenario,
            operators: OperatorTable::standard(),
            config: EvaluatorConfig::default(),
            logic_order,
        })
    }

    pub fn with_config(mut self, config: EvaluatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the operator table
    pub fn with_operators(mut self, operators: OperatorTable) -> Self {
        self.operators = operators;
        self
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn operators(&self) -> &OperatorTable {
        &self.operators
    }

    /// Logic rule names in the order they are evaluated
    pub fn logic_order(&self) -> impl Iterator<Item = &str> {
        self.logic_order.iter().map(String::as_str)
    }

    /// Evaluate one patient at `reference_time`
    ///
    /// `prior_state` is the state machine position from the previous call;
    /// `None` starts from the initial state. It is ignored when the
    /// scenario declares no state machine.
    pub fn evaluate(
        &self,
        source: &dyn DataSource,
        patient_id: &str,
        reference_time: DateTime<Utc>,
        prior_state: Option<&str>,
    ) -> EvalResult<EvaluationResult> {
        let current_state = self.resolve_state(prior_state)?;
        let plan = self.fetch_plan()?;
        let fetched = plan
            .iter()
            .map(|req| source.fetch_points(patient_id, req.signal, req.window_seconds, reference_time))
            .collect();
        self.finish(patient_id, reference_time, current_state, &plan, fetched)
    }

    /// Evaluate one patient, fetching all signals concurrently
    pub async fn evaluate_async(
        &self,
        source: &dyn AsyncDataSource,
        patient_id: &str,
        reference_time: DateTime<Utc>,
        prior_state: Option<&str>,
    ) -> EvalResult<EvaluationResult> {
        let current_state = self.resolve_state(prior_state)?;
        let plan = self.fetch_plan()?;
        let fetched = join_all(
            plan.iter()
                .map(|req| source.fetch_points(patient_id, req.signal, req.window_seconds, reference_time)),
        )
        .await;
        self.finish(patient_id, reference_time, current_state, &plan, fetched)
    }

    /// Evaluate one patient, loading and saving the state through `store`
    pub fn evaluate_with_store(
        &self,
        source: &dyn DataSource,
        store: &dyn StateStore,
        patient_id: &str,
        reference_time: DateTime<Utc>,
    ) -> EvalResult<EvaluationResult> {
        let prior = store.load(&self.scenario.name, patient_id)?;
        let result = self.evaluate(source, patient_id, reference_time, prior.as_deref())?;
        if let Some(state) = &result.current_state {
            store.save(&self.scenario.name, patient_id, state)?;
        }
        Ok(result)
    }

    /// Evaluate every patient the scenario's population selects
    ///
    /// Each patient starts from the initial state. Results are in the order
    /// the data source lists the patients.
    pub fn evaluate_population(
        &self,
        source: &dyn DataSource,
        reference_time: DateTime<Utc>,
    ) -> EvalResult<Vec<EvaluationResult>> {
        let empty = PopulationFilter::default();
        let population = self.scenario.population.as_ref().unwrap_or(&empty);
        let patients = source
            .list_patient_ids(population)
            .map_err(|e| EvalError::PopulationListing {
                message: e.to_string(),
            })?;
        log::debug!(
            "Evaluating scenario '{}' for {} patient(s)",
            self.scenario.name,
            patients.len()
        );

        #[cfg(feature = "parallel")]
        let results: EvalResult<Vec<_>> = {
            use rayon::prelude::*;
            patients
                .par_iter()
                .map(|id| self.evaluate(source, id, reference_time, None))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let results: EvalResult<Vec<_>> = patients
            .iter()
            .map(|id| self.evaluate(source, id, reference_time, None))
            .collect();

        results
    }

    fn resolve_state(&self, prior_state: Option<&str>) -> EvalResult<Option<String>> {
        let Some(machine) = &self.scenario.state else {
            if let Some(state) = prior_state {
                log::debug!("Ignoring prior state '{}': scenario has no state machine", state);
            }
            return Ok(None);
        };

        let state = prior_state.unwrap_or(&machine.initial);
        if !machine.has_state(state) {
            return Err(EvalError::UnknownState {
                scenario: self.scenario.name.clone(),
                state: state.to_string(),
            });
        }
        Ok(Some(state.to_string()))
    }

    fn fetch_plan(&self) -> EvalResult<Vec<FetchRequest<'_>>> {
        let lookback = self.config.last_lookback.map(|w| w.total_seconds());
        self.scenario
            .trends
            .iter()
            .map(|(name, trend)| {
                let signal = self
                    .scenario
                    .signal(&trend.signal)
                    .ok_or_else(|| EvalError::UndefinedSignal {
                        trend: name.clone(),
                        signal: trend.signal.clone(),
                    })?;
                Ok(FetchRequest {
                    name,
                    trend,
                    signal,
                    window_seconds: trend.window_seconds().or(lookback),
                })
            })
            .collect()
    }

    fn finish(
        &self,
        patient_id: &str,
        reference_time: DateTime<Utc>,
        current_state: Option<String>,
        plan: &[FetchRequest<'_>],
        fetched: Vec<Result<Vec<DataPoint>, DataSourceError>>,
    ) -> EvalResult<EvaluationResult> {
        let mut trend_values = IndexMap::with_capacity(plan.len());
        let mut data_issues = Vec::new();

        for (req, points) in plan.iter().zip(fetched) {
            let value = match points {
                Ok(points) => self.compute_trend(req.trend, points, reference_time)?,
                Err(err) => {
                    if self.config.strict_data {
                        return Err(EvalError::data_source(&req.signal.name, err.to_string()));
                    }
                    log::warn!(
                        "Patient '{}': fetching '{}' for trend '{}' failed: {}",
                        patient_id,
                        req.signal.name,
                        req.name,
                        err
                    );
                    data_issues.push(DataIssue {
                        trend: req.name.to_string(),
                        signal: req.signal.name.clone(),
                        message: err.to_string(),
                    });
                    TrendValue::Unavailable
                }
            };
            log::debug!("Trend '{}' = {}", req.name, value);
            trend_values.insert(req.name.to_string(), value);
        }

        let logic_values = self.evaluate_logic(&trend_values)?;
        let triggered_logic: Vec<String> = logic_values
            .iter()
            .filter(|(_, value)| **value == Some(true))
            .map(|(name, _)| name.clone())
            .collect();

        let (current_state, state_transition) = self.advance_state(current_state, &logic_values);

        Ok(EvaluationResult {
            patient_id: patient_id.to_string(),
            reference_time,
            is_triggered: !triggered_logic.is_empty(),
            trend_values,
            logic_values,
            triggered_logic,
            current_state,
            state_transition,
            data_issues,
        })
    }

    fn compute_trend(
        &self,
        trend: &TrendExpr,
        mut points: Vec<DataPoint>,
        reference_time: DateTime<Utc>,
    ) -> EvalResult<TrendValue> {
        if self.config.sort_points {
            points.sort_by_key(|p| p.timestamp);
        }
        let args = OperatorArgs {
            window_seconds: trend.window_seconds(),
            reference_time,
            percentile: trend.percentile,
        };
        let value = self.operators.apply(trend.operator, &points, &args)?;

        Ok(match (value, trend.threshold) {
            (None, _) => TrendValue::Unavailable,
            (Some(v), Some(threshold)) => TrendValue::boolean(v, threshold.test(v)),
            (Some(v), None) => TrendValue::numeric(v),
        })
    }

    fn evaluate_logic(
        &self,
        trend_values: &IndexMap<String, TrendValue>,
    ) -> EvalResult<IndexMap<String, Option<bool>>> {
        let mut computed: HashMap<&str, Option<bool>> = HashMap::with_capacity(self.logic_order.len());
        for name in &self.logic_order {
            let rule = self
                .scenario
                .logic_rule(name)
                .ok_or_else(|| EvalError::undefined_logic(name))?;
            let value = eval_node(&rule.tree, name, trend_values, &computed)?;
            log::debug!("Logic '{}' = {:?}", name, value);
            computed.insert(name, value);
        }

        // report in declaration order
        Ok(self
            .scenario
            .logic
            .keys()
            .map(|name| (name.clone(), computed.get(name.as_str()).copied().flatten()))
            .collect())
    }

    fn advance_state(
        &self,
        current_state: Option<String>,
        logic_values: &IndexMap<String, Option<bool>>,
    ) -> (Option<String>, Option<StateChange>) {
        let (Some(machine), Some(current)) = (&self.scenario.state, current_state) else {
            return (None, None);
        };

        let fired = machine
            .transitions_from(&current)
            .find(|t| logic_values.get(&t.when).copied().flatten() == Some(true))
            .cloned();
        match fired {
            Some(transition) => {
                log::debug!(
                    "State '{}' -> '{}' (guard '{}')",
                    transition.from,
                    transition.to,
                    transition.when
                );
                let change = StateChange {
                    from: transition.from.clone(),
                    to: transition.to.clone(),
                    guard: transition.when.clone(),
                };
                (Some(transition.to.clone()), Some(change))
            }
            None => (Some(current), None),
        }
    }
}

fn eval_node(
    node: &LogicNode,
    rule: &str,
    trend_values: &IndexMap<String, TrendValue>,
    logic_values: &HashMap<&str, Option<bool>>,
) -> EvalResult<Option<bool>> {
    Ok(match node {
        LogicNode::Term { name } => match trend_values.get(name) {
            Some(value) => value.truth(),
            None => *logic_values
                .get(name.as_str())
                .ok_or_else(|| EvalError::UndefinedTerm {
                    rule: rule.to_string(),
                    term: name.clone(),
                })?,
        },
        LogicNode::Not { operand } => eval_node(operand, rule, trend_values, logic_values)?.map(|b| !b),
        LogicNode::And { left, right } => kleene_and(
            eval_node(left, rule, trend_values, logic_values)?,
            eval_node(right, rule, trend_values, logic_values)?,
        ),
        LogicNode::Or { left, right } => kleene_or(
            eval_node(left, rule, trend_values, logic_values)?,
            eval_node(right, rule, trend_values, logic_values)?,
        ),
    })
}

/// Three-valued AND: false dominates
fn kleene_and(left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match (left, right) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

/// Three-valued OR: true dominates
fn kleene_or(left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match (left, right) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

fn check_trends(scenario: &Scenario) -> EvalResult<()> {
    for (name, trend) in &scenario.trends {
        if scenario.signal(&trend.signal).is_none() {
            return Err(EvalError::UndefinedSignal {
                trend: name.clone(),
                signal: trend.signal.clone(),
            });
        }
        if trend.operator.requires_window() && trend.window.is_none() {
            return Err(EvalError::invalid_trend(
                name,
                format!("operator '{}' requires a window", trend.operator),
            ));
        }
        if trend.operator == TemporalOp::Percentile {
            match trend.percentile {
                Some(p) if (0.0..=100.0).contains(&p) => {}
                Some(p) => {
                    return Err(EvalError::invalid_trend(
                        name,
                        format!("percentile {} is outside 0..=100", p),
                    ));
                }
                None => return Err(EvalError::invalid_trend(name, "percentile argument is missing")),
            }
        }
    }
    Ok(())
}

fn check_logic_terms(scenario: &Scenario) -> EvalResult<()> {
    for (name, rule) in &scenario.logic {
        if let Some(term) = rule.terms.iter().find(|t| scenario.term_kind(t).is_none()) {
            return Err(EvalError::UndefinedTerm {
                rule: name.clone(),
                term: term.clone(),
            });
        }
    }
    Ok(())
}

fn check_state_machine(scenario: &Scenario) -> EvalResult<()> {
    let Some(machine) = &scenario.state else {
        return Ok(());
    };
    let unknown = |state: &str| EvalError::UnknownState {
        scenario: scenario.name.clone(),
        state: state.to_string(),
    };

    if !machine.has_state(&machine.initial) {
        return Err(unknown(&machine.initial));
    }
    for transition in &machine.transitions {
        for endpoint in [&transition.from, &transition.to] {
            if !machine.has_state(endpoint) {
                return Err(unknown(endpoint));
            }
        }
        if scenario.logic_rule(&transition.when).is_none() {
            return Err(EvalError::undefined_logic(&transition.when));
        }
    }
    Ok(())
}
