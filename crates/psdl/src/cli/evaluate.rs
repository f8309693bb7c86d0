//! Evaluate command implementation

use super::output::{self, OutputFormat};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use psdl_eval::{EvaluationResult, Evaluator, EvaluatorConfig, InMemoryDataSource};
use psdl_parser::ScenarioParser;
use std::fs;
use std::path::PathBuf;
use tabled::Tabled;

/// Configuration for evaluate command
pub struct EvaluateConfig {
    pub file: PathBuf,
    /// JSON fixture with patient time series
    pub data: PathBuf,
    /// Single patient; every patient in the fixture when absent
    pub patient: Option<String>,
    /// RFC 3339 reference time; now when absent
    pub at: Option<String>,
    pub state: Option<String>,
    pub strict_data: bool,
    pub sort_points: bool,
    pub verbose: bool,
    pub format: OutputFormat,
    pub output_file: Option<PathBuf>,
}

#[derive(Debug, Tabled)]
struct ResultRow {
    #[tabled(rename = "Patient")]
    patient: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Evaluate a scenario and print the results
pub async fn evaluate(config: EvaluateConfig) -> Result<()> {
    let results = run(&config).await?;

    let content = match config.format {
        OutputFormat::Table => result_table(&results),
        format => {
            let value = match results.as_slice() {
                [single] if config.patient.is_some() => serde_json::to_value(single),
                _ => serde_json::to_value(&results),
            }
            .context("Failed to serialize results")?;
            output::format_json(&value, format == OutputFormat::Pretty)?
        }
    };
    output::write_output(&content, config.output_file.as_deref())?;

    if config.verbose {
        let triggered = results.iter().filter(|r| r.is_triggered).count();
        eprintln!(
            "{}",
            output::format_success(&format!(
                "Evaluated {} patient(s), {} triggered",
                results.len(),
                triggered
            ))
        );
    }
    Ok(())
}

/// Parse, load and evaluate without printing
pub async fn run(config: &EvaluateConfig) -> Result<Vec<EvaluationResult>> {
    let parsed = ScenarioParser::new()
        .parse_file(&config.file)
        .with_context(|| format!("Failed to parse {}", config.file.display()))?;
    for warning in &parsed.warnings {
        eprintln!("{}", output::format_warning(&warning.to_string()));
    }

    let data = fs::read_to_string(&config.data)
        .with_context(|| format!("Failed to read data file: {}", config.data.display()))?;
    let source = InMemoryDataSource::from_json_str(&data)
        .with_context(|| format!("Failed to load data file: {}", config.data.display()))?;

    let reference_time = parse_reference_time(config.at.as_deref())?;
    let evaluator_config = EvaluatorConfig::builder()
        .strict_data(config.strict_data)
        .sort_points(config.sort_points)
        .build();
    let evaluator = Evaluator::new(parsed.scenario)
        .context("Scenario cannot be evaluated")?
        .with_config(evaluator_config);
    log::info!(
        "Evaluating '{}' at {}",
        evaluator.scenario().name,
        reference_time.to_rfc3339()
    );

    match &config.patient {
        Some(patient) => {
            let result = evaluator
                .evaluate_async(&source, patient, reference_time, config.state.as_deref())
                .await
                .with_context(|| format!("Evaluation failed for patient '{}'", patient))?;
            Ok(vec![result])
        }
        None => {
            if config.state.is_some() {
                eprintln!(
                    "{}",
                    output::format_warning("--state applies to a single patient and is ignored")
                );
            }
            evaluator
                .evaluate_population(&source, reference_time)
                .context("Population evaluation failed")
        }
    }
}

/// Parse an RFC 3339 timestamp, defaulting to now
pub fn parse_reference_time(at: Option<&str>) -> Result<DateTime<Utc>> {
    match at {
        Some(text) => DateTime::parse_from_rfc3339(text)
            .map(|t| t.with_timezone(&Utc))
            .with_context(|| format!("Invalid reference time '{}', expected RFC 3339", text)),
        None => Ok(Utc::now()),
    }
}

fn result_table(results: &[EvaluationResult]) -> String {
    let rows = results.iter().flat_map(|result| {
        let patient = &result.patient_id;
        let trends = result.trend_values.iter().map(move |(name, value)| ResultRow {
            patient: patient.clone(),
            kind: "trend",
            name: name.clone(),
            value: value.to_string(),
        });
        let logic = result.logic_values.iter().map(move |(name, value)| ResultRow {
            patient: patient.clone(),
            kind: "logic",
            name: name.clone(),
            value: value.map_or_else(|| "unknown".to_string(), |b| b.to_string()),
        });
        let state = result.current_state.iter().map(move |state| ResultRow {
            patient: patient.clone(),
            kind: "state",
            name: result
                .state_transition
                .as_ref()
                .map_or_else(|| "unchanged".to_string(), |t| format!("{} -> {}", t.from, t.to)),
            value: state.clone(),
        });
        trends.chain(logic).chain(state)
    });
    output::render_table(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_reference_time() {
        let t = parse_reference_time(Some("2024-01-15T14:00:00+02:00")).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
        assert!(parse_reference_time(Some("yesterday")).is_err());
        assert!(parse_reference_time(None).is_ok());
    }
}
