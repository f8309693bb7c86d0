//! Command Tests
//!
//! Exercises the CLI commands against scenario and data files on disk.

#![cfg(feature = "cli")]

use psdl::cli::evaluate::{self, EvaluateConfig};
use psdl::cli::output::OutputFormat;
use psdl::cli::validate::validate_file;
use psdl::diagnostics::{PSDL0101, PSDL0108};
use psdl::parser::ParseMode;
use psdl::TrendValue;
use rstest::rstest;
use std::io::Write;
use std::path::PathBuf;
use tempfile::{NamedTempFile, TempDir};

const SCENARIO: &str = r#"
scenario: AKI_CLI
version: "1.0"
signals:
  Cr: creatinine
trends:
  cr_rise: delta(Cr, 6h) > 0.3
logic:
  aki: cr_rise
state:
  initial: normal
  states: [normal, at_risk]
  transitions:
    - from: normal
      to: at_risk
      when: aki
"#;

const DATA: &str = r#"{
  "patients": {
    "rising": {"Cr": [
      {"timestamp": "2024-01-15T06:00:00Z", "value": 1.0},
      {"timestamp": "2024-01-15T09:00:00Z", "value": 1.4},
      {"timestamp": "2024-01-15T12:00:00Z", "value": 1.8}
    ]},
    "stable": {"Cr": [
      {"timestamp": "2024-01-15T06:00:00Z", "value": 1.0},
      {"timestamp": "2024-01-15T12:00:00Z", "value": 1.05}
    ]}
  }
}"#;

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

fn evaluate_config(dir: &TempDir, patient: Option<&str>) -> EvaluateConfig {
    EvaluateConfig {
        file: write_file(dir, "aki.yaml", SCENARIO),
        data: write_file(dir, "data.json", DATA),
        patient: patient.map(str::to_string),
        at: Some("2024-01-15T12:00:00Z".to_string()),
        state: None,
        strict_data: false,
        sort_points: false,
        verbose: false,
        format: OutputFormat::Json,
        output_file: None,
    }
}

#[test]
fn test_validate_clean_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(SCENARIO.as_bytes()).unwrap();

    let report = validate_file(file.path(), ParseMode::Lenient);
    assert!(report.is_valid());
    assert!(report.warnings.is_empty());
}

#[rstest]
#[case(ParseMode::Lenient, 0, 1)]
#[case(ParseMode::Strict, 1, 0)]
fn test_validate_warning_handling(#[case] mode: ParseMode, #[case] errors: usize, #[case] warnings: usize) {
    let doc = r#"
scenario: Numeric
version: "1"
signals:
  Cr: creatinine
trends:
  cr_delta: delta(Cr, 6h)
logic:
  rule: cr_delta
"#;
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(doc.as_bytes()).unwrap();

    let report = validate_file(file.path(), mode);
    assert_eq!(report.errors.len(), errors);
    assert_eq!(report.warnings.len(), warnings);
    let codes: Vec<_> = report.errors.iter().chain(&report.warnings).map(|d| d.code).collect();
    assert_eq!(codes, vec![PSDL0108]);
}

#[test]
fn test_validate_reports_semantic_errors() {
    let doc = SCENARIO.replace("aki: cr_rise", "aki: cr_rise AND missing_term");
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(doc.as_bytes()).unwrap();

    let report = validate_file(file.path(), ParseMode::Lenient);
    assert!(!report.is_valid());
    assert_eq!(report.errors[0].code, PSDL0101);
}

#[tokio::test]
async fn test_evaluate_single_patient() {
    let dir = TempDir::new().unwrap();
    let results = evaluate::run(&evaluate_config(&dir, Some("rising"))).await.unwrap();

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert!(result.is_triggered);
    assert_eq!(result.trend("cr_rise").and_then(TrendValue::truth), Some(true));
    assert!((result.trend("cr_rise").and_then(TrendValue::as_f64).unwrap() - 0.8).abs() < 1e-9);
    assert_eq!(result.current_state.as_deref(), Some("at_risk"));
}

#[tokio::test]
async fn test_evaluate_every_patient() {
    let dir = TempDir::new().unwrap();
    let results = evaluate::run(&evaluate_config(&dir, None)).await.unwrap();

    let summary: Vec<_> = results
        .iter()
        .map(|r| (r.patient_id.as_str(), r.is_triggered))
        .collect();
    assert_eq!(summary, vec![("rising", true), ("stable", false)]);
}

#[tokio::test]
async fn test_evaluate_rejects_unknown_state() {
    let dir = TempDir::new().unwrap();
    let mut config = evaluate_config(&dir, Some("rising"));
    config.state = Some("discharged".to_string());

    let err = evaluate::run(&config).await.unwrap_err();
    assert!(format!("{:#}", err).contains("Unknown state 'discharged'"));
}

#[tokio::test]
async fn test_evaluate_writes_output_file() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("result.json");
    let mut config = evaluate_config(&dir, Some("stable"));
    config.output_file = Some(out.clone());

    evaluate::evaluate(config).await.unwrap();
    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
    assert_eq!(written["patient_id"], "stable");
    assert_eq!(written["is_triggered"], false);
}
