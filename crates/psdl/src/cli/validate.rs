//! Validate command implementation

use super::output;
use anyhow::Result;
use colored::Colorize;
use psdl_diagnostics::Diagnostic;
use psdl_parser::{ParseMode, ScenarioParser};
use std::path::{Path, PathBuf};

/// Configuration for validate command
pub struct ValidateConfig {
    pub files: Vec<PathBuf>,
    pub strict: bool,
    pub verbose: bool,
}

/// Validation outcome for a single file
#[derive(Debug)]
pub struct FileReport {
    pub file: PathBuf,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl FileReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate PSDL files
pub fn validate(config: ValidateConfig) -> Result<()> {
    if config.files.is_empty() {
        anyhow::bail!("No files specified for validation");
    }

    let mode = if config.strict {
        ParseMode::Strict
    } else {
        ParseMode::Lenient
    };

    let reports: Vec<FileReport> = config
        .files
        .iter()
        .map(|file| {
            if config.verbose {
                eprintln!("Validating: {}", file.display());
            }
            validate_file(file, mode)
        })
        .collect();

    for report in &reports {
        print_report(report);
    }

    let total_errors: usize = reports.iter().map(|r| r.errors.len()).sum();
    let total_warnings: usize = reports.iter().map(|r| r.warnings.len()).sum();

    println!();
    if total_errors > 0 {
        anyhow::bail!(
            "Validation failed: {} error(s), {} warning(s)",
            total_errors,
            total_warnings
        );
    }
    if total_warnings > 0 {
        eprintln!(
            "{}",
            output::format_warning(&format!("{} warning(s)", total_warnings))
        );
    }
    println!(
        "{}",
        output::format_success(&format!(
            "All {} file(s) validated successfully",
            reports.len()
        ))
    );
    Ok(())
}

/// Parse and validate one file, collecting every diagnostic
pub fn validate_file(file: &Path, mode: ParseMode) -> FileReport {
    let (errors, warnings) = match ScenarioParser::with_mode(mode).parse_file(file) {
        Ok(parsed) => (Vec::new(), parsed.warnings),
        Err(err) => (err.to_diagnostics(), Vec::new()),
    };
    FileReport {
        file: file.to_path_buf(),
        errors,
        warnings,
    }
}

fn print_report(report: &FileReport) {
    let status = if report.is_valid() {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("{} {}", status, report.file.display().to_string().cyan());

    for diag in report.errors.iter().chain(&report.warnings) {
        println!("  {}", diag.render());
    }
}
