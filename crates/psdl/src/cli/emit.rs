//! Emit command implementation

use super::output;
use anyhow::{Context, Result};
use psdl_parser::{parse_scenario_file, to_yaml_string};
use std::path::PathBuf;

/// Configuration for emit command
pub struct EmitConfig {
    pub file: PathBuf,
    pub output_file: Option<PathBuf>,
}

/// Re-serialize a parsed scenario as a PSDL document
pub fn emit(config: EmitConfig) -> Result<()> {
    let scenario = parse_scenario_file(&config.file)
        .with_context(|| format!("Failed to parse {}", config.file.display()))?;
    let yaml = to_yaml_string(&scenario).context("Failed to serialize scenario")?;
    output::write_output(yaml.trim_end(), config.output_file.as_deref())
}
