//! Inspect command implementation

use super::output::{self, OutputFormat};
use anyhow::{Context, Result};
use psdl_ast::Scenario;
use psdl_parser::ScenarioParser;
use std::path::PathBuf;
use tabled::Tabled;

/// Configuration for inspect command
pub struct InspectConfig {
    pub file: PathBuf,
    pub format: OutputFormat,
    pub output_file: Option<PathBuf>,
}

#[derive(Debug, Tabled)]
struct DefinitionRow {
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Definition")]
    definition: String,
}

/// Print the IR of a scenario
pub fn inspect(config: InspectConfig) -> Result<()> {
    let parsed = ScenarioParser::new()
        .parse_file(&config.file)
        .with_context(|| format!("Failed to parse {}", config.file.display()))?;
    for warning in &parsed.warnings {
        eprintln!("{}", output::format_warning(&warning.to_string()));
    }

    match config.format {
        OutputFormat::Table => {
            output::write_output(&definition_table(&parsed.scenario), config.output_file.as_deref())
        }
        format => {
            let value = serde_json::to_value(&parsed.scenario).context("Failed to serialize scenario")?;
            output::print_output(&value, format, config.output_file.as_deref())
        }
    }
}

/// One row per signal, trend, logic rule and transition
pub fn definition_table(scenario: &Scenario) -> String {
    let signals = scenario.signals.values().map(|s| DefinitionRow {
        kind: "signal",
        name: s.name.clone(),
        definition: match &s.unit {
            Some(unit) => format!("{} [{}] ({})", s.source, unit, s.domain),
            None => format!("{} ({})", s.source, s.domain),
        },
    });
    let trends = scenario.trends.values().map(|t| DefinitionRow {
        kind: "trend",
        name: t.name.clone(),
        definition: t.to_string(),
    });
    let logic = scenario.logic.values().map(|l| DefinitionRow {
        kind: "logic",
        name: l.name.clone(),
        definition: match l.severity {
            Some(severity) => format!("{} [{}]", l.tree, severity),
            None => l.tree.to_string(),
        },
    });
    let transitions = scenario
        .state
        .iter()
        .flat_map(|machine| &machine.transitions)
        .map(|t| DefinitionRow {
            kind: "transition",
            name: format!("{} -> {}", t.from, t.to),
            definition: format!("when {}", t.when),
        });

    let title = format!("{} v{}", scenario.name, scenario.version);
    let table = output::render_table(signals.chain(trends).chain(logic).chain(transitions));
    format!("{}\n{}", title, table)
}
