//! PSDL command-line interface

use anyhow::Result;
use clap::{Parser, Subcommand};
use psdl::cli::output::{self, ColorMode, OutputFormat};
use psdl::cli::{emit, evaluate, inspect, validate};
use std::path::PathBuf;

/// PSDL command-line tool
#[derive(Parser)]
#[command(name = "psdl")]
#[command(author, version, about = "Patient Scenario Definition Language (PSDL) tools", long_about = None)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Pretty, global = true)]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Color output
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    color: ColorMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate PSDL syntax and semantics
    Validate {
        /// Scenario files to validate
        files: Vec<PathBuf>,

        /// Strict mode (warnings as errors)
        #[arg(short, long)]
        strict: bool,
    },

    /// Print the parsed intermediate representation
    Inspect {
        /// Scenario file
        file: PathBuf,
    },

    /// Evaluate a scenario against patient data
    Evaluate {
        /// Scenario file
        file: PathBuf,

        /// Patient data file (JSON)
        #[arg(short, long)]
        data: PathBuf,

        /// Patient to evaluate (default: every patient in the data file)
        #[arg(short, long)]
        patient: Option<String>,

        /// Reference time, RFC 3339 (default: now)
        #[arg(long)]
        at: Option<String>,

        /// Prior state machine state
        #[arg(long)]
        state: Option<String>,

        /// Fail on data fetch errors instead of reporting no value
        #[arg(long)]
        strict_data: bool,

        /// Sort data points before evaluation
        #[arg(long)]
        sort_points: bool,
    },

    /// Re-serialize a scenario as a PSDL document
    Emit {
        /// Scenario file
        file: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Validate { files, strict } => validate::validate(validate::ValidateConfig {
            files,
            strict,
            verbose: cli.verbose,
        }),

        Commands::Inspect { file } => inspect::inspect(inspect::InspectConfig {
            file,
            format: cli.format,
            output_file: cli.output,
        }),

        Commands::Evaluate {
            file,
            data,
            patient,
            at,
            state,
            strict_data,
            sort_points,
        } => {
            let config = evaluate::EvaluateConfig {
                file,
                data,
                patient,
                at,
                state,
                strict_data,
                sort_points,
                verbose: cli.verbose,
                format: cli.format,
                output_file: cli.output,
            };
            evaluate::evaluate(config).await
        }

        Commands::Emit { file } => emit::emit(emit::EmitConfig {
            file,
            output_file: cli.output,
        }),
    }
}

#[tokio::main]
async fn main() {
    human_panic::setup_panic!();

    let cli = Cli::parse();
    output::setup_colors(cli.color);
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{}", output::format_error(&e));
        std::process::exit(1);
    }
}
