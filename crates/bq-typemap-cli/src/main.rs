//! bq-typemap CLI - inspect GoogleSQL store types, literals and write batches.

mod plan;

use bq_typemap::{
    parse_store_type, BatchLimits, Config, StatementBatch, TypeMapError, TypeMappingRegistry,
    WriteBatchPlanner,
};
use clap::{Parser, Subcommand};
use plan::PlanFile;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "bq-typemap")]
#[command(about = "Inspect GoogleSQL store types, literals and write batches")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "warn")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a store type and show the mapping it resolves to
    Parse {
        /// Store type, e.g. "ARRAY<STRUCT<id INT64, name STRING>>"
        store_type: String,
    },

    /// Render a JSON value as an inline literal of a store type
    Literal {
        /// Store type of the value
        store_type: String,

        /// Value as JSON, e.g. '{"id": 1, "name": "x"}'
        json: String,
    },

    /// Plan pending writes from a YAML file into statements
    Plan {
        /// Path to the plan file
        file: PathBuf,

        /// Override the payload ceiling in bytes
        #[arg(long)]
        max_payload_bytes: Option<usize>,

        /// Override the bound parameter ceiling
        #[arg(long)]
        max_parameters: Option<usize>,
    },
}

#[derive(Serialize)]
struct TypeReport {
    store_type: String,
    model_type: String,
    composite: bool,
    depth: usize,
    literal_encoding: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> Result<(), TypeMapError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };

    match cli.command {
        Commands::Parse { store_type } => {
            let descriptor = parse_store_type(&store_type)?;
            let registry = TypeMappingRegistry::from_config(&config.mapping);
            let mapping = registry.find_store_mapping(&store_type)?;

            let report = TypeReport {
                store_type: descriptor.to_string(),
                model_type: mapping.model_type().to_string(),
                composite: descriptor.is_composite(),
                depth: descriptor.depth(),
                literal_encoding: mapping.requires_literal(),
            };

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Store type: {}", report.store_type);
                println!("  Model type: {}", report.model_type);
                println!("  Composite: {}", report.composite);
                println!("  Depth: {}", report.depth);
                println!(
                    "  Encoding: {}",
                    if report.literal_encoding { "literal" } else { "parameter" }
                );
            }
        }

        Commands::Literal { store_type, json } => {
            let registry = TypeMappingRegistry::from_config(&config.mapping);
            let mapping = registry.find_store_mapping(&store_type)?;
            let input: serde_json::Value = serde_json::from_str(&json)?;
            let value = mapping.value_from_json(&input)?;
            let literal = mapping.generate_literal(&value)?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                    "store_type": mapping.store_type(),
                    "literal": literal,
                }))?);
            } else {
                println!("{}", literal);
            }
        }

        Commands::Plan {
            file,
            max_payload_bytes,
            max_parameters,
        } => {
            // Apply overrides
            if let Some(bytes) = max_payload_bytes {
                config.batching.max_payload_bytes = bytes;
            }
            if let Some(count) = max_parameters {
                config.batching.max_parameters = count;
            }
            config.validate()?;

            let registry = TypeMappingRegistry::from_config(&config.mapping);
            let commands = PlanFile::load(&file)?.resolve(&registry)?;
            debug!("Planning {} commands from {:?}", commands.len(), file);

            let mut planner = WriteBatchPlanner::new(BatchLimits::from(&config.batching));
            for command in commands {
                planner.add(command)?;
            }
            let batches = planner.finish();
            info!("Planned {} statements", batches.len());

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&batches)?);
            } else {
                print_batches(&batches)?;
            }
        }
    }

    Ok(())
}

fn print_batches(batches: &[StatementBatch]) -> Result<(), TypeMapError> {
    for (i, batch) in batches.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!(
            "-- {} {}: {} row(s), ~{} bytes",
            batch.kind,
            batch.table,
            batch.row_count(),
            batch.estimated_bytes
        );
        println!("{}", batch.sql);
        for parameter in &batch.parameters {
            println!(
                "--   @{} {} = {}",
                parameter.name,
                parameter.store_type,
                serde_json::to_string(&parameter.value)?
            );
        }
        if !batch.read_columns.is_empty() {
            println!("--   read back: {}", batch.read_columns.join(", "));
        }
    }
    Ok(())
}

/// Install the tracing subscriber. Logs go to stderr so stdout carries only
/// command output.
fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
