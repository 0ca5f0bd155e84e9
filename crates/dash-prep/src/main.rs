//! CLI entry point for the dashboard data preparation pipeline.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use dash_prep::{
    AnalysisResult, DashboardPlan, DataProcessor, FileAnalysis, ProcessingResult, ProcessorConfig,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Schema inference, cleaning and export of tabular files for dashboards",
    long_about = "Reads spreadsheets, delimited text, JSON records and plain text files,\n\
                  infers a typed schema for every column and prepares cleaned,\n\
                  export-ready tables.\n\n\
                  EXAMPLES:\n  \
                  # Summarize uploaded files\n  \
                  dash-prep analyze sales.csv customers.xlsx\n\n  \
                  # Machine-readable analysis\n  \
                  dash-prep analyze sales.csv --json | jq .summary\n\n  \
                  # Clean and export with a dashboard plan\n  \
                  dash-prep process sales.csv customers.xlsx --plan plan.json -o tables.json"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// JSON file with processor configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Maximum accepted file size in bytes
    #[arg(long, global = true)]
    max_file_size: Option<u64>,

    /// Global deadline for one run, in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Infer schemas and summarize files
    Analyze {
        /// Files to analyze
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output the analysis as JSON on stdout
        ///
        /// Disables all logging so stdout only contains the JSON document.
        #[arg(long)]
        json: bool,
    },

    /// Clean files and export dashboard-ready tables
    Process {
        /// Files to process
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Dashboard plan JSON (`{"kpis": [{"name", "field", "calculation"}]}`)
        #[arg(short, long)]
        plan: PathBuf,

        /// Write the result JSON to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    let json_output = matches!(args.command, Command::Analyze { json: true, .. });
    init_logging(&args.log_level, args.quiet, json_output);

    let config = load_config(&args)?;
    let processor = DataProcessor::builder()
        .config(config)
        .on_progress(|update| {
            debug!(
                "[{}] {:.0}% {}",
                update.stage.display_name(),
                update.progress * 100.0,
                update.message
            )
        })
        .build()?;

    match &args.command {
        Command::Analyze { files, json } => run_analyze(&processor, files, *json),
        Command::Process {
            files,
            plan,
            output,
        } => run_process(&processor, files, plan, output.as_deref()),
    }
}

/// Build the configuration from the optional JSON file and CLI overrides.
fn load_config(args: &Args) -> Result<ProcessorConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        }
        None => ProcessorConfig::default(),
    };

    if let Some(max_file_size) = args.max_file_size {
        config.max_file_size = max_file_size;
    }
    if let Some(secs) = args.timeout_secs {
        config.timeout_ms = Some(secs.saturating_mul(1000));
    }

    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;
    debug!("Configuration: {:?}", config);
    Ok(config)
}

fn run_analyze(processor: &DataProcessor, files: &[PathBuf], json: bool) -> Result<()> {
    let analysis = processor.analyze(files);

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print_analysis(&analysis);
    }

    if analysis.successful_files().count() == 0 {
        return Err(anyhow!("No file could be analyzed"));
    }
    Ok(())
}

fn run_process(
    processor: &DataProcessor,
    files: &[PathBuf],
    plan_path: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let plan_content = fs::read_to_string(plan_path)
        .with_context(|| format!("Failed to read dashboard plan {}", plan_path.display()))?;
    let plan: DashboardPlan = serde_json::from_str(&plan_content)
        .with_context(|| format!("Invalid dashboard plan {}", plan_path.display()))?;

    for kpi in &plan.kpis {
        if kpi.parsed_calculation().is_none() {
            warn!(
                "KPI '{}' has unsupported calculation '{}' and will be ignored",
                kpi.name, kpi.calculation
            );
        }
    }

    let result = processor.process(files, &plan)?;
    let rendered = serde_json::to_string_pretty(&result)?;

    match output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Result written to {}", path.display());
            print_processing(&result);
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

/// Print the analysis for a terminal.
///
/// Uses `println!` intentionally: this is the command's output, not logging.
fn print_analysis(analysis: &AnalysisResult) {
    println!();
    println!("{}", "=".repeat(80));
    println!("ANALYSIS");
    println!("{}", "=".repeat(80));

    for file in &analysis.files {
        println!();
        print_file(file);
    }

    println!();
    println!("Summary:");
    println!("  {}", analysis.summary);
    println!();
    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}

fn print_file(file: &FileAnalysis) {
    if !file.is_success() {
        println!(
            "{}  [{}] {}",
            file.filename,
            file.error_code.as_deref().unwrap_or("ERROR"),
            file.error.as_deref().unwrap_or("")
        );
        return;
    }

    println!(
        "{}  ({} rows x {} columns)",
        file.filename,
        file.row_count,
        file.columns.len()
    );
    println!("{}", "-".repeat(70));
    println!(
        "{:<24} {:<10} {:<8} {:<8} {:<16}",
        "Column", "Type", "Nulls", "Unique", "Top value"
    );
    for column in file.schema.iter() {
        let top = column
            .top_values
            .as_ref()
            .and_then(|values| values.first())
            .map(|(value, count)| format!("{} ({})", value, count))
            .unwrap_or_default();
        println!(
            "{:<24} {:<10} {:<8} {:<8} {:<16}",
            truncate_str(&column.name, 23),
            column.inferred_type,
            column.null_count,
            column.unique_count,
            truncate_str(&top, 16)
        );
    }
}

fn print_processing(result: &ProcessingResult) {
    println!();
    println!("{}", result.summary);
    for (name, table) in &result.tables {
        println!(
            "  {}: {} rows x {} columns, {} cleaning steps",
            name,
            table.row_count,
            table.column_count,
            table.cleaning_steps.len()
        );
    }
    for relationship in &result.relationships {
        println!(
            "  {}.{} -> {}.{}",
            relationship.from_table,
            relationship.from_column,
            relationship.to_table,
            relationship.to_column
        );
    }
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
