//! Heatmap CLI - Command-line interface for the speed heatmap
//!
//! Commands:
//! - render: Render one week of a document dump (one-shot)
//! - watch: Live view driven by commands on stdin
//! - validate: Validate a document dump
//! - doctor: Diagnose configuration and data

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use tracing::warn;

use chrono::Datelike;
use speed_heatmap::store::{DocumentAdapter, StoreDocument};
use speed_heatmap::{
    logging, AppEvent, Clock, Command, HeatmapApp, HeatmapConfig, HeatmapError,
    HeatmapGrid, MemoryStore, SystemClock, ViewWindow, HEATMAP_VERSION,
};

/// Heatmap - weekly day-by-hour view of traffic-speed measurements
#[derive(Parser)]
#[command(name = "heatmap")]
#[command(version = HEATMAP_VERSION)]
#[command(about = "Render traffic-speed heatmaps from a live document store", long_about = None)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Collection holding the speed documents
    #[arg(long, global = true)]
    collection: Option<String>,

    /// UTC offset of the measurement site in hours
    #[arg(long, global = true, allow_hyphen_values = true)]
    utc_offset: Option<i32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one week of a document dump
    Render {
        /// Document dump (NDJSON or JSON array); defaults to the configured data file
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Year to show, 1-9999 (defaults to the current year)
        #[arg(long, value_parser = clap::value_parser!(i32).range(1..=9999))]
        year: Option<i32>,

        /// Month to show, 1-12 (defaults to the current month)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,

        /// Week of the month, 1-5 (defaults to the current week)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=5))]
        week: Option<u32>,

        /// Show the tooltip of a cell, e.g. --hover TUE 14
        #[arg(long, num_args = 2, value_names = ["DAY", "HOUR"])]
        hover: Option<Vec<String>>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Live view; reads commands (prev, next, today, week N, hover DAY HOUR, leave, put JSON, delete ID, quit) from stdin
    Watch {
        /// Document dump (NDJSON or JSON array); defaults to the configured data file
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// Validate a document dump
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and data
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one document per line)
    Ndjson,
    /// JSON array of documents
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Plain-text grid
    Text,
    /// Grid model as JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), HeatmapCliError> {
    let mut config = HeatmapConfig::load(cli.config.as_deref())?;
    if let Some(collection) = cli.collection {
        config.collection = collection;
    }
    if let Some(offset) = cli.utc_offset {
        config.utc_offset_hours = offset;
    }
    config.validate()?;
    logging::init(&config.log_level);

    match cli.command {
        Commands::Render {
            data,
            year,
            month,
            week,
            hover,
            format,
        } => cmd_render(&config, data, year, month, week, hover, format),

        Commands::Watch { data } => cmd_watch(&config, data),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { json } => cmd_doctor(&config, json),
    }
}

fn cmd_render(
    config: &HeatmapConfig,
    data: Option<PathBuf>,
    year: Option<i32>,
    month: Option<u32>,
    week: Option<u32>,
    hover: Option<Vec<String>>,
    format: OutputFormat,
) -> Result<(), HeatmapCliError> {
    let store = load_store(config, data)?;
    let clock = SystemClock::new(config.utc_offset()?);

    let mut app = if year.is_none() && month.is_none() && week.is_none() {
        HeatmapApp::new(store, Box::new(clock), config)?
    } else {
        let today = clock.now();
        let window = ViewWindow::new(
            year.unwrap_or_else(|| today.year()),
            month.map(|m| m - 1).unwrap_or_else(|| today.month0()),
            week.unwrap_or(1),
        );
        HeatmapApp::with_window(store, Box::new(clock), window, config)?
    };

    if let Some(hover) = hover {
        let command: Command = format!("hover {}", hover.join(" ")).parse()?;
        app.handle(AppEvent::Command(command))?;
    }
    app.run_until_idle()?;

    let grid = app.grid();
    app.shutdown();
    print!("{}", format_grid(&grid, &format)?);
    Ok(())
}

fn cmd_watch(config: &HeatmapConfig, data: Option<PathBuf>) -> Result<(), HeatmapCliError> {
    let store = load_store(config, data)?;
    let clock = SystemClock::new(config.utc_offset()?);
    let mut app = HeatmapApp::new(store, Box::new(clock), config)?;

    let interactive = atty::is(atty::Stream::Stdin);
    if interactive {
        eprintln!("Commands: prev, next, today, week N, hover DAY HOUR, leave, put JSON, delete ID, show, quit");
    }

    let sender = app.sender();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match line.parse::<Command>() {
                Ok(command) => {
                    if sender.send(AppEvent::Command(command)).is_err() {
                        return;
                    }
                }
                Err(e) => warn!(error = %e, "ignoring command"),
            }
        }
        let _ = sender.send(AppEvent::Shutdown);
    });

    let mut stdout = io::stdout();
    app.run(|grid| {
        let _ = writeln!(stdout, "{}", grid.render_text());
        if interactive {
            let _ = write!(stdout, "> ");
        }
        let _ = stdout.flush();
    });
    Ok(())
}

fn cmd_validate(
    input: &PathBuf,
    input_format: InputFormat,
    json: bool,
) -> Result<(), HeatmapCliError> {
    let input_data = read_input(input)?;

    let documents = match input_format {
        InputFormat::Ndjson => DocumentAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => DocumentAdapter::parse_array(&input_data)?,
    };

    let results = DocumentAdapter::validate_documents(&documents);

    let report = ValidationReport {
        total_documents: documents.len(),
        valid_documents: documents.len() - results.len(),
        invalid_documents: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                id: r.id.clone(),
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total documents:   {}", report.total_documents);
        println!("Valid documents:   {}", report.valid_documents);
        println!("Invalid documents: {}", report.invalid_documents);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Document {} (index {}): {}",
                    err.id.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.invalid_documents > 0 {
        Err(HeatmapCliError::ValidationFailed(report.invalid_documents))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: &HeatmapConfig, json: bool) -> Result<(), HeatmapCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("heatmap version {}", HEATMAP_VERSION),
    });

    checks.push(match config.utc_offset() {
        Ok(offset) => DoctorCheck {
            name: "utc_offset".to_string(),
            status: CheckStatus::Ok,
            message: format!("Local time is UTC{}", offset),
        },
        Err(e) => DoctorCheck {
            name: "utc_offset".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        },
    });

    checks.push(DoctorCheck {
        name: "collection".to_string(),
        status: CheckStatus::Ok,
        message: format!("Querying collection '{}'", config.collection),
    });

    match &config.data {
        Some(path) if path.exists() => {
            let check = match fs::read_to_string(path)
                .map_err(HeatmapError::from)
                .and_then(|content| DocumentAdapter::parse_auto(&content))
            {
                Ok(documents) => {
                    let invalid = DocumentAdapter::validate_documents(&documents).len();
                    DoctorCheck {
                        name: "data".to_string(),
                        status: if invalid == 0 { CheckStatus::Ok } else { CheckStatus::Warning },
                        message: format!(
                            "{} documents ({} invalid will be skipped)",
                            documents.len(),
                            invalid
                        ),
                    }
                }
                Err(e) => DoctorCheck {
                    name: "data".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot load data file: {}", e),
                },
            };
            checks.push(check);
        }
        Some(_) => checks.push(DoctorCheck {
            name: "data".to_string(),
            status: CheckStatus::Error,
            message: "Data file does not exist".to_string(),
        }),
        None => checks.push(DoctorCheck {
            name: "data".to_string(),
            status: CheckStatus::Warning,
            message: "No data file configured; pass --data to render or watch".to_string(),
        }),
    }

    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: if atty::is(atty::Stream::Stdin) {
            "stdin is a TTY (interactive watch)".to_string()
        } else {
            "stdin is a pipe (scripted watch)".to_string()
        },
    });

    let report = DoctorReport {
        version: HEATMAP_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Heatmap Doctor Report");
        println!("=====================");
        println!("Version: {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(HeatmapCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, HeatmapCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn load_store(config: &HeatmapConfig, data: Option<PathBuf>) -> Result<MemoryStore, HeatmapCliError> {
    let path = data.or_else(|| config.data.clone()).ok_or(HeatmapCliError::NoData)?;
    let documents: Vec<StoreDocument> = DocumentAdapter::parse_auto(&fs::read_to_string(&path)?)?;
    Ok(MemoryStore::with_documents(&config.collection, documents))
}

fn format_grid(grid: &HeatmapGrid, format: &OutputFormat) -> Result<String, HeatmapCliError> {
    match format {
        OutputFormat::Text => Ok(grid.render_text()),
        OutputFormat::Json => Ok(serde_json::to_string(grid)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(grid)? + "\n"),
    }
}

// Error types

#[derive(Debug)]
enum HeatmapCliError {
    Io(io::Error),
    Heatmap(HeatmapError),
    Json(serde_json::Error),
    NoData,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for HeatmapCliError {
    fn from(e: io::Error) -> Self {
        HeatmapCliError::Io(e)
    }
}

impl From<HeatmapError> for HeatmapCliError {
    fn from(e: HeatmapError) -> Self {
        HeatmapCliError::Heatmap(e)
    }
}

impl From<serde_json::Error> for HeatmapCliError {
    fn from(e: serde_json::Error) -> Self {
        HeatmapCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<HeatmapCliError> for CliError {
    fn from(e: HeatmapCliError) -> Self {
        match e {
            HeatmapCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            HeatmapCliError::Heatmap(HeatmapError::ConfigError(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Check the config file and HEATMAP_* variables".to_string()),
            },
            HeatmapCliError::Heatmap(e) => CliError {
                code: "HEATMAP_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'heatmap validate' on the data file".to_string()),
            },
            HeatmapCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            HeatmapCliError::NoData => CliError {
                code: "NO_DATA".to_string(),
                message: "No data file given".to_string(),
                hint: Some("Pass --data or set HEATMAP_DATA".to_string()),
            },
            HeatmapCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} documents failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            HeatmapCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_documents: usize,
    valid_documents: usize,
    invalid_documents: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    id: Option<String>,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

