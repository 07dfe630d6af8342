//! Trends CLI - Command-line interface for Synheart Trends
//!
//! Commands:
//! - report: Build a trend report for one metric and period
//! - period: Print the interval covered by a granularity and date
//! - step: Move a reference date forwards or backwards
//! - validate: Check a records payload for malformed records
//! - doctor: Diagnose configuration and environment

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use synheart_trends::adapters::{adapter_for, PayloadFormat};
use synheart_trends::config::default_accent;
use synheart_trends::encoder::REPORT_VERSION;
use synheart_trends::navigation::step_n;
use synheart_trends::period::{parse_utc_offset, resolve_period, WeekStart};
use synheart_trends::pipeline::TrendProcessor;
use synheart_trends::types::{Direction, Granularity, MetricKind, Reduction};
use synheart_trends::{ComputeError, ViewConfig, PRODUCER_NAME, TRENDS_VERSION};

/// Trends - On-device period aggregation engine for health metrics
#[derive(Parser)]
#[command(name = "trends")]
#[command(author = "Synheart AI Inc")]
#[command(version = TRENDS_VERSION)]
#[command(about = "Aggregate health records into chart-ready trends", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Calendar flags shared by every date-aware command
#[derive(clap::Args)]
struct CalendarArgs {
    /// UTC offset of the user's local time ("UTC", "+05:30", "-08:00")
    #[arg(long)]
    utc_offset: Option<String>,

    /// First day of the week
    #[arg(long, value_enum)]
    week_start: Option<WeekStart>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a trend report for one metric and period
    Report {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input payload format
        #[arg(long, value_enum, default_value = "canonical")]
        format: PayloadFormat,

        /// View configuration file (JSON); flags override its values
        #[arg(long)]
        config: Option<PathBuf>,

        /// Metric to report on
        #[arg(long, value_enum)]
        metric: Option<MetricKind>,

        /// Period granularity
        #[arg(long, value_enum)]
        granularity: Option<Granularity>,

        /// Reference date (YYYY-MM-DD); defaults to today in the local offset
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Override the metric's default reduction
        #[arg(long, value_enum)]
        reduction: Option<Reduction>,

        /// Daily goal used for goal progress
        #[arg(long)]
        goal: Option<f64>,

        /// Emit zero buckets for days without data
        #[arg(long)]
        fill_empty_days: bool,

        #[command(flatten)]
        calendar: CalendarArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Print the interval covered by a granularity and reference date
    Period {
        /// Period granularity
        #[arg(long, value_enum)]
        granularity: Granularity,

        /// Reference date (YYYY-MM-DD); defaults to today in the local offset
        #[arg(long)]
        date: Option<NaiveDate>,

        #[command(flatten)]
        calendar: CalendarArgs,
    },

    /// Move a reference date forwards or backwards
    Step {
        /// Reference date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Unit to step by
        #[arg(long, value_enum)]
        granularity: Granularity,

        /// Step direction
        #[arg(long, value_enum)]
        direction: Direction,

        /// Number of steps
        #[arg(long, default_value = "1")]
        count: u32,
    },

    /// Check a records payload for malformed records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input payload format
        #[arg(long, value_enum, default_value = "canonical")]
        format: PayloadFormat,

        /// Metric the payload holds
        #[arg(long, value_enum)]
        metric: MetricKind,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a view configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Single-line JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), TrendsCliError> {
    match cli.command {
        Commands::Report {
            input,
            output,
            format,
            config,
            metric,
            granularity,
            date,
            reduction,
            goal,
            fill_empty_days,
            calendar,
            output_format,
        } => {
            let mut view_config = load_config(config.as_deref())?;
            if let Some(metric) = metric {
                if config.is_none() {
                    view_config.accent_color = default_accent(metric).to_string();
                }
                view_config.metric = metric;
            }
            if let Some(reduction) = reduction {
                view_config.reduction = Some(reduction);
            }
            if let Some(goal) = goal {
                view_config.daily_goal = Some(goal);
            }
            if fill_empty_days {
                view_config.fill_empty_days = true;
            }
            apply_calendar_args(&mut view_config, &calendar);

            cmd_report(
                &input,
                &output,
                format,
                view_config,
                granularity,
                date,
                output_format,
            )
        }

        Commands::Period {
            granularity,
            date,
            calendar,
        } => {
            let mut view_config = ViewConfig::default();
            apply_calendar_args(&mut view_config, &calendar);
            cmd_period(granularity, date, &view_config)
        }

        Commands::Step {
            date,
            granularity,
            direction,
            count,
        } => {
            println!("{}", step_n(date, granularity, direction, count).format("%Y-%m-%d"));
            Ok(())
        }

        Commands::Validate {
            input,
            format,
            metric,
            json,
        } => cmd_validate(&input, format, metric, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn cmd_report(
    input: &Path,
    output: &Path,
    format: PayloadFormat,
    config: ViewConfig,
    granularity: Option<Granularity>,
    date: Option<NaiveDate>,
    output_format: OutputFormat,
) -> Result<(), TrendsCliError> {
    let input_data = read_input(input)?;

    let calendar = config.calendar()?;
    let today = calendar.local_date(&Utc::now());
    let reference = date.unwrap_or(today);
    let granularity = granularity.unwrap_or(config.default_granularity);

    let mut processor = TrendProcessor::new(config, reference)?;
    let accepted = processor.ingest(&input_data, format)?;
    if accepted == 0 {
        tracing::warn!(input = %input.display(), "no valid records, emitting empty report");
    }
    processor.select_granularity(granularity, reference);
    processor.refresh();

    let report = processor.report();
    let output_data = match output_format {
        OutputFormat::Json => serde_json::to_string(&report)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&report)?,
    };

    if output.to_string_lossy() == "-" {
        println!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_period(
    granularity: Granularity,
    date: Option<NaiveDate>,
    config: &ViewConfig,
) -> Result<(), TrendsCliError> {
    let calendar = config.calendar()?;
    let reference = date.unwrap_or_else(|| calendar.local_date(&Utc::now()));
    let interval = resolve_period(granularity, reference, &calendar);

    println!("{}", serde_json::to_string_pretty(&interval)?);
    Ok(())
}

fn cmd_validate(
    input: &Path,
    format: PayloadFormat,
    metric: MetricKind,
    json: bool,
) -> Result<(), TrendsCliError> {
    let input_data = read_input(input)?;
    let outcome = adapter_for(format).parse(&input_data, metric)?;

    let report = ValidationReport {
        metric,
        valid_records: outcome.records.len(),
        skipped_records: outcome.skipped.len(),
        errors: outcome
            .skipped
            .iter()
            .map(|s| ValidationErrorDetail {
                index: s.index,
                record_id: s.id.clone(),
                error: s.reason.clone(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Metric:          {}", metric.as_str());
        println!("Valid records:   {}", report.valid_records);
        println!("Skipped records: {}", report.skipped_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Record {} (index {}): {}",
                    err.record_id.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.skipped_records > 0 {
        Err(TrendsCliError::ValidationFailed(report.skipped_records))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), TrendsCliError> {
    let mut checks: Vec<DoctorCheck> = vec![
        DoctorCheck {
            name: "trends_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Trends version {}", TRENDS_VERSION),
        },
        DoctorCheck {
            name: "report_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Report schema: {}", REPORT_VERSION),
        },
    ];

    if let Some(config_path) = config {
        checks.push(check_config(config_path));
    }

    let offset_check = match std::env::var("TRENDS_UTC_OFFSET") {
        Ok(value) => match parse_utc_offset(&value) {
            Ok(offset) => DoctorCheck {
                name: "utc_offset".to_string(),
                status: CheckStatus::Ok,
                message: format!("TRENDS_UTC_OFFSET resolves to {}", offset),
            },
            Err(e) => DoctorCheck {
                name: "utc_offset".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        },
        Err(_) => DoctorCheck {
            name: "utc_offset".to_string(),
            status: CheckStatus::Ok,
            message: "TRENDS_UTC_OFFSET not set (UTC)".to_string(),
        },
    };
    checks.push(offset_check);

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (records can be piped in)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: TRENDS_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Trends Doctor Report");
        println!("====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
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

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(TrendsCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_config(path: &Path) -> DoctorCheck {
    if !path.exists() {
        return DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: "Config file does not exist".to_string(),
        };
    }

    match fs::read_to_string(path) {
        Ok(content) => match ViewConfig::from_json(&content) {
            Ok(config) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Config valid ({}, {} reduction, offset {})",
                    config.metric.as_str(),
                    match config.reduction() {
                        Reduction::Sum => "sum",
                        Reduction::Mean => "mean",
                    },
                    config.utc_offset
                ),
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Invalid config: {}", e),
            },
        },
        Err(e) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: format!("Cannot read config file: {}", e),
        },
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, TrendsCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            tracing::warn!("reading records from an interactive terminal; end input with Ctrl-D");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn load_config(path: Option<&Path>) -> Result<ViewConfig, TrendsCliError> {
    match path {
        Some(path) => Ok(ViewConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(ViewConfig::default()),
    }
}

/// Flags win over `TRENDS_UTC_OFFSET`, which only replaces the default offset
fn apply_calendar_args(config: &mut ViewConfig, args: &CalendarArgs) {
    if let Some(offset) = &args.utc_offset {
        config.utc_offset = offset.clone();
    } else if let Ok(offset) = std::env::var("TRENDS_UTC_OFFSET") {
        if config.utc_offset == "UTC" {
            config.utc_offset = offset;
        }
    }
    if let Some(week_start) = args.week_start {
        config.week_start = week_start;
    }
}

// Error types

#[derive(Debug)]
enum TrendsCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for TrendsCliError {
    fn from(e: io::Error) -> Self {
        TrendsCliError::Io(e)
    }
}

impl From<ComputeError> for TrendsCliError {
    fn from(e: ComputeError) -> Self {
        TrendsCliError::Compute(e)
    }
}

impl From<serde_json::Error> for TrendsCliError {
    fn from(e: serde_json::Error) -> Self {
        TrendsCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<TrendsCliError> for CliError {
    fn from(e: TrendsCliError) -> Self {
        match e {
            TrendsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            TrendsCliError::Compute(e) => CliError {
                code: "COMPUTE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the payload format and view configuration".to_string()),
            },
            TrendsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            TrendsCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix or drop the listed records and retry".to_string()),
            },
            TrendsCliError::DoctorFailed => CliError {
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
    metric: MetricKind,
    valid_records: usize,
    skipped_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    record_id: Option<String>,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
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
