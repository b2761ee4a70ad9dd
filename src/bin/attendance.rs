//! Attendance CLI - Command-line interface for the attendance matrix engine
//!
//! Commands:
//! - report: Build the monthly absence matrix (CSV sheets or a JSON envelope)
//! - stats: Print summary statistics for a date range
//! - validate: Check raw records and list the malformed ones

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use attendance_matrix::normalizer::RecordNormalizer;
use attendance_matrix::source::{parse_array, parse_ndjson};
use attendance_matrix::types::MalformedRecord;
use attendance_matrix::{
    write_report, CsvSheetWriter, InMemorySource, RawRecord, ReportEncoder, ReportEngine,
    ReportError, ReportScope, ENGINE_VERSION,
};

/// Attendance - Monthly absence matrix reports from raw attendance records
#[derive(Parser)]
#[command(name = "attendance")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Build monthly attendance matrix reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the attendance matrix for a date range
    Report {
        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        input: InputArgs,

        /// Output format
        #[arg(long, default_value = "csv")]
        output_format: OutputFormat,

        /// Directory receiving one CSV file per month
        #[arg(long, default_value = "attendance-report")]
        out_dir: PathBuf,

        /// Output file for JSON formats (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Print summary statistics for a date range
    Stats {
        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        input: InputArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate raw attendance records
    Validate {
        #[command(flatten)]
        input: InputArgs,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct RangeArgs {
    /// First day of the report (YYYY-MM-DD, inclusive)
    #[arg(long)]
    start: NaiveDate,

    /// Last day of the report (YYYY-MM-DD, inclusive)
    #[arg(long)]
    end: NaiveDate,

    /// Restrict the report to one section (exact match)
    #[arg(long)]
    section: Option<String>,
}

impl RangeArgs {
    fn scope(&self) -> ReportScope {
        ReportScope::new(self.start, self.end, self.section.clone())
    }
}

#[derive(clap::Args)]
struct InputArgs {
    /// Input file path (use - for stdin)
    #[arg(short, long)]
    input: PathBuf,

    /// Input format
    #[arg(long, default_value = "ndjson")]
    input_format: InputFormat,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// One CSV file per month
    Csv,
    /// Compact JSON envelope
    Json,
    /// Pretty-printed JSON envelope
    JsonPretty,
}

fn main() -> ExitCode {
    init_tracing();
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

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attendance_matrix=info,attendance=info".into()),
        )
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<(), AttendanceCliError> {
    match cli.command {
        Commands::Report {
            range,
            input,
            output_format,
            out_dir,
            output,
        } => cmd_report(&range.scope(), &input, output_format, &out_dir, &output),

        Commands::Stats { range, input, json } => cmd_stats(&range.scope(), &input, json),

        Commands::Validate { input, json } => cmd_validate(&input, json),
    }
}

fn cmd_report(
    scope: &ReportScope,
    input: &InputArgs,
    output_format: OutputFormat,
    out_dir: &Path,
    output: &Path,
) -> Result<(), AttendanceCliError> {
    let engine = ReportEngine::new(InMemorySource::new(read_records(input)?));
    // Nothing touches the output location until the whole report is built
    let report = engine.generate(scope)?;

    match output_format {
        OutputFormat::Csv => {
            let mut writer = CsvSheetWriter::new(out_dir);
            write_report(&report, &mut writer)?;
            for path in writer.written() {
                println!("{}", path.display());
            }
            if !report.malformed.is_empty() {
                warn!(
                    malformed = report.malformed.len(),
                    "some records were skipped; run 'attendance validate' for details"
                );
            }
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let encoder = ReportEncoder::new();
            let data = match output_format {
                OutputFormat::JsonPretty => encoder.encode_to_json_pretty(&report)?,
                _ => encoder.encode_to_json(&report)?,
            };
            write_output(output, &data)?;
        }
    }

    Ok(())
}

fn cmd_stats(scope: &ReportScope, input: &InputArgs, json: bool) -> Result<(), AttendanceCliError> {
    let engine = ReportEngine::new(InMemorySource::new(read_records(input)?));
    let report = engine.generate(scope)?;
    let stats = &report.statistics;

    if json {
        println!("{}", serde_json::to_string_pretty(stats)?);
    } else {
        println!("Attendance Statistics");
        println!("=====================");
        println!("Range:           {}", scope);
        println!("Total events:    {}", stats.total_events);
        println!("Absences:        {}", stats.total_absences);
        println!("Presences:       {}", stats.total_presences);
        println!("Weekend events:  {}", stats.weekend_events);
        println!("Malformed:       {}", report.malformed.len());

        if !stats.absences_by_year.is_empty() {
            println!("\nAbsences by year:");
            for (year, count) in &stats.absences_by_year {
                println!("  {:<12} {}", year, count);
            }
        }
        if !stats.absences_by_section.is_empty() {
            println!("\nAbsences by section:");
            for (section, count) in &stats.absences_by_section {
                println!("  {:<12} {}", section, count);
            }
        }
    }

    Ok(())
}

fn cmd_validate(input: &InputArgs, json: bool) -> Result<(), AttendanceCliError> {
    let records = read_records(input)?;
    let batch = RecordNormalizer::normalize(&records);

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: batch.events.len(),
        invalid_records: batch.malformed_count(),
        errors: batch.malformed,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Record {} (index {}): {}",
                    err.student_key.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.reason
                );
            }
        }
    }

    if report.invalid_records > 0 {
        Err(AttendanceCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn read_records(input: &InputArgs) -> Result<Vec<RawRecord>, AttendanceCliError> {
    let data = if input.input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            warn!("reading records from an interactive terminal; end input with Ctrl-D");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(&input.input)?
    };

    let records = match input.input_format {
        InputFormat::Ndjson => parse_ndjson(&data)?,
        InputFormat::Json => parse_array(&data)?,
    };

    info!(records = records.len(), input = %input.input.display(), "loaded records");
    Ok(records)
}

fn write_output(output: &Path, data: &str) -> Result<(), AttendanceCliError> {
    if output.to_string_lossy() == "-" {
        println!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum AttendanceCliError {
    Io(io::Error),
    Report(ReportError),
    Json(serde_json::Error),
    ValidationFailed(usize),
}

impl From<io::Error> for AttendanceCliError {
    fn from(e: io::Error) -> Self {
        AttendanceCliError::Io(e)
    }
}

impl From<ReportError> for AttendanceCliError {
    fn from(e: ReportError) -> Self {
        AttendanceCliError::Report(e)
    }
}

impl From<serde_json::Error> for AttendanceCliError {
    fn from(e: serde_json::Error) -> Self {
        AttendanceCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<AttendanceCliError> for CliError {
    fn from(e: AttendanceCliError) -> Self {
        match e {
            AttendanceCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            AttendanceCliError::Report(e) => report_error(e),
            AttendanceCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            AttendanceCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix the listed records and retry".to_string()),
            },
        }
    }
}

fn report_error(e: ReportError) -> CliError {
    let (code, hint) = match &e {
        ReportError::InvalidRange { .. } => ("INVALID_RANGE", "--start must not be after --end"),
        ReportError::AggregationInvariantViolation { .. } => (
            "AGGREGATION_FAILED",
            "Report a bug with the input that triggered it",
        ),
        ReportError::Acquisition { .. } => ("ACQUISITION_FAILED", "Check the record source"),
        ReportError::ParseError(_) | ReportError::JsonError(_) => {
            ("PARSE_ERROR", "Check --input-format and the input syntax")
        }
        ReportError::EncodingError(_) => ("ENCODING_ERROR", "Retry with --output-format csv"),
        ReportError::WriteError { .. } => ("WRITE_ERROR", "Check --out-dir permissions"),
    };
    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: Some(hint.to_string()),
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<MalformedRecord>,
}
