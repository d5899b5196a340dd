//! CLI entrypoint for the report overview compiler.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use cipherbench_report::compiler::{CompilerConfig, compile};
use cipherbench_report::prefix::TimeUnit;

/// Compiles statistics, summary, and overview CSVs from benchmark reports.
#[derive(Debug, Parser)]
#[command(name = "report-compiler")]
#[command(about = "Compiles statistics and overview CSVs from cipherbench timing reports")]
struct Cli {
    /// A report CSV, or a file listing one report path per line (relative
    /// paths resolve against the list file).
    input_file: PathBuf,
    /// Default time unit for all outputs (s|ms|us|ns); auto-scaled when
    /// omitted.
    #[arg(long)]
    time_unit: Option<String>,
    /// Time unit for the overview output only.
    #[arg(long)]
    time_unit_overview: Option<String>,
    /// Time unit for the statistics outputs only.
    #[arg(long)]
    time_unit_stats: Option<String>,
    /// Time unit for the summary outputs only.
    #[arg(long)]
    time_unit_summary: Option<String>,
    /// Print the overview to stdout (true|false|1|0).
    #[arg(long, default_value = "true")]
    show_overview: String,
    /// Suppress progress output.
    #[arg(long)]
    silent: bool,
}

fn parse_unit(arg: Option<&str>) -> Result<Option<TimeUnit>, String> {
    match arg {
        None => Ok(None),
        Some(s) => TimeUnit::from_cli(s)
            .map(Some)
            .ok_or_else(|| format!("unsupported time unit '{s}', expected s|ms|us|ns")),
    }
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(format!("expected true|false|1|0, got '{other}'")),
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = CompilerConfig {
        input_file: cli.input_file.clone(),
        show_overview: parse_bool(&cli.show_overview)?,
        silent: cli.silent,
        time_unit: parse_unit(cli.time_unit.as_deref())?,
        time_unit_overview: parse_unit(cli.time_unit_overview.as_deref())?,
        time_unit_stats: parse_unit(cli.time_unit_stats.as_deref())?,
        time_unit_summary: parse_unit(cli.time_unit_summary.as_deref())?,
    };

    let output = compile(&config).map_err(|e| e.to_string())?;
    if !config.silent {
        eprintln!(
            "Processed {} report(s), {} failed; overview written to {}",
            output.report_count,
            output.failed_count,
            output.overview_path.display()
        );
    }
    if config.show_overview {
        println!("{}", output.overview_csv);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if !cli.silent {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_writer(std::io::stderr)
            .init();
    }
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::FAILURE
        }
    }
}
