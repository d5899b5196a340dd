//! CLI entrypoint for the cipherbench harness.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use cipherbench_harness::backend::ClearTextBackend;
use cipherbench_harness::config::{self, SessionConfig};
use cipherbench_harness::registry::Registry;
use cipherbench_harness::run::RunConfig;
use cipherbench_harness::session::Session;
use cipherbench_report::TimeUnit;

/// Benchmarking harness for HE compute backends.
#[derive(Debug, Parser)]
#[command(name = "cipherbench-harness")]
#[command(about = "Drives an HE backend through timed benchmark pipelines")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the benchmarks selected by a YAML session configuration
    /// against the built-in clear-text example backend.
    Run {
        /// Session configuration file.
        #[arg(long)]
        config: PathBuf,
        /// Directory receiving the report tree.
        #[arg(long, default_value = "reports")]
        output: PathBuf,
        /// Skip result validation.
        #[arg(long)]
        no_validate: bool,
        /// Write each report into a single hyphen-joined directory level.
        #[arg(long)]
        single_path: bool,
        /// Time unit for summary outputs (s|ms|us|ns); auto when omitted.
        #[arg(long)]
        time_unit: Option<String>,
    },
    /// List the benchmarks the example backend advertises.
    List,
    /// Write a session configuration template covering every advertised
    /// benchmark.
    ExportConfig {
        /// Output YAML path.
        #[arg(long)]
        output: PathBuf,
    },
}

fn run(cli: &Cli) -> Result<(), String> {
    match &cli.command {
        Command::Run {
            config,
            output,
            no_validate,
            single_path,
            time_unit,
        } => {
            let time_unit = match time_unit.as_deref() {
                None => None,
                Some(s) => Some(
                    TimeUnit::from_cli(s)
                        .ok_or_else(|| format!("unsupported time unit '{s}'"))?,
                ),
            };
            let session_config = config::import_yaml(config).map_err(|e| e.to_string())?;
            let bridge = Arc::new(ClearTextBackend::with_default_benchmarks());
            let registry = Arc::new(Registry::with_all_workloads());
            let mut session = Session::new(
                bridge,
                registry,
                &session_config,
                output.clone(),
                RunConfig {
                    validate_results: !no_validate,
                },
            )
            .map_err(|e| e.to_string())?;
            session.set_single_path_report(*single_path);
            session.set_time_unit(time_unit);

            let outcome = session.run(&session_config.requests).map_err(|e| e.to_string())?;
            eprintln!(
                "Benchmarks: {} total, {} passed, {} failed validation, {} aborted",
                outcome.total, outcome.passed, outcome.failed_validation, outcome.aborted
            );
            if let Some(path) = &outcome.overview_path {
                eprintln!("Overview: {}", path.display());
            }
            if !outcome.all_passed() {
                return Err(String::from("one or more benchmarks did not pass"));
            }
            Ok(())
        }
        Command::List => {
            let bridge = Arc::new(ClearTextBackend::with_default_benchmarks());
            let registry = Arc::new(Registry::with_all_workloads());
            let session_config = SessionConfig {
                random_seed: 0,
                default_min_test_time_ms: 0,
                default_sample_size: 0,
                initialization_data: Vec::new(),
                requests: Vec::new(),
            };
            let session = Session::new(
                bridge,
                registry,
                &session_config,
                PathBuf::from("."),
                RunConfig::default(),
            )
            .map_err(|e| e.to_string())?;
            let engine = session.engine();
            let count = engine.count_benchmarks().map_err(|e| e.to_string())?;
            println!("{count} benchmark(s) advertised:");
            for index in 0..count {
                let desc = engine.describe_benchmark(index).map_err(|e| e.to_string())?;
                let scheme = engine
                    .scheme_name(desc.descriptor.scheme)
                    .map_err(|e| e.to_string())?;
                let security = engine
                    .security_name(desc.descriptor.scheme, desc.descriptor.security)
                    .map_err(|e| e.to_string())?;
                println!(
                    "  {index}: {:?} / {} / {} / {scheme} / {security}",
                    desc.descriptor.workload,
                    desc.descriptor.category.name(),
                    desc.descriptor.data_type.name(),
                );
            }
            Ok(())
        }
        Command::ExportConfig { output } => {
            let template = default_config_template();
            config::export_yaml(&template, output).map_err(|e| e.to_string())?;
            eprintln!("Wrote configuration template to {}", output.display());
            Ok(())
        }
    }
}

/// A runnable template: one request per advertised benchmark with the
/// workload parameters the example backend expects.
fn default_config_template() -> SessionConfig {
    use cipherbench_abi::WorkloadParam;
    use cipherbench_harness::config::BenchmarkRequest;
    use cipherbench_harness::description::Configuration;

    let base = Configuration {
        default_min_test_time_ms: 200,
        random_seed: 0xDEAD_BEEF,
        ..Configuration::default()
    };
    let with_params = |params: Vec<WorkloadParam>| Configuration {
        w_params: params,
        ..base.clone()
    };

    SessionConfig {
        random_seed: 0xDEAD_BEEF,
        default_min_test_time_ms: 200,
        default_sample_size: 10,
        initialization_data: Vec::new(),
        requests: vec![
            BenchmarkRequest {
                benchmark_index: 0,
                configuration: with_params(vec![WorkloadParam::uint("n", 1_000)]),
            },
            BenchmarkRequest {
                benchmark_index: 1,
                configuration: with_params(vec![WorkloadParam::uint("n", 1_000)]),
            },
            BenchmarkRequest {
                benchmark_index: 2,
                configuration: with_params(vec![WorkloadParam::uint("n", 128)]),
            },
            BenchmarkRequest {
                benchmark_index: 3,
                configuration: with_params(vec![WorkloadParam::uint("n", 128)]),
            },
            BenchmarkRequest {
                benchmark_index: 4,
                configuration: with_params(vec![WorkloadParam::uint("n", 16)]),
            },
            BenchmarkRequest {
                benchmark_index: 5,
                configuration: with_params(vec![
                    WorkloadParam::uint("n", 64),
                    WorkloadParam::uint("m", 96),
                    WorkloadParam::uint("k", 4),
                ]),
            },
        ],
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::FAILURE
        }
    }
}
