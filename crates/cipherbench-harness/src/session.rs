//! Session orchestration: match, run, and report every configured
//! benchmark against one backend.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use cipherbench_abi::ApiBridge;
use cipherbench_report::{OverviewBuilder, ReportStats, TimeUnit, TimingReport};

use crate::config::{BenchmarkRequest, SessionConfig};
use crate::engine::Engine;
use crate::error::{HarnessError, Result};
use crate::registry::Registry;
use crate::run::RunConfig;

/// What happened to one benchmark request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchmarkOutcome {
    Passed,
    FailedValidation,
    /// The backend errored or no descriptor matched; the benchmark was
    /// abandoned and the session moved on.
    Aborted,
}

/// Aggregate result of a session run.
#[derive(Debug, Default)]
pub struct SessionOutcome {
    pub total: usize,
    pub passed: usize,
    pub failed_validation: usize,
    pub aborted: usize,
    pub report_paths: Vec<PathBuf>,
    pub overview_path: Option<PathBuf>,
}

impl SessionOutcome {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed_validation == 0 && self.aborted == 0
    }
}

/// One benchmarking session over a single backend.
pub struct Session {
    engine: Arc<Engine>,
    output_root: PathBuf,
    run_config: RunConfig,
    single_path_report: bool,
    time_unit: Option<TimeUnit>,
}

impl Session {
    /// Initializes the backend engine with the session's initialization
    /// bytes.
    pub fn new(
        bridge: Arc<dyn ApiBridge>,
        registry: Arc<Registry>,
        config: &SessionConfig,
        output_root: impl Into<PathBuf>,
        run_config: RunConfig,
    ) -> Result<Self> {
        let engine = Engine::new(bridge, registry, &config.initialization_data)?;
        Ok(Self {
            engine,
            output_root: output_root.into(),
            run_config,
            single_path_report: false,
            time_unit: None,
        })
    }

    /// Collapse every report path to a single directory level.
    pub fn set_single_path_report(&mut self, single: bool) {
        self.single_path_report = single;
    }

    /// Time unit for derived summary/stats outputs.
    pub fn set_time_unit(&mut self, unit: Option<TimeUnit>) {
        self.time_unit = unit;
    }

    #[must_use]
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Runs every request; backend errors abort only the benchmark that
    /// raised them.
    pub fn run(&self, requests: &[BenchmarkRequest]) -> Result<SessionOutcome> {
        let mut outcome = SessionOutcome::default();
        let mut overview = OverviewBuilder::new(self.time_unit);

        for request in requests {
            outcome.total += 1;
            match self.run_one(request, &mut overview) {
                Ok((BenchmarkOutcome::Passed, path)) => {
                    outcome.passed += 1;
                    outcome.report_paths.extend(path);
                }
                Ok((BenchmarkOutcome::FailedValidation, path)) => {
                    outcome.failed_validation += 1;
                    outcome.report_paths.extend(path);
                }
                Ok((BenchmarkOutcome::Aborted, _)) => outcome.aborted += 1,
                Err(err) => {
                    // session-level failures (I/O on report write, broken
                    // configuration) still only cost this benchmark
                    error!(benchmark = request.benchmark_index, error = %err, "benchmark aborted");
                    outcome.aborted += 1;
                }
            }
        }

        let overview_path = self.output_root.join("overview.csv");
        std::fs::create_dir_all(&self.output_root)?;
        std::fs::write(&overview_path, overview.to_csv())?;
        outcome.overview_path = Some(overview_path);
        self.write_summary_json(&outcome)?;
        Ok(outcome)
    }

    /// Machine-readable session summary next to the overview.
    fn write_summary_json(&self, outcome: &SessionOutcome) -> Result<()> {
        let summary = serde_json::json!({
            "total": outcome.total,
            "passed": outcome.passed,
            "failed_validation": outcome.failed_validation,
            "aborted": outcome.aborted,
            "reports": outcome
                .report_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>(),
        });
        let body = serde_json::to_string_pretty(&summary)
            .map_err(|e| HarnessError::Config(format!("cannot serialize session summary: {e}")))?;
        std::fs::write(self.output_root.join("session_summary.json"), body)?;
        Ok(())
    }

    fn run_one(
        &self,
        request: &BenchmarkRequest,
        overview: &mut OverviewBuilder,
    ) -> Result<(BenchmarkOutcome, Option<PathBuf>)> {
        let mut config = request.configuration.clone();
        config.single_path_report = self.single_path_report;
        config.time_unit = self.time_unit;

        let Some(token) = self.engine.match_benchmark(request.benchmark_index, &config)? else {
            warn!(
                benchmark = request.benchmark_index,
                "no matching workload descriptor; skipping"
            );
            return Ok((BenchmarkOutcome::Aborted, None));
        };

        let description = token.description().clone();
        info!(
            workload = %description.workload_name,
            category = %description.category,
            "benchmark matched"
        );

        let mut report = TimingReport::new(description.header.clone());
        let run_result = self
            .engine
            .create_benchmark(&token, &mut report)
            .and_then(|mut runner| runner.run(&mut report, &self.run_config));

        let report_dir = self.output_root.join(&description.path);
        std::fs::create_dir_all(&report_dir)?;
        let report_path = report_dir.join("report.csv");

        let outcome = match run_result {
            Ok(true) => BenchmarkOutcome::Passed,
            Ok(false) => {
                warn!(workload = %description.workload_name, "validation failed");
                // failed runs serialize with the failure tag: no data rows
                report.clear();
                BenchmarkOutcome::FailedValidation
            }
            Err(HarnessError::Backend(err)) => {
                error!(workload = %description.workload_name, error = %err, "backend error; benchmark aborted");
                report.clear();
                report.append_footer(&format!("Backend error: {err}"), true);
                report.write_to_file(&report_path)?;
                overview.push_failed_validation(&report_path.display().to_string());
                return Ok((BenchmarkOutcome::Aborted, Some(report_path)));
            }
            Err(err) => return Err(err),
        };

        report.write_to_file(&report_path)?;
        if outcome == BenchmarkOutcome::Passed {
            let stats = ReportStats::new(&report)?;
            std::fs::write(
                report_dir.join("summary.csv"),
                stats.to_summary_csv(self.time_unit),
            )?;
            std::fs::write(
                report_dir.join("stats.csv"),
                stats.to_stats_csv(self.time_unit),
            )?;
        }
        overview.push_report(&report_path.display().to_string(), &report)?;
        Ok((outcome, Some(report_path)))
    }
}
