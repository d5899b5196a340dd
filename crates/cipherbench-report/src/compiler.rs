//! Overview compilation over one or many report files.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::overview::OverviewBuilder;
use crate::prefix::TimeUnit;
use crate::report::{ReportError, TimingReport};
use crate::stats::ReportStats;

/// Configuration of one compiler invocation.
#[derive(Debug, Clone, Default)]
pub struct CompilerConfig {
    /// Either a single report or a newline-separated list of report paths.
    pub input_file: PathBuf,
    pub show_overview: bool,
    pub silent: bool,
    /// Default unit applied where a specific one is not given.
    pub time_unit: Option<TimeUnit>,
    pub time_unit_stats: Option<TimeUnit>,
    pub time_unit_overview: Option<TimeUnit>,
    pub time_unit_summary: Option<TimeUnit>,
}

impl CompilerConfig {
    fn stats_unit(&self) -> Option<TimeUnit> {
        self.time_unit_stats.or(self.time_unit)
    }
    fn overview_unit(&self) -> Option<TimeUnit> {
        self.time_unit_overview.or(self.time_unit)
    }
    fn summary_unit(&self) -> Option<TimeUnit> {
        self.time_unit_summary.or(self.time_unit)
    }
}

/// Result of a compiler run.
#[derive(Debug)]
pub struct CompilerOutput {
    pub overview_path: PathBuf,
    pub overview_csv: String,
    pub report_count: usize,
    pub failed_count: usize,
}

/// Resolves the input into the list of report files to process.
///
/// If the file's lines name existing files (relative paths resolved
/// against the list file), those are the inputs; a later line naming a
/// missing file is an error. Otherwise the input itself is the report.
pub fn extract_input_files(input: &Path) -> Result<Vec<PathBuf>, ReportError> {
    let content = std::fs::read_to_string(input)?;
    let root = input
        .canonicalize()?
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let mut files = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut candidate = PathBuf::from(line);
        if candidate.is_relative() {
            candidate = root.join(candidate);
        }
        if candidate.is_file() {
            files.push(candidate);
        } else if files.is_empty() {
            // first non-empty line is not a file: the input itself is the report
            return Ok(vec![input.to_path_buf()]);
        } else {
            return Err(ReportError::Format {
                line: line_no + 1,
                message: format!("file specified in line not found: {}", candidate.display()),
            });
        }
    }
    if files.is_empty() {
        files.push(input.to_path_buf());
    }
    Ok(files)
}

/// Sibling output path with a trailing `report` removed from the input's
/// stem, so `report.csv` yields `summary.csv` and `run1report.csv` yields
/// `run1summary.csv`.
fn derived_path(report_path: &Path, kind: &str) -> PathBuf {
    const SUFFIX: &str = "report";
    let stem = report_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let trimmed = stem.strip_suffix(SUFFIX).unwrap_or(stem);
    report_path.with_file_name(format!("{trimmed}{kind}"))
}

/// Compiles stats, summary, and overview CSVs for every input report.
pub fn compile(config: &CompilerConfig) -> Result<CompilerOutput, ReportError> {
    let inputs = extract_input_files(&config.input_file)?;
    let mut overview_filename = config.input_file.clone();
    let overview_stem = overview_filename
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("reports")
        .to_string();
    overview_filename.set_file_name(format!("{overview_stem}_overview.csv"));

    let mut builder = OverviewBuilder::new(config.overview_unit());
    for path in &inputs {
        let filename = path.display().to_string();
        if !config.silent {
            info!(report = %filename, "loading report");
        }
        let report = match TimingReport::load_from_file(path) {
            Ok(report) => report,
            Err(err) => {
                warn!(report = %filename, error = %err, "failed to load report");
                builder.push_failed_load(&filename);
                continue;
            }
        };
        if report.event_count() == 0 {
            warn!(report = %filename, "report belongs to a failed benchmark");
            builder.push_failed_validation(&filename);
            continue;
        }

        let stats = ReportStats::new(&report)?;
        let summary_path = derived_path(path, "summary.csv");
        let stats_path = derived_path(path, "stats.csv");
        std::fs::write(&summary_path, stats.to_summary_csv(config.summary_unit()))?;
        std::fs::write(&stats_path, stats.to_stats_csv(config.stats_unit()))?;
        if !config.silent {
            info!(summary = %summary_path.display(), stats = %stats_path.display(), "wrote derived reports");
        }

        builder.push_report(&filename, &report)?;
    }

    let overview_csv = builder.to_csv();
    std::fs::write(&overview_filename, &overview_csv)?;

    Ok(CompilerOutput {
        overview_path: overview_filename,
        overview_csv,
        report_count: inputs.len(),
        failed_count: builder.failed_count(),
    })
}
