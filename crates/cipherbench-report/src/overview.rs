//! The many-report overview: header parsing and the incremental builder.

use std::fmt::Write as _;

use crate::prefix::TimeUnit;
use crate::report::{ReportError, TimingReport, split_csv};
use crate::stats::{ReportStats, format_stats_row};

/// Workload-tagged fields recovered from a report's header text.
///
/// The header is the multi-line CSV block the matcher generated for the
/// benchmark; rows look like `, Workload, Dot Product (100)` or
/// `, , Scheme, CKKS`. Workload parameters are recovered from the
/// parenthesized tail of the decorated workload name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverviewHeader {
    pub workload_name: String,
    pub filename: String,
    pub category: String,
    pub data_type: String,
    pub cipher_text: String,
    pub scheme: String,
    pub security: String,
    pub extra: String,
    pub w_params: Vec<String>,
}

impl OverviewHeader {
    #[must_use]
    pub fn parse(filename: &str, header_text: &str) -> Self {
        let mut out = OverviewHeader {
            filename: filename.to_string(),
            ..Self::default()
        };
        for line in header_text.lines() {
            let Some((key, value)) = parse_keyed_row(line) else {
                continue;
            };
            let slot = match key.as_str() {
                "Workload" => &mut out.workload_name,
                "Category" => &mut out.category,
                "Data type" => &mut out.data_type,
                "Encrypted op parameters (index)" => &mut out.cipher_text,
                "Scheme" => &mut out.scheme,
                "Security" => &mut out.security,
                "Extra" => &mut out.extra,
                _ => continue,
            };
            if slot.is_empty() {
                *slot = value;
            }
        }
        out.w_params = parse_workload_params(&out.workload_name);
        out
    }

    /// Writes the fixed prefix cells of an overview row.
    #[must_use]
    pub fn row_cells(&self) -> String {
        [
            &self.workload_name,
            &self.filename,
            &self.category,
            &self.data_type,
            &self.cipher_text,
            &self.scheme,
            &self.security,
            &self.extra,
        ]
        .iter()
        .map(|v| quote(v))
        .collect::<Vec<_>>()
        .join(",")
    }
}

fn quote(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Splits a header row into its first non-empty cell (the key) and the
/// remainder re-joined as the value.
fn parse_keyed_row(line: &str) -> Option<(String, String)> {
    let fields = split_csv(line);
    let key_idx = fields.iter().position(|f| !f.is_empty())?;
    if key_idx + 1 >= fields.len() {
        return None;
    }
    let key = fields[key_idx].clone();
    let value = fields[key_idx + 1..].join(", ");
    Some((key, value))
}

/// Recovers workload parameters from the parenthesized tail of a decorated
/// workload name, e.g. `"Element-wise Addition (1000)"` → `["1000"]`.
fn parse_workload_params(workload_name: &str) -> Vec<String> {
    let open = match workload_name.rfind('(') {
        Some(i) => i,
        None => return Vec::new(),
    };
    let close = match workload_name[open..].find(')') {
        Some(i) => open + i,
        None => return Vec::new(),
    };
    workload_name[open + 1..close]
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

enum OverviewRow {
    Failed {
        filename: String,
        stage: &'static str,
    },
    Data {
        prefix_cells: String,
        stats_row: String,
        w_params: Vec<String>,
    },
}

/// Incremental overview compiler.
///
/// One row per input report; the workload-parameter column set widens as
/// reports with more parameters are pushed, and earlier rows are padded
/// with empty cells on output.
pub struct OverviewBuilder {
    time_unit: Option<TimeUnit>,
    max_w_params: usize,
    rows: Vec<OverviewRow>,
}

/// Number of fixed columns before the appended main-event statistics row.
const PREFIX_COLUMNS: usize = 8;
/// Number of columns in one statistics row.
const STATS_COLUMNS: usize = 32;

impl OverviewBuilder {
    #[must_use]
    pub fn new(time_unit: Option<TimeUnit>) -> Self {
        Self {
            time_unit,
            max_w_params: 0,
            rows: Vec::new(),
        }
    }

    /// Records a report that failed validation (no events recorded).
    pub fn push_failed_validation(&mut self, filename: &str) {
        self.rows.push(OverviewRow::Failed {
            filename: filename.to_string(),
            stage: "Validation",
        });
    }

    /// Records a report file that could not be loaded.
    pub fn push_failed_load(&mut self, filename: &str) {
        self.rows.push(OverviewRow::Failed {
            filename: filename.to_string(),
            stage: "Load",
        });
    }

    /// Adds one loaded report: parses its overview header and appends the
    /// main event's statistics row.
    pub fn push_report(&mut self, filename: &str, report: &TimingReport) -> Result<(), ReportError> {
        if report.event_count() == 0 {
            self.push_failed_validation(filename);
            return Ok(());
        }
        let stats = ReportStats::new(report)?;
        let header = OverviewHeader::parse(filename, report.header());
        self.max_w_params = self.max_w_params.max(header.w_params.len());
        self.rows.push(OverviewRow::Data {
            prefix_cells: header.row_cells(),
            stats_row: format_stats_row(stats.main_event_stats(), self.time_unit),
            w_params: header.w_params,
        });
        Ok(())
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn max_workload_params(&self) -> usize {
        self.max_w_params
    }

    /// Number of reports recorded as failed (either stage).
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| matches!(r, OverviewRow::Failed { .. }))
            .count()
    }

    #[must_use]
    pub fn to_csv(&self) -> String {
        let total_columns = PREFIX_COLUMNS + STATS_COLUMNS + self.max_w_params;
        let mut out = String::new();

        // group banner: "Wall Time" over the wall Average column, "CPU
        // Time" over the CPU Average column
        let _ = writeln!(
            out,
            "{}Wall Time{}CPU Time",
            ",".repeat(PREFIX_COLUMNS + 5),
            ",".repeat(13)
        );
        let mut header = String::from(
            "Workload,Filename,Category,Data type,Cipher text,Scheme,Security,Extra,\
ID,Event,Total Wall Time,Samples per sec,Samples per sec trimmed,\
Average,Standard Deviation,Time Unit,Time Factor,Min,Max,Median,\
Trimmed Average,Trimmed Standard Deviation,\
1-th percentile,10-th percentile,90-th percentile,99-th percentile,\
Average,Standard Deviation,Time Unit,Time Factor,Min,Max,Median,\
Trimmed Average,Trimmed Standard Deviation,\
1-th percentile,10-th percentile,90-th percentile,99-th percentile,Input Samples",
        );
        for i in 0..self.max_w_params {
            let _ = write!(header, ",wp{i}");
        }
        let _ = writeln!(out, "{header}");

        for row in &self.rows {
            let mut cells = match row {
                OverviewRow::Failed { filename, stage } => {
                    format!("Failed,{},{}", quote(filename), stage)
                }
                OverviewRow::Data {
                    prefix_cells,
                    stats_row,
                    w_params,
                } => {
                    let mut s = format!("{prefix_cells},{stats_row}");
                    for p in w_params {
                        let _ = write!(s, ",{}", quote(p));
                    }
                    s
                }
            };
            // pad every row to the full column count
            let have = split_csv(&cells).len();
            for _ in have..total_columns {
                cells.push(',');
            }
            let _ = writeln!(out, "{cells}");
        }
        out
    }
}
