//! Per-event-type statistics and the stats/summary CSV writers.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::prefix::{TimeUnit, timing_prefix_with};
use crate::report::{ReportError, TimingReport};

/// Statistics over one sequence of per-sample observations (seconds).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatisticsResult {
    pub total: f64,
    pub mean: f64,
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub pct_1: f64,
    pub pct_10: f64,
    pub pct_90: f64,
    pub pct_99: f64,
    pub mean_trim: f64,
    pub variance_trim: f64,
    pub samples_per_sec: f64,
    pub samples_per_sec_trim: f64,
    pub input_sample_count: u64,
}

/// Percentile by linear interpolation on sorted values.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

fn mean_variance(data: &[f64]) -> (f64, f64, f64) {
    if data.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let total: f64 = data.iter().sum();
    let mean = total / data.len() as f64;
    let variance =
        data.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / data.len() as f64;
    (total, mean, variance)
}

/// Computes the full statistics set over `data`.
///
/// Trimmed figures discard the lowest and highest `n / 10` samples. The
/// 99th-percentile column is evaluated at q = 0.95; loaders of these CSVs
/// rely on the historical behavior, so changing it means a format bump.
#[must_use]
pub fn compute_stats(data: &[f64]) -> StatisticsResult {
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let trim = sorted.len() / 10;
    let trimmed = &sorted[trim..sorted.len() - trim];

    let (total, mean, variance) = mean_variance(data);
    let (total_trim, mean_trim, variance_trim) = mean_variance(trimmed);

    StatisticsResult {
        total,
        mean,
        variance,
        min: sorted.first().copied().unwrap_or(0.0),
        max: sorted.last().copied().unwrap_or(0.0),
        median: percentile(&sorted, 0.5),
        pct_1: percentile(&sorted, 0.01),
        pct_10: percentile(&sorted, 0.1),
        pct_90: percentile(&sorted, 0.9),
        pct_99: percentile(&sorted, 0.95),
        mean_trim,
        variance_trim,
        samples_per_sec: if total == 0.0 {
            0.0
        } else {
            data.len() as f64 / total
        },
        samples_per_sec_trim: if total_trim == 0.0 {
            0.0
        } else {
            trimmed.len() as f64 / total_trim
        },
        input_sample_count: data.len() as u64,
    }
}

/// Wall or CPU statistics block of one event type.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeStats {
    pub mean: f64,
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub pct_1: f64,
    pub pct_10: f64,
    pub pct_90: f64,
    pub pct_99: f64,
    pub mean_trim: f64,
    pub variance_trim: f64,
}

impl From<StatisticsResult> for TimeStats {
    fn from(s: StatisticsResult) -> Self {
        TimeStats {
            mean: s.mean,
            variance: s.variance,
            min: s.min,
            max: s.max,
            median: s.median,
            pct_1: s.pct_1,
            pct_10: s.pct_10,
            pct_90: s.pct_90,
            pct_99: s.pct_99,
            mean_trim: s.mean_trim,
            variance_trim: s.variance_trim,
        }
    }
}

/// Complete statistics for one event type of a report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTypeStats {
    pub event_id: u32,
    pub name: String,
    /// Total wall time in seconds across all samples.
    pub total_time: f64,
    pub ops_per_sec: f64,
    pub ops_per_sec_trim: f64,
    pub wall: TimeStats,
    pub cpu: TimeStats,
    pub input_sample_count: u64,
}

/// Statistics pipeline over one loaded report.
///
/// Groups events by type id, expands each event into
/// `input_sample_count` per-unit observations, and computes wall and CPU
/// statistics independently.
#[derive(Debug, Clone)]
pub struct ReportStats {
    header: String,
    footer: String,
    main_event_type_id: u32,
    stats: Vec<EventTypeStats>,
    index_by_id: BTreeMap<u32, usize>,
}

impl ReportStats {
    pub fn new(report: &TimingReport) -> Result<Self, ReportError> {
        if report.event_count() == 0 {
            return Err(ReportError::InvalidArgument(String::from(
                "report belongs to a failed benchmark",
            )));
        }

        let mut wall_events: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        let mut cpu_events: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for event in report.events() {
            let samples = event.input_sample_count.max(1);
            let wall = event.elapsed_wall_secs() / samples as f64;
            let cpu = event.elapsed_cpu_secs() / samples as f64;
            let wall_bucket = wall_events.entry(event.event_type_id).or_default();
            let cpu_bucket = cpu_events.entry(event.event_type_id).or_default();
            for _ in 0..samples {
                wall_bucket.push(wall);
                cpu_bucket.push(cpu);
            }
        }

        let mut stats = Vec::with_capacity(wall_events.len());
        let mut index_by_id = BTreeMap::new();
        for (id, wall_obs) in &wall_events {
            let cpu_obs = &cpu_events[id];
            let wall_stats = compute_stats(wall_obs);
            let cpu_stats = compute_stats(cpu_obs);
            index_by_id.insert(*id, stats.len());
            stats.push(EventTypeStats {
                event_id: *id,
                name: report.event_type_header(*id).unwrap_or("").to_string(),
                total_time: wall_stats.total,
                ops_per_sec: wall_stats.samples_per_sec,
                ops_per_sec_trim: wall_stats.samples_per_sec_trim,
                wall: wall_stats.into(),
                cpu: cpu_stats.into(),
                input_sample_count: wall_stats.input_sample_count,
            });
        }

        let main_event_type_id = report
            .main_event_id()
            .filter(|id| index_by_id.contains_key(id))
            .or_else(|| index_by_id.keys().next().copied())
            .unwrap_or_default();

        Ok(Self {
            header: report.header().to_string(),
            footer: report.footer().to_string(),
            main_event_type_id,
            stats,
            index_by_id,
        })
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn footer(&self) -> &str {
        &self.footer
    }

    pub fn event_type_stats(&self) -> &[EventTypeStats] {
        &self.stats
    }

    pub fn stats_by_id(&self, id: u32) -> Option<&EventTypeStats> {
        self.index_by_id.get(&id).map(|i| &self.stats[*i])
    }

    #[must_use]
    pub fn main_event_stats(&self) -> &EventTypeStats {
        self.stats_by_id(self.main_event_type_id)
            .unwrap_or(&self.stats[0])
    }

    fn preamble(&self, out: &mut String) {
        let main = self.main_event_stats();
        let _ = writeln!(out, "{}", self.header);
        let _ = writeln!(out);
        let _ = writeln!(out, "Notes");
        let _ = writeln!(out, "{}", self.footer);
        let _ = writeln!(out);
        let _ = writeln!(out, "Main event,{},{}", main.event_id, main.name);
        let _ = writeln!(out);
    }

    /// Full statistics CSV: one row per event type, wall and CPU blocks.
    #[must_use]
    pub fn to_stats_csv(&self, unit: Option<TimeUnit>) -> String {
        let mut out = String::new();
        self.preamble(&mut out);
        let _ = writeln!(out, ",,,,,Wall Time,,,,,,,,,,,,,CPU Time");
        let _ = writeln!(
            out,
            "ID,Event,Total Wall Time,Samples per sec,Samples per sec trimmed,\
Average,Standard Deviation,Time Unit,Time Factor,Min,Max,Median,\
Trimmed Average,Trimmed Standard Deviation,\
1-th percentile,10-th percentile,90-th percentile,99-th percentile,\
Average,Standard Deviation,Time Unit,Time Factor,Min,Max,Median,\
Trimmed Average,Trimmed Standard Deviation,\
1-th percentile,10-th percentile,90-th percentile,99-th percentile,Input Samples"
        );
        for stats in &self.stats {
            let _ = writeln!(out, "{}", format_stats_row(stats, unit));
        }
        out
    }

    /// Trimmed summary CSV: mean, deviation, unit, and throughput only.
    #[must_use]
    pub fn to_summary_csv(&self, unit: Option<TimeUnit>) -> String {
        let mut out = String::new();
        self.preamble(&mut out);
        let _ = writeln!(out, ",,,Wall Time,,,,CPU Time");
        let _ = writeln!(
            out,
            "ID,Event,Samples per sec,\
Average,Standard Deviation,Time Unit,Time Factor,\
Average,Standard Deviation,Time Unit,Time Factor,Input Samples"
        );
        for stats in &self.stats {
            let _ = writeln!(out, "{}", format_summary_row(stats, unit));
        }
        out
    }
}

fn csv_name(name: &str) -> String {
    if name.contains(',') || name.contains('"') {
        format!("\"{}\"", name.replace('"', "\"\""))
    } else {
        name.to_string()
    }
}

/// One statistics CSV row (no trailing newline); shared with the overview.
#[must_use]
pub fn format_stats_row(stats: &EventTypeStats, unit: Option<TimeUnit>) -> String {
    let wall = timing_prefix_with(stats.wall.mean, unit);
    let cpu = timing_prefix_with(stats.cpu.mean, unit);
    let wd = wall.ratio_den as f64;
    let cd = cpu.ratio_den as f64;
    format!(
        "{},{},{},{},{},\
{},{},{}s,{},{},{},{},{},{},{},{},{},{},\
{},{},{}s,{},{},{},{},{},{},{},{},{},{},{}",
        stats.event_id,
        csv_name(&stats.name),
        stats.total_time * wd,
        stats.ops_per_sec,
        stats.ops_per_sec_trim,
        stats.wall.mean * wd,
        stats.wall.variance.sqrt() * wd,
        wall.symbol(),
        1.0 / wd,
        stats.wall.min * wd,
        stats.wall.max * wd,
        stats.wall.median * wd,
        stats.wall.mean_trim * wd,
        stats.wall.variance_trim.sqrt() * wd,
        stats.wall.pct_1 * wd,
        stats.wall.pct_10 * wd,
        stats.wall.pct_90 * wd,
        stats.wall.pct_99 * wd,
        stats.cpu.mean * cd,
        stats.cpu.variance.sqrt() * cd,
        cpu.symbol(),
        1.0 / cd,
        stats.cpu.min * cd,
        stats.cpu.max * cd,
        stats.cpu.median * cd,
        stats.cpu.mean_trim * cd,
        stats.cpu.variance_trim.sqrt() * cd,
        stats.cpu.pct_1 * cd,
        stats.cpu.pct_10 * cd,
        stats.cpu.pct_90 * cd,
        stats.cpu.pct_99 * cd,
        stats.input_sample_count,
    )
}

#[must_use]
pub fn format_summary_row(stats: &EventTypeStats, unit: Option<TimeUnit>) -> String {
    let wall = timing_prefix_with(stats.wall.mean, unit);
    let cpu = timing_prefix_with(stats.cpu.mean, unit);
    let wd = wall.ratio_den as f64;
    let cd = cpu.ratio_den as f64;
    format!(
        "{},{},{},{},{},{}s,{},{},{},{}s,{},{}",
        stats.event_id,
        csv_name(&stats.name),
        stats.ops_per_sec,
        stats.wall.mean * wd,
        stats.wall.variance.sqrt() * wd,
        wall.symbol(),
        1.0 / wd,
        stats.cpu.mean * cd,
        stats.cpu.variance.sqrt() * cd,
        cpu.symbol(),
        1.0 / cd,
        stats.input_sample_count,
    )
}
