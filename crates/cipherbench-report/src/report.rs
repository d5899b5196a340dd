//! The timing-report model and its tagged-CSV round trip.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use thiserror::Error;

use crate::event::TimingEvent;

/// Version marker; exact match required on load.
pub const TAG_VERSION: &str = "#v,0,1,1";
/// Start of the header text block.
pub const TAG_HEADER: &str = "#0100";
/// The run failed validation; no data rows follow.
pub const TAG_FAILED: &str = "#XXXX";
/// Start of the tabular event section.
pub const TAG_DATA: &str = "#0200";
/// Start of the footer text block.
pub const TAG_FOOTER: &str = "#8E00";
/// End of report.
pub const TAG_END: &str = "#8FFF";

const DATA_TABLE_HEADER: &str = ",idx,ID,Event,Description,Time ratio num,Time ratio den,\
Wall time start,Wall time end,Elapsed wall time,\
CPU time start,CPU time end,Elapsed CPU time,Iterations";

/// Sentinel serialized when no main event type was ever set.
const MAIN_EVENT_UNSET: u64 = u32::MAX as u64;

/// Errors produced by report serialization, parsing, and file I/O.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("line {line}: {message}")]
    Format { line: usize, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ReportError {
    fn format(line: usize, message: impl Into<String>) -> Self {
        ReportError::Format {
            line,
            message: message.into(),
        }
    }
}

/// Append-only event log with typed event kinds and a main-event marker.
///
/// Invariant: every recorded event's type id has a header entry by the time
/// the report is serialized ([`TimingReport::add_event`] registers missing
/// ids on the fly).
#[derive(Debug, Clone, Default)]
pub struct TimingReport {
    header: String,
    footer: String,
    main_event: Option<u32>,
    event_headers: BTreeMap<u32, String>,
    events: Vec<TimingEvent>,
}

impl TimingReport {
    #[must_use]
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            ..Self::default()
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn set_header(&mut self, header: impl Into<String>) {
        self.header = header.into();
    }

    pub fn append_header(&mut self, text: &str, new_line: bool) {
        if new_line {
            self.header.push('\n');
        }
        self.header.push_str(text);
    }

    pub fn prepend_header(&mut self, text: &str, new_line: bool) {
        let mut s = String::from(text);
        if new_line {
            s.push('\n');
        }
        s.push_str(&self.header);
        self.header = s;
    }

    pub fn footer(&self) -> &str {
        &self.footer
    }

    pub fn set_footer(&mut self, footer: impl Into<String>) {
        self.footer = footer.into();
    }

    pub fn append_footer(&mut self, text: &str, new_line: bool) {
        if new_line {
            self.footer.push('\n');
        }
        self.footer.push_str(text);
    }

    pub fn prepend_footer(&mut self, text: &str, new_line: bool) {
        let mut s = String::from(text);
        if new_line {
            s.push('\n');
        }
        s.push_str(&self.footer);
        self.footer = s;
    }

    /// Registers an event type. Re-adding an id overwrites its header and
    /// marks it main only if requested. The first type ever added becomes
    /// main by default.
    pub fn add_event_type(&mut self, id: u32, header: impl Into<String>, is_main: bool) {
        self.event_headers.insert(id, header.into());
        if is_main || self.main_event.is_none() {
            self.main_event = Some(id);
        }
    }

    #[must_use]
    pub fn main_event_id(&self) -> Option<u32> {
        self.main_event
    }

    pub fn event_type_header(&self, id: u32) -> Option<&str> {
        self.event_headers.get(&id).map(String::as_str)
    }

    pub fn event_types(&self) -> impl Iterator<Item = (u32, &str)> {
        self.event_headers.iter().map(|(id, h)| (*id, h.as_str()))
    }

    #[must_use]
    pub fn event_type_count(&self) -> usize {
        self.event_headers.len()
    }

    /// Appends an event, registering its type under `type_header` when the
    /// id is new or a non-empty header is supplied.
    pub fn add_event(&mut self, event: TimingEvent, type_header: &str) {
        if !self.event_headers.contains_key(&event.event_type_id) || !type_header.is_empty() {
            self.add_event_type(event.event_type_id, type_header, false);
        }
        self.events.push(event);
    }

    /// Reserves capacity for `additional` more events so the measurement
    /// loop does not reallocate mid-flight.
    pub fn reserve(&mut self, additional: usize) {
        self.events.reserve(additional);
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.events.capacity()
    }

    /// Drops all recorded events; header, footer, and event types remain.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn get_event(&self, index: usize) -> Option<&TimingEvent> {
        self.events.get(index)
    }

    pub fn events(&self) -> &[TimingEvent] {
        &self.events
    }

    /// Serializes the report to the tagged CSV format.
    ///
    /// A report with zero events serializes with the failure tag and no
    /// data rows.
    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{TAG_VERSION}");
        let _ = writeln!(out, "Events recorded,{}", self.events.len());
        let _ = writeln!(
            out,
            "Main event,{}",
            self.main_event.map_or(MAIN_EVENT_UNSET, u64::from)
        );
        let _ = writeln!(out, "{TAG_HEADER}");
        let _ = writeln!(out, "{}", self.header);
        if self.events.is_empty() {
            let _ = writeln!(out, "{TAG_FAILED}");
            let _ = writeln!(out, "Failed");
        } else {
            let _ = writeln!(out, "{TAG_DATA}");
            let _ = writeln!(out, "{DATA_TABLE_HEADER}");
            for (i, event) in self.events.iter().enumerate() {
                let header = self
                    .event_headers
                    .get(&event.event_type_id)
                    .map(String::as_str)
                    .unwrap_or("");
                let _ = writeln!(
                    out,
                    ",{},{},{},{},{},{},{},{},{},{},{},{},{}",
                    i,
                    event.event_type_id,
                    quote_csv(header),
                    quote_csv(&event.description),
                    event.time_interval_ratio_num,
                    event.time_interval_ratio_den,
                    event.wall_time_start,
                    event.wall_time_end,
                    event.wall_time_end - event.wall_time_start,
                    event.cpu_time_start,
                    event.cpu_time_end,
                    event.cpu_time_end - event.cpu_time_start,
                    event.input_sample_count,
                );
            }
        }
        let _ = writeln!(out, "{TAG_FOOTER}");
        let _ = writeln!(out, "{}", self.footer);
        let _ = writeln!(out, "{TAG_END}");
        out
    }

    /// Parses a report from its tagged CSV form.
    ///
    /// Enforces the version marker, the presence of every structural tag,
    /// and that the recorded event count matches the number of data rows.
    pub fn from_csv(content: &str) -> Result<Self, ReportError> {
        let lines: Vec<&str> = content.lines().collect();
        let mut pos = 0usize;

        let version = next_trimmed_line(&lines, &mut pos)
            .ok_or_else(|| ReportError::format(pos, "unexpected end of report"))?;
        if version != TAG_VERSION {
            return Err(ReportError::format(
                pos,
                format!("invalid report version; expected \"{TAG_VERSION}\", read \"{version}\""),
            ));
        }

        let line = next_trimmed_line(&lines, &mut pos)
            .ok_or_else(|| ReportError::format(pos, "unexpected end of report"))?;
        let (_, events_recorded) = parse_heading_u64(&line, pos)?;

        let line = next_trimmed_line(&lines, &mut pos)
            .ok_or_else(|| ReportError::format(pos, "unexpected end of report"))?;
        let (_, main_event_raw) = parse_heading_u64(&line, pos)?;

        let (_, tag) = read_text_block(&lines, &mut pos, &[TAG_HEADER]);
        if tag.is_none() {
            return Err(ReportError::format(
                pos,
                "report header not found; end of report reached",
            ));
        }

        let (header, tag) = read_text_block(&lines, &mut pos, &[TAG_DATA, TAG_FAILED]);
        let mut report = TimingReport::new(header);

        match tag {
            Some(TAG_FAILED) => {
                // skip content until the footer tag
                while pos < lines.len() && trim_line(lines[pos]) != TAG_FOOTER {
                    pos += 1;
                }
                if pos >= lines.len() {
                    return Err(ReportError::format(
                        pos,
                        "report footer not found; end of report reached",
                    ));
                }
                pos += 1; // consume the footer tag
            }
            Some(TAG_DATA) => {
                // skip the data table header
                let _ = next_trimmed_line(&lines, &mut pos);
                if main_event_raw != MAIN_EVENT_UNSET {
                    let id = u32::try_from(main_event_raw).map_err(|_| {
                        ReportError::format(pos, format!("main event id {main_event_raw} out of range"))
                    })?;
                    report.add_event_type(id, "", true);
                }
                loop {
                    let Some(raw) = lines.get(pos) else {
                        return Err(ReportError::format(
                            pos,
                            "report footer not found; end of report reached",
                        ));
                    };
                    pos += 1;
                    if trim_line(raw) == TAG_FOOTER {
                        break;
                    }
                    let (type_header, event) = parse_event_row(raw, pos)?;
                    report.add_event(event, &type_header);
                }
                if report.event_count() as u64 != events_recorded {
                    return Err(ReportError::format(
                        pos,
                        format!(
                            "inconsistent number of events; expected {events_recorded}, read {}",
                            report.event_count()
                        ),
                    ));
                }
            }
            _ => {
                return Err(ReportError::format(
                    pos,
                    "report data section not found; end of report reached",
                ));
            }
        }

        let (footer, _) = read_text_block(&lines, &mut pos, &[TAG_END]);
        report.set_footer(footer);
        Ok(report)
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        std::fs::write(path, self.to_csv())?;
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_csv(&content)
    }
}

fn quote_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Trims whitespace and stray separator commas off a structural line.
fn trim_line(line: &str) -> &str {
    line.trim_matches(|c: char| c.is_whitespace() || c == ',')
}

fn next_trimmed_line<'a>(lines: &[&'a str], pos: &mut usize) -> Option<&'a str> {
    let line = lines.get(*pos)?;
    *pos += 1;
    Some(trim_line(line))
}

/// Reads raw lines until one of `tags` is found (joined with `\n`).
/// Returns the block and the tag that terminated it, if any.
fn read_text_block<'a>(
    lines: &[&str],
    pos: &mut usize,
    tags: &[&'a str],
) -> (String, Option<&'a str>) {
    let mut block = String::new();
    let mut first = true;
    while let Some(raw) = lines.get(*pos) {
        *pos += 1;
        let trimmed = trim_line(raw);
        if let Some(tag) = tags.iter().find(|t| **t == trimmed) {
            return (block, Some(tag));
        }
        if first {
            first = false;
        } else {
            block.push('\n');
        }
        block.push_str(raw);
    }
    (block, None)
}

/// Splits one CSV line into trimmed, unquoted fields.
pub(crate) fn split_csv(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let bytes: Vec<char> = line.chars().collect();
    let mut i = 0usize;
    let n = bytes.len();
    loop {
        // skip leading whitespace of the field
        while i < n && bytes[i] != ',' && bytes[i].is_whitespace() {
            i += 1;
        }
        let mut value = String::new();
        if i < n && bytes[i] == '"' {
            i += 1;
            while i < n {
                if bytes[i] == '"' {
                    if i + 1 < n && bytes[i + 1] == '"' {
                        value.push('"');
                        i += 2;
                    } else {
                        i += 1;
                        break;
                    }
                } else {
                    value.push(bytes[i]);
                    i += 1;
                }
            }
            // skip anything until the separator
            while i < n && bytes[i] != ',' {
                i += 1;
            }
        } else {
            while i < n && bytes[i] != ',' {
                value.push(bytes[i]);
                i += 1;
            }
            value = value.trim().to_string();
        }
        fields.push(value);
        if i >= n {
            break;
        }
        i += 1; // consume the separator
        if i == n {
            fields.push(String::new());
            break;
        }
    }
    fields
}

/// Parses a `<heading>,<u64>` line.
fn parse_heading_u64(line: &str, line_no: usize) -> Result<(String, u64), ReportError> {
    let fields = split_csv(line);
    let heading = fields.first().cloned().unwrap_or_default();
    let value = fields
        .get(1)
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or_else(|| {
            ReportError::format(
                line_no,
                format!("expected uint64 value for heading \"{heading}\""),
            )
        })?;
    Ok((heading, value))
}

fn parse_event_row(line: &str, line_no: usize) -> Result<(String, TimingEvent), ReportError> {
    let fields = split_csv(line);
    let start = fields
        .iter()
        .position(|f| !f.is_empty())
        .ok_or_else(|| ReportError::format(line_no, "empty timing event row"))?;
    let f = &fields[start..];
    if f.len() < 13 {
        return Err(ReportError::format(
            line_no,
            format!("timing event row has {} columns, expected 13", f.len()),
        ));
    }

    fn num<T: std::str::FromStr>(
        value: &str,
        what: &str,
        ty: &str,
        line_no: usize,
    ) -> Result<T, ReportError> {
        value.parse::<T>().map_err(|_| {
            ReportError::format(
                line_no,
                format!("expected type {ty} for {what}, but read value \"{value}\""),
            )
        })
    }

    let event_type_id = num::<u32>(&f[1], "ID", "uint32", line_no)?;
    let type_header = f[2].clone();
    let description = f[3].clone();
    let ratio_num = num::<i64>(&f[4], "Time ratio num", "int64", line_no)?;
    let ratio_den = num::<i64>(&f[5], "Time ratio den", "int64", line_no)?;
    if ratio_den == 0 {
        return Err(ReportError::format(
            line_no,
            "expected non-zero value for Time ratio den",
        ));
    }
    let wall_time_start = num::<f64>(&f[6], "Wall time start", "double", line_no)?;
    let wall_time_end = num::<f64>(&f[7], "Wall time end", "double", line_no)?;
    // f[8] is the elapsed wall time column: present but recomputed
    let cpu_time_start = num::<f64>(&f[9], "CPU time start", "double", line_no)?;
    let cpu_time_end = num::<f64>(&f[10], "CPU time end", "double", line_no)?;
    // f[11] is the elapsed CPU time column: present but recomputed
    let input_sample_count = num::<u64>(&f[12], "Iterations", "uint64", line_no)?;

    Ok((
        type_header,
        TimingEvent {
            event_type_id,
            cpu_time_start,
            cpu_time_end,
            wall_time_start,
            wall_time_end,
            time_interval_ratio_num: ratio_num,
            time_interval_ratio_den: ratio_den,
            input_sample_count,
            description,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(id: u32, start: f64, end: f64) -> TimingEvent {
        TimingEvent {
            event_type_id: id,
            cpu_time_start: start,
            cpu_time_end: end,
            wall_time_start: start,
            wall_time_end: end,
            time_interval_ratio_num: 1,
            time_interval_ratio_den: 1_000_000_000,
            input_sample_count: 1,
            description: String::new(),
        }
    }

    #[test]
    fn readding_event_type_keeps_last_header_and_main_flag() {
        let mut report = TimingReport::default();
        report.add_event_type(7, "First", true);
        report.add_event_type(9, "Other", false);
        report.add_event_type(7, "Second", false);
        assert_eq!(report.event_type_header(7), Some("Second"));
        assert_eq!(report.main_event_id(), Some(7));
    }

    #[test]
    fn first_event_type_added_becomes_main_by_default() {
        let mut report = TimingReport::default();
        report.add_event_type(42, "Operation", false);
        report.add_event_type(43, "Other", false);
        assert_eq!(report.main_event_id(), Some(42));
    }

    #[test]
    fn add_event_does_not_steal_main_flag() {
        let mut report = TimingReport::default();
        report.add_event_type(10, "Operation", true);
        report.add_event(sample_event(11, 0.0, 5.0), "Store");
        assert_eq!(report.main_event_id(), Some(10));
        assert_eq!(report.event_type_header(11), Some("Store"));
    }

    #[test]
    fn empty_report_serializes_with_failure_tag() {
        let mut report = TimingReport::new("some header");
        report.set_footer("notes");
        let csv = report.to_csv();
        assert!(csv.contains(TAG_FAILED));
        assert!(!csv.contains(TAG_DATA));
        let loaded = TimingReport::from_csv(&csv).unwrap();
        assert_eq!(loaded.event_count(), 0);
        assert_eq!(loaded.header(), "some header");
        assert_eq!(loaded.footer(), "notes");
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let err = TimingReport::from_csv("#v,0,9,9\n").unwrap_err();
        match err {
            ReportError::Format { line, .. } => assert_eq!(line, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_data_tag_reports_line() {
        let mut report = TimingReport::new("hdr");
        report.add_event(sample_event(3, 0.0, 10.0), "Operation");
        let csv = report.to_csv();
        let broken: String = csv
            .lines()
            .filter(|l| trim_line(l) != TAG_DATA && trim_line(l) != TAG_FOOTER)
            .collect::<Vec<_>>()
            .join("\n");
        let err = TimingReport::from_csv(&broken).unwrap_err();
        assert!(matches!(err, ReportError::Format { .. }));
        let msg = err.to_string();
        assert!(msg.contains("data section not found"), "got: {msg}");
    }

    #[test]
    fn event_count_mismatch_is_rejected() {
        let mut report = TimingReport::new("hdr");
        report.add_event(sample_event(3, 0.0, 10.0), "Operation");
        report.add_event(sample_event(3, 10.0, 20.0), "Operation");
        let csv = report.to_csv();
        // drop one data row
        let broken: String = csv
            .lines()
            .filter(|l| !l.starts_with(",1,"))
            .collect::<Vec<_>>()
            .join("\n");
        let err = TimingReport::from_csv(&broken).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("inconsistent number of events"), "got: {msg}");
    }

    #[test]
    fn quoted_values_round_trip() {
        let mut report = TimingReport::new("hdr");
        let mut event = sample_event(5, 1.0, 2.0);
        event.description = String::from("sample 3, operand \"B\"");
        report.add_event(event.clone(), "Encoding pack 0, side A");
        let loaded = TimingReport::from_csv(&report.to_csv()).unwrap();
        assert_eq!(loaded.get_event(0).unwrap().description, event.description);
        assert_eq!(
            loaded.event_type_header(5),
            Some("Encoding pack 0, side A")
        );
    }

    #[test]
    fn split_csv_trims_whitespace() {
        let fields = split_csv("  a , 42 ,\"x, y\" , ");
        assert_eq!(fields[0], "a");
        assert_eq!(fields[1], "42");
        assert_eq!(fields[2], "x, y");
        assert_eq!(fields[3], "");
    }
}
