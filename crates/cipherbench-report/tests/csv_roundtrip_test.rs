//! Round-trip and structural-tag coverage for the tagged CSV format.

use cipherbench_report::event::TimingEvent;
use cipherbench_report::report::{ReportError, TimingReport};

fn event(id: u32, wall: (f64, f64), cpu: (f64, f64), samples: u64, desc: &str) -> TimingEvent {
    TimingEvent {
        event_type_id: id,
        cpu_time_start: cpu.0,
        cpu_time_end: cpu.1,
        wall_time_start: wall.0,
        wall_time_end: wall.1,
        time_interval_ratio_num: 1,
        time_interval_ratio_den: 1_000_000_000,
        input_sample_count: samples,
        description: desc.to_string(),
    }
}

fn populated_report() -> TimingReport {
    let mut report = TimingReport::new(
        "Specifications,\n, , Scheme, CKKS\n, Workload, Dot Product (128)",
    );
    report.set_footer("Validation skipped");
    report.add_event(event(601, (0.0, 1.5e6), (0.0, 1.2e6), 1, ""), "Encoding pack 0");
    report.add_event(event(602, (2e6, 3e6), (2e6, 2.5e6), 1, ""), "Encryption");
    report.add_event_type(605, "Operation", true);
    for i in 0..5u64 {
        report.add_event(
            event(
                605,
                (4e6 + i as f64 * 1e6, 4.5e6 + i as f64 * 1e6),
                (4e6, 4.4e6),
                1,
                &format!("iteration {i}"),
            ),
            "Operation",
        );
    }
    report
}

#[test]
fn serialize_then_deserialize_preserves_everything() {
    let report = populated_report();
    let csv = report.to_csv();
    let loaded = TimingReport::from_csv(&csv).unwrap();

    assert_eq!(loaded.header(), report.header());
    assert_eq!(loaded.footer(), report.footer());
    assert_eq!(loaded.main_event_id(), report.main_event_id());
    assert_eq!(loaded.event_count(), report.event_count());
    for (a, b) in report.events().iter().zip(loaded.events()) {
        assert_eq!(a, b);
    }
    let original: Vec<(u32, &str)> = report.event_types().collect();
    let reloaded: Vec<(u32, &str)> = loaded.event_types().collect();
    assert_eq!(original, reloaded);
}

#[test]
fn double_round_trip_is_stable() {
    let report = populated_report();
    let once = report.to_csv();
    let twice = TimingReport::from_csv(&once).unwrap().to_csv();
    assert_eq!(once, twice);
}

#[test]
fn structural_tags_appear_in_order() {
    let csv = populated_report().to_csv();
    let idx = |tag: &str| csv.find(tag).unwrap_or_else(|| panic!("missing tag {tag}"));
    assert_eq!(idx("#v,0,1,1"), 0);
    assert!(idx("#0100") < idx("#0200"));
    assert!(idx("#0200") < idx("#8E00"));
    assert!(idx("#8E00") < idx("#8FFF"));
    assert!(csv.contains("Events recorded,7"));
    assert!(csv.contains("Main event,605"));
}

#[test]
fn elapsed_columns_are_recomputed_on_load() {
    let report = populated_report();
    let csv = report.to_csv();
    // corrupt the elapsed columns only; the parse must not care
    let corrupted: String = csv
        .lines()
        .map(|line| {
            if line.starts_with(",0,") {
                let mut fields: Vec<&str> = line.split(',').collect();
                fields[9] = "999999"; // elapsed wall
                fields[12] = "999999"; // elapsed cpu
                fields.join(",")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    let loaded = TimingReport::from_csv(&corrupted).unwrap();
    let original = report.get_event(0).unwrap();
    let reloaded = loaded.get_event(0).unwrap();
    assert_eq!(original.elapsed_wall_secs(), reloaded.elapsed_wall_secs());
}

#[test]
fn missing_data_section_is_a_format_error() {
    let csv = "#v,0,1,1\nEvents recorded,1\nMain event,605\n#0100\nheader line\n#8E00\n\n#8FFF\n";
    let err = TimingReport::from_csv(csv).unwrap_err();
    match err {
        ReportError::Format { line, message } => {
            assert!(message.contains("data section not found"), "got: {message}");
            // the scan consumed every line looking for #0200
            assert_eq!(line, 8);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn failed_report_round_trips_without_rows() {
    let mut report = TimingReport::new("failed run header");
    report.append_footer("Validation failed", false);
    let csv = report.to_csv();
    assert!(csv.contains("#XXXX"));
    let loaded = TimingReport::from_csv(&csv).unwrap();
    assert_eq!(loaded.event_count(), 0);
    assert_eq!(loaded.footer(), "Validation failed");
}

#[test]
fn report_files_round_trip_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.csv");
    let report = populated_report();
    report.write_to_file(&path).unwrap();
    let loaded = TimingReport::load_from_file(&path).unwrap();
    assert_eq!(loaded.event_count(), report.event_count());
}
