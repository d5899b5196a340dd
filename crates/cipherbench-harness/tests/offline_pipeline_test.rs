//! End-to-end offline runs against the clear-text backend.

mod common;

use cipherbench_abi::{DataType, Workload};
use cipherbench_harness::run::RunConfig;
use cipherbench_report::TimingReport;
use common::{config_with, engine_for, offline_benchmark, uint_params};

#[test]
fn dot_product_offline_validates_the_cartesian_product() {
    // per-operand sample counts {3, 10}, all plain
    let engine = engine_for(vec![offline_benchmark(
        Workload::DotProduct,
        DataType::Float32,
        0,
        vec![3, 10],
        1,
    )]);
    let config = config_with(uint_params(&[("n", 8)]));
    let token = engine.match_benchmark(0, &config).unwrap().unwrap();

    // the concrete descriptor keeps the advertised sample counts
    let desc = token.description();
    assert_eq!(desc.category, "Offline");
    assert!(desc.header.contains(", , 0, 3"));
    assert!(desc.header.contains(", , 1, 10"));

    let mut report = TimingReport::new(desc.header.clone());
    let mut runner = engine.create_benchmark(&token, &mut report).unwrap();
    let valid = runner.run(&mut report, &RunConfig::default()).unwrap();
    assert!(valid, "validation failed:\n{}", report.footer());

    // the operation event covers all 30 results of the product
    let operation_id = report
        .event_types()
        .find(|(_, name)| *name == "Operation")
        .map(|(id, _)| id)
        .unwrap();
    let operations: Vec<_> = report
        .events()
        .iter()
        .filter(|e| e.event_type_id == operation_id)
        .collect();
    assert!(!operations.is_empty());
    assert!(operations.iter().all(|e| e.input_sample_count == 30));

    // offline has no warm-up phase, and one store/decrypt/decode each
    let names: Vec<&str> = report.event_types().map(|(_, name)| name).collect();
    assert!(!names.contains(&"Warmup"));
    for phase in ["Store", "Decryption", "Decoding"] {
        let id = report
            .event_types()
            .find(|(_, name)| *name == phase)
            .map(|(id, _)| id)
            .unwrap();
        assert_eq!(
            report
                .events()
                .iter()
                .filter(|e| e.event_type_id == id)
                .count(),
            1,
            "phase {phase}"
        );
    }

    // dot product offline event ids come from its base
    let ids: Vec<u32> = report.event_types().map(|(id, _)| id).collect();
    assert!(ids.iter().all(|id| *id > 701 && *id < 801), "ids: {ids:?}");
}

#[test]
fn offline_loop_runs_at_least_once_and_honors_min_time() {
    let engine = engine_for(vec![offline_benchmark(
        Workload::EltwiseAdd,
        DataType::Float64,
        0,
        vec![2, 2],
        1,
    )]);
    let mut config = config_with(uint_params(&[("n", 64)]));
    config.default_min_test_time_ms = 25;
    let token = engine.match_benchmark(0, &config).unwrap().unwrap();
    let mut report = TimingReport::new("");
    let mut runner = engine.create_benchmark(&token, &mut report).unwrap();
    let valid = runner.run(&mut report, &RunConfig::default()).unwrap();
    assert!(valid);

    let operation_id = report
        .event_types()
        .find(|(_, name)| *name == "Operation")
        .map(|(id, _)| id)
        .unwrap();
    let total_ms: f64 = report
        .events()
        .iter()
        .filter(|e| e.event_type_id == operation_id)
        .map(|e| e.elapsed_wall_ms())
        .sum();
    assert!(total_ms >= 25.0, "loop exited early at {total_ms} ms");
}

#[test]
fn unspecified_sample_counts_resolve_from_configuration() {
    let engine = engine_for(vec![offline_benchmark(
        Workload::EltwiseAdd,
        DataType::Float64,
        0,
        vec![0, 0],
        1,
    )]);
    let mut config = config_with(uint_params(&[("n", 16)]));
    config.default_sample_sizes = vec![2, 0];
    config.fallback_default_sample_size = 3;
    let token = engine.match_benchmark(0, &config).unwrap().unwrap();

    // resolved counts surface in the header: 2 from the per-operand
    // default, 3 from the fallback
    let header = &token.description().header;
    assert!(header.contains(", , 0, 2"), "header: {header}");
    assert!(header.contains(", , 1, 3"), "header: {header}");

    let mut report = TimingReport::new("");
    let mut runner = engine.create_benchmark(&token, &mut report).unwrap();
    let valid = runner.run(&mut report, &RunConfig::default()).unwrap();
    assert!(valid);

    let operation_id = report
        .event_types()
        .find(|(_, name)| *name == "Operation")
        .map(|(id, _)| id)
        .unwrap();
    let op = report
        .events()
        .iter()
        .find(|e| e.event_type_id == operation_id)
        .unwrap();
    assert_eq!(op.input_sample_count, 6);
}

#[test]
fn matcher_decorates_the_offline_workload_name() {
    let engine = engine_for(vec![offline_benchmark(
        Workload::DotProduct,
        DataType::Float32,
        0,
        vec![3, 10],
        1,
    )]);
    let config = config_with(uint_params(&[("n", 4)]));
    let token = engine.match_benchmark(0, &config).unwrap().unwrap();
    assert_eq!(token.description().workload_name, "Dot Product (4)");
    assert_eq!(token.description().workload_base_name, "Dot Product");
}
