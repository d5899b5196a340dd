//! End-to-end latency runs against the clear-text backend.

mod common;

use cipherbench_abi::{DataType, Workload};
use cipherbench_harness::run::RunConfig;
use cipherbench_report::TimingReport;
use common::{config_with, engine_for, latency_benchmark, uint_params};

#[test]
fn eltwise_add_latency_measures_and_validates() {
    // plaintext+ciphertext element-wise addition, n = 1000
    let engine = engine_for(vec![latency_benchmark(
        Workload::EltwiseAdd,
        DataType::Float64,
        0b10,
        30,
        2,
        1,
    )]);
    let config = config_with(uint_params(&[("n", 1_000)]));
    let token = engine
        .match_benchmark(0, &config)
        .unwrap()
        .expect("descriptor match");

    let mut report = TimingReport::new(token.description().header.clone());
    let mut runner = engine.create_benchmark(&token, &mut report).unwrap();
    let valid = runner.run(&mut report, &RunConfig::default()).unwrap();
    assert!(valid, "validation failed:\n{}", report.footer());

    // Creation, Initialization, Encoding x2, Encryption, Loading, Warmup,
    // Operation, Store, Decryption, Decoding all appear
    let names: Vec<&str> = report.event_types().map(|(_, name)| name).collect();
    for expected in [
        "Creation",
        "Initialization",
        "Encoding pack 0",
        "Encoding pack 1",
        "Encryption",
        "Loading",
        "Warmup",
        "Operation",
        "Store",
        "Decryption",
        "Decoding",
    ] {
        assert!(names.contains(&expected), "missing event type {expected}");
    }

    // at least two measured operations, and the loop honors the minimum
    // wall time
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
    assert!(operations.len() >= 2);
    let total_ms: f64 = operations.iter().map(|e| e.elapsed_wall_ms()).sum();
    assert!(total_ms >= 30.0, "loop exited early at {total_ms} ms");

    // the operation is the main event
    assert_eq!(report.main_event_id(), Some(operation_id));

    // warm-up ran exactly twice and is not the main event
    let warmup_id = report
        .event_types()
        .find(|(_, name)| *name == "Warmup")
        .map(|(id, _)| id)
        .unwrap();
    assert_eq!(
        report
            .events()
            .iter()
            .filter(|e| e.event_type_id == warmup_id)
            .count(),
        2
    );

    // every store/decrypt/decode covers every stored result
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
            operations.len(),
            "phase {phase}"
        );
    }
}

#[test]
fn event_ids_are_monotonic_from_the_descriptor_base() {
    let engine = engine_for(vec![latency_benchmark(
        Workload::EltwiseAdd,
        DataType::Float64,
        0b10,
        10,
        1,
        1,
    )]);
    let config = config_with(uint_params(&[("n", 64)]));
    let token = engine.match_benchmark(0, &config).unwrap().unwrap();
    let mut report = TimingReport::new("");
    let mut runner = engine.create_benchmark(&token, &mut report).unwrap();
    runner.run(&mut report, &RunConfig::default()).unwrap();

    // element-wise addition latency ids start above its base
    let mut ids: Vec<u32> = report.event_types().map(|(id, _)| id).collect();
    ids.sort_unstable();
    assert!(ids.first().copied().unwrap() == 402, "ids: {ids:?}");
    assert!(ids.iter().all(|id| *id > 401 && *id < 501), "ids: {ids:?}");
    // ids issue monotonically in pipeline order
    let creation = report
        .event_types()
        .find(|(_, n)| *n == "Creation")
        .unwrap()
        .0;
    let decoding = report
        .event_types()
        .find(|(_, n)| *n == "Decoding")
        .unwrap()
        .0;
    assert!(creation < decoding);
}

#[test]
fn all_plain_mask_skips_encryption() {
    let engine = engine_for(vec![latency_benchmark(
        Workload::DotProduct,
        DataType::Float64,
        0,
        10,
        0,
        1,
    )]);
    let config = config_with(uint_params(&[("n", 32)]));
    let token = engine.match_benchmark(0, &config).unwrap().unwrap();
    let mut report = TimingReport::new("");
    let mut runner = engine.create_benchmark(&token, &mut report).unwrap();
    let valid = runner.run(&mut report, &RunConfig::default()).unwrap();
    assert!(valid);

    let names: Vec<&str> = report.event_types().map(|(_, name)| name).collect();
    // the cipher side is empty: encoded under pack 1, no encryption event
    assert!(!names.contains(&"Encryption"));
    assert!(!names.contains(&"Encoding pack 0"));
    assert!(names.contains(&"Encoding pack 1"));
    assert!(!names.contains(&"Warmup"));
}

#[test]
fn validation_can_be_skipped() {
    let engine = engine_for(vec![latency_benchmark(
        Workload::EltwiseAdd,
        DataType::Float64,
        0,
        10,
        0,
        1,
    )]);
    let config = config_with(uint_params(&[("n", 16)]));
    let token = engine.match_benchmark(0, &config).unwrap().unwrap();
    let mut report = TimingReport::new("");
    let mut runner = engine.create_benchmark(&token, &mut report).unwrap();
    let valid = runner
        .run(
            &mut report,
            &RunConfig {
                validate_results: false,
            },
        )
        .unwrap();
    assert!(valid);
    assert!(report.footer().starts_with("Validation skipped"));
}
