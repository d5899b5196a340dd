//! Shared fixtures for the harness integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use cipherbench_abi::{
    BenchmarkDescriptor, Category, CategoryParams, DataType, Workload, WorkloadParam,
};
use cipherbench_harness::backend::{AdvertisedBenchmark, ClearTextBackend};
use cipherbench_harness::description::Configuration;
use cipherbench_harness::engine::Engine;
use cipherbench_harness::registry::Registry;

pub fn latency_benchmark(
    workload: Workload,
    data_type: DataType,
    cipher_param_mask: u32,
    min_test_time_ms: u64,
    warmup: u64,
    workload_params_count: u64,
) -> AdvertisedBenchmark {
    AdvertisedBenchmark {
        descriptor: BenchmarkDescriptor {
            workload,
            data_type,
            category: Category::Latency,
            cat_params: CategoryParams::latency(min_test_time_ms, warmup),
            cipher_param_mask,
            scheme: 0,
            security: 0,
            other: 0,
        },
        workload_params_count,
    }
}

pub fn offline_benchmark(
    workload: Workload,
    data_type: DataType,
    cipher_param_mask: u32,
    sample_counts: Vec<u64>,
    workload_params_count: u64,
) -> AdvertisedBenchmark {
    AdvertisedBenchmark {
        descriptor: BenchmarkDescriptor {
            workload,
            data_type,
            category: Category::Offline,
            cat_params: CategoryParams::offline(0, sample_counts),
            cipher_param_mask,
            scheme: 0,
            security: 0,
            other: 0,
        },
        workload_params_count,
    }
}

pub fn engine_for(benchmarks: Vec<AdvertisedBenchmark>) -> Arc<Engine> {
    let bridge = Arc::new(ClearTextBackend::new(benchmarks));
    let registry = Arc::new(Registry::with_all_workloads());
    Engine::new(bridge, registry, &[]).expect("engine initialization")
}

pub fn uint_params(values: &[(&str, u64)]) -> Vec<WorkloadParam> {
    values
        .iter()
        .map(|(name, value)| WorkloadParam::uint(*name, *value))
        .collect()
}

pub fn config_with(params: Vec<WorkloadParam>) -> Configuration {
    Configuration {
        default_min_test_time_ms: 20,
        random_seed: 0xDEAD_BEEF,
        w_params: params,
        ..Configuration::default()
    }
}
