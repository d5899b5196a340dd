//! Descriptor registry, matching, and description derivation.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::warn;

use cipherbench_abi::{BenchmarkDescriptor, CategorySpecific, WorkloadParam};
use cipherbench_report::TimingReport;

use crate::description::{
    BackendDescription, Configuration, Description, DescriptionToken, DescriptorKey,
};
use crate::engine::Engine;
use crate::error::{HarnessError, Result};
use crate::report_path::{cipher_mask_string, derive_report_path};
use crate::run::BenchmarkRunner;

/// Workload-specific values resolved while completing a description.
#[derive(Debug, Clone)]
pub struct WorkloadDescriptionOutput {
    /// Backend descriptor with every default filled in.
    pub concrete_descriptor: BenchmarkDescriptor,
    /// Decorated workload name, parameter values included.
    pub workload_name: String,
    /// Workload family name without parameter decoration.
    pub workload_base_name: String,
    /// Number of operands of the operation.
    pub operation_params_count: u64,
    /// Extra CSV rows appended to the report header.
    pub workload_header: String,
}

/// One registered benchmark descriptor object.
///
/// Implementations decide whether they can drive a backend-advertised
/// descriptor, complete the concrete description, and construct the
/// category runner for a matched token.
pub trait WorkloadDescriptor: Send + Sync {
    /// Whether this descriptor can perform the advertised benchmark with
    /// the given workload parameters.
    fn matches(&self, descriptor: &BenchmarkDescriptor, w_params: &[WorkloadParam]) -> bool;

    /// Fills in the concrete descriptor and naming for a matched
    /// benchmark.
    fn complete_workload_description(
        &self,
        engine: &Engine,
        backend_desc: &BackendDescription,
        config: &Configuration,
    ) -> Result<WorkloadDescriptionOutput>;

    /// Instantiates the runner for a matched token. Creation and
    /// initialization backend calls are timed into `report`.
    fn create_benchmark(
        &self,
        engine: &Arc<Engine>,
        key: DescriptorKey,
        token: &DescriptionToken,
        report: &mut TimingReport,
    ) -> Result<Box<dyn BenchmarkRunner>>;

    /// Releases a runner produced by [`WorkloadDescriptor::create_benchmark`].
    fn destroy_benchmark(&self, runner: Box<dyn BenchmarkRunner>) {
        drop(runner);
    }
}

/// Append-only list of descriptor objects.
///
/// Built once before the engine constructs and read-only afterwards.
/// Tests may assemble a registry from any descriptor list instead of the
/// full built-in set.
#[derive(Default)]
pub struct Registry {
    descriptors: Vec<Arc<dyn WorkloadDescriptor>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in workload descriptor registered.
    #[must_use]
    pub fn with_all_workloads() -> Self {
        let mut registry = Self::new();
        crate::workloads::register_all(&mut registry);
        registry
    }

    /// Registers a descriptor object. Returns `false` (and never panics)
    /// if the registration is rejected.
    pub fn register(&mut self, descriptor: Arc<dyn WorkloadDescriptor>) -> bool {
        self.descriptors.push(descriptor);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&Arc<dyn WorkloadDescriptor>> {
        self.descriptors.get(index)
    }

    /// Matches a backend-advertised benchmark against the registered
    /// descriptors, first match wins. Returns `None` when nothing
    /// matches.
    pub fn match_descriptor(
        &self,
        engine: &Engine,
        backend_desc: &BackendDescription,
        config: &Configuration,
    ) -> Result<Option<DescriptionToken>> {
        let expected = engine.workload_params_count(backend_desc.handle)?;
        if expected != config.w_params.len() as u64 {
            return Err(HarnessError::invalid(format!(
                "invalid number of workload arguments; expected {expected}, but {} received",
                config.w_params.len()
            )));
        }

        for (origin, descriptor) in self.descriptors.iter().enumerate() {
            if !descriptor.matches(&backend_desc.descriptor, &config.w_params) {
                continue;
            }
            let completed =
                descriptor.complete_workload_description(engine, backend_desc, config)?;

            let mut final_backend = backend_desc.clone();
            final_backend.descriptor = completed.concrete_descriptor.clone();
            final_backend.operation_params_count = completed.operation_params_count;

            let mut final_config = config.clone();
            final_config
                .default_sample_sizes
                .resize(completed.operation_params_count as usize, 0);

            let description = build_description(engine, &final_backend, &final_config, &completed)?;
            return Ok(Some(DescriptionToken::new(
                origin,
                final_backend,
                final_config,
                description,
            )));
        }

        warn!(
            index = backend_desc.index,
            "no registered descriptor matches the advertised benchmark"
        );
        Ok(None)
    }
}

/// Completes the category parameters of a descriptor: the minimum test
/// time falls back to the configuration default, and offline sample
/// counts resolve through descriptor → per-operand default → fallback →
/// workload default.
pub fn complete_category_params(
    descriptor: &BenchmarkDescriptor,
    config: &Configuration,
    operation_params_count: u64,
    workload_default_sample_size: u64,
) -> Result<BenchmarkDescriptor> {
    let mut concrete = descriptor.clone();
    if concrete.cat_params.min_test_time_ms == 0 {
        concrete.cat_params.min_test_time_ms = config.default_min_test_time_ms;
    }
    if let CategorySpecific::Offline { sample_counts } = &mut concrete.cat_params.specific {
        sample_counts.resize(operation_params_count as usize, 0);
        for (i, count) in sample_counts.iter_mut().enumerate() {
            if *count != 0 {
                continue;
            }
            let configured = config.default_sample_sizes.get(i).copied().unwrap_or(0);
            *count = if configured > 0 {
                configured
            } else if config.fallback_default_sample_size > 0 {
                config.fallback_default_sample_size
            } else {
                workload_default_sample_size
            };
            if *count == 0 {
                return Err(HarnessError::invalid(format!(
                    "no sample size available for operand {i}"
                )));
            }
        }
    }
    Ok(concrete)
}

/// Builds the text description: canonical path and CSV header block.
fn build_description(
    engine: &Engine,
    backend_desc: &BackendDescription,
    config: &Configuration,
    completed: &WorkloadDescriptionOutput,
) -> Result<Description> {
    let descriptor = &backend_desc.descriptor;
    let scheme = engine.scheme_name(descriptor.scheme)?;
    let security = engine.security_name(descriptor.scheme, descriptor.security)?;
    let cipher_flags = cipher_mask_string(descriptor.cipher_param_mask);

    let path = derive_report_path(
        descriptor,
        &config.w_params,
        &completed.workload_base_name,
        &scheme,
        &security,
        config.single_path_report,
    );

    let mut header = String::new();
    let _ = writeln!(header, "Specifications,");
    let _ = writeln!(header, ", Encryption, ");
    let _ = writeln!(header, ", , Scheme, {scheme}");
    let _ = writeln!(header, ", , Security, {security}");
    let _ = writeln!(header, ", Extra, {}", descriptor.other);
    let extra = engine.extra_description(backend_desc.handle, &config.w_params)?;
    if !extra.is_empty() {
        let _ = writeln!(header, "{extra}");
    }
    let _ = writeln!(header);
    let _ = writeln!(header, ", Category, {}", descriptor.category.name());
    let _ = writeln!(
        header,
        ", , Minimum test time requested (ms), {}",
        descriptor.cat_params.min_test_time_ms
    );
    match &descriptor.cat_params.specific {
        CategorySpecific::Latency { warmup_iterations } => {
            let _ = writeln!(header, ", , Warmup iterations, {warmup_iterations}");
        }
        CategorySpecific::Offline { sample_counts } => {
            let _ = writeln!(header, ", , Parameter, Samples requested");
            if sample_counts.iter().all(|c| *c == 0) {
                let _ = writeln!(header, ", , All, 0");
            } else {
                for (i, count) in sample_counts.iter().enumerate().filter(|(_, c)| **c != 0) {
                    let _ = writeln!(header, ", , {i}, {count}");
                }
            }
        }
    }
    let _ = writeln!(header);
    let _ = writeln!(header, ", Workload, {}", completed.workload_name);
    let _ = writeln!(header, ", , Data type, {}", descriptor.data_type.name());
    let mut cipher_row = String::from(", , Encrypted op parameters (index)");
    if descriptor.cipher_param_mask == 0 {
        cipher_row.push_str(", None");
    } else if descriptor.cipher_param_mask == u32::MAX {
        cipher_row.push_str(", All");
    } else {
        for i in 0..cipherbench_abi::MAX_OP_PARAMS {
            if descriptor.cipher_param_mask & (1 << i) != 0 {
                let _ = write!(cipher_row, ", {i}");
            }
        }
    }
    let _ = writeln!(header, "{cipher_row}");
    if !completed.workload_header.is_empty() {
        let _ = writeln!(header, "{}", completed.workload_header);
    }

    Ok(Description {
        workload_id: descriptor.workload.id(),
        workload_name: completed.workload_name.clone(),
        workload_base_name: completed.workload_base_name.clone(),
        data_type: descriptor.data_type.name().to_string(),
        category: descriptor.category.name().to_string(),
        scheme,
        security,
        cipher_flags,
        other: descriptor.other.to_string(),
        header,
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipherbench_abi::{Category, CategoryParams, DataType, Workload};

    fn offline_descriptor(counts: Vec<u64>) -> BenchmarkDescriptor {
        BenchmarkDescriptor {
            workload: Workload::DotProduct,
            data_type: DataType::Float32,
            category: Category::Offline,
            cat_params: CategoryParams::offline(0, counts),
            cipher_param_mask: 0,
            scheme: 0,
            security: 0,
            other: 0,
        }
    }

    #[test]
    fn min_test_time_falls_back_to_configuration() {
        let descriptor = offline_descriptor(vec![3, 10]);
        let config = Configuration {
            default_min_test_time_ms: 750,
            ..Configuration::default()
        };
        let concrete = complete_category_params(&descriptor, &config, 2, 100).unwrap();
        assert_eq!(concrete.cat_params.min_test_time_ms, 750);

        let mut advertised = offline_descriptor(vec![3, 10]);
        advertised.cat_params.min_test_time_ms = 2_000;
        let concrete = complete_category_params(&advertised, &config, 2, 100).unwrap();
        assert_eq!(concrete.cat_params.min_test_time_ms, 2_000);
    }

    #[test]
    fn sample_counts_resolve_down_the_chain() {
        let descriptor = offline_descriptor(vec![5, 0]);
        let config = Configuration {
            default_sample_sizes: vec![0, 7],
            fallback_default_sample_size: 11,
            ..Configuration::default()
        };
        let concrete = complete_category_params(&descriptor, &config, 2, 100).unwrap();
        match &concrete.cat_params.specific {
            CategorySpecific::Offline { sample_counts } => {
                assert_eq!(sample_counts, &vec![5, 7]);
            }
            other => panic!("unexpected params: {other:?}"),
        }

        // nothing configured: fallback, then the workload default
        let descriptor = offline_descriptor(vec![0, 0]);
        let config = Configuration {
            fallback_default_sample_size: 0,
            ..Configuration::default()
        };
        let concrete = complete_category_params(&descriptor, &config, 2, 42).unwrap();
        match &concrete.cat_params.specific {
            CategorySpecific::Offline { sample_counts } => {
                assert_eq!(sample_counts, &vec![42, 42]);
            }
            other => panic!("unexpected params: {other:?}"),
        }
    }
}
