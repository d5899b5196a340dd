//! Built-in workload descriptors.
//!
//! Each workload family contributes one descriptor object per supported
//! category; ids in the registry follow registration order, first match
//! wins. Event-id bases are descriptor specific.

pub mod dot_product;
pub mod eltwise_add;
pub mod generic_wl;
pub mod logreg;
pub mod set_intersection;

use std::sync::Arc;

use cipherbench_abi::{
    BenchmarkDescriptor, Category, CategorySpecific, Workload, WorkloadParam, WorkloadParamValue,
};
use cipherbench_report::TimingReport;

use crate::data_loader::DataLoader;
use crate::description::{BackendDescription, Configuration, DescriptionToken, DescriptorKey};
use crate::engine::Engine;
use crate::error::{HarnessError, Result};
use crate::registry::{
    Registry, WorkloadDescriptionOutput, WorkloadDescriptor, complete_category_params,
};
use crate::run::{BenchmarkRunner, LatencyRunner, OfflineRunner};
use crate::validation::{NearEqualValidator, ResultValidator};

/// Workload-specific behavior shared by a family's latency and offline
/// descriptors.
pub trait WorkloadFamily: Send + Sync {
    /// Whether this family serves the advertised workload.
    fn serves(&self, workload: Workload) -> bool;

    /// Validates the workload parameters for this family.
    fn validate_params(&self, w_params: &[WorkloadParam]) -> Result<()>;

    /// Undecorated family name (descriptor-dependent for variants).
    fn base_name(&self, descriptor: &BenchmarkDescriptor) -> String;

    /// Decorated workload name with parameter values.
    fn decorated_name(
        &self,
        descriptor: &BenchmarkDescriptor,
        w_params: &[WorkloadParam],
    ) -> String;

    /// Number of operands of the operation.
    fn operation_params_count(&self, w_params: &[WorkloadParam]) -> u64;

    /// Extra CSV rows for the report header.
    fn workload_header(&self, _w_params: &[WorkloadParam]) -> String {
        String::new()
    }

    /// Sample size used when neither backend nor configuration provides
    /// one.
    fn default_sample_size(&self) -> u64 {
        100
    }

    /// Builds the data loader for a concrete descriptor with the given
    /// per-operand batch sizes.
    fn build_loader(
        &self,
        descriptor: &BenchmarkDescriptor,
        config: &Configuration,
        batch_sizes: &[u64],
    ) -> Result<Arc<dyn DataLoader>>;

    /// Validation strategy; element-wise 1 % near-equality by default.
    fn validator(&self, _w_params: &[WorkloadParam]) -> Arc<dyn ResultValidator> {
        Arc::new(NearEqualValidator::default())
    }
}

/// A workload family bound to one category and event-id base.
pub struct CategoryDescriptor<F> {
    family: F,
    category: Category,
    event_id_base: u32,
}

impl<F: WorkloadFamily> CategoryDescriptor<F> {
    #[must_use]
    pub fn new(family: F, category: Category, event_id_base: u32) -> Self {
        Self {
            family,
            category,
            event_id_base,
        }
    }

    /// Per-operand batch sizes for this category: ones for latency, the
    /// concrete sample counts for offline.
    fn batch_sizes(&self, descriptor: &BenchmarkDescriptor, w_params: &[WorkloadParam]) -> Vec<u64> {
        match (&descriptor.cat_params.specific, self.category) {
            (CategorySpecific::Offline { sample_counts }, Category::Offline) => {
                sample_counts.clone()
            }
            _ => vec![1; self.family.operation_params_count(w_params) as usize],
        }
    }
}

impl<F: WorkloadFamily> WorkloadDescriptor for CategoryDescriptor<F> {
    fn matches(&self, descriptor: &BenchmarkDescriptor, w_params: &[WorkloadParam]) -> bool {
        descriptor.category == self.category
            && self.family.serves(descriptor.workload)
            && self.family.validate_params(w_params).is_ok()
    }

    fn complete_workload_description(
        &self,
        _engine: &Engine,
        backend_desc: &BackendDescription,
        config: &Configuration,
    ) -> Result<WorkloadDescriptionOutput> {
        self.family.validate_params(&config.w_params)?;
        let operation_params_count = self.family.operation_params_count(&config.w_params);
        let concrete = complete_category_params(
            &backend_desc.descriptor,
            config,
            operation_params_count,
            self.family.default_sample_size(),
        )?;
        Ok(WorkloadDescriptionOutput {
            workload_name: self.family.decorated_name(&concrete, &config.w_params),
            workload_base_name: self.family.base_name(&concrete),
            operation_params_count,
            workload_header: self.family.workload_header(&config.w_params),
            concrete_descriptor: concrete,
        })
    }

    fn create_benchmark(
        &self,
        engine: &Arc<Engine>,
        key: DescriptorKey,
        token: &DescriptionToken,
        report: &mut TimingReport,
    ) -> Result<Box<dyn BenchmarkRunner>> {
        let backend_desc = token.backend_description(key)?;
        let config = token.configuration(key)?;
        let batch_sizes = self.batch_sizes(&backend_desc.descriptor, &config.w_params);
        let loader = self
            .family
            .build_loader(&backend_desc.descriptor, config, &batch_sizes)?;
        let validator = self.family.validator(&config.w_params);

        match self.category {
            Category::Latency => Ok(Box::new(LatencyRunner::new(
                engine.clone(),
                key,
                token,
                self.event_id_base,
                loader,
                validator,
                report,
            )?)),
            Category::Offline => Ok(Box::new(OfflineRunner::new(
                engine.clone(),
                key,
                token,
                self.event_id_base,
                loader,
                validator,
                report,
            )?)),
        }
    }
}

/// Registers every built-in workload descriptor.
pub fn register_all(registry: &mut Registry) {
    registry.register(Arc::new(CategoryDescriptor::new(
        eltwise_add::EltwiseAddFamily,
        Category::Latency,
        eltwise_add::LATENCY_EVENT_ID_BASE,
    )));
    registry.register(Arc::new(CategoryDescriptor::new(
        eltwise_add::EltwiseAddFamily,
        Category::Offline,
        eltwise_add::OFFLINE_EVENT_ID_BASE,
    )));
    registry.register(Arc::new(CategoryDescriptor::new(
        dot_product::DotProductFamily,
        Category::Latency,
        dot_product::LATENCY_EVENT_ID_BASE,
    )));
    registry.register(Arc::new(CategoryDescriptor::new(
        dot_product::DotProductFamily,
        Category::Offline,
        dot_product::OFFLINE_EVENT_ID_BASE,
    )));
    registry.register(Arc::new(CategoryDescriptor::new(
        logreg::LogRegFamily,
        Category::Latency,
        logreg::LATENCY_EVENT_ID_BASE,
    )));
    registry.register(Arc::new(CategoryDescriptor::new(
        logreg::LogRegFamily,
        Category::Offline,
        logreg::OFFLINE_EVENT_ID_BASE,
    )));
    registry.register(Arc::new(CategoryDescriptor::new(
        generic_wl::GenericFamily,
        Category::Latency,
        generic_wl::LATENCY_EVENT_ID_BASE,
    )));
    registry.register(Arc::new(CategoryDescriptor::new(
        generic_wl::GenericFamily,
        Category::Offline,
        generic_wl::OFFLINE_EVENT_ID_BASE,
    )));
    registry.register(Arc::new(CategoryDescriptor::new(
        set_intersection::SetIntersectionFamily,
        Category::Latency,
        set_intersection::LATENCY_EVENT_ID_BASE,
    )));
    registry.register(Arc::new(CategoryDescriptor::new(
        set_intersection::SetIntersectionFamily,
        Category::Offline,
        set_intersection::OFFLINE_EVENT_ID_BASE,
    )));
}

/// Fetches a positive `UInt64` workload parameter at `index`.
pub(crate) fn fetch_uint_param(w_params: &[WorkloadParam], index: usize) -> Result<u64> {
    let param = w_params.get(index).ok_or_else(|| {
        HarnessError::invalid(format!(
            "insufficient workload parameters; expected at least {}, received {}",
            index + 1,
            w_params.len()
        ))
    })?;
    match param.value {
        WorkloadParamValue::UInt64(v) if v > 0 => Ok(v),
        WorkloadParamValue::UInt64(v) => Err(HarnessError::invalid(format!(
            "invalid value in workload parameter {index}: expected positive integer, received {v}"
        ))),
        _ => Err(HarnessError::invalid(format!(
            "invalid type for workload parameter {index}: expected UInt64"
        ))),
    }
}
