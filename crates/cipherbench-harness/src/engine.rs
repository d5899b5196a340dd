//! Session-scoped façade over a backend.

use std::sync::Arc;

use cipherbench_abi::{
    ApiBridge, BackendError, BenchmarkDescriptor, Handle, HandleGuard, STATUS_SUCCESS, Status,
    WorkloadParam,
};
use cipherbench_report::TimingReport;

use crate::description::{BackendDescription, Configuration, DescriptionToken, DescriptorKey};
use crate::error::{HarnessError, Result};
use crate::registry::Registry;
use crate::run::BenchmarkRunner;

/// Owns the backend engine handle for the duration of a session.
///
/// Runners borrow the engine through an `Arc` but never own the backend
/// handle; the engine destroys it when the session ends.
pub struct Engine {
    bridge: Arc<dyn ApiBridge>,
    registry: Arc<Registry>,
    h_engine: HandleGuard,
}

impl Engine {
    /// Initializes the backend with the given initialization bytes.
    pub fn new(
        bridge: Arc<dyn ApiBridge>,
        registry: Arc<Registry>,
        init_data: &[u8],
    ) -> Result<Arc<Self>> {
        let mut h_engine = Handle::default();
        let status = bridge.init_engine(init_data, &mut h_engine);
        check_status(bridge.as_ref(), status)?;
        Ok(Arc::new(Self {
            h_engine: HandleGuard::new(bridge.clone(), h_engine),
            bridge,
            registry,
        }))
    }

    #[must_use]
    pub fn bridge(&self) -> &Arc<dyn ApiBridge> {
        &self.bridge
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    #[must_use]
    pub fn handle(&self) -> Handle {
        self.h_engine.handle()
    }

    /// Converts a bridge status into a typed error, fetching the
    /// backend's last error description on failure.
    pub fn validate(&self, status: Status) -> Result<()> {
        check_status(self.bridge.as_ref(), status)
    }

    pub fn count_benchmarks(&self) -> Result<u64> {
        let mut count = 0u64;
        let status = self.bridge.count_benchmarks(self.handle(), &mut count);
        self.validate(status)?;
        Ok(count)
    }

    /// Fetches the advertised descriptor at `index`.
    pub fn describe_benchmark(&self, index: u64) -> Result<BackendDescription> {
        let mut h_desc = Handle::default();
        let mut descriptor = placeholder_descriptor();
        let status = self
            .bridge
            .describe_benchmark(self.handle(), index, &mut h_desc, &mut descriptor);
        self.validate(status)?;
        Ok(BackendDescription {
            index,
            handle: h_desc,
            descriptor,
            operation_params_count: 0,
        })
    }

    pub fn workload_params_count(&self, h_desc: Handle) -> Result<u64> {
        let mut count = 0u64;
        let status = self
            .bridge
            .workload_params_count(self.handle(), h_desc, &mut count);
        self.validate(status)?;
        Ok(count)
    }

    pub fn scheme_name(&self, scheme: u32) -> Result<String> {
        let mut name = String::new();
        let status = self.bridge.scheme_name(self.handle(), scheme, &mut name);
        self.validate(status)?;
        Ok(name)
    }

    pub fn security_name(&self, scheme: u32, security: u32) -> Result<String> {
        let mut name = String::new();
        let status = self
            .bridge
            .security_name(self.handle(), scheme, security, &mut name);
        self.validate(status)?;
        Ok(name)
    }

    pub fn extra_description(&self, h_desc: Handle, w_params: &[WorkloadParam]) -> Result<String> {
        let mut text = String::new();
        let status =
            self.bridge
                .extra_description(self.handle(), h_desc, w_params, &mut text);
        self.validate(status)?;
        Ok(text)
    }

    /// Matches the benchmark advertised at `index` against the registry.
    pub fn match_benchmark(
        &self,
        index: u64,
        config: &Configuration,
    ) -> Result<Option<DescriptionToken>> {
        let backend_desc = self.describe_benchmark(index)?;
        self.registry.match_descriptor(self, &backend_desc, config)
    }

    /// Creates the runner for a matched token through the descriptor that
    /// produced it.
    pub fn create_benchmark(
        self: &Arc<Self>,
        token: &DescriptionToken,
        report: &mut TimingReport,
    ) -> Result<Box<dyn BenchmarkRunner>> {
        let origin = token.origin();
        let descriptor = self
            .registry
            .get(origin)
            .ok_or_else(|| HarnessError::invalid("token does not belong to this registry"))?
            .clone();
        descriptor.create_benchmark(self, DescriptorKey(origin), token, report)
    }
}

fn check_status(bridge: &dyn ApiBridge, status: Status) -> Result<()> {
    if status == STATUS_SUCCESS {
        Ok(())
    } else {
        Err(HarnessError::Backend(BackendError {
            code: status,
            message: bridge.last_error_description(),
        }))
    }
}

/// Placeholder overwritten by `describe_benchmark`; never observed.
fn placeholder_descriptor() -> BenchmarkDescriptor {
    use cipherbench_abi::{Category, CategoryParams, DataType, Workload};
    BenchmarkDescriptor {
        workload: Workload::EltwiseAdd,
        data_type: DataType::Float64,
        category: Category::Latency,
        cat_params: CategoryParams::latency(0, 0),
        cipher_param_mask: 0,
        scheme: 0,
        security: 0,
        other: 0,
    }
}
