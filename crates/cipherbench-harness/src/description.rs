//! Benchmark descriptions, configurations, and the matcher token.

use cipherbench_abi::{BenchmarkDescriptor, Handle, WorkloadParam};
use cipherbench_report::TimeUnit;

use crate::error::{HarnessError, Result};

/// A backend-advertised benchmark as seen through the bridge.
#[derive(Debug, Clone)]
pub struct BackendDescription {
    /// Index of the benchmark as registered by the backend.
    pub index: u64,
    /// Backend registration handle for the descriptor.
    pub handle: Handle,
    /// The descriptor; after matching this is the concrete descriptor
    /// with defaults filled in.
    pub descriptor: BenchmarkDescriptor,
    /// Number of operands of the operation.
    pub operation_params_count: u64,
}

/// User-supplied benchmark configuration.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Used when the backend descriptor requests `0` for minimum test time.
    pub default_min_test_time_ms: u64,
    /// Used when an operand has no entry in `default_sample_sizes`.
    pub fallback_default_sample_size: u64,
    /// Requested sample size per operand; `0` defers down the chain.
    pub default_sample_sizes: Vec<u64>,
    /// External dataset to load instead of generating synthetic inputs.
    pub dataset_filename: Option<std::path::PathBuf>,
    /// Workload parameter arguments.
    pub w_params: Vec<WorkloadParam>,
    /// Join the report path into one directory level.
    pub single_path_report: bool,
    /// Time-unit hint for derived summary outputs.
    pub time_unit: Option<TimeUnit>,
    /// Seed for synthetic data generation.
    pub random_seed: u64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            default_min_test_time_ms: 0,
            fallback_default_sample_size: 10,
            default_sample_sizes: Vec::new(),
            dataset_filename: None,
            w_params: Vec::new(),
            single_path_report: false,
            time_unit: None,
            random_seed: 0,
        }
    }
}

/// Text description of a matched benchmark.
#[derive(Debug, Clone, Default)]
pub struct Description {
    pub workload_id: i64,
    /// Decorated workload name, parameters included.
    pub workload_name: String,
    /// Workload family name without parameter decoration.
    pub workload_base_name: String,
    pub data_type: String,
    pub category: String,
    pub scheme: String,
    pub security: String,
    pub cipher_flags: String,
    pub other: String,
    /// Multi-line CSV block prepended to the report.
    pub header: String,
    /// Canonical relative report path.
    pub path: String,
}

/// Capability identifying one registered descriptor object.
///
/// The registry mints exactly one key per registered descriptor and hands
/// it to that descriptor when it is asked to consume a token; tokens check
/// the key on every accessor so they cannot be used by a descriptor other
/// than the one that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorKey(pub(crate) usize);

/// Opaque, immutable product of a successful descriptor match.
#[derive(Debug, Clone)]
pub struct DescriptionToken {
    origin: usize,
    backend_description: BackendDescription,
    configuration: Configuration,
    description: Description,
}

impl DescriptionToken {
    pub(crate) fn new(
        origin: usize,
        backend_description: BackendDescription,
        configuration: Configuration,
        description: Description,
    ) -> Self {
        Self {
            origin,
            backend_description,
            configuration,
            description,
        }
    }

    pub(crate) fn origin(&self) -> usize {
        self.origin
    }

    fn check(&self, key: DescriptorKey) -> Result<()> {
        if key.0 != self.origin {
            return Err(HarnessError::invalid(
                "invalid calling object: this token can only be used by the descriptor that created it",
            ));
        }
        Ok(())
    }

    /// Backend description with the concrete descriptor; origin-checked.
    pub fn backend_description(&self, key: DescriptorKey) -> Result<&BackendDescription> {
        self.check(key)?;
        Ok(&self.backend_description)
    }

    /// Effective configuration; origin-checked.
    pub fn configuration(&self, key: DescriptorKey) -> Result<&Configuration> {
        self.check(key)?;
        Ok(&self.configuration)
    }

    /// Text description; read by the session for report placement.
    #[must_use]
    pub fn description(&self) -> &Description {
        &self.description
    }
}
