//! Data model shared across the API-bridge boundary.

use serde::{Deserialize, Serialize};

/// Maximum number of operands an operation may take. Bound by the width of
/// the cipher-parameter bitmask.
pub const MAX_OP_PARAMS: usize = 32;

/// Number of reserved category-parameter slots carried by a descriptor.
pub const MAX_CATEGORY_RESERVED: usize = 8;

/// Opaque backend handle.
///
/// A handle is empty exactly when all three fields are zero; backends must
/// never mint an all-zero handle for a live resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    pub p: u64,
    pub size: u64,
    pub tag: i64,
}

impl Handle {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.p == 0 && self.size == 0 && self.tag == 0
    }
}

/// Benchmark category advertised by a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Latency,
    Offline,
}

impl Category {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Category::Latency => "Latency",
            Category::Offline => "Offline",
        }
    }
}

/// Element type of the raw data buffers exchanged with a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Int32,
    Int64,
    Float32,
    Float64,
}

impl DataType {
    /// Size in bytes of one element of this type.
    #[must_use]
    pub fn size_of(&self) -> u64 {
        match self {
            DataType::Int32 | DataType::Float32 => 4,
            DataType::Int64 | DataType::Float64 => 8,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int32 => "Int32",
            DataType::Int64 => "Int64",
            DataType::Float32 => "Float32",
            DataType::Float64 => "Float64",
        }
    }
}

/// Workloads known to the harness. The discriminant is the stable workload
/// id used in report paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i64)]
pub enum Workload {
    EltwiseAdd = 0,
    DotProduct = 1,
    LogisticRegression = 2,
    LogisticRegressionPolyD3 = 3,
    LogisticRegressionPolyD5 = 4,
    LogisticRegressionPolyD7 = 5,
    SimpleSetIntersection = 6,
    Generic = 7,
}

impl Workload {
    #[must_use]
    pub fn id(&self) -> i64 {
        *self as i64
    }
}

/// Category-specific portion of a descriptor's category parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategorySpecific {
    Latency {
        /// Number of untimed-for-statistics warm-up `operate` calls.
        warmup_iterations: u64,
    },
    Offline {
        /// Requested sample count per operand; `0` means "harness decides".
        sample_counts: Vec<u64>,
    },
}

/// Category parameters carried by a benchmark descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryParams {
    /// Minimum measurement wall time in milliseconds; `0` defers to the
    /// harness configuration default.
    pub min_test_time_ms: u64,
    /// Backend-defined extra slots, surfaced verbatim in the report path.
    pub reserved: [u64; MAX_CATEGORY_RESERVED],
    pub specific: CategorySpecific,
}

impl CategoryParams {
    #[must_use]
    pub fn latency(min_test_time_ms: u64, warmup_iterations: u64) -> Self {
        Self {
            min_test_time_ms,
            reserved: [0; MAX_CATEGORY_RESERVED],
            specific: CategorySpecific::Latency { warmup_iterations },
        }
    }

    #[must_use]
    pub fn offline(min_test_time_ms: u64, sample_counts: Vec<u64>) -> Self {
        Self {
            min_test_time_ms,
            reserved: [0; MAX_CATEGORY_RESERVED],
            specific: CategorySpecific::Offline { sample_counts },
        }
    }
}

/// Fixed-shape benchmark description advertised by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkDescriptor {
    pub workload: Workload,
    pub data_type: DataType,
    pub category: Category,
    pub cat_params: CategoryParams,
    /// Bit *i* set means operand *i* is ciphertext.
    pub cipher_param_mask: u32,
    /// Backend scheme id; resolved to a human-readable name via the bridge.
    pub scheme: u32,
    /// Backend security id; resolved to a human-readable name via the bridge.
    pub security: u32,
    /// Backend-defined tie-breaker between otherwise identical descriptors.
    pub other: i64,
}

/// Scalar value of a workload parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WorkloadParamValue {
    UInt64(u64),
    Int64(i64),
    Float64(f64),
}

/// Named scalar parameterizing a flexible workload (e.g. vector length).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadParam {
    pub name: String,
    pub value: WorkloadParamValue,
}

impl WorkloadParam {
    #[must_use]
    pub fn uint(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            value: WorkloadParamValue::UInt64(value),
        }
    }

    /// Value rendered the way report paths and headers expect it.
    #[must_use]
    pub fn value_text(&self) -> String {
        match self.value {
            WorkloadParamValue::UInt64(v) => v.to_string(),
            WorkloadParamValue::Int64(v) => v.to_string(),
            WorkloadParamValue::Float64(v) => v.to_string(),
        }
    }
}

/// Per-operand sample selection passed to `operate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterIndexer {
    pub value_index: u64,
    pub batch_size: u64,
}

/// Ordered buffers for one operand, borrowed from the caller.
#[derive(Debug)]
pub struct DataPackView<'a> {
    /// Zero-based slot in the operation's argument list.
    pub param_position: u64,
    pub buffers: Vec<&'a [u8]>,
}

/// Ordered sequence of data packs handed to `encode`.
#[derive(Debug, Default)]
pub struct PackedDataView<'a> {
    pub packs: Vec<DataPackView<'a>>,
}

impl PackedDataView<'_> {
    #[must_use]
    pub fn pack_count(&self) -> usize {
        self.packs.len()
    }
}

/// Writable counterpart of [`DataPackView`], filled by `decode`.
#[derive(Debug)]
pub struct DataPackSink<'a> {
    pub param_position: u64,
    pub buffers: Vec<&'a mut [u8]>,
}

/// Ordered sequence of writable data packs handed to `decode`.
#[derive(Debug, Default)]
pub struct PackedDataSink<'a> {
    pub packs: Vec<DataPackSink<'a>>,
}
