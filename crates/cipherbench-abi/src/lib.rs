//! API-bridge boundary for cipherbench.
//!
//! This crate defines the data model a backend and the harness exchange:
//! opaque handles, raw buffer views, benchmark descriptors, and the
//! [`ApiBridge`] trait listing every operation the harness may issue.
//! Backends implement the trait; the harness is the only caller.
//!
//! Every bridge call returns an integer status. Non-success statuses are
//! paired with a follow-up [`ApiBridge::last_error_description`] fetch by
//! [`check`] before they are surfaced as [`BackendError`].

pub mod bridge;
pub mod handle;
pub mod types;

pub use bridge::{ApiBridge, BackendError, STATUS_INTERNAL_ERROR, STATUS_INVALID_ARGS, STATUS_SUCCESS, Status, check};
pub use handle::HandleGuard;
pub use types::{
    BenchmarkDescriptor, Category, CategoryParams, CategorySpecific, DataPackSink, DataPackView,
    DataType, Handle, MAX_CATEGORY_RESERVED, MAX_OP_PARAMS, PackedDataSink, PackedDataView,
    ParameterIndexer, Workload, WorkloadParam, WorkloadParamValue,
};
