//! The backend trait and return-code discipline.

use thiserror::Error;

use crate::types::{
    BenchmarkDescriptor, Handle, PackedDataSink, PackedDataView, ParameterIndexer, WorkloadParam,
};

/// Integer status returned by every bridge call.
pub type Status = i32;

pub const STATUS_SUCCESS: Status = 0;
pub const STATUS_INVALID_ARGS: Status = -1;
pub const STATUS_INTERNAL_ERROR: Status = -2;

/// Typed failure raised when a bridge call returns non-success.
///
/// Carries the backend's status code and the text fetched from
/// [`ApiBridge::last_error_description`] immediately after the failing call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("backend call failed with status {code}: {message}")]
pub struct BackendError {
    pub code: Status,
    pub message: String,
}

/// Converts a bridge status into a result, fetching the backend's most
/// recent error description on failure.
pub fn check(bridge: &dyn ApiBridge, status: Status) -> Result<(), BackendError> {
    if status == STATUS_SUCCESS {
        Ok(())
    } else {
        Err(BackendError {
            code: status,
            message: bridge.last_error_description(),
        })
    }
}

/// Operations a compute backend exposes to the harness.
///
/// The surface mirrors a C-style ABI: calls return a [`Status`] and write
/// results through out-parameters, so the harness owns the conversion of
/// return codes into typed errors (see [`check`]). All handles produced by
/// a backend must be released through [`ApiBridge::destroy_handle`].
pub trait ApiBridge: Send + Sync {
    /// Initializes a backend engine from opaque initialization bytes.
    fn init_engine(&self, init_data: &[u8], h_engine: &mut Handle) -> Status;

    /// Releases any handle previously produced by this backend.
    fn destroy_handle(&self, h: Handle) -> Status;

    /// Number of benchmarks the backend advertises.
    fn count_benchmarks(&self, h_engine: Handle, count: &mut u64) -> Status;

    /// Retrieves the descriptor registered at `index`, along with the
    /// backend's registration handle for it.
    fn describe_benchmark(
        &self,
        h_engine: Handle,
        index: u64,
        h_desc: &mut Handle,
        descriptor: &mut BenchmarkDescriptor,
    ) -> Status;

    /// Number of workload parameters the descriptor expects.
    fn workload_params_count(&self, h_engine: Handle, h_desc: Handle, count: &mut u64) -> Status;

    /// Human-readable name of an encryption scheme id.
    fn scheme_name(&self, h_engine: Handle, scheme: u32, out: &mut String) -> Status;

    /// Human-readable name of a security level id under a scheme.
    fn security_name(&self, h_engine: Handle, scheme: u32, security: u32, out: &mut String)
    -> Status;

    /// Backend-specific extra description rows for the report header.
    /// An empty string is valid.
    fn extra_description(
        &self,
        h_engine: Handle,
        h_desc: Handle,
        w_params: &[WorkloadParam],
        out: &mut String,
    ) -> Status;

    /// Instantiates the benchmark registered under `h_desc` with the given
    /// workload parameters.
    fn create_benchmark(
        &self,
        h_engine: Handle,
        h_desc: Handle,
        w_params: &[WorkloadParam],
        h_bench: &mut Handle,
    ) -> Status;

    /// Completes benchmark initialization with the concrete descriptor the
    /// harness resolved (defaults filled in).
    fn init_benchmark(&self, h_bench: Handle, concrete: &BenchmarkDescriptor) -> Status;

    /// Encodes raw operand data into a backend-native host handle.
    fn encode(&self, h_bench: Handle, data: &PackedDataView<'_>, h_out: &mut Handle) -> Status;

    /// Decodes a backend-native host handle into caller-owned buffers.
    fn decode(&self, h_bench: Handle, h_encoded: Handle, out: &mut PackedDataSink<'_>) -> Status;

    /// Encrypts an encoded host handle.
    fn encrypt(&self, h_bench: Handle, h_encoded: Handle, h_out: &mut Handle) -> Status;

    /// Decrypts a ciphertext host handle.
    fn decrypt(&self, h_bench: Handle, h_cipher: Handle, h_out: &mut Handle) -> Status;

    /// Loads host handles into a single remote handle used as `operate`
    /// input.
    fn load(&self, h_bench: Handle, h_locals: &[Handle], h_remote: &mut Handle) -> Status;

    /// Retrieves a remote result back into host handles. `h_locals` holds
    /// one slot per expected local packed-data result.
    fn store(&self, h_bench: Handle, h_remote: Handle, h_locals: &mut [Handle]) -> Status;

    /// Executes the operation once over the loaded inputs.
    fn operate(
        &self,
        h_bench: Handle,
        h_inputs: Handle,
        indexers: &[ParameterIndexer],
        h_result: &mut Handle,
    ) -> Status;

    /// Text of the most recent error recorded by the backend.
    fn last_error_description(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingBridge;

    impl ApiBridge for FailingBridge {
        fn init_engine(&self, _: &[u8], _: &mut Handle) -> Status {
            STATUS_INTERNAL_ERROR
        }
        fn destroy_handle(&self, _: Handle) -> Status {
            STATUS_SUCCESS
        }
        fn count_benchmarks(&self, _: Handle, _: &mut u64) -> Status {
            STATUS_SUCCESS
        }
        fn describe_benchmark(
            &self,
            _: Handle,
            _: u64,
            _: &mut Handle,
            _: &mut BenchmarkDescriptor,
        ) -> Status {
            STATUS_SUCCESS
        }
        fn workload_params_count(&self, _: Handle, _: Handle, _: &mut u64) -> Status {
            STATUS_SUCCESS
        }
        fn scheme_name(&self, _: Handle, _: u32, _: &mut String) -> Status {
            STATUS_SUCCESS
        }
        fn security_name(&self, _: Handle, _: u32, _: u32, _: &mut String) -> Status {
            STATUS_SUCCESS
        }
        fn extra_description(
            &self,
            _: Handle,
            _: Handle,
            _: &[WorkloadParam],
            _: &mut String,
        ) -> Status {
            STATUS_SUCCESS
        }
        fn create_benchmark(
            &self,
            _: Handle,
            _: Handle,
            _: &[WorkloadParam],
            _: &mut Handle,
        ) -> Status {
            STATUS_SUCCESS
        }
        fn init_benchmark(&self, _: Handle, _: &BenchmarkDescriptor) -> Status {
            STATUS_SUCCESS
        }
        fn encode(&self, _: Handle, _: &PackedDataView<'_>, _: &mut Handle) -> Status {
            STATUS_SUCCESS
        }
        fn decode(&self, _: Handle, _: Handle, _: &mut PackedDataSink<'_>) -> Status {
            STATUS_SUCCESS
        }
        fn encrypt(&self, _: Handle, _: Handle, _: &mut Handle) -> Status {
            STATUS_SUCCESS
        }
        fn decrypt(&self, _: Handle, _: Handle, _: &mut Handle) -> Status {
            STATUS_SUCCESS
        }
        fn load(&self, _: Handle, _: &[Handle], _: &mut Handle) -> Status {
            STATUS_SUCCESS
        }
        fn store(&self, _: Handle, _: Handle, _: &mut [Handle]) -> Status {
            STATUS_SUCCESS
        }
        fn operate(
            &self,
            _: Handle,
            _: Handle,
            _: &[ParameterIndexer],
            _: &mut Handle,
        ) -> Status {
            STATUS_SUCCESS
        }
        fn last_error_description(&self) -> String {
            String::from("engine exploded")
        }
    }

    #[test]
    fn check_fetches_last_error_on_failure() {
        let bridge = FailingBridge;
        let mut h = Handle::default();
        let status = bridge.init_engine(&[], &mut h);
        let err = check(&bridge, status).unwrap_err();
        assert_eq!(err.code, STATUS_INTERNAL_ERROR);
        assert_eq!(err.message, "engine exploded");
    }

    #[test]
    fn check_passes_success_through() {
        let bridge = FailingBridge;
        assert!(check(&bridge, STATUS_SUCCESS).is_ok());
    }
}
