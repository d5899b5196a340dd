//! Harness error taxonomy.

use thiserror::Error;

use cipherbench_abi::BackendError;
use cipherbench_report::ReportError;

/// Errors surfaced by the harness.
///
/// A `Backend` error aborts the current benchmark only; the session moves
/// on to the next one. Validation failures are run outcomes, not errors,
/// and never appear here.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Caller contract broken: nulls, out-of-range indices, type
    /// mismatches, unknown workload parameters. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The backend returned a non-success status; carries the backend's
    /// last-error text.
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Report(#[from] ReportError),

    /// Session configuration could not be read or expanded.
    #[error("configuration error: {0}")]
    Config(String),

    /// External dataset file was malformed or inconsistent with the
    /// benchmark's shape.
    #[error("dataset error: {0}")]
    Dataset(String),
}

impl HarnessError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        HarnessError::InvalidArgument(msg.into())
    }
}

pub type Result<T, E = HarnessError> = std::result::Result<T, E>;
