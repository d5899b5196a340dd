//! In-process backends.

pub mod clear_text;

pub use clear_text::{AdvertisedBenchmark, ClearTextBackend, FailingOperateBackend};
