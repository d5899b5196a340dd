//! Benchmark execution engine for cipherbench.
//!
//! The harness drives an HE compute backend through the API bridge:
//! a session enumerates the backend's advertised benchmarks, the registry
//! matches each selection against the known workload descriptors, and the
//! category runners execute the encode → encrypt → load → operate → store
//! → decrypt → decode pipeline while recording timing events. Decoded
//! results are validated against generated or loaded ground truth, and the
//! session emits tagged-CSV reports plus derived statistics.

pub mod backend;
pub mod component_counter;
pub mod config;
pub mod data_gen;
pub mod data_loader;
pub mod dataset;
pub mod elements;
pub mod description;
pub mod engine;
pub mod error;
pub mod registry;
pub mod report_path;
pub mod run;
pub mod session;
pub mod validation;
pub mod workloads;

pub use component_counter::ComponentCounter;
pub use description::{BackendDescription, Configuration, Description, DescriptionToken, DescriptorKey};
pub use engine::Engine;
pub use error::HarnessError;
pub use registry::{Registry, WorkloadDescriptor, WorkloadDescriptionOutput};
pub use run::{BenchmarkRunner, RunConfig};
pub use session::{Session, SessionOutcome};
