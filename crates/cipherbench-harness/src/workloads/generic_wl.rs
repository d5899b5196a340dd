//! Generic workload: backend-defined operation over flexible input and
//! output arities, driven entirely by an external dataset.

use std::sync::Arc;

use cipherbench_abi::{BenchmarkDescriptor, DataType, MAX_OP_PARAMS, Workload, WorkloadParam};

use crate::data_loader::{DataLoader, LoaderArena};
use crate::dataset::load_dataset_into;
use crate::description::Configuration;
use crate::error::{HarnessError, Result};
use crate::workloads::{WorkloadFamily, fetch_uint_param};

pub const LATENCY_EVENT_ID_BASE: u32 = 1001;
pub const OFFLINE_EVENT_ID_BASE: u32 = 1101;

pub const BASE_WORKLOAD_NAME: &str = "Generic";

/// Input and output vector sizes decoded from the workload parameters:
/// `[input_count, output_count, in₀…, out₀…]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoSizes {
    pub inputs: Vec<u64>,
    pub outputs: Vec<u64>,
}

pub fn fetch_io_sizes(w_params: &[WorkloadParam]) -> Result<IoSizes> {
    let input_count = fetch_uint_param(w_params, 0)?;
    let output_count = fetch_uint_param(w_params, 1)?;
    if input_count as usize > MAX_OP_PARAMS {
        return Err(HarnessError::invalid(format!(
            "operation can take at most {MAX_OP_PARAMS} inputs, {input_count} requested"
        )));
    }
    let expected = 2 + input_count + output_count;
    if (w_params.len() as u64) < expected {
        return Err(HarnessError::invalid(format!(
            "insufficient workload parameters; expected {expected}, received {}",
            w_params.len()
        )));
    }
    let inputs = (0..input_count)
        .map(|i| fetch_uint_param(w_params, (2 + i) as usize))
        .collect::<Result<Vec<_>>>()?;
    let outputs = (0..output_count)
        .map(|i| fetch_uint_param(w_params, (2 + input_count + i) as usize))
        .collect::<Result<Vec<_>>>()?;
    Ok(IoSizes { inputs, outputs })
}

/// Operation semantics live in the backend; the harness only shapes the
/// buffers and checks against dataset-provided ground truth.
pub struct GenericFamily;

impl WorkloadFamily for GenericFamily {
    fn serves(&self, workload: Workload) -> bool {
        workload == Workload::Generic
    }

    fn validate_params(&self, w_params: &[WorkloadParam]) -> Result<()> {
        fetch_io_sizes(w_params).map(|_| ())
    }

    fn base_name(&self, _descriptor: &BenchmarkDescriptor) -> String {
        BASE_WORKLOAD_NAME.to_string()
    }

    fn decorated_name(
        &self,
        _descriptor: &BenchmarkDescriptor,
        w_params: &[WorkloadParam],
    ) -> String {
        match fetch_io_sizes(w_params) {
            Ok(io) => format!(
                "{BASE_WORKLOAD_NAME}, {} Inputs, {} Outputs",
                io.inputs.len(),
                io.outputs.len()
            ),
            Err(_) => BASE_WORKLOAD_NAME.to_string(),
        }
    }

    fn operation_params_count(&self, w_params: &[WorkloadParam]) -> u64 {
        fetch_io_sizes(w_params)
            .map(|io| io.inputs.len() as u64)
            .unwrap_or(0)
    }

    fn build_loader(
        &self,
        descriptor: &BenchmarkDescriptor,
        config: &Configuration,
        batch_sizes: &[u64],
    ) -> Result<Arc<dyn DataLoader>> {
        let io = fetch_io_sizes(&config.w_params)?;
        let dataset = config.dataset_filename.as_ref().ok_or_else(|| {
            HarnessError::invalid("the generic workload requires an external dataset")
        })?;
        Ok(Arc::new(GenericLoader::new(
            io,
            batch_sizes,
            descriptor.data_type,
            dataset,
        )?))
    }
}

/// Shapes one pack per input from the workload parameters and loads every
/// buffer, ground truth included, from the dataset.
#[derive(Debug)]
pub struct GenericLoader {
    arena: LoaderArena,
    data_type: DataType,
}

impl GenericLoader {
    pub fn new(
        io: IoSizes,
        batch_sizes: &[u64],
        data_type: DataType,
        dataset: impl AsRef<std::path::Path>,
    ) -> Result<Self> {
        if batch_sizes.len() != io.inputs.len() {
            return Err(HarnessError::invalid(format!(
                "expected {} batch sizes, received {}",
                io.inputs.len(),
                batch_sizes.len()
            )));
        }
        let elem = data_type.size_of();
        let input_sizes: Vec<u64> = io.inputs.iter().map(|n| n * elem).collect();
        let output_sizes: Vec<u64> = io.outputs.iter().map(|n| n * elem).collect();
        let mut arena = LoaderArena::default();
        arena.init(batch_sizes, io.outputs.len())?;
        arena.allocate(&input_sizes, &output_sizes, true)?;

        let outputs_loaded = load_dataset_into(&mut arena, data_type, dataset)?;
        if !outputs_loaded {
            return Err(HarnessError::Dataset(String::from(
                "the generic workload dataset must provide ground-truth outputs",
            )));
        }
        Ok(Self { arena, data_type })
    }
}

impl DataLoader for GenericLoader {
    fn arena(&self) -> &LoaderArena {
        &self.arena
    }

    fn data_type(&self) -> DataType {
        self.data_type
    }

    fn compute_reference(&self, _indices: &[u64], _outputs: &mut [Vec<u8>]) -> Result<()> {
        Err(HarnessError::invalid(
            "cannot compute outputs for the generic workload",
        ))
    }
}
