//! Dot product workload.

use std::sync::Arc;

use cipherbench_abi::{BenchmarkDescriptor, DataType, Workload, WorkloadParam};

use crate::data_gen::SyntheticSource;
use crate::data_loader::{DataLoader, LoaderArena};
use crate::dataset::load_dataset_into;
use crate::description::Configuration;
use crate::elements::write_f64s;
use crate::error::Result;
use crate::workloads::eltwise_add::{fill_ground_truth, fill_inputs, gather_inputs};
use crate::workloads::{WorkloadFamily, fetch_uint_param};

pub const LATENCY_EVENT_ID_BASE: u32 = 601;
pub const OFFLINE_EVENT_ID_BASE: u32 = 701;

pub const BASE_WORKLOAD_NAME: &str = "Dot Product";

/// `r = Σ A[i] · B[i]` over vectors of a configured length; the result is
/// a single element.
pub struct DotProductFamily;

impl WorkloadFamily for DotProductFamily {
    fn serves(&self, workload: Workload) -> bool {
        workload == Workload::DotProduct
    }

    fn validate_params(&self, w_params: &[WorkloadParam]) -> Result<()> {
        fetch_uint_param(w_params, 0).map(|_| ())
    }

    fn base_name(&self, _descriptor: &BenchmarkDescriptor) -> String {
        BASE_WORKLOAD_NAME.to_string()
    }

    fn decorated_name(
        &self,
        _descriptor: &BenchmarkDescriptor,
        w_params: &[WorkloadParam],
    ) -> String {
        let n = fetch_uint_param(w_params, 0).unwrap_or_default();
        format!("{BASE_WORKLOAD_NAME} ({n})")
    }

    fn operation_params_count(&self, _w_params: &[WorkloadParam]) -> u64 {
        2
    }

    fn build_loader(
        &self,
        descriptor: &BenchmarkDescriptor,
        config: &Configuration,
        batch_sizes: &[u64],
    ) -> Result<Arc<dyn DataLoader>> {
        let vector_size = fetch_uint_param(&config.w_params, 0)?;
        Ok(Arc::new(DotProductLoader::new(
            vector_size,
            batch_sizes,
            descriptor.data_type,
            config,
        )?))
    }
}

/// Two operand packs of equal-length vectors; the ground truth for each
/// combination is their single-element dot product.
pub struct DotProductLoader {
    arena: LoaderArena,
    data_type: DataType,
}

impl DotProductLoader {
    pub fn new(
        vector_size: u64,
        batch_sizes: &[u64],
        data_type: DataType,
        config: &Configuration,
    ) -> Result<Self> {
        let input_size = vector_size * data_type.size_of();
        let output_size = data_type.size_of();
        let mut arena = LoaderArena::default();
        arena.init(batch_sizes, 1)?;
        arena.allocate(
            &vec![input_size; batch_sizes.len()],
            &[output_size],
            true,
        )?;

        let mut loader = Self { arena, data_type };
        match &config.dataset_filename {
            Some(path) => {
                let outputs_loaded = load_dataset_into(&mut loader.arena, data_type, path)?;
                if !outputs_loaded {
                    fill_ground_truth(&mut loader.arena, data_type, batch_sizes, dot_reference)?;
                }
            }
            None => {
                let source = SyntheticSource::new(config.random_seed);
                fill_inputs(&mut loader.arena, data_type, &source)?;
                fill_ground_truth(&mut loader.arena, data_type, batch_sizes, dot_reference)?;
            }
        }
        Ok(loader)
    }
}

impl DataLoader for DotProductLoader {
    fn arena(&self) -> &LoaderArena {
        &self.arena
    }

    fn data_type(&self) -> DataType {
        self.data_type
    }

    fn compute_reference(&self, indices: &[u64], outputs: &mut [Vec<u8>]) -> Result<()> {
        let inputs = gather_inputs(&self.arena, self.data_type, indices)?;
        write_f64s(self.data_type, &dot_reference(&inputs), &mut outputs[0])
    }
}

fn dot_reference(inputs: &[Vec<f64>]) -> Vec<f64> {
    let dot = inputs[0]
        .iter()
        .zip(&inputs[1])
        .map(|(a, b)| a * b)
        .sum::<f64>();
    vec![dot]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::read_f64s;

    #[test]
    fn ground_truth_is_the_inner_product() {
        let config = Configuration {
            random_seed: 5,
            w_params: vec![WorkloadParam::uint("n", 16)],
            ..Configuration::default()
        };
        let loader = DotProductLoader::new(16, &[1, 1], DataType::Float64, &config).unwrap();
        let inputs = gather_inputs(loader.arena(), DataType::Float64, &[0, 0]).unwrap();
        let expected: f64 = inputs[0].iter().zip(&inputs[1]).map(|(a, b)| a * b).sum();
        let truth = loader.result_for(&[0, 0]).unwrap();
        let got = read_f64s(DataType::Float64, &truth[0]).unwrap()[0];
        assert!((got - expected).abs() < 1e-6 * expected.abs().max(1.0));
    }

    #[test]
    fn offline_product_counts_are_row_major() {
        let config = Configuration {
            random_seed: 5,
            w_params: vec![WorkloadParam::uint("n", 4)],
            ..Configuration::default()
        };
        let loader = DotProductLoader::new(4, &[3, 10], DataType::Float32, &config).unwrap();
        assert_eq!(loader.arena().result_pack(0).unwrap().sample_count(), 30);
        assert_eq!(loader.result_index(&[2, 9]).unwrap(), 29);
    }
}
