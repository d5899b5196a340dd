//! Element-wise vector addition workload.

use std::sync::Arc;

use cipherbench_abi::{BenchmarkDescriptor, DataType, Workload, WorkloadParam};

use crate::component_counter::ComponentCounter;
use crate::data_gen::SyntheticSource;
use crate::data_loader::{DataLoader, LoaderArena};
use crate::dataset::load_dataset_into;
use crate::description::Configuration;
use crate::elements::{read_f64s, write_f64s};
use crate::error::Result;
use crate::workloads::{WorkloadFamily, fetch_uint_param};

pub const LATENCY_EVENT_ID_BASE: u32 = 401;
pub const OFFLINE_EVENT_ID_BASE: u32 = 501;

pub const BASE_WORKLOAD_NAME: &str = "Element-wise Addition";

/// Uniform generation range shared by the vector workloads.
pub(crate) const GEN_MIN: f64 = -16_384.0;
pub(crate) const GEN_MAX: f64 = 16_384.0;

/// `C[i] = A[i] + B[i]` over vectors of a configured length.
pub struct EltwiseAddFamily;

impl WorkloadFamily for EltwiseAddFamily {
    fn serves(&self, workload: Workload) -> bool {
        workload == Workload::EltwiseAdd
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
        Ok(Arc::new(EltwiseAddLoader::new(
            vector_size,
            batch_sizes,
            descriptor.data_type,
            config,
        )?))
    }
}

/// Two operand packs of equal-length vectors; ground truth is the
/// element-wise sum.
pub struct EltwiseAddLoader {
    arena: LoaderArena,
    data_type: DataType,
}

impl EltwiseAddLoader {
    pub fn new(
        vector_size: u64,
        batch_sizes: &[u64],
        data_type: DataType,
        config: &Configuration,
    ) -> Result<Self> {
        let buffer_size = vector_size * data_type.size_of();
        let mut arena = LoaderArena::default();
        arena.init(batch_sizes, 1)?;
        arena.allocate(
            &vec![buffer_size; batch_sizes.len()],
            &[buffer_size],
            true,
        )?;

        let mut loader = Self { arena, data_type };
        match &config.dataset_filename {
            Some(path) => {
                let outputs_loaded = load_dataset_into(&mut loader.arena, data_type, path)?;
                if !outputs_loaded {
                    fill_ground_truth(&mut loader.arena, data_type, batch_sizes, add_reference)?;
                }
            }
            None => {
                let source = SyntheticSource::new(config.random_seed);
                fill_inputs(&mut loader.arena, data_type, &source)?;
                fill_ground_truth(&mut loader.arena, data_type, batch_sizes, add_reference)?;
            }
        }
        Ok(loader)
    }
}

impl DataLoader for EltwiseAddLoader {
    fn arena(&self) -> &LoaderArena {
        &self.arena
    }

    fn data_type(&self) -> DataType {
        self.data_type
    }

    fn compute_reference(&self, indices: &[u64], outputs: &mut [Vec<u8>]) -> Result<()> {
        let inputs = gather_inputs(&self.arena, self.data_type, indices)?;
        let result = add_reference(&inputs);
        write_f64s(self.data_type, &result, &mut outputs[0])
    }
}

fn add_reference(inputs: &[Vec<f64>]) -> Vec<f64> {
    let mut out = inputs[0].clone();
    for operand in &inputs[1..] {
        for (acc, v) in out.iter_mut().zip(operand) {
            *acc += v;
        }
    }
    out
}

/// Reads the selected sample of every operand as `f64` values.
pub(crate) fn gather_inputs(
    arena: &LoaderArena,
    data_type: DataType,
    indices: &[u64],
) -> Result<Vec<Vec<f64>>> {
    (0..arena.parameter_count())
        .map(|param| {
            let record = arena.parameter_pack(param)?.buffers[indices[param as usize] as usize];
            read_f64s(data_type, arena.bytes(&record)?)
        })
        .collect()
}

/// Fills every input sample with uniform synthetic data.
pub(crate) fn fill_inputs(
    arena: &mut LoaderArena,
    data_type: DataType,
    source: &SyntheticSource,
) -> Result<()> {
    for param in 0..arena.parameter_count() {
        for sample in 0..arena.parameter_pack(param)?.sample_count() {
            let bytes = arena.input_sample_mut(param, sample)?;
            source.fill_uniform(data_type, bytes, GEN_MIN, GEN_MAX);
        }
    }
    Ok(())
}

/// Pre-computes ground truth for every input combination using a
/// single-output reference function.
pub(crate) fn fill_ground_truth(
    arena: &mut LoaderArena,
    data_type: DataType,
    batch_sizes: &[u64],
    reference: impl Fn(&[Vec<f64>]) -> Vec<f64>,
) -> Result<()> {
    let mut counter = ComponentCounter::new(batch_sizes.to_vec());
    loop {
        let indices = counter.count().to_vec();
        let result_i = arena.result_index(&indices)?;
        let inputs = gather_inputs(arena, data_type, &indices)?;
        let result = reference(&inputs);
        let out = arena.output_sample_mut(0, result_i)?;
        write_f64s(data_type, &result, out)?;
        if counter.inc() {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_seed(seed: u64) -> Configuration {
        Configuration {
            random_seed: seed,
            w_params: vec![WorkloadParam::uint("n", 8)],
            ..Configuration::default()
        }
    }

    #[test]
    fn ground_truth_is_the_element_wise_sum() {
        let config = config_with_seed(42);
        let loader =
            EltwiseAddLoader::new(8, &[1, 1], DataType::Float64, &config).unwrap();
        let arena = loader.arena();
        let a = read_f64s(
            DataType::Float64,
            arena.bytes(&arena.parameter_pack(0).unwrap().buffers[0]).unwrap(),
        )
        .unwrap();
        let b = read_f64s(
            DataType::Float64,
            arena.bytes(&arena.parameter_pack(1).unwrap().buffers[0]).unwrap(),
        )
        .unwrap();
        let truth = loader.result_for(&[0, 0]).unwrap();
        let truth_values = read_f64s(DataType::Float64, &truth[0]).unwrap();
        for i in 0..8 {
            assert!((truth_values[i] - (a[i] + b[i])).abs() < 1e-9);
        }
    }

    #[test]
    fn offline_batches_precompute_the_full_product() {
        let config = config_with_seed(1);
        let loader =
            EltwiseAddLoader::new(4, &[2, 3], DataType::Float32, &config).unwrap();
        assert_eq!(loader.arena().result_pack(0).unwrap().sample_count(), 6);
        // every combination has a readable, pre-computed ground truth
        for a in 0..2u64 {
            for b in 0..3u64 {
                assert!(loader.result_for(&[a, b]).is_ok());
            }
        }
    }

    #[test]
    fn generation_is_reproducible_for_a_seed() {
        let loader_a =
            EltwiseAddLoader::new(8, &[1, 1], DataType::Float64, &config_with_seed(7)).unwrap();
        let loader_b =
            EltwiseAddLoader::new(8, &[1, 1], DataType::Float64, &config_with_seed(7)).unwrap();
        let bytes = |loader: &EltwiseAddLoader| {
            let arena = loader.arena();
            let rec = arena.parameter_pack(0).unwrap().buffers[0];
            arena.bytes(&rec).unwrap().to_vec()
        };
        assert_eq!(bytes(&loader_a), bytes(&loader_b));
    }
}
