//! Simple set intersection workload.
//!
//! Operands are two sets X (n items) and Y (m items) of k-element tuples;
//! the result Z holds the members of the larger set found in the smaller
//! one, padded with zeros to min(n, m) items. Validation is a
//! set-membership comparison with a relaxed tolerance.

use std::sync::Arc;

use cipherbench_abi::{BenchmarkDescriptor, DataType, Workload, WorkloadParam};

use crate::component_counter::ComponentCounter;
use crate::data_gen::SyntheticSource;
use crate::data_loader::{DataLoader, LoaderArena};
use crate::dataset::load_dataset_into;
use crate::description::Configuration;
use crate::elements::{read_f64s, write_f64s};
use crate::error::Result;
use crate::validation::{ResultValidator, SetValidator};
use crate::workloads::eltwise_add::{GEN_MAX, GEN_MIN, gather_inputs};
use crate::workloads::{WorkloadFamily, fetch_uint_param};

pub const LATENCY_EVENT_ID_BASE: u32 = 1201;
pub const OFFLINE_EVENT_ID_BASE: u32 = 1301;

pub const BASE_WORKLOAD_NAME: &str = "Simple Set Intersection";

/// Workload parameters: |X|, |Y|, and the element arity k.
#[derive(Debug, Clone, Copy)]
pub struct SetSizes {
    pub n: u64,
    pub m: u64,
    pub k: u64,
}

pub fn fetch_set_sizes(w_params: &[WorkloadParam]) -> Result<SetSizes> {
    Ok(SetSizes {
        n: fetch_uint_param(w_params, 0)?,
        m: fetch_uint_param(w_params, 1)?,
        k: fetch_uint_param(w_params, 2)?,
    })
}

/// `Z = X ∩ Y` over sets of k-element tuples.
pub struct SetIntersectionFamily;

impl WorkloadFamily for SetIntersectionFamily {
    fn serves(&self, workload: Workload) -> bool {
        workload == Workload::SimpleSetIntersection
    }

    fn validate_params(&self, w_params: &[WorkloadParam]) -> Result<()> {
        fetch_set_sizes(w_params).map(|_| ())
    }

    fn base_name(&self, _descriptor: &BenchmarkDescriptor) -> String {
        BASE_WORKLOAD_NAME.to_string()
    }

    fn decorated_name(
        &self,
        _descriptor: &BenchmarkDescriptor,
        w_params: &[WorkloadParam],
    ) -> String {
        match fetch_set_sizes(w_params) {
            Ok(sizes) => format!(
                "{BASE_WORKLOAD_NAME} ({}, {}, {})",
                sizes.n, sizes.m, sizes.k
            ),
            Err(_) => BASE_WORKLOAD_NAME.to_string(),
        }
    }

    fn operation_params_count(&self, _w_params: &[WorkloadParam]) -> u64 {
        2
    }

    fn workload_header(&self, w_params: &[WorkloadParam]) -> String {
        match fetch_set_sizes(w_params) {
            Ok(sizes) => format!(
                ", , |X|, {}\n, , |Y|, {}\n, , k, {}",
                sizes.n, sizes.m, sizes.k
            ),
            Err(_) => String::new(),
        }
    }

    fn build_loader(
        &self,
        descriptor: &BenchmarkDescriptor,
        config: &Configuration,
        batch_sizes: &[u64],
    ) -> Result<Arc<dyn DataLoader>> {
        let sizes = fetch_set_sizes(&config.w_params)?;
        Ok(Arc::new(SetIntersectionLoader::new(
            sizes,
            batch_sizes,
            descriptor.data_type,
            config,
        )?))
    }

    fn validator(&self, w_params: &[WorkloadParam]) -> Arc<dyn ResultValidator> {
        let k = fetch_set_sizes(w_params).map(|s| s.k).unwrap_or(1);
        Arc::new(SetValidator::new(k))
    }
}

/// Reference intersection: iterate the larger set, keep members found in
/// the smaller one, zero-pad the tail.
pub fn set_intersection_reference(x: &[f64], y: &[f64], n: u64, m: u64, k: u64) -> Vec<f64> {
    let k = k.max(1) as usize;
    let result_items = n.min(m) as usize;
    let mut out = vec![0.0; result_items * k];
    let (haystack, needles, needle_count) = if n > m {
        (y, x, n as usize)
    } else {
        (x, y, m as usize)
    };
    let mut written = 0usize;
    for i in 0..needle_count {
        let item = &needles[i * k..(i + 1) * k];
        let member = haystack
            .chunks(k)
            .any(|candidate| candidate == item);
        if member && written < result_items {
            out[written * k..(written + 1) * k].copy_from_slice(item);
            written += 1;
        }
    }
    out
}

/// Two set operands with a planted intersection so results are
/// non-trivial.
pub struct SetIntersectionLoader {
    arena: LoaderArena,
    data_type: DataType,
    sizes: SetSizes,
}

impl SetIntersectionLoader {
    pub fn new(
        sizes: SetSizes,
        batch_sizes: &[u64],
        data_type: DataType,
        config: &Configuration,
    ) -> Result<Self> {
        let elem = data_type.size_of();
        let input_sizes = [sizes.n * sizes.k * elem, sizes.m * sizes.k * elem];
        let output_size = sizes.n.min(sizes.m) * sizes.k * elem;
        let mut arena = LoaderArena::default();
        arena.init(batch_sizes, 1)?;
        arena.allocate(&input_sizes, &[output_size], true)?;

        let mut loader = Self {
            arena,
            data_type,
            sizes,
        };
        match &config.dataset_filename {
            Some(path) => {
                let outputs_loaded = load_dataset_into(&mut loader.arena, data_type, path)?;
                if !outputs_loaded {
                    loader.fill_ground_truth(batch_sizes)?;
                }
            }
            None => loader.generate(config.random_seed, batch_sizes)?,
        }
        Ok(loader)
    }

    fn generate(&mut self, seed: u64, batch_sizes: &[u64]) -> Result<()> {
        let source = SyntheticSource::new(seed);
        let SetSizes { n, m, k } = self.sizes;
        let k_usize = k as usize;

        for x_sample in 0..batch_sizes[0] {
            let x_bytes = self.arena.input_sample_mut(0, x_sample)?;
            source.fill_uniform(self.data_type, x_bytes, GEN_MIN, GEN_MAX);
        }

        // plant a random subset of an X sample into each Y sample so the
        // intersection is non-trivial
        for y_sample in 0..batch_sizes[1] {
            let x_sample = y_sample.min(batch_sizes[0] - 1);
            let x_values =
                read_f64s(self.data_type, self.arena.input_sample_mut(0, x_sample)?)?;

            let planted_y = source.intersection_indices(m, Some(n.min(m)));
            let mut x_pool = source.intersection_indices(n, Some(planted_y.len() as u64));

            let mut y_values = vec![0.0f64; (m * k) as usize];
            for idx_y in 0..m {
                let slot = (idx_y as usize) * k_usize..(idx_y as usize + 1) * k_usize;
                if planted_y.contains(&idx_y)
                    && let Some(idx_x) = x_pool.pop()
                {
                    let idx_x = idx_x as usize;
                    y_values[slot]
                        .copy_from_slice(&x_values[idx_x * k_usize..(idx_x + 1) * k_usize]);
                } else {
                    let mut tuple = vec![0u8; k_usize * self.data_type.size_of() as usize];
                    source.fill_uniform(self.data_type, &mut tuple, GEN_MIN, GEN_MAX);
                    y_values[slot].copy_from_slice(&read_f64s(self.data_type, &tuple)?);
                }
            }
            let y_bytes = self.arena.input_sample_mut(1, y_sample)?;
            write_f64s(self.data_type, &y_values, y_bytes)?;
        }

        self.fill_ground_truth(batch_sizes)
    }

    fn fill_ground_truth(&mut self, batch_sizes: &[u64]) -> Result<()> {
        let SetSizes { n, m, k } = self.sizes;
        let mut counter = ComponentCounter::new(batch_sizes.to_vec());
        loop {
            let indices = counter.count().to_vec();
            let result_i = self.arena.result_index(&indices)?;
            let inputs = gather_inputs(&self.arena, self.data_type, &indices)?;
            let z = set_intersection_reference(&inputs[0], &inputs[1], n, m, k);
            let out = self.arena.output_sample_mut(0, result_i)?;
            write_f64s(self.data_type, &z, out)?;
            if counter.inc() {
                break;
            }
        }
        Ok(())
    }
}

impl DataLoader for SetIntersectionLoader {
    fn arena(&self) -> &LoaderArena {
        &self.arena
    }

    fn data_type(&self) -> DataType {
        self.data_type
    }

    fn compute_reference(&self, indices: &[u64], outputs: &mut [Vec<u8>]) -> Result<()> {
        let inputs = gather_inputs(&self.arena, self.data_type, indices)?;
        let SetSizes { n, m, k } = self.sizes;
        let z = set_intersection_reference(&inputs[0], &inputs[1], n, m, k);
        write_f64s(self.data_type, &z, &mut outputs[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_iterates_the_larger_side() {
        // n > m: members of X found in Y
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [3.0, 9.0];
        let z = set_intersection_reference(&x, &y, 4, 2, 1);
        assert_eq!(z, vec![3.0, 0.0]);

        // m > n: members of Y found in X
        let x2 = [3.0, 9.0];
        let y2 = [1.0, 2.0, 3.0, 4.0];
        let z2 = set_intersection_reference(&x2, &y2, 2, 4, 1);
        assert_eq!(z2, vec![3.0, 0.0]);
    }

    #[test]
    fn tuples_compare_whole() {
        // k = 2: (1,2) is a member, (1,9) is not
        let x = [1.0, 2.0, 1.0, 9.0];
        let y = [1.0, 2.0, 7.0, 8.0];
        let z = set_intersection_reference(&x, &y, 2, 2, 2);
        assert_eq!(z, vec![1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn generated_sets_intersect_exactly_where_planted() {
        let config = Configuration {
            random_seed: 0xDEAD_BEEF,
            w_params: vec![
                WorkloadParam::uint("n", 64),
                WorkloadParam::uint("m", 96),
                WorkloadParam::uint("k", 4),
            ],
            ..Configuration::default()
        };
        let sizes = SetSizes { n: 64, m: 96, k: 4 };
        let loader =
            SetIntersectionLoader::new(sizes, &[1, 1], DataType::Int64, &config).unwrap();
        let inputs = gather_inputs(loader.arena(), DataType::Int64, &[0, 0]).unwrap();
        let z = set_intersection_reference(&inputs[0], &inputs[1], 64, 96, 4);
        // the stored ground truth is exactly the reference result
        let truth = loader.result_for(&[0, 0]).unwrap();
        let truth_values = read_f64s(DataType::Int64, &truth[0]).unwrap();
        assert_eq!(truth_values, z);
        // result holds min(n, m) tuples
        assert_eq!(z.len(), 64 * 4);
    }
}
