//! Seeded synthetic data generation.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cipherbench_abi::DataType;

use crate::elements::write_f64;

/// Shared seeded generator for synthetic benchmark inputs.
///
/// The PRNG sits behind a mutex so generation stays reproducible under any
/// thread ordering; data loaders hold the source through an `Arc`.
pub struct SyntheticSource {
    rng: Mutex<StdRng>,
}

impl SyntheticSource {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Fills `out` with uniform values in `[min_val, max_val)`.
    pub fn fill_uniform(&self, data_type: DataType, out: &mut [u8], min_val: f64, max_val: f64) {
        let width = data_type.size_of() as usize;
        let mut rng = self.rng.lock();
        for chunk in out.chunks_exact_mut(width) {
            let v = rng.gen_range(min_val..max_val);
            write_f64(data_type, v, chunk);
        }
    }

    /// Fills `out` with normally distributed values (Box-Muller over the
    /// shared uniform stream).
    pub fn fill_normal(&self, data_type: DataType, out: &mut [u8], mean: f64, stddev: f64) {
        let width = data_type.size_of() as usize;
        let mut rng = self.rng.lock();
        let mut spare: Option<f64> = None;
        for chunk in out.chunks_exact_mut(width) {
            let z = match spare.take() {
                Some(z) => z,
                None => {
                    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
                    let u2: f64 = rng.gen_range(0.0..1.0);
                    let r = (-2.0 * u1.ln()).sqrt();
                    let theta = 2.0 * std::f64::consts::PI * u2;
                    spare = Some(r * theta.sin());
                    r * theta.cos()
                }
            };
            write_f64(data_type, mean + stddev * z, chunk);
        }
    }

    /// Picks a uniform count of distinct indices below `n` (at most
    /// `max_count` when given). Used to plant set intersections.
    #[must_use]
    pub fn intersection_indices(&self, n: u64, max_count: Option<u64>) -> Vec<u64> {
        let mut rng = self.rng.lock();
        let limit = max_count.unwrap_or(n).min(n);
        if limit == 0 {
            return Vec::new();
        }
        let count = rng.gen_range(0..=limit);
        let mut indices: Vec<u64> = (0..n).collect();
        for i in 0..count as usize {
            let j = rng.gen_range(i..indices.len());
            indices.swap(i, j);
        }
        indices.truncate(count as usize);
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::read_f64s;

    #[test]
    fn same_seed_reproduces_the_stream() {
        let a = SyntheticSource::new(0xDEAD_BEEF);
        let b = SyntheticSource::new(0xDEAD_BEEF);
        let mut buf_a = vec![0u8; 64 * 8];
        let mut buf_b = vec![0u8; 64 * 8];
        a.fill_uniform(DataType::Float64, &mut buf_a, -16_384.0, 16_384.0);
        b.fill_uniform(DataType::Float64, &mut buf_b, -16_384.0, 16_384.0);
        assert_eq!(buf_a, buf_b);
    }

    #[test]
    fn uniform_respects_bounds() {
        let source = SyntheticSource::new(7);
        let mut buf = vec![0u8; 256 * 8];
        source.fill_uniform(DataType::Float64, &mut buf, -2.0, 3.0);
        for v in read_f64s(DataType::Float64, &buf).unwrap() {
            assert!((-2.0..3.0).contains(&v), "out of range: {v}");
        }
    }

    #[test]
    fn integer_types_generate_whole_values() {
        let source = SyntheticSource::new(11);
        let mut buf = vec![0u8; 64 * 8];
        source.fill_uniform(DataType::Int64, &mut buf, -100.0, 100.0);
        for v in read_f64s(DataType::Int64, &buf).unwrap() {
            assert_eq!(v, v.trunc());
            assert!((-100.0..100.0).contains(&v));
        }
    }

    #[test]
    fn intersection_indices_are_distinct_and_bounded() {
        let source = SyntheticSource::new(3);
        for _ in 0..16 {
            let indices = source.intersection_indices(20, Some(10));
            assert!(indices.len() <= 10);
            let mut sorted = indices.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), indices.len());
            assert!(indices.iter().all(|&i| i < 20));
        }
    }
}
