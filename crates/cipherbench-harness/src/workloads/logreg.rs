//! Logistic-regression inference workload, with polynomial sigmoid
//! approximations of degree 3, 5, and 7.

use std::sync::Arc;

use cipherbench_abi::{BenchmarkDescriptor, DataType, Workload, WorkloadParam};

use crate::component_counter::ComponentCounter;
use crate::data_gen::SyntheticSource;
use crate::data_loader::{DataLoader, LoaderArena};
use crate::dataset::load_dataset_into;
use crate::description::Configuration;
use crate::elements::write_f64s;
use crate::error::Result;
use crate::workloads::eltwise_add::gather_inputs;
use crate::workloads::{WorkloadFamily, fetch_uint_param};

pub const LATENCY_EVENT_ID_BASE: u32 = 801;
pub const OFFLINE_EVENT_ID_BASE: u32 = 901;

pub const BASE_WORKLOAD_NAME: &str = "Logistic Regression";

/// Sigmoid flavor; the polynomial variants approximate the sigmoid over
/// the interval the encrypted evaluation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolynomialDegree {
    None,
    PD3,
    PD5,
    PD7,
}

impl PolynomialDegree {
    fn from_workload(workload: Workload) -> Option<Self> {
        match workload {
            Workload::LogisticRegression => Some(PolynomialDegree::None),
            Workload::LogisticRegressionPolyD3 => Some(PolynomialDegree::PD3),
            Workload::LogisticRegressionPolyD5 => Some(PolynomialDegree::PD5),
            Workload::LogisticRegressionPolyD7 => Some(PolynomialDegree::PD7),
            _ => None,
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            PolynomialDegree::None => "",
            PolynomialDegree::PD3 => " PolyD3",
            PolynomialDegree::PD5 => " PolyD5",
            PolynomialDegree::PD7 => " PolyD7",
        }
    }
}

fn evaluate_polynomial(x: f64, coefficients: &[f64]) -> f64 {
    let mut acc = 0.0;
    for c in coefficients.iter().rev() {
        acc = acc * x + c;
    }
    acc
}

/// Sigmoid or its polynomial approximation.
///
/// The polynomial coefficients come pre-scaled for evaluation on `x`
/// directly, e.g. f3(x) = 0.5 + 1.20096(x/8) - 0.81562(x/8)^3.
pub fn sigmoid(degree: PolynomialDegree, x: f64) -> f64 {
    match degree {
        PolynomialDegree::None => 1.0 / (1.0 + (-x).exp()),
        PolynomialDegree::PD3 => {
            evaluate_polynomial(x, &[0.5, 0.15012, 0.0, -0.0015930078125])
        }
        PolynomialDegree::PD5 => evaluate_polynomial(
            x,
            &[0.5, 0.19131, 0.0, -0.0045963, 0.0, 0.0000412332000732421875],
        ),
        PolynomialDegree::PD7 => evaluate_polynomial(
            x,
            &[
                0.5,
                0.21687,
                0.0,
                -0.00819154296875,
                0.0,
                0.0001658331298828125,
                0.0,
                -0.00000119561672210693359375,
            ],
        ),
    }
}

/// `r = sigmoid(W · X + b)` with operands weights, bias, and input.
pub struct LogRegFamily;

impl WorkloadFamily for LogRegFamily {
    fn serves(&self, workload: Workload) -> bool {
        PolynomialDegree::from_workload(workload).is_some()
    }

    fn validate_params(&self, w_params: &[WorkloadParam]) -> Result<()> {
        fetch_uint_param(w_params, 0).map(|_| ())
    }

    fn base_name(&self, descriptor: &BenchmarkDescriptor) -> String {
        let degree =
            PolynomialDegree::from_workload(descriptor.workload).unwrap_or(PolynomialDegree::None);
        format!("{BASE_WORKLOAD_NAME}{}", degree.suffix())
    }

    fn decorated_name(
        &self,
        descriptor: &BenchmarkDescriptor,
        w_params: &[WorkloadParam],
    ) -> String {
        let n = fetch_uint_param(w_params, 0).unwrap_or_default();
        format!("{} ({n} features)", self.base_name(descriptor))
    }

    fn operation_params_count(&self, _w_params: &[WorkloadParam]) -> u64 {
        3
    }

    fn build_loader(
        &self,
        descriptor: &BenchmarkDescriptor,
        config: &Configuration,
        batch_sizes: &[u64],
    ) -> Result<Arc<dyn DataLoader>> {
        let feature_count = fetch_uint_param(&config.w_params, 0)?;
        let degree = PolynomialDegree::from_workload(descriptor.workload)
            .unwrap_or(PolynomialDegree::None);
        Ok(Arc::new(LogRegLoader::new(
            degree,
            feature_count,
            batch_sizes,
            descriptor.data_type,
            config,
        )?))
    }
}

/// Operands: weight vector (features), bias (one element), input vector
/// (features). Weights and bias come from the first sample only; the
/// model is fixed while inputs batch.
pub struct LogRegLoader {
    arena: LoaderArena,
    data_type: DataType,
    degree: PolynomialDegree,
}

impl LogRegLoader {
    pub fn new(
        degree: PolynomialDegree,
        feature_count: u64,
        batch_sizes: &[u64],
        data_type: DataType,
        config: &Configuration,
    ) -> Result<Self> {
        let elem = data_type.size_of();
        let input_sizes = [feature_count * elem, elem, feature_count * elem];
        let mut arena = LoaderArena::default();
        arena.init(batch_sizes, 1)?;
        arena.allocate(&input_sizes, &[elem], true)?;

        let mut loader = Self {
            arena,
            data_type,
            degree,
        };
        match &config.dataset_filename {
            Some(path) => {
                let outputs_loaded = load_dataset_into(&mut loader.arena, data_type, path)?;
                if !outputs_loaded {
                    loader.fill_ground_truth(batch_sizes)?;
                }
            }
            None => {
                let source = SyntheticSource::new(config.random_seed);
                // weights, bias, and inputs are standard-normal draws
                for param in 0..loader.arena.parameter_count() {
                    for sample in 0..loader.arena.parameter_pack(param)?.sample_count() {
                        let bytes = loader.arena.input_sample_mut(param, sample)?;
                        source.fill_normal(data_type, bytes, 0.0, 1.0);
                    }
                }
                loader.fill_ground_truth(batch_sizes)?;
            }
        }
        Ok(loader)
    }

    fn fill_ground_truth(&mut self, batch_sizes: &[u64]) -> Result<()> {
        let mut counter = ComponentCounter::new(batch_sizes.to_vec());
        loop {
            let indices = counter.count().to_vec();
            let result_i = self.arena.result_index(&indices)?;
            let inputs = gather_inputs(&self.arena, self.data_type, &indices)?;
            let value = inference(self.degree, &inputs);
            let out = self.arena.output_sample_mut(0, result_i)?;
            write_f64s(self.data_type, &[value], out)?;
            if counter.inc() {
                break;
            }
        }
        Ok(())
    }
}

fn inference(degree: PolynomialDegree, inputs: &[Vec<f64>]) -> f64 {
    let weights = &inputs[0];
    let bias = inputs[1][0];
    let features = &inputs[2];
    let linear = weights
        .iter()
        .zip(features)
        .map(|(w, x)| w * x)
        .sum::<f64>()
        + bias;
    sigmoid(degree, linear)
}

impl DataLoader for LogRegLoader {
    fn arena(&self) -> &LoaderArena {
        &self.arena
    }

    fn data_type(&self) -> DataType {
        self.data_type
    }

    fn compute_reference(&self, indices: &[u64], outputs: &mut [Vec<u8>]) -> Result<()> {
        let inputs = gather_inputs(&self.arena, self.data_type, indices)?;
        write_f64s(
            self.data_type,
            &[inference(self.degree, &inputs)],
            &mut outputs[0],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::read_f64s;

    #[test]
    fn polynomial_sigmoids_track_the_exact_sigmoid_near_zero() {
        for degree in [PolynomialDegree::PD3, PolynomialDegree::PD5, PolynomialDegree::PD7] {
            for x in [-1.0, -0.5, 0.0, 0.5, 1.0] {
                let exact = sigmoid(PolynomialDegree::None, x);
                let approx = sigmoid(degree, x);
                assert!(
                    (exact - approx).abs() < 0.05,
                    "{degree:?} at {x}: {approx} vs {exact}"
                );
            }
        }
    }

    #[test]
    fn sigmoid_at_zero_is_half() {
        for degree in [
            PolynomialDegree::None,
            PolynomialDegree::PD3,
            PolynomialDegree::PD5,
            PolynomialDegree::PD7,
        ] {
            assert!((sigmoid(degree, 0.0) - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn ground_truth_matches_reference_inference() {
        let config = Configuration {
            random_seed: 9,
            w_params: vec![WorkloadParam::uint("n", 16)],
            ..Configuration::default()
        };
        let loader = LogRegLoader::new(
            PolynomialDegree::PD3,
            16,
            &[1, 1, 4],
            DataType::Float64,
            &config,
        )
        .unwrap();
        for input_i in 0..4u64 {
            let indices = [0, 0, input_i];
            let inputs = gather_inputs(loader.arena(), DataType::Float64, &indices).unwrap();
            let expected = inference(PolynomialDegree::PD3, &inputs);
            let truth = loader.result_for(&indices).unwrap();
            let got = read_f64s(DataType::Float64, &truth[0]).unwrap()[0];
            assert!((got - expected).abs() < 1e-12);
        }
    }
}
