//! Clear-text example backend.
//!
//! Implements the full API bridge in-process with plain-text arithmetic:
//! "encryption" is the identity, handles index a bookkeeping table, and
//! `operate` evaluates the workload's reference semantics. It lets the
//! `harness` binary and the integration tests drive the harness
//! end-to-end without an HE library.

use std::collections::HashMap;

use parking_lot::Mutex;

use cipherbench_abi::{
    ApiBridge, BenchmarkDescriptor, Category, CategoryParams, DataType, Handle, MAX_OP_PARAMS,
    PackedDataSink, PackedDataView, ParameterIndexer, STATUS_INTERNAL_ERROR, STATUS_INVALID_ARGS,
    STATUS_SUCCESS, Status, Workload, WorkloadParam, WorkloadParamValue,
};

use crate::elements::{read_f64s, write_f64s};
use crate::workloads::logreg::{PolynomialDegree, sigmoid};
use crate::workloads::set_intersection::set_intersection_reference;

/// One advertised benchmark: the descriptor plus the number of workload
/// parameters the backend expects for it.
#[derive(Debug, Clone)]
pub struct AdvertisedBenchmark {
    pub descriptor: BenchmarkDescriptor,
    pub workload_params_count: u64,
}

/// Operand data held by a handle: one buffer list per parameter position.
#[derive(Debug, Clone, Default)]
struct OperandData {
    packs: Vec<(u64, Vec<Vec<u8>>)>,
}

impl OperandData {
    fn pack(&self, position: u64) -> Option<&Vec<Vec<u8>>> {
        self.packs
            .iter()
            .find(|(p, _)| *p == position)
            .map(|(_, buffers)| buffers)
    }
}

/// Result data: component → sample → bytes.
#[derive(Debug, Clone, Default)]
struct ResultData {
    components: Vec<Vec<Vec<u8>>>,
}

#[derive(Debug, Clone)]
struct BenchmarkState {
    benchmark_index: usize,
    w_params: Vec<WorkloadParam>,
    initialized: bool,
}

#[derive(Debug)]
enum Resource {
    Engine,
    Descriptor(usize),
    Benchmark(BenchmarkState),
    Encoded(OperandData),
    Loaded(OperandData),
    RemoteResult(ResultData),
    LocalResult(ResultData),
    PlainResult(ResultData),
}

#[derive(Default)]
struct State {
    next_handle: u64,
    handles: HashMap<u64, Resource>,
    last_error: String,
}

impl State {
    fn mint(&mut self, resource: Resource) -> Handle {
        self.next_handle += 1;
        let id = self.next_handle;
        self.handles.insert(id, resource);
        Handle {
            p: id,
            size: 1,
            tag: 0,
        }
    }

    fn fail(&mut self, message: impl Into<String>) -> Status {
        self.last_error = message.into();
        STATUS_INVALID_ARGS
    }
}

/// The example backend. Thread-safe; all bookkeeping sits behind one
/// mutex.
pub struct ClearTextBackend {
    benchmarks: Vec<AdvertisedBenchmark>,
    state: Mutex<State>,
}

impl ClearTextBackend {
    #[must_use]
    pub fn new(benchmarks: Vec<AdvertisedBenchmark>) -> Self {
        Self {
            benchmarks,
            state: Mutex::new(State::default()),
        }
    }

    /// The default benchmark set advertised by the example backend.
    #[must_use]
    pub fn with_default_benchmarks() -> Self {
        let latency = |workload, data_type, mask, min_ms, warmup| AdvertisedBenchmark {
            descriptor: BenchmarkDescriptor {
                workload,
                data_type,
                category: Category::Latency,
                cat_params: CategoryParams::latency(min_ms, warmup),
                cipher_param_mask: mask,
                scheme: 0,
                security: 0,
                other: 0,
            },
            workload_params_count: 1,
        };
        let mut set = vec![
            latency(Workload::EltwiseAdd, DataType::Float64, 0b10, 2_000, 2),
            AdvertisedBenchmark {
                descriptor: BenchmarkDescriptor {
                    workload: Workload::EltwiseAdd,
                    data_type: DataType::Float64,
                    category: Category::Offline,
                    cat_params: CategoryParams::offline(0, vec![0, 0]),
                    cipher_param_mask: 0,
                    scheme: 0,
                    security: 0,
                    other: 0,
                },
                workload_params_count: 1,
            },
            latency(Workload::DotProduct, DataType::Float64, 0b11, 2_000, 1),
            AdvertisedBenchmark {
                descriptor: BenchmarkDescriptor {
                    workload: Workload::DotProduct,
                    data_type: DataType::Float32,
                    category: Category::Offline,
                    cat_params: CategoryParams::offline(0, vec![3, 10]),
                    cipher_param_mask: 0,
                    scheme: 0,
                    security: 0,
                    other: 0,
                },
                workload_params_count: 1,
            },
            latency(
                Workload::LogisticRegressionPolyD3,
                DataType::Float64,
                0b100,
                2_000,
                1,
            ),
        ];
        set.push(AdvertisedBenchmark {
            descriptor: BenchmarkDescriptor {
                workload: Workload::SimpleSetIntersection,
                data_type: DataType::Int64,
                category: Category::Latency,
                cat_params: CategoryParams::latency(2_000, 1),
                cipher_param_mask: 0b11,
                scheme: 0,
                security: 0,
                other: 0,
            },
            workload_params_count: 3,
        });
        set.push(AdvertisedBenchmark {
            descriptor: BenchmarkDescriptor {
                workload: Workload::Generic,
                data_type: DataType::Float64,
                category: Category::Latency,
                cat_params: CategoryParams::latency(2_000, 0),
                cipher_param_mask: 0,
                scheme: 0,
                security: 0,
                other: 0,
            },
            workload_params_count: 5,
        });
        Self::new(set)
    }

    fn benchmark_state(&self, state: &State, h_bench: Handle) -> Option<BenchmarkState> {
        match state.handles.get(&h_bench.p) {
            Some(Resource::Benchmark(b)) => Some(b.clone()),
            _ => None,
        }
    }
}

/// Decomposes a flat row-major result index into per-operand sample
/// indices (operand 0 most significant).
fn decompose_index(mut flat: u64, counts: &[u64]) -> Vec<u64> {
    let mut indices = vec![0u64; counts.len()];
    for i in (0..counts.len()).rev() {
        let c = counts[i].max(1);
        indices[i] = flat % c;
        flat /= c;
    }
    indices
}

/// Evaluates the workload's operation over one combination of typed
/// operand values, returning one value vector per result component.
fn evaluate(
    workload: Workload,
    w_params: &[WorkloadParam],
    operands: &[Vec<f64>],
) -> Result<Vec<Vec<f64>>, String> {
    match workload {
        Workload::EltwiseAdd => {
            let mut out = operands[0].clone();
            for (acc, v) in out.iter_mut().zip(&operands[1]) {
                *acc += v;
            }
            Ok(vec![out])
        }
        Workload::DotProduct => {
            let dot = operands[0]
                .iter()
                .zip(&operands[1])
                .map(|(a, b)| a * b)
                .sum::<f64>();
            Ok(vec![vec![dot]])
        }
        Workload::LogisticRegression
        | Workload::LogisticRegressionPolyD3
        | Workload::LogisticRegressionPolyD5
        | Workload::LogisticRegressionPolyD7 => {
            let degree = match workload {
                Workload::LogisticRegressionPolyD3 => PolynomialDegree::PD3,
                Workload::LogisticRegressionPolyD5 => PolynomialDegree::PD5,
                Workload::LogisticRegressionPolyD7 => PolynomialDegree::PD7,
                _ => PolynomialDegree::None,
            };
            let linear = operands[0]
                .iter()
                .zip(&operands[2])
                .map(|(w, x)| w * x)
                .sum::<f64>()
                + operands[1][0];
            Ok(vec![vec![sigmoid(degree, linear)]])
        }
        Workload::SimpleSetIntersection => {
            let (n, m, k) = match w_params {
                [a, b, c, ..] => {
                    let get = |p: &WorkloadParam| match p.value {
                        WorkloadParamValue::UInt64(v) => Ok(v),
                        _ => Err(String::from("set sizes must be UInt64")),
                    };
                    (get(a)?, get(b)?, get(c)?)
                }
                _ => return Err(String::from("missing set-size workload parameters")),
            };
            Ok(vec![set_intersection_reference(
                &operands[0],
                &operands[1],
                n,
                m,
                k,
            )])
        }
        Workload::Generic => {
            // example semantics: each output is the element-wise sum of
            // the inputs, truncated or zero-padded to the output length
            let out_sizes: Vec<u64> = match w_params {
                [_, outputs, rest @ ..] => {
                    let output_count = match outputs.value {
                        WorkloadParamValue::UInt64(v) => v as usize,
                        _ => return Err(String::from("output count must be UInt64")),
                    };
                    let input_count = operands.len();
                    rest.iter()
                        .skip(input_count)
                        .take(output_count)
                        .map(|p| match p.value {
                            WorkloadParamValue::UInt64(v) => Ok(v),
                            _ => Err(String::from("output sizes must be UInt64")),
                        })
                        .collect::<Result<_, _>>()?
                }
                _ => return Err(String::from("missing generic workload parameters")),
            };
            let mut outputs = Vec::with_capacity(out_sizes.len());
            for size in out_sizes {
                let mut out = vec![0.0; size as usize];
                for operand in operands {
                    for (i, v) in operand.iter().enumerate().take(out.len()) {
                        out[i] += v;
                    }
                }
                outputs.push(out);
            }
            Ok(outputs)
        }
    }
}

impl ApiBridge for ClearTextBackend {
    fn init_engine(&self, _init_data: &[u8], h_engine: &mut Handle) -> Status {
        let mut state = self.state.lock();
        *h_engine = state.mint(Resource::Engine);
        STATUS_SUCCESS
    }

    fn destroy_handle(&self, h: Handle) -> Status {
        if h.is_empty() {
            return STATUS_SUCCESS;
        }
        let mut state = self.state.lock();
        if state.handles.remove(&h.p).is_none() {
            return state.fail(format!("unknown handle {}", h.p));
        }
        STATUS_SUCCESS
    }

    fn count_benchmarks(&self, _h_engine: Handle, count: &mut u64) -> Status {
        *count = self.benchmarks.len() as u64;
        STATUS_SUCCESS
    }

    fn describe_benchmark(
        &self,
        _h_engine: Handle,
        index: u64,
        h_desc: &mut Handle,
        descriptor: &mut BenchmarkDescriptor,
    ) -> Status {
        let mut state = self.state.lock();
        let Some(bench) = self.benchmarks.get(index as usize) else {
            return state.fail(format!("no benchmark at index {index}"));
        };
        *descriptor = bench.descriptor.clone();
        *h_desc = state.mint(Resource::Descriptor(index as usize));
        STATUS_SUCCESS
    }

    fn workload_params_count(&self, _h_engine: Handle, h_desc: Handle, count: &mut u64) -> Status {
        let mut state = self.state.lock();
        match state.handles.get(&h_desc.p) {
            Some(Resource::Descriptor(index)) => {
                *count = self.benchmarks[*index].workload_params_count;
                STATUS_SUCCESS
            }
            _ => state.fail("handle is not a benchmark descriptor"),
        }
    }

    fn scheme_name(&self, _h_engine: Handle, scheme: u32, out: &mut String) -> Status {
        let mut state = self.state.lock();
        match scheme {
            0 => {
                *out = String::from("CKKS");
                STATUS_SUCCESS
            }
            1 => {
                *out = String::from("BFV");
                STATUS_SUCCESS
            }
            other => state.fail(format!("unknown scheme {other}")),
        }
    }

    fn security_name(
        &self,
        _h_engine: Handle,
        _scheme: u32,
        security: u32,
        out: &mut String,
    ) -> Status {
        let mut state = self.state.lock();
        match security {
            0 => {
                *out = String::from("128 bit");
                STATUS_SUCCESS
            }
            1 => {
                *out = String::from("192 bit");
                STATUS_SUCCESS
            }
            other => state.fail(format!("unknown security level {other}")),
        }
    }

    fn extra_description(
        &self,
        _h_engine: Handle,
        _h_desc: Handle,
        _w_params: &[WorkloadParam],
        out: &mut String,
    ) -> Status {
        out.clear();
        STATUS_SUCCESS
    }

    fn create_benchmark(
        &self,
        _h_engine: Handle,
        h_desc: Handle,
        w_params: &[WorkloadParam],
        h_bench: &mut Handle,
    ) -> Status {
        let mut state = self.state.lock();
        let index = match state.handles.get(&h_desc.p) {
            Some(Resource::Descriptor(index)) => *index,
            _ => return state.fail("handle is not a benchmark descriptor"),
        };
        let expected = self.benchmarks[index].workload_params_count;
        if w_params.len() as u64 != expected {
            return state.fail(format!(
                "expected {expected} workload parameters, received {}",
                w_params.len()
            ));
        }
        *h_bench = state.mint(Resource::Benchmark(BenchmarkState {
            benchmark_index: index,
            w_params: w_params.to_vec(),
            initialized: false,
        }));
        STATUS_SUCCESS
    }

    fn init_benchmark(&self, h_bench: Handle, _concrete: &BenchmarkDescriptor) -> Status {
        let mut state = self.state.lock();
        match state.handles.get_mut(&h_bench.p) {
            Some(Resource::Benchmark(bench)) => {
                bench.initialized = true;
                STATUS_SUCCESS
            }
            _ => state.fail("handle is not a benchmark"),
        }
    }

    fn encode(&self, h_bench: Handle, data: &PackedDataView<'_>, h_out: &mut Handle) -> Status {
        let mut state = self.state.lock();
        if self.benchmark_state(&state, h_bench).is_none() {
            return state.fail("handle is not a benchmark");
        }
        let mut encoded = OperandData::default();
        for pack in &data.packs {
            if pack.param_position as usize >= MAX_OP_PARAMS {
                return state.fail(format!(
                    "parameter position {} out of range",
                    pack.param_position
                ));
            }
            encoded.packs.push((
                pack.param_position,
                pack.buffers.iter().map(|b| b.to_vec()).collect(),
            ));
        }
        *h_out = state.mint(Resource::Encoded(encoded));
        STATUS_SUCCESS
    }

    fn decode(&self, h_bench: Handle, h_encoded: Handle, out: &mut PackedDataSink<'_>) -> Status {
        let mut state = self.state.lock();
        if self.benchmark_state(&state, h_bench).is_none() {
            return state.fail("handle is not a benchmark");
        }
        let components = match state.handles.get(&h_encoded.p) {
            Some(Resource::PlainResult(result)) | Some(Resource::LocalResult(result)) => {
                result.components.clone()
            }
            _ => return state.fail("handle does not hold decodable results"),
        };
        for pack in &mut out.packs {
            let Some(component) = components.get(pack.param_position as usize) else {
                return state.fail(format!(
                    "no result component at position {}",
                    pack.param_position
                ));
            };
            for (i, buffer) in pack.buffers.iter_mut().enumerate() {
                let Some(sample) = component.get(i) else {
                    return state.fail(format!("no result sample {i}"));
                };
                if buffer.len() != sample.len() {
                    return state.fail(format!(
                        "decode buffer size {} does not match result size {}",
                        buffer.len(),
                        sample.len()
                    ));
                }
                buffer.copy_from_slice(sample);
            }
        }
        STATUS_SUCCESS
    }

    fn encrypt(&self, _h_bench: Handle, h_encoded: Handle, h_out: &mut Handle) -> Status {
        let mut state = self.state.lock();
        let data = match state.handles.get(&h_encoded.p) {
            Some(Resource::Encoded(data)) => data.clone(),
            _ => return state.fail("handle does not hold encoded data"),
        };
        // clear-text backend: ciphertext is the plaintext
        *h_out = state.mint(Resource::Encoded(data));
        STATUS_SUCCESS
    }

    fn decrypt(&self, _h_bench: Handle, h_cipher: Handle, h_out: &mut Handle) -> Status {
        let mut state = self.state.lock();
        let data = match state.handles.get(&h_cipher.p) {
            Some(Resource::LocalResult(result)) => result.clone(),
            _ => return state.fail("handle does not hold local results"),
        };
        *h_out = state.mint(Resource::PlainResult(data));
        STATUS_SUCCESS
    }

    fn load(&self, _h_bench: Handle, h_locals: &[Handle], h_remote: &mut Handle) -> Status {
        let mut state = self.state.lock();
        let mut merged = OperandData::default();
        for h in h_locals {
            match state.handles.get(&h.p) {
                Some(Resource::Encoded(data)) => {
                    merged.packs.extend(data.packs.iter().cloned());
                }
                _ => return state.fail("handle does not hold encoded data"),
            }
        }
        *h_remote = state.mint(Resource::Loaded(merged));
        STATUS_SUCCESS
    }

    fn store(&self, _h_bench: Handle, h_remote: Handle, h_locals: &mut [Handle]) -> Status {
        let mut state = self.state.lock();
        let data = match state.handles.get(&h_remote.p) {
            Some(Resource::RemoteResult(result)) => result.clone(),
            _ => return state.fail("handle does not hold remote results"),
        };
        if h_locals.is_empty() {
            return state.fail("store requires at least one local handle slot");
        }
        h_locals[0] = state.mint(Resource::LocalResult(data));
        for slot in h_locals.iter_mut().skip(1) {
            *slot = Handle::default();
        }
        STATUS_SUCCESS
    }

    fn operate(
        &self,
        h_bench: Handle,
        h_inputs: Handle,
        indexers: &[ParameterIndexer],
        h_result: &mut Handle,
    ) -> Status {
        let mut state = self.state.lock();
        let Some(bench) = self.benchmark_state(&state, h_bench) else {
            return state.fail("handle is not a benchmark");
        };
        if !bench.initialized {
            return state.fail("benchmark was not initialized");
        }
        let descriptor = &self.benchmarks[bench.benchmark_index].descriptor;
        let inputs = match state.handles.get(&h_inputs.p) {
            Some(Resource::Loaded(data)) => data.clone(),
            _ => return state.fail("handle does not hold loaded inputs"),
        };

        let param_count = indexers.len();
        let mut batches: Vec<&Vec<Vec<u8>>> = Vec::with_capacity(param_count);
        for position in 0..param_count as u64 {
            let Some(buffers) = inputs.pack(position) else {
                return state.fail(format!("no loaded operand at position {position}"));
            };
            let indexer = &indexers[position as usize];
            if indexer.value_index != 0 {
                return state.fail("non-zero value_index is not supported");
            }
            if indexer.batch_size as usize > buffers.len() {
                return state.fail(format!(
                    "batch size {} exceeds loaded sample count {}",
                    indexer.batch_size,
                    buffers.len()
                ));
            }
            batches.push(buffers);
        }

        let counts: Vec<u64> = indexers.iter().map(|ix| ix.batch_size.max(1)).collect();
        let num_results: u64 = counts.iter().product();

        let mut components: Vec<Vec<Vec<u8>>> = Vec::new();
        for flat in 0..num_results {
            let indices = decompose_index(flat, &counts);
            let mut operands = Vec::with_capacity(param_count);
            for (param, batch) in batches.iter().enumerate() {
                let bytes = &batch[indices[param] as usize];
                match read_f64s(descriptor.data_type, bytes) {
                    Ok(values) => operands.push(values),
                    Err(e) => return state.fail(e.to_string()),
                }
            }
            let outputs = match evaluate(descriptor.workload, &bench.w_params, &operands) {
                Ok(outputs) => outputs,
                Err(msg) => return state.fail(msg),
            };
            if components.is_empty() {
                components.resize(outputs.len(), Vec::new());
            }
            for (component, values) in components.iter_mut().zip(&outputs) {
                let mut bytes = vec![0u8; values.len() * descriptor.data_type.size_of() as usize];
                if let Err(e) = write_f64s(descriptor.data_type, values, &mut bytes) {
                    return state.fail(e.to_string());
                }
                component.push(bytes);
            }
        }

        *h_result = state.mint(Resource::RemoteResult(ResultData { components }));
        STATUS_SUCCESS
    }

    fn last_error_description(&self) -> String {
        self.state.lock().last_error.clone()
    }
}

/// A backend wrapper that fails `operate` with an internal error; used by
/// tests to exercise error propagation.
pub struct FailingOperateBackend {
    inner: ClearTextBackend,
}

impl FailingOperateBackend {
    #[must_use]
    pub fn new(inner: ClearTextBackend) -> Self {
        Self { inner }
    }
}

impl ApiBridge for FailingOperateBackend {
    fn init_engine(&self, init_data: &[u8], h_engine: &mut Handle) -> Status {
        self.inner.init_engine(init_data, h_engine)
    }
    fn destroy_handle(&self, h: Handle) -> Status {
        self.inner.destroy_handle(h)
    }
    fn count_benchmarks(&self, h: Handle, count: &mut u64) -> Status {
        self.inner.count_benchmarks(h, count)
    }
    fn describe_benchmark(
        &self,
        h: Handle,
        index: u64,
        h_desc: &mut Handle,
        descriptor: &mut BenchmarkDescriptor,
    ) -> Status {
        self.inner.describe_benchmark(h, index, h_desc, descriptor)
    }
    fn workload_params_count(&self, h: Handle, h_desc: Handle, count: &mut u64) -> Status {
        self.inner.workload_params_count(h, h_desc, count)
    }
    fn scheme_name(&self, h: Handle, scheme: u32, out: &mut String) -> Status {
        self.inner.scheme_name(h, scheme, out)
    }
    fn security_name(&self, h: Handle, scheme: u32, security: u32, out: &mut String) -> Status {
        self.inner.security_name(h, scheme, security, out)
    }
    fn extra_description(
        &self,
        h: Handle,
        h_desc: Handle,
        w_params: &[WorkloadParam],
        out: &mut String,
    ) -> Status {
        self.inner.extra_description(h, h_desc, w_params, out)
    }
    fn create_benchmark(
        &self,
        h: Handle,
        h_desc: Handle,
        w_params: &[WorkloadParam],
        h_bench: &mut Handle,
    ) -> Status {
        self.inner.create_benchmark(h, h_desc, w_params, h_bench)
    }
    fn init_benchmark(&self, h_bench: Handle, concrete: &BenchmarkDescriptor) -> Status {
        self.inner.init_benchmark(h_bench, concrete)
    }
    fn encode(&self, h_bench: Handle, data: &PackedDataView<'_>, h_out: &mut Handle) -> Status {
        self.inner.encode(h_bench, data, h_out)
    }
    fn decode(&self, h_bench: Handle, h_encoded: Handle, out: &mut PackedDataSink<'_>) -> Status {
        self.inner.decode(h_bench, h_encoded, out)
    }
    fn encrypt(&self, h_bench: Handle, h_encoded: Handle, h_out: &mut Handle) -> Status {
        self.inner.encrypt(h_bench, h_encoded, h_out)
    }
    fn decrypt(&self, h_bench: Handle, h_cipher: Handle, h_out: &mut Handle) -> Status {
        self.inner.decrypt(h_bench, h_cipher, h_out)
    }
    fn load(&self, h_bench: Handle, h_locals: &[Handle], h_remote: &mut Handle) -> Status {
        self.inner.load(h_bench, h_locals, h_remote)
    }
    fn store(&self, h_bench: Handle, h_remote: Handle, h_locals: &mut [Handle]) -> Status {
        self.inner.store(h_bench, h_remote, h_locals)
    }
    fn operate(
        &self,
        _h_bench: Handle,
        _h_inputs: Handle,
        _indexers: &[ParameterIndexer],
        _h_result: &mut Handle,
    ) -> Status {
        self.inner.state.lock().last_error = String::from("operate failed on purpose");
        STATUS_INTERNAL_ERROR
    }
    fn last_error_description(&self) -> String {
        self.inner.last_error_description()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique_and_destroyable() {
        let backend = ClearTextBackend::with_default_benchmarks();
        let mut h1 = Handle::default();
        let mut h2 = Handle::default();
        assert_eq!(backend.init_engine(&[], &mut h1), STATUS_SUCCESS);
        assert_eq!(backend.init_engine(&[], &mut h2), STATUS_SUCCESS);
        assert_ne!(h1, h2);
        assert_eq!(backend.destroy_handle(h1), STATUS_SUCCESS);
        assert_ne!(backend.destroy_handle(h1), STATUS_SUCCESS);
        assert!(backend.last_error_description().contains("unknown handle"));
    }

    #[test]
    fn advertised_benchmarks_resolve_names() {
        let backend = ClearTextBackend::with_default_benchmarks();
        let mut h_engine = Handle::default();
        backend.init_engine(&[], &mut h_engine);
        let mut count = 0;
        assert_eq!(backend.count_benchmarks(h_engine, &mut count), STATUS_SUCCESS);
        assert!(count >= 6);

        let mut name = String::new();
        assert_eq!(backend.scheme_name(h_engine, 0, &mut name), STATUS_SUCCESS);
        assert_eq!(name, "CKKS");
        assert_eq!(
            backend.security_name(h_engine, 0, 0, &mut name),
            STATUS_SUCCESS
        );
        assert_eq!(name, "128 bit");
        assert_ne!(backend.scheme_name(h_engine, 9, &mut name), STATUS_SUCCESS);
    }

    #[test]
    fn decompose_index_is_row_major() {
        assert_eq!(decompose_index(0, &[3, 10]), vec![0, 0]);
        assert_eq!(decompose_index(9, &[3, 10]), vec![0, 9]);
        assert_eq!(decompose_index(10, &[3, 10]), vec![1, 0]);
        assert_eq!(decompose_index(29, &[3, 10]), vec![2, 9]);
    }

    #[test]
    fn evaluate_dot_product() {
        let out = evaluate(
            Workload::DotProduct,
            &[],
            &[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
        )
        .unwrap();
        assert_eq!(out, vec![vec![32.0]]);
    }
}
