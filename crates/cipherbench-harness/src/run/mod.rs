//! Benchmark runner base: backend benchmark lifecycle, event-id
//! discipline, and the shared encode → encrypt → load prologue.

pub mod latency;
pub mod offline;

use std::sync::Arc;

use tracing::{debug, info};

use cipherbench_abi::{
    DataPackView, Handle, HandleGuard, PackedDataView, Status,
};
use cipherbench_report::{EventTimer, TimingReport};

use crate::data_loader::DataLoader;
use crate::description::{BackendDescription, Configuration, DescriptionToken, DescriptorKey};
use crate::engine::Engine;
use crate::error::{HarnessError, Result};
use crate::validation::{ResultValidator, failure_dump};

pub use latency::LatencyRunner;
pub use offline::OfflineRunner;

/// Per-run options.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub validate_results: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            validate_results: true,
        }
    }
}

/// A benchmark ready to execute.
pub trait BenchmarkRunner: Send + std::fmt::Debug {
    /// Runs the benchmark, recording events into `report`. Returns the
    /// validation outcome (`true` when validation passed or was skipped).
    fn run(&mut self, report: &mut TimingReport, config: &RunConfig) -> Result<bool>;
}

/// State shared by both category runners: the backend benchmark handle,
/// the matched description, and the monotonic event-id counter.
pub struct BenchmarkBase {
    engine: Arc<Engine>,
    h_bench: HandleGuard,
    backend_desc: BackendDescription,
    config: Configuration,
    next_event_id: u32,
}

impl BenchmarkBase {
    /// Creates and initializes the backend benchmark, recording the
    /// "Creation" and "Initialization" events. Event ids are issued
    /// monotonically starting at `event_id_base + 1`.
    pub fn new(
        engine: Arc<Engine>,
        key: DescriptorKey,
        token: &DescriptionToken,
        event_id_base: u32,
        report: &mut TimingReport,
    ) -> Result<Self> {
        let backend_desc = token.backend_description(key)?.clone();
        let config = token.configuration(key)?.clone();
        let bridge = engine.bridge().clone();

        let mut base = Self {
            engine,
            h_bench: HandleGuard::empty(bridge.clone()),
            backend_desc,
            config,
            next_event_id: event_id_base,
        };

        info!("creating backend benchmark");
        let creation_id = base.next_event_id();
        let timer = EventTimer::start();
        let mut h_bench = Handle::default();
        let status = bridge.create_benchmark(
            base.engine.handle(),
            base.backend_desc.handle,
            &base.config.w_params,
            &mut h_bench,
        );
        base.validate(status)?;
        base.h_bench = HandleGuard::new(bridge.clone(), h_bench);
        report.add_event(timer.stop(creation_id, 1, ""), "Creation");

        info!("initializing backend benchmark");
        let init_id = base.next_event_id();
        let timer = EventTimer::start();
        let status = bridge.init_benchmark(base.h_bench.handle(), &base.backend_desc.descriptor);
        base.validate(status)?;
        report.add_event(timer.stop(init_id, 1, ""), "Initialization");

        Ok(base)
    }

    #[must_use]
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    #[must_use]
    pub fn handle(&self) -> Handle {
        self.h_bench.handle()
    }

    #[must_use]
    pub fn backend_description(&self) -> &BackendDescription {
        &self.backend_desc
    }

    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// Next monotonic event id.
    pub fn next_event_id(&mut self) -> u32 {
        self.next_event_id += 1;
        self.next_event_id
    }

    pub fn validate(&self, status: Status) -> Result<()> {
        self.engine.validate(status)
    }

    /// The backend's minimum test time, or the configured default when
    /// the backend requested zero.
    #[must_use]
    pub fn effective_min_test_time_ms(&self) -> u64 {
        let advertised = self.backend_desc.descriptor.cat_params.min_test_time_ms;
        if advertised > 0 {
            advertised
        } else {
            self.config.default_min_test_time_ms
        }
    }
}

/// Splits the operands into the cipher and plain packed-data sides
/// according to the descriptor's cipher-parameter mask. Side 0 is the
/// cipher side; every operand lands in exactly one side.
pub(crate) fn build_packed_sides<'a>(
    loader: &'a dyn DataLoader,
    cipher_param_mask: u32,
    batch_sizes: &[u64],
) -> Result<[PackedDataView<'a>; 2]> {
    let arena = loader.arena();
    let mut cipher = PackedDataView::default();
    let mut plain = PackedDataView::default();
    for param in 0..arena.parameter_count() {
        let pack = arena.parameter_pack(param)?;
        let batch = batch_sizes
            .get(param as usize)
            .copied()
            .unwrap_or_else(|| pack.sample_count());
        if batch > pack.sample_count() {
            return Err(HarnessError::invalid(format!(
                "batch size {batch} exceeds sample count {} of operand {param}",
                pack.sample_count()
            )));
        }
        let mut buffers = Vec::with_capacity(batch as usize);
        for record in pack.buffers.iter().take(batch as usize) {
            buffers.push(arena.bytes(record)?);
        }
        let view = DataPackView {
            param_position: param,
            buffers,
        };
        if cipher_param_mask & (1u32 << param) != 0 {
            cipher.packs.push(view);
        } else {
            plain.packs.push(view);
        }
    }
    Ok([cipher, plain])
}

/// Shared pipeline prologue: encode each non-empty side, encrypt the
/// cipher side, load everything into one remote handle, and release the
/// host-side handles immediately.
pub(crate) fn encode_and_load(
    base: &mut BenchmarkBase,
    report: &mut TimingReport,
    sides: [PackedDataView<'_>; 2],
) -> Result<HandleGuard> {
    let bridge = base.engine().bridge().clone();
    let h_bench = base.handle();

    info!("encoding");
    let mut h_inputs: Vec<HandleGuard> = Vec::with_capacity(sides.len());
    for (i, side) in sides.iter().enumerate() {
        let event_id = base.next_event_id();
        let mut guard = HandleGuard::empty(bridge.clone());
        if side.packs.is_empty() {
            debug!(pack = i, "pack is empty (skipping)");
        } else {
            let event_name = format!("Encoding pack {i}");
            let timer = EventTimer::start();
            let mut h = Handle::default();
            let status = bridge.encode(h_bench, side, &mut h);
            base.validate(status)?;
            guard = HandleGuard::new(bridge.clone(), h);
            report.add_event(timer.stop(event_id, 1, ""), &event_name);
        }
        h_inputs.push(guard);
    }

    // encrypt the encoded cipher side, replacing its handle
    let event_id = base.next_event_id();
    if sides[0].packs.is_empty() {
        debug!("no encrypted parameters requested (skipping)");
    } else {
        info!("encrypting");
        let timer = EventTimer::start();
        let mut h = Handle::default();
        let status = bridge.encrypt(h_bench, h_inputs[0].handle(), &mut h);
        base.validate(status)?;
        h_inputs[0].replace(h);
        report.add_event(timer.stop(event_id, 1, ""), "Encryption");
    }

    info!("loading data to remote backend");
    let event_id = base.next_event_id();
    let locals: Vec<Handle> = h_inputs
        .iter()
        .filter(|g| !g.is_empty())
        .map(HandleGuard::handle)
        .collect();
    let timer = EventTimer::start();
    let mut h_remote = Handle::default();
    let status = bridge.load(h_bench, &locals, &mut h_remote);
    base.validate(status)?;
    let remote = HandleGuard::new(bridge, h_remote);
    report.add_event(timer.stop(event_id, 1, ""), "Loading");

    // host-side handles are released here, before the measurement loop
    drop(h_inputs);
    Ok(remote)
}

/// Splits a backing buffer into per-component mutable slices.
pub(crate) fn carve_mut<'a>(mut buf: &'a mut [u8], sizes: &[u64]) -> Vec<&'a mut [u8]> {
    let mut out = Vec::with_capacity(sizes.len());
    for &size in sizes {
        let (head, tail) = buf.split_at_mut(size as usize);
        out.push(head);
        buf = tail;
    }
    out
}

/// Immutable counterpart of [`carve_mut`].
pub(crate) fn carve_ref<'a>(mut buf: &'a [u8], sizes: &[u64]) -> Vec<&'a [u8]> {
    let mut out = Vec::with_capacity(sizes.len());
    for &size in sizes {
        let (head, tail) = buf.split_at(size as usize);
        out.push(head);
        buf = tail;
    }
    out
}

/// Validates one decoded result against the loader's ground truth.
/// On mismatch, returns the diagnostic message plus the footer dump.
pub(crate) fn validate_decoded(
    loader: &dyn DataLoader,
    validator: &dyn ResultValidator,
    indices: &[u64],
    outputs: &[&[u8]],
) -> Result<std::result::Result<(), String>> {
    if outputs.len() != loader.result_count() as usize {
        return Err(HarnessError::invalid(format!(
            "invalid number of outputs: expected {}, received {}",
            loader.result_count(),
            outputs.len()
        )));
    }
    let truths = loader.result_for(indices)?;
    for (component, (truth, received)) in truths.iter().zip(outputs).enumerate() {
        if let Err(message) =
            validator.validate(loader.data_type(), component, truth, received)
        {
            let mut block = message;
            block.push_str("\n\n");
            block.push_str(&failure_dump(loader, indices, outputs)?);
            return Ok(Err(block));
        }
    }
    Ok(Ok(()))
}

/// Grows the stored-results capacity estimate from the elapsed-time
/// ratio, reserving report capacity alongside so the measurement loop
/// does not reallocate.
pub(crate) fn grow_capacity_estimate(
    current_capacity: usize,
    min_test_time_ms: u64,
    elapsed_ms: f64,
) -> usize {
    let multiplier = if elapsed_ms > 0.0 {
        (min_test_time_ms as f64 / elapsed_ms) as usize
    } else {
        0
    };
    current_capacity * (multiplier + if multiplier > 0 { 1 } else { 2 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::Configuration;
    use crate::workloads::eltwise_add::EltwiseAddLoader;
    use cipherbench_abi::{DataType, WorkloadParam};

    #[test]
    fn every_operand_lands_in_exactly_one_side() {
        let config = Configuration {
            random_seed: 1,
            w_params: vec![WorkloadParam::uint("n", 4)],
            ..Configuration::default()
        };
        let loader = EltwiseAddLoader::new(4, &[1, 1], DataType::Float64, &config).unwrap();

        for mask in [0u32, 0b01, 0b10, 0b11] {
            let [cipher, plain] = build_packed_sides(&loader, mask, &[1, 1]).unwrap();
            let mut positions: Vec<u64> = cipher
                .packs
                .iter()
                .chain(plain.packs.iter())
                .map(|p| p.param_position)
                .collect();
            positions.sort_unstable();
            // union covers the full operand list, intersection is empty
            assert_eq!(positions, vec![0, 1], "mask {mask:#b}");
            for pack in &cipher.packs {
                assert!(mask & (1 << pack.param_position) != 0);
            }
            for pack in &plain.packs {
                assert!(mask & (1 << pack.param_position) == 0);
            }
        }
    }

    #[test]
    fn batch_size_beyond_samples_is_rejected() {
        let config = Configuration {
            random_seed: 1,
            w_params: vec![WorkloadParam::uint("n", 4)],
            ..Configuration::default()
        };
        let loader = EltwiseAddLoader::new(4, &[1, 1], DataType::Float64, &config).unwrap();
        assert!(build_packed_sides(&loader, 0, &[2, 1]).is_err());
    }

    #[test]
    fn carve_splits_without_overlap() {
        let mut buf = vec![0u8; 10];
        {
            let mut parts = carve_mut(&mut buf, &[4, 6]);
            parts[0].fill(1);
            parts[1].fill(2);
        }
        assert_eq!(&buf[..4], &[1, 1, 1, 1]);
        assert_eq!(&buf[4..], &[2, 2, 2, 2, 2, 2]);
        let parts = carve_ref(&buf, &[4, 6]);
        assert_eq!(parts[0], &[1, 1, 1, 1]);
    }

    #[test]
    fn capacity_estimate_overshoots_remaining_iterations() {
        // 20 iterations took 100 ms of a 1000 ms budget: expect room for
        // 11x the current capacity
        assert_eq!(grow_capacity_estimate(20, 1_000, 100.0), 220);
        // past the budget already: still grows
        assert_eq!(grow_capacity_estimate(20, 100, 250.0), 40);
    }
}
