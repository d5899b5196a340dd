//! Offline category runner: full operand batches, Cartesian-product
//! results.

use std::sync::Arc;

use tracing::{info, warn};

use cipherbench_abi::{
    Category, DataPackSink, Handle, HandleGuard, PackedDataSink, ParameterIndexer,
};
use cipherbench_report::{EventTimer, TimingReport};

use crate::component_counter::ComponentCounter;
use crate::data_loader::DataLoader;
use crate::description::{DescriptionToken, DescriptorKey};
use crate::engine::Engine;
use crate::error::{HarnessError, Result};
use crate::run::{
    BenchmarkBase, BenchmarkRunner, RunConfig, build_packed_sides, carve_mut, carve_ref,
    encode_and_load, grow_capacity_estimate, validate_decoded,
};
use crate::validation::ResultValidator;

const INITIAL_ITERATION_CAPACITY: usize = 20;

/// Drives one benchmark through the offline protocol: every operand is
/// delivered with its full sample batch, `operate` runs at least once and
/// until the minimum test time is reached (only the last result is
/// retained), and the decoded Cartesian product is validated in row-major
/// order so the first failing index is reproducible.
pub struct OfflineRunner {
    base: BenchmarkBase,
    loader: Arc<dyn DataLoader>,
    validator: Arc<dyn ResultValidator>,
}

impl std::fmt::Debug for OfflineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineRunner").finish_non_exhaustive()
    }
}

impl OfflineRunner {
    pub fn new(
        engine: Arc<Engine>,
        key: DescriptorKey,
        token: &DescriptionToken,
        event_id_base: u32,
        loader: Arc<dyn DataLoader>,
        validator: Arc<dyn ResultValidator>,
        report: &mut TimingReport,
    ) -> Result<Self> {
        let base = BenchmarkBase::new(engine, key, token, event_id_base, report)?;
        Ok(Self {
            base,
            loader,
            validator,
        })
    }
}

impl BenchmarkRunner for OfflineRunner {
    fn run(&mut self, report: &mut TimingReport, run_config: &RunConfig) -> Result<bool> {
        info!("starting offline test");
        let loader = self.loader.clone();
        let bridge = self.base.engine().bridge().clone();
        let arena = loader.arena();
        let param_count = loader.parameter_count() as usize;

        let descriptor = &self.base.backend_description().descriptor;
        if descriptor.category != Category::Offline {
            return Err(HarnessError::invalid(
                "offline runner received a latency descriptor",
            ));
        }
        let cipher_param_mask = descriptor.cipher_param_mask;

        // full per-operand batches
        let mut batch_sizes = Vec::with_capacity(param_count);
        let mut num_results: u64 = 1;
        for param in 0..loader.parameter_count() {
            let count = arena.parameter_pack(param)?.sample_count();
            batch_sizes.push(count);
            num_results *= count;
        }

        let sides = build_packed_sides(loader.as_ref(), cipher_param_mask, &batch_sizes)?;
        let h_inputs_remote = encode_and_load(&mut self.base, report, sides)?;

        let indexers: Vec<ParameterIndexer> = batch_sizes
            .iter()
            .map(|&batch_size| ParameterIndexer {
                value_index: 0,
                batch_size,
            })
            .collect();

        let min_test_time_ms = self.base.effective_min_test_time_ms();
        info!(min_test_time_ms, "measuring");

        let operation_id = self.base.next_event_id();
        report.add_event_type(operation_id, "Operation", true);

        let mut h_remote_results = HandleGuard::empty(bridge.clone());
        let mut iteration_count = 0usize;
        let mut iteration_capacity = INITIAL_ITERATION_CAPACITY;
        let mut elapsed_ms = 0.0f64;
        report.reserve(iteration_capacity);
        while iteration_count == 0 || elapsed_ms < min_test_time_ms as f64 {
            if iteration_count > 0 {
                // only the latest result survives the loop
                h_remote_results.destroy();
            }
            let timer = EventTimer::start();
            let mut h_result = Handle::default();
            let status = bridge.operate(
                self.base.handle(),
                h_inputs_remote.handle(),
                &indexers,
                &mut h_result,
            );
            self.base.validate(status)?;
            let event = timer.stop(operation_id, num_results, "");
            elapsed_ms += event.elapsed_wall_ms();
            if iteration_count == iteration_capacity && elapsed_ms > 0.0 {
                let max_capacity =
                    grow_capacity_estimate(iteration_capacity, min_test_time_ms, elapsed_ms);
                report.reserve(max_capacity - iteration_capacity);
                iteration_capacity = max_capacity;
            }
            report.add_event(event, "Operation");
            h_remote_results.replace(h_result);
            iteration_count += 1;
        }
        info!(iterations = iteration_count, elapsed_ms, "measurement loop done");

        let mut h_inputs_remote = h_inputs_remote;
        h_inputs_remote.destroy();

        info!("retrieving results from remote backend");
        let store_id = self.base.next_event_id();
        let timer = EventTimer::start();
        let mut locals = [Handle::default()];
        let status = bridge.store(self.base.handle(), h_remote_results.handle(), &mut locals);
        self.base.validate(status)?;
        let mut h_cipher_results = HandleGuard::new(bridge.clone(), locals[0]);
        report.add_event(timer.stop(store_id, 1, ""), "Store");
        h_remote_results.destroy();

        info!("decrypting results");
        let decryption_id = self.base.next_event_id();
        let timer = EventTimer::start();
        let mut h_plain = Handle::default();
        let status = bridge.decrypt(self.base.handle(), h_cipher_results.handle(), &mut h_plain);
        self.base.validate(status)?;
        let mut h_plain_results = HandleGuard::new(bridge.clone(), h_plain);
        report.add_event(timer.stop(decryption_id, 1, ""), "Decryption");
        h_cipher_results.destroy();

        // one contiguous buffer shaped by the Cartesian product
        let component_sizes: Vec<u64> = (0..loader.result_count())
            .map(|i| {
                arena
                    .result_pack(i)
                    .map(|p| p.buffers.first().map_or(0, |b| b.size))
            })
            .collect::<Result<_>>()?;
        let component_totals: Vec<u64> =
            component_sizes.iter().map(|s| s * num_results).collect();
        let mut raw_results = vec![0u8; component_totals.iter().sum::<u64>() as usize];

        info!("decoding");
        let decoding_id = self.base.next_event_id();
        {
            let regions = carve_mut(&mut raw_results, &component_totals);
            let mut sink_packs = Vec::with_capacity(regions.len());
            for (component, region) in regions.into_iter().enumerate() {
                sink_packs.push(DataPackSink {
                    param_position: component as u64,
                    buffers: carve_mut(region, &vec![component_sizes[component]; num_results as usize]),
                });
            }
            let mut sink = PackedDataSink { packs: sink_packs };
            let timer = EventTimer::start();
            let status = bridge.decode(self.base.handle(), h_plain_results.handle(), &mut sink);
            self.base.validate(status)?;
            report.add_event(timer.stop(decoding_id, 1, ""), "Decoding");
        }
        h_plain_results.destroy();

        let mut valid = true;
        if run_config.validate_results {
            info!(results = num_results, "validating");
            // iterate results in row-major order: the most significant
            // operand varies slowest, so reverse the odometer components
            let mut counter_sizes = batch_sizes.clone();
            counter_sizes.reverse();
            let mut counter = ComponentCounter::new(counter_sizes);
            let component_regions = carve_ref(&raw_results, &component_totals);
            let mut result_i: u64 = 0;
            loop {
                let mut indices: Vec<u64> = counter.count().to_vec();
                indices.reverse();

                let outputs: Vec<&[u8]> = component_regions
                    .iter()
                    .enumerate()
                    .map(|(component, region)| {
                        let size = component_sizes[component] as usize;
                        &region[result_i as usize * size..(result_i as usize + 1) * size]
                    })
                    .collect();

                let verdict = validate_decoded(
                    loader.as_ref(),
                    self.validator.as_ref(),
                    &indices,
                    &outputs,
                )?;
                if let Err(diagnostic) = verdict {
                    warn!(result = result_i + 1, "validation failed");
                    let mut block = format!("Validation failed\nResult, {}\n", result_i + 1);
                    block.push_str(&diagnostic);
                    report.append_footer(&block, true);
                    valid = false;
                    break;
                }

                result_i += 1;
                if counter.inc() {
                    break;
                }
            }
            debug_assert!(!valid || result_i == num_results);
        } else {
            report.prepend_footer("Validation skipped", false);
            warn!("validation skipped");
        }

        info!("offline test completed");
        Ok(valid)
    }
}
