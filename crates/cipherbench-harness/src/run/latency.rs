//! Latency category runner: single-sample operands, warm-up, then a
//! timed repeat loop.

use std::sync::Arc;

use tracing::{info, warn};

use cipherbench_abi::{
    CategorySpecific, DataPackSink, Handle, HandleGuard, PackedDataSink, ParameterIndexer,
};
use cipherbench_report::{EventTimer, TimingReport};

use crate::data_loader::DataLoader;
use crate::description::{DescriptionToken, DescriptorKey};
use crate::engine::Engine;
use crate::error::{HarnessError, Result};
use crate::run::{
    BenchmarkBase, BenchmarkRunner, RunConfig, build_packed_sides, carve_mut, carve_ref,
    encode_and_load, grow_capacity_estimate, validate_decoded,
};
use crate::validation::ResultValidator;

/// Initial stored-result capacity before the elapsed-ratio estimate kicks
/// in.
const INITIAL_RESULT_CAPACITY: usize = 20;

/// Drives one benchmark through the latency protocol: every operand uses
/// batch size 1, the operation runs for at least two iterations and until
/// the minimum test time is reached, and every stored result is decoded
/// and validated against the ground truth at sample indices `[0, 0, …]`.
pub struct LatencyRunner {
    base: BenchmarkBase,
    loader: Arc<dyn DataLoader>,
    validator: Arc<dyn ResultValidator>,
}

impl std::fmt::Debug for LatencyRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatencyRunner").finish_non_exhaustive()
    }
}

impl LatencyRunner {
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

impl BenchmarkRunner for LatencyRunner {
    fn run(&mut self, report: &mut TimingReport, run_config: &RunConfig) -> Result<bool> {
        info!("starting latency test");
        let loader = self.loader.clone();
        let bridge = self.base.engine().bridge().clone();
        let param_count = loader.parameter_count() as usize;
        let batch_sizes = vec![1u64; param_count];

        let descriptor = &self.base.backend_description().descriptor;
        let warmup_iterations = match &descriptor.cat_params.specific {
            CategorySpecific::Latency { warmup_iterations } => *warmup_iterations,
            CategorySpecific::Offline { .. } => {
                return Err(HarnessError::invalid(
                    "latency runner received an offline descriptor",
                ));
            }
        };
        let cipher_param_mask = descriptor.cipher_param_mask;
        let advertised_min_test_time_ms = descriptor.cat_params.min_test_time_ms;

        let sides = build_packed_sides(loader.as_ref(), cipher_param_mask, &batch_sizes)?;
        let h_inputs_remote = encode_and_load(&mut self.base, report, sides)?;

        let indexers = vec![
            ParameterIndexer {
                value_index: 0,
                batch_size: 1,
            };
            param_count
        ];

        // warm-up: timed, never flagged as the main event
        let warmup_id = self.base.next_event_id();
        if warmup_iterations > 0 {
            info!(iterations = warmup_iterations, "warming up");
            for _ in 0..warmup_iterations {
                let timer = EventTimer::start();
                let mut h_result = Handle::default();
                let status = bridge.operate(
                    self.base.handle(),
                    h_inputs_remote.handle(),
                    &indexers,
                    &mut h_result,
                );
                self.base.validate(status)?;
                let _discard = HandleGuard::new(bridge.clone(), h_result);
                report.add_event(timer.stop(warmup_id, 1, ""), "Warmup");
            }
        } else {
            warn!("no warm-up requested (skipping)");
        }

        let min_test_time_ms = self.base.effective_min_test_time_ms();
        info!(
            requested_ms = advertised_min_test_time_ms,
            actual_ms = min_test_time_ms,
            "measuring"
        );

        let operation_id = self.base.next_event_id();
        report.add_event_type(operation_id, "Operation", true);

        let mut h_remote_results: Vec<HandleGuard> = Vec::with_capacity(INITIAL_RESULT_CAPACITY);
        report.reserve(h_remote_results.capacity());
        let mut op_count = 0u64;
        let mut elapsed_ms = 0.0f64;
        while op_count < 2 || elapsed_ms < min_test_time_ms as f64 {
            let timer = EventTimer::start();
            let mut h_result = Handle::default();
            let status = bridge.operate(
                self.base.handle(),
                h_inputs_remote.handle(),
                &indexers,
                &mut h_result,
            );
            self.base.validate(status)?;
            let event = timer.stop(operation_id, 1, "");
            elapsed_ms += event.elapsed_wall_ms();
            if h_remote_results.len() == h_remote_results.capacity() && elapsed_ms > 0.0 {
                // over-estimate the remaining iterations so another
                // reallocation inside the measurement loop is unlikely
                let max_capacity = grow_capacity_estimate(
                    h_remote_results.capacity(),
                    min_test_time_ms,
                    elapsed_ms,
                );
                report.reserve(max_capacity - h_remote_results.capacity());
                h_remote_results.reserve(max_capacity - h_remote_results.len());
            }
            report.add_event(event, "Operation");
            h_remote_results.push(HandleGuard::new(bridge.clone(), h_result));
            op_count += 1;
        }
        info!(iterations = op_count, "measurement loop done");

        let mut h_inputs_remote = h_inputs_remote;
        h_inputs_remote.destroy();

        // retrieve every stored remote result into host handles
        info!("retrieving results from remote backend");
        let store_id = self.base.next_event_id();
        let mut h_cipher_results: Vec<HandleGuard> = Vec::with_capacity(h_remote_results.len());
        for mut h_remote in h_remote_results {
            let timer = EventTimer::start();
            let mut locals = [Handle::default()];
            let status = bridge.store(self.base.handle(), h_remote.handle(), &mut locals);
            self.base.validate(status)?;
            report.add_event(timer.stop(store_id, 1, ""), "Store");
            h_cipher_results.push(HandleGuard::new(bridge.clone(), locals[0]));
            // free remote space eagerly; the backend may have little of it
            h_remote.destroy();
        }

        info!("decrypting results");
        let decryption_id = self.base.next_event_id();
        let mut h_plain_results: Vec<HandleGuard> = Vec::with_capacity(h_cipher_results.len());
        for mut h_cipher in h_cipher_results {
            let timer = EventTimer::start();
            let mut h_plain = Handle::default();
            let status = bridge.decrypt(self.base.handle(), h_cipher.handle(), &mut h_plain);
            self.base.validate(status)?;
            report.add_event(timer.stop(decryption_id, 1, ""), "Decryption");
            h_plain_results.push(HandleGuard::new(bridge.clone(), h_plain));
            h_cipher.destroy();
        }

        // one decode buffer per result component
        let component_sizes: Vec<u64> = (0..loader.result_count())
            .map(|i| {
                loader
                    .arena()
                    .result_pack(i)
                    .map(|p| p.buffers.first().map_or(0, |b| b.size))
            })
            .collect::<Result<_>>()?;
        let mut raw_results = vec![0u8; component_sizes.iter().sum::<u64>() as usize];

        if run_config.validate_results {
            info!("decoding and validating");
        } else {
            info!("decoding");
        }
        let decoding_id = self.base.next_event_id();
        let mut valid = true;
        let ground_truth_indices = vec![0u64; param_count];
        for (result_i, mut h_plain) in h_plain_results.into_iter().enumerate() {
            if valid {
                {
                    let chunks = carve_mut(&mut raw_results, &component_sizes);
                    let mut sink = PackedDataSink {
                        packs: chunks
                            .into_iter()
                            .enumerate()
                            .map(|(pos, buffer)| DataPackSink {
                                param_position: pos as u64,
                                buffers: vec![buffer],
                            })
                            .collect(),
                    };
                    let timer = EventTimer::start();
                    let status = bridge.decode(self.base.handle(), h_plain.handle(), &mut sink);
                    self.base.validate(status)?;
                    report.add_event(timer.stop(decoding_id, 1, ""), "Decoding");
                }

                if run_config.validate_results {
                    let outputs = carve_ref(&raw_results, &component_sizes);
                    let verdict = validate_decoded(
                        loader.as_ref(),
                        self.validator.as_ref(),
                        &ground_truth_indices,
                        &outputs,
                    )?;
                    if let Err(diagnostic) = verdict {
                        warn!(result = result_i + 1, "validation failed");
                        let mut block = format!("Validation failed\nResult, {}\n", result_i + 1);
                        block.push_str(&diagnostic);
                        report.append_footer(&block, true);
                        valid = false;
                    }
                }
            }
            // remaining handles are destroyed but no longer decoded
            h_plain.destroy();
        }

        if !run_config.validate_results {
            report.prepend_footer("Validation skipped", false);
            warn!("validation skipped");
        }

        info!("latency test completed");
        Ok(valid)
    }
}
