//! Contiguous-allocation data-loader base for benchmark inputs and
//! ground truth.

use std::borrow::Cow;

use cipherbench_abi::DataType;

use crate::error::{HarnessError, Result};

/// One buffer inside the loader's backing arena.
///
/// Records store an offset instead of a pointer so the arena stays
/// relocatable. An absent offset marks an unallocated ground-truth slot:
/// the size is known, but any read through the record is a contract
/// violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferRecord {
    pub offset: Option<usize>,
    pub size: u64,
    pub tag: i64,
}

/// Ordered buffers of one operand or result component.
#[derive(Debug, Clone)]
pub struct DataPack {
    pub param_position: u64,
    pub buffers: Vec<BufferRecord>,
}

impl DataPack {
    #[must_use]
    pub fn sample_count(&self) -> u64 {
        self.buffers.len() as u64
    }
}

/// Two-phase storage for loader data: `init` sizes the packs, `allocate`
/// backs them with a single contiguous arena.
#[derive(Debug, Default)]
pub struct LoaderArena {
    input_packs: Vec<DataPack>,
    output_packs: Vec<DataPack>,
    arena: Vec<u8>,
    output_allocated: bool,
}

impl LoaderArena {
    /// Sizes the input and output pack vectors. The output sample count
    /// is the product of the input sample counts (offline semantics).
    pub fn init(&mut self, input_sample_counts: &[u64], output_dim: usize) -> Result<()> {
        if input_sample_counts.is_empty() {
            return Err(HarnessError::invalid("input dimension must be positive"));
        }
        if output_dim == 0 {
            return Err(HarnessError::invalid("output dimension must be positive"));
        }
        let mut output_samples: u64 = 1;
        self.input_packs.clear();
        for (i, count) in input_sample_counts.iter().enumerate() {
            if *count == 0 {
                return Err(HarnessError::invalid(format!(
                    "invalid batch size for operand {i}: sample count must be positive"
                )));
            }
            output_samples = output_samples.saturating_mul(*count);
            self.input_packs.push(DataPack {
                param_position: i as u64,
                buffers: vec![
                    BufferRecord {
                        offset: None,
                        size: 0,
                        tag: 0,
                    };
                    *count as usize
                ],
            });
        }
        self.output_packs.clear();
        for i in 0..output_dim {
            self.output_packs.push(DataPack {
                param_position: i as u64,
                buffers: vec![
                    BufferRecord {
                        offset: None,
                        size: 0,
                        tag: 0,
                    };
                    output_samples as usize
                ],
            });
        }
        Ok(())
    }

    /// Allocates the backing arena and points every buffer record at its
    /// slot. With `allocate_output == false`, ground-truth records keep
    /// their size but stay unallocated, to be computed on demand.
    pub fn allocate(
        &mut self,
        input_buffer_sizes: &[u64],
        output_buffer_sizes: &[u64],
        allocate_output: bool,
    ) -> Result<()> {
        if input_buffer_sizes.len() < self.input_packs.len() {
            return Err(HarnessError::invalid(format!(
                "expected at least {} input buffer sizes, received {}",
                self.input_packs.len(),
                input_buffer_sizes.len()
            )));
        }
        if output_buffer_sizes.len() < self.output_packs.len() {
            return Err(HarnessError::invalid(format!(
                "expected at least {} output buffer sizes, received {}",
                self.output_packs.len(),
                output_buffer_sizes.len()
            )));
        }

        let mut total: usize = 0;
        for (pack, size) in self.input_packs.iter().zip(input_buffer_sizes) {
            total += (*size as usize) * pack.buffers.len();
        }
        if allocate_output {
            for (pack, size) in self.output_packs.iter().zip(output_buffer_sizes) {
                total += (*size as usize) * pack.buffers.len();
            }
        }
        self.arena = vec![0u8; total];
        self.output_allocated = allocate_output;

        let mut offset = 0usize;
        for (pack, size) in self.input_packs.iter_mut().zip(input_buffer_sizes) {
            for record in &mut pack.buffers {
                record.offset = Some(offset);
                record.size = *size;
                record.tag = 0;
                offset += *size as usize;
            }
        }
        for (pack, size) in self.output_packs.iter_mut().zip(output_buffer_sizes) {
            for record in &mut pack.buffers {
                record.offset = if allocate_output {
                    let o = offset;
                    offset += *size as usize;
                    Some(o)
                } else {
                    None
                };
                record.size = *size;
                record.tag = 0;
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn parameter_count(&self) -> u64 {
        self.input_packs.len() as u64
    }

    pub fn parameter_pack(&self, position: u64) -> Result<&DataPack> {
        self.input_packs
            .get(position as usize)
            .ok_or_else(|| HarnessError::invalid(format!("no operand at position {position}")))
    }

    #[must_use]
    pub fn result_count(&self) -> u64 {
        self.output_packs.len() as u64
    }

    pub fn result_pack(&self, position: u64) -> Result<&DataPack> {
        self.output_packs
            .get(position as usize)
            .ok_or_else(|| HarnessError::invalid(format!("no result component at position {position}")))
    }

    #[must_use]
    pub fn output_allocated(&self) -> bool {
        self.output_allocated
    }

    /// Total bytes held by the backing arena.
    #[must_use]
    pub fn total_data_loaded(&self) -> u64 {
        self.arena.len() as u64
    }

    /// Row-major result index with the most significant operand varying
    /// slowest: `r = idx₀; for i≥1: r = idxᵢ + countᵢ · r`.
    pub fn result_index(&self, indices: &[u64]) -> Result<u64> {
        if indices.len() < self.input_packs.len() {
            return Err(HarnessError::invalid(format!(
                "expected {} sample indices, received {}",
                self.input_packs.len(),
                indices.len()
            )));
        }
        let mut result = 0u64;
        for (i, pack) in self.input_packs.iter().enumerate() {
            let count = pack.sample_count();
            if indices[i] >= count {
                return Err(HarnessError::invalid(format!(
                    "index out of range: sample {} of operand {i}, expected value less than {count}",
                    indices[i]
                )));
            }
            result = if i == 0 {
                indices[0]
            } else {
                indices[i] + count * result
            };
        }
        Ok(result)
    }

    /// Ground-truth buffer records at the row-major index for `indices`.
    pub fn result_records(&self, indices: &[u64]) -> Result<Vec<BufferRecord>> {
        let r = self.result_index(indices)? as usize;
        self.output_packs
            .iter()
            .map(|pack| {
                pack.buffers.get(r).copied().ok_or_else(|| {
                    HarnessError::invalid(format!("result index {r} out of range"))
                })
            })
            .collect()
    }

    /// Resolves a record to its bytes. Unallocated records are a contract
    /// violation.
    pub fn bytes(&self, record: &BufferRecord) -> Result<&[u8]> {
        let offset = record
            .offset
            .ok_or_else(|| HarnessError::invalid("read through an unallocated buffer record"))?;
        self.arena
            .get(offset..offset + record.size as usize)
            .ok_or_else(|| HarnessError::invalid("buffer record out of arena bounds"))
    }

    pub fn bytes_mut(&mut self, record: &BufferRecord) -> Result<&mut [u8]> {
        let offset = record
            .offset
            .ok_or_else(|| HarnessError::invalid("write through an unallocated buffer record"))?;
        self.arena
            .get_mut(offset..offset + record.size as usize)
            .ok_or_else(|| HarnessError::invalid("buffer record out of arena bounds"))
    }

    /// Mutable bytes of one input sample, for generation and dataset
    /// loading.
    pub fn input_sample_mut(&mut self, param: u64, sample: u64) -> Result<&mut [u8]> {
        let record = *self
            .parameter_pack(param)?
            .buffers
            .get(sample as usize)
            .ok_or_else(|| {
                HarnessError::invalid(format!("no sample {sample} in operand {param}"))
            })?;
        self.bytes_mut(&record)
    }

    /// Mutable bytes of one ground-truth sample.
    pub fn output_sample_mut(&mut self, component: u64, index: u64) -> Result<&mut [u8]> {
        let record = *self
            .result_pack(component)?
            .buffers
            .get(index as usize)
            .ok_or_else(|| {
                HarnessError::invalid(format!("no result sample {index} in component {component}"))
            })?;
        self.bytes_mut(&record)
    }
}

/// A benchmark's input samples and ground truth.
///
/// The provided `result_for` resolves ground truth either from the
/// pre-computed arena slots or, when outputs were left unallocated, by
/// computing the reference result on demand.
pub trait DataLoader: Send + Sync {
    fn arena(&self) -> &LoaderArena;
    fn data_type(&self) -> DataType;

    /// Computes the reference result for one combination of input sample
    /// indices into `outputs` (one pre-sized buffer per result component).
    fn compute_reference(&self, indices: &[u64], outputs: &mut [Vec<u8>]) -> Result<()>;

    fn parameter_count(&self) -> u64 {
        self.arena().parameter_count()
    }

    fn result_count(&self) -> u64 {
        self.arena().result_count()
    }

    fn result_index(&self, indices: &[u64]) -> Result<u64> {
        self.arena().result_index(indices)
    }

    /// Ground truth for one combination of input sample indices.
    fn result_for(&self, indices: &[u64]) -> Result<Vec<Cow<'_, [u8]>>> {
        let arena = self.arena();
        let records = arena.result_records(indices)?;
        if records.iter().all(|r| r.offset.is_some()) {
            return records
                .iter()
                .map(|r| arena.bytes(r).map(Cow::Borrowed))
                .collect();
        }
        let mut outputs: Vec<Vec<u8>> = records
            .iter()
            .map(|r| vec![0u8; r.size as usize])
            .collect();
        self.compute_reference(indices, &mut outputs)?;
        Ok(outputs.into_iter().map(Cow::Owned).collect())
    }

    fn total_data_loaded(&self) -> u64 {
        self.arena().total_data_loaded()
    }
}
