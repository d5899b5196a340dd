//! Typed element access over raw little-endian buffers.

use cipherbench_abi::DataType;

use crate::error::{HarnessError, Result};

/// Reads every element of `bytes` as `f64`.
pub fn read_f64s(data_type: DataType, bytes: &[u8]) -> Result<Vec<f64>> {
    let width = data_type.size_of() as usize;
    if bytes.len() % width != 0 {
        return Err(HarnessError::invalid(format!(
            "buffer length {} is not a multiple of element size {width}",
            bytes.len()
        )));
    }
    let mut out = Vec::with_capacity(bytes.len() / width);
    for chunk in bytes.chunks_exact(width) {
        out.push(match data_type {
            DataType::Int32 => i32::from_le_bytes(chunk.try_into().unwrap()) as f64,
            DataType::Int64 => i64::from_le_bytes(chunk.try_into().unwrap()) as f64,
            DataType::Float32 => f32::from_le_bytes(chunk.try_into().unwrap()) as f64,
            DataType::Float64 => f64::from_le_bytes(chunk.try_into().unwrap()),
        });
    }
    Ok(out)
}

/// Writes one value into a `data_type.size_of()`-wide chunk.
pub fn write_f64(data_type: DataType, value: f64, out: &mut [u8]) {
    match data_type {
        DataType::Int32 => out.copy_from_slice(&(value as i32).to_le_bytes()),
        DataType::Int64 => out.copy_from_slice(&(value as i64).to_le_bytes()),
        DataType::Float32 => out.copy_from_slice(&(value as f32).to_le_bytes()),
        DataType::Float64 => out.copy_from_slice(&value.to_le_bytes()),
    }
}

/// Writes a slice of values over `out`, which must be exactly
/// `values.len() * data_type.size_of()` bytes.
pub fn write_f64s(data_type: DataType, values: &[f64], out: &mut [u8]) -> Result<()> {
    let width = data_type.size_of() as usize;
    if out.len() != values.len() * width {
        return Err(HarnessError::invalid(format!(
            "buffer length {} does not fit {} elements of width {width}",
            out.len(),
            values.len()
        )));
    }
    for (value, chunk) in values.iter().zip(out.chunks_exact_mut(width)) {
        write_f64(data_type, *value, chunk);
    }
    Ok(())
}
