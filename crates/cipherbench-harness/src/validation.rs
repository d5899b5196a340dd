//! Result validation and diagnostic dumps.

use std::borrow::Cow;
use std::fmt::Write as _;

use cipherbench_abi::DataType;

use crate::data_loader::DataLoader;
use crate::elements::read_f64s;
use crate::error::Result;

/// Number of failing element indices listed in a diagnostic message.
const MAX_ERROR_PRINT: usize = 10;

/// Indices of elements where `output` deviates beyond `tolerance`
/// (relative) from `truth`. Values equal bit-for-bit always pass.
#[must_use]
pub fn almost_equal_indices(truth: &[f64], output: &[f64], tolerance: f64) -> Vec<u64> {
    let mut failing = Vec::new();
    let n = truth.len().max(output.len());
    for i in 0..n {
        let a = truth.get(i).copied();
        let b = output.get(i).copied();
        let ok = match (a, b) {
            (Some(a), Some(b)) => {
                a == b || (a - b).abs() <= tolerance * a.abs().max(b.abs())
            }
            _ => false,
        };
        if !ok {
            failing.push(i as u64);
        }
    }
    failing
}

/// Validates one result component against its ground truth.
///
/// Errors with a diagnostic message when sizes differ or any element
/// deviates beyond the tolerance; the message lists up to
/// [`MAX_ERROR_PRINT`] failing indices.
pub fn validate_component(
    data_type: DataType,
    component: usize,
    truth: &[u8],
    received: &[u8],
    tolerance: f64,
) -> std::result::Result<(), String> {
    if received.len() != truth.len() {
        return Err(format!(
            "result component {component}: expected {} bytes but received {}",
            truth.len(),
            received.len()
        ));
    }
    let truth_values = read_f64s(data_type, truth).map_err(|e| e.to_string())?;
    let received_values = read_f64s(data_type, received).map_err(|e| e.to_string())?;
    let failing = almost_equal_indices(&truth_values, &received_values, tolerance);
    if failing.is_empty() {
        return Ok(());
    }
    let mut msg = format!(
        "Result component {component}; elements not within {}% of each other, {}\nFailed indices, ",
        tolerance * 100.0,
        failing.len()
    );
    for (i, idx) in failing.iter().take(MAX_ERROR_PRINT).enumerate() {
        if i > 0 {
            msg.push_str(", ");
        }
        let _ = write!(msg, "{idx}");
    }
    if failing.len() > MAX_ERROR_PRINT {
        msg.push_str(", ...");
    }
    Err(msg)
}

/// Strategy for comparing decoded results against ground truth.
pub trait ResultValidator: Send + Sync {
    fn validate(
        &self,
        data_type: DataType,
        component: usize,
        truth: &[u8],
        received: &[u8],
    ) -> std::result::Result<(), String>;
}

/// Element-wise near-equality with a relative tolerance (default 1 %).
pub struct NearEqualValidator {
    pub tolerance: f64,
}

impl Default for NearEqualValidator {
    fn default() -> Self {
        Self { tolerance: 0.01 }
    }
}

impl ResultValidator for NearEqualValidator {
    fn validate(
        &self,
        data_type: DataType,
        component: usize,
        truth: &[u8],
        received: &[u8],
    ) -> std::result::Result<(), String> {
        validate_component(data_type, component, truth, received, self.tolerance)
    }
}

/// Set-equality check for set-intersection results: membership order is
/// irrelevant, members compare with a relaxed tolerance (default 5 %),
/// and all-zero tuples act as padding.
pub struct SetValidator {
    pub tolerance: f64,
    pub element_arity: u64,
}

impl SetValidator {
    #[must_use]
    pub fn new(element_arity: u64) -> Self {
        Self {
            tolerance: 0.05,
            element_arity,
        }
    }
}

impl ResultValidator for SetValidator {
    fn validate(
        &self,
        data_type: DataType,
        component: usize,
        truth: &[u8],
        received: &[u8],
    ) -> std::result::Result<(), String> {
        if received.len() != truth.len() {
            return Err(format!(
                "result component {component}: expected {} bytes but received {}",
                truth.len(),
                received.len()
            ));
        }
        let k = self.element_arity.max(1) as usize;
        let truth_values = read_f64s(data_type, truth).map_err(|e| e.to_string())?;
        let received_values = read_f64s(data_type, received).map_err(|e| e.to_string())?;
        let truth_items: Vec<&[f64]> = truth_values.chunks(k).collect();
        let received_items: Vec<&[f64]> = received_values.chunks(k).collect();

        let is_padding = |item: &[f64]| item.iter().all(|v| *v == 0.0);
        let matches = |a: &[f64], b: &[f64]| {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|(x, y)| x == y || (x - y).abs() <= self.tolerance * x.abs().max(y.abs()))
        };

        let mut used = vec![false; received_items.len()];
        for (i, item) in truth_items.iter().enumerate() {
            if is_padding(item) {
                continue;
            }
            let found = received_items.iter().enumerate().position(|(j, candidate)| {
                !used[j] && matches(item, candidate)
            });
            match found {
                Some(j) => used[j] = true,
                None => {
                    return Err(format!(
                        "result component {component}: expected member {i} not found in received set"
                    ));
                }
            }
        }
        // everything unmatched on the received side must be padding
        for (j, item) in received_items.iter().enumerate() {
            if !used[j] && !is_padding(item) {
                return Err(format!(
                    "result component {component}: received member {j} is not in the expected set"
                ));
            }
        }
        Ok(())
    }
}

/// Renders buffers as columns, one element row per line.
fn arrays_as_columns(data_type: DataType, buffers: &[&[u8]], separator: &str) -> Result<String> {
    let columns: Vec<Vec<f64>> = buffers
        .iter()
        .map(|b| read_f64s(data_type, b))
        .collect::<Result<_>>()?;
    let rows = columns.iter().map(Vec::len).max().unwrap_or(0);
    let mut out = String::new();
    for row in 0..rows {
        let _ = write!(out, "{row}");
        for column in &columns {
            let _ = write!(out, "{separator}");
            if let Some(v) = column.get(row) {
                let _ = write!(out, "{v}");
            }
        }
        let _ = writeln!(out);
    }
    Ok(out)
}

/// Composes the diagnostic dump appended to a report footer on the first
/// validation failure: parameters, ground truth, and received output in
/// column form.
pub fn failure_dump(
    loader: &dyn DataLoader,
    indices: &[u64],
    outputs: &[&[u8]],
) -> Result<String> {
    let arena = loader.arena();
    let data_type = loader.data_type();
    let elem = data_type.size_of();
    let truths: Vec<Cow<'_, [u8]>> = loader.result_for(indices)?;

    let mut out = String::new();
    let _ = writeln!(out, "Number of parameters, {}", arena.parameter_count());
    let _ = writeln!(
        out,
        "Number of result components (expected), {}",
        arena.result_count()
    );
    let _ = writeln!(out, "Number of result components (received), {}", outputs.len());
    let _ = writeln!(out);

    let _ = writeln!(out, "Parameter index, size");
    let mut columns: Vec<&[u8]> = Vec::new();
    let mut banner = String::from(", Parameters");
    for param in 0..arena.parameter_count() {
        let record = arena.parameter_pack(param)?.buffers[indices[param as usize] as usize];
        let bytes = arena.bytes(&record)?;
        let _ = writeln!(out, "{param}, {}", record.size / elem);
        columns.push(bytes);
        if param > 0 {
            banner.push_str(", ");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Ground truth index, size");
    banner.push_str(", Ground truth");
    for (i, truth) in truths.iter().enumerate() {
        let _ = writeln!(out, "{i}, {}", truth.len() as u64 / elem);
        if i > 0 {
            banner.push_str(", ");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Output index, size");
    banner.push_str(", Output");
    for (i, output) in outputs.iter().enumerate() {
        let _ = writeln!(out, "{i}, {}", output.len() as u64 / elem);
        if i + 1 < outputs.len() {
            banner.push_str(", ");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{banner}");
    let mut index_row = String::from("Index");
    for param in 0..arena.parameter_count() {
        let _ = write!(index_row, ", {param}");
    }
    for i in 0..truths.len() {
        let _ = write!(index_row, ", {i}");
    }
    for i in 0..outputs.len() {
        let _ = write!(index_row, ", {i}");
    }
    let _ = writeln!(out, "{index_row}");

    for truth in &truths {
        columns.push(truth.as_ref());
    }
    for output in outputs {
        columns.push(output);
    }
    out.push_str(&arrays_as_columns(data_type, &columns, ", ")?);
    Ok(out)
}
