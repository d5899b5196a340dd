//! External dataset loading.
//!
//! The dataset is a sectioned CSV file. A section header row names the
//! side, the slot, and the sample count; the following rows carry one
//! sample each as comma-separated values:
//!
//! ```text
//! # comment
//! input, 0, 2
//! 1.0, 2.0, 3.0
//! 4.0, 5.0, 6.0
//! input, 1, 1
//! 7.0, 8.0, 9.0
//! output, 0, 2
//! ...
//! ```
//!
//! Inputs must cover every operand with exactly the sample counts the
//! benchmark expects. Output sections are optional; when present they
//! must cover the full Cartesian product, and validation becomes a plain
//! tensor compare instead of an on-the-fly reference computation.

use std::path::Path;

use cipherbench_abi::DataType;

use crate::data_loader::LoaderArena;
use crate::elements::write_f64s;
use crate::error::{HarnessError, Result};

enum Side {
    Input,
    Output,
}

/// Parses `path` into the loader's already-allocated buffers.
///
/// Returns `true` when ground-truth outputs were loaded from the file.
/// Requires an arena with allocated outputs; datasets cannot be combined
/// with lazy ground truth.
pub fn load_dataset_into(
    arena: &mut LoaderArena,
    data_type: DataType,
    path: impl AsRef<Path>,
) -> Result<bool> {
    if !arena.output_allocated() {
        return Err(HarnessError::invalid(
            "external datasets require allocated ground-truth buffers",
        ));
    }
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        HarnessError::Dataset(format!("cannot read {}: {e}", path.display()))
    })?;

    let mut covered_inputs = vec![false; arena.parameter_count() as usize];
    let mut outputs_loaded = false;

    let mut lines = content.lines().enumerate().peekable();
    while let Some((line_no, raw)) = lines.next() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (side, slot, sample_count) = parse_section_header(line, line_no + 1)?;

        let expected_samples = match side {
            Side::Input => arena
                .parameter_pack(slot)
                .map_err(|_| section_error(line_no + 1, format!("no operand {slot}")))?
                .sample_count(),
            Side::Output => arena
                .result_pack(slot)
                .map_err(|_| {
                    section_error(line_no + 1, format!("no result component {slot}"))
                })?
                .sample_count(),
        };
        if sample_count != expected_samples {
            return Err(section_error(
                line_no + 1,
                format!("expected {expected_samples} samples, section declares {sample_count}"),
            ));
        }

        for sample in 0..sample_count {
            let (value_line_no, value_line) = loop {
                match lines.next() {
                    Some((_, l)) if l.trim().is_empty() || l.trim().starts_with('#') => continue,
                    Some((n, l)) => break (n + 1, l),
                    None => {
                        return Err(section_error(
                            line_no + 1,
                            format!("section ends after {sample} of {sample_count} samples"),
                        ));
                    }
                }
            };
            let values = parse_values(value_line, value_line_no)?;
            let bytes = match side {
                Side::Input => arena.input_sample_mut(slot, sample)?,
                Side::Output => arena.output_sample_mut(slot, sample)?,
            };
            let expected_elements = bytes.len() / data_type.size_of() as usize;
            if values.len() != expected_elements {
                return Err(section_error(
                    value_line_no,
                    format!(
                        "sample has {} values, expected {expected_elements}",
                        values.len()
                    ),
                ));
            }
            write_f64s(data_type, &values, bytes)?;
        }

        match side {
            Side::Input => covered_inputs[slot as usize] = true,
            Side::Output => outputs_loaded = true,
        }
    }

    if let Some(missing) = covered_inputs.iter().position(|c| !c) {
        return Err(HarnessError::Dataset(format!(
            "dataset provides no samples for operand {missing}"
        )));
    }
    Ok(outputs_loaded)
}

fn section_error(line: usize, message: String) -> HarnessError {
    HarnessError::Dataset(format!("line {line}: {message}"))
}

fn parse_section_header(line: &str, line_no: usize) -> Result<(Side, u64, u64)> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 3 {
        return Err(section_error(
            line_no,
            format!("malformed section header \"{line}\""),
        ));
    }
    let side = match fields[0] {
        "input" => Side::Input,
        "output" => Side::Output,
        other => {
            return Err(section_error(
                line_no,
                format!("unknown section kind \"{other}\""),
            ));
        }
    };
    let slot = fields[1]
        .parse::<u64>()
        .map_err(|_| section_error(line_no, format!("bad slot index \"{}\"", fields[1])))?;
    let sample_count = fields[2]
        .parse::<u64>()
        .map_err(|_| section_error(line_no, format!("bad sample count \"{}\"", fields[2])))?;
    Ok((side, slot, sample_count))
}

fn parse_values(line: &str, line_no: usize) -> Result<Vec<f64>> {
    line.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| section_error(line_no, format!("bad value \"{s}\"")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::read_f64s;

    fn arena_2x1(vector_elems: u64) -> LoaderArena {
        let mut arena = LoaderArena::default();
        arena.init(&[1, 1], 1).unwrap();
        let size = vector_elems * 8;
        arena.allocate(&[size, size], &[size], true).unwrap();
        arena
    }

    #[test]
    fn inputs_and_outputs_load_into_the_arena() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(
            &path,
            "# demo dataset\ninput, 0, 1\n1, 2, 3\ninput, 1, 1\n4, 5, 6\noutput, 0, 1\n5, 7, 9\n",
        )
        .unwrap();

        let mut arena = arena_2x1(3);
        let loaded = load_dataset_into(&mut arena, DataType::Float64, &path).unwrap();
        assert!(loaded);
        let rec = arena.parameter_pack(1).unwrap().buffers[0];
        assert_eq!(
            read_f64s(DataType::Float64, arena.bytes(&rec).unwrap()).unwrap(),
            vec![4.0, 5.0, 6.0]
        );
        let out = arena.result_pack(0).unwrap().buffers[0];
        assert_eq!(
            read_f64s(DataType::Float64, arena.bytes(&out).unwrap()).unwrap(),
            vec![5.0, 7.0, 9.0]
        );
    }

    #[test]
    fn outputs_are_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "input, 0, 1\n1, 2, 3\ninput, 1, 1\n4, 5, 6\n").unwrap();
        let mut arena = arena_2x1(3);
        let loaded = load_dataset_into(&mut arena, DataType::Float64, &path).unwrap();
        assert!(!loaded);
    }

    #[test]
    fn missing_operand_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "input, 0, 1\n1, 2, 3\n").unwrap();
        let mut arena = arena_2x1(3);
        let err = load_dataset_into(&mut arena, DataType::Float64, &path).unwrap_err();
        assert!(err.to_string().contains("operand 1"), "got: {err}");
    }

    #[test]
    fn sample_count_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "input, 0, 3\n1, 2, 3\n").unwrap();
        let mut arena = arena_2x1(3);
        assert!(load_dataset_into(&mut arena, DataType::Float64, &path).is_err());
    }

    #[test]
    fn wrong_element_count_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "input, 0, 1\n1, 2\n").unwrap();
        let mut arena = arena_2x1(3);
        let err = load_dataset_into(&mut arena, DataType::Float64, &path).unwrap_err();
        assert!(err.to_string().contains("expected 3"), "got: {err}");
    }

    #[test]
    fn unallocated_outputs_are_disallowed() {
        let mut arena = LoaderArena::default();
        arena.init(&[1], 1).unwrap();
        arena.allocate(&[8], &[8], false).unwrap();
        let err = load_dataset_into(&mut arena, DataType::Float64, "unused.csv").unwrap_err();
        assert!(err.to_string().contains("allocated"), "got: {err}");
    }
}
