//! Session configuration: YAML import/export and parameter-range
//! expansion.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cipherbench_abi::{WorkloadParam, WorkloadParamValue};

use crate::component_counter::ComponentCounter;
use crate::description::Configuration;
use crate::error::{HarnessError, Result};

/// One benchmark selection after range expansion: the backend index plus
/// a fully-resolved configuration with single-valued workload parameters.
#[derive(Debug, Clone)]
pub struct BenchmarkRequest {
    pub benchmark_index: u64,
    pub configuration: Configuration,
}

/// A fully-imported session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub random_seed: u64,
    pub default_min_test_time_ms: u64,
    pub default_sample_size: u64,
    /// Bytes passed to the backend at engine initialization.
    pub initialization_data: Vec<u8>,
    pub requests: Vec<BenchmarkRequest>,
}

// --- YAML file shape ------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    default_min_test_time: u64,
    #[serde(default)]
    default_sample_size: u64,
    #[serde(default)]
    random_seed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    initialization_data: Option<String>,
    #[serde(default)]
    benchmark: Vec<BenchmarkEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BenchmarkEntry {
    #[serde(rename = "ID")]
    id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dataset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_min_test_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_sample_sizes: Option<BTreeMap<u64, u64>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    params: Vec<ParamEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ParamEntry {
    name: String,
    #[serde(rename = "type")]
    param_type: String,
    value: RangeEntry,
}

#[derive(Debug, Serialize, Deserialize)]
struct RangeEntry {
    from: serde_yaml::Value,
    to: serde_yaml::Value,
    step: serde_yaml::Value,
}

// --- range expansion ------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum TypedRange {
    UInt64 { from: u64, to: u64, step: u64 },
    Int64 { from: i64, to: i64, step: i64 },
    Float64 { from: f64, to: f64, step: f64 },
}

impl TypedRange {
    fn parse(entry: &ParamEntry, bench_id: u64, param_i: usize) -> Result<Self> {
        let bad = |what: &str| {
            HarnessError::Config(format!(
                "bad {what} for parameter {param_i} of benchmark ID {bench_id}"
            ))
        };
        match entry.param_type.as_str() {
            "UInt64" => Ok(TypedRange::UInt64 {
                from: entry.value.from.as_u64().ok_or_else(|| bad("from"))?,
                to: entry.value.to.as_u64().ok_or_else(|| bad("to"))?,
                step: entry.value.step.as_u64().ok_or_else(|| bad("step"))?,
            }),
            "Int64" => Ok(TypedRange::Int64 {
                from: entry.value.from.as_i64().ok_or_else(|| bad("from"))?,
                to: entry.value.to.as_i64().ok_or_else(|| bad("to"))?,
                step: entry.value.step.as_i64().ok_or_else(|| bad("step"))?,
            }),
            "Float64" => Ok(TypedRange::Float64 {
                from: entry.value.from.as_f64().ok_or_else(|| bad("from"))?,
                to: entry.value.to.as_f64().ok_or_else(|| bad("to"))?,
                step: entry.value.step.as_f64().ok_or_else(|| bad("step"))?,
            }),
            other => Err(HarnessError::Config(format!(
                "unknown workload parameter type \"{other}\" in benchmark ID {bench_id}"
            ))),
        }
    }

    /// Number of single-value realizations in this range. A zero step
    /// collapses the range to its `from` value.
    fn component_size(&self) -> u64 {
        match *self {
            TypedRange::UInt64 { from, to, step } => {
                if step == 0 || to <= from {
                    1
                } else {
                    (to - from) / step + 1
                }
            }
            TypedRange::Int64 { from, to, step } => {
                if step == 0 || to <= from {
                    1
                } else {
                    ((to - from) / step + 1) as u64
                }
            }
            TypedRange::Float64 { from, to, step } => {
                if step == 0.0 || to <= from {
                    1
                } else {
                    ((to - from) / step) as u64 + 1
                }
            }
        }
    }

    fn value_at(&self, count: u64) -> WorkloadParamValue {
        match *self {
            TypedRange::UInt64 { from, step, .. } => {
                WorkloadParamValue::UInt64(from + count * step)
            }
            TypedRange::Int64 { from, step, .. } => {
                WorkloadParamValue::Int64(from + count as i64 * step)
            }
            TypedRange::Float64 { from, step, .. } => {
                WorkloadParamValue::Float64(from + count as f64 * step)
            }
        }
    }
}

/// Imports a YAML session configuration, expanding every parameter range
/// into the Cartesian product of single-value realizations.
pub fn import_yaml(path: impl AsRef<Path>) -> Result<SessionConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| HarnessError::Config(format!("cannot read {}: {e}", path.display())))?;
    let file: ConfigFile = serde_yaml::from_str(&content)
        .map_err(|e| HarnessError::Config(format!("{}: {e}", path.display())))?;
    let root = path.parent().unwrap_or_else(|| Path::new("."));

    let initialization_data = resolve_initialization_data(
        file.initialization_data.as_deref().unwrap_or(""),
        root,
    )?;

    let mut requests = Vec::new();
    for bench in &file.benchmark {
        let dataset = bench
            .dataset
            .as_ref()
            .map(|d| resolve_relative(root, d));
        let default_sample_sizes = bench
            .default_sample_sizes
            .as_ref()
            .map(|map| {
                let len = map.keys().max().map_or(0, |k| *k as usize + 1);
                let mut sizes = vec![0u64; len];
                for (k, v) in map {
                    sizes[*k as usize] = *v;
                }
                sizes
            })
            .unwrap_or_default();

        let ranges = bench
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| TypedRange::parse(p, bench.id, i))
            .collect::<Result<Vec<_>>>()?;
        let sizes: Vec<u64> = ranges.iter().map(TypedRange::component_size).collect();

        if dataset.is_some() && sizes.iter().any(|s| *s > 1) {
            return Err(HarnessError::Config(format!(
                "benchmark ID {} specifies a dataset, so every parameter must collapse to a single value",
                bench.id
            )));
        }

        let mut counter = ComponentCounter::new(sizes);
        loop {
            let w_params: Vec<WorkloadParam> = ranges
                .iter()
                .zip(counter.count())
                .zip(&bench.params)
                .map(|((range, count), entry)| WorkloadParam {
                    name: entry.name.clone(),
                    value: range.value_at(*count),
                })
                .collect();
            requests.push(BenchmarkRequest {
                benchmark_index: bench.id,
                configuration: Configuration {
                    default_min_test_time_ms: bench
                        .default_min_test_time
                        .unwrap_or(file.default_min_test_time),
                    fallback_default_sample_size: file.default_sample_size,
                    default_sample_sizes: default_sample_sizes.clone(),
                    dataset_filename: dataset.clone(),
                    w_params,
                    single_path_report: false,
                    time_unit: None,
                    random_seed: file.random_seed,
                },
            });
            if counter.inc() {
                break;
            }
        }
    }

    Ok(SessionConfig {
        random_seed: file.random_seed,
        default_min_test_time_ms: file.default_min_test_time,
        default_sample_size: file.default_sample_size,
        initialization_data,
        requests,
    })
}

/// If the string names an existing file it is loaded as binary; otherwise
/// the literal bytes pass to the backend.
fn resolve_initialization_data(value: &str, root: &Path) -> Result<Vec<u8>> {
    if value.is_empty() {
        return Ok(Vec::new());
    }
    let candidate = resolve_relative(root, value);
    if candidate.is_file() {
        Ok(std::fs::read(&candidate)?)
    } else {
        Ok(value.as_bytes().to_vec())
    }
}

fn resolve_relative(root: &Path, value: &str) -> PathBuf {
    let p = PathBuf::from(value);
    if p.is_relative() { root.join(p) } else { p }
}

/// Exports a session back to YAML with every parameter collapsed to a
/// single value (`from == to`, `step == 0`).
pub fn export_yaml(config: &SessionConfig, path: impl AsRef<Path>) -> Result<()> {
    let mut file = ConfigFile {
        default_min_test_time: config.default_min_test_time_ms,
        default_sample_size: config.default_sample_size,
        random_seed: config.random_seed,
        initialization_data: None,
        benchmark: Vec::with_capacity(config.requests.len()),
    };
    for request in &config.requests {
        let cfg = &request.configuration;
        let params = cfg
            .w_params
            .iter()
            .map(|p| {
                let (type_name, value) = match p.value {
                    WorkloadParamValue::UInt64(v) => ("UInt64", serde_yaml::Value::from(v)),
                    WorkloadParamValue::Int64(v) => ("Int64", serde_yaml::Value::from(v)),
                    WorkloadParamValue::Float64(v) => ("Float64", serde_yaml::Value::from(v)),
                };
                ParamEntry {
                    name: p.name.clone(),
                    param_type: type_name.to_string(),
                    value: RangeEntry {
                        from: value.clone(),
                        to: value,
                        step: serde_yaml::Value::from(0u64),
                    },
                }
            })
            .collect();
        let sample_sizes: BTreeMap<u64, u64> = cfg
            .default_sample_sizes
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0)
            .map(|(k, v)| (k as u64, *v))
            .collect();
        file.benchmark.push(BenchmarkEntry {
            id: request.benchmark_index,
            dataset: cfg
                .dataset_filename
                .as_ref()
                .map(|p| p.display().to_string()),
            default_min_test_time: Some(cfg.default_min_test_time_ms),
            default_sample_sizes: if sample_sizes.is_empty() {
                None
            } else {
                Some(sample_sizes)
            },
            params,
        });
    }
    let body = serde_yaml::to_string(&file)
        .map_err(|e| HarnessError::Config(format!("cannot serialize configuration: {e}")))?;
    std::fs::write(path, body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("config.yaml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn ranges_expand_into_the_cartesian_product() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "default_min_test_time: 100\n\
random_seed: 7\n\
benchmark:\n\
  - ID: 0\n\
    params:\n\
      - name: n\n\
        type: UInt64\n\
        value: {from: 1000, to: 3000, step: 1000}\n\
      - name: m\n\
        type: UInt64\n\
        value: {from: 1, to: 2, step: 1}\n",
        );
        let config = import_yaml(&path).unwrap();
        assert_eq!(config.requests.len(), 6);
        let values: Vec<(u64, u64)> = config
            .requests
            .iter()
            .map(|r| {
                let get = |i: usize| match r.configuration.w_params[i].value {
                    WorkloadParamValue::UInt64(v) => v,
                    _ => panic!("wrong type"),
                };
                (get(0), get(1))
            })
            .collect();
        assert!(values.contains(&(1000, 1)));
        assert!(values.contains(&(3000, 2)));
        assert_eq!(config.requests[0].configuration.random_seed, 7);
        assert_eq!(
            config.requests[0].configuration.default_min_test_time_ms,
            100
        );
    }

    #[test]
    fn zero_step_collapses_to_a_single_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "benchmark:\n\
  - ID: 2\n\
    params:\n\
      - name: n\n\
        type: UInt64\n\
        value: {from: 128, to: 4096, step: 0}\n",
        );
        let config = import_yaml(&path).unwrap();
        assert_eq!(config.requests.len(), 1);
        assert_eq!(
            config.requests[0].configuration.w_params[0].value,
            WorkloadParamValue::UInt64(128)
        );
    }

    #[test]
    fn datasets_forbid_multi_value_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "benchmark:\n\
  - ID: 1\n\
    dataset: data.csv\n\
    params:\n\
      - name: n\n\
        type: UInt64\n\
        value: {from: 1, to: 5, step: 1}\n",
        );
        let err = import_yaml(&path).unwrap_err();
        assert!(err.to_string().contains("single value"), "got: {err}");
    }

    #[test]
    fn sample_size_map_becomes_a_dense_vector() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "benchmark:\n\
  - ID: 3\n\
    default_sample_sizes: {1: 10, 0: 3}\n",
        );
        let config = import_yaml(&path).unwrap();
        assert_eq!(
            config.requests[0].configuration.default_sample_sizes,
            vec![3, 10]
        );
    }

    #[test]
    fn initialization_data_is_file_or_literal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("init.bin"), [1u8, 2, 3]).unwrap();

        let path = write_config(dir.path(), "initialization_data: init.bin\nbenchmark: []\n");
        let config = import_yaml(&path).unwrap();
        assert_eq!(config.initialization_data, vec![1, 2, 3]);

        let path = write_config(
            dir.path(),
            "initialization_data: not-a-file\nbenchmark: []\n",
        );
        let config = import_yaml(&path).unwrap();
        assert_eq!(config.initialization_data, b"not-a-file".to_vec());
    }

    #[test]
    fn export_collapses_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "random_seed: 3\n\
benchmark:\n\
  - ID: 0\n\
    params:\n\
      - name: n\n\
        type: UInt64\n\
        value: {from: 10, to: 30, step: 10}\n",
        );
        let config = import_yaml(&path).unwrap();
        assert_eq!(config.requests.len(), 3);

        let exported = dir.path().join("exported.yaml");
        export_yaml(&config, &exported).unwrap();
        let reimported = import_yaml(&exported).unwrap();
        assert_eq!(reimported.requests.len(), 3);
        let values: Vec<u64> = reimported
            .requests
            .iter()
            .map(|r| match r.configuration.w_params[0].value {
                WorkloadParamValue::UInt64(v) => v,
                _ => panic!("wrong type"),
            })
            .collect();
        assert_eq!(values, vec![10, 20, 30]);
    }
}
